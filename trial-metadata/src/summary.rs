// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::TrialExitCode;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};

/// Root element for a serializable run summary.
///
/// A summary carries everything needed to reconstruct the aggregate outcome of a run: counts,
/// timing and every recorded failure in the order it occurred.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub struct RunSummary {
    /// The number of units that were attempted.
    ///
    /// Units skipped through an assumption violation are not counted here.
    pub run_count: usize,

    /// The number of units that were ignored, including those that violated an assumption.
    pub ignore_count: usize,

    /// The number of units that violated an assumption.
    pub assumption_failure_count: usize,

    /// The wall-clock time the run took.
    pub run_time: Duration,

    /// The time at which the run started, if it started.
    #[serde(default)]
    pub start_time: Option<DateTime<FixedOffset>>,

    /// Failures, in the order they were reported.
    #[serde(default)]
    pub failures: Vec<FailureSummary>,
}

impl RunSummary {
    /// Parses JSON output produced by [`Self::to_json`].
    pub fn parse_json(json: impl AsRef<str>) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json.as_ref())
    }

    /// Serializes this summary as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Returns the number of failures.
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Returns true if no failures were recorded.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Returns the exit code a front-end should use for this run.
    pub fn exit_code(&self) -> i32 {
        if !self.is_success() {
            TrialExitCode::TEST_RUN_FAILED
        } else if self.run_count == 0 {
            TrialExitCode::NO_TESTS_RUN
        } else {
            TrialExitCode::OK
        }
    }
}

/// A single recorded failure: the unit that failed, and what it failed with.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub struct FailureSummary {
    /// The description of the failing unit or group.
    pub description: DescriptionSummary,

    /// The error the unit failed with.
    pub error: ErrorSummary,
}

impl FailureSummary {
    /// Creates a new `FailureSummary`.
    pub fn new(description: DescriptionSummary, error: ErrorSummary) -> Self {
        Self { description, error }
    }
}

/// A serialized description node.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub struct DescriptionSummary {
    /// The display name, e.g. `adds_numbers(math::tests)`.
    pub display_name: String,

    /// The explicit disambiguator, if one was provided.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<String>,

    /// Child descriptions. Empty for a single unit.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DescriptionSummary>,

    /// True if this describes a group, which may have no children.
    #[serde(default, skip_serializing_if = "is_false")]
    pub suite: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl DescriptionSummary {
    /// Creates a leaf description summary with the given display name.
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            unique_id: None,
            children: Vec::new(),
            suite: false,
        }
    }

    /// Sets the explicit disambiguator.
    pub fn with_unique_id(mut self, unique_id: impl Into<String>) -> Self {
        self.unique_id = Some(unique_id.into());
        self
    }

    /// Marks whether this describes a group.
    pub fn with_suite(mut self, suite: bool) -> Self {
        self.suite = suite;
        self
    }

    /// Appends a child, making this describe a group.
    pub fn with_child(mut self, child: DescriptionSummary) -> Self {
        self.suite = true;
        self.children.push(child);
        self
    }
}

/// A serialized error.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub struct ErrorSummary {
    /// What kind of error this was.
    pub kind: ErrorKind,

    /// The message the error displayed as.
    pub message: String,

    /// For errors raised by user code, the type name of the underlying error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,

    /// Nested errors: the members of an aggregate, or the cause of a wrapped error.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<ErrorSummary>,
}

impl ErrorSummary {
    /// Creates a new `ErrorSummary` with no type name or causes.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            type_name: None,
            causes: Vec::new(),
        }
    }

    /// Sets the type name.
    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    /// Appends a cause.
    pub fn with_cause(mut self, cause: ErrorSummary) -> Self {
        self.causes.push(cause);
        self
    }
}

/// The kind of a recorded error.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum ErrorKind {
    /// An expected value did not match the actual one.
    Assertion,

    /// A unit declined to run under the current conditions.
    AssumptionViolated,

    /// User code panicked.
    Panicked,

    /// User code returned an error that isn't one of the other kinds.
    Unexpected,

    /// Several independent errors were collected together.
    Multiple,

    /// A deadline elapsed before the unit completed.
    TimedOut,

    /// The unit did not fail with the error it was expected to fail with.
    WrongError,

    /// A theory failed for one specific assignment of parameters.
    Parameterized,

    /// A theory never found an assignment of parameters that ran successfully.
    UnsatisfiedTheory,

    /// A unit or group could not be constructed.
    Initialization,
}

impl ErrorKind {
    /// Returns the kebab-case name of this kind, as used in serialized output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Assertion => "assertion",
            Self::AssumptionViolated => "assumption-violated",
            Self::Panicked => "panicked",
            Self::Unexpected => "unexpected",
            Self::Multiple => "multiple",
            Self::TimedOut => "timed-out",
            Self::WrongError => "wrong-error",
            Self::Parameterized => "parameterized",
            Self::UnsatisfiedTheory => "unsatisfied-theory",
            Self::Initialization => "initialization",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
