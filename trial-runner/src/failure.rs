// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors raised by test code, and failures recorded against descriptions.
//!
//! Every statement either completes or raises exactly one [`TestError`]. The variants follow the
//! taxonomy that results are reported with: assertion failures, assumption violations (which skip
//! rather than fail a unit), unexpected errors, aggregates of several errors, timeouts and
//! initialization errors.

use crate::description::Description;
use itertools::Itertools;
use std::{borrow::Cow, error::Error, fmt, sync::Arc, time::Duration};
use thiserror::Error;
use trial_metadata::{ErrorKind, ErrorSummary};

/// A boxed, thread-safe error.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// The result type statements and test bodies return.
pub type TestResult = Result<(), TestError>;

/// An error raised while evaluating a statement.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TestError {
    /// An expected value did not match the actual one.
    #[error(transparent)]
    Assertion(#[from] AssertionError),

    /// The unit declined to run under the current conditions.
    #[error(transparent)]
    AssumptionViolated(#[from] AssumptionViolation),

    /// User code panicked. Panics are reported like assertion failures.
    #[error(transparent)]
    Panicked(#[from] PanicError),

    /// User code returned an error that isn't one of the other kinds.
    #[error(transparent)]
    Unexpected(#[from] UnexpectedError),

    /// Several independent errors, e.g. from teardown actions that all had to run.
    #[error(transparent)]
    Multiple(#[from] MultipleFailures),

    /// A deadline elapsed before the statement completed.
    #[error(transparent)]
    TimedOut(#[from] TimedOut),

    /// The statement did not fail with the error it was expected to fail with.
    #[error(transparent)]
    WrongError(#[from] WrongError),

    /// A theory failed for one specific assignment of parameters.
    #[error(transparent)]
    Parameterized(#[from] ParameterizedAssertionError),

    /// A theory never ran successfully for any assignment of parameters.
    #[error(transparent)]
    UnsatisfiedTheory(#[from] UnsatisfiedTheory),

    /// A unit or group could not be constructed.
    #[error(transparent)]
    Initialization(#[from] InitializationError),

    /// An error restored from a serialized summary.
    #[error(transparent)]
    Recorded(#[from] RecordedError),
}

impl TestError {
    /// Wraps an arbitrary error raised by user code.
    pub fn unexpected<E>(error: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self::Unexpected(UnexpectedError::new(error))
    }

    /// Returns the serializable kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Assertion(_) => ErrorKind::Assertion,
            Self::AssumptionViolated(_) => ErrorKind::AssumptionViolated,
            Self::Panicked(_) => ErrorKind::Panicked,
            Self::Unexpected(_) => ErrorKind::Unexpected,
            Self::Multiple(_) => ErrorKind::Multiple,
            Self::TimedOut(_) => ErrorKind::TimedOut,
            Self::WrongError(_) => ErrorKind::WrongError,
            Self::Parameterized(_) => ErrorKind::Parameterized,
            Self::UnsatisfiedTheory(_) => ErrorKind::UnsatisfiedTheory,
            Self::Initialization(_) => ErrorKind::Initialization,
            Self::Recorded(error) => error.kind,
        }
    }

    /// Returns a short type name for this error, used in aggregate messages.
    pub fn type_name(&self) -> &str {
        match self {
            Self::Assertion(_) => "AssertionError",
            Self::AssumptionViolated(_) => "AssumptionViolation",
            Self::Panicked(_) => "Panic",
            Self::Unexpected(error) => error.type_name(),
            Self::Multiple(_) => "MultipleFailures",
            Self::TimedOut(_) => "TimedOut",
            Self::WrongError(_) => "WrongError",
            Self::Parameterized(_) => "ParameterizedAssertionError",
            Self::UnsatisfiedTheory(_) => "UnsatisfiedTheory",
            Self::Initialization(_) => "InitializationError",
            Self::Recorded(error) => error.type_name(),
        }
    }

    /// Returns true if this error is an assumption violation.
    pub fn is_assumption_violation(&self) -> bool {
        matches!(self, Self::AssumptionViolated(_))
            || matches!(self, Self::Recorded(error) if error.kind == ErrorKind::AssumptionViolated)
    }

    /// Returns a serializable summary of this error, including nested errors.
    pub fn summary(&self) -> ErrorSummary {
        let mut summary = ErrorSummary::new(self.kind(), self.to_string());
        match self {
            Self::Unexpected(error) => {
                summary = summary.with_type_name(error.type_name());
            }
            Self::Multiple(error) => {
                summary.causes = error.errors().iter().map(Self::summary).collect();
            }
            Self::WrongError(WrongError::Mismatch { actual, .. }) => {
                summary.causes.push(actual.summary());
            }
            Self::Parameterized(error) => {
                summary.causes.push(error.cause().summary());
            }
            Self::UnsatisfiedTheory(UnsatisfiedTheory::AllAssumptionsViolated {
                violations,
                ..
            }) => {
                summary.causes = violations
                    .iter()
                    .map(|violation| {
                        ErrorSummary::new(ErrorKind::AssumptionViolated, violation.to_string())
                    })
                    .collect();
            }
            Self::Recorded(error) => return error.summary(),
            _ => {}
        }
        summary
    }
}

/// An expected value did not match the actual one.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("{message}")]
pub struct AssertionError {
    message: String,
}

impl AssertionError {
    /// Creates a new assertion error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A unit declined to proceed under the current conditions.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("{message}")]
pub struct AssumptionViolation {
    message: String,
}

impl AssumptionViolation {
    /// Creates a new assumption violation with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// User code panicked.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("{message}")]
pub struct PanicError {
    message: String,
}

impl PanicError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the panic message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// An arbitrary error returned by user code.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct UnexpectedError {
    type_name: Cow<'static, str>,
    source: BoxError,
}

impl UnexpectedError {
    /// Wraps an error, remembering its type name.
    pub fn new<E>(error: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self {
            type_name: Cow::Borrowed(std::any::type_name::<E>()),
            source: Box::new(error),
        }
    }

    /// Wraps an already-boxed error under the given type name.
    pub fn from_boxed(type_name: impl Into<Cow<'static, str>>, source: BoxError) -> Self {
        Self {
            type_name: type_name.into(),
            source,
        }
    }

    /// Returns the type name of the wrapped error.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns the wrapped error.
    pub fn inner(&self) -> &(dyn Error + Send + Sync + 'static) {
        &*self.source
    }

    /// Returns true if the wrapped error is of type `E`.
    pub fn is<E: Error + 'static>(&self) -> bool {
        self.source.is::<E>()
    }

    /// Returns the wrapped error if it is of type `E`.
    pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
        self.source.downcast_ref::<E>()
    }
}

/// Several errors collected while running independent actions that all had to be attempted.
#[derive(Debug)]
pub struct MultipleFailures {
    errors: Vec<TestError>,
}

impl MultipleFailures {
    /// Combines the errors into at most one error.
    ///
    /// No errors means success, a single error is returned as is, and two or more are returned
    /// as a [`TestError::Multiple`].
    pub fn assert_empty(mut errors: Vec<TestError>) -> Result<(), TestError> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(TestError::Multiple(Self { errors })),
        }
    }

    /// Returns the collected errors, in the order they were raised.
    pub fn errors(&self) -> &[TestError] {
        &self.errors
    }

    /// Consumes self, returning the collected errors.
    pub fn into_errors(self) -> Vec<TestError> {
        self.errors
    }
}

impl fmt::Display for MultipleFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "There were {} errors:", self.errors.len())?;
        for error in &self.errors {
            write!(f, "\n  {}({error})", error.type_name())?;
        }
        Ok(())
    }
}

impl Error for MultipleFailures {}

/// A deadline elapsed before a statement completed.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("test timed out after {} milliseconds", .timeout.as_millis())]
pub struct TimedOut {
    timeout: Duration,
    thread_name: Option<String>,
}

impl TimedOut {
    pub(crate) fn new(timeout: Duration, thread_name: Option<String>) -> Self {
        Self {
            timeout,
            thread_name,
        }
    }

    /// Returns the deadline that elapsed.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the name of the thread that was still running the statement.
    ///
    /// The thread is not stopped: it was asked to cancel cooperatively and may still be running.
    pub fn thread_name(&self) -> Option<&str> {
        self.thread_name.as_deref()
    }
}

/// A statement did not fail with the error it was expected to fail with.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WrongError {
    /// The statement completed without an error.
    #[error("Expected exception: {expected}")]
    NoError {
        /// A description of the expected error.
        expected: String,
    },

    /// The statement failed with an error that didn't match.
    #[error("Unexpected exception, expected<{expected}> but was<{}>", .actual.type_name())]
    Mismatch {
        /// A description of the expected error.
        expected: String,

        /// The error that was actually raised.
        #[source]
        actual: Box<TestError>,
    },
}

/// A theory failed for one specific assignment of parameters.
#[derive(Debug, Error)]
#[error("{method}({})", .arguments.join(", "))]
pub struct ParameterizedAssertionError {
    method: String,
    arguments: Vec<String>,
    #[source]
    cause: Box<TestError>,
}

impl ParameterizedAssertionError {
    pub(crate) fn new(method: impl Into<String>, arguments: Vec<String>, cause: TestError) -> Self {
        Self {
            method: method.into(),
            arguments,
            cause: Box::new(cause),
        }
    }

    /// Returns the name of the theory.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Returns the descriptions of the arguments the theory failed with.
    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    /// Returns the error the theory raised.
    pub fn cause(&self) -> &TestError {
        &self.cause
    }
}

/// A theory finished its search without a single successful invocation.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[non_exhaustive]
pub enum UnsatisfiedTheory {
    /// No complete assignment of parameters could be built, so the theory never ran.
    #[error(
        "Never found parameters that satisfied method assumptions: \
         no complete assignment of parameters for {method}"
    )]
    NoAssignments {
        /// The name of the theory.
        method: String,
    },

    /// Every assignment violated an assumption.
    #[error(
        "Never found parameters that satisfied method assumptions.  Violated assumptions: [{}]",
        .violations.iter().join(", ")
    )]
    AllAssumptionsViolated {
        /// The name of the theory.
        method: String,

        /// Every violation encountered, in search order.
        violations: Vec<AssumptionViolation>,
    },
}

/// A unit or group could not be constructed into a runnable statement.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("{message}")]
pub struct InitializationError {
    message: String,
}

impl InitializationError {
    /// Creates a new initialization error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// An error restored from a serialized [`ErrorSummary`].
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("{message}")]
pub struct RecordedError {
    kind: ErrorKind,
    message: String,
    type_name: Option<String>,
    causes: Vec<RecordedError>,
}

impl RecordedError {
    /// Restores an error from its summary.
    pub fn from_summary(summary: &ErrorSummary) -> Self {
        Self {
            kind: summary.kind,
            message: summary.message.clone(),
            type_name: summary.type_name.clone(),
            causes: summary.causes.iter().map(Self::from_summary).collect(),
        }
    }

    /// Returns the kind of the original error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the type name of the original error, or its kind if none was recorded.
    pub fn type_name(&self) -> &str {
        self.type_name.as_deref().unwrap_or(self.kind.as_str())
    }

    /// Returns the nested errors of the original error.
    pub fn causes(&self) -> &[RecordedError] {
        &self.causes
    }

    fn summary(&self) -> ErrorSummary {
        let mut summary = ErrorSummary::new(self.kind, self.message.clone());
        summary.type_name = self.type_name.clone();
        summary.causes = self.causes.iter().map(Self::summary).collect();
        summary
    }
}

/// A recorded pairing of a description and the error raised while running it.
#[derive(Clone, Debug)]
pub struct Failure {
    description: Description,
    error: Arc<TestError>,
}

impl Failure {
    /// Creates a new failure.
    pub fn new(description: Description, error: TestError) -> Self {
        Self {
            description,
            error: Arc::new(error),
        }
    }

    /// Returns the description of the unit or group that failed.
    pub fn description(&self) -> &Description {
        &self.description
    }

    /// Returns the error.
    pub fn error(&self) -> &TestError {
        &self.error
    }

    /// Returns the error's message.
    pub fn message(&self) -> String {
        self.error.to_string()
    }

    /// Returns the header shown for this failure: the display name of the description.
    pub fn test_header(&self) -> &str {
        self.description.display_name()
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.description, self.error)
    }
}
