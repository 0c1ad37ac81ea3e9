// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by the runner infrastructure.
//!
//! Errors raised by test code itself are [`TestError`](crate::failure::TestError)s, defined in the
//! [`failure`](crate::failure) module.

use crate::{result::RunResult, test_filter::Filter};
use camino::Utf8PathBuf;
use config::ConfigError;
use thiserror::Error;

/// An error that occurred while parsing the config.
#[derive(Debug, Error)]
#[error("failed to parse trial config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    kind: ConfigParseErrorKind,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, kind: ConfigParseErrorKind) -> Self {
        Self {
            config_file: config_file.into(),
            kind,
        }
    }

    /// Returns the config file for this error.
    pub fn config_file(&self) -> &Utf8PathBuf {
        &self.config_file
    }

    /// Returns the kind of error this is.
    pub fn kind(&self) -> &ConfigParseErrorKind {
        &self.kind
    }
}

/// The kind of error that occurred while parsing a config.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigParseErrorKind {
    /// An error occurred while building the config.
    #[error(transparent)]
    BuildError(Box<ConfigError>),

    /// An error occurred while deserializing the config.
    #[error(transparent)]
    DeserializeError(Box<serde_path_to_error::Error<ConfigError>>),
}

/// An error which indicates that a profile was requested but not known to trial.
#[derive(Clone, Debug, Error)]
#[error("profile `{profile}` not found (known profiles: {})", .all_profiles.join(", "))]
pub struct ProfileNotFound {
    profile: String,
    all_profiles: Vec<String>,
}

impl ProfileNotFound {
    pub(crate) fn new(
        profile: impl Into<String>,
        all_profiles: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let mut all_profiles: Vec<_> = all_profiles.into_iter().map(|s| s.into()).collect();
        all_profiles.sort_unstable();
        Self {
            profile: profile.into(),
            all_profiles,
        }
    }

    /// Returns the profile that was requested.
    pub fn profile(&self) -> &str {
        &self.profile
    }
}

/// Error returned while parsing a [`TestThreads`](crate::config::TestThreads) value.
#[derive(Clone, Debug, Error)]
#[error("unrecognized value for test-threads: {input}")]
pub struct TestThreadsParseError {
    input: String,
}

impl TestThreadsParseError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// Error returned while parsing a [`ParallelMode`](crate::config::ParallelMode) value.
#[derive(Clone, Debug, Error)]
#[error(
    "unrecognized value for parallel: {input}\n(known values: {})",
    crate::config::ParallelMode::variants().join(", "),
)]
pub struct ParallelModeParseError {
    input: String,
}

impl ParallelModeParseError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// A negative repeat count was passed to [`Repeat::new`](crate::plan::Repeat::new).
#[derive(Clone, Copy, Debug, Error, Eq, PartialEq)]
#[error("repeat count must be 0 or greater, found {times}")]
pub struct RepeatCountError {
    times: i64,
}

impl RepeatCountError {
    pub(crate) fn new(times: i64) -> Self {
        Self { times }
    }

    /// Returns the count that was rejected.
    pub fn times(&self) -> i64 {
        self.times
    }
}

/// No test units remained after filtering a plan.
#[derive(Clone, Debug, Error)]
#[error("no tests remain after applying filter: {filter}")]
pub struct NoTestsRemain {
    filter: String,
}

impl NoTestsRemain {
    pub(crate) fn new(filter: &dyn Filter) -> Self {
        Self {
            filter: filter.describe(),
        }
    }
}

/// The notifier refused to start a unit because a stop was requested.
///
/// Returned by [`RunNotifier::fire_unit_started`](crate::reporter::RunNotifier::fire_unit_started).
#[derive(Clone, Copy, Debug, Default, Error, Eq, PartialEq)]
#[error("test run stopped by user request")]
pub struct StoppedByUser;

/// A run was stopped before all units were attempted.
///
/// The result of the units that did run is available through [`Self::partial_result`].
#[derive(Clone, Debug, Error)]
#[error("test run stopped by user request after {} units", .result.run_count())]
pub struct RunStopped {
    result: RunResult,
}

impl RunStopped {
    pub(crate) fn new(result: RunResult) -> Self {
        Self { result }
    }

    /// Returns the result of the units that ran before the stop.
    pub fn partial_result(&self) -> &RunResult {
        &self.result
    }

    /// Consumes self and returns the partial result.
    pub fn into_partial_result(self) -> RunResult {
        self.result
    }
}

/// An error that occurred while building a [`TestRunner`](crate::runner::TestRunner).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TestRunnerBuildError {
    /// The thread pool used for parallel execution could not be created.
    #[error("error creating thread pool with {threads} threads")]
    ThreadPool {
        /// The number of threads requested.
        threads: usize,

        /// The underlying error.
        #[source]
        error: rayon::ThreadPoolBuildError,
    },
}

/// An error that occurs while writing an event to an output.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WriteEventError {
    /// An error occurred while operating on the file system.
    #[error("error operating on path {file}")]
    Fs {
        /// The file being operated on.
        file: Utf8PathBuf,

        /// The underlying IO error.
        #[source]
        error: std::io::Error,
    },

    /// An error occurred while producing JUnit XML.
    #[error("error writing JUnit output to {file}")]
    Junit {
        /// The output file.
        file: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: quick_junit::SerializeError,
    },
}

/// An argument of a theory could not be retrieved with the requested type.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[non_exhaustive]
pub enum ArgumentError {
    /// The index was past the end of the argument list.
    #[error("argument index {index} out of range (theory has {len} parameters)")]
    OutOfRange {
        /// The index that was requested.
        index: usize,

        /// The number of arguments.
        len: usize,
    },

    /// The argument was null but a value was requested.
    #[error("argument {index} is null")]
    Null {
        /// The index of the argument.
        index: usize,
    },

    /// The argument has a different type from the requested one.
    #[error("argument {index} is of type `{actual}`, not `{expected}`")]
    WrongType {
        /// The index of the argument.
        index: usize,

        /// The type that was requested.
        expected: &'static str,

        /// The type of the argument.
        actual: &'static str,
    },
}

/// A data point could not be produced for a theory parameter.
///
/// Candidates that fail this way are skipped rather than reported.
#[derive(Debug, Error)]
#[error("could not generate value for `{name}`")]
pub struct CouldNotGenerateValue {
    name: String,
    #[source]
    error: Option<crate::failure::BoxError>,
}

impl CouldNotGenerateValue {
    pub(crate) fn new(name: impl Into<String>, error: Option<crate::failure::BoxError>) -> Self {
        Self {
            name: name.into(),
            error,
        }
    }

    /// Returns the name of the data point that failed.
    pub fn name(&self) -> &str {
        &self.name
    }
}
