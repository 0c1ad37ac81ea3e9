// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{SharedStatement, Statement};
use crate::failure::{TestError, TestResult, WrongError};
use std::{borrow::Cow, error::Error, fmt, sync::Arc};
use trial_metadata::ErrorKind;

/// Describes the error a unit is expected to fail with.
#[derive(Clone)]
pub struct ExpectedError {
    name: Cow<'static, str>,
    matcher: Arc<dyn Fn(&TestError) -> bool + Send + Sync>,
}

impl ExpectedError {
    /// Matches errors satisfying a custom predicate. `name` is used in failure messages.
    pub fn new<F>(name: impl Into<Cow<'static, str>>, matcher: F) -> Self
    where
        F: Fn(&TestError) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            matcher: Arc::new(matcher),
        }
    }

    /// Matches errors of the given kind.
    pub fn kind(kind: ErrorKind) -> Self {
        Self::new(kind.as_str(), move |error| error.kind() == kind)
    }

    /// Matches unexpected errors whose underlying type is `E`.
    pub fn of_type<E: Error + 'static>() -> Self {
        Self::new(std::any::type_name::<E>(), |error| match error {
            TestError::Unexpected(error) => error.is::<E>(),
            _ => false,
        })
    }

    /// Matches panics whose message contains `needle`.
    pub fn panic_containing(needle: impl Into<String>) -> Self {
        let needle = needle.into();
        Self::new(format!("panic containing {needle:?}"), move |error| match error {
            TestError::Panicked(panic) => panic.message().contains(&needle),
            _ => false,
        })
    }

    /// Returns the name used for this expectation in failure messages.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if `error` satisfies this expectation.
    pub fn matches(&self, error: &TestError) -> bool {
        (self.matcher)(error)
    }
}

impl fmt::Debug for ExpectedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpectedError")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Succeeds only if the wrapped statement fails with the expected error.
///
/// Completing without an error and failing with a different error are both converted into a
/// [`WrongError`]. Assumption violations that don't match the expectation pass through unchanged.
pub struct ExpectError {
    next: SharedStatement,
    expected: ExpectedError,
}

impl ExpectError {
    /// Wraps `next` with the expectation.
    pub fn new(next: SharedStatement, expected: ExpectedError) -> Self {
        Self { next, expected }
    }
}

impl Statement for ExpectError {
    fn evaluate(&self) -> TestResult {
        match self.next.evaluate() {
            Ok(()) => Err(WrongError::NoError {
                expected: self.expected.name().to_owned(),
            }
            .into()),
            Err(error) if self.expected.matches(&error) => Ok(()),
            Err(error) if error.is_assumption_violation() => Err(error),
            Err(error) => Err(WrongError::Mismatch {
                expected: self.expected.name().to_owned(),
                actual: Box::new(error),
            }
            .into()),
        }
    }
}
