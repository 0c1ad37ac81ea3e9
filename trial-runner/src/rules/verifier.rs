// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::TestRule;
use crate::{
    assertions::assert_equals_with,
    description::Description,
    failure::{MultipleFailures, TestError, TestResult},
    helpers::lock,
    statement::{Action, SharedStatement, action, catch_panic, statement},
};
use std::{
    fmt,
    sync::{Arc, Mutex},
};

/// Runs a verification after a statement that completed successfully.
///
/// The verification is skipped if the statement failed, so that the original failure is reported.
#[derive(Clone)]
pub struct Verifier {
    verify: Action,
}

impl Verifier {
    /// Creates a verifier that runs `verify`.
    pub fn new<F>(verify: F) -> Self
    where
        F: Fn() -> TestResult + Send + Sync + 'static,
    {
        Self {
            verify: action(verify),
        }
    }
}

impl TestRule for Verifier {
    fn apply(&self, base: SharedStatement, _description: &Description) -> SharedStatement {
        let verify = self.verify.clone();
        statement(move || {
            base.evaluate()?;
            catch_panic(|| verify())
        })
    }
}

impl fmt::Debug for Verifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Verifier").finish_non_exhaustive()
    }
}

/// Collects several errors during a test and reports them together once it completes.
///
/// Clones share the same set of collected errors. Errors are drained after each evaluation, so a
/// collector may be reused across units.
///
/// ```
/// use trial_runner::{
///     description::Description,
///     rules::{ErrorCollector, TestRule},
///     statement::statement,
/// };
///
/// let collector = ErrorCollector::new();
/// let in_body = collector.clone();
/// let stmt = collector.apply(
///     statement(move || {
///         in_body.check_equals(1, 2);
///         in_body.check_equals("a", "a");
///         Ok(())
///     }),
///     &Description::leaf("collects"),
/// );
/// assert!(stmt.evaluate().is_err());
/// ```
#[derive(Clone, Default)]
pub struct ErrorCollector {
    errors: Arc<Mutex<Vec<TestError>>>,
}

impl ErrorCollector {
    /// Creates a collector with no errors.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an error, letting the test continue.
    pub fn add_error(&self, error: impl Into<TestError>) {
        lock(&self.errors).push(error.into());
    }

    /// Runs `check`, recording its error if it fails.
    pub fn check_succeeds<F>(&self, check: F)
    where
        F: FnOnce() -> TestResult,
    {
        if let Err(error) = catch_panic(check) {
            self.add_error(error);
        }
    }

    /// Records an assertion error if `expected` and `actual` differ.
    pub fn check_equals<T>(&self, expected: T, actual: T)
    where
        T: PartialEq + fmt::Debug,
    {
        if let Err(error) = assert_equals_with("", expected, actual) {
            self.add_error(error);
        }
    }

    /// Returns the number of errors collected so far.
    pub fn error_count(&self) -> usize {
        lock(&self.errors).len()
    }

    fn verify(&self) -> TestResult {
        let errors = std::mem::take(&mut *lock(&self.errors));
        MultipleFailures::assert_empty(errors)
    }
}

impl TestRule for ErrorCollector {
    fn apply(&self, base: SharedStatement, _description: &Description) -> SharedStatement {
        let collector = self.clone();
        statement(move || {
            let result = base.evaluate();
            let verified = collector.verify();
            // A failure of the body takes precedence over collected errors.
            result?;
            verified
        })
    }
}

impl fmt::Debug for ErrorCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorCollector")
            .field("error_count", &self.error_count())
            .finish()
    }
}
