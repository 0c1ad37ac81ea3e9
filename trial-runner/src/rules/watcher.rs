// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::TestRule;
use crate::{
    description::Description,
    failure::{MultipleFailures, TestError, TestResult},
    statement::{SharedStatement, catch_panic, statement},
};
use std::{fmt, sync::Arc};

/// Callbacks invoked as a watched statement runs.
///
/// Every method defaults to doing nothing. A callback that returns an error (or panics) doesn't
/// stop the remaining callbacks: its error is reported together with the statement's own.
pub trait TestWatcher: Send + Sync {
    /// Called before the statement runs.
    fn starting(&self, _description: &Description) -> TestResult {
        Ok(())
    }

    /// Called when the statement completes successfully.
    fn succeeded(&self, _description: &Description) -> TestResult {
        Ok(())
    }

    /// Called when the statement fails with anything other than an assumption violation.
    fn failed(&self, _error: &TestError, _description: &Description) -> TestResult {
        Ok(())
    }

    /// Called when the statement fails with an assumption violation.
    fn skipped(&self, _error: &TestError, _description: &Description) -> TestResult {
        Ok(())
    }

    /// Called after every other callback.
    fn finished(&self, _description: &Description) -> TestResult {
        Ok(())
    }
}

/// Applies a [`TestWatcher`] to statements.
#[derive(Clone)]
pub struct Watch {
    watcher: Arc<dyn TestWatcher>,
}

impl Watch {
    /// Creates a rule that reports to `watcher`.
    pub fn new(watcher: Arc<dyn TestWatcher>) -> Self {
        Self { watcher }
    }
}

impl TestRule for Watch {
    fn apply(&self, base: SharedStatement, description: &Description) -> SharedStatement {
        let watcher = self.watcher.clone();
        let description = description.clone();
        statement(move || {
            let mut errors = Vec::new();
            collect(&mut errors, catch_panic(|| watcher.starting(&description)));
            match base.evaluate() {
                Ok(()) => collect(&mut errors, catch_panic(|| watcher.succeeded(&description))),
                Err(error) => {
                    let outcome = if error.is_assumption_violation() {
                        catch_panic(|| watcher.skipped(&error, &description))
                    } else {
                        catch_panic(|| watcher.failed(&error, &description))
                    };
                    // The statement's own error is reported first.
                    errors.insert(0, error);
                    collect(&mut errors, outcome);
                }
            }
            collect(&mut errors, catch_panic(|| watcher.finished(&description)));

            MultipleFailures::assert_empty(errors)
        })
    }
}

fn collect(errors: &mut Vec<TestError>, result: TestResult) {
    if let Err(error) = result {
        errors.push(error);
    }
}

impl fmt::Debug for Watch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watch").finish_non_exhaustive()
    }
}
