// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{Action, SharedStatement, Statement, catch_panic};
use crate::failure::{MultipleFailures, TestResult};

/// Runs setup actions before and teardown actions after the wrapped statement.
///
/// Setups run in order and the first one to fail aborts the statement: neither the wrapped
/// statement nor any teardown at this level runs. Otherwise every teardown runs, in order, even if
/// the wrapped statement or an earlier teardown failed. The errors raised are combined with
/// [`MultipleFailures::assert_empty`].
pub struct SetupTeardown {
    setups: Vec<Action>,
    next: SharedStatement,
    teardowns: Vec<Action>,
}

impl SetupTeardown {
    /// Wraps `next` with the given setup and teardown actions.
    pub fn new(setups: Vec<Action>, next: SharedStatement, teardowns: Vec<Action>) -> Self {
        Self {
            setups,
            next,
            teardowns,
        }
    }
}

impl Statement for SetupTeardown {
    fn evaluate(&self) -> TestResult {
        for setup in &self.setups {
            catch_panic(|| setup())?;
        }

        let mut errors = Vec::new();
        if let Err(error) = self.next.evaluate() {
            errors.push(error);
        }
        for teardown in &self.teardowns {
            if let Err(error) = catch_panic(|| teardown()) {
                errors.push(error);
            }
        }

        MultipleFailures::assert_empty(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assertions::fail,
        failure::TestError,
        statement::{action, statement},
    };
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Log(Arc<Mutex<Vec<&'static str>>>);

    impl Log {
        fn action(&self, name: &'static str, outcome: Option<&'static str>) -> Action {
            let log = self.clone();
            action(move || {
                log.0.lock().unwrap().push(name);
                match outcome {
                    Some(message) => fail(message),
                    None => Ok(()),
                }
            })
        }

        fn entries(&self) -> Vec<&'static str> {
            self.0.lock().unwrap().clone()
        }
    }

    #[test]
    fn runs_in_order() {
        let log = Log::default();
        let body = log.action("body", None);
        let stmt = SetupTeardown::new(
            vec![log.action("setup1", None), log.action("setup2", None)],
            statement(move || body()),
            vec![log.action("teardown1", None), log.action("teardown2", None)],
        );

        assert!(stmt.evaluate().is_ok());
        assert_eq!(
            log.entries(),
            ["setup1", "setup2", "body", "teardown1", "teardown2"],
        );
    }

    #[test]
    fn failing_setup_skips_body_and_teardowns() {
        let log = Log::default();
        let body = log.action("body", None);
        let stmt = SetupTeardown::new(
            vec![log.action("setup1", Some("no database")), log.action("setup2", None)],
            statement(move || body()),
            vec![log.action("teardown", None)],
        );

        let error = stmt.evaluate().unwrap_err();
        assert_eq!(error.to_string(), "no database");
        assert_eq!(log.entries(), ["setup1"]);
    }

    #[test]
    fn teardown_errors_are_collected() {
        let log = Log::default();
        let body = log.action("body", Some("body failed"));
        let stmt = SetupTeardown::new(
            vec![],
            statement(move || body()),
            vec![
                log.action("teardown1", Some("first teardown")),
                log.action("teardown2", None),
                log.action("teardown3", Some("third teardown")),
            ],
        );

        let error = stmt.evaluate().unwrap_err();
        assert_eq!(log.entries(), ["body", "teardown1", "teardown2", "teardown3"]);
        let TestError::Multiple(multiple) = error else {
            panic!("expected multiple failures, found {error:?}");
        };
        let messages: Vec<_> = multiple.errors().iter().map(|e| e.to_string()).collect();
        assert_eq!(messages, ["body failed", "first teardown", "third teardown"]);
    }

    #[test]
    fn panicking_teardown_is_a_failure() {
        let stmt = SetupTeardown::new(
            vec![],
            statement(|| Ok(())),
            vec![action(|| panic!("teardown exploded"))],
        );
        let error = stmt.evaluate().unwrap_err();
        assert!(matches!(error, TestError::Panicked(_)));
    }
}
