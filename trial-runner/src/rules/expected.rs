// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::TestRule;
use crate::{
    description::Description,
    failure::WrongError,
    helpers::lock,
    statement::{ExpectedError, SharedStatement, statement},
};
use itertools::Itertools;
use std::sync::{Arc, Mutex};

/// Expects the test body to fail with a given error, configured from within the body.
///
/// Until [`expect`](Self::expect) or [`expect_message_containing`](Self::expect_message_containing)
/// is called, statements run unchanged. Once expectations are set, the statement must fail with an
/// error matching all of them. Expectations are cleared after every evaluation.
///
/// ```
/// use trial_runner::{
///     assertions::fail,
///     description::Description,
///     rules::{ExpectedException, TestRule},
///     statement::statement,
/// };
///
/// let thrown = ExpectedException::none();
/// let in_body = thrown.clone();
/// let stmt = thrown.apply(
///     statement(move || {
///         in_body.expect_message_containing("negative");
///         fail("negative input")
///     }),
///     &Description::leaf("expects"),
/// );
/// assert!(stmt.evaluate().is_ok());
/// ```
#[derive(Clone, Debug, Default)]
pub struct ExpectedException {
    expected: Arc<Mutex<Vec<ExpectedError>>>,
}

impl ExpectedException {
    /// Creates a rule with no expectations.
    pub fn none() -> Self {
        Self::default()
    }

    /// Adds an expectation on the error.
    pub fn expect(&self, expected: ExpectedError) {
        lock(&self.expected).push(expected);
    }

    /// Expects the error's message to contain `substring`.
    pub fn expect_message_containing(&self, substring: impl Into<String>) {
        let substring = substring.into();
        self.expect(ExpectedError::new(
            format!("message containing {substring:?}"),
            move |error| error.to_string().contains(&substring),
        ));
    }

    /// Returns true if any expectation is set.
    pub fn is_any_expected(&self) -> bool {
        !lock(&self.expected).is_empty()
    }
}

impl TestRule for ExpectedException {
    fn apply(&self, base: SharedStatement, _description: &Description) -> SharedStatement {
        let slot = self.expected.clone();
        statement(move || {
            let result = base.evaluate();
            let expected = std::mem::take(&mut *lock(&slot));
            if expected.is_empty() {
                return result;
            }

            let name = expected.iter().map(|e| e.name()).join(" and ");
            match result {
                Ok(()) => Err(WrongError::NoError { expected: name }.into()),
                Err(error) if expected.iter().all(|e| e.matches(&error)) => Ok(()),
                Err(error) if error.is_assumption_violation() => Err(error),
                Err(error) => Err(WrongError::Mismatch {
                    expected: name,
                    actual: Box::new(error),
                }
                .into()),
            }
        })
    }
}
