// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::TestRule;
use crate::{
    description::Description,
    failure::{MultipleFailures, TestResult},
    statement::{Action, SharedStatement, action, catch_panic, statement},
};
use std::fmt;

/// Sets up an external resource before a statement and tears it down afterwards.
///
/// If the `before` hook fails, neither the statement nor the `after` hook runs. Otherwise `after`
/// always runs, and its error is collected together with the statement's.
#[derive(Clone)]
pub struct ExternalResource {
    before: Option<Action>,
    after: Option<Action>,
}

impl ExternalResource {
    /// Creates a resource with both hooks.
    pub fn new<B, A>(before: B, after: A) -> Self
    where
        B: Fn() -> TestResult + Send + Sync + 'static,
        A: Fn() -> TestResult + Send + Sync + 'static,
    {
        Self {
            before: Some(action(before)),
            after: Some(action(after)),
        }
    }

    /// Creates a resource with only a `before` hook.
    pub fn before<B>(before: B) -> Self
    where
        B: Fn() -> TestResult + Send + Sync + 'static,
    {
        Self {
            before: Some(action(before)),
            after: None,
        }
    }

    /// Creates a resource with only an `after` hook.
    pub fn after<A>(after: A) -> Self
    where
        A: Fn() -> TestResult + Send + Sync + 'static,
    {
        Self {
            before: None,
            after: Some(action(after)),
        }
    }

    /// Replaces the `after` hook.
    pub fn with_after<A>(mut self, after: A) -> Self
    where
        A: Fn() -> TestResult + Send + Sync + 'static,
    {
        self.after = Some(action(after));
        self
    }
}

impl TestRule for ExternalResource {
    fn apply(&self, base: SharedStatement, _description: &Description) -> SharedStatement {
        let before = self.before.clone();
        let after = self.after.clone();
        statement(move || {
            if let Some(before) = &before {
                catch_panic(|| before())?;
            }

            let mut errors = Vec::new();
            if let Err(error) = base.evaluate() {
                errors.push(error);
            }
            if let Some(after) = &after {
                if let Err(error) = catch_panic(|| after()) {
                    errors.push(error);
                }
            }
            MultipleFailures::assert_empty(errors)
        })
    }
}

impl fmt::Debug for ExternalResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalResource")
            .field("before", &self.before.is_some())
            .field("after", &self.after.is_some())
            .finish()
    }
}
