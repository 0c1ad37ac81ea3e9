// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{Action, ExpectError, ExpectedError, SetupTeardown, SharedStatement};
use crate::{
    description::Description,
    rules::{RuleScope, ScopedRule},
    timeout::FailOnTimeout,
};
use debug_ignore::DebugIgnore;
use std::{sync::Arc, time::Duration};

/// Composes the statement that runs one test unit.
///
/// Starting from the raw invocation, layers are wrapped from the inside out in this order:
///
/// 1. the raw invocation (the base statement passed to [`build`](Self::build));
/// 2. the expected-error check, if configured;
/// 3. setup and teardown actions, if any;
/// 4. rules: test-scoped rules innermost, then group-scoped rules, each in declaration order;
/// 5. the deadline, if a timeout is configured.
#[derive(Clone, Debug)]
pub struct RuleChainBuilder {
    description: Description,
    setups: DebugIgnore<Vec<Action>>,
    teardowns: DebugIgnore<Vec<Action>>,
    rules: Vec<ScopedRule>,
    expected: Option<ExpectedError>,
    timeout: Option<Duration>,
}

impl RuleChainBuilder {
    /// Creates a builder for the unit described by `description`.
    pub fn new(description: Description) -> Self {
        Self {
            description,
            setups: DebugIgnore(Vec::new()),
            teardowns: DebugIgnore(Vec::new()),
            rules: Vec::new(),
            expected: None,
            timeout: None,
        }
    }

    /// Appends setup actions.
    pub fn setups(mut self, setups: impl IntoIterator<Item = Action>) -> Self {
        self.setups.extend(setups);
        self
    }

    /// Appends teardown actions.
    pub fn teardowns(mut self, teardowns: impl IntoIterator<Item = Action>) -> Self {
        self.teardowns.extend(teardowns);
        self
    }

    /// Appends rules.
    pub fn rules(mut self, rules: impl IntoIterator<Item = ScopedRule>) -> Self {
        self.rules.extend(rules);
        self
    }

    /// Sets the error the unit is expected to fail with.
    pub fn expected(mut self, expected: Option<ExpectedError>) -> Self {
        self.expected = expected;
        self
    }

    /// Sets the deadline for the whole chain.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the description of the unit.
    pub fn description(&self) -> &Description {
        &self.description
    }

    /// Wraps `base` into the final statement for the unit.
    pub fn build(&self, base: SharedStatement) -> SharedStatement {
        let mut statement = base;

        if let Some(expected) = &self.expected {
            statement = Arc::new(ExpectError::new(statement, expected.clone()));
        }

        if !self.setups.is_empty() || !self.teardowns.is_empty() {
            statement = Arc::new(SetupTeardown::new(
                self.setups.to_vec(),
                statement,
                self.teardowns.to_vec(),
            ));
        }

        for scope in [RuleScope::Test, RuleScope::Group] {
            for scoped in self.rules.iter().filter(|rule| rule.scope() == scope) {
                statement = scoped.rule().apply(statement, &self.description);
            }
        }

        if let Some(timeout) = self.timeout {
            statement = Arc::new(FailOnTimeout::new(
                statement,
                timeout,
                self.description.display_name(),
            ));
        }

        statement
    }
}
