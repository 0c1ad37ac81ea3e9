// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::TestRule;
use crate::{description::Description, statement::SharedStatement};
use std::{fmt, sync::Arc};

/// Orders several rules explicitly.
///
/// The first rule added is the outermost: it sees the statement produced by every rule added after
/// it.
///
/// ```
/// use std::sync::Arc;
/// use trial_runner::rules::{ExternalResource, RuleChain, TestName};
///
/// let chain = RuleChain::outer_rule(Arc::new(ExternalResource::before(|| Ok(()))))
///     .around(Arc::new(TestName::new()));
/// assert_eq!(chain.len(), 2);
/// ```
#[derive(Clone, Default)]
pub struct RuleChain {
    // Outermost first.
    rules: Vec<Arc<dyn TestRule>>,
}

impl RuleChain {
    /// Creates an empty chain, which applies no behavior.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a chain whose outermost rule is `rule`.
    pub fn outer_rule(rule: Arc<dyn TestRule>) -> Self {
        Self { rules: vec![rule] }
    }

    /// Adds `rule` inside every rule already in the chain.
    pub fn around(mut self, rule: Arc<dyn TestRule>) -> Self {
        self.rules.push(rule);
        self
    }

    /// Returns the number of rules in the chain.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if the chain has no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl TestRule for RuleChain {
    fn apply(&self, base: SharedStatement, description: &Description) -> SharedStatement {
        self.rules
            .iter()
            .rev()
            .fold(base, |statement, rule| rule.apply(statement, description))
    }
}

impl fmt::Debug for RuleChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleChain")
            .field("len", &self.rules.len())
            .finish()
    }
}
