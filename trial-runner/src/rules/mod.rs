// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cross-cutting behavior applied around test statements.
//!
//! [`TestRule`] is the single extension point: a rule receives the statement built so far plus the
//! unit's [`Description`], and returns a replacement statement. The rules in this module are
//! ordinary implementations of that trait and get no special treatment from the
//! [`RuleChainBuilder`](crate::statement::RuleChainBuilder).
//!
//! Rules that expose state to the test body (for example [`TestName`] or [`ErrorCollector`]) are
//! cheap to clone, and clones share state. Register one clone with the unit and capture another in
//! the test body.

mod chain;
mod expected;
mod external_resource;
mod repeat;
mod stopwatch;
mod temp_dir;
mod test_name;
mod timeout;
mod verifier;
mod watcher;

pub use chain::*;
pub use expected::*;
pub use external_resource::*;
pub use repeat::*;
pub use stopwatch::*;
pub use temp_dir::*;
pub use test_name::*;
pub use timeout::*;
pub use verifier::*;
pub use watcher::*;

use crate::{description::Description, statement::SharedStatement};
use std::{fmt, sync::Arc};

/// Wraps a statement with additional behavior.
pub trait TestRule: Send + Sync {
    /// Returns the statement to evaluate in place of `base`.
    ///
    /// The returned statement may be `base` itself.
    fn apply(&self, base: SharedStatement, description: &Description) -> SharedStatement;
}

/// How close to the test body a rule is applied.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum RuleScope {
    /// Declared on the test unit itself. Applied innermost.
    Test,

    /// Declared on an enclosing group. Applied outside every test-scoped rule.
    Group,
}

/// A rule together with the scope it was declared at.
#[derive(Clone)]
pub struct ScopedRule {
    scope: RuleScope,
    rule: Arc<dyn TestRule>,
}

impl ScopedRule {
    /// Creates a test-scoped rule.
    pub fn test(rule: Arc<dyn TestRule>) -> Self {
        Self {
            scope: RuleScope::Test,
            rule,
        }
    }

    /// Creates a group-scoped rule.
    pub fn group(rule: Arc<dyn TestRule>) -> Self {
        Self {
            scope: RuleScope::Group,
            rule,
        }
    }

    /// Returns the scope.
    pub fn scope(&self) -> RuleScope {
        self.scope
    }

    /// Returns the rule.
    pub fn rule(&self) -> &Arc<dyn TestRule> {
        &self.rule
    }
}

impl fmt::Debug for ScopedRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedRule")
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}
