// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::TestRule;
use crate::{description::Description, statement::SharedStatement, timeout::FailOnTimeout};
use std::{sync::Arc, time::Duration};

/// Applies a deadline to statements, as a rule.
///
/// Unlike the per-unit timeout, this can be declared once on a group to bound each of its units.
/// A zero duration disables the deadline.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Timeout {
    timeout: Duration,
}

impl Timeout {
    /// Creates a rule with the given deadline.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Creates a rule with a deadline in milliseconds.
    pub fn millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    /// Creates a rule with a deadline in seconds.
    pub fn seconds(seconds: u64) -> Self {
        Self::new(Duration::from_secs(seconds))
    }

    /// Returns the deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl TestRule for Timeout {
    fn apply(&self, base: SharedStatement, description: &Description) -> SharedStatement {
        if self.timeout.is_zero() {
            return base;
        }
        Arc::new(FailOnTimeout::new(
            base,
            self.timeout,
            description.display_name(),
        ))
    }
}
