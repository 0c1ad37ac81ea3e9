// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::TestRule;
use crate::{
    description::Description,
    helpers::lock,
    statement::{SharedStatement, statement},
};
use std::sync::{Arc, Mutex};

/// Makes the name of the running unit available to the test body.
///
/// The name is the method part of the unit's display name (`method` for `method(Class)`), or the
/// whole display name for units without a class.
#[derive(Clone, Debug, Default)]
pub struct TestName {
    name: Arc<Mutex<Option<String>>>,
}

impl TestName {
    /// Creates a rule with no name set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the name of the unit currently running, or `None` outside of a run.
    pub fn method_name(&self) -> Option<String> {
        lock(&self.name).clone()
    }
}

impl TestRule for TestName {
    fn apply(&self, base: SharedStatement, description: &Description) -> SharedStatement {
        let slot = self.name.clone();
        let name = description
            .method_name()
            .unwrap_or_else(|| description.display_name())
            .to_owned();
        statement(move || {
            *lock(&slot) = Some(name.clone());
            base.evaluate()
        })
    }
}
