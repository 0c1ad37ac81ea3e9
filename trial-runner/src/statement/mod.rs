// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Composable units of executable behavior.
//!
//! A [`Statement`] has one contract: evaluate, or raise. Setup and teardown actions, expected
//! errors, rules and deadlines are all expressed as statements that wrap exactly one inner
//! statement; the [`RuleChainBuilder`] composes them in a fixed order around the raw invocation of
//! a test body.

mod chain;
mod expect;
mod setup;

pub use chain::*;
pub use expect::*;
pub use setup::*;

use crate::{
    failure::{PanicError, TestResult},
    helpers::panic_message,
};
use std::{
    fmt,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};

/// A single composable unit of executable behavior.
pub trait Statement: Send + Sync {
    /// Runs the statement, returning the single error it raised, if any.
    fn evaluate(&self) -> TestResult;
}

impl<F> Statement for F
where
    F: Fn() -> TestResult + Send + Sync,
{
    fn evaluate(&self) -> TestResult {
        self()
    }
}

/// A shared, type-erased statement.
pub type SharedStatement = Arc<dyn Statement>;

/// A shared test body, setup or teardown action.
pub type Action = Arc<dyn Fn() -> TestResult + Send + Sync>;

/// Creates a [`SharedStatement`] from a closure.
pub fn statement<F>(f: F) -> SharedStatement
where
    F: Fn() -> TestResult + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Creates an [`Action`] from a closure.
pub fn action<F>(f: F) -> Action
where
    F: Fn() -> TestResult + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Runs `f`, converting a panic into [`TestError::Panicked`](crate::failure::TestError::Panicked).
pub fn catch_panic<F>(f: F) -> TestResult
where
    F: FnOnce() -> TestResult,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(PanicError::new(panic_message(&*payload)).into()),
    }
}

/// The innermost statement: invokes a test body.
#[derive(Clone)]
pub struct Invoke {
    action: Action,
}

impl Invoke {
    /// Creates a statement that invokes `action`.
    pub fn new(action: Action) -> Self {
        Self { action }
    }
}

impl Statement for Invoke {
    fn evaluate(&self) -> TestResult {
        catch_panic(|| (self.action)())
    }
}

impl fmt::Debug for Invoke {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invoke").finish_non_exhaustive()
    }
}
