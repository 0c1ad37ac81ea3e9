// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for trial, a composable unit-test execution engine.
//!
//! The basic flow of a run is:
//!
//! 1. A front-end registers test units and groups into a [`TestPlan`](plan::TestPlan), optionally
//!    filtering and sorting it through its [`Description`](description::Description) tree.
//! 2. A [`TestRunner`](runner::TestRunner) composes each unit's setup and teardown actions, rules,
//!    expected-error check and deadline into one [`Statement`](statement::Statement) with the
//!    [`RuleChainBuilder`](statement::RuleChainBuilder). Theories are driven by the
//!    [theory engine](theory) instead, once per assignment of data points, and
//!    [`Parameterized`](plan::Parameterized) classes expand into one group per parameter set.
//! 3. Lifecycle events are broadcast through a [`RunNotifier`](reporter::RunNotifier) to any
//!    subscribed [`RunListener`](reporter::RunListener)s, one of which aggregates the
//!    [`RunResult`](result::RunResult) returned at the end.

pub mod assertions;
pub mod config;
pub mod description;
pub mod errors;
pub mod failure;
mod helpers;
pub mod output;
pub mod plan;
pub mod reporter;
pub mod result;
pub mod rules;
pub mod runner;
pub mod statement;
pub mod test_filter;
pub mod theory;
mod time;
pub mod timeout;
