// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runs the nodes of a plan.
//!
//! Units run through the statement built by [`TestUnit::statement`]. Groups run their children
//! inside a statement of their own, so that group setups, teardowns and rules wrap the children
//! exactly the way unit-level ones wrap a test body.

use crate::{
    config::ParallelMode,
    description::Description,
    failure::{Failure, MultipleFailures, TestError},
    plan::{ErrorNode, TestGroup, TestNode, TestUnit},
    reporter::RunScope,
    rules::ScopedRule,
    statement::{SetupTeardown, SharedStatement, catch_panic, statement},
    timeout::CancellationToken,
};
use rayon::{ThreadPool, prelude::*};
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use tracing::{debug, warn};

/// State shared by every node of one run.
#[derive(Clone, Debug)]
pub(super) struct ExecutorContext {
    notifier: RunScope,
    pool: Option<Arc<ThreadPool>>,
    parallel: ParallelMode,
    default_timeout: Option<Duration>,
    fail_fast: bool,
    // Set once a stop request keeps a unit or group from starting.
    stopped: Arc<AtomicBool>,
    // Deadlines of the enclosing groups. Once any of them elapses, no further children start.
    deadlines: Vec<CancellationToken>,
}

impl ExecutorContext {
    pub(super) fn new(
        notifier: RunScope,
        pool: Option<Arc<ThreadPool>>,
        parallel: ParallelMode,
        default_timeout: Option<Duration>,
        fail_fast: bool,
    ) -> Self {
        Self {
            notifier,
            pool,
            parallel,
            default_timeout,
            fail_fast,
            stopped: Arc::new(AtomicBool::new(false)),
            deadlines: Vec::new(),
        }
    }

    pub(super) fn was_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Runs `nodes`, concurrently on the pool if `concurrent` is set and a pool exists.
    ///
    /// `inherited` holds the unit rules of the enclosing groups, innermost group first.
    pub(super) fn run_nodes(&self, nodes: &[TestNode], inherited: &[ScopedRule], concurrent: bool) {
        match &self.pool {
            Some(pool) if concurrent && nodes.len() > 1 => pool.install(|| {
                nodes
                    .par_iter()
                    .for_each(|node| self.run_node(node, inherited));
            }),
            _ => {
                for node in nodes {
                    if self.is_abandoned() {
                        break;
                    }
                    self.run_node(node, inherited);
                }
            }
        }
    }

    // True if an enclosing group timed out, or the run this context belongs to is over.
    fn is_abandoned(&self) -> bool {
        self.deadlines.iter().any(CancellationToken::is_cancelled) || self.notifier.is_over()
    }

    fn run_node(&self, node: &TestNode, inherited: &[ScopedRule]) {
        if self.is_abandoned() {
            debug!("not starting {}: run abandoned", node.description());
            return;
        }
        match node {
            TestNode::Unit(unit) => self.run_unit(unit, inherited),
            TestNode::Group(group) => self.run_group(group, inherited),
            TestNode::Error(error) => self.run_error(error),
        }
    }

    fn run_unit(&self, unit: &TestUnit, inherited: &[ScopedRule]) {
        let description = unit.description();
        if unit.is_ignored() {
            debug!("ignoring {description}");
            self.notifier.fire_ignored(description, unit.ignore_reason());
            return;
        }
        if let Err(errors) = unit.validate() {
            self.run_error(&ErrorNode::new(description.display_name(), errors));
            return;
        }
        if !self.start(description) {
            return;
        }

        let statement = unit.statement(inherited, self.default_timeout);
        if let Err(error) = catch_panic(|| statement.evaluate()) {
            self.report(description, error);
        }
        self.notifier.fire_unit_finished(description);
    }

    fn run_group(&self, group: &TestGroup, inherited: &[ScopedRule]) {
        if self.notifier.is_stop_requested() {
            self.stopped.store(true, Ordering::SeqCst);
            return;
        }

        let inherited: Arc<[ScopedRule]> = group
            .unit_rules()
            .iter()
            .chain(inherited)
            .cloned()
            .collect();
        let children = {
            let context = self.clone();
            let children = group.children().to_vec();
            let concurrent = self.parallel.children_concurrent();
            statement(move || {
                let mut context = context.clone();
                // A group rule may have moved the children onto a thread with a deadline.
                if let Some(token) = CancellationToken::current() {
                    if !context.deadlines.contains(&token) {
                        context.deadlines.push(token);
                    }
                }
                context.run_nodes(&children, &inherited, concurrent);
                Ok(())
            })
        };

        let mut group_statement: SharedStatement =
            if group.setups().is_empty() && group.teardowns().is_empty() {
                children
            } else {
                Arc::new(SetupTeardown::new(
                    group.setups().to_vec(),
                    children,
                    group.teardowns().to_vec(),
                ))
            };
        for rule in group.rules() {
            group_statement = rule.apply(group_statement, group.description());
        }

        if let Err(error) = catch_panic(|| group_statement.evaluate()) {
            // Failures around the group as a whole are reported against the group itself.
            self.report(group.description(), error);
        }
    }

    fn run_error(&self, error: &ErrorNode) {
        let description = error.description();
        if !self.start(description) {
            return;
        }
        let errors = error.errors().iter().cloned().map(TestError::from).collect();
        if let Err(error) = MultipleFailures::assert_empty(errors) {
            self.report(description, error);
        }
        self.notifier.fire_unit_finished(description);
    }

    fn start(&self, description: &Description) -> bool {
        match self.notifier.fire_unit_started(description) {
            Ok(()) => true,
            Err(_) => {
                debug!("not starting {description}: stop requested");
                self.stopped.store(true, Ordering::SeqCst);
                false
            }
        }
    }

    fn report(&self, description: &Description, error: TestError) {
        let failure = Failure::new(description.clone(), error);
        if failure.error().is_assumption_violation() {
            debug!("{failure}");
            self.notifier.fire_assumption_failed(failure);
        } else {
            self.notifier.fire_failure(failure);
            if self.fail_fast && !self.notifier.is_stop_requested() {
                warn!("stopping run after first failure (fail-fast is set)");
                self.notifier.request_stop();
            }
        }
    }
}
