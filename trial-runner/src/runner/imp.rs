// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::executor::ExecutorContext;
use crate::{
    config::{JunitConfig, ParallelMode, RunnerProfile, TestThreads},
    errors::{RunStopped, TestRunnerBuildError},
    plan::TestPlan,
    reporter::{JunitAggregator, RunListener, RunNotifier},
    result::RunResult,
};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::{sync::Arc, time::Duration};
use tracing::{debug, info};

/// Test runner options.
#[derive(Debug, Default)]
pub struct TestRunnerBuilder {
    test_threads: Option<TestThreads>,
    parallel: ParallelMode,
    default_timeout: Option<Duration>,
    fail_fast: bool,
    junit: Option<JunitConfig>,
}

impl TestRunnerBuilder {
    /// Creates a builder with the settings of `profile`.
    pub fn from_profile(profile: &RunnerProfile) -> Self {
        Self {
            test_threads: Some(profile.test_threads()),
            parallel: profile.parallel(),
            default_timeout: profile.default_timeout(),
            fail_fast: profile.fail_fast(),
            junit: profile.junit().cloned(),
        }
    }

    /// Sets the number of threads used to run units concurrently.
    ///
    /// Only used if the parallel mode is not [`ParallelMode::None`].
    pub fn set_test_threads(&mut self, test_threads: TestThreads) -> &mut Self {
        self.test_threads = Some(test_threads);
        self
    }

    /// Sets which nodes of the plan run concurrently.
    pub fn set_parallel(&mut self, parallel: ParallelMode) -> &mut Self {
        self.parallel = parallel;
        self
    }

    /// Sets the deadline for units that don't configure their own.
    pub fn set_default_timeout(&mut self, timeout: Option<Duration>) -> &mut Self {
        self.default_timeout = timeout;
        self
    }

    /// If set, the first failure requests a stop.
    pub fn set_fail_fast(&mut self, fail_fast: bool) -> &mut Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Sets where to write a JUnit report, if anywhere.
    pub fn set_junit(&mut self, junit: Option<JunitConfig>) -> &mut Self {
        self.junit = junit;
        self
    }

    /// Creates a new test runner.
    pub fn build(self) -> Result<TestRunner, TestRunnerBuildError> {
        let pool = if self.parallel.top_level_concurrent() {
            let threads = self.test_threads.unwrap_or(TestThreads::NumCpus).compute();
            let pool = ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(|idx| format!("trial-run-{idx}"))
                .build()
                .map_err(|error| TestRunnerBuildError::ThreadPool { threads, error })?;
            debug!(threads, "created thread pool");
            Some(Arc::new(pool))
        } else {
            None
        };

        Ok(TestRunner {
            pool,
            parallel: self.parallel,
            default_timeout: self.default_timeout,
            fail_fast: self.fail_fast,
            junit: self.junit,
        })
    }
}

/// Context for running units.
///
/// Created using [`TestRunnerBuilder::build`].
#[derive(Debug)]
pub struct TestRunner {
    pool: Option<Arc<ThreadPool>>,
    parallel: ParallelMode,
    default_timeout: Option<Duration>,
    fail_fast: bool,
    junit: Option<JunitConfig>,
}

impl TestRunner {
    /// Runs every node of `plan` with a fresh notifier.
    pub fn run(&self, plan: &TestPlan) -> Result<RunResult, RunStopped> {
        self.run_with(plan, &Arc::new(RunNotifier::new()))
    }

    /// Runs every node of `plan`, firing events through `notifier`.
    ///
    /// Listeners already subscribed to `notifier` observe the run. The result listener is
    /// subscribed ahead of them for the duration of the run, so the result is up to date by the
    /// time they see an event.
    ///
    /// Returns [`RunStopped`] with the partial result if a stop request kept any unit from
    /// starting.
    pub fn run_with(
        &self,
        plan: &TestPlan,
        notifier: &Arc<RunNotifier>,
    ) -> Result<RunResult, RunStopped> {
        let result = RunResult::new();
        let result_listener = result.listener();
        notifier.subscribe_first(result_listener.clone());

        let junit_listener = self.junit.as_ref().map(|config| {
            let listener: Arc<dyn RunListener> = Arc::new(JunitAggregator::new(config.clone()));
            notifier.subscribe(listener.clone());
            listener
        });

        info!(
            units = plan.unit_count(),
            parallel = %self.parallel,
            "starting run of {}",
            plan.description(),
        );
        let scope = notifier.begin_run();
        scope.fire_run_started(plan.description());

        let context = ExecutorContext::new(
            scope.clone(),
            self.pool.clone(),
            self.parallel,
            self.default_timeout,
            self.fail_fast,
        );
        context.run_nodes(plan.nodes(), &[], self.parallel.top_level_concurrent());

        scope.finish(&result);
        notifier.unsubscribe(&result_listener);
        if let Some(listener) = &junit_listener {
            notifier.unsubscribe(listener);
        }

        info!(
            run = result.run_count(),
            failed = result.failure_count(),
            ignored = result.ignore_count(),
            "finished run in {:?}",
            result.run_time(),
        );

        if context.was_stopped() {
            Err(RunStopped::new(result))
        } else {
            Ok(result)
        }
    }
}
