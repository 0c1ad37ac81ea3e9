// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The aggregate outcome of a run.

use crate::{
    description::Description,
    failure::{BoxError, Failure, RecordedError, TestError},
    helpers::lock,
    reporter::{RunEvent, RunEventKind, RunListener},
    time::{StopwatchStart, stopwatch},
};
use chrono::{DateTime, FixedOffset};
use std::{
    collections::HashMap,
    fmt,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use trial_metadata::{FailureSummary, RunSummary};

/// Counts and failures of a run, aggregated from its events.
///
/// A `RunResult` is built by a listener subscribed to the run's notifier (see
/// [`listener`](Self::listener)). Clones share the same counters, so a result may be read while the
/// run is still in progress. Counters support concurrent updates from units running in parallel.
#[derive(Clone, Default)]
pub struct RunResult {
    inner: Arc<ResultInner>,
}

#[derive(Default)]
struct ResultInner {
    run_count: AtomicUsize,
    ignore_count: AtomicUsize,
    assumption_failure_count: AtomicUsize,
    failures: Mutex<Vec<Failure>>,
    timing: Mutex<Timing>,
    // Units that started and haven't finished yet, by description.
    in_flight: Mutex<HashMap<Description, InFlight>>,
}

#[derive(Default)]
struct InFlight {
    started: usize,
    // How many of the started units reported an assumption violation.
    skipped: usize,
}

#[derive(Default)]
struct Timing {
    start: Option<StopwatchStart>,
    start_time: Option<DateTime<FixedOffset>>,
    run_time: Option<Duration>,
}

impl RunResult {
    /// Creates an empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a listener that updates this result.
    pub fn listener(&self) -> Arc<dyn RunListener> {
        Arc::new(ResultListener {
            result: self.clone(),
        })
    }

    /// Returns the number of units that were attempted.
    ///
    /// Units that violated an assumption are not counted.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.load(Ordering::SeqCst)
    }

    /// Returns the number of failures reported.
    pub fn failure_count(&self) -> usize {
        lock(&self.inner.failures).len()
    }

    /// Returns the failures reported, in the order they occurred.
    pub fn failures(&self) -> Vec<Failure> {
        lock(&self.inner.failures).clone()
    }

    /// Returns the number of units ignored, including those that violated an assumption.
    pub fn ignore_count(&self) -> usize {
        self.inner.ignore_count.load(Ordering::SeqCst)
    }

    /// Returns the number of units that violated an assumption.
    pub fn assumption_failure_count(&self) -> usize {
        self.inner.assumption_failure_count.load(Ordering::SeqCst)
    }

    /// Returns the time the run took.
    ///
    /// While the run is in progress, this is the time elapsed so far.
    pub fn run_time(&self) -> Duration {
        let timing = lock(&self.inner.timing);
        match (&timing.run_time, &timing.start) {
            (Some(run_time), _) => *run_time,
            (None, Some(start)) => start.elapsed(),
            (None, None) => Duration::ZERO,
        }
    }

    /// Returns the time at which the run started, or `None` if it hasn't started.
    pub fn start_time(&self) -> Option<DateTime<FixedOffset>> {
        lock(&self.inner.timing).start_time
    }

    /// Returns true if no failures were reported.
    pub fn was_successful(&self) -> bool {
        self.failure_count() == 0
    }

    /// Produces a serializable summary of this result.
    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary::default();
        summary.run_count = self.run_count();
        summary.ignore_count = self.ignore_count();
        summary.assumption_failure_count = self.assumption_failure_count();
        summary.run_time = self.run_time();
        summary.start_time = self.start_time();
        summary.failures = lock(&self.inner.failures)
            .iter()
            .map(|failure| {
                FailureSummary::new(failure.description().summary(), failure.error().summary())
            })
            .collect();
        summary
    }

    /// Restores a result from a summary.
    ///
    /// Errors are restored as [`TestError::Recorded`], which reproduces their kind, message and
    /// type name. The summary of the restored result is equal to `summary`.
    pub fn from_summary(summary: &RunSummary) -> Self {
        let failures = summary
            .failures
            .iter()
            .map(|failure| {
                Failure::new(
                    Description::from_summary(&failure.description),
                    TestError::Recorded(RecordedError::from_summary(&failure.error)),
                )
            })
            .collect();

        Self {
            inner: Arc::new(ResultInner {
                run_count: AtomicUsize::new(summary.run_count),
                ignore_count: AtomicUsize::new(summary.ignore_count),
                assumption_failure_count: AtomicUsize::new(summary.assumption_failure_count),
                failures: Mutex::new(failures),
                timing: Mutex::new(Timing {
                    start: None,
                    start_time: summary.start_time,
                    run_time: Some(summary.run_time),
                }),
                in_flight: Mutex::default(),
            }),
        }
    }

    fn handle_event(&self, event: &RunEvent) {
        let inner = &self.inner;
        match &event.kind {
            RunEventKind::RunStarted { .. } => {
                let start = stopwatch();
                let mut timing = lock(&inner.timing);
                timing.start_time = Some(start.start_time());
                timing.start = Some(start);
                timing.run_time = None;
            }
            RunEventKind::RunFinished { .. } => {
                let timing = &mut *lock(&inner.timing);
                if let Some(start) = &timing.start {
                    timing.run_time = Some(start.elapsed());
                }
            }
            RunEventKind::UnitStarted { description } => {
                lock(&inner.in_flight)
                    .entry(description.clone())
                    .or_default()
                    .started += 1;
            }
            RunEventKind::UnitFinished { description } => {
                let in_flight = &mut *lock(&inner.in_flight);
                let skipped = match in_flight.get_mut(description) {
                    Some(unit) => {
                        unit.started -= 1;
                        let skipped = unit.skipped > 0;
                        if skipped {
                            unit.skipped -= 1;
                        }
                        if unit.started == 0 {
                            in_flight.remove(description);
                        }
                        skipped
                    }
                    None => false,
                };
                if !skipped {
                    inner.run_count.fetch_add(1, Ordering::SeqCst);
                }
            }
            RunEventKind::UnitFailed { failure } => {
                lock(&inner.failures).push(failure.clone());
            }
            RunEventKind::AssumptionFailed { failure } => {
                inner.ignore_count.fetch_add(1, Ordering::SeqCst);
                inner.assumption_failure_count.fetch_add(1, Ordering::SeqCst);
                // Groups report violations without starting, and are never attempted.
                if let Some(unit) = lock(&inner.in_flight).get_mut(failure.description()) {
                    if unit.skipped < unit.started {
                        unit.skipped += 1;
                    }
                }
            }
            RunEventKind::UnitIgnored { .. } => {
                inner.ignore_count.fetch_add(1, Ordering::SeqCst);
            }
        }
    }
}

impl fmt::Debug for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunResult")
            .field("run_count", &self.run_count())
            .field("failure_count", &self.failure_count())
            .field("ignore_count", &self.ignore_count())
            .field("assumption_failure_count", &self.assumption_failure_count())
            .field("run_time", &self.run_time())
            .finish()
    }
}

struct ResultListener {
    result: RunResult,
}

impl RunListener for ResultListener {
    fn handle_event(&self, event: &RunEvent) -> Result<(), BoxError> {
        self.result.handle_event(event);
        Ok(())
    }
}
