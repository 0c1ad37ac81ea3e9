// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::TestRule;
use crate::{
    description::Description,
    failure::TestError,
    helpers::lock,
    statement::{SharedStatement, statement},
    time::{StopwatchSnapshot, stopwatch},
};
use chrono::{DateTime, FixedOffset};
use std::{
    fmt,
    sync::{Arc, Mutex},
    time::Duration,
};

/// Receives the time statements measured by a [`Stopwatch`] took.
pub trait StopwatchObserver: Send + Sync {
    /// Called when the statement completed successfully.
    fn succeeded(&self, _elapsed: Duration, _description: &Description) {}

    /// Called when the statement failed with anything other than an assumption violation.
    fn failed(&self, _elapsed: Duration, _error: &TestError, _description: &Description) {}

    /// Called when the statement failed with an assumption violation.
    fn skipped(&self, _elapsed: Duration, _error: &TestError, _description: &Description) {}

    /// Called after the outcome-specific callback.
    fn finished(&self, _elapsed: Duration, _description: &Description) {}
}

/// A [`StopwatchObserver`] that ignores every measurement.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl StopwatchObserver for NoopObserver {}

/// Measures how long statements take.
///
/// The measurement of the most recent evaluation is also available through
/// [`runtime`](Self::runtime).
#[derive(Clone)]
pub struct Stopwatch {
    observer: Arc<dyn StopwatchObserver>,
    last: Arc<Mutex<Option<StopwatchSnapshot>>>,
}

impl Stopwatch {
    /// Creates a stopwatch reporting to `observer`.
    pub fn new(observer: Arc<dyn StopwatchObserver>) -> Self {
        Self {
            observer,
            last: Arc::default(),
        }
    }

    /// Creates a stopwatch that only records the most recent measurement.
    pub fn unobserved() -> Self {
        Self::new(Arc::new(NoopObserver))
    }

    /// Returns how long the most recently completed evaluation took.
    pub fn runtime(&self) -> Option<Duration> {
        lock(&self.last).as_ref().map(|snapshot| snapshot.duration)
    }

    /// Returns when the most recently completed evaluation finished.
    pub fn finished_at(&self) -> Option<DateTime<FixedOffset>> {
        lock(&self.last).as_ref().map(|snapshot| snapshot.end_time())
    }
}

impl TestRule for Stopwatch {
    fn apply(&self, base: SharedStatement, description: &Description) -> SharedStatement {
        let observer = self.observer.clone();
        let last = self.last.clone();
        let description = description.clone();
        statement(move || {
            let start = stopwatch();
            let result = base.evaluate();
            let snapshot = start.snapshot();
            *lock(&last) = Some(snapshot);

            let elapsed = snapshot.duration;
            match &result {
                Ok(()) => observer.succeeded(elapsed, &description),
                Err(error) if error.is_assumption_violation() => {
                    observer.skipped(elapsed, error, &description)
                }
                Err(error) => observer.failed(elapsed, error, &description),
            }
            observer.finished(elapsed, &description);
            result
        })
    }
}

impl fmt::Debug for Stopwatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stopwatch")
            .field("last", &*lock(&self.last))
            .finish_non_exhaustive()
    }
}
