// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::events::{RunEvent, RunEventKind};
use crate::{
    description::Description,
    errors::StoppedByUser,
    failure::{BoxError, Failure, PanicError, TestError, UnexpectedError},
    helpers::{lock, panic_message, read_lock, write_lock},
    result::RunResult,
};
use std::{
    fmt,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{
        Arc, Mutex, RwLock,
        atomic::{AtomicBool, Ordering},
    },
};
use tracing::{debug, warn};

/// Observes run events.
///
/// A listener that returns an error or panics while handling an event is removed from the
/// notifier, and a failure describing the breakage is reported on
/// [`Description::test_mechanism`].
pub trait RunListener: Send + Sync {
    /// Handles a single event.
    fn handle_event(&self, event: &RunEvent) -> Result<(), BoxError>;
}

impl<F> RunListener for F
where
    F: Fn(&RunEvent) -> Result<(), BoxError> + Send + Sync,
{
    fn handle_event(&self, event: &RunEvent) -> Result<(), BoxError> {
        self(event)
    }
}

/// Broadcasts run events to subscribed listeners.
///
/// A notifier may be shared across threads: units running concurrently fire events through the
/// same notifier.
#[derive(Default)]
pub struct RunNotifier {
    listeners: Mutex<Vec<Arc<dyn RunListener>>>,
    stop_requested: AtomicBool,
    // Bumped when a run starts and when it finishes.
    generation: RwLock<u64>,
}

impl RunNotifier {
    /// Creates a notifier with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a listener, after every listener already subscribed.
    pub fn subscribe(&self, listener: Arc<dyn RunListener>) {
        lock(&self.listeners).push(listener);
    }

    /// Adds a listener ahead of every listener already subscribed.
    pub fn subscribe_first(&self, listener: Arc<dyn RunListener>) {
        lock(&self.listeners).insert(0, listener);
    }

    /// Removes a listener. Returns true if it was subscribed.
    pub fn unsubscribe(&self, listener: &Arc<dyn RunListener>) -> bool {
        let mut listeners = lock(&self.listeners);
        let before = listeners.len();
        listeners.retain(|existing| !same_listener(existing, listener));
        listeners.len() != before
    }

    /// Returns the number of listeners currently subscribed.
    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).len()
    }

    /// Asks the run to stop at the next unit boundary.
    ///
    /// Units already running are not interrupted.
    pub fn request_stop(&self) {
        if !self.stop_requested.swap(true, Ordering::SeqCst) {
            debug!("stop requested");
        }
    }

    /// Returns true if a stop was requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    /// Starts a run, returning the handle its events are fired through.
    ///
    /// Any earlier run still firing through a [`RunScope`] of this notifier is over from now on.
    pub(crate) fn begin_run(self: &Arc<Self>) -> RunScope {
        let mut generation = write_lock(&self.generation);
        *generation += 1;
        RunScope {
            notifier: self.clone(),
            generation: *generation,
        }
    }

    /// Fires [`RunEventKind::RunStarted`].
    pub fn fire_run_started(&self, description: &Description) {
        self.fire(RunEventKind::RunStarted {
            description: description.clone(),
        });
    }

    /// Fires [`RunEventKind::RunFinished`].
    pub fn fire_run_finished(&self, result: &RunResult) {
        self.fire(RunEventKind::RunFinished {
            result: result.clone(),
        });
    }

    /// Fires [`RunEventKind::UnitStarted`], unless a stop was requested.
    pub fn fire_unit_started(&self, description: &Description) -> Result<(), StoppedByUser> {
        if self.is_stop_requested() {
            return Err(StoppedByUser);
        }
        self.fire(RunEventKind::UnitStarted {
            description: description.clone(),
        });
        Ok(())
    }

    /// Fires [`RunEventKind::UnitFinished`].
    pub fn fire_unit_finished(&self, description: &Description) {
        self.fire(RunEventKind::UnitFinished {
            description: description.clone(),
        });
    }

    /// Fires [`RunEventKind::UnitFailed`].
    pub fn fire_failure(&self, failure: Failure) {
        self.fire(RunEventKind::UnitFailed { failure });
    }

    /// Fires [`RunEventKind::AssumptionFailed`].
    pub fn fire_assumption_failed(&self, failure: Failure) {
        self.fire(RunEventKind::AssumptionFailed { failure });
    }

    /// Fires [`RunEventKind::UnitIgnored`].
    pub fn fire_ignored(&self, description: &Description, reason: Option<&str>) {
        self.fire(RunEventKind::UnitIgnored {
            description: description.clone(),
            reason: reason.map(str::to_owned),
        });
    }

    fn fire(&self, kind: RunEventKind) {
        let event = RunEvent::now(kind);
        // Dispatch to a snapshot, so that listeners may subscribe or unsubscribe while handling
        // events without deadlocking.
        let listeners = lock(&self.listeners).clone();

        let mut broken = Vec::new();
        for listener in listeners {
            if !self.is_subscribed(&listener) {
                continue;
            }
            let error: TestError =
                match catch_unwind(AssertUnwindSafe(|| listener.handle_event(&event))) {
                    Ok(Ok(())) => continue,
                    Ok(Err(error)) => UnexpectedError::from_boxed("RunListener", error).into(),
                    Err(payload) => PanicError::new(panic_message(&*payload)).into(),
                };
            self.unsubscribe(&listener);
            warn!("removed run listener that failed to handle an event: {error}");
            broken.push(error);
        }

        // Each broken listener has already been removed, so this terminates.
        for error in broken {
            self.fire(RunEventKind::UnitFailed {
                failure: Failure::new(Description::test_mechanism(), error),
            });
        }
    }

    fn is_subscribed(&self, listener: &Arc<dyn RunListener>) -> bool {
        lock(&self.listeners)
            .iter()
            .any(|existing| same_listener(existing, listener))
    }
}

impl fmt::Debug for RunNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunNotifier")
            .field("listener_count", &self.listener_count())
            .field("stop_requested", &self.is_stop_requested())
            .field("generation", &*read_lock(&self.generation))
            .finish()
    }
}

/// Fires the events of a single run through a [`RunNotifier`].
///
/// Statements abandoned by a timeout keep running on detached threads after their run is over.
/// Events they fire through the run's scope are dropped once the run has finished, so they never
/// reach the listeners of a later run on the same notifier.
#[derive(Clone, Debug)]
pub(crate) struct RunScope {
    notifier: Arc<RunNotifier>,
    generation: u64,
}

impl RunScope {
    pub(crate) fn is_stop_requested(&self) -> bool {
        self.notifier.is_stop_requested()
    }

    pub(crate) fn request_stop(&self) {
        self.notifier.request_stop();
    }

    /// Returns true once the run has finished or another run has started.
    pub(crate) fn is_over(&self) -> bool {
        *read_lock(&self.notifier.generation) != self.generation
    }

    pub(crate) fn fire_run_started(&self, description: &Description) {
        self.fire_current(|notifier| notifier.fire_run_started(description));
    }

    /// Fires [`RunEventKind::UnitStarted`], unless a stop was requested or the run is over.
    pub(crate) fn fire_unit_started(&self, description: &Description) -> Result<(), StoppedByUser> {
        self.fire_current(|notifier| notifier.fire_unit_started(description))
            .unwrap_or(Err(StoppedByUser))
    }

    pub(crate) fn fire_unit_finished(&self, description: &Description) {
        self.fire_current(|notifier| notifier.fire_unit_finished(description));
    }

    pub(crate) fn fire_failure(&self, failure: Failure) {
        self.fire_current(|notifier| notifier.fire_failure(failure));
    }

    pub(crate) fn fire_assumption_failed(&self, failure: Failure) {
        self.fire_current(|notifier| notifier.fire_assumption_failed(failure));
    }

    pub(crate) fn fire_ignored(&self, description: &Description, reason: Option<&str>) {
        self.fire_current(|notifier| notifier.fire_ignored(description, reason));
    }

    /// Fires [`RunEventKind::RunFinished`]. Every later event fired through this scope is dropped.
    pub(crate) fn finish(&self, result: &RunResult) {
        let mut generation = write_lock(&self.notifier.generation);
        if *generation != self.generation {
            debug!("not firing run finished: another run has started");
            return;
        }
        self.notifier.fire_run_finished(result);
        *generation += 1;
    }

    fn fire_current<T>(&self, fire: impl FnOnce(&RunNotifier) -> T) -> Option<T> {
        // Held while firing, so that the run can't finish halfway through an event.
        let generation = read_lock(&self.notifier.generation);
        if *generation == self.generation {
            Some(fire(&self.notifier))
        } else {
            debug!(
                generation = self.generation,
                "dropping event fired after its run was over"
            );
            None
        }
    }
}

fn same_listener(a: &Arc<dyn RunListener>, b: &Arc<dyn RunListener>) -> bool {
    // Compare data pointers only: vtable pointers for the same type may differ across codegen
    // units.
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}
