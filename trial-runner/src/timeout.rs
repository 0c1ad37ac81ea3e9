// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounding the execution time of statements.
//!
//! A [`TimeoutGuard`] evaluates a statement on a dedicated thread and waits for it up to a
//! deadline. If the deadline elapses, the thread's [`CancellationToken`] is cancelled and a
//! [`TimedOut`] error is returned without waiting further.
//!
//! Cancellation is cooperative: Rust has no way to interrupt a running thread, so a timed-out
//! statement keeps running until it checks [`is_cancelled`] or returns on its own. Its eventual
//! outcome is discarded.

use crate::{
    failure::{PanicError, TestError, TestResult, TimedOut},
    helpers::{lock, panic_message, thread_name},
    statement::{SharedStatement, Statement, catch_panic},
};
use crossbeam_channel::RecvTimeoutError;
use std::{
    cell::RefCell,
    sync::{Arc, Condvar, Mutex},
    time::{Duration, Instant},
};
use tracing::debug;

thread_local! {
    static CURRENT_TOKEN: RefCell<Option<CancellationToken>> = const { RefCell::new(None) };
}

/// Returns true if the statement running on this thread has been asked to stop.
///
/// Always false outside of a statement run by a [`TimeoutGuard`].
pub fn is_cancelled() -> bool {
    CURRENT_TOKEN.with_borrow(|token| token.as_ref().is_some_and(CancellationToken::is_cancelled))
}

/// A cooperative cancellation signal.
///
/// Cloning a token produces a handle to the same signal.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

#[derive(Debug, Default)]
struct TokenInner {
    cancelled: Mutex<bool>,
    condvar: Condvar,
}

impl CancellationToken {
    /// Creates a new, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the token for the statement running on this thread, if it runs under a deadline.
    pub fn current() -> Option<Self> {
        CURRENT_TOKEN.with_borrow(|token| token.clone())
    }

    /// Cancels the token, waking up any sleepers.
    pub fn cancel(&self) {
        *lock(&self.inner.cancelled) = true;
        self.inner.condvar.notify_all();
    }

    /// Returns true if the token has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        *lock(&self.inner.cancelled)
    }

    /// Sleeps for `duration`, returning early if the token is cancelled.
    ///
    /// Returns true if the full duration elapsed, false if the sleep was cut short.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let mut cancelled = lock(&self.inner.cancelled);
        loop {
            if *cancelled {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            cancelled = match self.inner.condvar.wait_timeout(cancelled, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }

    fn install(self) -> TokenGuard {
        let previous = CURRENT_TOKEN.with_borrow_mut(|current| current.replace(self));
        TokenGuard { previous }
    }
}

/// Two tokens are equal if they are handles to the same signal.
impl PartialEq for CancellationToken {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for CancellationToken {}

struct TokenGuard {
    previous: Option<CancellationToken>,
}

impl Drop for TokenGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT_TOKEN.with_borrow_mut(|current| *current = previous);
    }
}

/// Runs statements under a deadline.
#[derive(Clone, Debug)]
pub struct TimeoutGuard {
    timeout: Duration,
    label: String,
}

impl TimeoutGuard {
    /// Creates a guard with the given deadline.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            label: "trial-timeout".to_owned(),
        }
    }

    /// Sets the label used to name the thread statements run on.
    pub fn with_label(mut self, label: impl AsRef<str>) -> Self {
        self.label = thread_name(label.as_ref());
        self
    }

    /// Returns the deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Evaluates `statement` on a dedicated thread, waiting up to the deadline.
    ///
    /// - If the statement completes in time, its outcome is returned unchanged.
    /// - Otherwise, its cancellation token is cancelled and [`TestError::TimedOut`] is returned.
    ///   The thread is detached rather than joined.
    pub fn run(&self, statement: SharedStatement) -> TestResult {
        let token = CancellationToken::new();
        let (sender, receiver) = crossbeam_channel::bounded::<TestResult>(1);

        let thread_token = token.clone();
        let handle = std::thread::Builder::new()
            .name(self.label.clone())
            .spawn(move || {
                let _guard = thread_token.install();
                let result = catch_panic(|| statement.evaluate());
                // The receiver is gone if the deadline already elapsed.
                let _ = sender.send(result);
            })
            .map_err(TestError::unexpected)?;

        match receiver.recv_timeout(self.timeout) {
            Ok(result) => {
                // The thread has nothing left to do but exit.
                let _ = handle.join();
                result
            }
            Err(RecvTimeoutError::Timeout) => {
                token.cancel();
                debug!(
                    thread = %self.label,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "statement timed out, detaching its thread"
                );
                Err(TimedOut::new(self.timeout, Some(self.label.clone())).into())
            }
            Err(RecvTimeoutError::Disconnected) => match handle.join() {
                // The sender is only dropped without sending if the thread panicked outside of
                // catch_panic, e.g. while dropping the statement's result.
                Err(payload) => Err(PanicError::new(panic_message(&*payload)).into()),
                Ok(()) => Err(PanicError::new("statement thread exited without a result").into()),
            },
        }
    }
}

/// A statement that fails if the wrapped statement doesn't complete within a deadline.
pub struct FailOnTimeout {
    next: SharedStatement,
    guard: TimeoutGuard,
}

impl FailOnTimeout {
    /// Wraps `next` with a deadline. `label` names the thread the statement runs on.
    pub fn new(next: SharedStatement, timeout: Duration, label: impl AsRef<str>) -> Self {
        Self {
            next,
            guard: TimeoutGuard::new(timeout).with_label(label),
        }
    }
}

impl Statement for FailOnTimeout {
    fn evaluate(&self) -> TestResult {
        self.guard.run(self.next.clone())
    }
}
