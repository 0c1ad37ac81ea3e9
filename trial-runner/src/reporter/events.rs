// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{description::Description, failure::Failure, result::RunResult};
use chrono::{DateTime, FixedOffset, Local};

/// A run event.
///
/// Events are fired by a [`RunNotifier`](super::RunNotifier) and consumed by
/// [`RunListener`](super::RunListener)s.
#[derive(Clone, Debug)]
pub struct RunEvent {
    /// The time at which the event was generated, including the offset from UTC.
    pub timestamp: DateTime<FixedOffset>,

    /// The kind of run event this is.
    pub kind: RunEventKind,
}

impl RunEvent {
    pub(crate) fn now(kind: RunEventKind) -> Self {
        Self {
            timestamp: Local::now().fixed_offset(),
            kind,
        }
    }
}

/// The kind of run event this is.
///
/// Forms part of [`RunEvent`].
///
/// For a single unit, events are always delivered in the order `UnitStarted`, then any number of
/// `UnitFailed` or `AssumptionFailed`, then `UnitFinished`. Events for different units running
/// concurrently may interleave.
#[derive(Clone, Debug)]
pub enum RunEventKind {
    /// The run started.
    RunStarted {
        /// The description tree of everything that is about to run.
        description: Description,
    },

    /// The run finished, or was stopped.
    RunFinished {
        /// The aggregate outcome of the run.
        result: RunResult,
    },

    /// A unit started running.
    UnitStarted {
        /// The unit.
        description: Description,
    },

    /// A unit finished running, whatever its outcome.
    UnitFinished {
        /// The unit.
        description: Description,
    },

    /// A unit, or a group's setup or teardown, failed.
    UnitFailed {
        /// The failure.
        failure: Failure,
    },

    /// A unit declined to proceed because an assumption was violated.
    AssumptionFailed {
        /// The failure carrying the assumption violation.
        failure: Failure,
    },

    /// A unit or group was not run because it is marked as ignored.
    UnitIgnored {
        /// The unit or group.
        description: Description,

        /// Why it was ignored, if a reason was given.
        reason: Option<String>,
    },
}

impl RunEventKind {
    /// Returns the description this event is about.
    ///
    /// For run events, this is the root description, or `None` for `RunFinished`.
    pub fn description(&self) -> Option<&Description> {
        match self {
            Self::RunStarted { description }
            | Self::UnitStarted { description }
            | Self::UnitFinished { description }
            | Self::UnitIgnored { description, .. } => Some(description),
            Self::UnitFailed { failure } | Self::AssumptionFailed { failure } => {
                Some(failure.description())
            }
            Self::RunFinished { .. } => None,
        }
    }
}
