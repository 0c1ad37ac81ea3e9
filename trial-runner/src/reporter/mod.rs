// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Broadcasting run events to observers.
//!
//! The main structure in this module is [`RunNotifier`], which dispatches [`RunEvent`]s to every
//! subscribed [`RunListener`]. [`JunitAggregator`] is a listener that writes JUnit XML reports.

mod aggregator;
/// Run events and their kinds.
pub mod events;
mod notifier;

pub use aggregator::*;
pub use events::{RunEvent, RunEventKind};
pub use notifier::*;
