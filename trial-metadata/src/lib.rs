// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Machine-readable output for test runs executed by `trial-runner`.
//!
//! The types in this crate describe the outcome of a single run: aggregate counts, plus every
//! failure paired with the description of the unit that produced it. They are serialized as JSON
//! with kebab-case keys.

mod exit_codes;
mod summary;

pub use exit_codes::*;
pub use summary::*;
