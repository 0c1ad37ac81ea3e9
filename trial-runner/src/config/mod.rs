// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration support for trial.
//!
//! Configuration is read from TOML. The embedded [default config](RunnerConfig::DEFAULT_CONFIG)
//! is layered first, followed by either an explicitly passed file or `.config/trial.toml` under the
//! config root. Settings are grouped into named profiles; `default` always exists, and other
//! profiles fall back to it key by key.

mod config_impl;
mod junit;
mod parallel;
mod test_threads;

pub use config_impl::*;
pub use junit::*;
pub use parallel::*;
pub use test_threads::*;
