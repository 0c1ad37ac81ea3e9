// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Documented exit codes for front-ends driving a trial run.
///
/// Front-ends may map a [`RunSummary`](crate::RunSummary) to one of these codes through
/// [`RunSummary::exit_code`](crate::RunSummary::exit_code).
pub enum TrialExitCode {}

impl TrialExitCode {
    /// Every attempted unit passed.
    pub const OK: i32 = 0;

    /// No units were attempted, but no other errors occurred.
    pub const NO_TESTS_RUN: i32 = 4;

    /// One or more units failed.
    pub const TEST_RUN_FAILED: i32 = 100;

    /// A user issue happened while setting up a run, e.g. an invalid configuration file.
    pub const SETUP_ERROR: i32 = 96;
}
