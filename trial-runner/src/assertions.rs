// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Assertion and assumption helpers for test bodies.
//!
//! Test bodies return [`TestResult`], so these helpers are used with `?`. Panicking assertions such
//! as `assert_eq!` work too: panics are caught and reported as failures.

use crate::failure::{AssertionError, AssumptionViolation, TestError, TestResult};
use std::fmt;

/// Fails immediately with the given message.
pub fn fail<T>(message: impl Into<String>) -> Result<T, TestError> {
    Err(AssertionError::new(message).into())
}

/// Fails with `message` unless `condition` holds.
pub fn assert_true(condition: bool, message: impl Into<String>) -> TestResult {
    if condition { Ok(()) } else { fail(message) }
}

/// Fails unless `expected == actual`, with a message of the form `expected:<..> but was:<..>`.
pub fn assert_equals<T>(expected: T, actual: T) -> TestResult
where
    T: PartialEq + fmt::Debug,
{
    assert_equals_with("", expected, actual)
}

/// Like [`assert_equals`], prefixing the failure message with `message`.
pub fn assert_equals_with<T>(message: &str, expected: T, actual: T) -> TestResult
where
    T: PartialEq + fmt::Debug,
{
    if expected == actual {
        return Ok(());
    }
    let prefix = if message.is_empty() {
        String::new()
    } else {
        format!("{message} ")
    };
    fail(format!("{prefix}expected:<{expected:?}> but was:<{actual:?}>"))
}

/// Skips the unit with `message` unless `condition` holds.
///
/// A skipped unit is reported as ignored, not as failed.
pub fn assume_true(condition: bool, message: impl Into<String>) -> TestResult {
    if condition {
        Ok(())
    } else {
        Err(AssumptionViolation::new(message).into())
    }
}

/// Skips the unit unless `value` is `Some`, returning the contained value.
pub fn assume_some<T>(value: Option<T>, message: impl Into<String>) -> Result<T, TestError> {
    value.ok_or_else(|| AssumptionViolation::new(message).into())
}

/// Skips the unit if `result` is an error, returning the success value.
///
/// This is useful when a precondition such as an external resource is checked by a fallible
/// operation.
pub fn assume_ok<T, E>(result: Result<T, E>) -> Result<T, TestError>
where
    E: fmt::Display,
{
    result.map_err(|error| AssumptionViolation::new(format!("got error: {error}")).into())
}
