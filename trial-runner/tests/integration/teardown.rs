// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use color_eyre::eyre::{Result, bail, ensure};
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};
use test_case::test_case;
use trial_runner::{
    assertions::fail,
    failure::{TestError, TestResult},
    plan::{TestGroup, TestPlan, TestUnit},
};

fn unit_with_teardowns(failing: usize, passing: usize, body_fails: bool) -> TestUnit {
    let mut builder = TestUnit::builder("cleans_up", move || {
        if body_fails { fail("body failed") } else { Ok(()) }
    })
    .class_name("Teardowns");
    for i in 0..failing {
        builder = builder.teardown(move || fail(format!("teardown {i} failed")));
    }
    for _ in 0..passing {
        builder = builder.teardown(|| Ok(()));
    }
    builder.build()
}

#[test_case(0, false, None; "no failures")]
#[test_case(0, true, Some(1); "body only")]
#[test_case(1, false, Some(1); "one teardown")]
#[test_case(2, false, Some(2); "two teardowns")]
#[test_case(2, true, Some(3); "two teardowns and body")]
#[test_case(4, false, Some(4); "four teardowns")]
fn teardown_failures_are_combined(
    failing: usize,
    body_fails: bool,
    expected_errors: Option<usize>,
) -> Result<()> {
    test_init();

    let plan = TestPlan::new(
        "teardowns",
        [unit_with_teardowns(failing, 2, body_fails).into()],
    );
    let result = run(&plan);
    ensure!(result.run_count() == 1, "unit ran once");

    let failures = result.failures();
    match expected_errors {
        None => ensure!(failures.is_empty(), "no failures expected, got {failures:?}"),
        Some(1) => {
            assert_eq!(failures.len(), 1);
            // A single error is reported verbatim.
            let TestError::Assertion(error) = failures[0].error() else {
                bail!("expected an assertion error, got {:?}", failures[0].error());
            };
            let expected = if body_fails { "body failed" } else { "teardown 0 failed" };
            assert_eq!(error.message(), expected);
        }
        Some(count) => {
            assert_eq!(failures.len(), 1);
            let TestError::Multiple(multiple) = failures[0].error() else {
                bail!("expected multiple failures, got {:?}", failures[0].error());
            };
            assert_eq!(multiple.errors().len(), count);
            let messages: Vec<_> = multiple.errors().iter().map(|e| e.to_string()).collect();
            if body_fails {
                assert_eq!(messages[0], "body failed");
            }
            let last = format!("teardown {} failed", failing - 1);
            assert_eq!(messages.last(), Some(&last));
        }
    }
    Ok(())
}

#[test]
fn setup_failure_skips_same_level_teardown_only() -> Result<()> {
    test_init();

    let log = Arc::new(Mutex::new(Vec::new()));
    let push = |entry: &'static str| {
        let log = log.clone();
        move || -> TestResult {
            log.lock().unwrap().push(entry);
            Ok(())
        }
    };

    let unit = TestUnit::builder("never_runs", push("body"))
        .class_name("Setups")
        .setup({
            let log = log.clone();
            move || {
                log.lock().unwrap().push("unit setup");
                fail("unit setup failed")
            }
        })
        .teardown(push("unit teardown"))
        .build();
    let group = TestGroup::builder("Setups")
        .setup(push("group setup"))
        .teardown(push("group teardown"))
        .unit(unit)
        .build();

    let result = run(&TestPlan::new("setups", [group.into()]));
    assert_eq!(
        *log.lock().unwrap(),
        ["group setup", "unit setup", "group teardown"],
    );
    assert_eq!(result.run_count(), 1);
    assert_eq!(result.failure_count(), 1);
    assert_eq!(result.failures()[0].message(), "unit setup failed");
    Ok(())
}

#[test]
fn group_setup_failure_is_reported_on_the_group() -> Result<()> {
    test_init();

    let group = TestGroup::builder("Broken")
        .setup(|| fail("no database"))
        .unit(TestUnit::builder("queries", || Ok(())).class_name("Broken").build())
        .build();
    let (result, events) = run_recorded(&TestPlan::new("broken", [group.into()]));

    assert_eq!(result.run_count(), 0);
    assert_eq!(result.failure_count(), 1);
    assert_eq!(result.failures()[0].test_header(), "Broken");
    assert_eq!(
        events,
        [
            "run started: broken",
            "failed Broken: no database",
            "run finished: 0 run",
        ],
    );
    Ok(())
}
