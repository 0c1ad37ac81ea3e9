// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use color_eyre::eyre::{Result, bail};
use pretty_assertions::assert_eq;
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use trial_runner::{
    failure::TestError,
    plan::{TestGroup, TestPlan, TestUnit},
    reporter::RunNotifier,
    rules::Timeout,
    runner::TestRunnerBuilder,
    statement::statement,
    timeout::{CancellationToken, TimeoutGuard, is_cancelled},
};

/// Sleeps for `duration`, returning early if the current deadline elapses.
fn cooperative_sleep(duration: Duration) {
    match CancellationToken::current() {
        Some(token) => {
            token.sleep(duration);
        }
        None => std::thread::sleep(duration),
    }
}

#[test]
fn completes_before_deadline() -> Result<()> {
    test_init();

    let guard = TimeoutGuard::new(Duration::from_millis(2000));
    guard.run(statement(|| {
        cooperative_sleep(Duration::from_millis(10));
        Ok(())
    }))?;
    Ok(())
}

#[test]
fn errors_within_deadline_propagate_unchanged() {
    test_init();

    let guard = TimeoutGuard::new(Duration::from_millis(2000));
    let error = guard
        .run(statement(|| trial_runner::assertions::fail("wrong answer")))
        .unwrap_err();
    assert!(matches!(error, TestError::Assertion(_)), "{error:?}");
}

#[test]
fn overrunning_deadline_fails_with_configured_millis() -> Result<()> {
    test_init();

    let cancelled = Arc::new(AtomicBool::new(false));
    let cancelled2 = cancelled.clone();
    let guard = TimeoutGuard::new(Duration::from_millis(75)).with_label("stalls");
    let error = guard
        .run(statement(move || {
            cooperative_sleep(Duration::from_secs(10));
            cancelled2.store(is_cancelled(), Ordering::SeqCst);
            Ok(())
        }))
        .unwrap_err();

    let TestError::TimedOut(timed_out) = &error else {
        bail!("expected a timeout, got {error:?}");
    };
    assert_eq!(timed_out.timeout(), Duration::from_millis(75));
    assert_eq!(timed_out.thread_name(), Some("stalls"));
    assert_eq!(error.to_string(), "test timed out after 75 milliseconds");

    // The detached thread observes cancellation and winds down.
    for _ in 0..100 {
        if cancelled.load(Ordering::SeqCst) {
            break;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    assert!(cancelled.load(Ordering::SeqCst), "statement saw cancellation");
    Ok(())
}

#[test]
fn unit_and_default_timeouts() -> Result<()> {
    test_init();

    let stalls = |name: &str| {
        TestUnit::builder(name, || {
            cooperative_sleep(Duration::from_secs(10));
            Ok(())
        })
        .class_name("Deadlines")
    };
    let plan = TestPlan::new(
        "deadlines",
        [
            stalls("own_timeout")
                .timeout(Duration::from_millis(50))
                .build()
                .into(),
            stalls("default_timeout").build().into(),
            TestUnit::builder("quick", || Ok(()))
                .class_name("Deadlines")
                .build()
                .into(),
            stalls("rule_timeout")
                .rule(Arc::new(Timeout::millis(40)))
                .build()
                .into(),
        ],
    );

    let mut builder = TestRunnerBuilder::default();
    builder.set_default_timeout(Some(Duration::from_millis(300)));
    let result = builder.build()?.run(&plan)?;

    assert_eq!(result.run_count(), 4);
    let messages: Vec<_> = result
        .failures()
        .iter()
        .map(|failure| format!("{failure}"))
        .collect();
    assert_eq!(
        messages,
        [
            "own_timeout(Deadlines): test timed out after 50 milliseconds",
            "default_timeout(Deadlines): test timed out after 300 milliseconds",
            "rule_timeout(Deadlines): test timed out after 40 milliseconds",
        ],
    );
    Ok(())
}

#[test]
fn zero_unit_timeout_is_an_initialization_error() -> Result<()> {
    test_init();

    let unit = TestUnit::builder("instant", || Ok(()))
        .class_name("Deadlines")
        .timeout(Duration::ZERO)
        .build();
    let (result, events) = run_recorded(&TestPlan::new("zero", [unit.into()]));

    assert_eq!(result.failure_count(), 1);
    assert_eq!(
        events,
        [
            "run started: zero",
            "started initializationError(instant(Deadlines))",
            "failed initializationError(instant(Deadlines)): \
             timeout of instant(Deadlines) must be greater than zero",
            "finished initializationError(instant(Deadlines))",
            "run finished: 1 run",
        ],
    );
    Ok(())
}

#[test]
fn timed_out_group_stays_out_of_later_runs() -> Result<()> {
    test_init();

    // Sleeps ignore cancellation, so the group's first child outlives its run.
    let sleeper = |name: &str, millis: u64| {
        TestUnit::builder(name, move || {
            std::thread::sleep(Duration::from_millis(millis));
            Ok(())
        })
        .class_name("Slow")
        .build()
    };
    let slow = TestGroup::builder("Slow")
        .rule(Arc::new(Timeout::millis(50)))
        .unit(sleeper("first", 200))
        .unit(sleeper("second", 200))
        .unit(sleeper("third", 200))
        .build();

    let notifier = Arc::new(RunNotifier::new());
    let recorder = Arc::new(EventRecorder::default());
    notifier.subscribe(recorder.clone());
    let runner = TestRunnerBuilder::default().build()?;

    let first = runner.run_with(&TestPlan::new("first run", [slow.into()]), &notifier)?;
    assert_eq!(first.run_count(), 0);
    assert_eq!(first.failure_count(), 1);
    assert_eq!(
        first.failures()[0].to_string(),
        "Slow: test timed out after 50 milliseconds"
    );

    let second = runner.run_with(
        &TestPlan::new("second run", [sleeper("lingers", 800).into()]),
        &notifier,
    )?;
    assert_eq!(second.run_count(), 1);
    assert!(second.was_successful());

    let events = recorder.events();
    let second_run_start = events
        .iter()
        .position(|event| event == "run started: second run")
        .expect("second run started");
    assert_eq!(
        &events[second_run_start..],
        [
            "run started: second run",
            "started lingers(Slow)",
            "finished lingers(Slow)",
            "run finished: 1 run",
        ],
    );
    Ok(())
}
