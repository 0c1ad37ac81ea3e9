// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use color_eyre::eyre::Result;
use pretty_assertions::assert_eq;
use std::{
    collections::HashMap,
    io,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};
use trial_runner::{
    assertions::assert_true,
    config::{ParallelMode, TestThreads},
    description::Description,
    failure::BoxError,
    plan::{TestGroup, TestNode, TestPlan, TestUnit},
    reporter::{RunEvent, RunEventKind, RunListener, RunNotifier},
    runner::TestRunnerBuilder,
};

fn plan(groups: usize, units: usize) -> TestPlan {
    let groups = (0..groups).map(|g| {
        let class_name = format!("Listened{g}");
        let mut builder = TestGroup::builder(class_name.as_str());
        for u in 0..units {
            builder = builder.unit(
                TestUnit::builder(format!("unit{u}"), move || {
                    assert_true(u % 3 != 2, "every third unit fails")
                })
                .class_name(class_name.as_str())
                .build(),
            );
        }
        TestNode::Group(builder.build())
    });
    TestPlan::new("listened", groups)
}

#[test]
fn broken_listener_does_not_affect_the_run() -> Result<()> {
    test_init();

    let notifier = Arc::new(RunNotifier::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let broken_calls = calls.clone();
    notifier.subscribe(Arc::new(move |event: &RunEvent| -> Result<(), BoxError> {
        broken_calls.fetch_add(1, Ordering::SeqCst);
        match event.kind {
            RunEventKind::UnitStarted { .. } => Err(Box::new(io::Error::other("disk full"))),
            _ => Ok(()),
        }
    }));
    let recorder = Arc::new(EventRecorder::default());
    notifier.subscribe(recorder.clone());

    let result = TestRunnerBuilder::default()
        .build()?
        .run_with(&plan(1, 3), &notifier)?;

    // RunStarted, then the UnitStarted that broke it.
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(result.run_count(), 3);
    assert_eq!(result.failure_count(), 2);
    assert_eq!(
        result.failures()[0].description(),
        &Description::test_mechanism(),
    );
    assert_eq!(result.failures()[0].message(), "disk full");

    let events = recorder.events();
    assert_eq!(events.len(), 10, "{events:#?}");
    assert_eq!(events[2], "failed Test mechanism: disk full");
    // Only the recorder remains.
    assert_eq!(notifier.listener_count(), 1);
    Ok(())
}

/// Checks that each unit's events arrive as started, failures, finished.
#[derive(Default)]
struct OrderChecker {
    state: Mutex<HashMap<String, &'static str>>,
    violations: AtomicUsize,
}

impl RunListener for OrderChecker {
    fn handle_event(&self, event: &RunEvent) -> Result<(), BoxError> {
        let mut state = self.state.lock().unwrap();
        let ok = match &event.kind {
            RunEventKind::UnitStarted { description } => state
                .insert(description.to_string(), "started")
                .is_none(),
            RunEventKind::UnitFailed { failure } => {
                state.get(&failure.description().to_string()) == Some(&"started")
            }
            RunEventKind::UnitFinished { description } => {
                state.insert(description.to_string(), "finished") == Some("started")
            }
            _ => true,
        };
        if !ok {
            self.violations.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

#[test]
fn unit_events_are_ordered_under_parallel_execution() -> Result<()> {
    test_init();

    let notifier = Arc::new(RunNotifier::new());
    let checker = Arc::new(OrderChecker::default());
    notifier.subscribe(checker.clone());

    let mut builder = TestRunnerBuilder::default();
    builder
        .set_parallel(ParallelMode::All)
        .set_test_threads(TestThreads::Count(4));
    let result = builder.build()?.run_with(&plan(6, 9), &notifier)?;

    assert_eq!(result.run_count(), 54);
    assert_eq!(result.failure_count(), 18);
    assert_eq!(checker.violations.load(Ordering::SeqCst), 0);
    let state = checker.state.lock().unwrap();
    assert_eq!(state.len(), 54);
    assert!(state.values().all(|status| *status == "finished"));
    Ok(())
}
