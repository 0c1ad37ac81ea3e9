// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use color_eyre::eyre::Result;
use maplit::btreemap;
use pretty_assertions::assert_eq;
use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};
use trial_metadata::RunSummary;
use trial_runner::{
    assertions::{assert_equals, assert_true, assume_true},
    config::{ParallelMode, TestThreads},
    description::Description,
    failure::{InitializationError, TestResult},
    plan::{ErrorNode, TestGroup, TestNode, TestPlan, TestUnit},
    reporter::RunNotifier,
    result::RunResult,
    rules::{ExternalResource, TestName},
    runner::TestRunnerBuilder,
    statement::ExpectedError,
    test_filter::{Category, CategoryFilter, alphanumeric},
};

fn unit(class_name: &str, name: &str, body: fn() -> TestResult) -> TestUnit {
    TestUnit::builder(name, body).class_name(class_name).build()
}

#[test]
fn passing_and_failing_units() -> Result<()> {
    test_init();

    let group = TestGroup::builder("Arithmetic")
        .unit(unit("Arithmetic", "adds", || assert_equals(4, 2 + 2)))
        .unit(unit("Arithmetic", "lies", || assert_true(false, "2 + 2 = 5")))
        .build();
    let (result, events) = run_recorded(&TestPlan::new("arithmetic", [group.into()]));

    assert_eq!(result.run_count(), 2);
    assert_eq!(result.failure_count(), 1);
    assert!(!result.was_successful());
    assert_eq!(
        events,
        [
            "run started: arithmetic",
            "started adds(Arithmetic)",
            "finished adds(Arithmetic)",
            "started lies(Arithmetic)",
            "failed lies(Arithmetic): 2 + 2 = 5",
            "finished lies(Arithmetic)",
            "run finished: 2 run",
        ],
    );
    Ok(())
}

#[test]
fn assumption_violated_at_setup_is_ignored() -> Result<()> {
    test_init();

    let skipped = TestUnit::builder("needs_network", || Ok(()))
        .class_name("Network")
        .setup(|| assume_true(false, "offline"))
        .build();
    let group = TestGroup::builder("Network")
        .unit(skipped)
        .unit(unit("Network", "local", || Ok(())))
        .unit(
            TestUnit::builder("flaky", || Ok(()))
                .class_name("Network")
                .ignore(Some("tracked upstream"))
                .build(),
        )
        .build();
    let (result, events) = run_recorded(&TestPlan::new("network", [group.into()]));

    assert_eq!(result.run_count(), 1);
    assert_eq!(result.failure_count(), 0);
    assert_eq!(result.ignore_count(), 2);
    assert_eq!(result.assumption_failure_count(), 1);
    assert!(result.was_successful());
    assert_eq!(
        events,
        [
            "run started: network",
            "started needs_network(Network)",
            "assumption failed needs_network(Network)",
            "finished needs_network(Network)",
            "started local(Network)",
            "finished local(Network)",
            "ignored flaky(Network) (tracked upstream)",
            "run finished: 1 run",
        ],
    );
    Ok(())
}

#[test]
fn rules_wrap_in_scope_order() -> Result<()> {
    test_init();

    let log = Arc::new(Mutex::new(Vec::new()));
    let resource = |name: &'static str| {
        let before_log = log.clone();
        let after_log = log.clone();
        Arc::new(ExternalResource::new(
            move || {
                before_log.lock().unwrap().push(format!("before {name}"));
                Ok(())
            },
            move || {
                after_log.lock().unwrap().push(format!("after {name}"));
                Ok(())
            },
        ))
    };

    let name = TestName::new();
    let body_name = name.clone();
    let body_log = log.clone();
    let inner = TestUnit::builder("wrapped", move || {
        let method = body_name.method_name().unwrap_or_default();
        body_log.lock().unwrap().push(format!("body {method}"));
        Ok(())
    })
    .class_name("Rules")
    .rule(Arc::new(name))
    .rule(resource("unit"))
    .build();

    let inner_group = TestGroup::builder("Inner")
        .unit_rule(resource("inner unit rule"))
        .rule(resource("inner group rule"))
        .unit(inner)
        .build();
    let outer_group = TestGroup::builder("Outer")
        .unit_rule(resource("outer unit rule"))
        .group(inner_group)
        .build();

    let result = run(&TestPlan::new("rules", [outer_group.into()]));
    assert!(result.was_successful());
    assert_eq!(
        *log.lock().unwrap(),
        [
            "before inner group rule",
            "before outer unit rule",
            "before inner unit rule",
            "before unit",
            "body wrapped",
            "after unit",
            "after inner unit rule",
            "after outer unit rule",
            "after inner group rule",
        ],
    );
    Ok(())
}

#[test]
fn expected_errors() -> Result<()> {
    test_init();

    let plan = TestPlan::new(
        "expected",
        [
            TestUnit::builder("panics", || panic!("index out of bounds"))
                .class_name("Expected")
                .expect_error(ExpectedError::panic_containing("out of bounds"))
                .build()
                .into(),
            TestUnit::builder("completes", || Ok(()))
                .class_name("Expected")
                .expect_error(ExpectedError::panic_containing("out of bounds"))
                .build()
                .into(),
        ],
    );
    let result = run(&plan);

    assert_eq!(result.run_count(), 2);
    let failures = result.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].test_header(), "completes(Expected)");
    assert!(failures[0].message().starts_with("Expected exception: "));
    Ok(())
}

#[test]
fn error_nodes_report_one_failure() -> Result<()> {
    test_init();

    let error = ErrorNode::new(
        "Unbuildable",
        vec![
            InitializationError::new("no public constructor"),
            InitializationError::new("method `run` takes arguments"),
        ],
    );
    let plan = TestPlan::new(
        "errors",
        [error.into(), unit("Buildable", "works", || Ok(())).into()],
    );
    assert_eq!(plan.unit_count(), 2);

    let result = run(&plan);
    assert_eq!(result.run_count(), 2);
    let failures = result.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(
        failures[0].test_header(),
        "initializationError(Unbuildable)",
    );
    assert_eq!(
        failures[0].message(),
        "There were 2 errors:\n  \
         InitializationError(no public constructor)\n  \
         InitializationError(method `run` takes arguments)",
    );
    Ok(())
}

fn categorized_plan() -> TestPlan {
    let categorized = |name: &str, category: &str| {
        TestUnit::builder(name, || Ok(()))
            .class_name("Catalog")
            .annotation(Category::new(category))
            .build()
    };
    let group = TestGroup::builder("Catalog")
        .unit(categorized("zeta", "fast"))
        .unit(categorized("alpha", "slow"))
        .unit(categorized("mu", "fast"))
        .build();
    TestPlan::new("catalog", [group.into()])
}

#[test]
fn filtered_and_sorted_plans() -> Result<()> {
    test_init();

    let plan = categorized_plan()
        .filter(&CategoryFilter::new().include(["fast"]))?
        .sorted_by(alphanumeric);
    assert_eq!(plan.unit_count(), 2);

    let (result, events) = run_recorded(&plan);
    assert_eq!(result.run_count(), 2);
    let started: Vec<_> = events
        .iter()
        .filter(|event| event.starts_with("started"))
        .collect();
    assert_eq!(started, ["started mu(Catalog)", "started zeta(Catalog)"]);

    let error = categorized_plan()
        .filter(&CategoryFilter::new().include(["fast"]).exclude(["fast"]))
        .unwrap_err();
    assert_eq!(
        error.to_string(),
        "no tests remain after applying filter: categories [fast] - [fast]",
    );
    Ok(())
}

#[test]
fn parallel_groups_share_one_result() -> Result<()> {
    test_init();

    let threads = Arc::new(Mutex::new(BTreeMap::new()));
    let groups = (0..4).map(|g| {
        let class_name = format!("Group{g}");
        let group = (0..5)
            .fold(TestGroup::builder(class_name.as_str()), |builder, u| {
                let threads = threads.clone();
                let key_prefix = class_name.clone();
                builder.unit(
                    TestUnit::builder(format!("unit{u}"), move || {
                        let thread = std::thread::current().name().map(str::to_owned);
                        threads.lock().unwrap().insert(format!("{key_prefix}/{u}"), thread);
                        assert_true(u != 4 || g != 3, "last unit fails")
                    })
                    .class_name(class_name.as_str())
                    .build(),
                )
            })
            .build();
        TestNode::Group(group)
    });
    let plan = TestPlan::new("parallel", groups);

    for parallel in [ParallelMode::Groups, ParallelMode::All] {
        threads.lock().unwrap().clear();
        let mut builder = TestRunnerBuilder::default();
        builder
            .set_parallel(parallel)
            .set_test_threads(TestThreads::Count(3));
        let result = builder.build()?.run(&plan)?;

        assert_eq!(result.run_count(), 20, "{parallel}");
        assert_eq!(result.failure_count(), 1, "{parallel}");
        let threads = threads.lock().unwrap();
        assert_eq!(threads.len(), 20);
        for thread in threads.values() {
            let thread = thread.as_deref().unwrap_or_default();
            assert!(thread.starts_with("trial-run-"), "ran on {thread}");
        }
    }
    Ok(())
}

#[test]
fn stop_request_winds_down_at_unit_boundary() -> Result<()> {
    test_init();

    let notifier = Arc::new(RunNotifier::new());
    let stopper = notifier.clone();
    let group = TestGroup::builder("Stoppable")
        .unit(unit("Stoppable", "first", || Ok(())))
        .unit(
            TestUnit::builder("requests_stop", move || {
                stopper.request_stop();
                Ok(())
            })
            .class_name("Stoppable")
            .build(),
        )
        .unit(unit("Stoppable", "never_starts", || Ok(())))
        .build();

    let runner = TestRunnerBuilder::default().build()?;
    let stopped = runner
        .run_with(&TestPlan::new("stoppable", [group.into()]), &notifier)
        .unwrap_err();
    assert_eq!(stopped.partial_result().run_count(), 2);
    assert_eq!(
        stopped.to_string(),
        "test run stopped by user request after 2 units",
    );
    // Listeners added by the runner are removed again.
    assert_eq!(notifier.listener_count(), 0);
    Ok(())
}

#[test]
fn fail_fast_stops_after_first_failure() -> Result<()> {
    test_init();

    let group = TestGroup::builder("FailFast")
        .unit(unit("FailFast", "a_fails", || assert_true(false, "first")))
        .unit(unit("FailFast", "b_fails", || assert_true(false, "second")))
        .build();
    let mut builder = TestRunnerBuilder::default();
    builder.set_fail_fast(true);
    let stopped = builder
        .build()?
        .run(&TestPlan::new("fail-fast", [group.into()]))
        .unwrap_err();

    let result = stopped.into_partial_result();
    assert_eq!(result.run_count(), 1);
    assert_eq!(result.failure_count(), 1);
    Ok(())
}

#[test]
fn summaries_round_trip() -> Result<()> {
    test_init();

    let group = TestGroup::builder("Summary")
        .unit(unit("Summary", "passes", || Ok(())))
        .unit(unit("Summary", "fails", || assert_true(false, "nope")))
        .unit(unit("Summary", "panics", || panic!("boom")))
        .unit(unit("Summary", "skips", || assume_true(false, "not here")))
        .build();
    let result = run(&TestPlan::new("summary", [group.into()]));

    let summary = result.summary();
    let counts = btreemap! {
        "run" => summary.run_count,
        "failed" => summary.failure_count(),
        "ignored" => summary.ignore_count,
        "assumptions" => summary.assumption_failure_count,
    };
    assert_eq!(
        counts,
        btreemap! { "run" => 3, "failed" => 2, "ignored" => 1, "assumptions" => 1 },
    );

    let parsed = RunSummary::parse_json(summary.to_json()?)?;
    assert_eq!(parsed, summary);

    let restored = RunResult::from_summary(&parsed);
    assert_eq!(restored.summary(), summary);
    assert_eq!(restored.failures()[1].test_header(), "panics(Summary)");
    assert_eq!(restored.failures()[1].message(), "boom");
    Ok(())
}

#[test]
fn descriptions_compare_by_name() {
    let mut with_children = Description::suite("X");
    with_children.add_child(Description::leaf("child"));
    assert_eq!(with_children, Description::suite("X"));
    assert_ne!(
        Description::suite("X").with_unique_id("1"),
        Description::suite("X").with_unique_id("2"),
    );
}
