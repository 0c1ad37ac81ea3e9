// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use color_eyre::eyre::Result;
use pretty_assertions::assert_eq;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use test_strategy::proptest;
use trial_runner::{
    assertions::fail,
    description::Description,
    plan::{Repeat, TestGroup, TestPlan, TestUnit},
    rules::{RepeatRule, Repeated},
};

fn passing_group(units: usize) -> TestGroup {
    (0..units)
        .fold(TestGroup::builder("Repeated"), |builder, i| {
            builder.unit(
                TestUnit::builder(format!("unit_{i}"), || Ok(()))
                    .class_name("Repeated")
                    .build(),
            )
        })
        .build()
}

// Attempted units are counted per repetition.
#[proptest(cases = 32)]
fn repeated_groups_multiply_run_count(
    #[strategy(0..6usize)] units: usize,
    #[strategy(0..5i64)] times: i64,
) {
    let repeat = Repeat::new(times).unwrap();
    let group = repeat.apply(&passing_group(units));
    let result = run(&TestPlan::new("repeat", [group.into()]));

    assert_eq!(result.run_count(), units * times as usize);
    assert_eq!(result.failure_count(), 0);
}

#[proptest(cases = 16)]
fn negative_repeat_counts_are_rejected(#[strategy(i64::MIN..0)] times: i64) {
    let error = Repeat::new(times).unwrap_err();
    assert_eq!(error.times(), times);
    assert!(error.to_string().contains(&times.to_string()));
}

#[test]
fn repeated_units_are_distinguishable() -> Result<()> {
    test_init();

    let group = Repeat::new(2)?.apply(&passing_group(1));
    let (result, events) = run_recorded(&TestPlan::new("repeat", [group.into()]));

    assert_eq!(result.run_count(), 2);
    assert_eq!(
        events,
        [
            "run started: repeat",
            "started unit_0[0](Repeated)",
            "finished unit_0[0](Repeated)",
            "started unit_0[1](Repeated)",
            "finished unit_0[1](Repeated)",
            "run finished: 2 run",
        ],
    );
    assert_ne!(
        Description::test("Repeated", "unit_0[0]"),
        Description::test("Repeated", "unit_0[1]"),
    );
    Ok(())
}

#[test]
fn repeat_rule_evaluates_within_one_unit() -> Result<()> {
    test_init();

    let count = Arc::new(AtomicUsize::new(0));
    let unit = |name: &str, annotation: Option<Repeated>| {
        let count = count.clone();
        let mut builder = TestUnit::builder(name, move || {
            let n = count.fetch_add(1, Ordering::SeqCst);
            if n == 1 { fail("second evaluation failed") } else { Ok(()) }
        })
        .rule(Arc::new(RepeatRule::new(3)));
        if let Some(annotation) = annotation {
            builder = builder.annotation(annotation);
        }
        builder.build()
    };

    let result = run(&TestPlan::new("rule", [unit("thrice", None).into()]));
    assert_eq!(result.run_count(), 1);
    assert_eq!(result.failure_count(), 1);
    assert_eq!(count.load(Ordering::SeqCst), 3);

    count.store(0, Ordering::SeqCst);
    let result = run(&TestPlan::new(
        "rule",
        [unit("five_times", Some(Repeated(5))).into()],
    ));
    assert_eq!(result.run_count(), 1);
    assert_eq!(result.failure_count(), 1);
    assert_eq!(count.load(Ordering::SeqCst), 5);
    Ok(())
}
