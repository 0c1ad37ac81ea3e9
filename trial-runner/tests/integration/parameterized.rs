// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use color_eyre::eyre::Result;
use pretty_assertions::assert_eq;
use trial_runner::{
    assertions::{assert_equals, assume_true},
    plan::{Parameterized, TestPlan},
};

fn doubled(n: u32) -> u32 {
    n + n
}

#[test]
fn each_parameter_set_runs_every_unit() -> Result<()> {
    test_init();

    // The last set is wrong on purpose.
    let class = Parameterized::new("Doubling", [(1, 2), (2, 4), (3, 7)])
        .unit("doubles", |&(n, expected)| assert_equals(expected, doubled(n)))
        .unit("small_only", |&(n, _)| assume_true(n < 3, "large input"));
    let (result, events) = run_recorded(&TestPlan::new("doubling", [class.build().into()]));

    assert_eq!(result.run_count(), 5);
    assert_eq!(result.ignore_count(), 1);
    assert_eq!(result.failure_count(), 1);
    assert_eq!(
        result.failures()[0].to_string(),
        "doubles[2](Doubling): expected:<7> but was:<6>",
    );
    assert_eq!(
        events,
        [
            "run started: doubling",
            "started doubles[0](Doubling)",
            "finished doubles[0](Doubling)",
            "started small_only[0](Doubling)",
            "finished small_only[0](Doubling)",
            "started doubles[1](Doubling)",
            "finished doubles[1](Doubling)",
            "started small_only[1](Doubling)",
            "finished small_only[1](Doubling)",
            "started doubles[2](Doubling)",
            "failed doubles[2](Doubling): expected:<7> but was:<6>",
            "finished doubles[2](Doubling)",
            "started small_only[2](Doubling)",
            "assumption failed small_only[2](Doubling)",
            "finished small_only[2](Doubling)",
            "run finished: 5 run",
        ],
    );
    Ok(())
}
