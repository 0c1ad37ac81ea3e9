// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use color_eyre::eyre::{Result, bail};
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};
use test_case::test_case;
use trial_runner::{
    assertions::{assert_true, assume_true, fail},
    failure::{TestError, UnsatisfiedTheory},
    plan::{TestPlan, TestUnit},
    theory::{DataPointPool, ParameterSignature, Theory, ValuesSupplier},
};

fn run_theory(theory: Theory) -> trial_runner::result::RunResult {
    let unit = TestUnit::theory_builder(theory)
        .class_name("Theories")
        .build();
    run(&TestPlan::new("theories", [unit.into()]))
}

#[test_case(5, 0; "none violated")]
#[test_case(5, 3; "some violated")]
#[test_case(5, 4; "one satisfied")]
#[test_case(5, 5; "all violated")]
#[test_case(1, 1; "single violated")]
fn assumption_violations(candidates: usize, violated: usize) -> Result<()> {
    test_init();

    let values: Vec<usize> = (0..candidates).collect();
    let theory = Theory::new("holds", move |args| {
        let n = *args.get::<usize>(0)?;
        assume_true(n >= violated, format!("n = {n}"))?;
        assert_true(n < candidates, "in range")
    })
    .parameter(ParameterSignature::of::<usize>("n"))
    .data_points(DataPointPool::new().data_points("values", values));

    let result = run_theory(theory);
    assert_eq!(result.run_count(), 1);

    if violated < candidates {
        assert_eq!(result.failure_count(), 0);
        return Ok(());
    }

    let failures = result.failures();
    assert_eq!(failures.len(), 1);
    let TestError::UnsatisfiedTheory(UnsatisfiedTheory::AllAssumptionsViolated {
        violations, ..
    }) = failures[0].error()
    else {
        bail!("expected all assumptions violated, got {:?}", failures[0].error());
    };
    assert_eq!(violations.len(), candidates);
    let message = failures[0].message();
    for n in 0..candidates {
        assert!(message.contains(&format!("n = {n}")), "{message}");
    }
    Ok(())
}

#[test]
fn first_genuine_failure_stops_the_search() -> Result<()> {
    test_init();

    let attempted = Arc::new(Mutex::new(Vec::new()));
    let attempted2 = attempted.clone();
    let theory = Theory::new("never_seven", move |args| {
        let n = *args.get::<i64>(0)?;
        attempted2.lock().unwrap().push(n);
        if n == 7 { fail(format!("saw {n}")) } else { Ok(()) }
    })
    .parameter(
        ParameterSignature::of::<i64>("n")
            .supplied_by(Arc::new(ValuesSupplier::new("n", [1_i64, 7, 9, 11]))),
    );

    let result = run_theory(theory);
    assert_eq!(*attempted.lock().unwrap(), [1, 7]);

    let failures = result.failures();
    assert_eq!(failures.len(), 1);
    let TestError::Parameterized(error) = failures[0].error() else {
        bail!("expected a parameterized error, got {:?}", failures[0].error());
    };
    assert_eq!(error.method(), "never_seven");
    assert_eq!(error.arguments().len(), 1);
    assert!(error.arguments()[0].starts_with("7"), "{:?}", error.arguments());
    assert_eq!(error.cause().to_string(), "saw 7");
    Ok(())
}

#[test]
fn theory_with_unknown_data_point_set_is_an_initialization_error() -> Result<()> {
    test_init();

    let theory = Theory::new("misnamed", |_| Ok(()))
        .parameter(ParameterSignature::of::<i32>("n").from_data_points(["missing"]))
        .data_points(DataPointPool::new().data_points("present", [1, 2]));
    let result = run_theory(theory);

    let failures = result.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(
        failures[0].test_header(),
        "initializationError(misnamed(Theories))",
    );
    assert!(matches!(failures[0].error(), TestError::Initialization(_)));
    Ok(())
}

#[test]
fn setups_run_once_per_assignment() -> Result<()> {
    test_init();

    let log = Arc::new(Mutex::new(Vec::new()));
    let body_log = log.clone();
    let setup_log = log.clone();
    let theory = Theory::new("pairs", move |args| {
        let flag = *args.get::<bool>(0)?;
        let n = *args.get::<i32>(1)?;
        body_log.lock().unwrap().push(format!("{flag}/{n}"));
        Ok(())
    })
    .parameter(ParameterSignature::of::<bool>("flag"))
    .parameter(ParameterSignature::of::<i32>("n"))
    .data_points(DataPointPool::new().data_points("ints", [1, 2]));

    let unit = TestUnit::theory_builder(theory)
        .class_name("Theories")
        .setup(move || {
            setup_log.lock().unwrap().push("setup".to_owned());
            Ok(())
        })
        .build();
    let result = run(&TestPlan::new("theories", [unit.into()]));

    assert_eq!(result.run_count(), 1);
    assert_eq!(result.failure_count(), 0);
    assert_eq!(
        *log.lock().unwrap(),
        [
            "setup", "true/1", "setup", "true/2", "setup", "false/1", "setup", "false/2",
        ],
    );
    Ok(())
}
