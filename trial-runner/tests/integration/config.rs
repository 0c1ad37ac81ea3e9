// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use camino_tempfile::Utf8TempDir;
use color_eyre::eyre::{Result, bail};
use indoc::indoc;
use pretty_assertions::assert_eq;
use std::time::Duration;
use trial_runner::{
    assertions::{assert_true, assume_true},
    config::{ParallelMode, RunnerConfig, TestThreads, get_num_cpus},
    errors::ConfigParseErrorKind,
    plan::{TestGroup, TestPlan, TestUnit},
    runner::TestRunnerBuilder,
};

fn config_dir(contents: &str) -> Result<Utf8TempDir> {
    let dir = camino_tempfile::tempdir()?;
    let config_dir = dir.path().join(".config");
    std::fs::create_dir_all(&config_dir)?;
    std::fs::write(config_dir.join("trial.toml"), contents)?;
    Ok(dir)
}

fn report_plan() -> TestPlan {
    let group = TestGroup::builder("Reports")
        .unit(TestUnit::builder("passes", || Ok(())).class_name("Reports").build())
        .unit(
            TestUnit::builder("fails", || assert_true(false, "report me"))
                .class_name("Reports")
                .build(),
        )
        .unit(
            TestUnit::builder("skips", || assume_true(false, "not today"))
                .class_name("Reports")
                .build(),
        )
        .build();
    TestPlan::new("reports", [group.into()])
}

#[test]
fn profiles_drive_the_runner() -> Result<()> {
    test_init();

    let dir = config_dir(indoc! {r#"
        [profile.default]
        default-timeout = "10s"

        [profile.ci]
        test-threads = -1
        parallel = "groups"

        [profile.ci.junit]
        path = "target/trial/junit.xml"
        report-name = "ci-run"
    "#})?;

    let config = RunnerConfig::from_sources(dir.path(), None)?;
    assert_eq!(config.profile_names(), ["ci", "default"]);

    let default = config.profile(RunnerConfig::DEFAULT_PROFILE)?;
    assert_eq!(default.parallel(), ParallelMode::None);
    assert_eq!(default.default_timeout(), Some(Duration::from_secs(10)));
    assert!(default.junit().is_none());

    let ci = config.profile("ci")?;
    assert_eq!(
        ci.test_threads(),
        TestThreads::Count(get_num_cpus().saturating_sub(1).max(1)),
    );
    assert_eq!(ci.parallel(), ParallelMode::Groups);
    // Unset keys fall back to the default profile.
    assert_eq!(ci.default_timeout(), Some(Duration::from_secs(10)));
    let junit = ci.junit().expect("ci profile has JUnit output");
    assert_eq!(junit.path(), dir.path().join("target/trial/junit.xml"));
    assert_eq!(junit.report_name(), "ci-run");

    let result = TestRunnerBuilder::from_profile(&ci)
        .build()?
        .run(&report_plan())?;
    assert_eq!(result.run_count(), 2);

    let report = std::fs::read_to_string(junit.path())?;
    for needle in [
        r#"name="ci-run""#,
        r#"<testsuite name="Reports""#,
        r#"<testcase name="passes""#,
        r#"classname="Reports""#,
        r#"message="report me""#,
        "<skipped",
    ] {
        assert!(report.contains(needle), "{needle} not found in:\n{report}");
    }
    Ok(())
}

#[test]
fn invalid_config_reports_the_key() -> Result<()> {
    test_init();

    let dir = config_dir(indoc! {r#"
        [profile.default]
        parallel = "sometimes"
    "#})?;
    let error = RunnerConfig::from_sources(dir.path(), None).unwrap_err();
    assert_eq!(error.config_file(), &dir.path().join(".config/trial.toml"));
    let ConfigParseErrorKind::DeserializeError(error) = error.kind() else {
        bail!("expected a deserialize error, got {error:?}");
    };
    assert_eq!(error.path().to_string(), "profile.default.parallel");
    assert!(error.inner().to_string().contains("sometimes"), "{error}");
    Ok(())
}
