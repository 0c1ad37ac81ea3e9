// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Code to generate JUnit XML reports from run events.

use super::{
    events::{RunEvent, RunEventKind},
    notifier::RunListener,
};
use crate::{
    config::JunitConfig,
    description::Description,
    errors::WriteEventError,
    failure::{BoxError, Failure},
    helpers::lock,
    time::{StopwatchStart, stopwatch},
};
use chrono::Local;
use debug_ignore::DebugIgnore;
use indexmap::IndexMap;
use itertools::Itertools;
use quick_junit::{NonSuccessKind, Report, TestCase, TestCaseStatus, TestSuite};
use std::{collections::HashMap, fs::File, sync::Mutex};
use tracing::debug;

/// A [`RunListener`] that writes a JUnit XML report once the run finishes.
///
/// Units are grouped into test suites by class name. Ignored units and units that violated an
/// assumption are reported as skipped.
#[derive(Debug)]
pub struct JunitAggregator {
    config: JunitConfig,
    state: Mutex<JunitState>,
}

#[derive(Debug, Default)]
struct JunitState {
    run_start: Option<StopwatchStart>,
    test_suites: DebugIgnore<IndexMap<String, TestSuite>>,
    running: HashMap<Description, RunningUnit>,
}

#[derive(Debug)]
struct RunningUnit {
    start: StopwatchStart,
    failures: Vec<Failure>,
    skipped: Option<Failure>,
}

impl JunitAggregator {
    /// Creates a new aggregator writing to the location in `config`.
    pub fn new(config: JunitConfig) -> Self {
        Self {
            config,
            state: Mutex::new(JunitState::default()),
        }
    }

    /// Returns the configuration for the report.
    pub fn config(&self) -> &JunitConfig {
        &self.config
    }

    fn write_event(&self, event: &RunEvent) -> Result<(), WriteEventError> {
        let mut guard = lock(&self.state);
        let state = &mut *guard;
        match &event.kind {
            RunEventKind::RunStarted { .. } => {
                state.run_start = Some(stopwatch());
            }
            RunEventKind::UnitStarted { description } => {
                state.running.insert(
                    description.clone(),
                    RunningUnit {
                        start: stopwatch(),
                        failures: Vec::new(),
                        skipped: None,
                    },
                );
            }
            RunEventKind::UnitFailed { failure } => {
                match state.running.get_mut(failure.description()) {
                    Some(unit) => unit.failures.push(failure.clone()),
                    None => {
                        // Failures outside of a unit come from group setup or teardown, or from the
                        // run machinery itself.
                        let mut testcase = TestCase::new(
                            test_name(failure.description()),
                            failed_status(&[failure]),
                        );
                        testcase
                            .set_classname(failure.description().class_name())
                            .set_timestamp(event.timestamp);
                        state.add_test_case(failure.description(), testcase);
                    }
                }
            }
            RunEventKind::AssumptionFailed { failure } => {
                if let Some(unit) = state.running.get_mut(failure.description()) {
                    unit.skipped = Some(failure.clone());
                }
            }
            RunEventKind::UnitFinished { description } => {
                let Some(unit) = state.running.remove(description) else {
                    debug!("unit {description} finished without starting");
                    return Ok(());
                };
                let snapshot = unit.start.snapshot();

                let status = if !unit.failures.is_empty() {
                    failed_status(&unit.failures.iter().collect::<Vec<_>>())
                } else if let Some(skipped) = &unit.skipped {
                    let mut status = TestCaseStatus::skipped();
                    status
                        .set_message(skipped.message())
                        .set_type(skipped.error().type_name());
                    status
                } else {
                    TestCaseStatus::success()
                };

                let mut testcase = TestCase::new(test_name(description), status);
                testcase
                    .set_classname(description.class_name())
                    .set_timestamp(snapshot.start_time)
                    .set_time(snapshot.duration);
                state.add_test_case(description, testcase);
            }
            RunEventKind::UnitIgnored {
                description,
                reason,
            } => {
                let mut status = TestCaseStatus::skipped();
                if let Some(reason) = reason {
                    status.set_message(reason.clone());
                }
                let mut testcase = TestCase::new(test_name(description), status);
                testcase
                    .set_classname(description.class_name())
                    .set_timestamp(event.timestamp);
                state.add_test_case(description, testcase);
            }
            RunEventKind::RunFinished { result } => {
                // Write out the report to the given file.
                let mut report = Report::new(self.config.report_name());
                let start_time = state
                    .run_start
                    .as_ref()
                    .map(|start| start.start_time())
                    .or_else(|| result.start_time())
                    .unwrap_or_else(|| Local::now().fixed_offset());
                report
                    .set_timestamp(start_time)
                    .set_time(result.run_time())
                    .add_test_suites(state.test_suites.drain(..).map(|(_, suite)| suite));

                let junit_path = self.config.path();
                if let Some(junit_dir) = junit_path.parent().filter(|dir| !dir.as_str().is_empty())
                {
                    std::fs::create_dir_all(junit_dir).map_err(|error| WriteEventError::Fs {
                        file: junit_dir.to_path_buf(),
                        error,
                    })?;
                }

                let f = File::create(junit_path).map_err(|error| WriteEventError::Fs {
                    file: junit_path.to_path_buf(),
                    error,
                })?;
                report
                    .serialize(f)
                    .map_err(|error| WriteEventError::Junit {
                        file: junit_path.to_path_buf(),
                        error,
                    })?;
                debug!("wrote JUnit report to {junit_path}");
            }
        }

        Ok(())
    }
}

impl RunListener for JunitAggregator {
    fn handle_event(&self, event: &RunEvent) -> Result<(), BoxError> {
        self.write_event(event).map_err(BoxError::from)
    }
}

impl JunitState {
    fn add_test_case(&mut self, description: &Description, testcase: TestCase) {
        let class_name = description.class_name();
        self.test_suites
            .entry(class_name.to_owned())
            .or_insert_with(|| TestSuite::new(class_name))
            .add_test_case(testcase);
    }
}

fn test_name(description: &Description) -> &str {
    description
        .method_name()
        .unwrap_or_else(|| description.display_name())
}

fn failed_status(failures: &[&Failure]) -> TestCaseStatus {
    let mut status = TestCaseStatus::non_success(NonSuccessKind::Failure);
    if let Some(first) = failures.first() {
        status
            .set_message(first.message())
            .set_type(first.error().type_name());
    }
    if failures.len() > 1 {
        status.set_description(failures.iter().map(|failure| failure.message()).join("\n"));
    }
    status
}
