// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::{Arc, Mutex};
use trial_runner::{
    failure::BoxError,
    plan::TestPlan,
    reporter::{RunEvent, RunEventKind, RunListener, RunNotifier},
    result::RunResult,
    runner::TestRunnerBuilder,
};

pub(crate) fn test_init() {
    // Either may already have been installed by another test in this binary.
    let _ = color_eyre::install();
    trial_runner::output::init_logging();
}

/// Runs `plan` sequentially with default settings.
pub(crate) fn run(plan: &TestPlan) -> RunResult {
    TestRunnerBuilder::default()
        .build()
        .expect("sequential runner builds")
        .run(plan)
        .expect("run is not stopped")
}

/// Runs `plan` sequentially, returning the result along with every event fired.
pub(crate) fn run_recorded(plan: &TestPlan) -> (RunResult, Vec<String>) {
    let notifier = Arc::new(RunNotifier::new());
    let recorder = Arc::new(EventRecorder::default());
    notifier.subscribe(recorder.clone());
    let result = TestRunnerBuilder::default()
        .build()
        .expect("sequential runner builds")
        .run_with(plan, &notifier)
        .expect("run is not stopped");
    (result, recorder.events())
}

/// Records events as short strings.
#[derive(Debug, Default)]
pub(crate) struct EventRecorder {
    events: Mutex<Vec<String>>,
}

impl EventRecorder {
    pub(crate) fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl RunListener for EventRecorder {
    fn handle_event(&self, event: &RunEvent) -> Result<(), BoxError> {
        let entry = match &event.kind {
            RunEventKind::RunStarted { description } => format!("run started: {description}"),
            RunEventKind::RunFinished { result } => {
                format!("run finished: {} run", result.run_count())
            }
            RunEventKind::UnitStarted { description } => format!("started {description}"),
            RunEventKind::UnitFinished { description } => format!("finished {description}"),
            RunEventKind::UnitFailed { failure } => format!("failed {failure}"),
            RunEventKind::AssumptionFailed { failure } => {
                format!("assumption failed {}", failure.description())
            }
            RunEventKind::UnitIgnored {
                description,
                reason,
            } => format!("ignored {description} ({})", reason.as_deref().unwrap_or("-")),
        };
        self.events.lock().unwrap().push(entry);
        Ok(())
    }
}
