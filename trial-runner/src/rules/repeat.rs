// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::TestRule;
use crate::{
    description::Description,
    failure::{MultipleFailures, TestResult},
    helpers::lock,
    statement::{SharedStatement, catch_panic, statement},
};
use std::sync::Mutex;

/// Annotation overriding how many times a [`RepeatRule`] evaluates a unit.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Repeated(pub usize);

/// Evaluates a statement several times within one unit, collecting every failure.
///
/// Evaluations run one after the other unless [`parallel`](Self::parallel) is set, in which case
/// they run concurrently on the current rayon thread pool. A unit annotated with [`Repeated`]
/// uses the annotation's count instead of the rule's.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RepeatRule {
    times: usize,
    parallel: bool,
}

impl RepeatRule {
    /// Creates a rule evaluating statements `times` times.
    pub fn new(times: usize) -> Self {
        Self {
            times,
            parallel: false,
        }
    }

    /// Runs the evaluations concurrently.
    pub fn parallel(mut self) -> Self {
        self.parallel = true;
        self
    }

    /// Returns the default number of evaluations.
    pub fn times(&self) -> usize {
        self.times
    }
}

impl TestRule for RepeatRule {
    fn apply(&self, base: SharedStatement, description: &Description) -> SharedStatement {
        let times = description
            .annotation::<Repeated>()
            .map_or(self.times, |repeated| repeated.0);
        let parallel = self.parallel;

        statement(move || {
            let results: Vec<TestResult> = if parallel {
                let results = Mutex::new(Vec::with_capacity(times));
                rayon::scope(|scope| {
                    for _ in 0..times {
                        let base = base.clone();
                        let results = &results;
                        scope.spawn(move |_| {
                            let result = catch_panic(|| base.evaluate());
                            lock(results).push(result);
                        });
                    }
                });
                results.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
            } else {
                (0..times).map(|_| base.evaluate()).collect()
            };

            MultipleFailures::assert_empty(results.into_iter().filter_map(Result::err).collect())
        })
    }
}
