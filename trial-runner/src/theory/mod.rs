// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Theories: units run once per valid combination of parameter values.
//!
//! A [`Theory`] declares its parameters with [`ParameterSignature`]s. Candidates for each parameter
//! come from a [`ParameterSupplier`], by default the theory's [`DataPointPool`]. The
//! [`TheoryEngine`] searches the cross-product of candidates depth-first:
//!
//! * candidates that fail to materialize are skipped;
//! * assignments for which the body violates an assumption don't count as successes, but don't
//!   stop the search;
//! * the first other error stops the search and is reported together with the arguments it was
//!   raised for;
//! * a search that finishes without a single success fails the unit.

mod assignment;
mod signature;
mod supplier;

pub use assignment::*;
pub use signature::*;
pub use supplier::*;

use crate::{
    failure::{
        AssumptionViolation, InitializationError, ParameterizedAssertionError, TestError,
        TestResult, UnexpectedError, UnsatisfiedTheory,
    },
    statement::{RuleChainBuilder, Statement, catch_panic, statement},
};
use std::{fmt, sync::Arc};
use tracing::debug;

type TheoryBody = Arc<dyn Fn(&Arguments) -> TestResult + Send + Sync>;

/// A parameterized unit.
#[derive(Clone)]
pub struct Theory {
    method_name: String,
    parameters: Vec<ParameterSignature>,
    data_points: DataPointPool,
    nulls_accepted: bool,
    body: TheoryBody,
}

impl Theory {
    /// Creates a theory named `method_name` that runs `body` with each assignment.
    pub fn new<F>(method_name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&Arguments) -> TestResult + Send + Sync + 'static,
    {
        Self {
            method_name: method_name.into(),
            parameters: Vec::new(),
            data_points: DataPointPool::default(),
            nulls_accepted: false,
            body: Arc::new(body),
        }
    }

    /// Appends a parameter.
    pub fn parameter(mut self, signature: ParameterSignature) -> Self {
        self.parameters.push(signature);
        self
    }

    /// Sets the data points candidates are drawn from.
    pub fn data_points(mut self, pool: DataPointPool) -> Self {
        self.data_points = pool;
        self
    }

    /// Sets whether null candidates are tried. Defaults to false; parameters may override this.
    pub fn nulls_accepted(mut self, accepted: bool) -> Self {
        self.nulls_accepted = accepted;
        self
    }

    /// Returns the name of the theory.
    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    /// Returns the parameters, in order.
    pub fn parameters(&self) -> &[ParameterSignature] {
        &self.parameters
    }

    /// Checks that every named data point set a parameter refers to exists.
    pub fn validate(&self) -> Result<(), Vec<InitializationError>> {
        let errors: Vec<_> = self
            .parameters
            .iter()
            .filter(|signature| signature.supplier().is_none())
            .flat_map(|signature| {
                signature
                    .data_point_sets()
                    .iter()
                    .filter(|set| !self.data_points.has_set(set))
                    .map(move |set| {
                        InitializationError::new(format!(
                            "parameter `{}` of {} refers to unknown data point set `{set}`",
                            signature.name(),
                            self.method_name,
                        ))
                    })
            })
            .collect();
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    fn accepts_nulls(&self, signature: &ParameterSignature) -> bool {
        signature
            .nulls_accepted_override()
            .unwrap_or(self.nulls_accepted)
    }

    fn candidates(
        &self,
        signature: &ParameterSignature,
    ) -> Result<Vec<PotentialAssignment>, TestError> {
        let sources = match signature.supplier() {
            Some(supplier) => supplier.value_sources(signature, &self.data_points),
            None if signature.is::<bool>() && signature.data_point_sets().is_empty() => {
                BooleanSupplier.value_sources(signature, &self.data_points)
            }
            None => AllMembersSupplier.value_sources(signature, &self.data_points),
        };
        let sources = sources.map_err(|error| {
            TestError::from(UnexpectedError::from_boxed("ParameterSupplier", error))
        })?;
        Ok(sources
            .into_iter()
            .filter(|candidate| !candidate.is_null() || self.accepts_nulls(signature))
            .collect())
    }
}

impl fmt::Debug for Theory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Theory")
            .field("method_name", &self.method_name)
            .field("parameters", &self.parameters)
            .field("data_points", &self.data_points.len())
            .field("nulls_accepted", &self.nulls_accepted)
            .finish_non_exhaustive()
    }
}

/// The statement that runs a theory.
///
/// Each complete assignment is run through its own statement built by the rule chain, so setups,
/// teardowns, rules and deadlines apply per invocation.
#[derive(Clone, Debug)]
pub struct TheoryEngine {
    theory: Arc<Theory>,
    chain: RuleChainBuilder,
}

impl TheoryEngine {
    /// Creates an engine for `theory`, wrapping each invocation with `chain`.
    pub fn new(theory: Arc<Theory>, chain: RuleChainBuilder) -> Self {
        Self { theory, chain }
    }
}

impl Statement for TheoryEngine {
    fn evaluate(&self) -> TestResult {
        let mut search = Search {
            theory: &self.theory,
            chain: &self.chain,
            assignments: Assignments::default(),
            successes: 0,
            violations: Vec::new(),
        };
        search.explore()?;

        if search.successes > 0 {
            return Ok(());
        }
        let method = self.theory.method_name.clone();
        let error = if search.violations.is_empty() {
            UnsatisfiedTheory::NoAssignments { method }
        } else {
            UnsatisfiedTheory::AllAssumptionsViolated {
                method,
                violations: search.violations,
            }
        };
        Err(error.into())
    }
}

struct Search<'a> {
    theory: &'a Theory,
    chain: &'a RuleChainBuilder,
    assignments: Assignments,
    successes: usize,
    violations: Vec<AssumptionViolation>,
}

impl Search<'_> {
    fn explore(&mut self) -> TestResult {
        let theory = self.theory;
        let Some(signature) = theory.parameters.get(self.assignments.len()) else {
            return self.run_complete();
        };

        for candidate in theory.candidates(signature)? {
            self.assignments.push(candidate);
            let result = self.explore();
            self.assignments.pop();
            result?;
        }
        Ok(())
    }

    fn run_complete(&mut self) -> TestResult {
        let arguments = match self.assignments.materialize() {
            Ok(arguments) => arguments,
            Err(error) => {
                debug!(
                    "skipping assignment for {}: {error}",
                    self.theory.method_name
                );
                return Ok(());
            }
        };

        let body = self.theory.body.clone();
        let invocation_arguments = arguments.clone();
        let invocation = self
            .chain
            .build(statement(move || catch_panic(|| body(&invocation_arguments))));

        match invocation.evaluate() {
            Ok(()) => {
                self.successes += 1;
                Ok(())
            }
            Err(error) if error.is_assumption_violation() => {
                debug!(
                    "assumption violated for {}{arguments:?}: {error}",
                    self.theory.method_name
                );
                self.violations.push(AssumptionViolation::new(error.to_string()));
                Ok(())
            }
            Err(error) if arguments.is_empty() => Err(error),
            Err(error) => Err(ParameterizedAssertionError::new(
                self.theory.method_name.as_str(),
                arguments.descriptions(),
                error,
            )
            .into()),
        }
    }
}
