// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    errors::{ArgumentError, CouldNotGenerateValue},
    failure::{BoxError, TestError},
};
use std::{
    any::{Any, TypeId, type_name},
    fmt,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};

type Value = Arc<dyn Any + Send + Sync>;
// Generators return the value together with its debug representation.
type Generator = Arc<dyn Fn() -> Result<(Value, String), BoxError> + Send + Sync>;

/// A candidate value for a theory parameter.
///
/// The value may be computed lazily, in which case computing it can fail. Candidates that fail to
/// materialize are skipped by the theory engine rather than reported.
#[derive(Clone)]
pub struct PotentialAssignment {
    type_id: TypeId,
    type_name: &'static str,
    source: Source,
}

#[derive(Clone)]
enum Source {
    Value { value: Value, description: String },
    Null { description: String },
    Lazy { name: String, generate: Generator },
}

impl PotentialAssignment {
    /// A candidate with a known value, named `name` in failure messages.
    pub fn for_value<T>(name: &str, value: T) -> Self
    where
        T: Any + fmt::Debug + Send + Sync,
    {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            source: Source::Value {
                description: format!("{value:?} <from {name}>"),
                value: Arc::new(value),
            },
        }
    }

    /// A null candidate for a parameter of type `T`.
    pub fn null<T: Any>(name: &str) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            source: Source::Null {
                description: format!("null <from {name}>"),
            },
        }
    }

    /// A candidate computed by `generate` when a complete assignment is run.
    pub fn lazy<T, F>(name: &str, generate: F) -> Self
    where
        T: Any + fmt::Debug + Send + Sync,
        F: Fn() -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            source: Source::Lazy {
                name: name.to_owned(),
                generate: Arc::new(move || {
                    let value = generate()?;
                    let debug = format!("{value:?}");
                    Ok((Arc::new(value) as Value, debug))
                }),
            },
        }
    }

    /// Returns the type of the candidate's value.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the name of the candidate's type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns true if this is a null candidate.
    pub fn is_null(&self) -> bool {
        matches!(self.source, Source::Null { .. })
    }

    /// Computes the candidate's value and its description for failure messages.
    pub(crate) fn materialize(&self) -> Result<Materialized, CouldNotGenerateValue> {
        match &self.source {
            Source::Value { value, description } => Ok(Materialized {
                value: Some(value.clone()),
                type_name: self.type_name,
                description: description.clone(),
            }),
            Source::Null { description } => Ok(Materialized {
                value: None,
                type_name: self.type_name,
                description: description.clone(),
            }),
            Source::Lazy { name, generate } => {
                // A panicking generator is treated like one returning an error.
                let (value, debug) = catch_unwind(AssertUnwindSafe(|| generate()))
                    .map_err(|_| CouldNotGenerateValue::new(name.as_str(), None))?
                    .map_err(|error| CouldNotGenerateValue::new(name.as_str(), Some(error)))?;
                Ok(Materialized {
                    description: format!("{debug} <from {name}>"),
                    value: Some(value),
                    type_name: self.type_name,
                })
            }
        }
    }
}

impl fmt::Debug for PotentialAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let description = match &self.source {
            Source::Value { description, .. } | Source::Null { description } => description,
            Source::Lazy { name, .. } => name,
        };
        f.debug_struct("PotentialAssignment")
            .field("type_name", &self.type_name)
            .field("description", description)
            .finish()
    }
}

/// A materialized candidate.
#[derive(Clone)]
pub(crate) struct Materialized {
    value: Option<Value>,
    type_name: &'static str,
    description: String,
}

/// The partial assignment of candidates to parameters built during a theory's search.
#[derive(Clone, Debug, Default)]
pub(crate) struct Assignments {
    assigned: Vec<PotentialAssignment>,
}

impl Assignments {
    pub(crate) fn len(&self) -> usize {
        self.assigned.len()
    }

    pub(crate) fn push(&mut self, candidate: PotentialAssignment) {
        self.assigned.push(candidate);
    }

    pub(crate) fn pop(&mut self) {
        self.assigned.pop();
    }

    /// Materializes every assigned candidate, stopping at the first that fails.
    pub(crate) fn materialize(&self) -> Result<Arguments, CouldNotGenerateValue> {
        let values = self
            .assigned
            .iter()
            .map(PotentialAssignment::materialize)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Arguments { values })
    }
}

/// The arguments a theory body is invoked with.
#[derive(Clone)]
pub struct Arguments {
    values: Vec<Materialized>,
}

impl Arguments {
    /// Returns the number of arguments.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the theory takes no arguments.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the argument at `index`, which must be a non-null `T`.
    ///
    /// A failure is reported as an unexpected error, failing the invocation.
    pub fn get<T: Any>(&self, index: usize) -> Result<&T, TestError> {
        self.get_opt(index)?
            .ok_or_else(|| TestError::unexpected(ArgumentError::Null { index }))
    }

    /// Returns the argument at `index`, which must be a `T` or null.
    pub fn get_opt<T: Any>(&self, index: usize) -> Result<Option<&T>, TestError> {
        let argument = self.values.get(index).ok_or_else(|| {
            TestError::unexpected(ArgumentError::OutOfRange {
                index,
                len: self.values.len(),
            })
        })?;
        let Some(value) = &argument.value else {
            return Ok(None);
        };
        value.downcast_ref::<T>().map(Some).ok_or_else(|| {
            TestError::unexpected(ArgumentError::WrongType {
                index,
                expected: type_name::<T>(),
                actual: argument.type_name,
            })
        })
    }

    /// Returns the description of each argument, as used in failure messages.
    pub fn descriptions(&self) -> Vec<String> {
        self.values
            .iter()
            .map(|value| value.description.clone())
            .collect()
    }
}

impl fmt::Debug for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.values.iter().map(|value| &value.description))
            .finish()
    }
}
