// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{ParameterSignature, PotentialAssignment};
use crate::failure::BoxError;
use std::{
    any::{Any, TypeId},
    fmt,
};

/// Produces the candidates for one theory parameter.
pub trait ParameterSupplier: Send + Sync {
    /// Returns the candidates for `signature`, in the order they should be tried.
    fn value_sources(
        &self,
        signature: &ParameterSignature,
        pool: &DataPointPool,
    ) -> Result<Vec<PotentialAssignment>, BoxError>;
}

/// The data points registered with a theory.
///
/// Each data point belongs to a named set. A single data point forms a set of its own.
#[derive(Clone, Debug, Default)]
pub struct DataPointPool {
    entries: Vec<DataPoint>,
}

#[derive(Clone, Debug)]
struct DataPoint {
    set: String,
    candidate: PotentialAssignment,
}

impl DataPointPool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a single data point, forming the set `name`.
    pub fn data_point<T>(mut self, name: impl Into<String>, value: T) -> Self
    where
        T: Any + fmt::Debug + Send + Sync,
    {
        let name = name.into();
        self.entries.push(DataPoint {
            candidate: PotentialAssignment::for_value(&name, value),
            set: name,
        });
        self
    }

    /// Adds a set of data points named `set`.
    pub fn data_points<T, I>(mut self, set: impl Into<String>, values: I) -> Self
    where
        T: Any + fmt::Debug + Send + Sync,
        I: IntoIterator<Item = T>,
    {
        let set = set.into();
        for (index, value) in values.into_iter().enumerate() {
            self.entries.push(DataPoint {
                candidate: PotentialAssignment::for_value(&format!("{set}[{index}]"), value),
                set: set.clone(),
            });
        }
        self
    }

    /// Adds a null data point of type `T`, forming the set `name`.
    pub fn null_data_point<T: Any>(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.entries.push(DataPoint {
            candidate: PotentialAssignment::null::<T>(&name),
            set: name,
        });
        self
    }

    /// Adds a data point computed when it is first used, forming the set `name`.
    ///
    /// If `generate` fails, assignments using the data point are skipped.
    pub fn lazy_data_point<T, F>(mut self, name: impl Into<String>, generate: F) -> Self
    where
        T: Any + fmt::Debug + Send + Sync,
        F: Fn() -> Result<T, BoxError> + Send + Sync + 'static,
    {
        let name = name.into();
        self.entries.push(DataPoint {
            candidate: PotentialAssignment::lazy(&name, generate),
            set: name,
        });
        self
    }

    /// Returns true if a data point set named `name` exists.
    pub fn has_set(&self, name: &str) -> bool {
        self.entries.iter().any(|entry| entry.set == name)
    }

    /// Returns the number of data points.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the pool has no data points.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the data points of the given type, in registration order.
    ///
    /// If `sets` is non-empty, only data points in those sets are returned.
    pub fn candidates(&self, type_id: TypeId, sets: &[String]) -> Vec<PotentialAssignment> {
        self.entries
            .iter()
            .filter(|entry| entry.candidate.type_id() == type_id)
            .filter(|entry| sets.is_empty() || sets.contains(&entry.set))
            .map(|entry| entry.candidate.clone())
            .collect()
    }
}

/// Supplies every data point in the pool whose type matches the parameter.
///
/// This is the default supplier, honoring [`ParameterSignature::from_data_points`].
#[derive(Clone, Copy, Debug, Default)]
pub struct AllMembersSupplier;

impl ParameterSupplier for AllMembersSupplier {
    fn value_sources(
        &self,
        signature: &ParameterSignature,
        pool: &DataPointPool,
    ) -> Result<Vec<PotentialAssignment>, BoxError> {
        Ok(pool.candidates(signature.type_id(), signature.data_point_sets()))
    }
}

/// Supplies `true` and `false`. The default for `bool` parameters.
#[derive(Clone, Copy, Debug, Default)]
pub struct BooleanSupplier;

impl ParameterSupplier for BooleanSupplier {
    fn value_sources(
        &self,
        _signature: &ParameterSignature,
        _pool: &DataPointPool,
    ) -> Result<Vec<PotentialAssignment>, BoxError> {
        Ok(vec![
            PotentialAssignment::for_value("true", true),
            PotentialAssignment::for_value("false", false),
        ])
    }
}

/// Supplies a fixed list of values, ignoring the data point pool.
#[derive(Clone, Debug)]
pub struct ValuesSupplier {
    candidates: Vec<PotentialAssignment>,
}

impl ValuesSupplier {
    /// Creates a supplier for `values`, named `name` in failure messages.
    pub fn new<T, I>(name: &str, values: I) -> Self
    where
        T: Any + fmt::Debug + Send + Sync,
        I: IntoIterator<Item = T>,
    {
        Self {
            candidates: values
                .into_iter()
                .map(|value| PotentialAssignment::for_value(name, value))
                .collect(),
        }
    }
}

impl ParameterSupplier for ValuesSupplier {
    fn value_sources(
        &self,
        _signature: &ParameterSignature,
        _pool: &DataPointPool,
    ) -> Result<Vec<PotentialAssignment>, BoxError> {
        Ok(self.candidates.clone())
    }
}
