// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::ParameterSupplier;
use std::{
    any::{Any, TypeId, type_name},
    fmt,
    sync::Arc,
};

/// Describes one formal parameter of a theory: its type, and where its candidates come from.
#[derive(Clone)]
pub struct ParameterSignature {
    name: String,
    type_id: TypeId,
    type_name: &'static str,
    nulls_accepted: Option<bool>,
    data_point_sets: Vec<String>,
    supplier: Option<Arc<dyn ParameterSupplier>>,
}

impl ParameterSignature {
    /// Describes a parameter of type `T`.
    pub fn of<T: Any>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            nulls_accepted: None,
            data_point_sets: Vec::new(),
            supplier: None,
        }
    }

    /// Overrides the theory's policy on null candidates for this parameter.
    pub fn nulls_accepted(mut self, accepted: bool) -> Self {
        self.nulls_accepted = Some(accepted);
        self
    }

    /// Restricts candidates to the named data point sets.
    pub fn from_data_points<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.data_point_sets.extend(names.into_iter().map(Into::into));
        self
    }

    /// Uses `supplier` instead of the theory's data points.
    pub fn supplied_by(mut self, supplier: Arc<dyn ParameterSupplier>) -> Self {
        self.supplier = Some(supplier);
        self
    }

    /// Returns the parameter's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the parameter's type.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the name of the parameter's type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns true if the parameter has type `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Returns whether nulls are accepted for this parameter, if overridden.
    pub fn nulls_accepted_override(&self) -> Option<bool> {
        self.nulls_accepted
    }

    /// Returns the data point sets candidates are restricted to. Empty means all data points.
    pub fn data_point_sets(&self) -> &[String] {
        &self.data_point_sets
    }

    /// Returns the custom supplier, if any.
    pub fn supplier(&self) -> Option<&Arc<dyn ParameterSupplier>> {
        self.supplier.as_ref()
    }
}

impl fmt::Debug for ParameterSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterSignature")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("nulls_accepted", &self.nulls_accepted)
            .field("data_point_sets", &self.data_point_sets)
            .field("supplier", &self.supplier.is_some())
            .finish()
    }
}
