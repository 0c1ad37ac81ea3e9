// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity nodes for test units and groups.
//!
//! A [`Description`] names a unit (a leaf) or a group (a node with children). Descriptions are
//! compared by name only: two descriptions with the same display name and the same explicit
//! unique ID are equal regardless of their children or annotations. This lets independently built
//! trees describing the same logical unit be matched against each other, e.g. when filtering.

use std::{
    any::Any,
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};
use trial_metadata::DescriptionSummary;

/// An annotation attached to a description.
///
/// Annotations are opaque to the engine: they are carried through from the registration layer and
/// queried by type, e.g. by [filters](crate::test_filter) and [rules](crate::rules).
pub type Annotation = Arc<dyn Any + Send + Sync>;

/// An identity node for a test unit or a group of units.
#[derive(Clone)]
pub struct Description {
    display_name: Arc<str>,
    unique_id: Option<Arc<str>>,
    annotations: Vec<Annotation>,
    children: Vec<Description>,
    suite: bool,
}

impl Description {
    const TEST_MECHANISM: &'static str = "Test mechanism";
    const NO_TESTS: &'static str = "No Tests";

    /// Creates a description for a group, with no children yet.
    ///
    /// A group stays a group even if it never gets any children, and then describes no units.
    pub fn suite(name: impl Into<String>) -> Self {
        let mut description = Self::new(name.into());
        description.suite = true;
        description
    }

    /// Creates a leaf description with the given display name.
    pub fn leaf(name: impl Into<String>) -> Self {
        Self::new(name.into())
    }

    /// Creates a leaf description for `method_name` within `class_name`.
    ///
    /// The display name is formatted as `method_name(class_name)`, which
    /// [`Self::class_name`] and [`Self::method_name`] parse back apart.
    pub fn test(class_name: impl AsRef<str>, method_name: impl AsRef<str>) -> Self {
        Self::new(format!("{}({})", method_name.as_ref(), class_name.as_ref()))
    }

    /// The description that failures of the notification mechanism itself are reported against.
    pub fn test_mechanism() -> Self {
        Self::new(Self::TEST_MECHANISM.to_owned())
    }

    /// The description of an empty plan.
    pub fn empty() -> Self {
        Self::suite(Self::NO_TESTS)
    }

    fn new(display_name: String) -> Self {
        Self {
            display_name: display_name.into(),
            unique_id: None,
            annotations: Vec::new(),
            children: Vec::new(),
            suite: false,
        }
    }

    /// Sets an explicit disambiguator, for units whose display names would otherwise collide.
    pub fn with_unique_id(mut self, unique_id: impl Into<String>) -> Self {
        self.unique_id = Some(unique_id.into().into());
        self
    }

    /// Adds an annotation.
    pub fn with_annotation<A: Any + Send + Sync>(mut self, annotation: A) -> Self {
        self.annotations.push(Arc::new(annotation));
        self
    }

    /// Adds several type-erased annotations, e.g. ones taken from another description.
    pub fn with_annotations(mut self, annotations: impl IntoIterator<Item = Annotation>) -> Self {
        self.annotations.extend(annotations);
        self
    }

    /// Appends a child.
    ///
    /// Children may only be added while assembling a tree, before it is handed to a runner. A leaf
    /// that is given a child becomes a group.
    pub fn add_child(&mut self, child: Description) {
        self.suite = true;
        self.children.push(child);
    }

    /// Returns the display name.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Returns the explicit disambiguator, if any.
    pub fn unique_id(&self) -> Option<&str> {
        self.unique_id.as_deref()
    }

    /// Returns the children of this description, in order.
    pub fn children(&self) -> &[Description] {
        &self.children
    }

    /// Returns all annotations, in the order they were added.
    pub fn annotations(&self) -> impl Iterator<Item = &(dyn Any + Send + Sync)> + '_ {
        self.annotations.iter().map(|annotation| &**annotation)
    }

    /// Returns the first annotation of type `A`, if any.
    pub fn annotation<A: Any>(&self) -> Option<&A> {
        self.annotations
            .iter()
            .find_map(|annotation| annotation.downcast_ref::<A>())
    }

    /// Returns every annotation of type `A`.
    pub fn annotations_of<A: Any>(&self) -> impl Iterator<Item = &A> + '_ {
        self.annotations
            .iter()
            .filter_map(|annotation| annotation.downcast_ref::<A>())
    }

    /// Returns true if this describes a single unit.
    pub fn is_test(&self) -> bool {
        !self.suite
    }

    /// Returns true if this describes a group, whether or not it has children.
    pub fn is_suite(&self) -> bool {
        self.suite
    }

    /// Returns true if this is the description of an empty plan.
    pub fn is_empty(&self) -> bool {
        *self == Self::empty()
    }

    /// Returns the number of units described by this tree. An empty group describes none.
    pub fn test_count(&self) -> usize {
        if self.suite {
            self.children.iter().map(Self::test_count).sum()
        } else {
            1
        }
    }

    /// Returns the class part of a `method(class)` display name, or the whole display name if it
    /// isn't in that form.
    pub fn class_name(&self) -> &str {
        match self.split_name() {
            Some((_, class_name)) => class_name,
            None => &self.display_name,
        }
    }

    /// Returns the method part of a `method(class)` display name, if the name is in that form.
    pub fn method_name(&self) -> Option<&str> {
        self.split_name().map(|(method_name, _)| method_name)
    }

    fn split_name(&self) -> Option<(&str, &str)> {
        // The class name is the text inside the last parenthesized group, as long as it doesn't
        // span lines.
        let inner = self.display_name.strip_suffix(')')?;
        let open = inner.rfind('(')?;
        let class_name = &inner[open + 1..];
        if class_name.contains('\n') {
            return None;
        }
        Some((&inner[..open], class_name))
    }

    /// Returns a copy of this description with no children. A group's copy is still a group.
    pub fn childless_copy(&self) -> Self {
        Self {
            display_name: self.display_name.clone(),
            unique_id: self.unique_id.clone(),
            annotations: self.annotations.clone(),
            children: Vec::new(),
            suite: self.suite,
        }
    }

    /// Returns a childless copy with `suffix` appended to the name.
    ///
    /// For `method(class)` names, the suffix is appended to the method part so the class is
    /// preserved. The unique ID, if any, gets the same suffix.
    pub fn with_suffix(&self, suffix: &str) -> Self {
        let display_name = match self.split_name() {
            Some((method_name, class_name)) => format!("{method_name}{suffix}({class_name})"),
            None => format!("{}{suffix}", self.display_name),
        };
        Self {
            display_name: display_name.into(),
            unique_id: self
                .unique_id
                .as_ref()
                .map(|unique_id| format!("{unique_id}{suffix}").into()),
            annotations: self.annotations.clone(),
            children: Vec::new(),
            suite: self.suite,
        }
    }

    /// Returns a serializable summary of this tree.
    pub fn summary(&self) -> DescriptionSummary {
        let mut summary =
            DescriptionSummary::new(self.display_name.as_ref()).with_suite(self.suite);
        if let Some(unique_id) = &self.unique_id {
            summary = summary.with_unique_id(unique_id.as_ref());
        }
        self.children
            .iter()
            .fold(summary, |summary, child| summary.with_child(child.summary()))
    }

    /// Restores a description tree from a summary. Annotations are not restored.
    pub fn from_summary(summary: &DescriptionSummary) -> Self {
        let mut description = Self::new(summary.display_name.clone());
        description.unique_id = summary.unique_id.as_deref().map(Into::into);
        description.children = summary.children.iter().map(Self::from_summary).collect();
        description.suite = summary.suite || !description.children.is_empty();
        description
    }
}

impl PartialEq for Description {
    fn eq(&self, other: &Self) -> bool {
        self.display_name == other.display_name && self.unique_id == other.unique_id
    }
}

impl Eq for Description {}

impl Hash for Description {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.display_name.hash(state);
        self.unique_id.hash(state);
    }
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name)
    }
}

impl fmt::Debug for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Description")
            .field("display_name", &self.display_name)
            .field("unique_id", &self.unique_id)
            .field("annotations", &self.annotations.len())
            .field("children", &self.children)
            .field("suite", &self.suite)
            .finish()
    }
}
