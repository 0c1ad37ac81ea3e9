// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Filtering and sorting units based on their descriptions.
//!
//! Filters are applied to a [`TestPlan`](crate::plan::TestPlan) before a run with
//! [`TestPlan::filter`](crate::plan::TestPlan::filter). A group is kept if any unit in it is kept.

use crate::description::Description;
use itertools::Itertools;
use std::{cmp::Ordering, collections::BTreeSet, fmt};

/// Decides which units run.
pub trait Filter: Send + Sync {
    /// Returns true if the unit described by `description` should run.
    ///
    /// For a group, returns true if any unit within it should run.
    fn should_run(&self, description: &Description) -> bool;

    /// Returns a human-readable description of the filter, used in error messages.
    fn describe(&self) -> String;
}

/// Combinators for filters.
pub trait FilterExt: Filter + Sized {
    /// Returns a filter that runs only the units both `self` and `other` run.
    fn intersect<F: Filter>(self, other: F) -> Intersection<Self, F> {
        Intersection {
            first: self,
            second: other,
        }
    }
}

impl<F: Filter> FilterExt for F {}

fn any_unit(description: &Description, matches: impl Fn(&Description) -> bool + Copy) -> bool {
    if description.is_test() {
        matches(description)
    } else {
        description
            .children()
            .iter()
            .any(|child| any_unit(child, matches))
    }
}

/// A filter that runs every unit.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllFilter;

impl Filter for AllFilter {
    fn should_run(&self, _description: &Description) -> bool {
        true
    }

    fn describe(&self) -> String {
        "all tests".to_owned()
    }
}

/// A filter that runs exactly the units equal to one description.
///
/// Descriptions compare by name, so this matches units of independently built trees.
#[derive(Clone, Debug)]
pub struct MatchDescription {
    desired: Description,
}

impl MatchDescription {
    /// Runs only `desired`, or the units within it if it describes a group.
    pub fn new(desired: Description) -> Self {
        Self { desired }
    }
}

impl Filter for MatchDescription {
    fn should_run(&self, description: &Description) -> bool {
        any_unit(description, |unit| {
            *unit == self.desired || self.desired.children().contains(unit)
        })
    }

    fn describe(&self) -> String {
        format!("Method {}", self.desired.display_name())
    }
}

/// A category a unit belongs to, attached to its description as an annotation.
///
/// Categories are not inherited: a unit belongs to the categories of its own description only.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Category(String);

impl Category {
    /// Creates a new category.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name of the category.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Includes or excludes units by [`Category`].
///
/// A unit in any excluded category never runs. If no categories are included, every other unit
/// runs; otherwise a unit must be in at least one included category.
#[derive(Clone, Debug, Default)]
pub struct CategoryFilter {
    included: BTreeSet<Category>,
    excluded: BTreeSet<Category>,
}

impl CategoryFilter {
    /// Creates a filter that runs every unit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds categories to include.
    pub fn include<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.included
            .extend(categories.into_iter().map(Category::new));
        self
    }

    /// Adds categories to exclude.
    pub fn exclude<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded
            .extend(categories.into_iter().map(Category::new));
        self
    }

    fn matches_unit(&self, unit: &Description) -> bool {
        let categories: BTreeSet<_> = unit.annotations_of::<Category>().collect();
        if self.excluded.iter().any(|category| categories.contains(category)) {
            return false;
        }
        self.included.is_empty()
            || self
                .included
                .iter()
                .any(|category| categories.contains(category))
    }
}

impl Filter for CategoryFilter {
    fn should_run(&self, description: &Description) -> bool {
        any_unit(description, |unit| self.matches_unit(unit))
    }

    fn describe(&self) -> String {
        let included = if self.included.is_empty() {
            "all".to_owned()
        } else {
            self.included.iter().join(", ")
        };
        if self.excluded.is_empty() {
            format!("categories [{included}]")
        } else {
            format!(
                "categories [{included}] - [{}]",
                self.excluded.iter().join(", ")
            )
        }
    }
}

/// Runs the units both filters run. Created by [`FilterExt::intersect`].
#[derive(Clone, Debug)]
pub struct Intersection<A, B> {
    first: A,
    second: B,
}

impl<A: Filter, B: Filter> Filter for Intersection<A, B> {
    fn should_run(&self, description: &Description) -> bool {
        any_unit(description, |unit| {
            self.first.should_run(unit) && self.second.should_run(unit)
        })
    }

    fn describe(&self) -> String {
        format!("{} and {}", self.first.describe(), self.second.describe())
    }
}

/// Orders descriptions by display name.
///
/// Pass to [`TestPlan::sorted_by`](crate::plan::TestPlan::sorted_by).
pub fn alphanumeric(a: &Description, b: &Description) -> Ordering {
    a.display_name().cmp(b.display_name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn tree() -> Description {
        let mut suite = Description::suite("Suite");
        suite.add_child(Description::test("Math", "adds").with_annotation(Category::new("fast")));
        suite.add_child(
            Description::test("Math", "factors")
                .with_annotation(Category::new("slow"))
                .with_annotation(Category::new("flaky")),
        );
        suite.add_child(Description::test("Math", "plain"));
        suite
    }

    fn running(filter: &dyn Filter) -> Vec<String> {
        tree()
            .children()
            .iter()
            .filter(|unit| filter.should_run(unit))
            .map(|unit| unit.display_name().to_owned())
            .collect()
    }

    #[test_case(CategoryFilter::new(), &["adds(Math)", "factors(Math)", "plain(Math)"]; "everything")]
    #[test_case(CategoryFilter::new().include(["slow"]), &["factors(Math)"]; "include")]
    #[test_case(CategoryFilter::new().exclude(["slow"]), &["adds(Math)", "plain(Math)"]; "exclude")]
    #[test_case(
        CategoryFilter::new().include(["fast", "slow"]).exclude(["flaky"]),
        &["adds(Math)"]
        ; "exclusion wins"
    )]
    fn categories(filter: CategoryFilter, expected: &[&str]) {
        assert_eq!(running(&filter), expected);
    }

    #[test]
    fn groups_match_if_any_unit_does() {
        let filter = MatchDescription::new(Description::test("Math", "plain"));
        assert!(filter.should_run(&tree()));
        assert_eq!(running(&filter), ["plain(Math)"]);
        assert_eq!(filter.describe(), "Method plain(Math)");

        let filter = MatchDescription::new(Description::test("Math", "divides"));
        assert!(!filter.should_run(&tree()));
    }

    #[test]
    fn intersection() {
        let filter = CategoryFilter::new()
            .exclude(["fast"])
            .intersect(MatchDescription::new(Description::test("Math", "factors")));
        assert_eq!(running(&filter), ["factors(Math)"]);
        assert_eq!(
            filter.describe(),
            "categories [all] - [fast] and Method factors(Math)",
        );
        assert_eq!(running(&AllFilter.intersect(AllFilter)).len(), 3);
    }

    #[test]
    fn sorting() {
        let mut names = vec![
            Description::leaf("b"),
            Description::leaf("c"),
            Description::leaf("a"),
        ];
        names.sort_by(alphanumeric);
        let names: Vec<_> = names.iter().map(Description::display_name).collect();
        assert_eq!(names, ["a", "b", "c"]);
    }
}
