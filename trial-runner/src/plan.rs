// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The registration interface: a forest of test units and groups.
//!
//! Front-ends build [`TestUnit`]s and [`TestGroup`]s explicitly and collect them into a
//! [`TestPlan`]. The plan mirrors its nodes in a [`Description`] tree, which can be inspected,
//! filtered and sorted before the plan is handed to a [`TestRunner`](crate::runner::TestRunner).

use crate::{
    description::Description,
    errors::{NoTestsRemain, RepeatCountError},
    failure::{InitializationError, TestResult},
    rules::{ScopedRule, TestRule},
    statement::{
        Action, ExpectedError, Invoke, RuleChainBuilder, SharedStatement, action,
    },
    test_filter::Filter,
    theory::{Theory, TheoryEngine},
};
use debug_ignore::DebugIgnore;
use std::{any::Any, cmp::Ordering, fmt, sync::Arc, time::Duration};

/// What a unit runs.
#[derive(Clone)]
pub enum Invocation {
    /// A plain test body, run once.
    Action(Action),

    /// A theory, run once per assignment of its parameters.
    Theory(Arc<Theory>),
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Action(_) => f.write_str("Action"),
            Self::Theory(theory) => f.debug_tuple("Theory").field(theory).finish(),
        }
    }
}

/// A single runnable test unit: a leaf of the plan.
#[derive(Clone, Debug)]
pub struct TestUnit {
    description: Description,
    invocation: Invocation,
    setups: DebugIgnore<Vec<Action>>,
    teardowns: DebugIgnore<Vec<Action>>,
    rules: Vec<ScopedRule>,
    expected: Option<ExpectedError>,
    timeout: Option<Duration>,
    ignored: Option<IgnoreReason>,
}

#[derive(Clone, Debug)]
struct IgnoreReason(Option<String>);

impl TestUnit {
    /// Starts building a unit named `name` that runs `body`.
    pub fn builder<F>(name: impl Into<String>, body: F) -> UnitBuilder
    where
        F: Fn() -> TestResult + Send + Sync + 'static,
    {
        UnitBuilder::new(name.into(), Invocation::Action(action(body)))
    }

    /// Starts building a unit that runs `theory`, named after the theory.
    pub fn theory_builder(theory: Theory) -> UnitBuilder {
        UnitBuilder::new(
            theory.method_name().to_owned(),
            Invocation::Theory(Arc::new(theory)),
        )
    }

    /// Returns the description of this unit.
    pub fn description(&self) -> &Description {
        &self.description
    }

    /// Returns what this unit runs.
    pub fn invocation(&self) -> &Invocation {
        &self.invocation
    }

    /// Returns the unit's own deadline, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Returns the error this unit is expected to fail with, if any.
    pub fn expected(&self) -> Option<&ExpectedError> {
        self.expected.as_ref()
    }

    /// Returns true if this unit is ignored.
    pub fn is_ignored(&self) -> bool {
        self.ignored.is_some()
    }

    /// Returns the reason this unit is ignored, if one was given.
    pub fn ignore_reason(&self) -> Option<&str> {
        self.ignored.as_ref().and_then(|reason| reason.0.as_deref())
    }

    /// Checks that the unit can be turned into a statement.
    pub fn validate(&self) -> Result<(), Vec<InitializationError>> {
        let mut errors = Vec::new();
        if self.timeout == Some(Duration::ZERO) {
            errors.push(InitializationError::new(format!(
                "timeout of {} must be greater than zero",
                self.description.display_name(),
            )));
        }
        if let Invocation::Theory(theory) = &self.invocation {
            if let Err(theory_errors) = theory.validate() {
                errors.extend(theory_errors);
            }
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Builds the statement that runs this unit.
    ///
    /// `inherited_rules` are the group-scoped rules of the groups enclosing the unit, innermost
    /// group first. `default_timeout` applies if the unit has no timeout of its own.
    pub fn statement(
        &self,
        inherited_rules: &[ScopedRule],
        default_timeout: Option<Duration>,
    ) -> SharedStatement {
        let chain = RuleChainBuilder::new(self.description.clone())
            .setups(self.setups.iter().cloned())
            .teardowns(self.teardowns.iter().cloned())
            .rules(self.rules.iter().chain(inherited_rules).cloned())
            .expected(self.expected.clone())
            .timeout(self.timeout.or(default_timeout));

        match &self.invocation {
            Invocation::Action(body) => chain.build(Arc::new(Invoke::new(body.clone()))),
            // The engine builds the chain around each invocation itself.
            Invocation::Theory(theory) => Arc::new(TheoryEngine::new(theory.clone(), chain)),
        }
    }

    fn with_suffix(&self, suffix: &str) -> Self {
        Self {
            description: self.description.with_suffix(suffix),
            ..self.clone()
        }
    }
}

/// Builder for a [`TestUnit`].
#[derive(Debug)]
pub struct UnitBuilder {
    name: String,
    class_name: Option<String>,
    unique_id: Option<String>,
    annotations: DebugIgnore<Vec<Arc<dyn Any + Send + Sync>>>,
    unit: TestUnit,
}

impl UnitBuilder {
    fn new(name: String, invocation: Invocation) -> Self {
        Self {
            unit: TestUnit {
                description: Description::leaf(name.as_str()),
                invocation,
                setups: DebugIgnore(Vec::new()),
                teardowns: DebugIgnore(Vec::new()),
                rules: Vec::new(),
                expected: None,
                timeout: None,
                ignored: None,
            },
            name,
            class_name: None,
            unique_id: None,
            annotations: DebugIgnore(Vec::new()),
        }
    }

    /// Names the unit `name(class_name)`, reported with `class_name` as its class.
    pub fn class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    /// Sets an explicit disambiguator for the unit's description.
    pub fn unique_id(mut self, unique_id: impl Into<String>) -> Self {
        self.unique_id = Some(unique_id.into());
        self
    }

    /// Attaches an annotation to the unit's description.
    pub fn annotation<A: Any + Send + Sync>(mut self, annotation: A) -> Self {
        self.annotations.push(Arc::new(annotation));
        self
    }

    /// Appends a setup action, run before the body.
    pub fn setup<F>(mut self, setup: F) -> Self
    where
        F: Fn() -> TestResult + Send + Sync + 'static,
    {
        self.unit.setups.push(action(setup));
        self
    }

    /// Appends a teardown action, run after the body.
    pub fn teardown<F>(mut self, teardown: F) -> Self
    where
        F: Fn() -> TestResult + Send + Sync + 'static,
    {
        self.unit.teardowns.push(action(teardown));
        self
    }

    /// Appends a test-scoped rule.
    pub fn rule(self, rule: Arc<dyn TestRule>) -> Self {
        self.scoped_rule(ScopedRule::test(rule))
    }

    /// Appends a rule with an explicit scope.
    pub fn scoped_rule(mut self, rule: ScopedRule) -> Self {
        self.unit.rules.push(rule);
        self
    }

    /// Expects the unit to fail with `expected`.
    pub fn expect_error(mut self, expected: ExpectedError) -> Self {
        self.unit.expected = Some(expected);
        self
    }

    /// Sets the unit's deadline. A zero duration is reported as an initialization error.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.unit.timeout = Some(timeout);
        self
    }

    /// Marks the unit as ignored.
    pub fn ignore(mut self, reason: Option<&str>) -> Self {
        self.unit.ignored = Some(IgnoreReason(reason.map(ToOwned::to_owned)));
        self
    }

    /// Builds the unit.
    pub fn build(self) -> TestUnit {
        let mut description = match &self.class_name {
            Some(class_name) => Description::test(class_name, &self.name),
            None => Description::leaf(self.name),
        };
        if let Some(unique_id) = self.unique_id {
            description = description.with_unique_id(unique_id);
        }
        TestUnit {
            description: description.with_annotations(self.annotations.0),
            ..self.unit
        }
    }
}

/// A group of units and nested groups.
///
/// Group setups run once before all children and group teardowns once after them. Group rules
/// wrap the whole group; unit rules are applied to each unit inside the group.
#[derive(Clone, Debug)]
pub struct TestGroup {
    description: Description,
    children: Vec<TestNode>,
    setups: DebugIgnore<Vec<Action>>,
    teardowns: DebugIgnore<Vec<Action>>,
    rules: DebugIgnore<Vec<Arc<dyn TestRule>>>,
    unit_rules: Vec<ScopedRule>,
}

impl TestGroup {
    /// Starts building a group named `name`.
    pub fn builder(name: impl Into<String>) -> GroupBuilder {
        GroupBuilder {
            description: Description::suite(name),
            children: Vec::new(),
            setups: Vec::new(),
            teardowns: Vec::new(),
            rules: Vec::new(),
            unit_rules: Vec::new(),
        }
    }

    /// Returns the description of this group, including its children.
    pub fn description(&self) -> &Description {
        &self.description
    }

    /// Returns the children of this group, in order.
    pub fn children(&self) -> &[TestNode] {
        &self.children
    }

    pub(crate) fn setups(&self) -> &[Action] {
        &self.setups
    }

    pub(crate) fn teardowns(&self) -> &[Action] {
        &self.teardowns
    }

    pub(crate) fn rules(&self) -> &[Arc<dyn TestRule>] {
        &self.rules
    }

    pub(crate) fn unit_rules(&self) -> &[ScopedRule] {
        &self.unit_rules
    }

    /// Returns a copy of this group with different children.
    fn with_children(&self, children: Vec<TestNode>) -> Self {
        Self {
            description: assemble(self.description.childless_copy(), &children),
            children,
            ..self.clone()
        }
    }

    fn with_suffix(&self, suffix: &str) -> Self {
        let children: Vec<_> = self
            .children
            .iter()
            .map(|child| child.with_suffix(suffix))
            .collect();
        Self {
            description: assemble(self.description.with_suffix(suffix), &children),
            children,
            ..self.clone()
        }
    }
}

fn assemble(mut description: Description, children: &[TestNode]) -> Description {
    for child in children {
        description.add_child(child.description().clone());
    }
    description
}

/// Builder for a [`TestGroup`].
pub struct GroupBuilder {
    description: Description,
    children: Vec<TestNode>,
    setups: Vec<Action>,
    teardowns: Vec<Action>,
    rules: Vec<Arc<dyn TestRule>>,
    unit_rules: Vec<ScopedRule>,
}

impl GroupBuilder {
    /// Attaches an annotation to the group's description.
    pub fn annotation<A: Any + Send + Sync>(mut self, annotation: A) -> Self {
        self.description = self.description.with_annotation(annotation);
        self
    }

    /// Sets an explicit disambiguator for the group's description.
    pub fn unique_id(mut self, unique_id: impl Into<String>) -> Self {
        self.description = self.description.with_unique_id(unique_id);
        self
    }

    /// Appends a unit.
    pub fn unit(self, unit: TestUnit) -> Self {
        self.child(TestNode::Unit(unit))
    }

    /// Appends a nested group.
    pub fn group(self, group: TestGroup) -> Self {
        self.child(TestNode::Group(group))
    }

    /// Appends any node.
    pub fn child(mut self, node: TestNode) -> Self {
        self.children.push(node);
        self
    }

    /// Appends a setup action, run once before all children.
    pub fn setup<F>(mut self, setup: F) -> Self
    where
        F: Fn() -> TestResult + Send + Sync + 'static,
    {
        self.setups.push(action(setup));
        self
    }

    /// Appends a teardown action, run once after all children.
    pub fn teardown<F>(mut self, teardown: F) -> Self
    where
        F: Fn() -> TestResult + Send + Sync + 'static,
    {
        self.teardowns.push(action(teardown));
        self
    }

    /// Appends a rule applied around the whole group.
    pub fn rule(mut self, rule: Arc<dyn TestRule>) -> Self {
        self.rules.push(rule);
        self
    }

    /// Appends a rule applied to every unit in the group, outside the units' own rules.
    pub fn unit_rule(mut self, rule: Arc<dyn TestRule>) -> Self {
        self.unit_rules.push(ScopedRule::group(rule));
        self
    }

    /// Builds the group.
    pub fn build(self) -> TestGroup {
        TestGroup {
            description: assemble(self.description, &self.children),
            children: self.children,
            setups: DebugIgnore(self.setups),
            teardowns: DebugIgnore(self.teardowns),
            rules: DebugIgnore(self.rules),
            unit_rules: self.unit_rules,
        }
    }
}

impl fmt::Debug for GroupBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupBuilder")
            .field("description", &self.description)
            .field("children", &self.children.len())
            .finish_non_exhaustive()
    }
}

/// A node that could not be constructed at registration time.
///
/// Running it reports one failure against a synthetic `initializationError(<name>)` description.
#[derive(Clone, Debug)]
pub struct ErrorNode {
    description: Description,
    errors: Vec<InitializationError>,
}

impl ErrorNode {
    /// Creates a node reporting `errors` for the unit or group named `name`.
    pub fn new(name: impl AsRef<str>, errors: Vec<InitializationError>) -> Self {
        Self {
            description: Description::test(name, "initializationError"),
            errors,
        }
    }

    /// Returns the synthetic description.
    pub fn description(&self) -> &Description {
        &self.description
    }

    /// Returns the errors.
    pub fn errors(&self) -> &[InitializationError] {
        &self.errors
    }
}

/// A node of the plan.
#[derive(Clone, Debug)]
pub enum TestNode {
    /// A single unit.
    Unit(TestUnit),

    /// A group of nodes.
    Group(TestGroup),

    /// A node that failed to construct.
    Error(ErrorNode),
}

impl TestNode {
    /// Returns the description of this node.
    pub fn description(&self) -> &Description {
        match self {
            Self::Unit(unit) => unit.description(),
            Self::Group(group) => group.description(),
            Self::Error(error) => error.description(),
        }
    }

    fn filter(&self, filter: &dyn Filter) -> Option<Self> {
        match self {
            Self::Unit(unit) => filter
                .should_run(unit.description())
                .then(|| self.clone()),
            Self::Error(error) => filter
                .should_run(error.description())
                .then(|| self.clone()),
            Self::Group(group) => {
                let children: Vec<_> = group
                    .children
                    .iter()
                    .filter_map(|child| child.filter(filter))
                    .collect();
                (!children.is_empty()).then(|| Self::Group(group.with_children(children)))
            }
        }
    }

    fn sorted_by(&self, compare: &dyn Fn(&Description, &Description) -> Ordering) -> Self {
        match self {
            Self::Group(group) => {
                let mut children: Vec<_> = group
                    .children
                    .iter()
                    .map(|child| child.sorted_by(compare))
                    .collect();
                children.sort_by(|a, b| compare(a.description(), b.description()));
                Self::Group(group.with_children(children))
            }
            Self::Unit(_) | Self::Error(_) => self.clone(),
        }
    }

    fn with_suffix(&self, suffix: &str) -> Self {
        match self {
            Self::Unit(unit) => Self::Unit(unit.with_suffix(suffix)),
            Self::Group(group) => Self::Group(group.with_suffix(suffix)),
            Self::Error(error) => Self::Error(ErrorNode {
                description: error.description.with_suffix(suffix),
                errors: error.errors.clone(),
            }),
        }
    }
}

impl From<TestUnit> for TestNode {
    fn from(unit: TestUnit) -> Self {
        Self::Unit(unit)
    }
}

impl From<TestGroup> for TestNode {
    fn from(group: TestGroup) -> Self {
        Self::Group(group)
    }
}

impl From<ErrorNode> for TestNode {
    fn from(error: ErrorNode) -> Self {
        Self::Error(error)
    }
}

/// A named forest of nodes, ready to run.
#[derive(Clone, Debug)]
pub struct TestPlan {
    description: Description,
    nodes: Vec<TestNode>,
}

impl TestPlan {
    /// Creates a plan named `name` with the given top-level nodes.
    pub fn new(name: impl Into<String>, nodes: impl IntoIterator<Item = TestNode>) -> Self {
        let nodes: Vec<_> = nodes.into_iter().collect();
        Self {
            description: assemble(Description::suite(name), &nodes),
            nodes,
        }
    }

    /// Returns the description tree of the plan.
    pub fn description(&self) -> &Description {
        &self.description
    }

    /// Returns the top-level nodes.
    pub fn nodes(&self) -> &[TestNode] {
        &self.nodes
    }

    /// Returns the number of units in the plan, counting each error node as one unit.
    pub fn unit_count(&self) -> usize {
        self.nodes
            .iter()
            .map(|node| node.description().test_count())
            .sum()
    }

    /// Returns a plan containing only the units `filter` runs.
    ///
    /// Groups left without units are removed. Returns an error if no units remain.
    pub fn filter(&self, filter: &dyn Filter) -> Result<Self, NoTestsRemain> {
        let nodes: Vec<_> = self
            .nodes
            .iter()
            .filter_map(|node| node.filter(filter))
            .collect();
        if nodes.is_empty() {
            return Err(NoTestsRemain::new(filter));
        }
        Ok(Self {
            description: assemble(self.description.childless_copy(), &nodes),
            nodes,
        })
    }

    /// Returns a plan with the siblings at every level ordered by `compare`.
    pub fn sorted_by<F>(&self, compare: F) -> Self
    where
        F: Fn(&Description, &Description) -> Ordering,
    {
        let mut nodes: Vec<_> = self
            .nodes
            .iter()
            .map(|node| node.sorted_by(&compare))
            .collect();
        nodes.sort_by(|a, b| compare(a.description(), b.description()));
        Self {
            description: assemble(self.description.childless_copy(), &nodes),
            nodes,
        }
    }
}

/// Repeats the children of a group a fixed number of times.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Repeat {
    times: usize,
}

impl Repeat {
    /// Creates a repetition count. Negative counts are rejected.
    pub fn new(times: i64) -> Result<Self, RepeatCountError> {
        usize::try_from(times)
            .map(|times| Self { times })
            .map_err(|_| RepeatCountError::new(times))
    }

    /// Returns the number of repetitions.
    pub fn times(&self) -> usize {
        self.times
    }

    /// Returns a copy of `group` whose children are repeated.
    ///
    /// Repetition `i` renames every node it contains with an `[i]` suffix, so the copies remain
    /// distinguishable. A count of zero yields an empty group.
    pub fn apply(&self, group: &TestGroup) -> TestGroup {
        let children = (0..self.times)
            .flat_map(|i| {
                let suffix = format!("[{i}]");
                group
                    .children
                    .iter()
                    .map(move |child| child.with_suffix(&suffix))
            })
            .collect();
        group.with_children(children)
    }
}

type ParameterizedBody<P> = Arc<dyn Fn(&P) -> TestResult + Send + Sync>;

/// Runs the same units once per parameter set.
///
/// [`build`](Self::build) produces a group named after the class, with one child group per set.
/// A set is named by substituting its position for `{index}` in the naming template and wrapping
/// the result in brackets, so the default template `{index}` names sets `[0]`, `[1]` and so on.
/// Units carry their set's name as a suffix: `computes[0](Fibonacci)`.
pub struct Parameterized<P> {
    class_name: String,
    sets: Vec<Arc<P>>,
    template: String,
    units: Vec<(String, ParameterizedBody<P>)>,
    rules: Vec<Arc<dyn TestRule>>,
}

impl<P> Parameterized<P>
where
    P: Send + Sync + 'static,
{
    /// The naming template used unless [`name`](Self::name) is called.
    pub const DEFAULT_TEMPLATE: &'static str = "{index}";

    /// Creates a parameterized class running once per element of `sets`.
    pub fn new(class_name: impl Into<String>, sets: impl IntoIterator<Item = P>) -> Self {
        Self {
            class_name: class_name.into(),
            sets: sets.into_iter().map(Arc::new).collect(),
            template: Self::DEFAULT_TEMPLATE.to_owned(),
            units: Vec::new(),
            rules: Vec::new(),
        }
    }

    /// Sets the naming template. `{index}` is replaced with the position of the set.
    pub fn name(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    /// Adds a unit that runs `body` against every parameter set.
    pub fn unit<F>(mut self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&P) -> TestResult + Send + Sync + 'static,
    {
        self.units.push((name.into(), Arc::new(body)));
        self
    }

    /// Adds a rule around every generated unit.
    pub fn rule(mut self, rule: Arc<dyn TestRule>) -> Self {
        self.rules.push(rule);
        self
    }

    /// Returns the number of parameter sets.
    pub fn set_count(&self) -> usize {
        self.sets.len()
    }

    /// Returns the name of the set at `index`.
    pub fn set_name(&self, index: usize) -> String {
        format!("[{}]", self.template.replace("{index}", &index.to_string()))
    }

    /// Builds the class group.
    pub fn build(&self) -> TestGroup {
        self.sets
            .iter()
            .enumerate()
            .fold(
                TestGroup::builder(self.class_name.as_str()),
                |class, (index, params)| class.group(self.instance(index, params)),
            )
            .build()
    }

    fn instance(&self, index: usize, params: &Arc<P>) -> TestGroup {
        let set_name = self.set_name(index);
        self.units
            .iter()
            .fold(
                TestGroup::builder(set_name.as_str()),
                |instance, (name, body)| {
                    let params = params.clone();
                    let body = body.clone();
                    let unit =
                        TestUnit::builder(format!("{name}{set_name}"), move || body(&params))
                            .class_name(self.class_name.as_str());
                    let unit = self
                        .rules
                        .iter()
                        .fold(unit, |unit, rule| unit.rule(rule.clone()));
                    instance.unit(unit.build())
                },
            )
            .build()
    }
}

impl<P> fmt::Debug for Parameterized<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameterized")
            .field("class_name", &self.class_name)
            .field("set_count", &self.sets.len())
            .field("template", &self.template)
            .field(
                "units",
                &self.units.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}
