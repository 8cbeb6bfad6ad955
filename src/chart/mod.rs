//! Immutable, validated chart definitions.
//!
//! A chart is built once from a [`NodeBuilder`] tree and never mutated
//! afterwards. Nodes live in a flat arena addressed by [`NodeId`]; every
//! transition target is resolved at build time, and `#id` references go
//! through a single id → node table. Construction validates the whole tree
//! and reports every defect at once.

use crate::builder::{BuildError, ChartError, InvokeBuilder, NodeBuilder, NodeKind, TransitionBuilder};
use crate::core::{done_invoke, error_invoke, Guard};
use crate::effects::{Action, Task};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

type Check = Validation<(), NonEmptyVec<ChartError>>;

fn check(ok: bool, error: impl FnOnce() -> ChartError) -> Check {
    if ok {
        Validation::success(())
    } else {
        Validation::fail(error())
    }
}

/// Index of a node in the chart arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// A resolved transition candidate.
pub struct Transition<C> {
    pub(crate) target: Option<NodeId>,
    pub(crate) guard: Option<Guard<C>>,
    pub(crate) actions: Vec<Action<C>>,
    pub(crate) internal: bool,
}

impl<C> Transition<C> {
    /// Check if this candidate is enabled for the context (pure).
    pub fn is_enabled(&self, context: &C) -> bool {
        self.guard.as_ref().is_none_or(|g| g.check(context))
    }

    pub fn target(&self) -> Option<NodeId> {
        self.target
    }

    pub fn is_internal(&self) -> bool {
        self.internal
    }

    pub fn actions(&self) -> &[Action<C>] {
        &self.actions
    }
}

impl<C> Clone for Transition<C> {
    fn clone(&self) -> Self {
        Self {
            target: self.target,
            guard: self.guard.clone(),
            actions: self.actions.clone(),
            internal: self.internal,
        }
    }
}

/// Invocation descriptor attached to an atomic node.
pub struct Invocation<C, Env> {
    pub(crate) id: String,
    pub(crate) task: Task<C, Env>,
}

impl<C, Env> Invocation<C, Env> {
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// One node of a built chart.
pub struct StateNode<C, Env> {
    key: String,
    path: String,
    id: Option<String>,
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    initial: Option<NodeId>,
    pub(crate) entry: Vec<Action<C>>,
    pub(crate) exit: Vec<Action<C>>,
    on: HashMap<String, Vec<Transition<C>>>,
    pub(crate) invoke: Option<Invocation<C, Env>>,
    route: Option<String>,
}

impl<C, Env> StateNode<C, Env> {
    /// Key relative to the parent.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Dotted path of keys below the root. Empty for the root itself.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Global id, addressable as `#id`.
    pub fn global_id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn initial(&self) -> Option<NodeId> {
        self.initial
    }

    pub fn route(&self) -> Option<&str> {
        self.route.as_deref()
    }

    pub fn invocation(&self) -> Option<&Invocation<C, Env>> {
        self.invoke.as_ref()
    }

    /// Candidates this node declares for `event`, if it declares any.
    pub fn transitions(&self, event: &str) -> Option<&[Transition<C>]> {
        self.on.get(event).map(Vec::as_slice)
    }

    /// Path for diagnostics: the key for the root, the dotted path otherwise.
    fn display(&self) -> &str {
        if self.path.is_empty() {
            &self.key
        } else {
            &self.path
        }
    }
}

/// Transitions and initial key of a node, waiting for resolution.
struct Unresolved<C, Env> {
    initial: Option<String>,
    on: Vec<(String, TransitionBuilder<C>)>,
    invoke: Option<InvokeBuilder<C, Env>>,
}

/// A validated, immutable statechart.
pub struct Chart<C, Env> {
    nodes: Vec<StateNode<C, Env>>,
    ids: HashMap<String, NodeId>,
    paths: HashMap<String, NodeId>,
}

impl<C: 'static, Env> Chart<C, Env> {
    /// Flatten, resolve and validate a node tree.
    ///
    /// Every defect is collected; the error lists all of them.
    pub fn build(root: NodeBuilder<C, Env>) -> Result<Self, BuildError> {
        let mut nodes = Vec::new();
        let mut unresolved = Vec::new();
        let mut checks = Vec::new();
        flatten(root, None, &mut nodes, &mut unresolved, &mut checks);

        let mut ids = HashMap::new();
        for (index, node) in nodes.iter().enumerate() {
            if let Some(id) = &node.id {
                let fresh = ids.insert(id.clone(), NodeId(index)).is_none();
                checks.push(check(fresh, || ChartError::DuplicateId { id: id.clone() }));
            }
        }
        let paths = nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.path.clone(), NodeId(index)))
            .collect();

        let mut chart = Chart { nodes, ids, paths };

        for (index, pending) in unresolved.into_iter().enumerate() {
            let owner = NodeId(index);
            chart.resolve_initial(owner, pending.initial, &mut checks);

            for (event, builder) in pending.on {
                let transition = chart.resolve_transition(owner, &event, builder, &mut checks);
                chart.nodes[index]
                    .on
                    .entry(event)
                    .or_default()
                    .push(transition);
            }

            if let Some(invoke) = pending.invoke {
                for (event, builders) in [
                    (done_invoke(&invoke.id), invoke.on_done),
                    (error_invoke(&invoke.id), invoke.on_error),
                ] {
                    for builder in builders {
                        let transition =
                            chart.resolve_transition(owner, &event, builder, &mut checks);
                        chart.nodes[index]
                            .on
                            .entry(event.clone())
                            .or_default()
                            .push(transition);
                    }
                }
                chart.nodes[index].invoke = Some(Invocation {
                    id: invoke.id,
                    task: invoke.task,
                });
            }
        }

        match Validation::all_vec(checks) {
            Validation::Success(_) => Ok(chart),
            Validation::Failure(errors) => Err(BuildError::InvalidChart {
                errors: errors.iter().cloned().collect(),
            }),
        }
    }

    fn resolve_initial(&mut self, owner: NodeId, initial: Option<String>, checks: &mut Vec<Check>) {
        if self.nodes[owner.0].kind != NodeKind::Compound {
            return;
        }
        let node = self.nodes[owner.0].display().to_string();
        match initial {
            None => checks.push(check(false, || ChartError::MissingInitial { node })),
            Some(key) => match self.child(owner, &key) {
                Some(child) => self.nodes[owner.0].initial = Some(child),
                None => checks.push(check(false, || ChartError::UnknownInitial {
                    node,
                    initial: key,
                })),
            },
        }
    }

    fn resolve_transition(
        &self,
        owner: NodeId,
        event: &str,
        builder: TransitionBuilder<C>,
        checks: &mut Vec<Check>,
    ) -> Transition<C> {
        let node = self.nodes[owner.0].display().to_string();
        let event = if event.is_empty() { "(always)" } else { event }.to_string();

        let target = match &builder.target {
            None => None,
            Some(raw) => match self.resolve_target(owner, raw) {
                Some(target) if target == self.root() => {
                    checks.push(check(false, || ChartError::RootTarget { node, event }));
                    None
                }
                Some(target) => Some(target),
                None => {
                    checks.push(check(false, || ChartError::UnknownTarget {
                        node,
                        event,
                        target: raw.clone(),
                    }));
                    None
                }
            },
        };

        Transition {
            target,
            guard: builder.guard,
            actions: builder.actions,
            internal: builder.internal,
        }
    }
}

impl<C, Env> Chart<C, Env> {
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &StateNode<C, Env> {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Find a node by `#id` (optionally followed by `.child` keys) or by its
    /// full dotted path.
    pub fn lookup(&self, reference: &str) -> Option<NodeId> {
        if reference.starts_with('#') {
            self.resolve_target(self.root(), reference)
        } else {
            self.paths.get(reference).copied()
        }
    }

    /// Resolve a target reference as seen from `owner`.
    ///
    /// `#id.a.b` is global, `.a.b` descends from `owner`, and `a.b` descends
    /// from `owner`'s parent.
    pub fn resolve_target(&self, owner: NodeId, target: &str) -> Option<NodeId> {
        if let Some(rest) = target.strip_prefix('#') {
            let mut segments = rest.split('.');
            let head = segments.next()?;
            let start = *self.ids.get(head)?;
            self.descend(start, segments)
        } else if let Some(rest) = target.strip_prefix('.') {
            self.descend(owner, rest.split('.'))
        } else {
            let parent = self.nodes[owner.0].parent?;
            self.descend(parent, target.split('.'))
        }
    }

    fn descend<'a>(&self, start: NodeId, segments: impl Iterator<Item = &'a str>) -> Option<NodeId> {
        let mut current = start;
        for key in segments {
            current = self.child(current, key)?;
        }
        Some(current)
    }

    fn child(&self, node: NodeId, key: &str) -> Option<NodeId> {
        self.nodes[node.0]
            .children
            .iter()
            .copied()
            .find(|child| self.nodes[child.0].key == key)
    }

    /// `id` followed by each of its ancestors up to the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(id), move |node| self.nodes[node.0].parent)
    }

    pub fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors(node).any(|candidate| candidate == ancestor)
    }

    /// Least common compound ancestor of the active leaf and a target.
    ///
    /// This is the nearest strict ancestor of `target` that also contains
    /// `leaf`; it is neither exited nor entered by the transition.
    pub fn domain(&self, leaf: NodeId, target: NodeId) -> NodeId {
        self.ancestors(target)
            .skip(1)
            .find(|candidate| self.is_ancestor_or_self(*candidate, leaf))
            .unwrap_or_else(|| self.root())
    }

    /// Nodes exited when leaving `leaf` for `domain`, innermost first.
    pub fn exit_set(&self, leaf: NodeId, domain: NodeId) -> Vec<NodeId> {
        self.ancestors(leaf)
            .take_while(|node| *node != domain)
            .collect()
    }

    /// Nodes entered from `domain` down to `target` and through the initial
    /// chain below it, outermost first.
    pub fn entry_set(&self, domain: NodeId, target: NodeId) -> Vec<NodeId> {
        let mut entered: Vec<NodeId> = self
            .ancestors(target)
            .take_while(|node| *node != domain)
            .collect();
        entered.reverse();
        entered.extend(self.initial_chain(target));
        entered
    }

    /// Initial descendants of `node`, outermost first.
    pub fn initial_chain(&self, node: NodeId) -> Vec<NodeId> {
        std::iter::successors(self.nodes[node.0].initial, |current| {
            self.nodes[current.0].initial
        })
        .collect()
    }

    /// Every event name the chart reacts to, eventless and synthetic ones included.
    pub fn event_names(&self) -> BTreeSet<&str> {
        self.nodes
            .iter()
            .flat_map(|node| node.on.keys().map(String::as_str))
            .collect()
    }
}

/// Push `builder` and its subtree into the arena, checking local shape.
fn flatten<C, Env>(
    builder: NodeBuilder<C, Env>,
    parent: Option<NodeId>,
    nodes: &mut Vec<StateNode<C, Env>>,
    unresolved: &mut Vec<Unresolved<C, Env>>,
    checks: &mut Vec<Check>,
) -> NodeId {
    let id = NodeId(nodes.len());
    let path = match parent {
        None => String::new(),
        Some(parent) if nodes[parent.0].path.is_empty() => builder.key.clone(),
        Some(parent) => format!("{}.{}", nodes[parent.0].path, builder.key),
    };
    let display = if path.is_empty() {
        builder.key.clone()
    } else {
        path.clone()
    };

    if builder.kind == NodeKind::Compound {
        checks.push(check(!builder.children.is_empty(), || {
            ChartError::EmptyCompound {
                node: display.clone(),
            }
        }));
    } else {
        checks.push(check(builder.children.is_empty(), || {
            ChartError::LeafWithChildren {
                node: display.clone(),
            }
        }));
        checks.push(check(builder.initial.is_none(), || ChartError::InitialOnLeaf {
            node: display.clone(),
        }));
    }
    checks.push(check(
        builder.invoke.is_none() || builder.kind == NodeKind::Atomic,
        || ChartError::InvokeOnNonAtomic {
            node: display.clone(),
        },
    ));

    let mut seen = HashSet::new();
    for child in &builder.children {
        checks.push(check(seen.insert(child.key.as_str()), || {
            ChartError::DuplicateKey {
                node: display.clone(),
                key: child.key.clone(),
            }
        }));
    }

    nodes.push(StateNode {
        key: builder.key,
        path,
        id: builder.id,
        kind: builder.kind,
        parent,
        children: Vec::new(),
        initial: None,
        entry: builder.entry,
        exit: builder.exit,
        on: HashMap::new(),
        invoke: None,
        route: builder.route,
    });
    unresolved.push(Unresolved {
        initial: builder.initial,
        on: builder.on,
        invoke: builder.invoke,
    });

    for child in builder.children {
        let child_id = flatten(child, Some(id), nodes, unresolved, checks);
        nodes[id.0].children.push(child_id);
    }

    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{goto, goto_if};
    use crate::effects::resolve_with;

    type TestChart = Chart<u32, ()>;

    fn sample() -> NodeBuilder<u32, ()> {
        NodeBuilder::compound("app")
            .initial("idle")
            .child(NodeBuilder::atomic("idle").on("START", goto("#welcome")))
            .child(
                NodeBuilder::compound("welcome")
                    .id("welcome")
                    .initial("greeting")
                    .child(NodeBuilder::atomic("greeting").on("NEXT", goto("#form"))),
            )
            .child(
                NodeBuilder::compound("form")
                    .id("form")
                    .initial("household")
                    .on("RESET", goto("#welcome"))
                    .child(
                        NodeBuilder::compound("household")
                            .id("household")
                            .initial("how-many")
                            .on("BACK", goto(".get-prepared"))
                            .child(NodeBuilder::atomic("how-many").on("NEXT", goto("branch")))
                            .child(
                                NodeBuilder::atomic("branch")
                                    .always(goto_if("get-prepared", |n: &u32| *n > 1))
                                    .always(goto("#form.done")),
                            )
                            .child(NodeBuilder::atomic("get-prepared")),
                    )
                    .child(
                        NodeBuilder::atomic("loading").invoke(
                            InvokeBuilder::new("load", |_: &u32| resolve_with(serde_json::json!(1)))
                                .on_done(goto("done"))
                                .on_error(goto("#household")),
                        ),
                    )
                    .child(NodeBuilder::final_node("done")),
            )
    }

    fn id(chart: &TestChart, reference: &str) -> NodeId {
        chart.lookup(reference).unwrap()
    }

    #[test]
    fn valid_chart_builds() {
        let chart = TestChart::build(sample()).unwrap();

        assert_eq!(chart.node(chart.root()).key(), "app");
        assert_eq!(chart.node(chart.root()).path(), "");
        assert_eq!(chart.len(), 11);
    }

    #[test]
    fn lookup_by_id_and_path_agree() {
        let chart = TestChart::build(sample()).unwrap();

        assert_eq!(
            chart.lookup("#household.how-many"),
            chart.lookup("form.household.how-many")
        );
        assert_eq!(chart.lookup("#welcome"), chart.lookup("welcome"));
        assert!(chart.lookup("#missing").is_none());
        assert!(chart.lookup("form.nowhere").is_none());
    }

    #[test]
    fn targets_resolve_relative_to_owner() {
        let chart = TestChart::build(sample()).unwrap();
        let how_many = id(&chart, "form.household.how-many");
        let household = id(&chart, "#household");

        let next = &chart.node(how_many).transitions("NEXT").unwrap()[0];
        assert_eq!(next.target(), Some(id(&chart, "form.household.branch")));

        let back = &chart.node(household).transitions("BACK").unwrap()[0];
        assert_eq!(back.target(), Some(id(&chart, "form.household.get-prepared")));
    }

    #[test]
    fn invocation_handlers_are_keyed_by_synthetic_events() {
        let chart = TestChart::build(sample()).unwrap();
        let loading = chart.node(id(&chart, "form.loading"));

        assert_eq!(loading.invocation().unwrap().id(), "load");
        assert!(loading.transitions("done.invoke.load").is_some());
        assert!(loading.transitions("error.invoke.load").is_some());
        assert!(chart.event_names().contains("done.invoke.load"));
    }

    #[test]
    fn candidate_order_is_kept() {
        let chart = TestChart::build(sample()).unwrap();
        let branch = chart.node(id(&chart, "form.household.branch"));
        let candidates = branch.transitions("").unwrap();

        assert_eq!(candidates.len(), 2);
        assert!(candidates[0].is_enabled(&2));
        assert!(!candidates[0].is_enabled(&1));
        assert!(candidates[1].is_enabled(&1));
    }

    #[test]
    fn domain_is_least_common_compound_ancestor() {
        let chart = TestChart::build(sample()).unwrap();
        let how_many = id(&chart, "form.household.how-many");
        let branch = id(&chart, "form.household.branch");
        let greeting = id(&chart, "welcome.greeting");
        let household = id(&chart, "#household");

        assert_eq!(chart.domain(how_many, branch), household);
        assert_eq!(chart.domain(how_many, greeting), chart.root());
        // a target that contains the leaf is exited and re-entered
        assert_eq!(chart.domain(how_many, household), id(&chart, "#form"));
    }

    #[test]
    fn entry_set_descends_initial_chain() {
        let chart = TestChart::build(sample()).unwrap();
        let entered = chart.entry_set(chart.root(), id(&chart, "#form"));
        let paths: Vec<&str> = entered.iter().map(|n| chart.node(*n).path()).collect();

        assert_eq!(paths, vec!["form", "form.household", "form.household.how-many"]);
    }

    #[test]
    fn exit_set_is_innermost_first() {
        let chart = TestChart::build(sample()).unwrap();
        let leaf = id(&chart, "form.household.how-many");
        let exited = chart.exit_set(leaf, chart.root());
        let paths: Vec<&str> = exited.iter().map(|n| chart.node(*n).path()).collect();

        assert_eq!(paths, vec!["form.household.how-many", "form.household", "form"]);
    }

    #[test]
    fn every_defect_is_reported() {
        let broken: NodeBuilder<u32, ()> = NodeBuilder::compound("app")
            .initial("missing")
            .child(
                NodeBuilder::atomic("a")
                    .id("dup")
                    .on("NEXT", goto("nowhere"))
                    .on("HOME", goto("#app-root")),
            )
            .child(NodeBuilder::atomic("b").id("dup"))
            .child(NodeBuilder::compound("c"))
            .child(NodeBuilder::atomic("a"));

        let error = TestChart::build(broken).err().unwrap();
        let errors = error.errors();

        assert!(errors.contains(&ChartError::UnknownInitial {
            node: "app".into(),
            initial: "missing".into()
        }));
        assert!(errors.contains(&ChartError::DuplicateId { id: "dup".into() }));
        assert!(errors.contains(&ChartError::DuplicateKey {
            node: "app".into(),
            key: "a".into()
        }));
        assert!(errors.contains(&ChartError::EmptyCompound { node: "c".into() }));
        assert!(errors.contains(&ChartError::MissingInitial { node: "c".into() }));
        assert!(errors.contains(&ChartError::UnknownTarget {
            node: "a".into(),
            event: "NEXT".into(),
            target: "nowhere".into()
        }));
        assert!(errors.iter().any(|e| matches!(e, ChartError::UnknownTarget { target, .. } if target == "#app-root")));
    }

    #[test]
    fn leaf_shape_is_checked() {
        let broken: NodeBuilder<u32, ()> = NodeBuilder::compound("app")
            .initial("leaf")
            .child(
                NodeBuilder::atomic("leaf")
                    .initial("x")
                    .child(NodeBuilder::atomic("x")),
            )
            .child(
                NodeBuilder::compound("busy")
                    .initial("inner")
                    .invoke(InvokeBuilder::new("nope", |_: &u32| {
                        resolve_with(serde_json::json!(null))
                    }))
                    .child(NodeBuilder::atomic("inner")),
            );

        let errors = TestChart::build(broken).err().unwrap().errors().to_vec();

        assert!(errors.contains(&ChartError::LeafWithChildren { node: "leaf".into() }));
        assert!(errors.contains(&ChartError::InitialOnLeaf { node: "leaf".into() }));
        assert!(errors.contains(&ChartError::InvokeOnNonAtomic { node: "busy".into() }));
    }

    #[test]
    fn root_cannot_be_targeted() {
        let broken: NodeBuilder<u32, ()> = NodeBuilder::compound("app")
            .id("app")
            .initial("a")
            .child(NodeBuilder::atomic("a").on("UP", goto("#app")));

        let errors = TestChart::build(broken).err().unwrap().errors().to_vec();

        assert_eq!(
            errors,
            vec![ChartError::RootTarget {
                node: "a".into(),
                event: "UP".into()
            }]
        );
    }
}
