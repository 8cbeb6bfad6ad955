//! Builder for declarative state nodes.

use crate::builder::transition::{InvokeBuilder, TransitionBuilder};
use crate::core::EVENTLESS;
use crate::effects::Action;

/// Kind of a state node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// Has children and an initial child.
    Compound,
    /// Leaf.
    Atomic,
    /// Terminal leaf of its parent; entering it raises `done.state.<parent>`.
    Final,
}

/// Builder for one node of the chart tree, with a fluent API.
///
/// # Example
///
/// ```
/// use waypoint::builder::{NodeBuilder, TransitionBuilder};
/// use waypoint::effects::Action;
/// use waypoint::patch;
///
/// #[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
/// struct Ctx {
///     members: u32,
/// }
///
/// let household: NodeBuilder<Ctx, ()> = NodeBuilder::compound("household")
///     .id("household")
///     .initial("how-many")
///     .entry(Action::set(patch! { "currentSection" => "household" }))
///     .child(
///         NodeBuilder::atomic("how-many")
///             .route("/form/household/how-many")
///             .on("NEXT", TransitionBuilder::to("branch")),
///     )
///     .child(
///         NodeBuilder::atomic("branch")
///             .always(TransitionBuilder::to("names").when(|c: &Ctx| c.members > 1))
///             .always(TransitionBuilder::to("done")),
///     )
///     .child(NodeBuilder::atomic("names"))
///     .child(NodeBuilder::final_node("done"));
/// ```
pub struct NodeBuilder<C, Env> {
    pub(crate) key: String,
    pub(crate) id: Option<String>,
    pub(crate) kind: NodeKind,
    pub(crate) initial: Option<String>,
    pub(crate) entry: Vec<Action<C>>,
    pub(crate) exit: Vec<Action<C>>,
    pub(crate) on: Vec<(String, TransitionBuilder<C>)>,
    pub(crate) invoke: Option<InvokeBuilder<C, Env>>,
    pub(crate) route: Option<String>,
    pub(crate) children: Vec<NodeBuilder<C, Env>>,
}

impl<C: 'static, Env> NodeBuilder<C, Env> {
    fn new(key: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            key: key.into(),
            id: None,
            kind,
            initial: None,
            entry: Vec::new(),
            exit: Vec::new(),
            on: Vec::new(),
            invoke: None,
            route: None,
            children: Vec::new(),
        }
    }

    /// A node with children. Requires `.initial(key)`.
    pub fn compound(key: impl Into<String>) -> Self {
        Self::new(key, NodeKind::Compound)
    }

    /// A leaf node.
    pub fn atomic(key: impl Into<String>) -> Self {
        Self::new(key, NodeKind::Atomic)
    }

    /// A terminal leaf of its parent.
    pub fn final_node(key: impl Into<String>) -> Self {
        Self::new(key, NodeKind::Final)
    }

    /// Make the node addressable from anywhere as `#id`.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the initial child key (required for compound nodes).
    pub fn initial(mut self, key: impl Into<String>) -> Self {
        self.initial = Some(key.into());
        self
    }

    /// Append an entry action.
    pub fn entry(mut self, action: Action<C>) -> Self {
        self.entry.push(action);
        self
    }

    /// Append an exit action.
    pub fn exit(mut self, action: Action<C>) -> Self {
        self.exit.push(action);
        self
    }

    /// Append a candidate for `event`. Candidates are tried in the order added.
    pub fn on(mut self, event: impl Into<String>, transition: TransitionBuilder<C>) -> Self {
        self.on.push((event.into(), transition));
        self
    }

    /// Append an eventless candidate.
    pub fn always(self, transition: TransitionBuilder<C>) -> Self {
        self.on(EVENTLESS, transition)
    }

    /// Attach an invocation (atomic nodes only).
    pub fn invoke(mut self, invoke: InvokeBuilder<C, Env>) -> Self {
        self.invoke = Some(invoke);
        self
    }

    /// Route meta exposed to the rendering layer while this node is the leaf.
    pub fn route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    /// Add a child node.
    pub fn child(mut self, child: NodeBuilder<C, Env>) -> Self {
        self.children.push(child);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, Default)]
    struct TestContext;

    #[test]
    fn constructors_set_kind() {
        let compound: NodeBuilder<TestContext, ()> = NodeBuilder::compound("form");
        let atomic: NodeBuilder<TestContext, ()> = NodeBuilder::atomic("how-many");
        let terminal: NodeBuilder<TestContext, ()> = NodeBuilder::final_node("eligible");

        assert_eq!(compound.kind, NodeKind::Compound);
        assert_eq!(atomic.kind, NodeKind::Atomic);
        assert_eq!(terminal.kind, NodeKind::Final);
    }

    #[test]
    fn always_uses_eventless_slot() {
        let node: NodeBuilder<TestContext, ()> = NodeBuilder::atomic("branch")
            .always(TransitionBuilder::to("a"))
            .on("NEXT", TransitionBuilder::to("b"));

        assert_eq!(node.on[0].0, EVENTLESS);
        assert_eq!(node.on[1].0, "NEXT");
    }

    #[test]
    fn fluent_api_collects_everything() {
        let node: NodeBuilder<TestContext, ()> = NodeBuilder::compound("household")
            .id("household")
            .initial("how-many")
            .entry(Action::persist())
            .exit(Action::persist())
            .route("/form/household")
            .child(NodeBuilder::atomic("how-many"));

        assert_eq!(node.id.as_deref(), Some("household"));
        assert_eq!(node.initial.as_deref(), Some("how-many"));
        assert_eq!(node.entry.len(), 1);
        assert_eq!(node.exit.len(), 1);
        assert_eq!(node.children.len(), 1);
        assert_eq!(node.route.as_deref(), Some("/form/household"));
    }
}
