//! Run-to-completion interpreter.
//!
//! The interpreter owns the active leaf, the context, and the invocation
//! manager. [`Interpreter::send`] selects one transition for the event,
//! executes it (exit actions, transition actions, entry actions), then
//! settles: eventless transitions fire until none is enabled, and events
//! raised along the way are processed one by one. Side effects requested by
//! actions are handled only after everything has settled.

mod driver;

pub use driver::Driver;

use crate::chart::{Chart, NodeId};
use crate::config::EngineConfig;
use crate::core::{
    apply, done_invoke, done_state, error_invoke, Event, MergeMode, Model, Patch,
    TransitionHistory, TransitionRecord, EVENTLESS,
};
use crate::builder::NodeKind;
use crate::effects::{Action, Effect, InvocationManager, PendingInvocation, Settlement};
use crate::persistence::Persistence;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;

/// Errors returned by the interpreter's lifecycle methods.
///
/// Event dispatch itself never fails.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterpreterError {
    #[error("Interpreter has already been started")]
    AlreadyStarted,

    #[error("No node matches '{reference}'")]
    UnknownNode { reference: String },
}

/// The active path, outermost first, as dotted node paths below the root.
///
/// # Example
///
/// ```rust
/// use waypoint::interpreter::Configuration;
///
/// let configuration = Configuration::new(vec![
///     "form".to_string(),
///     "form.household".to_string(),
///     "form.household.how-many".to_string(),
/// ]);
///
/// assert_eq!(configuration.leaf(), Some("form.household.how-many"));
/// assert!(configuration.is_in("form.household"));
/// assert!(!configuration.matches("form.household"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Configuration(Vec<String>);

impl Configuration {
    pub fn new(paths: Vec<String>) -> Self {
        Self(paths)
    }

    /// The deepest active node.
    pub fn leaf(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Whether `path` is the active leaf.
    pub fn matches(&self, path: &str) -> bool {
        self.leaf() == Some(path)
    }

    /// Whether `path` is active at any depth.
    pub fn is_in(&self, path: &str) -> bool {
        self.0.iter().any(|active| active == path)
    }

    pub fn paths(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Read-only view handed to the rendering layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot<C> {
    pub configuration: Configuration,
    pub context: C,
    /// Route meta of the active leaf, if it declares one.
    pub route: Option<String>,
}

/// Work accumulated while one `send` settles.
struct Macrostep {
    raised: VecDeque<Event>,
    effects: Vec<Effect>,
}

impl Macrostep {
    fn new() -> Self {
        Self {
            raised: VecDeque::new(),
            effects: Vec::new(),
        }
    }
}

/// Statechart interpreter over a shared, immutable chart.
pub struct Interpreter<C: Model, Env> {
    chart: Arc<Chart<C, Env>>,
    context: C,
    leaf: Option<NodeId>,
    invocations: InvocationManager<Env>,
    persistence: Option<Persistence>,
    config: EngineConfig,
    history: TransitionHistory,
}

impl<C: Model, Env> Interpreter<C, Env> {
    /// Create a stopped interpreter. Call [`start`](Self::start) or
    /// [`start_at`](Self::start_at) before sending events.
    pub fn new(chart: Arc<Chart<C, Env>>, context: C) -> Self {
        Self {
            chart,
            context,
            leaf: None,
            invocations: InvocationManager::new(),
            persistence: None,
            config: EngineConfig::default(),
            history: TransitionHistory::new(),
        }
    }

    /// Attach durable storage used by `Persist` and `ClearStorage` effects.
    pub fn with_persistence(mut self, persistence: Persistence) -> Self {
        self.persistence = Some(persistence);
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Enter the root and its initial chain.
    pub fn start(&mut self) -> Result<Configuration, InterpreterError> {
        let root = self.chart.root();
        self.enter_from_root(root)
    }

    /// Enter the node named by `reference` (`#id...` or a dotted path) and
    /// everything above it, skipping the root's initial chain.
    pub fn start_at(&mut self, reference: &str) -> Result<Configuration, InterpreterError> {
        let target = self
            .chart
            .lookup(reference)
            .ok_or_else(|| InterpreterError::UnknownNode {
                reference: reference.to_string(),
            })?;
        self.enter_from_root(target)
    }

    fn enter_from_root(&mut self, target: NodeId) -> Result<Configuration, InterpreterError> {
        if self.leaf.is_some() {
            return Err(InterpreterError::AlreadyStarted);
        }

        let chart = Arc::clone(&self.chart);
        let event = Event::init();
        let span = tracing::debug_span!("send", event = %event.name);
        let _entered = span.enter();

        let mut path: Vec<NodeId> = chart.ancestors(target).collect();
        path.reverse();
        path.extend(chart.initial_chain(target));

        let mut step = Macrostep::new();
        self.enter(&chart, &path, &event, &mut step);
        self.record("", &event);
        self.settle(&chart, &mut step);
        self.flush(step, &event);

        Ok(self.configuration())
    }

    /// Dispatch one event and run to completion.
    ///
    /// Unmatched events leave configuration and context untouched.
    pub fn send(&mut self, event: impl Into<Event>) -> Configuration {
        let event = event.into();
        let span = tracing::debug_span!("send", event = %event.name);
        let _entered = span.enter();

        if self.leaf.is_none() {
            tracing::warn!(event = %event.name, "event sent before start, ignoring");
            return self.configuration();
        }

        let chart = Arc::clone(&self.chart);
        let mut step = Macrostep::new();
        if self.dispatch(&chart, &event, &mut step) {
            self.settle(&chart, &mut step);
            self.flush(step, &event);
        } else {
            tracing::debug!(event = %event.name, leaf = self.leaf_path(), "unhandled event");
        }

        self.configuration()
    }

    /// Feed a task outcome back into the chart.
    ///
    /// Outcomes whose token is no longer live (the invoking node was exited,
    /// or the outcome was already delivered) are discarded.
    pub fn resolve(&mut self, settlement: Settlement) -> Configuration {
        let Some(invoke_id) = self.invocations.claim(&settlement.token) else {
            tracing::debug!(token = %settlement.token.id(), "discarding stale invocation result");
            return self.configuration();
        };

        let event = match settlement.outcome {
            Ok(data) => Event::with_data(done_invoke(&invoke_id), data),
            Err(error) => Event::with_data(error_invoke(&invoke_id), Value::String(error.to_string())),
        };
        self.send(event)
    }

    /// Hand out tasks started since the last call.
    pub fn take_pending(&mut self) -> Vec<PendingInvocation<Env>> {
        self.invocations.take_pending()
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn chart(&self) -> &Chart<C, Env> {
        &self.chart
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn history(&self) -> &TransitionHistory {
        &self.history
    }

    pub fn is_started(&self) -> bool {
        self.leaf.is_some()
    }

    /// Number of invocations whose outcome is still awaited.
    pub fn live_invocations(&self) -> usize {
        self.invocations.live_count()
    }

    pub fn configuration(&self) -> Configuration {
        let Some(leaf) = self.leaf else {
            return Configuration::default();
        };
        let root = self.chart.root();
        let mut paths: Vec<String> = self
            .chart
            .ancestors(leaf)
            .take_while(|node| *node != root)
            .map(|node| self.chart.node(node).path().to_string())
            .collect();
        paths.reverse();
        Configuration(paths)
    }

    /// Route meta of the active leaf.
    pub fn route(&self) -> Option<&str> {
        self.leaf.and_then(|leaf| self.chart.node(leaf).route())
    }

    pub fn snapshot(&self) -> Snapshot<C> {
        Snapshot {
            configuration: self.configuration(),
            context: self.context.clone(),
            route: self.route().map(str::to_string),
        }
    }

    fn leaf_path(&self) -> &str {
        self.leaf.map_or("", |leaf| self.chart.node(leaf).path())
    }

    /// Select and execute one transition for `event`. Returns whether one fired.
    fn dispatch(&mut self, chart: &Chart<C, Env>, event: &Event, step: &mut Macrostep) -> bool {
        let Some(leaf) = self.leaf else {
            return false;
        };

        // innermost node declaring the event decides, even if no candidate is enabled
        let Some(candidates) = chart
            .ancestors(leaf)
            .find_map(|node| chart.node(node).transitions(&event.name))
        else {
            return false;
        };
        let Some(transition) = candidates.iter().find(|t| t.is_enabled(&self.context)) else {
            return false;
        };

        let from = self.leaf_path().to_string();
        match transition.target() {
            Some(target)
                if !(transition.is_internal() && chart.is_ancestor_or_self(target, leaf)) =>
            {
                let domain = chart.domain(leaf, target);
                for node in chart.exit_set(leaf, domain) {
                    self.execute(&chart.node(node).exit, event, step);
                    if chart.node(node).invocation().is_some() {
                        self.invocations.cancel(node);
                    }
                }
                self.execute(transition.actions(), event, step);
                let entered = chart.entry_set(domain, target);
                self.enter(chart, &entered, event, step);
            }
            _ => self.execute(transition.actions(), event, step),
        }

        self.record(&from, event);
        true
    }

    /// Run entry actions and start invocations, outermost first.
    fn enter(&mut self, chart: &Chart<C, Env>, nodes: &[NodeId], event: &Event, step: &mut Macrostep) {
        for &node in nodes {
            let state = chart.node(node);
            self.execute(&state.entry, event, step);

            if let Some(invocation) = state.invocation() {
                let effect = (invocation.task)(&self.context);
                self.invocations.start(node, invocation.id(), effect);
            }

            if state.kind() == NodeKind::Final {
                if let Some(parent) = state.parent() {
                    step.raised
                        .push_back(Event::new(done_state(chart.node(parent).path())));
                }
            }

            self.leaf = Some(node);
        }
    }

    fn execute(&mut self, actions: &[Action<C>], event: &Event, step: &mut Macrostep) {
        for action in actions {
            match action {
                Action::Assign(assigner) => {
                    let patch = assigner(&self.context, event);
                    self.merge(&patch, MergeMode::Replace);
                }
                Action::Forward => self.merge(&event.payload(), MergeMode::Shallow),
                Action::Raise(name) => step.raised.push_back(Event::new(name.clone())),
                Action::Effect(effect) => step.effects.push(effect.clone()),
            }
        }
    }

    fn merge(&mut self, patch: &Patch, mode: MergeMode) {
        match apply(&self.context, patch, mode) {
            Ok(next) => self.context = next,
            Err(error) => tracing::warn!(%error, leaf = self.leaf_path(), "skipping patch"),
        }
    }

    /// Eventless fixed point, then raised events, until both are exhausted.
    fn settle(&mut self, chart: &Chart<C, Env>, step: &mut Macrostep) {
        let eventless = Event::eventless();
        loop {
            let mut steps = 0;
            loop {
                if steps == self.config.max_eventless_steps {
                    tracing::error!(
                        leaf = self.leaf_path(),
                        ceiling = self.config.max_eventless_steps,
                        "eventless transitions did not settle, stopping"
                    );
                    break;
                }
                if !self.dispatch(chart, &eventless, step) {
                    break;
                }
                steps += 1;
            }

            let Some(raised) = step.raised.pop_front() else {
                break;
            };
            if !self.dispatch(chart, &raised, step) {
                tracing::debug!(event = %raised.name, "raised event not handled");
            }
        }
    }

    /// Handle collected side effects against the settled context.
    fn flush(&mut self, step: Macrostep, trigger: &Event) {
        let mut effects = step.effects;
        effects.dedup();

        for effect in effects {
            match effect {
                Effect::Persist => {
                    if let Some(persistence) = &self.persistence {
                        persistence.persist(&self.context, &trigger.payload());
                    }
                }
                Effect::ClearStorage => {
                    if let Some(persistence) = &self.persistence {
                        persistence.clear();
                    }
                }
                Effect::Log(message) => {
                    tracing::info!(leaf = self.leaf_path(), "{message}");
                }
            }
        }
    }

    fn record(&mut self, from: &str, event: &Event) {
        let to = self.leaf_path().to_string();
        if event.name != EVENTLESS {
            tracing::debug!(%from, %to, event = %event.name, "transition");
        } else {
            tracing::debug!(%from, %to, "eventless transition");
        }
        self.history = self.history.record(TransitionRecord {
            from: from.to_string(),
            to,
            event: event.name.clone(),
            timestamp: Utc::now(),
        });
    }
}
