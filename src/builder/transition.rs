//! Builders for transition candidates and invocation descriptors.

use crate::core::Guard;
use crate::effects::{Action, InvokeError, Task};
use serde_json::Value;
use std::sync::Arc;
use stillwater::effect::BoxedEffect;

/// Builder for one transition candidate.
///
/// Targets are written as `"#id"` (global), `".child"` (relative to the node
/// that owns the transition) or `"sibling"` (relative to the owner's parent).
/// Dotted suffixes descend further: `"#household.get-prepared"`.
pub struct TransitionBuilder<C> {
    pub(crate) target: Option<String>,
    pub(crate) guard: Option<Guard<C>>,
    pub(crate) actions: Vec<Action<C>>,
    pub(crate) internal: bool,
}

impl<C: 'static> TransitionBuilder<C> {
    /// Candidate that moves to `target`.
    pub fn to(target: impl Into<String>) -> Self {
        Self {
            target: Some(target.into()),
            guard: None,
            actions: Vec::new(),
            internal: false,
        }
    }

    /// Candidate that only runs its actions.
    pub fn targetless() -> Self {
        Self {
            target: None,
            guard: None,
            actions: Vec::new(),
            internal: false,
        }
    }

    /// Add a guard predicate (optional).
    pub fn guard(mut self, guard: Guard<C>) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Add a guard using a closure (optional).
    pub fn when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&C) -> bool + Send + Sync + 'static,
    {
        self.guard = Some(Guard::new(predicate));
        self
    }

    /// Append one action.
    pub fn action(mut self, action: Action<C>) -> Self {
        self.actions.push(action);
        self
    }

    /// Append several actions, in order.
    pub fn actions(mut self, actions: impl IntoIterator<Item = Action<C>>) -> Self {
        self.actions.extend(actions);
        self
    }

    /// Do not exit and re-enter the target when it is already active.
    pub fn internal(mut self) -> Self {
        self.internal = true;
        self
    }
}

/// Builder for an invocation attached to an atomic node.
pub struct InvokeBuilder<C, Env> {
    pub(crate) id: String,
    pub(crate) task: Task<C, Env>,
    pub(crate) on_done: Vec<TransitionBuilder<C>>,
    pub(crate) on_error: Vec<TransitionBuilder<C>>,
}

impl<C: 'static, Env> InvokeBuilder<C, Env> {
    /// Create an invocation whose task is built from the context at entry.
    pub fn new<F>(id: impl Into<String>, task: F) -> Self
    where
        F: Fn(&C) -> BoxedEffect<Value, InvokeError, Env> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            task: Arc::new(task),
            on_done: Vec::new(),
            on_error: Vec::new(),
        }
    }

    /// Candidate taken when the task resolves.
    pub fn on_done(mut self, transition: TransitionBuilder<C>) -> Self {
        self.on_done.push(transition);
        self
    }

    /// Candidate taken when the task rejects.
    pub fn on_error(mut self, transition: TransitionBuilder<C>) -> Self {
        self.on_error.push(transition);
        self
    }
}
