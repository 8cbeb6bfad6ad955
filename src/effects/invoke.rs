//! Asynchronous invocations owned by active nodes.
//!
//! An invoking node starts its task once per entry. The task is a stillwater
//! effect built from the context at entry time; it runs on its own timeline
//! and its outcome comes back through [`Interpreter::resolve`], which only
//! honours the token of the node instance that is still active.
//!
//! [`Interpreter::resolve`]: crate::interpreter::Interpreter::resolve

use crate::chart::NodeId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use stillwater::effect::{BoxedEffect, Effect};
use stillwater::prelude::*;
use uuid::Uuid;

/// Errors a task may reject with.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum InvokeError {
    #[error("Invocation rejected: {0}")]
    Rejected(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

/// Factory creating a fresh task effect from the context at entry.
pub type Task<C, Env> = Arc<dyn Fn(&C) -> BoxedEffect<Value, InvokeError, Env> + Send + Sync>;

/// Identity of one started task. Re-entering a node mints a new token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvocationToken {
    pub(crate) node: NodeId,
    pub(crate) id: Uuid,
}

impl InvocationToken {
    pub fn id(&self) -> Uuid {
        self.id
    }
}

/// A started task waiting to be run by the caller.
pub struct PendingInvocation<Env> {
    pub token: InvocationToken,
    /// The invocation id from the chart (e.g. `submitApplication`).
    pub invoke_id: String,
    effect: BoxedEffect<Value, InvokeError, Env>,
}

impl<Env: Clone + Send + Sync + 'static> PendingInvocation<Env> {
    /// Run the task against the service environment.
    pub async fn run(self, env: &Env) -> Settlement {
        let outcome = self.effect.run(env).await;
        Settlement {
            token: self.token,
            outcome,
        }
    }
}

impl<Env> fmt::Debug for PendingInvocation<Env> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingInvocation")
            .field("token", &self.token)
            .field("invoke_id", &self.invoke_id)
            .finish_non_exhaustive()
    }
}

/// Outcome of a task, tagged with the token it was started under.
#[derive(Clone, Debug, PartialEq)]
pub struct Settlement {
    pub token: InvocationToken,
    pub outcome: Result<Value, InvokeError>,
}

impl Settlement {
    pub fn resolved(token: InvocationToken, value: Value) -> Self {
        Self {
            token,
            outcome: Ok(value),
        }
    }

    pub fn rejected(token: InvocationToken, error: InvokeError) -> Self {
        Self {
            token,
            outcome: Err(error),
        }
    }
}

/// Tracks at most one live task per active invoking node.
pub struct InvocationManager<Env> {
    live: HashMap<NodeId, (Uuid, String)>,
    queue: Vec<PendingInvocation<Env>>,
}

impl<Env> InvocationManager<Env> {
    pub fn new() -> Self {
        Self {
            live: HashMap::new(),
            queue: Vec::new(),
        }
    }

    /// Register a freshly started task for `node`.
    pub fn start(
        &mut self,
        node: NodeId,
        invoke_id: &str,
        effect: BoxedEffect<Value, InvokeError, Env>,
    ) -> InvocationToken {
        let token = InvocationToken {
            node,
            id: Uuid::new_v4(),
        };
        self.live.insert(node, (token.id, invoke_id.to_string()));
        self.queue.push(PendingInvocation {
            token,
            invoke_id: invoke_id.to_string(),
            effect,
        });
        tracing::debug!(invoke = invoke_id, token = %token.id, "invocation started");
        token
    }

    /// Forget the live task of `node`. Tasks not yet handed out are dropped.
    pub fn cancel(&mut self, node: NodeId) {
        if let Some((id, invoke_id)) = self.live.remove(&node) {
            self.queue.retain(|pending| pending.token.id != id);
            tracing::debug!(invoke = %invoke_id, token = %id, "invocation cancelled");
        }
    }

    /// Claim the live task for `token`, returning its invocation id.
    ///
    /// Returns `None` for stale tokens; the caller must discard the outcome.
    pub fn claim(&mut self, token: &InvocationToken) -> Option<String> {
        match self.live.get(&token.node) {
            Some((id, _)) if *id == token.id => {
                self.live.remove(&token.node).map(|(_, invoke_id)| invoke_id)
            }
            _ => None,
        }
    }

    pub fn is_live(&self, token: &InvocationToken) -> bool {
        self.live
            .get(&token.node)
            .is_some_and(|(id, _)| *id == token.id)
    }

    /// Hand out every task started since the last call.
    pub fn take_pending(&mut self) -> Vec<PendingInvocation<Env>> {
        std::mem::take(&mut self.queue)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}

impl<Env> Default for InvocationManager<Env> {
    fn default() -> Self {
        Self::new()
    }
}

/// Task that resolves immediately with `value`.
pub fn resolve_with<Env>(value: Value) -> BoxedEffect<Value, InvokeError, Env>
where
    Env: Clone + Send + Sync + 'static,
{
    pure(value).boxed()
}

/// Task that rejects immediately with `error`.
pub fn reject_with<Env>(error: InvokeError) -> BoxedEffect<Value, InvokeError, Env>
where
    Env: Clone + Send + Sync + 'static,
{
    fail(error).boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(index: usize) -> NodeId {
        NodeId::from_index(index)
    }

    #[test]
    fn start_queues_one_task() {
        let mut manager: InvocationManager<()> = InvocationManager::new();
        let token = manager.start(node(1), "getDisasters", resolve_with(json!([])));

        assert!(manager.is_live(&token));
        assert_eq!(manager.live_count(), 1);
        let pending = manager.take_pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].invoke_id, "getDisasters");
        assert!(manager.take_pending().is_empty());
    }

    #[test]
    fn cancel_makes_token_stale_and_drops_unclaimed_task() {
        let mut manager: InvocationManager<()> = InvocationManager::new();
        let token = manager.start(node(1), "submitApplication", resolve_with(json!({})));

        manager.cancel(node(1));

        assert!(!manager.is_live(&token));
        assert!(manager.claim(&token).is_none());
        assert!(manager.take_pending().is_empty());
    }

    #[test]
    fn reentry_mints_a_fresh_token() {
        let mut manager: InvocationManager<()> = InvocationManager::new();
        let first = manager.start(node(4), "submitApplication", resolve_with(json!(1)));
        manager.cancel(node(4));
        let second = manager.start(node(4), "submitApplication", resolve_with(json!(2)));

        assert_ne!(first, second);
        assert!(manager.claim(&first).is_none());
        assert_eq!(manager.claim(&second).as_deref(), Some("submitApplication"));
        assert!(manager.claim(&second).is_none());
    }

    #[tokio::test]
    async fn pending_task_runs_against_environment() {
        let mut manager: InvocationManager<()> = InvocationManager::new();
        manager.start(node(2), "ok", resolve_with(json!({ "eligible": true })));
        manager.start(node(3), "bad", reject_with(InvokeError::Rejected("500".into())));

        let mut settlements = Vec::new();
        for pending in manager.take_pending() {
            settlements.push(pending.run(&()).await);
        }

        assert_eq!(settlements[0].outcome, Ok(json!({ "eligible": true })));
        assert_eq!(
            settlements[1].outcome,
            Err(InvokeError::Rejected("500".into()))
        );
    }
}
