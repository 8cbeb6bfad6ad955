//! Async shell around the interpreter.

use super::{Configuration, Interpreter, InterpreterError, Snapshot};
use crate::core::{Event, Model};

/// Owns an interpreter and the service environment its tasks run against.
///
/// Every call dispatches synchronously, then runs the tasks the dispatch
/// started, one at a time, feeding each outcome back before the next.
/// Outcomes of tasks whose node was exited meanwhile are discarded by the
/// interpreter.
pub struct Driver<C: Model, Env> {
    interpreter: Interpreter<C, Env>,
    env: Env,
}

impl<C: Model, Env: Clone + Send + Sync + 'static> Driver<C, Env> {
    pub fn new(interpreter: Interpreter<C, Env>, env: Env) -> Self {
        Self { interpreter, env }
    }

    /// Start the interpreter at its initial chain and drain started tasks.
    pub async fn start(&mut self) -> Result<Configuration, InterpreterError> {
        self.interpreter.start()?;
        Ok(self.drain().await)
    }

    /// Start at an addressable node and drain started tasks.
    pub async fn start_at(&mut self, reference: &str) -> Result<Configuration, InterpreterError> {
        self.interpreter.start_at(reference)?;
        Ok(self.drain().await)
    }

    /// Dispatch an event, then run tasks until none are pending.
    pub async fn send(&mut self, event: impl Into<Event>) -> Configuration {
        self.interpreter.send(event);
        self.drain().await
    }

    async fn drain(&mut self) -> Configuration {
        loop {
            let pending = self.interpreter.take_pending();
            if pending.is_empty() {
                return self.interpreter.configuration();
            }
            for task in pending {
                tracing::debug!(invoke = %task.invoke_id, "running invocation");
                let settlement = task.run(&self.env).await;
                self.interpreter.resolve(settlement);
            }
        }
    }

    pub fn snapshot(&self) -> Snapshot<C> {
        self.interpreter.snapshot()
    }

    pub fn interpreter(&self) -> &Interpreter<C, Env> {
        &self.interpreter
    }

    pub fn interpreter_mut(&mut self) -> &mut Interpreter<C, Env> {
        &mut self.interpreter
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn into_inner(self) -> (Interpreter<C, Env>, Env) {
        (self.interpreter, self.env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{goto, InvokeBuilder, NodeBuilder, TransitionBuilder};
    use crate::chart::Chart;
    use crate::core::Patch;
    use crate::effects::{Action, InvokeError};
    use serde::{Deserialize, Serialize};
    use std::sync::Arc;
    use stillwater::prelude::*;

    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    struct Ctx {
        catalog: Vec<String>,
        failed: bool,
    }

    impl Model for Ctx {}

    #[derive(Clone)]
    struct Env {
        catalog: Option<Vec<String>>,
    }

    fn chart() -> Arc<Chart<Ctx, Env>> {
        let root = NodeBuilder::compound("app")
            .initial("loading")
            .child(
                NodeBuilder::atomic("loading").invoke(
                    InvokeBuilder::new("catalog", |_: &Ctx| {
                        from_fn(|env: &Env| {
                            env.catalog
                                .clone()
                                .map(|items| serde_json::json!(items))
                                .ok_or_else(|| InvokeError::Unavailable("catalog".into()))
                        })
                        .boxed()
                    })
                    .on_done(TransitionBuilder::to("ready").action(Action::assign(
                        |_, event: &Event| Patch::new().set("catalog", event.data.clone()),
                    )))
                    .on_error(TransitionBuilder::to("ready").action(Action::set(
                        Patch::new().set("failed", true),
                    ))),
                ),
            )
            .child(NodeBuilder::atomic("ready").on("RELOAD", goto("loading")));

        Arc::new(Chart::build(root).unwrap())
    }

    #[tokio::test]
    async fn start_drains_invocations() {
        let env = Env {
            catalog: Some(vec!["DR-4337".into()]),
        };
        let mut driver = Driver::new(Interpreter::new(chart(), Ctx::default()), env);

        let configuration = driver.start().await.unwrap();

        assert!(configuration.matches("ready"));
        assert_eq!(driver.snapshot().context.catalog, vec!["DR-4337"]);
    }

    #[tokio::test]
    async fn failed_service_takes_error_branch() {
        let mut driver = Driver::new(
            Interpreter::new(chart(), Ctx::default()),
            Env { catalog: None },
        );

        driver.start().await.unwrap();

        assert!(driver.snapshot().context.failed);
        assert_eq!(driver.interpreter().live_invocations(), 0);
    }

    #[tokio::test]
    async fn send_reruns_task_on_reentry() {
        let mut driver = Driver::new(
            Interpreter::new(chart(), Ctx::default()),
            Env { catalog: None },
        );
        driver.start().await.unwrap();

        let configuration = driver.send("RELOAD").await;

        assert!(configuration.matches("ready"));
        let visited = driver.interpreter().history().get_path();
        assert_eq!(visited, vec!["", "loading", "ready", "loading", "ready"]);
    }
}
