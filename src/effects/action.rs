//! Actions attached to nodes and transitions.

use crate::core::{Event, Patch};
use std::fmt;
use std::sync::Arc;

/// Pure context transform: `(context, event) -> partial context`.
pub type Assigner<C> = Arc<dyn Fn(&C, &Event) -> Patch + Send + Sync>;

/// Side effects handled at the effect boundary, after a transition settles.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Write the settled context to durable storage.
    Persist,
    /// Remove the durable snapshot.
    ClearStorage,
    /// Emit a log line.
    Log(String),
}

/// An action the interpreter executes while taking a transition.
///
/// `Assign` and `Forward` produce patches that the interpreter merges;
/// neither touches the context directly. `Raise` queues an internal event.
/// `Effect` defers a side effect until the transition has settled.
pub enum Action<C> {
    /// Replace the top-level keys named by the returned patch.
    Assign(Assigner<C>),
    /// Shallow-merge the event payload into the context.
    Forward,
    /// Queue an internal event, processed after the eventless fixed point.
    Raise(String),
    Effect(Effect),
}

impl<C> Action<C> {
    /// Assign from a function of context and event.
    pub fn assign<F>(f: F) -> Self
    where
        F: Fn(&C, &Event) -> Patch + Send + Sync + 'static,
    {
        Action::Assign(Arc::new(f))
    }

    /// Assign a fixed patch.
    pub fn set(patch: Patch) -> Self {
        Action::Assign(Arc::new(move |_: &C, _: &Event| patch.clone()))
    }

    pub fn forward() -> Self {
        Action::Forward
    }

    pub fn raise(event: impl Into<String>) -> Self {
        Action::Raise(event.into())
    }

    pub fn persist() -> Self {
        Action::Effect(Effect::Persist)
    }

    pub fn clear_storage() -> Self {
        Action::Effect(Effect::ClearStorage)
    }

    pub fn log(message: impl Into<String>) -> Self {
        Action::Effect(Effect::Log(message.into()))
    }
}

impl<C> Clone for Action<C> {
    fn clone(&self) -> Self {
        match self {
            Action::Assign(f) => Action::Assign(Arc::clone(f)),
            Action::Forward => Action::Forward,
            Action::Raise(event) => Action::Raise(event.clone()),
            Action::Effect(effect) => Action::Effect(effect.clone()),
        }
    }
}

impl<C> fmt::Debug for Action<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Assign(_) => f.write_str("Assign(..)"),
            Action::Forward => f.write_str("Forward"),
            Action::Raise(event) => f.debug_tuple("Raise").field(event).finish(),
            Action::Effect(effect) => f.debug_tuple("Effect").field(effect).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_returns_same_patch_every_time() {
        let action: Action<()> = Action::set(Patch::new().set("step", 1));
        let Action::Assign(f) = action else {
            panic!("expected Assign");
        };

        let event = Event::new("NEXT");
        assert_eq!(f(&(), &event), f(&(), &event));
        assert_eq!(f(&(), &event).get("step"), Some(&serde_json::json!(1)));
    }

    #[test]
    fn assign_sees_event() {
        let action: Action<()> =
            Action::assign(|_, event: &Event| Patch::new().set("last", event.name.as_str()));
        let Action::Assign(f) = action else {
            panic!("expected Assign");
        };

        let patch = f(&(), &Event::new("EDIT"));
        assert_eq!(patch.get("last"), Some(&serde_json::json!("EDIT")));
    }

    #[test]
    fn effect_constructors() {
        assert!(matches!(
            Action::<()>::persist(),
            Action::Effect(Effect::Persist)
        ));
        assert!(matches!(
            Action::<()>::clear_storage(),
            Action::Effect(Effect::ClearStorage)
        ));
        assert!(matches!(Action::<()>::log("hi"), Action::Effect(Effect::Log(m)) if m == "hi"));
        assert!(matches!(Action::<()>::raise("BACK"), Action::Raise(e) if e == "BACK"));
    }
}
