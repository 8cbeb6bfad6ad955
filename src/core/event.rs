//! Events consumed by the interpreter.

use super::patch::Patch;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name of the eventless ("always") transition slot.
pub const EVENTLESS: &str = "";

/// Name of the event used when the interpreter enters its first configuration.
pub const INIT: &str = "init";

/// Name of the synthetic event delivered when invocation `id` resolves.
pub fn done_invoke(id: &str) -> String {
    format!("done.invoke.{id}")
}

/// Name of the synthetic event delivered when invocation `id` rejects.
pub fn error_invoke(id: &str) -> String {
    format!("error.invoke.{id}")
}

/// Name of the event raised when the compound node at `path` reaches a final child.
pub fn done_state(path: &str) -> String {
    format!("done.state.{path}")
}

/// A named event with an optional JSON payload.
///
/// Form submissions carry a payload object keyed by top-level context field;
/// invocation results carry whatever the task resolved with.
///
/// # Example
///
/// ```rust
/// use waypoint::core::{Event, Patch};
///
/// let event = Event::with_payload("NEXT", Patch::new().set("step", 2));
///
/// assert_eq!(event.name, "NEXT");
/// assert_eq!(event.payload().len(), 1);
/// assert!(!event.is_eventless());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    #[serde(default)]
    pub data: Value,
}

impl Event {
    /// An event without a payload.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: Value::Null,
        }
    }

    /// An event carrying a context patch.
    pub fn with_payload(name: impl Into<String>, payload: Patch) -> Self {
        Self {
            name: name.into(),
            data: Value::Object(payload.into_map()),
        }
    }

    /// An event carrying arbitrary data.
    pub fn with_data(name: impl Into<String>, data: Value) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    pub fn init() -> Self {
        Self::new(INIT)
    }

    pub fn eventless() -> Self {
        Self::new(EVENTLESS)
    }

    pub fn is_eventless(&self) -> bool {
        self.name.is_empty()
    }

    /// The payload as a patch. Non-object data yields an empty patch.
    pub fn payload(&self) -> Patch {
        Patch::from_value(self.data.clone())
    }
}

impl From<&str> for Event {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Event {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}
