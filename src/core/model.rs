//! The `Model` trait for statechart context.
//!
//! The context is the single mutable aggregate threaded through every
//! transition. The interpreter never mutates it in place from user code:
//! actions produce patches and the interpreter applies them.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// Trait for statechart context types.
///
/// All methods are pure - no side effects.
///
/// # Required Traits
///
/// - `Clone`: the interpreter hands out snapshots
/// - `Default`: the fallback when durable storage is absent or corrupt
/// - `Serialize` + `DeserializeOwned`: patches are applied over the JSON form,
///   and snapshots are persisted as JSON
///
/// # Example
///
/// ```rust
/// use waypoint::core::Model;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
/// struct Counter {
///     count: u32,
///     cursor: usize,
///     store: bool,
/// }
///
/// impl Model for Counter {
///     fn transient_keys() -> &'static [&'static str] {
///         &["cursor"]
///     }
///
///     fn persistence_enabled(&self) -> bool {
///         self.store
///     }
/// }
///
/// assert_eq!(Counter::transient_keys(), &["cursor"]);
/// assert!(!Counter::default().persistence_enabled());
/// ```
pub trait Model: Clone + Debug + Default + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Top-level keys that are never written to durable storage.
    ///
    /// These are reconstructed from the default context on restore.
    /// Default implementation excludes nothing.
    fn transient_keys() -> &'static [&'static str] {
        &[]
    }

    /// Whether durable persistence is currently allowed.
    ///
    /// Default implementation returns `true`.
    fn persistence_enabled(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Plain {
        value: u32,
    }

    impl Model for Plain {}

    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Gated {
        enabled: bool,
        scratch: String,
    }

    impl Model for Gated {
        fn transient_keys() -> &'static [&'static str] {
            &["scratch"]
        }

        fn persistence_enabled(&self) -> bool {
            self.enabled
        }
    }

    #[test]
    fn defaults_persist_everything() {
        assert!(Plain::transient_keys().is_empty());
        assert!(Plain::default().persistence_enabled());
    }

    #[test]
    fn overrides_are_respected() {
        assert_eq!(Gated::transient_keys(), &["scratch"]);
        assert!(!Gated::default().persistence_enabled());

        let enabled = Gated {
            enabled: true,
            scratch: String::new(),
        };
        assert!(enabled.persistence_enabled());
    }

    #[test]
    fn model_round_trips_through_json() {
        let model = Plain { value: 7 };
        let json = serde_json::to_string(&model).unwrap();
        let back: Plain = serde_json::from_str(&json).unwrap();
        assert_eq!(model, back);
    }
}
