//! Engine configuration.

use crate::persistence::STATE_KEY;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable overriding [`EngineConfig::storage_key`].
pub const ENV_STATE_KEY: &str = "WAYPOINT_STATE_KEY";
/// Environment variable overriding [`EngineConfig::max_eventless_steps`].
pub const ENV_MAX_EVENTLESS_STEPS: &str = "WAYPOINT_MAX_EVENTLESS_STEPS";
/// Environment variable naming a JSON fixture used to seed empty storage.
pub const ENV_LOAD_STATE: &str = "WAYPOINT_LOAD_STATE";

/// Process-wide interpreter settings.
///
/// Every field has a default, so a partial JSON document (or none at all)
/// deserializes to a working configuration.
///
/// # Example
///
/// ```rust
/// use waypoint::config::EngineConfig;
///
/// let config: EngineConfig = serde_json::from_str(r#"{ "max_eventless_steps": 50 }"#).unwrap();
///
/// assert_eq!(config.storage_key, "dsnap-registration");
/// assert_eq!(config.max_eventless_steps, 50);
/// assert!(config.fixture_path.is_none());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Key of the durable snapshot slot
    pub storage_key: String,

    /// Consecutive eventless microsteps allowed before settling gives up
    pub max_eventless_steps: usize,

    /// JSON context written to storage when the slot is empty
    pub fixture_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            storage_key: STATE_KEY.to_string(),
            max_eventless_steps: 1000,
            fixture_path: None,
        }
    }
}

impl EngineConfig {
    /// Read overrides from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    ///
    /// Unset, empty or unparsable values keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(key) = lookup(ENV_STATE_KEY).filter(|value| !value.is_empty()) {
            config.storage_key = key;
        }

        if let Some(raw) = lookup(ENV_MAX_EVENTLESS_STEPS) {
            match raw.trim().parse::<usize>() {
                Ok(steps) if steps > 0 => config.max_eventless_steps = steps,
                _ => tracing::warn!(
                    variable = ENV_MAX_EVENTLESS_STEPS,
                    value = %raw,
                    "ignoring invalid eventless step ceiling"
                ),
            }
        }

        config.fixture_path = lookup(ENV_LOAD_STATE)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);

        config
    }
}
