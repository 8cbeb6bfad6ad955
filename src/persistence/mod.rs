//! Durable snapshots of the context.
//!
//! The adapter keeps one JSON document per key. Writes merge the settled
//! context with the payload of the event that triggered them, minus the
//! context's transient keys. Reads overlay the stored document on the default
//! context. Neither direction ever fails from the caller's point of view:
//! problems are logged and defaults win.

use crate::core::{apply, merge_into, MergeMode, Model, Patch};
use serde_json::Value;
use std::fs;
use std::path::Path;

pub mod error;
pub mod storage;

pub use error::PersistenceError;
pub use storage::{FileStorage, MemoryStorage, Storage};

/// Default key of the durable slot.
pub const STATE_KEY: &str = "dsnap-registration";

/// Persistence adapter bound to one storage key.
///
/// # Example
///
/// ```rust
/// use waypoint::core::{Model, Patch};
/// use waypoint::persistence::{MemoryStorage, Persistence};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
/// #[serde(default)]
/// struct Ctx {
///     step: u32,
///     cursor: u32,
/// }
///
/// impl Model for Ctx {
///     fn transient_keys() -> &'static [&'static str] {
///         &["cursor"]
///     }
/// }
///
/// let persistence = Persistence::new(MemoryStorage::new(), "wizard");
/// persistence.persist(&Ctx { step: 3, cursor: 2 }, &Patch::new());
///
/// let restored: Ctx = persistence.restore();
/// assert_eq!(restored, Ctx { step: 3, cursor: 0 });
/// ```
pub struct Persistence {
    storage: Box<dyn Storage>,
    key: String,
}

impl Persistence {
    pub fn new(storage: impl Storage + 'static, key: impl Into<String>) -> Self {
        Self {
            storage: Box::new(storage),
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    /// Write `context`, overlaid with the triggering payload, to the slot.
    ///
    /// Transient keys are excluded from both. Object-valued payload keys are
    /// shallow-merged onto the context's value; anything else replaces it.
    /// Does nothing when the context disables persistence.
    pub fn persist<C: Model>(&self, context: &C, payload: &Patch) {
        if !context.persistence_enabled() {
            tracing::debug!(key = %self.key, "durable storage disabled, skipping write");
            return;
        }
        if let Err(error) = self.write_snapshot(context, payload) {
            tracing::warn!(key = %self.key, %error, "failed to persist context");
        }
    }

    fn write_snapshot<C: Model>(&self, context: &C, payload: &Patch) -> Result<(), PersistenceError> {
        let encoded = serde_json::to_value(context).map_err(PersistenceError::SerializationFailed)?;
        let mut snapshot = Patch::from_value(encoded)
            .without(C::transient_keys())
            .into_map();
        let overwrites = payload.without(C::transient_keys());
        merge_into(&mut snapshot, overwrites.as_map(), MergeMode::Shallow);

        let json = serde_json::to_string(&snapshot).map_err(PersistenceError::SerializationFailed)?;
        self.storage.write(&self.key, &json)
    }

    /// Load the stored context, or the default one.
    ///
    /// Transient keys in the stored document are ignored; their values come
    /// from `C::default()`. Absence and corruption both yield the default.
    pub fn restore<C: Model>(&self) -> C {
        match self.read_snapshot() {
            Ok(Some(context)) => context,
            Ok(None) => C::default(),
            Err(error) => {
                tracing::warn!(key = %self.key, %error, "discarding unreadable snapshot");
                C::default()
            }
        }
    }

    fn read_snapshot<C: Model>(&self) -> Result<Option<C>, PersistenceError> {
        let Some(raw) = self.storage.read(&self.key)? else {
            return Ok(None);
        };
        let stored: Value = serde_json::from_str(&raw).map_err(|source| PersistenceError::Corrupt {
            key: self.key.clone(),
            source,
        })?;
        let snapshot = Patch::from_value(stored).without(C::transient_keys());
        let context = apply(&C::default(), &snapshot, MergeMode::Replace)?;
        Ok(Some(context))
    }

    /// Like [`restore`](Self::restore), but seeds an empty slot from a JSON
    /// fixture first.
    pub fn restore_or_seed<C: Model>(&self, fixture: Option<&Path>) -> C {
        if let Some(path) = fixture {
            if let Err(error) = self.seed(path) {
                tracing::warn!(key = %self.key, fixture = %path.display(), %error, "failed to seed storage");
            }
        }
        self.restore()
    }

    fn seed(&self, path: &Path) -> Result<(), PersistenceError> {
        if self.storage.read(&self.key)?.is_some() {
            return Ok(());
        }
        let raw = fs::read_to_string(path).map_err(|source| PersistenceError::Io {
            key: self.key.clone(),
            source,
        })?;
        serde_json::from_str::<Value>(&raw).map_err(|source| PersistenceError::Corrupt {
            key: self.key.clone(),
            source,
        })?;
        tracing::info!(key = %self.key, fixture = %path.display(), "seeding storage from fixture");
        self.storage.write(&self.key, &raw)
    }

    /// Remove the stored snapshot.
    pub fn clear(&self) {
        if let Err(error) = self.storage.remove(&self.key) {
            tracing::warn!(key = %self.key, %error, "failed to clear storage");
        }
    }
}

impl std::fmt::Debug for Persistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Persistence")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}
