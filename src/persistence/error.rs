//! Persistence error types.

use crate::core::PatchError;
use thiserror::Error;

/// Errors that can occur while reading or writing durable snapshots.
///
/// These never reach callers of the interpreter: the adapter logs them and
/// falls back to defaults.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The backing store could not be read or written
    #[error("Storage I/O failed for '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// The context could not be encoded
    #[error("Serialization failed: {0}")]
    SerializationFailed(#[source] serde_json::Error),

    /// The stored snapshot is not valid JSON for the context
    #[error("Snapshot for '{key}' is corrupt: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The stored snapshot does not fit the context type
    #[error("Snapshot does not fit the context: {0}")]
    Incompatible(#[from] PatchError),

    /// Another user of a shared in-memory store panicked mid-write
    #[error("Storage lock poisoned")]
    Poisoned,
}
