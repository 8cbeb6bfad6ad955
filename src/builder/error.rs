//! Build errors for chart construction.

use thiserror::Error;

/// A single defect found while validating a chart definition.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ChartError {
    #[error("Compound node '{node}' has no initial child. Call .initial(key)")]
    MissingInitial { node: String },

    #[error("Initial child '{initial}' of '{node}' does not exist")]
    UnknownInitial { node: String, initial: String },

    #[error("Leaf node '{node}' declares an initial child")]
    InitialOnLeaf { node: String },

    #[error("Transition on '{event}' from '{node}' targets unknown node '{target}'")]
    UnknownTarget {
        node: String,
        event: String,
        target: String,
    },

    #[error("Transition on '{event}' from '{node}' targets the root node")]
    RootTarget { node: String, event: String },

    #[error("Global id '#{id}' is declared more than once")]
    DuplicateId { id: String },

    #[error("Node '{node}' has more than one child keyed '{key}'")]
    DuplicateKey { node: String, key: String },

    #[error("Compound node '{node}' has no children")]
    EmptyCompound { node: String },

    #[error("Leaf node '{node}' has children")]
    LeafWithChildren { node: String },

    #[error("Only atomic nodes may invoke; '{node}' is not atomic")]
    InvokeOnNonAtomic { node: String },
}

/// Errors that can occur when building a chart.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(
        "Chart definition is invalid ({} problem(s)): {}",
        .errors.len(),
        .errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
    )]
    InvalidChart { errors: Vec<ChartError> },
}

impl BuildError {
    /// All defects found, in discovery order.
    pub fn errors(&self) -> &[ChartError] {
        match self {
            BuildError::InvalidChart { errors } => errors,
        }
    }
}
