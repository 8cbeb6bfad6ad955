//! Builder API for declarative chart construction.
//!
//! This module provides fluent builders and macros for describing a chart
//! tree with minimal boilerplate. [`Chart::build`](crate::chart::Chart::build)
//! turns the finished tree into an immutable, validated chart.

pub mod error;
pub mod macros;
pub mod node;
pub mod transition;

pub use error::{BuildError, ChartError};
pub use node::{NodeBuilder, NodeKind};
pub use transition::{InvokeBuilder, TransitionBuilder};

use crate::effects::Action;

/// Transition that merges the event payload into the context and persists.
///
/// This is the standard "form step submitted" transition.
///
/// # Example
///
/// ```
/// use waypoint::builder::{forward_to, NodeBuilder};
///
/// let step: NodeBuilder<(), ()> = NodeBuilder::atomic("address")
///     .on("NEXT", forward_to("mailing-address-check"));
/// ```
pub fn forward_to<C: 'static>(target: impl Into<String>) -> TransitionBuilder<C> {
    TransitionBuilder::to(target)
        .action(Action::forward())
        .action(Action::persist())
}

/// Unconditional transition without actions.
pub fn goto<C: 'static>(target: impl Into<String>) -> TransitionBuilder<C> {
    TransitionBuilder::to(target)
}

/// Guarded transition without actions.
pub fn goto_if<C: 'static, F>(target: impl Into<String>, guard: F) -> TransitionBuilder<C>
where
    F: Fn(&C) -> bool + Send + Sync + 'static,
{
    TransitionBuilder::to(target).when(guard)
}
