//! Core statechart types and logic.
//!
//! This module contains the pure functional core of the interpreter:
//! - Context contract via the `Model` trait
//! - Guard predicates for transition control
//! - Events and context patches
//! - Immutable history tracking
//!
//! All logic in this module is pure (no side effects), following
//! the "pure core, imperative shell" philosophy.

mod event;
mod guard;
mod history;
mod model;
mod patch;

pub use event::{done_invoke, done_state, error_invoke, Event, EVENTLESS, INIT};
pub use guard::Guard;
pub use history::{TransitionHistory, TransitionRecord};
pub use model::Model;
pub use patch::{apply, merge_into, MergeMode, Patch, PatchError};
