//! Actions, side effects, and asynchronous invocations.
//!
//! This module is the "imperative shell" around the pure core:
//!
//! - **Actions**: patch producers and event raisers run during transitions
//! - **Effects**: persistence and logging requests deferred until a
//!   transition settles
//! - **Invocations**: stillwater effects started on node entry whose
//!   outcomes are fed back as synthetic events
//!
//! # Zero-Cost Abstractions
//!
//! Following Stillwater 0.11.0 conventions:
//! - Collections store `BoxedEffect` (one allocation per started task)
//! - Use free-standing constructors: `pure()`, `fail()`, `from_fn()`

mod action;
mod invoke;

pub use action::{Action, Assigner, Effect};
pub use invoke::{
    reject_with, resolve_with, InvocationManager, InvocationToken, InvokeError,
    PendingInvocation, Settlement, Task,
};
