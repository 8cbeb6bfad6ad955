//! Waypoint: a hierarchical statechart interpreter for multi-step wizards
//!
//! Waypoint follows Stillwater's "pure core, imperative shell" philosophy.
//! Charts are immutable trees built once and shared; actions are pure
//! functions returning patches; side effects (durable storage, logging,
//! service calls) are collected while a transition runs and handled only
//! after it settles.
//!
//! # Core Concepts
//!
//! - **Chart**: validated tree of compound, atomic, and final nodes
//! - **Context**: a [`Model`] aggregate updated only through patches
//! - **Interpreter**: run-to-completion dispatch with eventless settling
//! - **Invocations**: stillwater effects whose outcomes come back as events
//! - **Persistence**: one JSON snapshot per storage key
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use waypoint::builder::{forward_to, goto, goto_if, NodeBuilder};
//! use waypoint::chart::Chart;
//! use waypoint::core::{Event, Model};
//! use waypoint::interpreter::Interpreter;
//! use serde::{Deserialize, Serialize};
//! use serde_json::json;
//!
//! #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
//! #[serde(default)]
//! struct Household {
//!     members: u32,
//! }
//!
//! impl Model for Household {}
//!
//! let root: NodeBuilder<Household, ()> = NodeBuilder::compound("household")
//!     .initial("how-many")
//!     .child(NodeBuilder::atomic("how-many").on("NEXT", forward_to("branch")))
//!     .child(
//!         NodeBuilder::atomic("branch")
//!             .always(goto_if("names", |c: &Household| c.members > 1))
//!             .always(goto("done")),
//!     )
//!     .child(NodeBuilder::atomic("names"))
//!     .child(NodeBuilder::final_node("done"));
//!
//! let chart = Arc::new(Chart::build(root).unwrap());
//! let mut interpreter = Interpreter::new(chart, Household::default());
//! interpreter.start().unwrap();
//!
//! let configuration = interpreter.send(Event::with_data("NEXT", json!({ "members": 3 })));
//!
//! assert_eq!(configuration.leaf(), Some("names"));
//! assert_eq!(interpreter.context().members, 3);
//! ```

pub mod builder;
pub mod chart;
pub mod config;
pub mod core;
pub mod effects;
pub mod interpreter;
pub mod persistence;
pub mod registration;

// Re-export commonly used types
pub use builder::{BuildError, NodeBuilder, TransitionBuilder};
pub use chart::Chart;
pub use config::EngineConfig;
pub use core::{Event, Guard, Model, Patch};
pub use effects::{Action, Effect};
pub use interpreter::{Configuration, Driver, Interpreter, Snapshot};
pub use persistence::{Persistence, Storage};
