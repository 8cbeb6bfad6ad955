//! The disaster food assistance registration wizard.
//!
//! [`chart`] builds the wizard's statechart, [`interpreter`] wires it to
//! durable storage and restores any saved progress. Pages talk to the
//! interpreter with the event names in [`events`], carrying their form data
//! as the event payload.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use waypoint::config::EngineConfig;
//! use waypoint::persistence::MemoryStorage;
//! use waypoint::registration::{self, events};
//!
//! let chart = Arc::new(registration::chart().unwrap());
//! let mut wizard = registration::interpreter(chart, EngineConfig::default(), MemoryStorage::new());
//!
//! wizard.start_at("#welcome").unwrap();
//! assert_eq!(wizard.route(), Some("/welcome"));
//!
//! // Pre-registration invokes the disaster catalog; the task waits for a runner.
//! wizard.send(events::NEXT);
//! assert!(wizard.configuration().matches("form.pre-registration.loading"));
//! assert_eq!(wizard.take_pending().len(), 1);
//! ```

pub mod chart;
pub mod context;
pub mod lenient;
pub mod services;

pub use context::Context;
pub use services::{DisasterCatalog, RegistrationApi, ServiceError, Services};

use crate::builder::BuildError;
use crate::chart::Chart;
use crate::config::EngineConfig;
use crate::interpreter::Interpreter;
use crate::persistence::{Persistence, Storage};
use std::sync::Arc;

/// Event and invocation names understood by the wizard.
pub mod events {
    /// Submit the current page and advance.
    pub const NEXT: &str = "NEXT";
    /// Edit an answer from the review page.
    pub const EDIT: &str = "EDIT";
    /// Skip from the basic info shortcut straight to submission.
    pub const EXIT: &str = "EXIT";
    /// Abandon the session.
    pub const QUIT: &str = "QUIT";
    /// Clear everything and return to the welcome page.
    pub const RESET: &str = "RESET";
    pub const DECREMENT_CURRENT_MEMBER_INDEX: &str = "DECREMENT_CURRENT_MEMBER_INDEX";
    pub const DECREMENT_CURRENT_JOB_INDEX: &str = "DECREMENT_CURRENT_JOB_INDEX";
    pub const RESET_CURRENT_RESOURCE_MEMBER_INDEX: &str = "RESET_CURRENT_RESOURCE_MEMBER_INDEX";

    /// Loads the disaster catalog on entering pre-registration.
    pub const GET_DISASTERS: &str = "getDisasters";
    /// Stores the registration and checks eligibility.
    pub const SUBMIT_APPLICATION: &str = "submitApplication";
    /// Ends the session after `QUIT`.
    pub const CLEAR_SESSION_STATE: &str = "clearSessionState";
}

/// Build and validate the wizard chart.
pub fn chart() -> Result<Chart<Context, Services>, BuildError> {
    Chart::build(chart::app())
}

/// Create a stopped interpreter over `storage`, restoring saved progress.
///
/// When the slot is empty and `config.fixture_path` names a JSON file, the
/// file seeds the slot first.
pub fn interpreter(
    chart: Arc<Chart<Context, Services>>,
    config: EngineConfig,
    storage: impl Storage + 'static,
) -> Interpreter<Context, Services> {
    let persistence = Persistence::new(storage, config.storage_key.clone());
    let context: Context = persistence.restore_or_seed(config.fixture_path.as_deref());
    tracing::debug!(key = %persistence.key(), step = context.step, "registration context restored");

    Interpreter::new(chart, context)
        .with_persistence(persistence)
        .with_config(config)
}
