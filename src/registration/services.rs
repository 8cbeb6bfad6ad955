//! External collaborators of the wizard and the tasks that call them.
//!
//! The disaster catalog and the registration API are reached only through
//! invocation tasks, so the chart never blocks on them. Both are traits so
//! callers can plug in HTTP clients, fixtures or test doubles.

use super::context::{Context, Registration};
use crate::effects::{InvokeError, Task};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use stillwater::prelude::*;
use thiserror::Error;

/// Errors reported by external services.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ServiceError {
    #[error("Request failed with status {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Service unreachable: {0}")]
    Unreachable(String),

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
}

impl From<ServiceError> for InvokeError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::Unreachable(message) => InvokeError::Unavailable(message),
            other => InvokeError::Rejected(other.to_string()),
        }
    }
}

/// Source of the disasters a user may register for.
///
/// Called from inside the task's effect on the caller's executor, so
/// implementations must not block. Wrap blocking clients in
/// `tokio::task::block_in_place` or answer from a cache.
pub trait DisasterCatalog: Send + Sync {
    /// Every disaster currently open for registration, as raw JSON records.
    fn disasters(&self) -> Result<Vec<Value>, ServiceError>;
}

/// Response of the registration endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegistrationReceipt {
    pub id: Value,
    pub created_date: String,
    pub modified_date: String,
    /// The registration as stored, forwarded to the eligibility check.
    pub original_data: Value,
}

/// Response of the eligibility endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Eligibility {
    pub eligible: bool,
}

/// Two-phase submission: store the registration, then check eligibility.
///
/// Same executor rule as [`DisasterCatalog`]: calls run inline in the task.
pub trait RegistrationApi: Send + Sync {
    fn create_registration(&self, context: &Context) -> Result<RegistrationReceipt, ServiceError>;

    fn create_eligibility(&self, original_data: &Value) -> Result<Eligibility, ServiceError>;
}

/// Service environment the registration tasks run against.
#[derive(Clone)]
pub struct Services {
    pub disasters: Arc<dyn DisasterCatalog>,
    pub registrations: Arc<dyn RegistrationApi>,
}

impl Services {
    pub fn new(
        disasters: impl DisasterCatalog + 'static,
        registrations: impl RegistrationApi + 'static,
    ) -> Self {
        Self {
            disasters: Arc::new(disasters),
            registrations: Arc::new(registrations),
        }
    }
}

/// Fetch the disaster catalog. Resolves with the list of records.
pub fn fetch_disasters() -> Task<Context, Services> {
    Arc::new(|_: &Context| {
        from_fn(|env: &Services| -> Result<Value, InvokeError> {
            let disasters = env.disasters.disasters()?;
            tracing::debug!(count = disasters.len(), "fetched disaster catalog");
            Ok(Value::Array(disasters))
        })
        .boxed()
    })
}

/// Submit the registration and check eligibility.
///
/// Resolves with `{ "registration": { id, createdAt, updatedAt, eligible } }`.
pub fn submit_application() -> Task<Context, Services> {
    Arc::new(|context: &Context| {
        let context = context.clone();
        from_fn(move |env: &Services| -> Result<Value, InvokeError> {
            let receipt = env.registrations.create_registration(&context)?;
            let eligibility = env.registrations.create_eligibility(&receipt.original_data)?;

            let registration = Registration {
                id: match &receipt.id {
                    Value::String(id) => id.clone(),
                    other => other.to_string(),
                },
                created_at: receipt.created_date,
                updated_at: receipt.modified_date,
                eligible: Some(eligibility.eligible),
                applicant_name: String::new(),
            };
            tracing::debug!(id = %registration.id, eligible = eligibility.eligible, "registration submitted");
            Ok(json!({ "registration": registration }))
        })
        .boxed()
    })
}

/// Extract the registration from a `submitApplication` result.
pub fn registration_from(data: &Value) -> Registration {
    data.get("registration")
        .map(|value| Registration::deserialize(value).unwrap_or_default())
        .unwrap_or_default()
}
