//! Transition history tracking.
//!
//! Provides immutable tracking of settled microsteps over time. The
//! interpreter records one entry per executed transition, eventless ones
//! included, so the path a user took through the wizard can be replayed in
//! diagnostics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Record of a single executed transition.
///
/// `from` and `to` are the dotted paths of the active leaf before and after
/// the microstep. `event` is the name of the event that selected it; it is
/// empty for eventless transitions.
///
/// # Example
///
/// ```rust
/// use waypoint::core::TransitionRecord;
/// use chrono::Utc;
///
/// let record = TransitionRecord {
///     from: "form.household.how-many".to_string(),
///     to: "form.household.member-info-branch".to_string(),
///     event: "NEXT".to_string(),
///     timestamp: Utc::now(),
/// };
/// assert!(!record.is_eventless());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Leaf path before the transition
    pub from: String,
    /// Leaf path after the transition
    pub to: String,
    /// Event that selected the transition
    pub event: String,
    /// When the transition occurred
    pub timestamp: DateTime<Utc>,
}

impl TransitionRecord {
    /// Whether the transition fired without an event.
    pub fn is_eventless(&self) -> bool {
        self.event.is_empty()
    }
}

/// Ordered history of executed transitions.
///
/// History is immutable - the `record` method returns a new history
/// with the transition added.
///
/// # Example
///
/// ```rust
/// use waypoint::core::{TransitionHistory, TransitionRecord};
/// use chrono::Utc;
///
/// let history = TransitionHistory::new();
/// let history = history.record(TransitionRecord {
///     from: "welcome.welcome".to_string(),
///     to: "form.pre-registration.loading".to_string(),
///     event: "NEXT".to_string(),
///     timestamp: Utc::now(),
/// });
///
/// assert_eq!(history.get_path(), vec!["welcome.welcome", "form.pre-registration.loading"]);
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TransitionHistory {
    transitions: Vec<TransitionRecord>,
}

impl TransitionHistory {
    /// Create a new empty history.
    pub fn new() -> Self {
        Self {
            transitions: Vec::new(),
        }
    }

    /// Record a transition, returning a new history.
    ///
    /// The existing history is left untouched.
    pub fn record(&self, transition: TransitionRecord) -> Self {
        let mut transitions = self.transitions.clone();
        transitions.push(transition);
        Self { transitions }
    }

    /// Get the path of leaves traversed.
    ///
    /// Returns the starting leaf followed by the `to` leaf of every
    /// transition.
    pub fn get_path(&self) -> Vec<&str> {
        let mut path = Vec::new();
        if let Some(first) = self.transitions.first() {
            path.push(first.from.as_str());
        }
        for transition in &self.transitions {
            path.push(transition.to.as_str());
        }
        path
    }

    /// Calculate total duration from first to last transition.
    ///
    /// Returns `None` if there are no transitions.
    pub fn duration(&self) -> Option<Duration> {
        if let (Some(first), Some(last)) = (self.transitions.first(), self.transitions.last()) {
            let duration = last.timestamp.signed_duration_since(first.timestamp);
            duration.to_std().ok()
        } else {
            None
        }
    }

    /// Get all transitions in order.
    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    /// The most recent transition, if any.
    pub fn last(&self) -> Option<&TransitionRecord> {
        self.transitions.last()
    }
}
