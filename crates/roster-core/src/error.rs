//! Domain error taxonomy.
//!
//! Every engine failure is a typed [`RosterError`] scoped to a single
//! intent, so callers can render a precise message. None of them is fatal
//! to the process. Running out of seats is not an error: it is reported
//! through [`AdmitResult::rejected`](roster_types::AdmitResult).

use roster_types::EventId;

/// Errors surfaced to the caller of an engine or store operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RosterError {
    /// The selector matched no event in the scope.
    #[error("no matching event in this scope")]
    EventNotFound,

    /// The event's window has ended; nothing may change.
    #[error("event has already ended")]
    EventExpired,

    /// Admission attempted after the signup cutoff.
    #[error("signup for this event has closed")]
    SignupWindowClosed,

    /// A non-member attempted admission during a seasonal priority window.
    #[error("only core members may join before the priority cutoff")]
    PriorityWindowActive,

    /// Withdrawal by a subject holding no seats in the event.
    #[error("subject holds no seats in this event")]
    NotRegistered,

    /// The selector matched more than one open event.
    #[error("{} open events match; pick one", candidates.len())]
    AmbiguousSelector {
        /// Matching events, earliest start first.
        candidates: Vec<EventId>,
    },

    /// A seat quantity of zero.
    #[error("quantity must be at least 1")]
    InvalidQuantity,

    /// An event draft failed validation.
    #[error("invalid event: {reason}")]
    InvalidEvent {
        /// What is wrong with the draft.
        reason: String,
    },

    /// Concurrent writers kept winning the version race.
    #[error("event {event_id} was modified concurrently ({attempts} attempts)")]
    Conflict {
        /// The contended event.
        event_id: EventId,
        /// How many load-apply-save cycles were tried.
        attempts: u32,
    },
}

impl RosterError {
    /// Whether retrying the same intent may succeed.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}
