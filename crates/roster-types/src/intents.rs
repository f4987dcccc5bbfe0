//! Intent and outcome payloads exchanged with the command-parsing and
//! rendering collaborators.
//!
//! The command parser turns chat text such as `+3 @9/06` into an
//! [`Intent`]. The store resolves the selector, applies the operation, and
//! answers with an [`IntentOutcome`] carrying an [`EventSnapshot`] that the
//! transport renders.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::EventStatus;
use crate::ids::{EventId, ScopeId, SubjectId};
use crate::structs::{AdmitResult, CoreMember, Event, EventKind, EventWindow, WithdrawResult};

/// Everything needed to create an event. Unset limits fall back to the
/// configured policy defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EventDraft {
    /// Standard or seasonal admission rules.
    pub kind: EventKind,
    /// Short title for rendering.
    #[serde(default)]
    pub title: String,
    /// Venue text for rendering.
    #[serde(default)]
    pub location: String,
    /// Scheduled time range.
    pub window: EventWindow,
    /// Confirmed seat limit.
    #[serde(default)]
    pub capacity: Option<u32>,
    /// Waitlist seat limit.
    #[serde(default)]
    pub waitlist_capacity: Option<u32>,
    /// Minutes after start at which admissions stop.
    #[serde(default)]
    pub signup_cutoff_minutes: Option<i64>,
}

/// How an intent picks its target event within a scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum EventSelector {
    /// A specific event.
    Id(EventId),
    /// The earliest open event starting on this local date.
    Date(NaiveDate),
    /// The only open event in the scope.
    #[default]
    SingleOpen,
}

/// What the intent asks the engine to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Operation {
    /// Create a new event in the scope.
    Create(EventDraft),
    /// Request seats.
    Admit,
    /// Release seats.
    Withdraw,
    /// Remove the selected event immediately.
    Delete,
    /// List the open events in the scope.
    List,
    /// Grant the subject core membership.
    AddMember,
    /// Revoke the subject's core membership.
    RemoveMember,
    /// List the core membership registry.
    ListMembers,
}

/// A structured command, already parsed by the upstream collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Intent {
    /// The requested operation.
    pub operation: Operation,
    /// Conversation the command came from.
    pub scope: ScopeId,
    /// Target event selection.
    #[serde(default)]
    pub selector: EventSelector,
    /// Who sent the command.
    pub subject: SubjectId,
    /// The sender's resolved display name.
    #[serde(default)]
    pub display_name: String,
    /// Seats requested or released.
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    /// The instant the command is evaluated at.
    pub now: DateTime<Utc>,
}

const fn default_quantity() -> u32 {
    1
}

/// An event plus the values derived from it at evaluation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EventSnapshot {
    /// The full aggregate as persisted.
    pub event: Event,
    /// Lifecycle status at the intent's `now`.
    pub status: EventStatus,
    /// Confirmed seats taken.
    pub participant_total: u32,
    /// Waitlisted seats.
    pub waitlist_total: u32,
}

impl EventSnapshot {
    /// Capture a snapshot with a precomputed status.
    pub fn new(event: Event, status: EventStatus) -> Self {
        let participant_total = event.participant_total();
        let waitlist_total = event.waitlist_total();
        Self {
            event,
            status,
            participant_total,
            waitlist_total,
        }
    }
}

/// The result of applying an intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "outcome", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum IntentOutcome {
    /// A new event exists.
    Created {
        /// The created event.
        snapshot: Box<EventSnapshot>,
        /// Core members seeded into a seasonal event.
        seeded: u32,
        /// Core members that fit in neither container.
        seed_skipped: u32,
    },
    /// Seats were requested.
    Admitted {
        /// Where the seats landed.
        result: AdmitResult,
        /// The event after admission.
        snapshot: Box<EventSnapshot>,
    },
    /// Seats were released.
    Withdrawn {
        /// What was released and promoted.
        result: WithdrawResult,
        /// The event after withdrawal.
        snapshot: Box<EventSnapshot>,
    },
    /// The event was removed.
    Deleted {
        /// The removed event.
        event_id: EventId,
    },
    /// Open events in the scope, earliest first.
    Listed {
        /// Snapshots in start order.
        events: Vec<EventSnapshot>,
    },
    /// The core membership registry.
    Members {
        /// Members in registry order.
        members: Vec<CoreMember>,
        /// Whether the intent changed the registry.
        changed: bool,
    },
}
