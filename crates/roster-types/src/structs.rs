//! Core entity structs: the event aggregate, registrations, and the result
//! payloads that flow back to the rendering collaborator.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::AuditAction;
use crate::ids::{EventId, ScopeId, SubjectId};

// ---------------------------------------------------------------------------
// Event kind and window
// ---------------------------------------------------------------------------

/// Which admission rules apply to an event.
///
/// Seasonal events carry a priority window during which only core
/// members may take a seat. Fields that only make sense for one kind live
/// inside that variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum EventKind {
    /// A regular session, open to everyone from creation.
    Standard,
    /// A session reserved for core members until `priority_cutoff`.
    Seasonal {
        /// Instant before which only core members may be admitted.
        priority_cutoff: DateTime<Utc>,
    },
}

impl EventKind {
    /// Return the priority cutoff for seasonal events.
    pub const fn priority_cutoff(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Standard => None,
            Self::Seasonal { priority_cutoff } => Some(*priority_cutoff),
        }
    }

    /// Whether this is a seasonal event.
    pub const fn is_seasonal(&self) -> bool {
        matches!(self, Self::Seasonal { .. })
    }
}

/// Scheduled time range of an event, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EventWindow {
    /// When the activity begins.
    pub start: DateTime<Utc>,
    /// When the activity ends. At or after this instant the event is expired.
    pub end: DateTime<Utc>,
}

impl EventWindow {
    /// Length of the window.
    pub fn duration(&self) -> TimeDelta {
        self.end.signed_duration_since(self.start)
    }
}

// ---------------------------------------------------------------------------
// Registrations
// ---------------------------------------------------------------------------

/// Seats held by one subject in one container (confirmed list or waitlist).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Registration {
    /// Who holds the seats.
    pub subject: SubjectId,
    /// Label supplied by the caller. Display only.
    pub display_name: String,
    /// Number of seats, always at least 1.
    pub quantity: u32,
    /// Set when the entry was seeded from the core membership registry.
    #[serde(default)]
    pub priority: bool,
}

impl Registration {
    /// Create a regular (non-priority) registration.
    pub fn new(subject: SubjectId, display_name: impl Into<String>, quantity: u32) -> Self {
        Self {
            subject,
            display_name: display_name.into(),
            quantity,
            priority: false,
        }
    }
}

/// Reminder bookkeeping for an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ReminderState {
    /// Whether the pre-start reminder has been dispatched.
    pub sent: bool,
    /// When it was dispatched.
    pub sent_at: Option<DateTime<Utc>>,
}

/// A member of the process-wide core membership registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CoreMember {
    /// The member's subject identifier.
    pub subject: SubjectId,
    /// Label used when the member is seeded into a seasonal event.
    pub display_name: String,
}

// ---------------------------------------------------------------------------
// Event aggregate
// ---------------------------------------------------------------------------

/// One instance of a capacity-limited group activity.
///
/// `participants` and `waitlist` are ordered by arrival; the waitlist is
/// strict FIFO for promotion. All mutation goes through the allocation
/// engine so the seat invariants hold after every operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Event {
    /// Immutable identifier.
    pub id: EventId,
    /// Conversation that owns the event.
    pub scope: ScopeId,
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
    /// Maximum confirmed seats.
    pub capacity: u32,
    /// Maximum waitlisted seats; `None` means unbounded.
    pub waitlist_capacity: Option<u32>,
    /// Minutes after `window.start` at which admissions stop.
    pub signup_cutoff_minutes: i64,
    /// Confirmed registrations in arrival order.
    pub participants: Vec<Registration>,
    /// Waiting registrations in FIFO order.
    pub waitlist: Vec<Registration>,
    /// Reminder bookkeeping.
    #[serde(default)]
    pub reminder: ReminderState,
    /// When the event was created.
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Total confirmed seats.
    pub fn participant_total(&self) -> u32 {
        total_quantity(&self.participants)
    }

    /// Total waitlisted seats.
    pub fn waitlist_total(&self) -> u32 {
        total_quantity(&self.waitlist)
    }

    /// Confirmed seats still free.
    pub fn available_seats(&self) -> u32 {
        self.capacity.saturating_sub(self.participant_total())
    }

    /// The subject's confirmed registration, if any.
    pub fn participant(&self, subject: &SubjectId) -> Option<&Registration> {
        self.participants.iter().find(|r| &r.subject == subject)
    }

    /// The subject's waitlist registration, if any.
    pub fn waitlisted(&self, subject: &SubjectId) -> Option<&Registration> {
        self.waitlist.iter().find(|r| &r.subject == subject)
    }

    /// Seats the subject holds across both containers.
    pub fn holding(&self, subject: &SubjectId) -> u32 {
        let main = self.participant(subject).map_or(0, |r| r.quantity);
        let wait = self.waitlisted(subject).map_or(0, |r| r.quantity);
        main.saturating_add(wait)
    }

    /// Instant at which new admissions stop.
    pub fn signup_cutoff(&self) -> DateTime<Utc> {
        TimeDelta::try_minutes(self.signup_cutoff_minutes)
            .and_then(|offset| self.window.start.checked_add_signed(offset))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// Sum of quantities in a container.
pub fn total_quantity(entries: &[Registration]) -> u32 {
    entries
        .iter()
        .fold(0_u32, |acc, r| acc.saturating_add(r.quantity))
}

// ---------------------------------------------------------------------------
// Operation results
// ---------------------------------------------------------------------------

/// Where the seats of an admit request ended up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AdmitResult {
    /// Seats added to the confirmed list.
    pub main_added: u32,
    /// Seats added to the waitlist.
    pub wait_added: u32,
    /// Seats that fit nowhere and were not stored.
    pub rejected: u32,
}

impl AdmitResult {
    /// Partial success: some seats were turned away for lack of room.
    pub const fn capacity_exceeded(&self) -> bool {
        self.rejected > 0
    }
}

/// Seats moved from the waitlist head into the confirmed list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Promotion {
    /// The promoted subject.
    pub subject: SubjectId,
    /// Seats moved.
    pub quantity: u32,
    /// Whether part of the subject's waitlist entry remains queued.
    pub partial: bool,
}

/// What a withdrawal released and whom it promoted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct WithdrawResult {
    /// Seats released from the subject's waitlist entry.
    pub from_waitlist: u32,
    /// Seats released from the subject's confirmed entry.
    pub from_main: u32,
    /// Promotions triggered by the freed capacity, in queue order.
    pub promoted: Vec<Promotion>,
}

impl WithdrawResult {
    /// Total seats released by the subject.
    pub const fn released(&self) -> u32 {
        self.from_waitlist.saturating_add(self.from_main)
    }
}

// ---------------------------------------------------------------------------
// Audit
// ---------------------------------------------------------------------------

/// A single entry on the write-only audit side channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AuditRecord {
    /// When the mutation was applied (the intent's `now`).
    pub at: DateTime<Utc>,
    /// Conversation scope, when the mutation concerns an event.
    pub scope: Option<ScopeId>,
    /// Affected event, if any.
    pub event_id: Option<EventId>,
    /// Acting or affected subject, if any.
    pub subject: Option<SubjectId>,
    /// What happened.
    pub action: AuditAction,
    /// Seats involved, when meaningful.
    pub quantity: Option<u32>,
}
