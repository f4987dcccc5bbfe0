//! Time-driven lifecycle of an event.
//!
//! Status is never stored. It is derived from the event's window, kind,
//! signup cutoff, and the instant the question is asked:
//!
//! ```text
//!   created ── PriorityOnly ──┬── Open ── SignupClosed ── Expired
//!   (seasonal, until cutoff)  │
//!   created ──────────────────┘
//! ```
//!
//! `Expired` is checked first and is terminal. A seasonal event stays
//! `PriorityOnly` until its priority cutoff even if its signup cutoff has
//! already passed.

use chrono::{DateTime, Utc};

use roster_types::{Event, EventStatus, SubjectId};

use crate::error::RosterError;
use crate::membership::CoreMembershipRegistry;

/// Compute the event's status at `now`.
pub fn status_of(event: &Event, now: DateTime<Utc>) -> EventStatus {
    if now >= event.window.end {
        return EventStatus::Expired;
    }
    if event
        .kind
        .priority_cutoff()
        .is_some_and(|cutoff| now < cutoff)
    {
        return EventStatus::PriorityOnly;
    }
    if now >= event.signup_cutoff() {
        return EventStatus::SignupClosed;
    }
    EventStatus::Open
}

/// Whether the event still shows up in "open" listings and selectors.
pub fn is_open(event: &Event, now: DateTime<Utc>) -> bool {
    status_of(event, now) != EventStatus::Expired
}

/// Gate an admission request.
///
/// Returns the status the admission was evaluated under.
///
/// # Errors
///
/// - [`RosterError::EventExpired`] once the window has ended.
/// - [`RosterError::SignupWindowClosed`] past the signup cutoff.
/// - [`RosterError::PriorityWindowActive`] for non-members during a
///   seasonal priority window.
pub fn check_admission(
    event: &Event,
    subject: &SubjectId,
    now: DateTime<Utc>,
    registry: &CoreMembershipRegistry,
) -> Result<EventStatus, RosterError> {
    match status_of(event, now) {
        EventStatus::Expired => Err(RosterError::EventExpired),
        EventStatus::SignupClosed => Err(RosterError::SignupWindowClosed),
        EventStatus::PriorityOnly if !registry.is_member(subject) => {
            Err(RosterError::PriorityWindowActive)
        }
        status @ (EventStatus::PriorityOnly | EventStatus::Open) => Ok(status),
    }
}

/// Whether `subject` may be admitted at `now`.
pub fn can_admit(
    event: &Event,
    subject: &SubjectId,
    now: DateTime<Utc>,
    registry: &CoreMembershipRegistry,
) -> bool {
    check_admission(event, subject, now, registry).is_ok()
}

/// Gate a withdrawal request. Withdrawals are allowed in every status
/// except `Expired`.
///
/// # Errors
///
/// Returns [`RosterError::EventExpired`] once the window has ended.
pub fn check_withdrawal(event: &Event, now: DateTime<Utc>) -> Result<EventStatus, RosterError> {
    match status_of(event, now) {
        EventStatus::Expired => Err(RosterError::EventExpired),
        status => Ok(status),
    }
}
