//! Structural invariants of an event aggregate.
//!
//! Every mutation in [`crate::allocation`] preserves these by
//! construction. The store runs [`verify`] after each transaction so a
//! corrupted record loaded from persistence is caught before it is
//! written back.
//!
//! ```text
//! sum(participants.quantity) <= capacity
//! sum(waitlist.quantity)     <= waitlist_capacity      (when bounded)
//! waitlist non-empty         =>  participants full
//! every quantity             >= 1
//! one entry per subject per container
//! ```

use std::collections::BTreeSet;

use roster_types::{Event, Registration, SubjectId};

/// Which container a violation was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    /// Confirmed seats.
    Participants,
    /// Overflow queue.
    Waitlist,
}

/// A single broken invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// Confirmed seats exceed capacity.
    OverCapacity {
        /// Seats held.
        total: u32,
        /// Event capacity.
        capacity: u32,
    },
    /// Waitlisted seats exceed the waitlist bound.
    WaitlistOverCapacity {
        /// Seats queued.
        total: u32,
        /// Waitlist capacity.
        capacity: u32,
    },
    /// Someone is waiting while confirmed seats sit free.
    IdleSeats {
        /// Free confirmed seats.
        free: u32,
        /// Seats queued on the waitlist.
        waiting: u32,
    },
    /// An entry with a quantity of zero.
    EmptyEntry {
        /// Where the entry lives.
        container: Container,
        /// Its subject.
        subject: SubjectId,
    },
    /// Two entries for one subject in the same container.
    DuplicateSubject {
        /// Where the duplicates live.
        container: Container,
        /// The repeated subject.
        subject: SubjectId,
    },
}

/// Result of checking an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantResult {
    /// Every invariant holds.
    Holds,
    /// At least one invariant is broken.
    Violated(Vec<InvariantViolation>),
}

impl InvariantResult {
    /// Whether every invariant holds.
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Holds)
    }
}

/// Check every structural invariant of `event`.
pub fn verify(event: &Event) -> InvariantResult {
    let mut violations = Vec::new();

    let main = event.participant_total();
    let waiting = event.waitlist_total();

    if main > event.capacity {
        violations.push(InvariantViolation::OverCapacity {
            total: main,
            capacity: event.capacity,
        });
    }
    if let Some(capacity) = event.waitlist_capacity
        && waiting > capacity
    {
        violations.push(InvariantViolation::WaitlistOverCapacity {
            total: waiting,
            capacity,
        });
    }
    if waiting > 0 && main < event.capacity {
        violations.push(InvariantViolation::IdleSeats {
            free: event.capacity.saturating_sub(main),
            waiting,
        });
    }

    check_entries(&event.participants, Container::Participants, &mut violations);
    check_entries(&event.waitlist, Container::Waitlist, &mut violations);

    if violations.is_empty() {
        InvariantResult::Holds
    } else {
        InvariantResult::Violated(violations)
    }
}

fn check_entries(
    entries: &[Registration],
    container: Container,
    violations: &mut Vec<InvariantViolation>,
) {
    let mut seen = BTreeSet::new();
    for entry in entries {
        if entry.quantity == 0 {
            violations.push(InvariantViolation::EmptyEntry {
                container,
                subject: entry.subject.clone(),
            });
        }
        if !seen.insert(entry.subject.as_str()) {
            violations.push(InvariantViolation::DuplicateSubject {
                container,
                subject: entry.subject.clone(),
            });
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use chrono::{TimeDelta, TimeZone, Utc};
    use roster_types::{EventId, EventKind, EventWindow, ReminderState, ScopeId};

    use super::*;

    fn reg(subject: &str, quantity: u32) -> Registration {
        Registration::new(SubjectId::new(subject), subject, quantity)
    }

    fn event(participants: Vec<Registration>, waitlist: Vec<Registration>) -> Event {
        let start = Utc.with_ymd_and_hms(2025, 9, 6, 10, 0, 0).single().unwrap();
        Event {
            id: EventId::new(),
            scope: ScopeId::new("group"),
            kind: EventKind::Standard,
            title: String::new(),
            location: String::new(),
            window: EventWindow {
                start,
                end: start + TimeDelta::hours(2),
            },
            capacity: 3,
            waitlist_capacity: Some(2),
            signup_cutoff_minutes: 120,
            participants,
            waitlist,
            reminder: ReminderState::default(),
            created_at: start,
        }
    }

    fn violations(e: &Event) -> Vec<InvariantViolation> {
        match verify(e) {
            InvariantResult::Holds => Vec::new(),
            InvariantResult::Violated(found) => found,
        }
    }

    #[test]
    fn consistent_event_holds() {
        let e = event(vec![reg("a", 2), reg("b", 1)], vec![reg("b", 2)]);
        assert_eq!(verify(&e), InvariantResult::Holds);
    }

    #[test]
    fn detects_capacity_breaches() {
        let e = event(vec![reg("a", 4)], vec![reg("b", 3)]);
        let found = violations(&e);
        assert!(found.contains(&InvariantViolation::OverCapacity {
            total: 4,
            capacity: 3
        }));
        assert!(found.contains(&InvariantViolation::WaitlistOverCapacity {
            total: 3,
            capacity: 2
        }));
    }

    #[test]
    fn detects_idle_seats_and_bad_entries() {
        let e = event(vec![reg("a", 1), reg("a", 0)], vec![reg("c", 1)]);
        let found = violations(&e);
        assert!(found.contains(&InvariantViolation::IdleSeats {
            free: 2,
            waiting: 1
        }));
        assert!(found.contains(&InvariantViolation::EmptyEntry {
            container: Container::Participants,
            subject: SubjectId::new("a"),
        }));
        assert!(found.contains(&InvariantViolation::DuplicateSubject {
            container: Container::Participants,
            subject: SubjectId::new("a"),
        }));
    }
}
