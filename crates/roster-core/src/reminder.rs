//! When a reminder is owed.
//!
//! A reminder fires once per event, in the window between `lead` before
//! the start and the start itself. Dispatch and the sent flag live in the
//! store's scheduler; this module only answers "is it due".

use chrono::{DateTime, TimeDelta, Utc};

use roster_types::{Event, EventStatus};

use crate::lifecycle;

/// Whether `event` should be reminded at `now`.
///
/// Due when the reminder has not been sent, the event has not expired,
/// and `0 < start - now <= lead_minutes`.
pub fn reminder_due(event: &Event, now: DateTime<Utc>, lead_minutes: i64) -> bool {
    if event.reminder.sent || lifecycle::status_of(event, now) == EventStatus::Expired {
        return false;
    }
    let Some(lead) = TimeDelta::try_minutes(lead_minutes) else {
        return false;
    };
    let until_start = event.window.start.signed_duration_since(now);
    until_start > TimeDelta::zero() && until_start <= lead
}

/// Record a successful dispatch.
pub const fn mark_sent(event: &mut Event, at: DateTime<Utc>) {
    event.reminder.sent = true;
    event.reminder.sent_at = Some(at);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use chrono::TimeZone;
    use roster_types::{EventId, EventKind, EventWindow, ReminderState, ScopeId};

    use super::*;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 6, 10, 0, 0).single().unwrap()
    }

    fn event() -> Event {
        Event {
            id: EventId::new(),
            scope: ScopeId::new("group"),
            kind: EventKind::Standard,
            title: String::new(),
            location: String::new(),
            window: EventWindow {
                start: start(),
                end: start() + TimeDelta::hours(2),
            },
            capacity: 8,
            waitlist_capacity: None,
            signup_cutoff_minutes: 120,
            participants: Vec::new(),
            waitlist: Vec::new(),
            reminder: ReminderState::default(),
            created_at: start() - TimeDelta::days(1),
        }
    }

    #[test]
    fn due_only_inside_lead_window() {
        let e = event();
        assert!(!reminder_due(&e, start() - TimeDelta::minutes(61), 60));
        assert!(reminder_due(&e, start() - TimeDelta::minutes(60), 60));
        assert!(reminder_due(&e, start() - TimeDelta::minutes(1), 60));
        assert!(!reminder_due(&e, start(), 60));
        assert!(!reminder_due(&e, start() + TimeDelta::minutes(5), 60));
    }

    #[test]
    fn not_due_after_sent() {
        let mut e = event();
        let now = start() - TimeDelta::minutes(30);
        mark_sent(&mut e, now);
        assert!(!reminder_due(&e, now, 60));
        assert_eq!(e.reminder.sent_at, Some(now));
    }
}
