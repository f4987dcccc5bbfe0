//! Turning an [`EventDraft`] into a stored [`Event`].

use chrono::{DateTime, Utc};

use roster_types::{Event, EventDraft, EventId, EventKind, ReminderState, ScopeId};

use crate::config::PolicyConfig;
use crate::error::RosterError;
use crate::membership::{CoreMembershipRegistry, SeedReport};

/// Validate a draft, fill in policy defaults, and seed core members into
/// seasonal events.
///
/// An omitted signup cutoff keeps signup open until the window ends.
///
/// # Errors
///
/// - [`RosterError::InvalidEvent`] if the window is empty or inverted, a
///   capacity is zero, or a seasonal priority cutoff is not before the end.
/// - [`RosterError::EventExpired`] if the window has already ended at `now`.
pub fn build_event(
    draft: EventDraft,
    scope: ScopeId,
    now: DateTime<Utc>,
    policy: &PolicyConfig,
    registry: &CoreMembershipRegistry,
) -> Result<(Event, SeedReport), RosterError> {
    validate_draft(&draft, policy)?;
    if now >= draft.window.end {
        return Err(RosterError::EventExpired);
    }

    let signup_cutoff_minutes = draft
        .signup_cutoff_minutes
        .or(policy.default_signup_cutoff_minutes)
        .unwrap_or_else(|| draft.window.duration().num_minutes());

    let mut event = Event {
        id: EventId::new(),
        scope,
        kind: draft.kind,
        title: draft.title,
        location: draft.location,
        window: draft.window,
        capacity: draft.capacity.unwrap_or(policy.default_capacity),
        waitlist_capacity: draft.waitlist_capacity.or(policy.default_waitlist_capacity),
        signup_cutoff_minutes,
        participants: Vec::new(),
        waitlist: Vec::new(),
        reminder: ReminderState::default(),
        created_at: now,
    };

    let report = if event.kind.is_seasonal() {
        registry.seed(&mut event)
    } else {
        SeedReport::default()
    };
    Ok((event, report))
}

/// Check a draft without building it.
///
/// # Errors
///
/// Returns [`RosterError::InvalidEvent`] naming the first problem found.
pub fn validate_draft(draft: &EventDraft, policy: &PolicyConfig) -> Result<(), RosterError> {
    let invalid = |reason: &str| {
        Err(RosterError::InvalidEvent {
            reason: reason.to_owned(),
        })
    };
    if draft.window.start >= draft.window.end {
        return invalid("window start must be before its end");
    }
    if draft.capacity.unwrap_or(policy.default_capacity) == 0 {
        return invalid("capacity must be at least 1");
    }
    if draft
        .waitlist_capacity
        .or(policy.default_waitlist_capacity)
        == Some(0)
    {
        return invalid("waitlist capacity must be at least 1 when set");
    }
    if let EventKind::Seasonal { priority_cutoff } = draft.kind
        && priority_cutoff >= draft.window.end
    {
        return invalid("priority cutoff must be before the event ends");
    }
    Ok(())
}

/// Bring a requested quantity into `1..=max`.
///
/// # Errors
///
/// Returns [`RosterError::InvalidQuantity`] for zero.
pub fn clamp_quantity(n: u32, max: u32) -> Result<u32, RosterError> {
    if n == 0 {
        return Err(RosterError::InvalidQuantity);
    }
    Ok(n.min(max.max(1)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use chrono::{TimeDelta, TimeZone};
    use roster_types::{CoreMember, EventWindow, SubjectId};

    use super::*;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 6, 10, 0, 0).single().unwrap()
    }

    fn draft() -> EventDraft {
        EventDraft {
            kind: EventKind::Standard,
            title: String::from("Weekend badminton"),
            location: String::from("Daan Sports Center"),
            window: EventWindow {
                start: start(),
                end: start() + TimeDelta::hours(2),
            },
            capacity: None,
            waitlist_capacity: None,
            signup_cutoff_minutes: None,
        }
    }

    fn now() -> DateTime<Utc> {
        start() - TimeDelta::days(2)
    }

    #[test]
    fn defaults_come_from_policy() {
        let policy = PolicyConfig::default();
        let (event, report) = build_event(
            draft(),
            ScopeId::new("group"),
            now(),
            &policy,
            &CoreMembershipRegistry::new(),
        )
        .unwrap();
        assert_eq!(event.capacity, 8);
        assert_eq!(event.waitlist_capacity, None);
        assert_eq!(event.signup_cutoff_minutes, 120);
        assert_eq!(event.signup_cutoff(), event.window.end);
        assert_eq!(event.created_at, now());
        assert_eq!(report.seeded(), 0);
    }

    #[test]
    fn seasonal_event_is_seeded() {
        let mut d = draft();
        d.kind = EventKind::Seasonal {
            priority_cutoff: start() - TimeDelta::days(1),
        };
        d.capacity = Some(1);
        let registry = CoreMembershipRegistry::from_members(["a", "b"].map(|s| CoreMember {
            subject: SubjectId::new(s),
            display_name: s.to_owned(),
        }));
        let (event, report) =
            build_event(d, ScopeId::new("group"), now(), &PolicyConfig::default(), &registry)
                .unwrap();
        assert_eq!(report.participants, 1);
        assert_eq!(report.waitlisted, 1);
        assert_eq!(event.participant_total(), 1);
        assert_eq!(event.waitlist_total(), 1);
    }

    #[test]
    fn standard_event_is_not_seeded() {
        let registry = CoreMembershipRegistry::from_members([CoreMember {
            subject: SubjectId::new("a"),
            display_name: String::from("A"),
        }]);
        let (event, _) = build_event(
            draft(),
            ScopeId::new("group"),
            now(),
            &PolicyConfig::default(),
            &registry,
        )
        .unwrap();
        assert!(event.participants.is_empty());
    }

    #[test]
    fn rejects_bad_drafts() {
        let policy = PolicyConfig::default();

        let mut inverted = draft();
        inverted.window.end = inverted.window.start;
        assert!(matches!(
            validate_draft(&inverted, &policy),
            Err(RosterError::InvalidEvent { .. })
        ));

        let mut zero = draft();
        zero.capacity = Some(0);
        assert!(validate_draft(&zero, &policy).is_err());

        let mut zero_wait = draft();
        zero_wait.waitlist_capacity = Some(0);
        assert!(validate_draft(&zero_wait, &policy).is_err());

        let mut late_cutoff = draft();
        late_cutoff.kind = EventKind::Seasonal {
            priority_cutoff: start() + TimeDelta::hours(3),
        };
        assert!(validate_draft(&late_cutoff, &policy).is_err());
    }

    #[test]
    fn elapsed_window_is_expired() {
        let result = build_event(
            draft(),
            ScopeId::new("group"),
            start() + TimeDelta::hours(2),
            &PolicyConfig::default(),
            &CoreMembershipRegistry::new(),
        );
        assert_eq!(result.unwrap_err(), RosterError::EventExpired);
    }

    #[test]
    fn quantities_are_clamped() {
        assert_eq!(clamp_quantity(0, 10), Err(RosterError::InvalidQuantity));
        assert_eq!(clamp_quantity(3, 10), Ok(3));
        assert_eq!(clamp_quantity(25, 10), Ok(10));
    }
}
