//! Resolving an [`EventSelector`] against the events of one scope.

use chrono::{DateTime, FixedOffset, Utc};

use roster_types::{Event, EventId, EventSelector};

use crate::error::RosterError;
use crate::lifecycle;

/// Non-expired events, earliest start first, ties broken by id.
pub fn open_events(events: &[Event], now: DateTime<Utc>) -> Vec<&Event> {
    let mut open: Vec<&Event> = events
        .iter()
        .filter(|event| lifecycle::is_open(event, now))
        .collect();
    open.sort_by(|a, b| {
        a.window
            .start
            .cmp(&b.window.start)
            .then_with(|| a.id.cmp(&b.id))
    });
    open
}

/// Pick the event an intent targets.
///
/// `events` must already be restricted to the intent's scope. Date
/// selectors compare the start date as seen in `offset`.
///
/// # Errors
///
/// - [`RosterError::EventNotFound`] if nothing matches.
/// - [`RosterError::AmbiguousSelector`] if `SingleOpen` finds several
///   open events.
pub fn resolve(
    events: &[Event],
    selector: &EventSelector,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> Result<EventId, RosterError> {
    match selector {
        EventSelector::Id(id) => events
            .iter()
            .find(|event| event.id == *id)
            .map(|event| event.id)
            .ok_or(RosterError::EventNotFound),
        EventSelector::Date(date) => open_events(events, now)
            .into_iter()
            .find(|event| event.window.start.with_timezone(&offset).date_naive() == *date)
            .map(|event| event.id)
            .ok_or(RosterError::EventNotFound),
        EventSelector::SingleOpen => match open_events(events, now).as_slice() {
            [] => Err(RosterError::EventNotFound),
            [only] => Ok(only.id),
            several => Err(RosterError::AmbiguousSelector {
                candidates: several.iter().map(|event| event.id).collect(),
            }),
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use chrono::{NaiveDate, TimeDelta, TimeZone};
    use roster_types::{EventKind, EventWindow, ReminderState, ScopeId};

    use super::*;
    use crate::render::offset_from_minutes;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, day, hour, 0, 0).single().unwrap()
    }

    fn event(start: DateTime<Utc>) -> Event {
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
            capacity: 8,
            waitlist_capacity: None,
            signup_cutoff_minutes: 120,
            participants: Vec::new(),
            waitlist: Vec::new(),
            reminder: ReminderState::default(),
            created_at: start - TimeDelta::days(7),
        }
    }

    #[test]
    fn open_events_skip_expired_and_sort_by_start() {
        let past = event(at(1, 10));
        let later = event(at(13, 10));
        let sooner = event(at(6, 10));
        let events = vec![past, later.clone(), sooner.clone()];
        let open = open_events(&events, at(3, 0));
        let ids: Vec<EventId> = open.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![sooner.id, later.id]);
    }

    #[test]
    fn single_open_requires_exactly_one() {
        let now = at(3, 0);
        assert_eq!(
            resolve(&[], &EventSelector::SingleOpen, now, offset_from_minutes(0)),
            Err(RosterError::EventNotFound)
        );

        let one = event(at(6, 10));
        assert_eq!(
            resolve(&[one.clone()], &EventSelector::SingleOpen, now, offset_from_minutes(0)),
            Ok(one.id)
        );

        let two = event(at(13, 10));
        let err = resolve(
            &[two.clone(), one.clone()],
            &EventSelector::SingleOpen,
            now,
            offset_from_minutes(0),
        )
        .unwrap_err();
        assert_eq!(
            err,
            RosterError::AmbiguousSelector {
                candidates: vec![one.id, two.id]
            }
        );
    }

    #[test]
    fn date_selector_uses_local_offset() {
        // 20:00 UTC on the 5th is 04:00 on the 6th at +08:00.
        let e = event(at(5, 20));
        let now = at(3, 0);
        let sixth = EventSelector::Date(NaiveDate::from_ymd_opt(2025, 9, 6).unwrap());
        let fifth = EventSelector::Date(NaiveDate::from_ymd_opt(2025, 9, 5).unwrap());

        assert_eq!(resolve(&[e.clone()], &sixth, now, offset_from_minutes(480)), Ok(e.id));
        assert_eq!(
            resolve(&[e.clone()], &fifth, now, offset_from_minutes(480)),
            Err(RosterError::EventNotFound)
        );
        assert_eq!(resolve(&[e.clone()], &fifth, now, offset_from_minutes(0)), Ok(e.id));
    }

    #[test]
    fn date_selector_ignores_expired_events() {
        let e = event(at(6, 10));
        let date = EventSelector::Date(NaiveDate::from_ymd_opt(2025, 9, 6).unwrap());
        assert_eq!(
            resolve(&[e], &date, at(6, 13), offset_from_minutes(0)),
            Err(RosterError::EventNotFound)
        );
    }

    #[test]
    fn id_selector_finds_even_expired_events() {
        let e = event(at(1, 10));
        assert_eq!(
            resolve(&[e.clone()], &EventSelector::Id(e.id), at(6, 0), offset_from_minutes(0)),
            Ok(e.id)
        );
        assert_eq!(
            resolve(&[e], &EventSelector::Id(EventId::new()), at(6, 0), offset_from_minutes(0)),
            Err(RosterError::EventNotFound)
        );
    }
}
