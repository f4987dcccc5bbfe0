//! Core membership registry.
//!
//! Core members are the regulars of a group: they are admitted during a
//! seasonal event's priority window and are seeded into every new seasonal
//! event. Registry order is insertion order, and seeding preserves it as
//! arrival order.

use roster_types::{CoreMember, Event, Registration, SubjectId, total_quantity};

/// Outcome of seeding a seasonal event from the registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// Members placed in the confirmed list.
    pub participants: u32,
    /// Members placed on the waitlist.
    pub waitlisted: u32,
    /// Members that fit in neither container.
    pub skipped: u32,
}

impl SeedReport {
    /// Members placed in either container.
    pub const fn seeded(&self) -> u32 {
        self.participants.saturating_add(self.waitlisted)
    }
}

/// Ordered set of subjects granted priority admission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoreMembershipRegistry {
    members: Vec<CoreMember>,
}

impl CoreMembershipRegistry {
    /// Create an empty registry.
    pub const fn new() -> Self {
        Self {
            members: Vec::new(),
        }
    }

    /// Build a registry from members in priority order. Later duplicates
    /// are ignored.
    pub fn from_members(members: impl IntoIterator<Item = CoreMember>) -> Self {
        let mut registry = Self::new();
        for member in members {
            registry.add(member.subject, member.display_name);
        }
        registry
    }

    /// Add a member at the end of the registry.
    ///
    /// Returns `false` if the subject was already a member. An existing
    /// member keeps its position; only the display name is refreshed.
    pub fn add(&mut self, subject: SubjectId, display_name: impl Into<String>) -> bool {
        let display_name = display_name.into();
        if let Some(existing) = self.members.iter_mut().find(|m| m.subject == subject) {
            existing.display_name = display_name;
            return false;
        }
        self.members.push(CoreMember {
            subject,
            display_name,
        });
        true
    }

    /// Remove a member. Returns `false` if the subject was not a member.
    pub fn remove(&mut self, subject: &SubjectId) -> bool {
        let before = self.members.len();
        self.members.retain(|m| &m.subject != subject);
        self.members.len() != before
    }

    /// Whether the subject holds priority status.
    pub fn is_member(&self, subject: &SubjectId) -> bool {
        self.members.iter().any(|m| &m.subject == subject)
    }

    /// Members in registry order.
    pub fn list(&self) -> &[CoreMember] {
        &self.members
    }

    /// Number of members.
    pub const fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the registry is empty.
    pub const fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Copy the current membership into a freshly created event.
    ///
    /// Each member gets one priority-tagged seat: confirmed while capacity
    /// lasts, then waitlisted while waitlist capacity lasts. Members that
    /// are already registered are left alone.
    pub fn seed(&self, event: &mut Event) -> SeedReport {
        let mut report = SeedReport::default();
        for member in &self.members {
            if event.holding(&member.subject) > 0 {
                continue;
            }
            let registration = Registration {
                subject: member.subject.clone(),
                display_name: member.display_name.clone(),
                quantity: 1,
                priority: true,
            };
            if total_quantity(&event.participants) < event.capacity {
                event.participants.push(registration);
                report.participants = report.participants.saturating_add(1);
            } else if event
                .waitlist_capacity
                .is_none_or(|cap| total_quantity(&event.waitlist) < cap)
            {
                event.waitlist.push(registration);
                report.waitlisted = report.waitlisted.saturating_add(1);
            } else {
                report.skipped = report.skipped.saturating_add(1);
            }
        }
        if report.skipped > 0 {
            tracing::warn!(
                event_id = %event.id,
                skipped = report.skipped,
                "Core members did not fit into seasonal event"
            );
        }
        report
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use chrono::{TimeDelta, TimeZone, Utc};
    use roster_types::{EventId, EventKind, EventWindow, ReminderState, ScopeId};

    use super::*;

    fn seasonal_event(capacity: u32, waitlist_capacity: Option<u32>) -> Event {
        let start = Utc.with_ymd_and_hms(2025, 9, 6, 10, 0, 0).single().unwrap();
        Event {
            id: EventId::new(),
            scope: ScopeId::new("group"),
            kind: EventKind::Seasonal {
                priority_cutoff: start - TimeDelta::days(2),
            },
            title: String::new(),
            location: String::new(),
            window: EventWindow {
                start,
                end: start + TimeDelta::hours(2),
            },
            capacity,
            waitlist_capacity,
            signup_cutoff_minutes: 120,
            participants: Vec::new(),
            waitlist: Vec::new(),
            reminder: ReminderState::default(),
            created_at: start - TimeDelta::days(7),
        }
    }

    fn registry_of(names: &[&str]) -> CoreMembershipRegistry {
        CoreMembershipRegistry::from_members(names.iter().map(|n| CoreMember {
            subject: SubjectId::new(*n),
            display_name: n.to_uppercase(),
        }))
    }

    #[test]
    fn add_remove_and_membership() {
        let mut registry = CoreMembershipRegistry::new();
        assert!(registry.add(SubjectId::new("a"), "A"));
        assert!(!registry.add(SubjectId::new("a"), "A2"));
        assert!(registry.is_member(&SubjectId::new("a")));
        assert_eq!(registry.list().first().unwrap().display_name, "A2");
        assert!(registry.remove(&SubjectId::new("a")));
        assert!(!registry.remove(&SubjectId::new("a")));
        assert!(registry.is_empty());
    }

    #[test]
    fn list_preserves_insertion_order() {
        let registry = registry_of(&["c", "a", "b"]);
        let order: Vec<&str> = registry.list().iter().map(|m| m.subject.as_str()).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }

    #[test]
    fn seed_fills_capacity_then_waitlist_then_skips() {
        let registry = registry_of(&["a", "b", "c", "d", "e"]);
        let mut event = seasonal_event(2, Some(2));
        let report = registry.seed(&mut event);

        assert_eq!(report.participants, 2);
        assert_eq!(report.waitlisted, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.seeded(), 4);

        let main: Vec<&str> = event.participants.iter().map(|r| r.subject.as_str()).collect();
        let wait: Vec<&str> = event.waitlist.iter().map(|r| r.subject.as_str()).collect();
        assert_eq!(main, vec!["a", "b"]);
        assert_eq!(wait, vec!["c", "d"]);
        assert!(event.participants.iter().all(|r| r.priority && r.quantity == 1));
    }

    #[test]
    fn seed_with_unbounded_waitlist_places_everyone() {
        let registry = registry_of(&["a", "b", "c"]);
        let mut event = seasonal_event(1, None);
        let report = registry.seed(&mut event);
        assert_eq!(report.participants, 1);
        assert_eq!(report.waitlisted, 2);
        assert_eq!(report.skipped, 0);
    }
}
