//! Process-local repository.
//!
//! Clones share the same underlying maps, so two [`EventStore`]s built
//! over clones of one [`MemoryRepository`] behave like two processes
//! sharing a database: their per-event locks are independent and only the
//! version check keeps them honest.
//!
//! [`EventStore`]: crate::EventStore

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use roster_types::{CoreMember, Event, EventId, ScopeId, SubjectId};

use crate::error::DbError;
use crate::repository::{SaveOutcome, Versioned};

#[derive(Debug, Default)]
struct MemoryState {
    events: BTreeMap<EventId, Versioned<Event>>,
    members: Vec<CoreMember>,
}

/// In-memory repository backed by `BTreeMap`s behind a shared lock.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn insert(&self, event: &Event) -> Result<u64, DbError> {
        let mut state = self.state.write().await;
        if state.events.contains_key(&event.id) {
            return Err(DbError::Duplicate(event.id));
        }
        state.events.insert(
            event.id,
            Versioned {
                value: event.clone(),
                version: 1,
            },
        );
        Ok(1)
    }

    pub(crate) async fn load(&self, id: EventId) -> Result<Option<Versioned<Event>>, DbError> {
        Ok(self.state.read().await.events.get(&id).cloned())
    }

    pub(crate) async fn save(&self, event: &Event, expected: u64) -> Result<SaveOutcome, DbError> {
        let mut state = self.state.write().await;
        let Some(current) = state.events.get_mut(&event.id) else {
            return Ok(SaveOutcome::Stale);
        };
        if current.version != expected {
            return Ok(SaveOutcome::Stale);
        }
        current.value = event.clone();
        current.version = expected.saturating_add(1);
        Ok(SaveOutcome::Committed(current.version))
    }

    pub(crate) async fn delete(&self, id: EventId) -> Result<bool, DbError> {
        Ok(self.state.write().await.events.remove(&id).is_some())
    }

    pub(crate) async fn list_scope(&self, scope: &ScopeId) -> Result<Vec<Event>, DbError> {
        let state = self.state.read().await;
        Ok(state
            .events
            .values()
            .filter(|v| &v.value.scope == scope)
            .map(|v| v.value.clone())
            .collect())
    }

    pub(crate) async fn list_active(&self, now: DateTime<Utc>) -> Result<Vec<Event>, DbError> {
        let state = self.state.read().await;
        Ok(state
            .events
            .values()
            .filter(|v| v.value.window.end > now)
            .map(|v| v.value.clone())
            .collect())
    }

    pub(crate) async fn list_members(&self) -> Result<Vec<CoreMember>, DbError> {
        Ok(self.state.read().await.members.clone())
    }

    pub(crate) async fn add_member(&self, member: &CoreMember) -> Result<bool, DbError> {
        let mut state = self.state.write().await;
        if let Some(existing) = state
            .members
            .iter_mut()
            .find(|m| m.subject == member.subject)
        {
            existing.display_name.clone_from(&member.display_name);
            return Ok(false);
        }
        state.members.push(member.clone());
        Ok(true)
    }

    pub(crate) async fn remove_member(&self, subject: &SubjectId) -> Result<bool, DbError> {
        let mut state = self.state.write().await;
        let before = state.members.len();
        state.members.retain(|m| &m.subject != subject);
        Ok(state.members.len() != before)
    }
}
