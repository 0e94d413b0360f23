//! Storage traits and the in-memory reference store.
//!
//! The engine depends on read-then-write semantics only; it does not
//! prescribe a storage engine. `MemoryStore` is the single-instance
//! reference implementation and the fixture for tests; a database-backed
//! store implements the same traits.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use recall_core::types::{ReviewEvent, SchedulingState, StudySession};

type Result<T> = std::result::Result<T, StoreError>;

/// Errors from a storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("store lock poisoned")]
    Poisoned,
}

/// Scheduling state per learner-and-item pair.
pub trait StateStore: Send + Sync {
    fn get_state(&self, learner_id: Uuid, card_id: i64) -> Result<Option<SchedulingState>>;
    fn save_state(&self, learner_id: Uuid, card_id: i64, state: &SchedulingState) -> Result<()>;
    fn list_states(&self, learner_id: Uuid) -> Result<Vec<(i64, SchedulingState)>>;
    /// States with `from < next_review_date <= to`.
    fn due_between(
        &self,
        learner_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<(i64, SchedulingState)>>;
}

/// Append-only review event log.
pub trait ReviewStore: Send + Sync {
    fn append_event(&self, event: &ReviewEvent) -> Result<()>;
    fn events_for(&self, learner_id: Uuid) -> Result<Vec<ReviewEvent>>;
}

/// Study session rows.
pub trait SessionStore: Send + Sync {
    fn insert_session(&self, session: &StudySession) -> Result<()>;
    fn update_session(&self, session: &StudySession) -> Result<()>;
    fn get_session(&self, id: Uuid) -> Result<Option<StudySession>>;
    fn sessions_for(&self, learner_id: Uuid) -> Result<Vec<StudySession>>;
}

/// In-memory store backing all three traits.
#[derive(Default)]
pub struct MemoryStore {
    states: Mutex<HashMap<(Uuid, i64), SchedulingState>>,
    events: Mutex<Vec<ReviewEvent>>,
    sessions: Mutex<HashMap<Uuid, StudySession>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn get_state(&self, learner_id: Uuid, card_id: i64) -> Result<Option<SchedulingState>> {
        let states = self.states.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(states.get(&(learner_id, card_id)).cloned())
    }

    fn save_state(&self, learner_id: Uuid, card_id: i64, state: &SchedulingState) -> Result<()> {
        let mut states = self.states.lock().map_err(|_| StoreError::Poisoned)?;
        states.insert((learner_id, card_id), state.clone());
        Ok(())
    }

    fn list_states(&self, learner_id: Uuid) -> Result<Vec<(i64, SchedulingState)>> {
        let states = self.states.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(states
            .iter()
            .filter(|((learner, _), _)| *learner == learner_id)
            .map(|((_, card), state)| (*card, state.clone()))
            .collect())
    }

    fn due_between(
        &self,
        learner_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<(i64, SchedulingState)>> {
        let states = self.states.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(states
            .iter()
            .filter(|((learner, _), state)| {
                *learner == learner_id
                    && state.next_review_date > from
                    && state.next_review_date <= to
            })
            .map(|((_, card), state)| (*card, state.clone()))
            .collect())
    }
}

impl ReviewStore for MemoryStore {
    fn append_event(&self, event: &ReviewEvent) -> Result<()> {
        let mut events = self.events.lock().map_err(|_| StoreError::Poisoned)?;
        events.push(event.clone());
        Ok(())
    }

    fn events_for(&self, learner_id: Uuid) -> Result<Vec<ReviewEvent>> {
        let events = self.events.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(events
            .iter()
            .filter(|e| e.learner_id == learner_id)
            .cloned()
            .collect())
    }
}

impl SessionStore for MemoryStore {
    fn insert_session(&self, session: &StudySession) -> Result<()> {
        let mut sessions = self.sessions.lock().map_err(|_| StoreError::Poisoned)?;
        sessions.insert(session.id, session.clone());
        Ok(())
    }

    fn update_session(&self, session: &StudySession) -> Result<()> {
        let mut sessions = self.sessions.lock().map_err(|_| StoreError::Poisoned)?;
        match sessions.get_mut(&session.id) {
            Some(existing) => {
                *existing = session.clone();
                Ok(())
            }
            None => Err(StoreError::Backend(format!(
                "session {} does not exist",
                session.id
            ))),
        }
    }

    fn get_session(&self, id: Uuid) -> Result<Option<StudySession>> {
        let sessions = self.sessions.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(sessions.get(&id).cloned())
    }

    fn sessions_for(&self, learner_id: Uuid) -> Result<Vec<StudySession>> {
        let sessions = self.sessions.lock().map_err(|_| StoreError::Poisoned)?;
        let mut rows: Vec<StudySession> = sessions
            .values()
            .filter(|s| s.learner_id == learner_id)
            .cloned()
            .collect();
        rows.sort_by_key(|s| s.started_at);
        Ok(rows)
    }
}
