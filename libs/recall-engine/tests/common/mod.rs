//! Shared fixtures for the engine integration tests.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use recall_core::types::{SchedulingState, StudySession};
use recall_engine::scheduler::{ReviewSubmission, Scheduler};
use recall_engine::stats::Aggregator;
use recall_engine::store::{MemoryStore, SessionStore, StateStore};

/// A scheduler and aggregator sharing one in-memory store.
pub fn engine() -> (Arc<MemoryStore>, Scheduler<MemoryStore>, Aggregator<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let scheduler = Scheduler::new(Arc::clone(&store));
    let aggregator = Aggregator::new(Arc::clone(&store));
    (store, scheduler, aggregator)
}

pub fn submission(card_id: i64, rating: u8) -> ReviewSubmission {
    ReviewSubmission {
        card_id,
        rating,
        response_time_ms: 3000,
        session_id: None,
        topic: None,
    }
}

/// Seed a scheduling state due at `due` with the given mastery level.
pub fn seed_state(
    store: &MemoryStore,
    learner_id: Uuid,
    card_id: i64,
    due: DateTime<Utc>,
    mastery_level: u8,
) {
    let state = SchedulingState {
        next_review_date: due,
        mastery_level,
        total_reviews: 1,
        correct_reviews: 1,
        ..SchedulingState::new(due)
    };
    store.save_state(learner_id, card_id, &state).unwrap();
}

/// Seed a study session started `days_ago` calendar days before `now`.
pub fn seed_session(store: &MemoryStore, learner_id: Uuid, now: DateTime<Utc>, days_ago: i64) {
    let session = StudySession::start(learner_id, now - Duration::days(days_ago));
    store.insert_session(&session).unwrap();
}
