//! Review submission service and study session lifecycle.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::error::{EngineError, Result};
use crate::store::{ReviewStore, SessionStore, StateStore};
use recall_core::algorithm::{SchedulingAlgorithm, SchedulingResult, Sm2Variant};
use recall_core::error::ReviewError;
use recall_core::types::{Rating, ReviewEvent, StudySession};

/// One submitted review, as received from the presentation layer.
///
/// `rating` is the raw 0-5 grade; it is validated here, at the boundary,
/// so the algorithm never sees an invalid value.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewSubmission {
    pub card_id: i64,
    pub rating: u8,
    pub response_time_ms: u32,
    #[serde(default)]
    pub session_id: Option<Uuid>,
    #[serde(default)]
    pub topic: Option<String>,
}

/// Applies reviews: loads the item's state (or creates the default for a
/// first review), runs the scheduling algorithm, persists the new state
/// and appends the review event.
///
/// Holds no locks of its own; serializing concurrent submissions for the
/// same learner-and-item pair is the storage layer's transactional
/// responsibility.
pub struct Scheduler<S> {
    store: Arc<S>,
    algorithm: Box<dyn SchedulingAlgorithm>,
}

impl<S> Scheduler<S>
where
    S: StateStore + ReviewStore + SessionStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self::with_algorithm(store, Box::new(Sm2Variant::default()))
    }

    pub fn with_algorithm(store: Arc<S>, algorithm: Box<dyn SchedulingAlgorithm>) -> Self {
        Self { store, algorithm }
    }

    /// Submit a review. Storage failures propagate: a silently dropped
    /// review would desynchronize the learner's schedule.
    pub fn submit_review(
        &self,
        learner_id: Uuid,
        submission: ReviewSubmission,
    ) -> Result<SchedulingResult> {
        self.submit_review_at(learner_id, submission, Utc::now())
    }

    pub fn submit_review_at(
        &self,
        learner_id: Uuid,
        submission: ReviewSubmission,
        now: DateTime<Utc>,
    ) -> Result<SchedulingResult> {
        if learner_id.is_nil() {
            return Err(EngineError::Review(ReviewError::MissingLearner));
        }
        let rating = Rating::from_value(submission.rating)?;

        // First review of an item is the expected case, not an error.
        let current = match self.store.get_state(learner_id, submission.card_id)? {
            Some(state) => state,
            None => self.algorithm.initial_state(now),
        };

        let mut result = self.algorithm.schedule(&current, rating, now);
        result
            .new_state
            .record_response_time(submission.response_time_ms);

        self.store
            .save_state(learner_id, submission.card_id, &result.new_state)?;

        let event = ReviewEvent {
            id: Uuid::new_v4(),
            learner_id,
            card_id: submission.card_id,
            rating,
            response_time_ms: submission.response_time_ms,
            reviewed_at: now,
            session_id: submission.session_id,
            topic: submission.topic,
        };
        self.store.append_event(&event)?;

        debug!(
            %learner_id,
            card_id = submission.card_id,
            rating = submission.rating,
            interval_days = result.new_state.interval_days,
            repetitions = result.new_state.repetitions,
            "review applied"
        );
        Ok(result)
    }

    /// Open a study session.
    pub fn start_session(&self, learner_id: Uuid) -> Result<StudySession> {
        self.start_session_at(learner_id, Utc::now())
    }

    pub fn start_session_at(&self, learner_id: Uuid, now: DateTime<Utc>) -> Result<StudySession> {
        if learner_id.is_nil() {
            return Err(EngineError::Review(ReviewError::MissingLearner));
        }
        let session = StudySession::start(learner_id, now);
        self.store.insert_session(&session)?;
        Ok(session)
    }

    /// Close a session, writing its aggregates from the events recorded
    /// under it. Closing an already-closed session returns it unchanged.
    pub fn end_session(&self, session_id: Uuid) -> Result<StudySession> {
        self.end_session_at(session_id, Utc::now())
    }

    pub fn end_session_at(&self, session_id: Uuid, now: DateTime<Utc>) -> Result<StudySession> {
        let mut session = self
            .store
            .get_session(session_id)?
            .ok_or(EngineError::SessionNotFound(session_id))?;
        if !session.is_open() {
            return Ok(session);
        }

        let events = self.store.events_for(session.learner_id)?;
        let in_session: Vec<_> = events
            .iter()
            .filter(|e| e.session_id == Some(session_id))
            .collect();

        session.cards_studied = in_session.len() as u32;
        session.cards_correct = in_session.iter().filter(|e| e.rating.is_correct()).count() as u32;
        session.focus_score = if session.cards_studied > 0 {
            Some(f64::from(session.cards_correct) / f64::from(session.cards_studied) * 100.0)
        } else {
            None
        };
        session.ended_at = Some(now);

        self.store.update_session(&session)?;
        debug!(
            session_id = %session.id,
            cards_studied = session.cards_studied,
            cards_correct = session.cards_correct,
            "session closed"
        );
        Ok(session)
    }
}
