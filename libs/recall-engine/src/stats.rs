//! Mastery & statistics aggregator: read-only dashboard views.
//!
//! All reads here are advisory. If the store fails, each view logs and
//! returns a safe default instead of propagating; only the write path in
//! the scheduler surfaces storage errors.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::insights::{self, Insight, InsightData};
use crate::store::{ReviewStore, SessionStore, StateStore};
use recall_core::types::SchedulingState;

/// Default cap for due-card retrieval.
pub const DEFAULT_DUE_LIMIT: usize = 20;

/// Mastery bucket boundaries. Fixed thresholds, not configurable.
const MASTERED_THRESHOLD: u8 = 80;
const LEARNING_THRESHOLD: u8 = 40;

/// Counts of tracked items per mastery bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CardStats {
    pub total_cards: usize,
    pub due_cards: usize,
    pub mastered: usize,
    pub learning: usize,
    pub difficult: usize,
}

/// A due or upcoming item, as shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DueCard {
    pub card_id: i64,
    pub next_review_date: DateTime<Utc>,
    pub interval_days: u32,
    pub mastery_level: u8,
}

impl DueCard {
    fn from_state(card_id: i64, state: &SchedulingState) -> Self {
        Self {
            card_id,
            next_review_date: state.next_review_date,
            interval_days: state.interval_days,
            mastery_level: state.mastery_level,
        }
    }
}

/// Upcoming items for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpcomingDay {
    pub date: NaiveDate,
    pub cards: Vec<DueCard>,
}

/// Single derived state for user-facing messaging, evaluated in this
/// priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionState {
    NewUser,
    HasDueCards,
    CompletedToday,
    NoCardsDue,
}

/// Read-only views over one learner's stored scheduling state, review
/// events and sessions.
pub struct Aggregator<S> {
    store: Arc<S>,
}

impl<S> Aggregator<S>
where
    S: StateStore + ReviewStore + SessionStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn card_stats(&self, learner_id: Uuid) -> CardStats {
        self.card_stats_at(learner_id, Utc::now())
    }

    pub fn card_stats_at(&self, learner_id: Uuid, now: DateTime<Utc>) -> CardStats {
        let states = match self.store.list_states(learner_id) {
            Ok(states) => states,
            Err(err) => {
                warn!(%learner_id, error = %err, "card stats read failed, returning defaults");
                return CardStats::default();
            }
        };

        let mut stats = CardStats {
            total_cards: states.len(),
            ..CardStats::default()
        };
        for (_, state) in &states {
            if state.next_review_date <= now {
                stats.due_cards += 1;
            }
            if state.mastery_level >= MASTERED_THRESHOLD {
                stats.mastered += 1;
            } else if state.mastery_level >= LEARNING_THRESHOLD {
                stats.learning += 1;
            } else {
                stats.difficult += 1;
            }
        }
        stats
    }

    /// Due items, most overdue first, capped at `limit`
    /// (`DEFAULT_DUE_LIMIT` when `None`).
    pub fn due_cards(&self, learner_id: Uuid, limit: Option<usize>) -> Vec<DueCard> {
        self.due_cards_at(learner_id, limit, Utc::now())
    }

    pub fn due_cards_at(
        &self,
        learner_id: Uuid,
        limit: Option<usize>,
        now: DateTime<Utc>,
    ) -> Vec<DueCard> {
        let due = match self
            .store
            .due_between(learner_id, DateTime::<Utc>::MIN_UTC, now)
        {
            Ok(due) => due,
            Err(err) => {
                warn!(%learner_id, error = %err, "due card read failed, returning none");
                return Vec::new();
            }
        };

        let mut cards: Vec<DueCard> = due
            .iter()
            .map(|(card_id, state)| DueCard::from_state(*card_id, state))
            .collect();
        cards.sort_by_key(|c| c.next_review_date);
        cards.truncate(limit.unwrap_or(DEFAULT_DUE_LIMIT));
        cards
    }

    /// Items due within the next seven days (exclusive of already-due),
    /// grouped by calendar day, days ascending.
    pub fn upcoming_cards(&self, learner_id: Uuid) -> Vec<UpcomingDay> {
        self.upcoming_cards_at(learner_id, Utc::now())
    }

    pub fn upcoming_cards_at(&self, learner_id: Uuid, now: DateTime<Utc>) -> Vec<UpcomingDay> {
        let upcoming = match self
            .store
            .due_between(learner_id, now, now + Duration::days(7))
        {
            Ok(rows) => rows,
            Err(err) => {
                warn!(%learner_id, error = %err, "upcoming card read failed, returning none");
                return Vec::new();
            }
        };

        let mut by_day: BTreeMap<NaiveDate, Vec<DueCard>> = BTreeMap::new();
        for (card_id, state) in &upcoming {
            by_day
                .entry(state.next_review_date.date_naive())
                .or_default()
                .push(DueCard::from_state(*card_id, state));
        }
        by_day
            .into_iter()
            .map(|(date, mut cards)| {
                cards.sort_by_key(|c| c.next_review_date);
                UpcomingDay { date, cards }
            })
            .collect()
    }

    /// Consecutive calendar days, walking backward from today, with at
    /// least one session started. The anchor day must be today or
    /// yesterday, otherwise the streak is 0; after that the walk breaks
    /// on the first day without a session. No free gap day is granted.
    pub fn streak_days(&self, learner_id: Uuid) -> u32 {
        self.streak_days_at(learner_id, Utc::now())
    }

    pub fn streak_days_at(&self, learner_id: Uuid, now: DateTime<Utc>) -> u32 {
        let sessions = match self.store.sessions_for(learner_id) {
            Ok(sessions) => sessions,
            Err(err) => {
                warn!(%learner_id, error = %err, "session read failed, streak defaults to 0");
                return 0;
            }
        };

        let days: std::collections::BTreeSet<NaiveDate> =
            sessions.iter().map(|s| s.started_at.date_naive()).collect();
        let Some(&latest) = days.iter().next_back() else {
            return 0;
        };

        let today = now.date_naive();
        if latest != today && latest != today - Duration::days(1) {
            return 0;
        }

        let mut streak = 1;
        let mut cursor = latest;
        while days.contains(&(cursor - Duration::days(1))) {
            streak += 1;
            cursor = cursor - Duration::days(1);
        }
        streak
    }

    pub fn completion_state(&self, learner_id: Uuid) -> CompletionState {
        self.completion_state_at(learner_id, Utc::now())
    }

    pub fn completion_state_at(&self, learner_id: Uuid, now: DateTime<Utc>) -> CompletionState {
        let stats = self.card_stats_at(learner_id, now);
        if stats.total_cards == 0 {
            return CompletionState::NewUser;
        }
        if stats.due_cards > 0 {
            return CompletionState::HasDueCards;
        }

        let events = match self.store.events_for(learner_id) {
            Ok(events) => events,
            Err(err) => {
                warn!(%learner_id, error = %err, "event read failed for completion state");
                return CompletionState::NoCardsDue;
            }
        };
        let today = now.date_naive();
        let reviewed_today = events.iter().any(|e| e.reviewed_at.date_naive() == today);
        if reviewed_today {
            CompletionState::CompletedToday
        } else {
            CompletionState::NoCardsDue
        }
    }

    /// Overall accuracy over the learner's review history, in [0, 1].
    pub fn accuracy(&self, learner_id: Uuid) -> f64 {
        let events = match self.store.events_for(learner_id) {
            Ok(events) => events,
            Err(err) => {
                warn!(%learner_id, error = %err, "event read failed, accuracy defaults to 0");
                return 0.0;
            }
        };
        if events.is_empty() {
            return 0.0;
        }
        let correct = events.iter().filter(|e| e.rating.is_correct()).count();
        correct as f64 / events.len() as f64
    }

    /// Prioritized, human-readable observations over the learner's
    /// history. Best-effort: a failed read yields an empty list.
    pub fn insights(&self, learner_id: Uuid) -> Vec<Insight> {
        self.insights_at(learner_id, Utc::now())
    }

    pub fn insights_at(&self, learner_id: Uuid, now: DateTime<Utc>) -> Vec<Insight> {
        let events = match self.store.events_for(learner_id) {
            Ok(events) => events,
            Err(err) => {
                warn!(%learner_id, error = %err, "event read failed, no insights");
                return Vec::new();
            }
        };
        let streak = self.streak_days_at(learner_id, now);
        let data = InsightData::from_history(&events, streak, now);
        insights::generate(&data)
    }
}
