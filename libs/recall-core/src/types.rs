//! Core types for the spaced-repetition engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ReviewError;

/// Rating for a review, on the 0-5 SM-2 grade scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    Blackout,
    Incorrect,
    Almost,
    Good,
    Easy,
    Perfect,
}

impl Rating {
    /// Convert to the 0-5 numeric grade.
    pub fn to_value(self) -> u8 {
        match self {
            Self::Blackout => 0,
            Self::Incorrect => 1,
            Self::Almost => 2,
            Self::Good => 3,
            Self::Easy => 4,
            Self::Perfect => 5,
        }
    }

    /// Create from a 0-5 numeric grade.
    ///
    /// Out-of-range values are rejected, never clamped.
    pub fn from_value(value: u8) -> Result<Self, ReviewError> {
        match value {
            0 => Ok(Self::Blackout),
            1 => Ok(Self::Incorrect),
            2 => Ok(Self::Almost),
            3 => Ok(Self::Good),
            4 => Ok(Self::Easy),
            5 => Ok(Self::Perfect),
            _ => Err(ReviewError::InvalidRating { value }),
        }
    }

    /// Ratings of 3 and above count as successful recall everywhere
    /// downstream: accuracy, mastery delta, streak and repetitions.
    pub fn is_correct(self) -> bool {
        self.to_value() >= 3
    }
}

/// Per learner-and-item scheduling state, created lazily on first review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulingState {
    /// How quickly the interval grows. Never drops below 1.3.
    pub ease_factor: f64,
    /// Whole days until the item is next due. 0 means due immediately.
    pub interval_days: u32,
    /// Consecutive successful reviews since the last failure.
    pub repetitions: u32,
    pub next_review_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_review_date: Option<DateTime<Utc>>,
    pub total_reviews: u32,
    pub correct_reviews: u32,
    /// Clamped to [0, 100]; +5 on success, -10 on failure.
    pub mastery_level: u8,
    /// Two-point average `(old + new) / 2`, not a true running mean.
    /// Kept as-is: changing it would change observable state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_response_time_ms: Option<f64>,
}

impl SchedulingState {
    /// Fresh state for an item that has never been reviewed: due
    /// immediately, default ease.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            ease_factor: 2.5,
            interval_days: 0,
            repetitions: 0,
            next_review_date: now,
            last_review_date: None,
            total_reviews: 0,
            correct_reviews: 0,
            mastery_level: 0,
            average_response_time_ms: None,
        }
    }

    /// Fold a new response time into the stored average.
    ///
    /// Two-point `(old + new) / 2`, not a true running mean over all
    /// reviews; a running mean would need a sample count. Kept because
    /// the stored values are observable.
    pub fn record_response_time(&mut self, response_time_ms: u32) {
        self.average_response_time_ms = Some(match self.average_response_time_ms {
            None => f64::from(response_time_ms),
            Some(old) => (old + f64::from(response_time_ms)) / 2.0,
        });
    }

    /// Fraction of reviews that were correct, in [0, 1].
    pub fn accuracy(&self) -> f64 {
        if self.total_reviews == 0 {
            0.0
        } else {
            f64::from(self.correct_reviews) / f64::from(self.total_reviews)
        }
    }
}

/// One submitted review. Append-only: never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewEvent {
    pub id: Uuid,
    pub learner_id: Uuid,
    pub card_id: i64,
    pub rating: Rating,
    pub response_time_ms: u32,
    pub reviewed_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,
    /// Topic or deck label captured at review time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

/// A contiguous study session. Open at start; aggregates are written
/// only when the session is closed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudySession {
    pub id: Uuid,
    pub learner_id: Uuid,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    pub cards_studied: u32,
    pub cards_correct: u32,
    /// Percentage accuracy of the session; None until closed or when the
    /// session saw no cards.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus_score: Option<f64>,
}

impl StudySession {
    /// Open a new session.
    pub fn start(learner_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            learner_id,
            started_at: now,
            ended_at: None,
            cards_studied: 0,
            cards_correct: 0,
            focus_score: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }
}
