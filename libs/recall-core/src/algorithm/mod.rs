//! Scheduling algorithm seam.

pub mod sm2;

use chrono::{DateTime, Utc};

use crate::types::{Rating, SchedulingState};

pub use sm2::Sm2Variant;

/// Result of scheduling an item after a review.
#[derive(Debug, Clone)]
pub struct SchedulingResult {
    pub new_state: SchedulingState,
    pub next_due: DateTime<Utc>,
}

/// Trait for scheduling algorithms.
///
/// Implementations are pure: `now` is the only clock they see, and they
/// perform no I/O. Serializing the read-modify-write of a single item's
/// state is the caller's responsibility.
pub trait SchedulingAlgorithm: Send + Sync {
    /// Algorithm identifier.
    fn name(&self) -> &'static str;

    /// Initial state for an item that has never been reviewed.
    fn initial_state(&self, now: DateTime<Utc>) -> SchedulingState;

    /// Calculate the next scheduling state after a review.
    fn schedule(&self, state: &SchedulingState, rating: Rating, now: DateTime<Utc>)
        -> SchedulingResult;
}
