//! Error types for recall-core.

use thiserror::Error;

/// Result type alias using ReviewError.
pub type Result<T> = std::result::Result<T, ReviewError>;

/// Errors raised at the review input boundary.
///
/// The algorithm itself never fails; invalid input is rejected before it
/// is invoked, and is never silently clamped.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReviewError {
    #[error("invalid rating {value}: must be between 0 and 5")]
    InvalidRating { value: u8 },

    #[error("missing learner identity")]
    MissingLearner,
}
