//! Error handling for the engine services.

use thiserror::Error;
use uuid::Uuid;

use crate::ratelimit::RateLimitExceededError;
use crate::store::StoreError;
use recall_core::error::ReviewError;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Engine error taxonomy.
///
/// Write-path storage failures propagate through here; a silently dropped
/// review would desynchronize the learner's schedule. Read views degrade
/// to defaults instead and never surface a `Store` error.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Review(#[from] ReviewError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("session {0} not found")]
    SessionNotFound(Uuid),

    #[error(transparent)]
    RateLimited(#[from] RateLimitExceededError),

    #[error("{operation} is not permitted in this environment")]
    AdminDisabled { operation: &'static str },
}
