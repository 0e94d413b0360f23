//! Stateful services over the recall-core scheduling library.
//!
//! Provides:
//! - Storage traits and an in-memory reference store
//! - The review submission service (scheduling + persistence + sessions)
//! - The mastery & statistics aggregator (dashboard read views)
//! - Rule-based study insights
//! - The fixed-window rate limiter guarding AI-generation operations

pub mod error;
pub mod insights;
pub mod ratelimit;
pub mod scheduler;
pub mod stats;
pub mod store;

pub use error::{EngineError, Result};
pub use insights::{Insight, Priority};
pub use ratelimit::{
    OperationType, RateLimitConfig, RateLimitDecision, RateLimitExceededError, RateLimiter,
};
pub use scheduler::{ReviewSubmission, Scheduler};
pub use stats::{Aggregator, CardStats, CompletionState, DueCard, UpcomingDay};
pub use store::{MemoryStore, ReviewStore, SessionStore, StateStore, StoreError};
