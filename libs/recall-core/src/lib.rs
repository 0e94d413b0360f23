//! Core scheduling library for the recall spaced-repetition engine.
//!
//! Provides:
//! - The review outcome model (Rating, SchedulingState, ReviewEvent, StudySession)
//! - The SM-2 variant scheduling algorithm
//! - Boundary validation for review input

pub mod algorithm;
pub mod error;
pub mod types;

pub use algorithm::{SchedulingAlgorithm, SchedulingResult};
pub use error::{ReviewError, Result};
pub use types::{Rating, ReviewEvent, SchedulingState, StudySession};
