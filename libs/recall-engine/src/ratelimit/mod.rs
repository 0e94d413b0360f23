//! Fixed-window request governor for the AI-generation operations.
//!
//! One counter per `(identifier, operation)` pair. A counter is created
//! on the first request of a window and replaced, not incremented, once
//! the window expires; expired counters behave as absent whether or not
//! the opportunistic sweep has removed them yet.
//!
//! Exceeding a quota is a normal return value from `check`/`status`, not
//! an error; `enforce_multiple` wraps denials for callers that want
//! error semantics.

pub mod config;

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::error::EngineError;

pub use config::{OperationType, Quota, RateLimitConfig, DEFAULT_WINDOW_MS};

/// Fraction of `check` calls that sweep expired counters. Memory
/// housekeeping only; correctness never depends on the sweep.
const CLEANUP_PROBABILITY: f64 = 0.01;

/// Key of one counter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CounterKey {
    pub identifier: String,
    pub operation: OperationType,
}

impl CounterKey {
    fn new(identifier: &str, operation: OperationType) -> Self {
        Self {
            identifier: identifier.to_string(),
            operation,
        }
    }
}

/// One fixed-window counter. Owned exclusively by the counter store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Counter {
    pub count: u32,
    pub window_reset: DateTime<Utc>,
    pub first_request: DateTime<Utc>,
}

/// Storage seam for counters, so a multi-instance deployment can back
/// the same algorithm with a shared atomic store.
pub trait CounterStore: Send + Sync {
    /// Run `f` for `key` inside a single critical section. `f` receives
    /// the current counter and returns the replacement (`None` removes
    /// the entry). The critical section is what keeps two concurrent
    /// requests from both passing at `count == max - 1`.
    fn update(
        &self,
        key: &CounterKey,
        f: &mut dyn FnMut(Option<Counter>) -> Option<Counter>,
    );

    /// Read without mutating.
    fn get(&self, key: &CounterKey) -> Option<Counter>;

    fn delete(&self, key: &CounterKey);

    /// Drop every counter whose window has expired.
    fn sweep_expired(&self, now: DateTime<Utc>);

    fn clear(&self);
}

/// In-memory counter store: the single-instance reference.
#[derive(Default)]
pub struct MemoryCounterStore {
    counters: Mutex<HashMap<CounterKey, Counter>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CounterStore for MemoryCounterStore {
    fn update(
        &self,
        key: &CounterKey,
        f: &mut dyn FnMut(Option<Counter>) -> Option<Counter>,
    ) {
        let mut counters = self.counters.lock().expect("counter store lock");
        match f(counters.get(key).cloned()) {
            Some(counter) => {
                counters.insert(key.clone(), counter);
            }
            None => {
                counters.remove(key);
            }
        }
    }

    fn get(&self, key: &CounterKey) -> Option<Counter> {
        let counters = self.counters.lock().expect("counter store lock");
        counters.get(key).cloned()
    }

    fn delete(&self, key: &CounterKey) {
        let mut counters = self.counters.lock().expect("counter store lock");
        counters.remove(key);
    }

    fn sweep_expired(&self, now: DateTime<Utc>) {
        let mut counters = self.counters.lock().expect("counter store lock");
        counters.retain(|_, counter| now < counter.window_reset);
    }

    fn clear(&self) {
        let mut counters = self.counters.lock().expect("counter store lock");
        counters.clear();
    }
}

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Typed error for callers that want denial as an error rather than a
/// decision value. Carries everything needed for a wait-and-retry
/// message; never surfaced as a generic failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (retry in {retry_after_secs}s)")]
pub struct RateLimitExceededError {
    pub operation: OperationType,
    pub retry_after_secs: u64,
    pub reset_time: DateTime<Utc>,
    pub message: String,
}

/// The request governor. Construct one per process (or per test) and
/// share it; there is no global instance.
pub struct RateLimiter {
    config: RateLimitConfig,
    store: Box<dyn CounterStore>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_store(config, Box::new(MemoryCounterStore::new()))
    }

    pub fn with_store(config: RateLimitConfig, store: Box<dyn CounterStore>) -> Self {
        Self { config, store }
    }

    /// Limiter configured from the environment.
    pub fn from_env() -> Self {
        Self::new(RateLimitConfig::from_env())
    }

    /// Check and consume one request for `(identifier, operation)`.
    pub fn check(&self, identifier: &str, operation: OperationType) -> RateLimitDecision {
        self.check_at(identifier, operation, Utc::now())
    }

    pub fn check_at(
        &self,
        identifier: &str,
        operation: OperationType,
        now: DateTime<Utc>,
    ) -> RateLimitDecision {
        let quota = self.config.quota(operation);
        let key = CounterKey::new(identifier, operation);
        let window = Duration::milliseconds(quota.window_ms as i64);

        let mut decision = RateLimitDecision {
            allowed: false,
            remaining: 0,
            reset_time: now,
            retry_after_secs: None,
            message: None,
        };

        self.store.update(&key, &mut |existing| match existing {
            Some(counter) if now < counter.window_reset => {
                if counter.count < quota.max_requests {
                    let advanced = Counter {
                        count: counter.count + 1,
                        ..counter
                    };
                    decision = RateLimitDecision {
                        allowed: true,
                        remaining: quota.max_requests - advanced.count,
                        reset_time: advanced.window_reset,
                        retry_after_secs: None,
                        message: None,
                    };
                    Some(advanced)
                } else {
                    // At quota: denied, counter untouched.
                    decision = RateLimitDecision {
                        allowed: false,
                        remaining: 0,
                        reset_time: counter.window_reset,
                        retry_after_secs: Some(retry_after_secs(counter.window_reset, now)),
                        message: Some(quota.message.clone()),
                    };
                    Some(counter)
                }
            }
            // Absent or expired: a fresh window starts with this request.
            _ => {
                let fresh = Counter {
                    count: 1,
                    window_reset: now + window,
                    first_request: now,
                };
                decision = RateLimitDecision {
                    allowed: true,
                    remaining: quota.max_requests.saturating_sub(1),
                    reset_time: fresh.window_reset,
                    retry_after_secs: None,
                    message: None,
                };
                Some(fresh)
            }
        });

        if !decision.allowed {
            debug!(identifier, %operation, "rate limit denied");
        }
        if rand::thread_rng().gen::<f64>() < CLEANUP_PROBABILITY {
            self.store.sweep_expired(now);
        }
        decision
    }

    /// Check several operation types in order. The first denial is
    /// returned as-is; if all pass, the aggregate reports the smallest
    /// remaining and the furthest reset.
    pub fn check_multiple(
        &self,
        identifier: &str,
        operations: &[OperationType],
    ) -> RateLimitDecision {
        self.check_multiple_at(identifier, operations, Utc::now())
    }

    pub fn check_multiple_at(
        &self,
        identifier: &str,
        operations: &[OperationType],
        now: DateTime<Utc>,
    ) -> RateLimitDecision {
        match self.run_checks(identifier, operations, now) {
            Ok(decision) | Err((_, decision)) => decision,
        }
    }

    /// Like `check_multiple`, but a denial becomes a typed error.
    pub fn enforce_multiple(
        &self,
        identifier: &str,
        operations: &[OperationType],
    ) -> Result<RateLimitDecision, RateLimitExceededError> {
        self.enforce_multiple_at(identifier, operations, Utc::now())
    }

    pub fn enforce_multiple_at(
        &self,
        identifier: &str,
        operations: &[OperationType],
        now: DateTime<Utc>,
    ) -> Result<RateLimitDecision, RateLimitExceededError> {
        self.run_checks(identifier, operations, now)
            .map_err(|(operation, decision)| RateLimitExceededError {
                operation,
                retry_after_secs: decision.retry_after_secs.unwrap_or(0),
                reset_time: decision.reset_time,
                message: decision
                    .message
                    .unwrap_or_else(|| self.config.quota(operation).message.clone()),
            })
    }

    fn run_checks(
        &self,
        identifier: &str,
        operations: &[OperationType],
        now: DateTime<Utc>,
    ) -> Result<RateLimitDecision, (OperationType, RateLimitDecision)> {
        let mut remaining = u32::MAX;
        let mut reset_time = now;
        for &operation in operations {
            let decision = self.check_at(identifier, operation, now);
            if !decision.allowed {
                return Err((operation, decision));
            }
            remaining = remaining.min(decision.remaining);
            reset_time = reset_time.max(decision.reset_time);
        }
        Ok(RateLimitDecision {
            allowed: true,
            remaining: if operations.is_empty() { 0 } else { remaining },
            reset_time,
            retry_after_secs: None,
            message: None,
        })
    }

    /// Status-only read; never mutates the counter. Used for UI polling.
    pub fn status(&self, identifier: &str, operation: OperationType) -> RateLimitDecision {
        self.status_at(identifier, operation, Utc::now())
    }

    pub fn status_at(
        &self,
        identifier: &str,
        operation: OperationType,
        now: DateTime<Utc>,
    ) -> RateLimitDecision {
        let quota = self.config.quota(operation);
        let key = CounterKey::new(identifier, operation);

        match self.store.get(&key) {
            Some(counter) if now < counter.window_reset => {
                if counter.count >= quota.max_requests {
                    RateLimitDecision {
                        allowed: false,
                        remaining: 0,
                        reset_time: counter.window_reset,
                        retry_after_secs: Some(retry_after_secs(counter.window_reset, now)),
                        message: Some(quota.message.clone()),
                    }
                } else {
                    RateLimitDecision {
                        allowed: true,
                        remaining: quota.max_requests - counter.count,
                        reset_time: counter.window_reset,
                        retry_after_secs: None,
                        message: None,
                    }
                }
            }
            _ => RateLimitDecision {
                allowed: true,
                remaining: quota.max_requests,
                reset_time: now + Duration::milliseconds(quota.window_ms as i64),
                retry_after_secs: None,
                message: None,
            },
        }
    }

    /// Administrative: drop one counter. Gated off in production.
    pub fn reset(&self, identifier: &str, operation: OperationType) -> Result<(), EngineError> {
        if !self.config.allow_admin_reset {
            return Err(EngineError::AdminDisabled {
                operation: "rate limit reset",
            });
        }
        self.store.delete(&CounterKey::new(identifier, operation));
        Ok(())
    }

    /// Administrative: drop every counter. Test isolation; gated like
    /// `reset`.
    pub fn clear(&self) -> Result<(), EngineError> {
        if !self.config.allow_admin_reset {
            return Err(EngineError::AdminDisabled {
                operation: "rate limit clear",
            });
        }
        self.store.clear();
        Ok(())
    }
}

/// Whole seconds until the window resets, rounded up.
fn retry_after_secs(window_reset: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let millis = (window_reset - now).num_milliseconds().max(0);
    ((millis + 999) / 1000) as u64
}
