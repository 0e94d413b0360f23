//! Rate-limit quotas and environment configuration.

use serde::Serialize;

/// Shared default window: five minutes.
pub const DEFAULT_WINDOW_MS: u64 = 5 * 60 * 1000;

/// Cost-bearing operation classes guarded by the limiter.
///
/// Each type owns an independent quota; `GlobalAi` is the umbrella over
/// all AI traffic and must pass independently of the specific type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    CardGeneration,
    Explanation,
    GlobalAi,
}

impl OperationType {
    pub const ALL: [OperationType; 3] = [
        OperationType::CardGeneration,
        OperationType::Explanation,
        OperationType::GlobalAi,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CardGeneration => "card_generation",
            Self::Explanation => "explanation",
            Self::GlobalAi => "global_ai",
        }
    }

    fn env_infix(self) -> &'static str {
        match self {
            Self::CardGeneration => "CARD_GENERATION",
            Self::Explanation => "EXPLANATION",
            Self::GlobalAi => "GLOBAL_AI",
        }
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quota for one operation type.
#[derive(Debug, Clone)]
pub struct Quota {
    pub max_requests: u32,
    pub window_ms: u64,
    /// Shown to the user on denial, together with the retry time.
    pub message: String,
}

/// Limiter configuration. Defaults match the documented quotas; each
/// value can be overridden through the environment:
///
/// - `RECALL_RATELIMIT_<OP>_MAX` (e.g. `RECALL_RATELIMIT_EXPLANATION_MAX`)
/// - `RECALL_RATELIMIT_<OP>_WINDOW_MS`
/// - `RECALL_ENV=production` disables the administrative reset/clear ops
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub card_generation: Quota,
    pub explanation: Quota,
    pub global_ai: Quota,
    pub allow_admin_reset: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            card_generation: Quota {
                max_requests: 5,
                window_ms: DEFAULT_WINDOW_MS,
                message: "Card generation limit reached. Please wait before generating more."
                    .to_string(),
            },
            explanation: Quota {
                max_requests: 10,
                window_ms: DEFAULT_WINDOW_MS,
                message: "Explanation limit reached. Please wait before asking again.".to_string(),
            },
            global_ai: Quota {
                max_requests: 25,
                window_ms: DEFAULT_WINDOW_MS,
                message: "AI request limit reached. Please wait a few minutes.".to_string(),
            },
            allow_admin_reset: true,
        }
    }
}

impl RateLimitConfig {
    /// Read overrides from the environment, falling back to the defaults
    /// for anything unset or unparseable.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        for operation in OperationType::ALL {
            let infix = operation.env_infix();
            let quota = config.quota_mut(operation);
            if let Some(max) = env_parse(&format!("RECALL_RATELIMIT_{infix}_MAX")) {
                quota.max_requests = max;
            }
            if let Some(window) = env_parse(&format!("RECALL_RATELIMIT_{infix}_WINDOW_MS")) {
                quota.window_ms = window;
            }
        }
        config.allow_admin_reset = std::env::var("RECALL_ENV")
            .map(|env| env != "production")
            .unwrap_or(true);
        config
    }

    pub fn quota(&self, operation: OperationType) -> &Quota {
        match operation {
            OperationType::CardGeneration => &self.card_generation,
            OperationType::Explanation => &self.explanation,
            OperationType::GlobalAi => &self.global_ai,
        }
    }

    fn quota_mut(&mut self, operation: OperationType) -> &mut Quota {
        match operation {
            OperationType::CardGeneration => &mut self.card_generation,
            OperationType::Explanation => &mut self.explanation,
            OperationType::GlobalAi => &mut self.global_ai,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|value| value.parse().ok())
}
