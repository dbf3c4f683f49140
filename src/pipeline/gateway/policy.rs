use std::time::Duration;

use super::{ErrorClass, GatewayError};
use crate::config::AppConfig;

/// Pause before moving on after a rate-limit or not-found failure.
const DEFAULT_SKIP_DELAY: Duration = Duration::from_millis(1000);
const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(500);
const DEFAULT_BACKOFF_CAP: Duration = Duration::from_secs(4);

/// What the gateway does after one failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Call the same model again after the delay.
    RetrySame(Duration),
    /// Give up on this model and try the next one after the delay.
    NextCandidate(Duration),
    /// Stop the whole chain; no candidate can succeed.
    Abort,
}

/// Fallover and retry configuration for the model gateway.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Model identifiers, highest priority first.
    pub candidates: Vec<String>,
    /// Calls per candidate for transient failures (at least 1).
    pub max_attempts: u32,
    pub skip_delay: Duration,
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
    pub classify: fn(&GatewayError) -> ErrorClass,
}

impl RetryPolicy {
    pub fn new(candidates: Vec<String>) -> Self {
        Self {
            candidates,
            max_attempts: crate::config::DEFAULT_MAX_ATTEMPTS,
            skip_delay: DEFAULT_SKIP_DELAY,
            backoff_base: DEFAULT_BACKOFF_BASE,
            backoff_cap: DEFAULT_BACKOFF_CAP,
            classify: GatewayError::classify,
        }
    }

    /// Same chain with every delay set to zero.
    pub fn immediate(candidates: Vec<String>) -> Self {
        Self {
            skip_delay: Duration::ZERO,
            backoff_base: Duration::ZERO,
            backoff_cap: Duration::ZERO,
            ..Self::new(candidates)
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            ..Self::new(config.model_candidates.clone())
        }
    }

    /// Backoff before retry number `attempt` (1-based): base, 2×base, 4×base…
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.backoff_base.saturating_mul(factor).min(self.backoff_cap)
    }

    /// Decide what to do after `attempt` calls to the current model failed
    /// with `error`.
    pub fn decide(&self, error: &GatewayError, attempt: u32) -> RetryDecision {
        match (self.classify)(error) {
            ErrorClass::Fatal => RetryDecision::Abort,
            ErrorClass::RateLimit | ErrorClass::NotFound => {
                RetryDecision::NextCandidate(self.skip_delay)
            }
            ErrorClass::Rejected => RetryDecision::NextCandidate(Duration::ZERO),
            ErrorClass::Transient if attempt < self.max_attempts.max(1) => {
                RetryDecision::RetrySame(self.backoff_for(attempt))
            }
            ErrorClass::Transient => RetryDecision::NextCandidate(Duration::ZERO),
        }
    }
}
