//! Bounded retry with exponential backoff for upstream calls.
//!
//! A [`RetryPolicy`] is an explicit object held by the routes that want it.
//! Routes without one call the upstream exactly once.

use crate::api::upstream::AttemptOutcome;
use crate::core::config::RetryConfig;
use crate::core::error_types::RETRY_EXHAUSTED_MESSAGE;
use crate::core::logging::get_request_id;
use crate::core::metrics::get_metrics;
use serde_json::{json, Value};
use std::future::Future;
use std::time::Duration;

/// Exponential backoff: `multiplier * 2^(attempt-1)`, clamped to `[min, max]`.
/// No jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    multiplier: Duration,
    min: Duration,
    max: Duration,
}

impl Backoff {
    /// A `max` below `min` is raised to `min`.
    pub fn new(multiplier: Duration, min: Duration, max: Duration) -> Self {
        Self {
            multiplier,
            min,
            max: max.max(min),
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.unit.saturating_mul(config.multiplier),
            config.unit.saturating_mul(config.min_units),
            config.unit.saturating_mul(config.max_units),
        )
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.multiplier
            .saturating_mul(factor)
            .clamp(self.min, self.max)
    }
}

/// Per-call attempt bookkeeping. Lives only as long as one `execute` call.
#[derive(Debug)]
struct RetryState {
    attempt_count: u32,
    max_attempts: u32,
}

impl RetryState {
    fn new(max_attempts: u32) -> Self {
        Self {
            attempt_count: 0,
            max_attempts,
        }
    }

    fn record_attempt(&mut self) -> u32 {
        self.attempt_count += 1;
        self.attempt_count
    }

    fn can_retry(&self) -> bool {
        self.attempt_count < self.max_attempts
    }
}

/// How a retried call resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryOutcome {
    /// The last attempt produced a final outcome: a response, or a failure
    /// that retrying cannot fix.
    Completed {
        outcome: AttemptOutcome,
        attempts: u32,
    },
    /// Every attempt failed with a retryable outcome.
    Exhausted {
        attempts: u32,
        last_failure: AttemptOutcome,
        fallback: Value,
    },
}

impl RetryOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryOutcome::Completed { attempts, .. } | RetryOutcome::Exhausted { attempts, .. } => {
                *attempts
            }
        }
    }
}

/// Retry policy parameterized by attempt budget, backoff and fallback value.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
    fallback: Value,
}

impl RetryPolicy {
    /// `max_attempts` counts the first attempt and is at least 1.
    pub fn new(max_attempts: u32, backoff: Backoff, fallback: Value) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
            fallback,
        }
    }

    /// Policy with the standard `{"error": "Request failed after multiple retries"}` fallback.
    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Backoff::from_config(config),
            json!({ "error": RETRY_EXHAUSTED_MESSAGE }),
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    pub fn fallback(&self) -> &Value {
        &self.fallback
    }

    /// Run `call` until it yields a final outcome or the attempt budget is spent.
    ///
    /// Only timeouts and non-decode transport failures are retried; any HTTP
    /// response, whatever its status, ends the loop.
    pub async fn execute<F, Fut>(&self, route: &str, mut call: F) -> RetryOutcome
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AttemptOutcome>,
    {
        let mut state = RetryState::new(self.max_attempts);

        loop {
            let outcome = call().await;
            let attempt = state.record_attempt();

            if !outcome.is_retryable() {
                return RetryOutcome::Completed {
                    outcome,
                    attempts: attempt,
                };
            }

            if !state.can_retry() {
                tracing::error!(
                    request_id = %get_request_id(),
                    route = %route,
                    attempts = attempt,
                    last_outcome = outcome.label(),
                    "Upstream retries exhausted"
                );
                return RetryOutcome::Exhausted {
                    attempts: attempt,
                    last_failure: outcome,
                    fallback: self.fallback.clone(),
                };
            }

            let delay = self.backoff.delay_for_attempt(attempt);
            get_metrics().retries.with_label_values(&[route]).inc();
            tracing::warn!(
                request_id = %get_request_id(),
                route = %route,
                attempt,
                max_attempts = self.max_attempts,
                outcome = outcome.label(),
                delay_ms = delay.as_millis() as u64,
                "Retryable upstream failure, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}
