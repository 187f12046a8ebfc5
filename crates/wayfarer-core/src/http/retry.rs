//! Time-budgeted retry loop with exponential backoff
//!
//! One logical call runs as a sequence of sequential attempts under a single
//! wall-clock budget. There is no independent attempt cap: slow upstreams
//! fail relative to caller-configured patience, not after an arbitrary count.
//! The loop inspects an explicit decision value after each failed attempt
//! instead of unwinding through exceptions.

use backoff::{backoff::Backoff, ExponentialBackoff};
use std::future::Future;
use std::time::{Duration, Instant};

use crate::http::error::ApiError;

/// Backoff policy configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Base delay before the first re-attempt
    pub base_delay: Duration,
    /// Cap on any single delay
    pub max_delay: Duration,
    /// Multiplier applied to successive delays
    pub multiplier: f64,
    /// Whether to randomize delays to prevent thundering herd
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            multiplier: 1.5,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Set the base delay.
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Set the per-delay cap.
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Set the backoff multiplier.
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Enable or disable jitter.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Create the exponential backoff instance driving delay computation.
    pub fn create_backoff(&self) -> ExponentialBackoff {
        let mut backoff = ExponentialBackoff {
            initial_interval: self.base_delay,
            max_interval: self.max_delay,
            multiplier: self.multiplier,
            max_elapsed_time: None, // the wall-clock budget is enforced by the retry loop
            ..Default::default()
        };

        if !self.jitter {
            backoff.randomization_factor = 0.0;
        }

        backoff
    }
}

/// Decision taken after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the given delay
    Retry { delay: Duration },
    /// The error is not retriable; surface it unchanged
    NoRetry,
    /// The budget is spent; surface a `Timeout` carrying the last outcome
    BudgetExhausted,
}

/// Call-local retry state: elapsed time since the first attempt, attempt
/// count, and backoff progression. Lives only for the duration of the loop.
#[derive(Debug)]
pub struct RetryState {
    start: Instant,
    budget: Duration,
    attempts: u32,
    backoff: ExponentialBackoff,
}

impl RetryState {
    /// Start tracking a fresh logical call.
    pub fn new(policy: &RetryPolicy, budget: Duration) -> Self {
        Self {
            start: Instant::now(),
            budget,
            attempts: 0,
            backoff: policy.create_backoff(),
        }
    }

    /// Decide what to do about a failed attempt.
    ///
    /// Delays are clamped to the remaining budget, so the loop never sleeps
    /// past it; the attempt that lands on the boundary is the last one.
    pub fn decide(&mut self, error: &ApiError, retry_over_query_limit: bool) -> RetryDecision {
        self.attempts += 1;

        if !error.is_retryable(retry_over_query_limit) {
            return RetryDecision::NoRetry;
        }

        let elapsed = self.start.elapsed();
        if elapsed >= self.budget {
            return RetryDecision::BudgetExhausted;
        }

        let delay = self
            .backoff
            .next_backoff()
            .unwrap_or(self.budget);
        let remaining = self.budget - elapsed;

        RetryDecision::Retry {
            delay: delay.min(remaining),
        }
    }

    /// Number of attempts made so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Wall-clock budget for this call.
    pub fn budget(&self) -> Duration {
        self.budget
    }
}

/// Execute one logical call as a sequence of attempts under a wall-clock
/// budget. `attempt_fn` performs exactly one exchange per invocation.
pub async fn execute_with_retry<F, Fut, T>(
    mut attempt_fn: F,
    policy: &RetryPolicy,
    budget: Duration,
    retry_over_query_limit: bool,
) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut state = RetryState::new(policy, budget);

    loop {
        match attempt_fn().await {
            Ok(value) => return Ok(value),
            Err(error) => match state.decide(&error, retry_over_query_limit) {
                RetryDecision::Retry { delay } => {
                    log::warn!(
                        "attempt {} failed, retrying after {:?}: {}",
                        state.attempts(),
                        delay,
                        error
                    );
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::NoRetry => {
                    log::error!(
                        "attempt {} failed, not retrying: {}",
                        state.attempts(),
                        error
                    );
                    return Err(error);
                }
                RetryDecision::BudgetExhausted => {
                    log::error!(
                        "giving up after {} attempts over {:?}: {}",
                        state.attempts(),
                        budget,
                        error
                    );
                    return Err(error.into_budget_timeout(budget));
                }
            },
        }
    }
}
