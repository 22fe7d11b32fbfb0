//! Retry policies with fixed or exponential backoff

use crate::error::{ResilienceError, ResilienceResult};
use std::future::Future;
use std::time::Duration;

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first attempt)
    max_attempts: usize,
    /// Delay before the first retry
    initial_delay: Duration,
    /// Maximum delay between retries
    max_delay: Duration,
    /// Backoff multiplier; 1.0 keeps the delay fixed
    multiplier: f64,
    /// Whether to use jitter
    use_jitter: bool,
}

impl RetryPolicy {
    /// Creates an exponential policy (100ms doubling, jittered)
    pub fn new(max_attempts: usize) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            use_jitter: true,
        }
    }

    /// Creates a policy with the same delay between every attempt
    pub fn fixed(max_attempts: usize, delay: Duration) -> Self {
        Self::new(max_attempts)
            .with_initial_delay(delay)
            .with_max_delay(delay.max(Duration::from_secs(30)))
            .with_multiplier(1.0)
            .with_jitter(false)
    }

    /// Sets the initial delay
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier (values below 1.0 are treated as 1.0)
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier.max(1.0);
        self
    }

    /// Sets whether to use jitter
    pub fn with_jitter(mut self, use_jitter: bool) -> Self {
        self.use_jitter = use_jitter;
        self
    }

    /// Delay to wait after `attempt` failed attempts
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        if attempt == 0 {
            return Duration::from_secs(0);
        }

        let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        let base_delay = self.initial_delay.as_millis() as f64 * self.multiplier.powi(exponent);

        let capped_delay = base_delay.min(self.max_delay.as_millis() as f64);

        let final_delay = if self.use_jitter {
            // Deterministic spread between 75% and 100%
            let jitter_factor = 0.75 + (attempt as f64 * 0.1 % 0.25);
            capped_delay * jitter_factor
        } else {
            capped_delay
        };

        Duration::from_millis(final_delay as u64)
    }

    /// Returns the maximum number of attempts
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Sum of every delay the policy can wait before giving up
    pub fn worst_case_delay(&self) -> Duration {
        (1..self.max_attempts).map(|a| self.delay_for_attempt(a)).sum()
    }
}

impl Default for RetryPolicy {
    /// One attempt plus three retries, one second apart
    fn default() -> Self {
        Self::fixed(4, Duration::from_secs(1))
    }
}

/// Runs `operation` until it succeeds or the policy's attempts are used up
///
/// The closure receives the 1-based attempt number. Delays are awaited with
/// `tokio::time::sleep`, so paused-clock tests run instantly.
pub async fn retry<F, Fut, T, E>(policy: &RetryPolicy, mut operation: F) -> ResilienceResult<T>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    if policy.max_attempts() == 0 {
        return Err(ResilienceError::NoAttempts);
    }

    let mut attempt = 0;
    let mut last_error = String::new();

    while attempt < policy.max_attempts() {
        attempt += 1;
        match operation(attempt).await {
            Ok(result) => return Ok(result),
            Err(e) => {
                last_error = e.to_string();
                log::debug!(
                    "Attempt {}/{} failed: {}",
                    attempt,
                    policy.max_attempts(),
                    last_error
                );

                if attempt < policy.max_attempts() {
                    tokio::time::sleep(policy.delay_for_attempt(attempt)).await;
                }
            }
        }
    }

    Err(ResilienceError::RetriesExhausted {
        attempts: attempt,
        last_error,
    })
}
