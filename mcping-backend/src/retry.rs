//! Retry with exponential backoff.
//!
//! Delay before retry `n` (1-based) is `initial_delay * multiplier^(n-1)`,
//! capped at `max_delay`. Back-off sleeps end early when the shutdown token is
//! cancelled, returning the last error.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    /// Case-insensitive substrings marking an error message as transient
    pub retryable_errors: Vec<String>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
            backoff_multiplier: 2.0,
            retryable_errors: [
                "timeout",
                "timed out",
                "network",
                "econnrefused",
                "connection refused",
                "enotfound",
                "not found",
                "500",
                "502",
                "503",
                "504",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl RetryConfig {
    /// Delay slept after failed attempt `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let millis = self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi(exponent);
        let capped = millis.min(self.max_delay.as_millis() as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }

    pub fn is_retryable_message(&self, message: &str) -> bool {
        let message = message.to_lowercase();
        self.retryable_errors
            .iter()
            .any(|needle| message.contains(&needle.to_lowercase()))
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
    shutdown: CancellationToken,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self::with_shutdown(config, CancellationToken::new())
    }

    pub fn with_shutdown(config: RetryConfig, shutdown: CancellationToken) -> Self {
        Self { config, shutdown }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Retry errors whose message contains one of the configured substrings.
    pub async fn run<F, Fut, T, E>(&self, op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.run_if(op, |err: &E| self.config.is_retryable_message(&err.to_string()))
            .await
    }

    /// Retry errors for which `is_retryable` returns true.
    pub async fn run_if<F, Fut, T, E, P>(&self, mut op: F, is_retryable: P) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if attempt >= max_attempts || !is_retryable(&err) {
                return Err(err);
            }

            let delay = self.config.delay_for(attempt);
            warn!(attempt, max_attempts, delay_ms = delay.as_millis() as u64, "attempt failed, retrying");
            tokio::select! {
                _ = self.shutdown.cancelled() => return Err(err),
                _ = sleep(delay) => {}
            }
            attempt += 1;
        }
    }
}
