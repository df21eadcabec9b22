//! Replay of API calls that failed for transient reasons.
//!
//! [`ApiClient`](crate::client::ApiClient) makes a single attempt unless a
//! policy is installed with
//! [`with_retry`](crate::client::ApiClient::with_retry). Only calls that are
//! safe to repeat are replayed: creating items (`add`) never is, since the
//! remote may have stored them before the connection dropped.

use std::future::Future;
use std::time::Duration;

use reqwest::Method;
use tracing::warn;
use uuid::Uuid;

use crate::error::{Result, TsheetsError};

/// How many times, and how patiently, a replayable call is attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// One attempt, no replay.
    pub const fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Up to `max_attempts` attempts in total (at least one).
    pub fn attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Backoff doubles from `initial` after each failure, capped at `max`.
    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max.max(initial);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether a request with this method may be sent again after a failure.
    ///
    /// Report requests are POSTs but only read data, so callers pass
    /// `read_only` for them.
    pub fn is_replayable(method: &Method, read_only: bool) -> bool {
        read_only || matches!(*method, Method::GET | Method::PUT | Method::DELETE)
    }

    /// Whether `error`, seen on attempt number `attempt` (1-based), earns
    /// another attempt.
    ///
    /// Authentication outcomes are final: a rejected refresh token or a
    /// provider without a token will not recover by waiting.
    pub fn should_retry(&self, error: &TsheetsError, attempt: u32) -> bool {
        attempt < self.max_attempts && error.is_retryable()
    }

    /// Wait before attempt `attempt + 1`: exponential, jittered to 50-100%.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let ceiling = self
            .initial_backoff
            .saturating_mul(1 << exponent)
            .min(self.max_backoff);
        ceiling.mul_f64(0.5 + jitter() * 0.5)
    }

    /// Drive `operation` until it succeeds, fails terminally, or the attempts
    /// run out. `what` names the call in log output.
    pub async fn run<F, Fut, T>(&self, what: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if self.should_retry(&err, attempt) => {
                    let delay = self.backoff(attempt);
                    warn!(
                        call = what,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Uniform-ish factor in [0, 1).
fn jitter() -> f64 {
    (Uuid::new_v4().as_u128() % 10_000) as f64 / 10_000.0
}
