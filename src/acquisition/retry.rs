//! Retry policy and executor.
//!
//! A policy is owned per call: attempts, a fixed delay between attempts and a
//! predicate deciding whether an error is worth another try. Permanent errors
//! short-circuit without consuming the remaining attempts.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use super::domain::AcquireError;

/// Message fragments that mark an error as structural rather than transient.
const PERMANENT_MARKERS: &[&str] = &["invalid", "unavailable", "too large", "not found"];

/// Retry policy for a fallible operation.
pub struct RetryPolicy<E> {
    /// Total attempts including the first one (>= 1)
    pub max_attempts: u32,
    /// Pause between attempts
    pub delay: Duration,
    /// Whether an error may be retried
    pub is_retryable: fn(&E) -> bool,
}

// Manual impls: derive would require `E: Clone`.
impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for RetryPolicy<E> {}

impl<E> std::fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("delay", &self.delay)
            .finish()
    }
}

impl<E> RetryPolicy<E> {
    pub fn new(max_attempts: u32, delay: Duration, is_retryable: fn(&E) -> bool) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            is_retryable,
        }
    }
}

impl RetryPolicy<AcquireError> {
    /// Policy around the source fetch step: 3 attempts, 2s apart.
    pub fn source_fetch() -> Self {
        Self::new(3, Duration::from_secs(2), AcquireError::is_retryable)
    }

    /// Policy around artifact delivery: 2 attempts, 3s apart.
    pub fn delivery() -> Self {
        Self::new(2, Duration::from_secs(3), AcquireError::is_retryable)
    }
}

/// True when the message indicates bad input, an exhausted source, a size
/// limit or a missing resource.
pub fn is_permanent_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    PERMANENT_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Run `operation` under `policy`, returning the first success or the last error.
pub async fn run<T, E, F, Fut>(policy: &RetryPolicy<E>, label: &str, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if !(policy.is_retryable)(&err) => {
                tracing::debug!(%label, attempt, "permanent error, not retrying: {}", err);
                return Err(err);
            }
            Err(err) if attempt >= max_attempts => {
                tracing::warn!(%label, attempt, "giving up after {} attempts: {}", attempt, err);
                return Err(err);
            }
            Err(err) => {
                tracing::warn!(
                    %label,
                    attempt,
                    max_attempts,
                    "attempt failed, retrying in {:?}: {}",
                    policy.delay,
                    err
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
        }
    }
}
