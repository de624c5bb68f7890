//! Timeout and exponential-backoff retry around an [`Embedder`].
//!
//! - [`Error::ProviderTransient`] and [`Error::Timeout`] → retry
//! - anything else → fail immediately
//! - backoff: `initial_backoff`, then doubling (1s, 2s, 4s with the defaults)
//! - every attempt, retries included, first takes a slot from the
//!   [`RateLimiter`]
//!
//! Whatever the cause, a definitive failure is reported as
//! [`Error::EmbeddingFailure`] carrying the attempt count and the last
//! underlying error.

use std::time::Duration;

use async_trait::async_trait;

use crate::embedding::Embedder;
use crate::error::{Error, Result};
use crate::limiter::RateLimiter;

/// Retry settings for embedding calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; `0` disables retrying.
    pub max_retries: u32,
    /// Delay before the first retry; doubles for every further retry.
    pub initial_backoff: Duration,
    /// Deadline for each individual attempt.
    pub timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(1000),
            timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (zero-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(1u32.checked_shl(retry.min(31)).unwrap_or(u32::MAX))
    }
}

/// An [`Embedder`] that bounds every call by a timeout and retries
/// transient failures.
pub struct RetryingEmbedder<E> {
    inner: E,
    policy: RetryPolicy,
    limiter: RateLimiter,
}

impl<E: Embedder> RetryingEmbedder<E> {
    /// Wrap `inner` with `policy` and no request pacing.
    pub fn new(inner: E, policy: RetryPolicy) -> Self {
        Self {
            inner,
            policy,
            limiter: RateLimiter::unlimited(),
        }
    }

    /// Pace every attempt through `limiter`.
    pub fn with_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    async fn attempt(&self, text: &str) -> Result<Vec<f32>> {
        // Waiting for a slot does not count against the deadline.
        self.limiter.acquire().await;
        match self.policy.timeout {
            Some(limit) => match tokio::time::timeout(limit, self.inner.embed(text)).await {
                Ok(result) => result,
                Err(_) => Err(Error::Timeout(limit)),
            },
            None => self.inner.embed(text).await,
        }
    }
}

#[async_trait]
impl<E: Embedder> Embedder for RetryingEmbedder<E> {
    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut attempt: u32 = 0;
        loop {
            match self.attempt(text).await {
                Ok(vector) if vector.is_empty() => {
                    return Err(Error::EmbeddingFailure {
                        attempts: attempt + 1,
                        source: Box::new(Error::rejected("provider returned an empty embedding")),
                    });
                }
                Ok(vector) => return Ok(vector),
                Err(err) if err.is_transient() && attempt < self.policy.max_retries => {
                    let delay = self.policy.backoff(attempt);
                    tracing::warn!(
                        model = self.inner.model_name(),
                        attempt = attempt + 1,
                        max_retries = self.policy.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "embedding call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    return Err(Error::EmbeddingFailure {
                        attempts: attempt + 1,
                        source: Box::new(err),
                    });
                }
            }
        }
    }
}
