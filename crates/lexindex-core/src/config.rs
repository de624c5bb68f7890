//! Index construction parameters.
//!
//! [`IndexConfig`] is process-wide in normal use (every document is chunked
//! and embedded the same way) but is passed explicitly to
//! [`Index::new`](crate::index::Index::new) so tests can build independent
//! indexes with different settings.

use std::time::Duration;

use serde::Deserialize;

use crate::chunk::Chunker;
use crate::error::{Error, Result};
use crate::retry::RetryPolicy;
use crate::search::DEFAULT_RELEVANCE_THRESHOLD;

/// What to do with earlier chunks when a document id is ingested again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReingestPolicy {
    /// Drop the id's previous chunks in the same step that appends the new ones.
    #[default]
    Replace,
    /// Keep previous chunks alongside the new ones.
    Append,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Characters per chunk.
    pub chunk_size: usize,
    /// Characters shared by consecutive chunks.
    pub chunk_overlap: usize,
    /// Minimum (exclusive) similarity for a chunk to be returned.
    pub relevance_threshold: f32,
    /// Retries for transient embedding failures.
    pub max_retries: u32,
    /// Delay before the first retry, doubling per retry.
    pub initial_backoff_ms: u64,
    /// Deadline for each embedding call; `0` disables it.
    pub embed_timeout_secs: u64,
    /// Embedding calls in flight per ingestion.
    pub concurrency: usize,
    /// Minimum spacing between embedding request starts; `0` disables pacing.
    pub min_request_interval_ms: u64,
    pub reingest: ReingestPolicy,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            relevance_threshold: DEFAULT_RELEVANCE_THRESHOLD,
            max_retries: 3,
            initial_backoff_ms: 1000,
            embed_timeout_secs: 30,
            concurrency: 1,
            min_request_interval_ms: 0,
            reingest: ReingestPolicy::Replace,
        }
    }
}

impl IndexConfig {
    /// Check every parameter, returning the validated [`Chunker`].
    pub fn validate(&self) -> Result<Chunker> {
        let chunker = Chunker::new(self.chunk_size, self.chunk_overlap)?;
        if self.concurrency == 0 {
            return Err(Error::invalid_config("concurrency must be >= 1"));
        }
        if !self.relevance_threshold.is_finite()
            || !(-1.0..=1.0).contains(&self.relevance_threshold)
        {
            return Err(Error::invalid_config(format!(
                "relevance_threshold must be within [-1.0, 1.0], got {}",
                self.relevance_threshold
            )));
        }
        Ok(chunker)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            timeout: (self.embed_timeout_secs > 0)
                .then(|| Duration::from_secs(self.embed_timeout_secs)),
        }
    }

    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = IndexConfig::default();
        assert_eq!(cfg.chunk_size, 1000);
        assert_eq!(cfg.chunk_overlap, 200);
        assert_eq!(cfg.relevance_threshold, 0.3);
        let policy = cfg.retry_policy();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.initial_backoff, Duration::from_millis(1000));
        assert_eq!(policy.timeout, Some(Duration::from_secs(30)));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_rejects_nonsense() {
        let bad_chunks = IndexConfig {
            chunk_size: 100,
            chunk_overlap: 100,
            ..IndexConfig::default()
        };
        assert!(matches!(
            bad_chunks.validate(),
            Err(Error::InvalidConfiguration { .. })
        ));

        let bad_workers = IndexConfig {
            concurrency: 0,
            ..IndexConfig::default()
        };
        assert!(bad_workers.validate().is_err());

        let bad_threshold = IndexConfig {
            relevance_threshold: 2.0,
            ..IndexConfig::default()
        };
        assert!(bad_threshold.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_disables_deadline() {
        let cfg = IndexConfig {
            embed_timeout_secs: 0,
            ..IndexConfig::default()
        };
        assert_eq!(cfg.retry_policy().timeout, None);
    }

    #[test]
    fn test_deserialize_partial() {
        let cfg: IndexConfig =
            serde_json::from_str(r#"{"chunk_size": 500, "reingest": "append"}"#).unwrap();
        assert_eq!(cfg.chunk_size, 500);
        assert_eq!(cfg.chunk_overlap, 200);
        assert_eq!(cfg.reingest, ReingestPolicy::Append);
    }
}
