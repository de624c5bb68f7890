//! Error types for the retrieval core.
//!
//! Every fallible operation in this crate returns [`Result`], whose error
//! side is the kind-tagged [`Error`] enum. Callers can therefore tell
//! "nothing relevant was found" (an empty `Ok`) apart from "the system could
//! not answer" (an `Err`), and can branch on the variant rather than on
//! message text.
//!
//! # Error Categories
//!
//! | Variant | Raised by | Retried? |
//! |---------|-----------|----------|
//! | [`Error::InvalidConfiguration`] | chunker / index construction, bad `k` or threshold | never |
//! | [`Error::ProviderTransient`] | embedding providers (rate limit, unavailable, network) | yes |
//! | [`Error::Timeout`] | a single embedding call exceeding its deadline | yes |
//! | [`Error::ProviderRejected`] | embedding providers (bad input, auth, malformed reply) | never |
//! | [`Error::DimensionMismatch`] | the index, when a vector's length disagrees with the corpus | never |
//! | [`Error::EmbeddingFailure`] | the retry wrapper, once a call has definitively failed | n/a |

use std::time::Duration;

/// Result type for retrieval-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Kind-tagged error for chunking, embedding, ingestion and retrieval.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Nonsensical parameters, e.g. `chunk_size <= chunk_overlap` or `k == 0`.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// Rate-limit, service-unavailable or network failure reported by a provider.
    #[error("embedding provider temporarily unavailable: {message}")]
    ProviderTransient { message: String },

    /// Non-retryable provider failure (bad input, authentication, malformed response).
    #[error("embedding provider rejected the request: {message}")]
    ProviderRejected { message: String },

    /// A single embedding call did not complete within its deadline.
    #[error("embedding call timed out after {0:?}")]
    Timeout(Duration),

    /// A vector's length disagrees with the dimensionality of the corpus.
    #[error("embedding has {actual} dimensions, corpus expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// An embedding call failed definitively, after `attempts` tries.
    #[error("embedding failed after {attempts} attempt(s): {source}")]
    EmbeddingFailure {
        attempts: u32,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create an [`Error::InvalidConfiguration`] with a custom message.
    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Create an [`Error::ProviderTransient`] with a custom message.
    pub fn transient<S: Into<String>>(message: S) -> Self {
        Self::ProviderTransient {
            message: message.into(),
        }
    }

    /// Create an [`Error::ProviderRejected`] with a custom message.
    pub fn rejected<S: Into<String>>(message: S) -> Self {
        Self::ProviderRejected {
            message: message.into(),
        }
    }

    /// Whether a retry of the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ProviderTransient { .. } | Self::Timeout(_))
    }

    /// Stable machine-readable tag for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfiguration { .. } => "invalid_configuration",
            Self::ProviderTransient { .. } => "provider_transient",
            Self::ProviderRejected { .. } => "provider_rejected",
            Self::Timeout(_) => "timeout",
            Self::DimensionMismatch { .. } => "dimension_mismatch",
            Self::EmbeddingFailure { .. } => "embedding_failure",
        }
    }
}
