//! Typed errors for the retrieval library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.

use thiserror::Error;

/// Errors that can occur during indexing and retrieval operations.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Unknown or incompatible chunker, retriever, store type, or
    /// embedding-dimension mismatch. Surfaced immediately, never retried.
    #[error("config error: {reason}")]
    Config { reason: String },

    /// A capability provider (embedder, LLM, reranker) is not configured.
    /// Degrades the affected feature rather than failing the whole request.
    #[error("provider not configured: {provider}")]
    ProviderUnavailable { provider: String },

    /// Storage operation failed.
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Embedding generation failed.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Chat completion failed for a transient reason. Distinct from
    /// [`RetrievalError::ProviderUnavailable`].
    #[error("completion error: {0}")]
    Completion(String),

    /// Rerank call failed.
    #[error("rerank error: {0}")]
    Rerank(String),

    /// ACL trimming removed every result. Distinct from an ordinary
    /// empty result set.
    #[error("access denied: all results removed by access control")]
    AccessDenied,

    /// Document not found in store.
    #[error("document not found: {id}")]
    DocumentNotFound { id: String },

    /// Invalid query provided.
    #[error("invalid query: {reason}")]
    InvalidQuery { reason: String },
}

impl RetrievalError {
    /// Shorthand for a configuration error.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Shorthand for a provider-unavailable error.
    pub fn unavailable(provider: impl Into<String>) -> Self {
        Self::ProviderUnavailable {
            provider: provider.into(),
        }
    }

    /// Whether this error marks an unconfigured provider (as opposed to a
    /// transient failure of a configured one).
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::ProviderUnavailable { .. })
    }
}

/// Result type alias for retrieval operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;
