//! AI provider traits.
//!
//! The pipeline needs three capabilities from AI providers:
//! - Embedding generation (dense retrieval, RAPTOR clustering)
//! - Chat completion (summaries, HyDE drafts, query expansion)
//! - Reranking (optional final-stage reordering)
//!
//! Each is its own trait so deployments can mix providers, and so the
//! optional ones (chat, rerank) can be absent without poisoning the
//! rest of the pipeline.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::hit::RetrievalHit;

/// Embedding generation.
///
/// Implementations must return vectors of a fixed dimensionality
/// (`dims`) for the lifetime of an index; mixing dimensionalities
/// within one knowledge base is undefined.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for one text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts.
    ///
    /// Inputs beyond `batch_limit` are split into sequential batches.
    /// The default implementation calls `embed` per text.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Vector dimensionality this provider produces.
    fn dims(&self) -> usize;

    /// Maximum texts per provider call.
    fn batch_limit(&self) -> usize {
        64
    }
}

/// Options for a chat completion call.
#[derive(Debug, Clone)]
pub struct ChatOptions {
    pub system: Option<String>,
    pub max_tokens: usize,
    pub temperature: f32,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            system: None,
            max_tokens: 1024,
            temperature: 0.0,
        }
    }
}

impl ChatOptions {
    /// Set the system prompt.
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the completion budget.
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Chat completion.
///
/// Implementations that have no provider configured should return
/// [`crate::error::RetrievalError::ProviderUnavailable`]; callers that
/// can degrade (HyDE, multi-query, enrichment) treat that error as a
/// signal to fall back rather than fail the request.
#[async_trait]
pub trait ChatCompleter: Send + Sync {
    /// Complete a prompt.
    async fn complete(&self, prompt: &str, options: &ChatOptions) -> Result<String>;
}

/// Reranking of retrieval candidates.
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Reorder candidates by relevance to the query, returning at most
    /// `top_k` hits with rerank scores.
    async fn rerank(
        &self,
        query: &str,
        candidates: Vec<RetrievalHit>,
        top_k: usize,
    ) -> Result<Vec<RetrievalHit>>;
}

/// Reranker that keeps the incoming order.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReranker;

#[async_trait]
impl Reranker for NoopReranker {
    async fn rerank(
        &self,
        _query: &str,
        candidates: Vec<RetrievalHit>,
        top_k: usize,
    ) -> Result<Vec<RetrievalHit>> {
        Ok(candidates.into_iter().take(top_k).collect())
    }
}
