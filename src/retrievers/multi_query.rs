//! Multi-query expansion retriever.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::error::{Result, RetrievalError};
use crate::traits::ai::ChatOptions;
use crate::types::config::ExpansionParams;
use crate::types::hit::RetrievalHit;

use super::hyde::{fallback_retrieve, fuse_variants, parse_variants};
use super::{Retriever, RetrieverDeps};

const MULTI_QUERY_PROMPT: &str = "Rewrite the search query below as {n} alternative queries \
(paraphrases or sub-questions), one per line. Output only the queries, no numbering.\n\n\
Query: {query}";

/// Expands the query into paraphrases and sub-questions, retrieves per
/// variant, and RRF-fuses the results.
///
/// Same degradation contract as HyDE: no chat provider or a failed
/// generation falls back to the original query, flagged `fallback`.
pub struct MultiQueryRetriever {
    deps: RetrieverDeps,
    params: ExpansionParams,
    inner: Arc<dyn Retriever>,
}

impl MultiQueryRetriever {
    pub fn new(deps: RetrieverDeps, params: ExpansionParams, inner: Arc<dyn Retriever>) -> Self {
        Self { deps, params, inner }
    }

    async fn generate_variants(&self, query: &str) -> Result<Vec<String>> {
        let chat = self
            .deps
            .chat
            .as_ref()
            .ok_or_else(|| RetrievalError::unavailable("chat"))?;
        let prompt = MULTI_QUERY_PROMPT
            .replace("{n}", &self.params.num_variants.to_string())
            .replace("{query}", query);
        let response = chat.complete(&prompt, &ChatOptions::default()).await?;
        Ok(parse_variants(&response, self.params.num_variants))
    }
}

#[async_trait]
impl Retriever for MultiQueryRetriever {
    async fn retrieve(
        &self,
        query: &str,
        tenant_id: &str,
        kb_ids: &[String],
        top_k: usize,
    ) -> Result<Vec<RetrievalHit>> {
        let mut variants = match self.generate_variants(query).await {
            Ok(v) if !v.is_empty() => v,
            Ok(_) | Err(_) => {
                warn!("query expansion unavailable, falling back to original query");
                return fallback_retrieve(&self.inner, query, tenant_id, kb_ids, top_k).await;
            }
        };
        if self.params.keep_original {
            variants.push(query.to_string());
        }
        fuse_variants(
            &self.inner,
            variants,
            tenant_id,
            kb_ids,
            top_k,
            self.params.rrf_k,
        )
        .await
    }

    fn name(&self) -> &'static str {
        "multi_query"
    }
}
