//! HyDE (hypothetical document embeddings) retriever.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::warn;

use crate::error::{Result, RetrievalError};
use crate::traits::ai::ChatOptions;
use crate::types::chunk::meta;
use crate::types::config::ExpansionParams;
use crate::types::hit::RetrievalHit;

use super::{rrf_fuse, Retriever, RetrieverDeps};

const HYDE_PROMPT: &str = "Write {n} short hypothetical passages, one per line, that would \
each plausibly answer the question below. Output only the passages, no numbering.\n\n\
Question: {query}";

/// Retrieves with LLM-drafted hypothetical answers instead of the raw
/// query, fusing per-variant results by RRF.
///
/// When no chat provider is configured or generation fails, degrades to
/// a single original-query retrieval with hits flagged `fallback`.
pub struct HydeRetriever {
    deps: RetrieverDeps,
    params: ExpansionParams,
    inner: Arc<dyn Retriever>,
}

impl HydeRetriever {
    pub fn new(deps: RetrieverDeps, params: ExpansionParams, inner: Arc<dyn Retriever>) -> Self {
        Self { deps, params, inner }
    }

    async fn generate_variants(&self, query: &str) -> Result<Vec<String>> {
        let chat = self
            .deps
            .chat
            .as_ref()
            .ok_or_else(|| RetrievalError::unavailable("chat"))?;
        let prompt = HYDE_PROMPT
            .replace("{n}", &self.params.num_variants.to_string())
            .replace("{query}", query);
        let response = chat.complete(&prompt, &ChatOptions::default()).await?;
        Ok(parse_variants(&response, self.params.num_variants))
    }
}

/// Non-empty lines, up to `limit`.
pub(crate) fn parse_variants(response: &str, limit: usize) -> Vec<String> {
    response
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .take(limit)
        .map(|l| l.to_string())
        .collect()
}

/// Retrieve per variant and RRF-fuse, recording the variants on every
/// hit. A failing variant degrades to an empty contribution; the error
/// propagates only if every variant fails.
pub(crate) async fn fuse_variants(
    inner: &Arc<dyn Retriever>,
    variants: Vec<String>,
    tenant_id: &str,
    kb_ids: &[String],
    top_k: usize,
    rrf_k: f32,
) -> Result<Vec<RetrievalHit>> {
    let fetch = top_k.saturating_mul(2).max(top_k);
    let results = join_all(
        variants
            .iter()
            .map(|v| inner.retrieve(v, tenant_id, kb_ids, fetch)),
    )
    .await;

    let mut lists = Vec::with_capacity(results.len());
    let mut first_error: Option<RetrievalError> = None;
    let mut any_ok = false;
    for (result, variant) in results.into_iter().zip(&variants) {
        match result {
            Ok(hits) => {
                any_ok = true;
                lists.push((hits, 1.0));
            }
            Err(e) => {
                warn!(variant = variant.as_str(), error = %e, "variant retrieval failed");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }
    if !any_ok {
        if let Some(e) = first_error {
            return Err(e);
        }
    }

    let mut fused = rrf_fuse(lists, rrf_k);
    fused.truncate(top_k);
    for hit in &mut fused {
        hit.generated_queries = Some(variants.clone());
    }
    Ok(fused)
}

/// Single original-query retrieval with hits flagged as fallback.
pub(crate) async fn fallback_retrieve(
    inner: &Arc<dyn Retriever>,
    query: &str,
    tenant_id: &str,
    kb_ids: &[String],
    top_k: usize,
) -> Result<Vec<RetrievalHit>> {
    let mut hits = inner.retrieve(query, tenant_id, kb_ids, top_k).await?;
    for hit in &mut hits {
        hit.mark(meta::FALLBACK);
    }
    Ok(hits)
}

#[async_trait]
impl Retriever for HydeRetriever {
    async fn retrieve(
        &self,
        query: &str,
        tenant_id: &str,
        kb_ids: &[String],
        top_k: usize,
    ) -> Result<Vec<RetrievalHit>> {
        let mut variants = match self.generate_variants(query).await {
            Ok(v) if !v.is_empty() => v,
            Ok(_) => {
                warn!("hyde generation returned no variants, falling back");
                return fallback_retrieve(&self.inner, query, tenant_id, kb_ids, top_k).await;
            }
            Err(e) => {
                warn!(error = %e, "hyde generation failed, falling back");
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
        "hyde"
    }
}
