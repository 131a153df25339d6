//! Two-retriever fusion with optional reranking.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::error::Result;
use crate::types::config::{FusionMode, FusionParams};
use crate::types::hit::RetrievalHit;

use super::{rrf_fuse, weighted_fuse, Retriever, RetrieverDeps};

/// Fuses two named sub-retrievers by RRF or weighted sum, optionally
/// reranking the top candidates before truncation.
///
/// A failing branch degrades to an empty contribution; the error
/// propagates only if both branches fail.
pub struct FusionRetriever {
    deps: RetrieverDeps,
    params: FusionParams,
    first: Arc<dyn Retriever>,
    second: Arc<dyn Retriever>,
}

impl FusionRetriever {
    pub fn new(
        deps: RetrieverDeps,
        params: FusionParams,
        first: Arc<dyn Retriever>,
        second: Arc<dyn Retriever>,
    ) -> Self {
        Self {
            deps,
            params,
            first,
            second,
        }
    }
}

#[async_trait]
impl Retriever for FusionRetriever {
    async fn retrieve(
        &self,
        query: &str,
        tenant_id: &str,
        kb_ids: &[String],
        top_k: usize,
    ) -> Result<Vec<RetrievalHit>> {
        let fetch = if self.params.rerank {
            top_k.max(self.params.rerank_candidates)
        } else {
            top_k.saturating_mul(2).max(top_k)
        };

        let (first, second) = tokio::join!(
            self.first.retrieve(query, tenant_id, kb_ids, fetch),
            self.second.retrieve(query, tenant_id, kb_ids, fetch),
        );

        let (first, second) = match (first, second) {
            (Ok(a), Ok(b)) => (a, b),
            (Ok(a), Err(e)) => {
                warn!(branch = self.second.name(), error = %e, "fusion branch failed");
                (a, Vec::new())
            }
            (Err(e), Ok(b)) => {
                warn!(branch = self.first.name(), error = %e, "fusion branch failed");
                (Vec::new(), b)
            }
            (Err(e), Err(_)) => return Err(e),
        };

        let (w1, w2) = self.params.weights;
        let mut fused = match self.params.mode {
            FusionMode::Rrf => rrf_fuse(vec![(first, w1), (second, w2)], self.params.rrf_k),
            FusionMode::Weighted => weighted_fuse(vec![(first, w1), (second, w2)]),
        };

        if self.params.rerank {
            if let Some(reranker) = &self.deps.reranker {
                let candidates: Vec<RetrievalHit> = fused
                    .iter()
                    .take(self.params.rerank_candidates)
                    .cloned()
                    .collect();
                match reranker.rerank(query, candidates, top_k).await {
                    Ok(reranked) => return Ok(reranked),
                    Err(e) => {
                        warn!(error = %e, "rerank failed, keeping fused order");
                    }
                }
            }
        }

        fused.truncate(top_k);
        Ok(fused)
    }

    fn name(&self) -> &'static str {
        "fusion"
    }
}
