//! Hybrid dense + sparse retriever.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::config::{HybridParams, SparseParams};
use crate::types::hit::RetrievalHit;

use super::{weighted_fuse, DenseRetriever, Retriever, RetrieverDeps, SparseRetriever};

/// Runs dense and sparse retrieval concurrently and merges by chunk id,
/// summing `score * weight` per source (default 0.7 dense, 0.3 sparse).
pub struct HybridRetriever {
    dense: Arc<DenseRetriever>,
    sparse: Arc<SparseRetriever>,
    params: HybridParams,
}

impl HybridRetriever {
    pub fn new(deps: RetrieverDeps, params: HybridParams) -> Self {
        Self {
            dense: Arc::new(DenseRetriever::new(deps.clone())),
            sparse: Arc::new(SparseRetriever::new(deps, SparseParams::default())),
            params,
        }
    }
}

#[async_trait]
impl Retriever for HybridRetriever {
    async fn retrieve(
        &self,
        query: &str,
        tenant_id: &str,
        kb_ids: &[String],
        top_k: usize,
    ) -> Result<Vec<RetrievalHit>> {
        // fetch extra candidates so a hit strong in only one source can
        // still make the merged top_k
        let fetch = top_k.saturating_mul(2).max(top_k);
        let (dense, sparse) = tokio::join!(
            self.dense.retrieve(query, tenant_id, kb_ids, fetch),
            self.sparse.retrieve(query, tenant_id, kb_ids, fetch),
        );

        let mut fused = weighted_fuse(vec![
            (dense?, self.params.dense_weight),
            (sparse?, self.params.sparse_weight),
        ]);
        fused.truncate(top_k);
        Ok(fused)
    }

    fn name(&self) -> &'static str {
        "hybrid"
    }
}
