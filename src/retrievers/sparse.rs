//! Sparse BM25 retriever.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::cache::CorpusKey;
use crate::error::Result;
use crate::sparse::Bm25Index;
use crate::types::config::SparseParams;
use crate::types::hit::RetrievalHit;

use super::{Retriever, RetrieverDeps};

/// Lexical retrieval over the materialized (tenant, kb set) corpus.
///
/// The corpus index is built from the chunk store on first use and
/// cached with a TTL; document mutation invalidates it.
pub struct SparseRetriever {
    deps: RetrieverDeps,
    params: SparseParams,
}

impl SparseRetriever {
    pub fn new(deps: RetrieverDeps, params: SparseParams) -> Self {
        Self { deps, params }
    }

    async fn corpus(&self, tenant_id: &str, kb_ids: &[String]) -> Result<Arc<Bm25Index>> {
        let key = CorpusKey::new(tenant_id, kb_ids);
        if let Some(index) = self.deps.caches.corpus.get(&key).await {
            return Ok(index);
        }

        let chunks = self
            .deps
            .store
            .get_chunks_for_kbs(tenant_id, kb_ids)
            .await?;
        let index = Arc::new(Bm25Index::from_chunks(
            self.params.k1,
            self.params.b,
            &chunks,
        ));
        debug!(
            tenant_id,
            chunks = index.len(),
            "built sparse corpus index"
        );
        self.deps.caches.corpus.insert(key, index.clone()).await;
        Ok(index)
    }
}

#[async_trait]
impl Retriever for SparseRetriever {
    async fn retrieve(
        &self,
        query: &str,
        tenant_id: &str,
        kb_ids: &[String],
        top_k: usize,
    ) -> Result<Vec<RetrievalHit>> {
        let index = self.corpus(tenant_id, kb_ids).await?;
        Ok(index
            .search(query, top_k)
            .into_iter()
            .map(|h| {
                RetrievalHit::new(h.chunk_id, h.text, h.score, h.kb_id, h.document_id)
                    .with_metadata(h.metadata)
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "sparse"
    }
}
