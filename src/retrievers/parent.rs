//! Parent-document retriever: context expansion.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::error::Result;
use crate::types::chunk::meta;
use crate::types::hit::RetrievalHit;

use super::{Retriever, RetrieverDeps};

/// Retrieves small child chunks for precision, then swaps each matched
/// child for its parent's full text, keeping the child's score.
///
/// Multiple children of one parent deduplicate to the best-ranked one.
/// A child whose parent cannot be resolved is returned unexpanded and
/// flagged `parent_not_found`. Hits without a parent link pass through.
pub struct ParentRetriever {
    deps: RetrieverDeps,
    inner: Arc<dyn Retriever>,
}

impl ParentRetriever {
    pub fn new(deps: RetrieverDeps, inner: Arc<dyn Retriever>) -> Self {
        Self { deps, inner }
    }
}

#[async_trait]
impl Retriever for ParentRetriever {
    async fn retrieve(
        &self,
        query: &str,
        tenant_id: &str,
        kb_ids: &[String],
        top_k: usize,
    ) -> Result<Vec<RetrievalHit>> {
        // children collapse onto parents, so over-fetch
        let fetch = top_k.saturating_mul(3).max(top_k);
        let children = self.inner.retrieve(query, tenant_id, kb_ids, fetch).await?;

        let mut seen_parents: HashSet<String> = HashSet::new();
        let mut out: Vec<RetrievalHit> = Vec::new();

        for mut hit in children {
            if out.len() >= top_k {
                break;
            }
            let Some(parent_id) = hit
                .metadata
                .get(meta::PARENT_ID)
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
            else {
                out.push(hit);
                continue;
            };

            // best-ranked child per parent wins
            if !seen_parents.insert(parent_id.clone()) {
                continue;
            }

            match self.deps.store.get_chunk(tenant_id, &parent_id).await? {
                Some(parent) => {
                    let mut expanded = RetrievalHit::new(
                        parent.id,
                        parent.text,
                        hit.score,
                        parent.kb_id,
                        parent.document_id,
                    )
                    .with_metadata(parent.metadata);
                    expanded.generated_queries = hit.generated_queries.take();
                    out.push(expanded);
                }
                None => {
                    warn!(parent_id = parent_id.as_str(), "parent chunk not found");
                    hit.mark(meta::PARENT_NOT_FOUND);
                    out.push(hit);
                }
            }
        }
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "parent"
    }
}
