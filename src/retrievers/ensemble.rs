//! Ensemble of weighted sub-retrievers.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::warn;

use crate::error::{Result, RetrievalError};
use crate::types::config::{EnsembleParams, FusionMode};
use crate::types::hit::RetrievalHit;

use super::{rrf_fuse, weighted_fuse, Retriever};

/// Runs arbitrary sub-retrievers (parallel or serial) and fuses their
/// lists by RRF or weighted sum.
///
/// A failing member becomes an empty contribution and never aborts the
/// ensemble; the error propagates only when every member fails.
pub struct EnsembleRetriever {
    params: EnsembleParams,
    members: Vec<(Arc<dyn Retriever>, f32)>,
}

impl EnsembleRetriever {
    pub fn new(params: EnsembleParams, members: Vec<(Arc<dyn Retriever>, f32)>) -> Self {
        Self { params, members }
    }
}

#[async_trait]
impl Retriever for EnsembleRetriever {
    async fn retrieve(
        &self,
        query: &str,
        tenant_id: &str,
        kb_ids: &[String],
        top_k: usize,
    ) -> Result<Vec<RetrievalHit>> {
        let fetch = top_k.saturating_mul(2).max(top_k);

        let results: Vec<Result<Vec<RetrievalHit>>> = if self.params.parallel {
            join_all(
                self.members
                    .iter()
                    .map(|(member, _)| member.retrieve(query, tenant_id, kb_ids, fetch)),
            )
            .await
        } else {
            let mut results = Vec::with_capacity(self.members.len());
            for (member, _) in &self.members {
                results.push(member.retrieve(query, tenant_id, kb_ids, fetch).await);
            }
            results
        };

        let mut lists: Vec<(Vec<RetrievalHit>, f32)> = Vec::with_capacity(results.len());
        let mut first_error: Option<RetrievalError> = None;
        let mut any_ok = false;
        for (result, (member, weight)) in results.into_iter().zip(&self.members) {
            match result {
                Ok(hits) => {
                    any_ok = true;
                    lists.push((hits, *weight));
                }
                Err(e) => {
                    warn!(member = member.name(), error = %e, "ensemble member failed");
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                    lists.push((Vec::new(), *weight));
                }
            }
        }
        if !any_ok {
            if let Some(e) = first_error {
                return Err(e);
            }
        }

        let mut fused = match self.params.mode {
            FusionMode::Rrf => rrf_fuse(lists, self.params.rrf_k),
            FusionMode::Weighted => weighted_fuse(lists),
        };
        fused.truncate(top_k);
        Ok(fused)
    }

    fn name(&self) -> &'static str {
        "ensemble"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedHits(Vec<RetrievalHit>);

    #[async_trait]
    impl Retriever for FixedHits {
        async fn retrieve(
            &self,
            _query: &str,
            _tenant_id: &str,
            _kb_ids: &[String],
            top_k: usize,
        ) -> Result<Vec<RetrievalHit>> {
            Ok(self.0.iter().take(top_k).cloned().collect())
        }

        fn name(&self) -> &'static str {
            "fixed-hits"
        }
    }

    struct AlwaysFails;

    #[async_trait]
    impl Retriever for AlwaysFails {
        async fn retrieve(
            &self,
            _query: &str,
            _tenant_id: &str,
            _kb_ids: &[String],
            _top_k: usize,
        ) -> Result<Vec<RetrievalHit>> {
            Err(RetrievalError::Embedding("member down".into()))
        }

        fn name(&self) -> &'static str {
            "always-fails"
        }
    }

    fn hit(id: &str, score: f32) -> RetrievalHit {
        RetrievalHit::new(id, format!("text {}", id), score, "kb", "doc")
    }

    fn params(parallel: bool) -> EnsembleParams {
        EnsembleParams {
            members: Vec::new(),
            mode: FusionMode::Rrf,
            rrf_k: 60.0,
            parallel,
        }
    }

    #[tokio::test]
    async fn test_failing_member_becomes_empty_contribution() {
        let members: Vec<(Arc<dyn Retriever>, f32)> = vec![
            (Arc::new(FixedHits(vec![hit("a", 0.9), hit("b", 0.5)])), 1.0),
            (Arc::new(AlwaysFails), 1.0),
        ];
        let retriever = EnsembleRetriever::new(params(true), members);
        let hits = retriever.retrieve("q", "t", &["kb".into()], 5).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_serial_execution_also_degrades() {
        let members: Vec<(Arc<dyn Retriever>, f32)> = vec![
            (Arc::new(AlwaysFails), 1.0),
            (Arc::new(FixedHits(vec![hit("a", 0.9)])), 1.0),
        ];
        let retriever = EnsembleRetriever::new(params(false), members);
        let hits = retriever.retrieve("q", "t", &["kb".into()], 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk_id, "a");
    }

    #[tokio::test]
    async fn test_every_member_failing_propagates() {
        let members: Vec<(Arc<dyn Retriever>, f32)> =
            vec![(Arc::new(AlwaysFails), 1.0), (Arc::new(AlwaysFails), 2.0)];
        let retriever = EnsembleRetriever::new(params(true), members);
        let err = retriever
            .retrieve("q", "t", &["kb".into()], 5)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, RetrievalError::Embedding(_)));
    }
}
