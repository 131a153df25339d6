//! Self-query retriever: LLM-extracted metadata filters.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use crate::error::Result;
use crate::traits::ai::ChatOptions;
use crate::types::chunk::meta;
use crate::types::config::SelfQueryParams;
use crate::types::hit::RetrievalHit;

use super::{Retriever, RetrieverDeps};

const SELF_QUERY_PROMPT: &str = "Split the search query below into a semantic query and \
equality filters over these metadata fields: {fields}. Respond with JSON only, shaped \
{\"query\": \"...\", \"filters\": {\"field\": \"value\"}}. Use an empty filters object \
when no field applies.\n\nQuery: {query}";

#[derive(Debug, Deserialize)]
struct ParsedQuery {
    query: String,
    #[serde(default)]
    filters: serde_json::Map<String, serde_json::Value>,
}

/// Splits the query into a semantic sub-query plus an equality filter
/// map restricted to a field whitelist, then post-filters inner hits.
///
/// Unparseable LLM output (or no chat provider) degrades to the raw
/// query with empty filters, flagged `fallback`.
pub struct SelfQueryRetriever {
    deps: RetrieverDeps,
    params: SelfQueryParams,
    inner: Arc<dyn Retriever>,
}

impl SelfQueryRetriever {
    pub fn new(deps: RetrieverDeps, params: SelfQueryParams, inner: Arc<dyn Retriever>) -> Self {
        Self { deps, params, inner }
    }

    async fn parse_query(
        &self,
        query: &str,
    ) -> Option<(String, serde_json::Map<String, serde_json::Value>)> {
        let chat = self.deps.chat.as_ref()?;
        let prompt = SELF_QUERY_PROMPT
            .replace("{fields}", &self.params.allowed_fields.join(", "))
            .replace("{query}", query);
        let response = match chat.complete(&prompt, &ChatOptions::default()).await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "self-query generation failed");
                return None;
            }
        };
        let parsed: ParsedQuery = match serde_json::from_str(response.trim()) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "self-query output unparseable");
                return None;
            }
        };

        // only whitelisted fields survive
        let filters: serde_json::Map<String, serde_json::Value> = parsed
            .filters
            .into_iter()
            .filter(|(field, _)| self.params.allowed_fields.iter().any(|f| f == field))
            .collect();
        Some((parsed.query, filters))
    }
}

/// Whether a hit's metadata matches every equality filter.
pub(crate) fn matches_filters(
    hit: &RetrievalHit,
    filters: &serde_json::Map<String, serde_json::Value>,
) -> bool {
    filters
        .iter()
        .all(|(field, value)| hit.metadata.get(field) == Some(value))
}

#[async_trait]
impl Retriever for SelfQueryRetriever {
    async fn retrieve(
        &self,
        query: &str,
        tenant_id: &str,
        kb_ids: &[String],
        top_k: usize,
    ) -> Result<Vec<RetrievalHit>> {
        let (sub_query, filters, degraded) = match self.parse_query(query).await {
            Some((q, f)) => (q, f, false),
            None => (query.to_string(), serde_json::Map::new(), true),
        };

        let fetch = if filters.is_empty() {
            top_k
        } else {
            // filters remove candidates after retrieval, so over-fetch
            top_k.saturating_mul(4).max(top_k)
        };
        let mut hits = self
            .inner
            .retrieve(&sub_query, tenant_id, kb_ids, fetch)
            .await?;
        hits.retain(|h| matches_filters(h, &filters));
        hits.truncate(top_k);

        if degraded {
            for hit in &mut hits {
                hit.mark(meta::FALLBACK);
            }
        }
        Ok(hits)
    }

    fn name(&self) -> &'static str {
        "self_query"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit_with_meta(id: &str, field: &str, value: &str) -> RetrievalHit {
        let mut hit = RetrievalHit::new(id, "text", 0.5, "kb", "doc");
        hit.metadata.insert(field.into(), value.into());
        hit
    }

    #[test]
    fn test_matches_filters() {
        let hit = hit_with_meta("a", "language", "rust");
        let mut filters = serde_json::Map::new();
        assert!(matches_filters(&hit, &filters));

        filters.insert("language".into(), "rust".into());
        assert!(matches_filters(&hit, &filters));

        filters.insert("language".into(), "go".into());
        assert!(!matches_filters(&hit, &filters));

        let mut missing = serde_json::Map::new();
        missing.insert("author".into(), "x".into());
        assert!(!matches_filters(&hit, &missing));
    }
}
