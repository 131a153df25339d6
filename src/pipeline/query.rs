//! Query pipeline - resolve config, retrieve, filter, and cache.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::acl;
use crate::cache::{CorpusKey, QueryKey, RetrievalCaches};
use crate::error::{Result, RetrievalError};
use crate::registry::OperatorRegistry;
use crate::retrievers::{self_query, RetrieverDeps};
use crate::types::config::KbConfig;
use crate::types::hit::RetrievalHit;
use crate::types::user::UserContext;

/// Source of per-KB configuration, typically backed by a control-plane
/// store. Results are cached by the orchestrator.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn kb_config(&self, tenant_id: &str, kb_id: &str) -> Result<KbConfig>;
}

/// A config source serving one fixed configuration for every KB.
pub struct StaticConfigSource {
    config: KbConfig,
}

impl StaticConfigSource {
    pub fn new(config: KbConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ConfigSource for StaticConfigSource {
    async fn kb_config(&self, _tenant_id: &str, _kb_id: &str) -> Result<KbConfig> {
        Ok(self.config.clone())
    }
}

/// One retrieval request.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub query: String,
    pub tenant_id: String,
    pub kb_ids: Vec<String>,
    pub top_k: usize,

    /// Requesting user; `None` means a trusted internal caller and
    /// skips access trimming.
    pub user: Option<UserContext>,

    /// Exact-match metadata filters applied to hits.
    pub filters: serde_json::Map<String, serde_json::Value>,
}

impl QueryRequest {
    pub fn new(
        query: impl Into<String>,
        tenant_id: impl Into<String>,
        kb_ids: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            query: query.into(),
            tenant_id: tenant_id.into(),
            kb_ids: kb_ids.into_iter().map(|k| k.into()).collect(),
            top_k: 10,
            user: None,
            filters: serde_json::Map::new(),
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_user(mut self, user: UserContext) -> Self {
        self.user = Some(user);
        self
    }

    pub fn with_filter(
        mut self,
        field: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.filters.insert(field.into(), value.into());
        self
    }
}

/// Runs retrieval requests end to end: config resolution, retriever
/// construction through the registry, metadata filtering, access
/// trimming, and result caching.
///
/// Query results are cached only for internal callers (no user). A
/// user-scoped result depends on that user's access, so caching it
/// under a user-agnostic key would leak across users.
pub struct QueryOrchestrator {
    deps: RetrieverDeps,
    registry: Arc<OperatorRegistry>,
    configs: Arc<dyn ConfigSource>,
}

impl QueryOrchestrator {
    pub fn new(
        deps: RetrieverDeps,
        registry: Arc<OperatorRegistry>,
        configs: Arc<dyn ConfigSource>,
    ) -> Self {
        Self {
            deps,
            registry,
            configs,
        }
    }

    pub async fn query(&self, request: &QueryRequest) -> Result<Vec<RetrievalHit>> {
        if request.query.trim().is_empty() {
            return Err(RetrievalError::InvalidQuery {
                reason: "query text is empty".to_string(),
            });
        }
        if request.top_k == 0 {
            return Err(RetrievalError::InvalidQuery {
                reason: "top_k must be positive".to_string(),
            });
        }
        if request.kb_ids.is_empty() {
            return Err(RetrievalError::InvalidQuery {
                reason: "no knowledge bases selected".to_string(),
            });
        }

        let config = self.resolve_config(request).await?;
        let cache_key = QueryKey {
            corpus: CorpusKey::new(&request.tenant_id, &request.kb_ids),
            query: request.query.clone(),
            top_k: request.top_k,
            retriever_fingerprint: config.retriever.fingerprint(),
        };

        let cacheable = request.user.is_none() && request.filters.is_empty();
        if cacheable {
            if let Some(hits) = self.caches().queries.get(&cache_key).await {
                debug!(query = %request.query, "query cache hit");
                return Ok(hits.as_ref().clone());
            }
        }

        let retriever = self
            .registry
            .resolve_retriever(&config.retriever, &self.deps)?;
        let fetch = if request.filters.is_empty() {
            request.top_k
        } else {
            // over-fetch so filtering still leaves enough hits
            request.top_k * 4
        };
        let mut hits = retriever
            .retrieve(&request.query, &request.tenant_id, &request.kb_ids, fetch)
            .await?;

        if !request.filters.is_empty() {
            hits.retain(|h| self_query::matches_filters(h, &request.filters));
            hits.truncate(request.top_k);
        }

        if let Some(user) = &request.user {
            hits = acl::trim_hits(
                self.deps.store.as_ref(),
                &request.tenant_id,
                user,
                hits,
            )
            .await?;
        }

        if cacheable {
            self.caches()
                .queries
                .insert(cache_key, Arc::new(hits.clone()))
                .await;
        }
        Ok(hits)
    }

    async fn resolve_config(&self, request: &QueryRequest) -> Result<Arc<KbConfig>> {
        // multi-KB queries take the first KB's retriever configuration
        let kb_id = &request.kb_ids[0];
        let key = (request.tenant_id.clone(), kb_id.clone());
        if let Some(config) = self.caches().configs.get(&key).await {
            return Ok(config);
        }
        let config = match self.configs.kb_config(&request.tenant_id, kb_id).await {
            Ok(config) => Arc::new(config),
            Err(e) => {
                warn!(kb_id, error = %e, "config resolution failed, using defaults");
                Arc::new(KbConfig::default())
            }
        };
        self.caches().configs.insert(key, config.clone()).await;
        Ok(config)
    }

    fn caches(&self) -> &RetrievalCaches {
        &self.deps.caches
    }
}
