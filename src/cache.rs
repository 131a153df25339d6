//! TTL caches for corpora, query results, and KB configuration.
//!
//! Entries expire lazily on read. Invalidation is explicit and keyed
//! by (tenant, KB): any document mutation invalidates every cached
//! corpus and query result that could include that KB.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::sparse::Bm25Index;
use crate::types::config::KbConfig;
use crate::types::hit::RetrievalHit;

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// A TTL map with lazy expiry.
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
}

impl<K: Eq + Hash + Clone, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Get a live entry. Expired entries are removed on the way out.
    pub async fn get(&self, key: &K) -> Option<V> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.expires_at > Instant::now() => {
                    return Some(entry.value.clone())
                }
                Some(_) => {}
                None => return None,
            }
        }
        // expired: drop it under the write lock
        self.entries.write().await.remove(key);
        None
    }

    /// Insert or replace an entry, restarting its TTL.
    pub async fn insert(&self, key: K, value: V) {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + self.ttl,
        };
        self.entries.write().await.insert(key, entry);
    }

    /// Remove one entry.
    pub async fn remove(&self, key: &K) {
        self.entries.write().await.remove(key);
    }

    /// Remove every entry whose key matches the predicate.
    pub async fn remove_where(&self, mut pred: impl FnMut(&K) -> bool) {
        self.entries.write().await.retain(|k, _| !pred(k));
    }

    /// Drop everything.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

/// Key for per-(tenant, kb set) entries. KB ids are sorted and deduped
/// so the same set always maps to the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorpusKey {
    pub tenant_id: String,
    pub kb_ids: Vec<String>,
}

impl CorpusKey {
    pub fn new(tenant_id: impl Into<String>, kb_ids: &[String]) -> Self {
        let mut kb_ids: Vec<String> = kb_ids.to_vec();
        kb_ids.sort();
        kb_ids.dedup();
        Self {
            tenant_id: tenant_id.into(),
            kb_ids,
        }
    }

    fn touches(&self, tenant_id: &str, kb_id: &str) -> bool {
        self.tenant_id == tenant_id && self.kb_ids.iter().any(|k| k == kb_id)
    }
}

/// Key for a cached query result. Includes the retriever config
/// fingerprint so a config edit never serves stale results.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub corpus: CorpusKey,
    pub query: String,
    pub top_k: usize,
    pub retriever_fingerprint: String,
}

/// TTL settings for the retrieval caches.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub corpus_ttl: Duration,
    pub query_ttl: Duration,
    pub config_ttl: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            corpus_ttl: Duration::from_secs(300),
            query_ttl: Duration::from_secs(60),
            config_ttl: Duration::from_secs(300),
        }
    }
}

/// The caches backing retrieval: materialized sparse corpora, complete
/// query results, and resolved KB configuration.
pub struct RetrievalCaches {
    pub corpus: TtlCache<CorpusKey, Arc<Bm25Index>>,
    pub queries: TtlCache<QueryKey, Arc<Vec<RetrievalHit>>>,
    pub configs: TtlCache<(String, String), Arc<KbConfig>>,
}

impl RetrievalCaches {
    pub fn new(settings: CacheSettings) -> Self {
        Self {
            corpus: TtlCache::new(settings.corpus_ttl),
            queries: TtlCache::new(settings.query_ttl),
            configs: TtlCache::new(settings.config_ttl),
        }
    }

    /// Invalidate everything that could include this KB. Called on any
    /// document mutation in it.
    pub async fn invalidate_kb(&self, tenant_id: &str, kb_id: &str) {
        self.corpus
            .remove_where(|k| k.touches(tenant_id, kb_id))
            .await;
        self.queries
            .remove_where(|k| k.corpus.touches(tenant_id, kb_id))
            .await;
        self.configs
            .remove(&(tenant_id.to_string(), kb_id.to_string()))
            .await;
    }
}

impl Default for RetrievalCaches {
    fn default() -> Self {
        Self::new(CacheSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_then_get() {
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_secs(60));
        cache.insert("a".into(), 1).await;
        assert_eq!(cache.get(&"a".into()).await, Some(1));
        assert_eq!(cache.get(&"b".into()).await, None);
    }

    #[tokio::test]
    async fn test_expired_entry_misses() {
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::ZERO);
        cache.insert("a".into(), 1).await;
        assert_eq!(cache.get(&"a".into()).await, None);
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_clear_drops_everything() {
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_secs(60));
        cache.insert("a".into(), 1).await;
        cache.insert("b".into(), 2).await;
        cache.clear().await;
        assert_eq!(cache.len().await, 0);
        assert_eq!(cache.get(&"a".into()).await, None);
    }

    #[tokio::test]
    async fn test_corpus_key_order_independent() {
        let a = CorpusKey::new("t", &["kb2".into(), "kb1".into()]);
        let b = CorpusKey::new("t", &["kb1".into(), "kb2".into(), "kb1".into()]);
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_invalidate_kb_clears_touching_entries() {
        let caches = RetrievalCaches::default();
        let key = QueryKey {
            corpus: CorpusKey::new("t", &["kb1".into(), "kb2".into()]),
            query: "q".into(),
            top_k: 5,
            retriever_fingerprint: "dense:abc".into(),
        };
        caches
            .queries
            .insert(key.clone(), Arc::new(Vec::new()))
            .await;
        let other = QueryKey {
            corpus: CorpusKey::new("t", &["kb3".into()]),
            ..key.clone()
        };
        caches
            .queries
            .insert(other.clone(), Arc::new(Vec::new()))
            .await;

        caches.invalidate_kb("t", "kb2").await;
        assert!(caches.queries.get(&key).await.is_none());
        assert!(caches.queries.get(&other).await.is_some());
    }

    #[tokio::test]
    async fn test_invalidation_respects_tenant() {
        let caches = RetrievalCaches::default();
        let key = CorpusKey::new("tenant-a", &["kb1".into()]);
        caches
            .corpus
            .insert(key.clone(), Arc::new(Bm25Index::new(1.5, 0.75)))
            .await;
        caches.invalidate_kb("tenant-b", "kb1").await;
        assert!(caches.corpus.get(&key).await.is_some());
    }
}
