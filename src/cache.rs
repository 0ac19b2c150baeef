//! Read-through caching of the pattern index and pattern documents.
//!
//! The cache only ever saves a catalog round trip. Every backend failure is
//! logged and treated as a miss, so results are identical with or without it.

use std::{
    collections::{BTreeMap, HashMap},
    future::Future,
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use deadpool_redis::{Config as RedisPoolConfig, Pool, PoolConfig, Runtime};
use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{
    catalog::{find_category, PatternSource},
    errors::{CacheError, CatalogError},
    models::{Pattern, PatternIndex},
};

pub const INDEX_CACHE_KEY: &str = "nyko:index";
pub const PATTERN_CACHE_PREFIX: &str = "nyko:pattern:";
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

pub fn pattern_cache_key(id: &str) -> String {
    format!("{PATTERN_CACHE_PREFIX}{id}")
}

/// String key-value store with per-entry expiry.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;
}

#[derive(Debug)]
struct MemoryEntry {
    value: String,
    expires_at: Instant,
    last_used: u64,
}

/// Entries plus a recency order keyed by a monotonic use counter.
#[derive(Debug, Default)]
struct MemoryState {
    tick: u64,
    recency: BTreeMap<u64, String>,
    values: HashMap<String, MemoryEntry>,
}

impl MemoryState {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn touch(&mut self, key: &str) {
        let tick = self.next_tick();
        if let Some(entry) = self.values.get_mut(key) {
            self.recency.remove(&entry.last_used);
            entry.last_used = tick;
            self.recency.insert(tick, key.to_string());
        }
    }

    fn insert(&mut self, key: &str, value: String, expires_at: Instant) {
        let tick = self.next_tick();
        let entry = MemoryEntry {
            value,
            expires_at,
            last_used: tick,
        };
        if let Some(previous) = self.values.insert(key.to_string(), entry) {
            self.recency.remove(&previous.last_used);
        }
        self.recency.insert(tick, key.to_string());
    }

    fn remove(&mut self, key: &str) {
        if let Some(entry) = self.values.remove(key) {
            self.recency.remove(&entry.last_used);
        }
    }

    fn trim(&mut self, capacity: usize) {
        while self.values.len() > capacity {
            let Some((_, oldest)) = self.recency.pop_first() else {
                break;
            };
            self.values.remove(&oldest);
        }
    }
}

/// In-process LRU with expiry, for single-instance deployments.
#[derive(Debug)]
pub struct MemoryCache {
    capacity: usize,
    state: Mutex<MemoryState>,
}

impl MemoryCache {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(MemoryState::default()),
        }
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut state = self.state.lock().await;
        let expired = match state.values.get(key) {
            None => return Ok(None),
            Some(entry) => entry.expires_at <= Instant::now(),
        };
        if expired {
            state.remove(key);
            return Ok(None);
        }

        state.touch(key);
        Ok(state.values.get(key).map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut state = self.state.lock().await;
        state.insert(key, value, Instant::now() + ttl);
        state.trim(self.capacity);
        Ok(())
    }
}

/// Shared Redis cache, for multi-instance deployments.
pub struct RedisCache {
    pool: Pool,
}

impl RedisCache {
    pub fn new(url: &str, pool_max: usize) -> Result<Self, CacheError> {
        let mut cfg = RedisPoolConfig::from_url(url);
        cfg.pool = Some(PoolConfig::new(pool_max.max(1)));
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        conn.get(key)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))
    }
}

/// Catalog access through an optional cache backend.
#[derive(Clone)]
pub struct CacheCoordinator {
    source: Arc<dyn PatternSource>,
    backend: Option<Arc<dyn CacheBackend>>,
    ttl: Duration,
}

impl CacheCoordinator {
    pub fn new(
        source: Arc<dyn PatternSource>,
        backend: Option<Arc<dyn CacheBackend>>,
        ttl: Duration,
    ) -> Self {
        Self {
            source,
            backend,
            ttl,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let backend = self.backend.as_ref()?;
        match backend.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => Some(value),
                Err(err) => {
                    debug!(key, "Discarding undecodable cache entry: {err}");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                warn!(key, "Cache read failed: {err}");
                None
            }
        }
    }

    async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let Some(backend) = self.backend.as_ref() else {
            return;
        };
        let result = match serde_json::to_string(value) {
            Ok(raw) => backend.set(key, raw, ttl).await,
            Err(err) => Err(CacheError::from(err)),
        };
        if let Err(err) = result {
            warn!(key, "Cache write failed: {err}");
        }
    }

    pub async fn get_pattern(&self, id: &str) -> Option<Pattern> {
        self.get_json(&pattern_cache_key(id)).await
    }

    pub async fn set_pattern(&self, pattern: &Pattern) {
        self.set_json(&pattern_cache_key(&pattern.id), pattern, self.ttl)
            .await
    }

    /// Cached value for `key`, or the fetcher's result written through on a
    /// miss. A failed write never hides a successful fetch.
    pub async fn get_or_fetch<T, E, F, Fut>(
        &self,
        key: &str,
        fetcher: F,
        ttl: Duration,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(cached) = self.get_json(key).await {
            return Ok(cached);
        }

        let fresh = fetcher().await?;
        self.set_json(key, &fresh, ttl).await;
        Ok(fresh)
    }

    /// The index under `INDEX_CACHE_KEY`, fetched and written through on a miss.
    pub async fn load_index(&self) -> Result<PatternIndex, CatalogError> {
        let source = self.source.clone();
        self.get_or_fetch(
            INDEX_CACHE_KEY,
            || async move { source.fetch_index().await },
            self.ttl,
        )
        .await
    }

    /// Resolve a pattern by id: pattern cache, then index lookup for its
    /// category, then the catalog.
    pub async fn load_pattern(&self, id: &str) -> Result<Pattern, CatalogError> {
        if let Some(pattern) = self.get_pattern(id).await {
            return Ok(pattern);
        }

        let index = self.load_index().await?;
        let category =
            find_category(&index, id).ok_or_else(|| CatalogError::PatternNotFound(id.to_string()))?;

        let pattern = self.source.fetch_pattern(id, category).await?;
        self.set_pattern(&pattern).await;
        Ok(pattern)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{Category, Difficulty, PatternIndexEntry, Status};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory catalog that counts upstream calls.
    pub(crate) struct StaticSource {
        pub index: PatternIndex,
        pub patterns: HashMap<String, Pattern>,
        pub index_fetches: AtomicUsize,
        pub pattern_fetches: AtomicUsize,
    }

    impl StaticSource {
        pub fn new(index: PatternIndex, patterns: Vec<Pattern>) -> Self {
            Self {
                index,
                patterns: patterns.into_iter().map(|p| (p.id.clone(), p)).collect(),
                index_fetches: AtomicUsize::new(0),
                pattern_fetches: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PatternSource for StaticSource {
        async fn fetch_index(&self) -> Result<PatternIndex, CatalogError> {
            self.index_fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.index.clone())
        }

        async fn fetch_pattern(&self, id: &str, category: Category) -> Result<Pattern, CatalogError> {
            self.pattern_fetches.fetch_add(1, Ordering::SeqCst);
            let mut pattern = self
                .patterns
                .get(id)
                .cloned()
                .ok_or_else(|| CatalogError::PatternNotFound(id.to_string()))?;
            pattern.id = id.to_string();
            pattern.category = category;
            Ok(pattern)
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl CacheBackend for FailingBackend {
        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::Backend("connection refused".to_string()))
        }

        async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
            Err(CacheError::Backend("connection refused".to_string()))
        }
    }

    pub(crate) fn sample_index() -> PatternIndex {
        PatternIndex {
            version: "1.0.0".to_string(),
            updated_at: "2025-01-15".to_string(),
            patterns: vec![PatternIndexEntry {
                id: "supabase-client-nextjs".to_string(),
                category: Category::Auth,
                name: "Supabase Client".to_string(),
                description: "Supabase SSR client for Next.js".to_string(),
                tags: vec!["supabase".to_string()],
                difficulty: Difficulty::Beginner,
                status: Status::Stable,
            }],
        }
    }

    pub(crate) fn sample_pattern(id: &str) -> Pattern {
        Pattern {
            id: id.to_string(),
            name: "Supabase Client".to_string(),
            description: String::new(),
            category: Category::Auth,
            tags: Vec::new(),
            difficulty: Difficulty::Beginner,
            status: Status::Stable,
            time_estimate: Some("10 min".to_string()),
            install: None,
            requires: Vec::new(),
            enables: Vec::new(),
            env: Vec::new(),
            files: Vec::new(),
            external_setup: Vec::new(),
            edge_cases: Vec::new(),
            validation: Vec::new(),
        }
    }

    #[tokio::test]
    async fn memory_cache_evicts_least_recent() {
        let cache = MemoryCache::with_capacity(2);
        let ttl = Duration::from_secs(60);
        cache.set("a", "1".to_string(), ttl).await.expect("set");
        cache.set("b", "2".to_string(), ttl).await.expect("set");
        assert_eq!(cache.get("a").await.expect("get").as_deref(), Some("1"));

        cache.set("c", "3".to_string(), ttl).await.expect("set");
        assert!(cache.get("b").await.expect("get").is_none());
        assert_eq!(cache.get("a").await.expect("get").as_deref(), Some("1"));
        assert_eq!(cache.get("c").await.expect("get").as_deref(), Some("3"));
    }

    #[tokio::test]
    async fn memory_cache_overwrite_refreshes_recency() {
        let cache = MemoryCache::with_capacity(2);
        let ttl = Duration::from_secs(60);
        cache.set("a", "1".to_string(), ttl).await.expect("set");
        cache.set("b", "2".to_string(), ttl).await.expect("set");
        cache.set("a", "1b".to_string(), ttl).await.expect("set");
        cache.set("c", "3".to_string(), ttl).await.expect("set");

        assert!(cache.get("b").await.expect("get").is_none());
        assert_eq!(cache.get("a").await.expect("get").as_deref(), Some("1b"));

        let state = cache.state.lock().await;
        assert_eq!(state.values.len(), 2);
        assert_eq!(state.recency.len(), 2);
    }

    #[tokio::test]
    async fn memory_cache_expires_entries() {
        let cache = MemoryCache::with_capacity(4);
        cache
            .set("k", "v".to_string(), Duration::ZERO)
            .await
            .expect("set");
        assert!(cache.get("k").await.expect("get").is_none());
    }

    #[tokio::test]
    async fn read_through_avoids_second_fetch() {
        let source = Arc::new(StaticSource::new(
            sample_index(),
            vec![sample_pattern("supabase-client-nextjs")],
        ));
        let coordinator = CacheCoordinator::new(
            source.clone(),
            Some(Arc::new(MemoryCache::with_capacity(16))),
            DEFAULT_TTL,
        );

        for _ in 0..3 {
            let pattern = coordinator
                .load_pattern("supabase-client-nextjs")
                .await
                .expect("pattern");
            assert_eq!(pattern.id, "supabase-client-nextjs");
            coordinator.load_index().await.expect("index");
        }

        assert_eq!(source.index_fetches.load(Ordering::SeqCst), 1);
        assert_eq!(source.pattern_fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failing_or_missing_backend_still_answers() {
        for backend in [None, Some(Arc::new(FailingBackend) as Arc<dyn CacheBackend>)] {
            let source = Arc::new(StaticSource::new(
                sample_index(),
                vec![sample_pattern("supabase-client-nextjs")],
            ));
            let coordinator = CacheCoordinator::new(source.clone(), backend, DEFAULT_TTL);

            coordinator
                .load_pattern("supabase-client-nextjs")
                .await
                .expect("pattern");
            coordinator
                .load_pattern("supabase-client-nextjs")
                .await
                .expect("pattern");

            assert_eq!(source.pattern_fetches.load(Ordering::SeqCst), 2);
            assert!(coordinator
                .get_pattern("supabase-client-nextjs")
                .await
                .is_none());
        }
    }

    #[tokio::test]
    async fn unknown_pattern_is_not_found_without_fetch() {
        let source = Arc::new(StaticSource::new(sample_index(), Vec::new()));
        let coordinator = CacheCoordinator::new(source.clone(), None, DEFAULT_TTL);

        let err = coordinator.load_pattern("ghost").await.expect_err("missing");
        assert!(matches!(err, CatalogError::PatternNotFound(ref id) if id == "ghost"));
        assert_eq!(source.pattern_fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn get_or_fetch_propagates_fetch_errors() {
        let source = Arc::new(StaticSource::new(sample_index(), Vec::new()));
        let coordinator = CacheCoordinator::new(
            source,
            Some(Arc::new(MemoryCache::with_capacity(4))),
            DEFAULT_TTL,
        );

        let result: Result<u32, &str> = coordinator
            .get_or_fetch("nyko:test", || async { Err("upstream down") }, DEFAULT_TTL)
            .await;
        assert_eq!(result, Err("upstream down"));

        let value: Result<u32, &str> = coordinator
            .get_or_fetch("nyko:test", || async { Ok(7) }, DEFAULT_TTL)
            .await;
        assert_eq!(value, Ok(7));

        let cached: Result<u32, &str> = coordinator
            .get_or_fetch("nyko:test", || async { Ok(8) }, DEFAULT_TTL)
            .await;
        assert_eq!(cached, Ok(7));
    }
}
