//! Cache storage: named generations of request/response pairs.

use async_trait::async_trait;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::trace;
use url::Url;

use crate::freshness::FETCHED_AT_HEADER;
use crate::request::Response;
use crate::ServiceWorkerError;

/// A cached request/response pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Request URL (the cache key).
    pub url: Url,

    /// Response status.
    pub status: u16,

    /// Response headers.
    pub headers: HashMap<String, String>,

    /// Response body.
    pub body: Vec<u8>,
}

impl CacheEntry {
    /// Snapshot a response for storage under the request URL.
    ///
    /// The key is never the response URL: after a redirect that is the
    /// target, and lookups by the original request would miss.
    pub fn from_response(key: &Url, response: &Response) -> Self {
        Self {
            url: key.clone(),
            status: response.status.as_u16(),
            headers: response.header_strings(),
            body: response.body.to_vec(),
        }
    }

    /// Attach the synthetic freshness timestamp (ms since epoch).
    pub fn stamped(mut self, now_ms: u64) -> Self {
        self.headers
            .insert(FETCHED_AT_HEADER.to_string(), now_ms.to_string());
        self
    }

    /// Key this entry is stored under.
    pub fn key(&self) -> &str {
        self.url.as_str()
    }
}

/// Host cache API (`caches`).
///
/// Every operation is scoped to a single cache name and request key.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Open a cache, creating it if absent.
    async fn open(&self, cache: &str) -> Result<(), ServiceWorkerError>;

    /// Names of all existing caches, in creation order.
    async fn keys(&self) -> Result<Vec<String>, ServiceWorkerError>;

    /// Delete a whole cache. Returns whether it existed.
    async fn delete(&self, cache: &str) -> Result<bool, ServiceWorkerError>;

    /// Look up a key in one cache.
    async fn match_in(
        &self,
        cache: &str,
        key: &str,
    ) -> Result<Option<CacheEntry>, ServiceWorkerError>;

    /// Look up a key across all caches, first hit wins.
    async fn match_any(&self, key: &str) -> Result<Option<CacheEntry>, ServiceWorkerError>;

    /// Insert or overwrite an entry, creating the cache if absent.
    async fn put(&self, cache: &str, entry: CacheEntry) -> Result<(), ServiceWorkerError>;

    /// Insert several entries.
    async fn put_all(
        &self,
        cache: &str,
        entries: Vec<CacheEntry>,
    ) -> Result<(), ServiceWorkerError> {
        for entry in entries {
            self.put(cache, entry).await?;
        }
        Ok(())
    }
}

/// A single named cache.
#[derive(Debug, Default, Clone)]
pub struct Cache {
    /// Cache name.
    pub name: String,

    entries: HashMap<String, CacheEntry>,
}

impl Cache {
    /// Create a new cache.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: HashMap::new(),
        }
    }

    /// Match a request key.
    pub fn match_request(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    /// Add or replace an entry.
    pub fn put(&mut self, entry: CacheEntry) {
        self.entries.insert(entry.key().to_string(), entry);
    }

    /// Delete entry.
    pub fn delete(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Get all keys.
    pub fn keys(&self) -> Vec<&str> {
        self.entries.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// In-memory cache storage.
#[derive(Debug, Default)]
pub struct CacheStorage {
    // creation order, matches `caches.keys()`
    caches: RwLock<Vec<Cache>>,
}

impl CacheStorage {
    /// Create new cache storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a cache exists.
    pub async fn has(&self, name: &str) -> bool {
        self.caches.read().await.iter().any(|c| c.name == name)
    }

    /// Snapshot of one cache.
    pub async fn cache(&self, name: &str) -> Option<Cache> {
        self.caches
            .read()
            .await
            .iter()
            .find(|c| c.name == name)
            .cloned()
    }
}

fn open_mut<'a>(caches: &'a mut Vec<Cache>, name: &str) -> &'a mut Cache {
    match caches.iter().position(|c| c.name == name) {
        Some(index) => &mut caches[index],
        None => {
            caches.push(Cache::new(name));
            let last = caches.len() - 1;
            &mut caches[last]
        }
    }
}

#[async_trait]
impl CacheStore for CacheStorage {
    async fn open(&self, cache: &str) -> Result<(), ServiceWorkerError> {
        open_mut(&mut *self.caches.write().await, cache);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, ServiceWorkerError> {
        Ok(self
            .caches
            .read()
            .await
            .iter()
            .map(|c| c.name.clone())
            .collect())
    }

    async fn delete(&self, cache: &str) -> Result<bool, ServiceWorkerError> {
        let mut caches = self.caches.write().await;
        let before = caches.len();
        caches.retain(|c| c.name != cache);
        Ok(caches.len() != before)
    }

    async fn match_in(
        &self,
        cache: &str,
        key: &str,
    ) -> Result<Option<CacheEntry>, ServiceWorkerError> {
        Ok(self
            .caches
            .read()
            .await
            .iter()
            .find(|c| c.name == cache)
            .and_then(|c| c.match_request(key))
            .cloned())
    }

    async fn match_any(&self, key: &str) -> Result<Option<CacheEntry>, ServiceWorkerError> {
        Ok(self
            .caches
            .read()
            .await
            .iter()
            .find_map(|c| c.match_request(key))
            .cloned())
    }

    async fn put(&self, cache: &str, entry: CacheEntry) -> Result<(), ServiceWorkerError> {
        trace!(cache, key = entry.key(), "Cache put");
        open_mut(&mut *self.caches.write().await, cache).put(entry);
        Ok(())
    }

    async fn put_all(
        &self,
        cache: &str,
        entries: Vec<CacheEntry>,
    ) -> Result<(), ServiceWorkerError> {
        let mut caches = self.caches.write().await;
        let target = open_mut(&mut caches, cache);
        for entry in entries {
            target.put(entry);
        }
        Ok(())
    }
}
