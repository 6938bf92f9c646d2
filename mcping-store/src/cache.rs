//! TTL cache of server status answers.
//!
//! Entries are keyed by `edition:hostname:port`. An entry older than the
//! configured duration is treated as absent: `get` evicts it on sight and
//! `put`/`sweep` drop every expired entry.

use std::time::Duration;

use tracing::debug;

use crate::models::{CacheEntry, ServerAddress, ServerStatus};
use crate::store::{MemoryStore, Mutation, Store};

#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    pub enabled: bool,
    pub duration: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            duration: Duration::from_secs(60),
        }
    }
}

pub struct StatusCache<S = MemoryStore<CacheEntry>> {
    config: CacheConfig,
    entries: S,
}

impl StatusCache {
    pub fn new(config: CacheConfig) -> Self {
        Self::with_store(config, MemoryStore::new())
    }
}

impl<S: Store<CacheEntry>> StatusCache<S> {
    pub fn with_store(config: CacheConfig, entries: S) -> Self {
        Self { config, entries }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn ttl_ms(&self) -> i64 {
        self.config.duration.as_millis() as i64
    }

    /// Cached status for `address`, if caching is on and the entry is fresh.
    pub async fn get(&self, address: &ServerAddress, now: i64) -> Option<ServerStatus> {
        if !self.config.enabled {
            return None;
        }
        let key = address.cache_key();
        let ttl = self.ttl_ms();
        let hit = self
            .entries
            .update(&key, |entry| match entry {
                Some(entry) if now - entry.timestamp <= ttl => {
                    (Mutation::Keep, Some(entry.status.clone()))
                }
                Some(_) => (Mutation::Remove, None),
                None => (Mutation::Keep, None),
            })
            .await;
        debug!(%key, hit = hit.is_some(), "status cache lookup");
        hit
    }

    /// Store `status` for `address` and drop anything expired. No-op when disabled.
    pub async fn put(&self, address: &ServerAddress, status: ServerStatus, now: i64) {
        if !self.config.enabled {
            return;
        }
        self.entries
            .set(
                &address.cache_key(),
                CacheEntry {
                    status,
                    timestamp: now,
                },
            )
            .await;
        self.sweep(now).await;
    }

    /// Remove expired entries. Returns how many were removed.
    pub async fn sweep(&self, now: i64) -> usize {
        let ttl = self.ttl_ms();
        self.entries
            .retain(|_, entry| now - entry.timestamp <= ttl)
            .await
    }

    pub async fn remove(&self, address: &ServerAddress) -> bool {
        self.entries.delete(&address.cache_key()).await
    }

    pub async fn clear(&self) -> usize {
        self.entries.retain(|_, _| false).await
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Edition;

    const T0: i64 = 1_700_000_000_000;

    fn address() -> ServerAddress {
        ServerAddress::new("Play.Example.com", None, Edition::Java)
    }

    fn status(address: &ServerAddress) -> ServerStatus {
        let mut status = ServerStatus::offline(address, T0 / 1000);
        status.online = true;
        status.version = Some("1.21.4".to_string());
        status
    }

    #[tokio::test]
    async fn test_hit_before_expiry() {
        let cache = StatusCache::new(CacheConfig::default());
        let addr = address();
        cache.put(&addr, status(&addr), T0).await;

        let hit = cache.get(&addr, T0 + 60_000).await;
        assert_eq!(hit, Some(status(&addr)));
    }

    #[tokio::test]
    async fn test_expired_entry_is_evicted() {
        let cache = StatusCache::new(CacheConfig::default());
        let addr = address();
        cache.put(&addr, status(&addr), T0).await;

        assert_eq!(cache.get(&addr, T0 + 60_001).await, None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_cache_never_stores() {
        let cache = StatusCache::new(CacheConfig {
            enabled: false,
            duration: Duration::from_secs(60),
        });
        let addr = address();
        cache.put(&addr, status(&addr), T0).await;
        assert!(cache.is_empty());
        assert_eq!(cache.get(&addr, T0).await, None);
    }

    #[tokio::test]
    async fn test_key_includes_edition_and_port() {
        let cache = StatusCache::new(CacheConfig::default());
        let java = address();
        let bedrock = ServerAddress::new("play.example.com", None, Edition::Bedrock);
        let other_port = ServerAddress::new("play.example.com", Some(25566), Edition::Java);
        cache.put(&java, status(&java), T0).await;

        assert!(cache.get(&bedrock, T0).await.is_none());
        assert!(cache.get(&other_port, T0).await.is_none());
        assert!(cache.get(&ServerAddress::new("PLAY.example.com", Some(25565), Edition::Java), T0).await.is_some());
    }

    #[tokio::test]
    async fn test_put_sweeps_expired_entries() {
        let cache = StatusCache::new(CacheConfig::default());
        let old = address();
        let new = ServerAddress::new("other.example.com", None, Edition::Java);
        cache.put(&old, status(&old), T0).await;
        cache.put(&new, status(&new), T0 + 120_000).await;
        assert_eq!(cache.len(), 1);
    }
}
