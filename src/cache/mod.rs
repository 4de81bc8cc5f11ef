//! Redis-backed cache-aside store for dashboard responses.
//!
//! The cache is an optimization only: every Redis failure is logged and
//! treated as a miss, so a broken Redis degrades latency, not correctness.

pub mod key;

use std::future::Future;

use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::CacheConfig;

/// Keys requested per `SCAN` round trip.
const SCAN_BATCH: usize = 500;

/// A value and whether it was served from the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct Cached<T> {
    pub value: T,
    pub hit: bool,
}

#[derive(Debug, Clone)]
pub struct ResponseCache {
    client: Option<redis::Client>,
    config: CacheConfig,
}

impl ResponseCache {
    pub fn new(client: Option<redis::Client>, config: CacheConfig) -> Self {
        Self { client, config }
    }

    /// Build from settings; no client is opened when caching is disabled.
    pub fn from_config(redis_url: &str, config: CacheConfig) -> Result<Self, redis::RedisError> {
        let client = if config.enabled {
            Some(redis::Client::open(redis_url)?)
        } else {
            None
        };
        Ok(Self::new(client, config))
    }

    /// A cache that always misses and stores nothing.
    pub fn disabled(config: CacheConfig) -> Self {
        Self::new(
            None,
            CacheConfig {
                enabled: false,
                ..config
            },
        )
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled && self.client.is_some()
    }

    fn client(&self) -> Option<&redis::Client> {
        self.client.as_ref().filter(|_| self.config.enabled)
    }

    /// Read and decode a cached value. Misses, Redis errors and undecodable
    /// payloads all return `None`.
    #[tracing::instrument(skip(self))]
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let client = self.client()?;
        let mut conn = match client.get_multiplexed_async_connection().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(error = %e, "Redis connection failed, skipping cache read");
                return None;
            }
        };

        let raw = match conn.get::<&str, Option<String>>(key).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(error = %e, "Redis GET failed");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding undecodable cache entry");
                None
            }
        }
    }

    /// Encode and store a value with an expiry. Failures are logged only.
    #[tracing::instrument(skip(self, value))]
    pub async fn put<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) {
        let Some(client) = self.client() else {
            return;
        };
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode cache entry");
                return;
            }
        };
        let mut conn = match client.get_multiplexed_async_connection().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(error = %e, "Redis connection failed, skipping cache write");
                return;
            }
        };
        if let Err(e) = conn
            .set_ex::<&str, String, ()>(key, payload, ttl_secs.max(1))
            .await
        {
            tracing::warn!(error = %e, "Redis SET EX failed");
        }
    }

    /// Cache-aside: serve `key` from the cache, or run `compute` and store
    /// its result. With `refresh` the read is skipped but the fresh value is
    /// still written.
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        key: &str,
        ttl_secs: u64,
        refresh: bool,
        compute: F,
    ) -> Result<Cached<T>, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !refresh {
            if let Some(value) = self.get::<T>(key).await {
                tracing::debug!(key, "Dashboard cache hit");
                return Ok(Cached { value, hit: true });
            }
        }

        let value = compute().await?;
        self.put(key, &value, ttl_secs).await;
        Ok(Cached { value, hit: false })
    }

    /// Delete every key matching a glob pattern, returning how many were
    /// removed. A disabled cache deletes nothing.
    #[tracing::instrument(skip(self))]
    pub async fn delete_matching(&self, pattern: &str) -> Result<u64, redis::RedisError> {
        let Some(client) = self.client() else {
            return Ok(0);
        };
        let mut conn = client.get_multiplexed_async_connection().await?;

        let mut cursor: u64 = 0;
        let mut deleted: u64 = 0;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                let removed: u64 = conn.del(&keys).await?;
                deleted += removed;
            }
            if next == 0 {
                break;
            }
            cursor = next;
        }

        tracing::info!(pattern, deleted, "Invalidated dashboard cache entries");
        Ok(deleted)
    }

    /// Round-trip a `PING` for readiness probes.
    pub async fn ping(&self) -> Result<(), redis::RedisError> {
        let Some(client) = self.client() else {
            return Ok(());
        };
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
