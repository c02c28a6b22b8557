//! Side cache for read-through CRUD: trait seam plus an in-process TTL cache.
//! Cache failures are never surfaced to clients; callers log and move on.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Error, Debug)]
#[error("cache: {0}")]
pub struct CacheError(pub String);

/// Key-value client with TTL semantics. Implement this to plug an external
/// store (e.g. Redis) into the facade.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;
    async fn del(&self, key: &str) -> Result<(), CacheError>;
}

/// Entity cache key: `<service>.<collection>.<id>`. Delimiters are not
/// escaped; a name containing `.` can collide with another key.
pub fn cache_key(service: &str, collection: &str, id: &str) -> String {
    format!("{}.{}.{}", service, collection, id)
}

struct Entry {
    value: String,
    expires_at: Instant,
}

/// In-process cache with per-entry expiry. Expired entries are dropped on
/// read; there is no background sweeper.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let expired = {
            let entries = self
                .entries
                .read()
                .map_err(|e| CacheError(e.to_string()))?;
            match entries.get(key) {
                Some(entry) if entry.expires_at > Instant::now() => {
                    return Ok(Some(entry.value.clone()))
                }
                Some(_) => true,
                None => false,
            }
        };
        if expired {
            let mut entries = self
                .entries
                .write()
                .map_err(|e| CacheError(e.to_string()))?;
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| CacheError(e.to_string()))?;
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), CacheError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| CacheError(e.to_string()))?;
        entries.remove(key);
        Ok(())
    }
}
