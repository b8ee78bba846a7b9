//! In-memory cache backing the rendered index page.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use inkwell_core::ports::Cache;

/// Inserting a new key into a map this large sweeps expired entries first.
const SWEEP_THRESHOLD: usize = 256;

#[derive(Debug)]
struct Entry {
    body: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn fresh_at(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|deadline| now < deadline)
    }
}

/// Process-local TTL cache.
///
/// Stale entries are dropped when read, and swept in bulk once the map
/// reaches [`SWEEP_THRESHOLD`] keys, so arbitrary `?page=` values cannot
/// grow it without bound. Nothing survives a restart.
#[derive(Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored keys, stale ones included.
    pub async fn entry_count(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.fresh_at(Instant::now()) => return Some(entry.body.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        // Stale. A writer may have refreshed it since the read lock dropped.
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        if entries.get(key).is_some_and(|e| !e.fresh_at(now)) {
            entries.remove(key);
        }
        entries.get(key).map(|e| e.body.clone())
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        if entries.len() >= SWEEP_THRESHOLD && !entries.contains_key(key) {
            let before = entries.len();
            entries.retain(|_, e| e.fresh_at(now));
            tracing::debug!(removed = before - entries.len(), "Swept expired cache entries");
        }

        entries.insert(
            key.to_string(),
            Entry {
                body: value.to_string(),
                expires_at: ttl.map(|ttl| now + ttl),
            },
        );
    }

    async fn delete(&self, key: &str) {
        self.entries.write().await.remove(key);
    }

    async fn exists(&self, key: &str) -> bool {
        self.get(key).await.is_some()
    }

    async fn clear(&self) {
        let mut entries = self.entries.write().await;
        tracing::debug!(entries = entries.len(), "Clearing cache");
        entries.clear();
    }
}
