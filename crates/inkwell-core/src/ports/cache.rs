use async_trait::async_trait;
use std::time::Duration;

/// Cache trait - abstraction over caching backends.
/// Writes are best-effort.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Get a value from the cache.
    async fn get(&self, key: &str) -> Option<String>;

    /// Set a value in the cache with optional TTL.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>);

    /// Delete a key from the cache.
    async fn delete(&self, key: &str);

    /// Check if a key exists.
    async fn exists(&self, key: &str) -> bool;

    /// Drop every entry.
    async fn clear(&self);
}
