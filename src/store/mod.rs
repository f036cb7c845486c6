//! Shared key-value store holding every short-lived piece of auth state
//! (verification sessions, SMS rate counters, token blacklist).
//!
//! All lifetimes are owned by the store through per-key TTLs. Each operation
//! touches a single key and relies on the backend for atomicity.

pub mod memory;
pub mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

use crate::config::RedisConfig;
use crate::error::AppResult;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Sets `key` to `value`, expiring after `ttl_secs` (must be > 0).
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> AppResult<()>;

    /// Returns `true` only if the key existed and this call removed it.
    async fn delete(&self, key: &str) -> AppResult<bool>;

    /// Increments the integer at `key` and returns the new value. A missing
    /// key starts at 0 and gets `ttl_secs` as its expiry in the same atomic
    /// step; an existing key keeps the expiry it already has.
    async fn incr_with_ttl(&self, key: &str, ttl_secs: u64) -> AppResult<i64>;

    /// Remaining lifetime in seconds; `None` if the key is missing or has no expiry.
    async fn ttl(&self, key: &str) -> AppResult<Option<u64>>;

    async fn exists(&self, key: &str) -> AppResult<bool> {
        Ok(self.get(key).await?.is_some())
    }
}

pub type SharedStore = Arc<dyn KeyValueStore>;

/// Opens the store named by `config.url`: `memory://` selects the in-process store.
pub async fn connect(config: &RedisConfig) -> AppResult<SharedStore> {
    if config.url.starts_with("memory://") {
        log::warn!("Using in-process key-value store; state is not shared between instances");
        let store = MemoryStore::new();
        crate::tasks::spawn_memory_store_purge(store.clone());
        return Ok(Arc::new(store));
    }
    let store = RedisStore::connect(&config.url).await?;
    log::info!("Connected to Redis");
    Ok(Arc::new(store))
}
