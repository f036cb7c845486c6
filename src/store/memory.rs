use super::KeyValueStore;
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// In-process TTL map. Expiry follows the tokio clock, so paused-time tests
/// can move it forward with `tokio::time::advance`.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.lock().await.values().filter(|e| e.is_live(now)).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drops every expired entry; returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, e| e.is_live(now));
        before - entries.len()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(e) if e.is_live(now) => Ok(Some(e.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> AppResult<()> {
        if ttl_secs == 0 {
            return Err(AppError::InternalError(format!(
                "invalid expire time for key {key}"
            )));
        }
        let expires_at = Instant::now() + Duration::from_secs(ttl_secs);
        self.entries.lock().await.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(expires_at),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<bool> {
        let now = Instant::now();
        let removed = self.entries.lock().await.remove(key);
        Ok(removed.is_some_and(|e| e.is_live(now)))
    }

    async fn incr_with_ttl(&self, key: &str, ttl_secs: u64) -> AppResult<i64> {
        if ttl_secs == 0 {
            return Err(AppError::InternalError(format!(
                "invalid expire time for key {key}"
            )));
        }
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        if entries.get(key).is_some_and(|e| !e.is_live(now)) {
            entries.remove(key);
        }
        let entry = entries.entry(key.to_string()).or_insert(Entry {
            value: "0".to_string(),
            expires_at: Some(now + Duration::from_secs(ttl_secs)),
        });
        let current: i64 = entry.value.parse().map_err(|_| {
            AppError::InternalError(format!("value at {key} is not an integer"))
        })?;
        let next = current + 1;
        entry.value = next.to_string();
        Ok(next)
    }

    async fn ttl(&self, key: &str) -> AppResult<Option<u64>> {
        let now = Instant::now();
        let entries = self.entries.lock().await;
        Ok(entries
            .get(key)
            .filter(|e| e.is_live(now))
            .and_then(|e| e.expires_at)
            .map(|at| (at - now).as_secs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_set_ex_expires() {
        let store = MemoryStore::new();
        store.set_ex("k", "v", 5).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(!store.exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_reports_removal_once() {
        let store = MemoryStore::new();
        store.set_ex("k", "v", 60).await.unwrap();
        assert!(store.delete("k").await.unwrap());
        assert!(!store.delete("k").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_incr_sets_expiry_once_and_restarts_after_it() {
        let store = MemoryStore::new();
        assert_eq!(store.incr_with_ttl("c", 10).await.unwrap(), 1);
        assert_eq!(store.ttl("c").await.unwrap(), Some(10));

        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(store.incr_with_ttl("c", 10).await.unwrap(), 2);
        assert_eq!(store.ttl("c").await.unwrap(), Some(6));

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(store.incr_with_ttl("c", 10).await.unwrap(), 1);
        assert_eq!(store.ttl("c").await.unwrap(), Some(10));
    }

    #[tokio::test]
    async fn test_zero_ttl_is_rejected() {
        let store = MemoryStore::new();
        assert!(store.set_ex("k", "v", 0).await.is_err());
        assert!(store.incr_with_ttl("c", 0).await.is_err());
        assert!(store.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let store = MemoryStore::new();
        store.set_ex("a", "1", 1).await.unwrap();
        store.set_ex("b", "1", 100).await.unwrap();
        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(store.purge_expired().await, 1);
        assert!(store.exists("b").await.unwrap());
    }
}
