use crate::error::AppResult;
use crate::store::SharedStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitStatus {
    Allowed { attempts: i64 },
    Limited { retry_after: i64 },
}

/// Fixed-window counter of SMS sends per phone number.
///
/// The first increment in a window sets the expiry for the whole window and
/// later increments never extend it, so up to `2 * ceiling` sends can land
/// around a window boundary.
#[derive(Clone)]
pub struct RateLimiter {
    store: SharedStore,
    ceiling: i64,
    window_secs: u64,
}

impl RateLimiter {
    pub fn new(store: SharedStore, ceiling: i64, window_secs: u64) -> Self {
        Self {
            store,
            ceiling,
            window_secs,
        }
    }

    fn key(phone: &str) -> String {
        format!("sms_rate_limit:{phone}")
    }

    /// Read-only check against the configured ceiling.
    pub async fn check(&self, phone: &str) -> AppResult<RateLimitStatus> {
        let key = Self::key(phone);
        let attempts = self
            .store
            .get(&key)
            .await?
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(0);

        if attempts >= self.ceiling {
            let retry_after = self
                .store
                .ttl(&key)
                .await?
                .map(|t| t as i64)
                .unwrap_or(self.window_secs as i64);
            return Ok(RateLimitStatus::Limited { retry_after });
        }
        Ok(RateLimitStatus::Allowed { attempts })
    }

    /// Counts one attempt in the configured window; returns the new count.
    pub async fn record(&self, phone: &str) -> AppResult<i64> {
        self.increment(&Self::key(phone), self.window_secs).await
    }

    /// Counts one attempt and reports whether it is still within `ceiling`.
    pub async fn increment_and_check(
        &self,
        phone: &str,
        ceiling: i64,
        window_secs: u64,
    ) -> AppResult<bool> {
        let count = self.increment(&Self::key(phone), window_secs).await?;
        Ok(count <= ceiling)
    }

    async fn increment(&self, key: &str, window_secs: u64) -> AppResult<i64> {
        self.store.incr_with_ttl(key, window_secs).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{KeyValueStore, MemoryStore};
    use std::sync::Arc;
    use std::time::Duration;

    fn limiter() -> RateLimiter {
        RateLimiter::new(Arc::new(MemoryStore::new()), 3, 3600)
    }

    #[tokio::test(start_paused = true)]
    async fn test_increment_and_check_ceiling() {
        let limiter = limiter();
        for _ in 0..3 {
            assert!(limiter.increment_and_check("+79990000000", 3, 60).await.unwrap());
        }
        assert!(!limiter.increment_and_check("+79990000000", 3, 60).await.unwrap());
        // other numbers are counted separately
        assert!(limiter.increment_and_check("+79990000001", 3, 60).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_is_fixed_not_sliding() {
        let limiter = limiter();
        let phone = "+79990000000";
        assert!(limiter.increment_and_check(phone, 3, 60).await.unwrap());

        tokio::time::advance(Duration::from_secs(40)).await;
        assert!(limiter.increment_and_check(phone, 3, 60).await.unwrap());
        assert!(limiter.increment_and_check(phone, 3, 60).await.unwrap());
        assert!(!limiter.increment_and_check(phone, 3, 60).await.unwrap());

        // the window ends 60s after the first hit, not after the last one
        tokio::time::advance(Duration::from_secs(20)).await;
        assert!(limiter.increment_and_check(phone, 3, 60).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_and_record() {
        let limiter = limiter();
        let phone = "+79990000000";
        assert_eq!(
            limiter.check(phone).await.unwrap(),
            RateLimitStatus::Allowed { attempts: 0 }
        );
        for expected in 1..=3 {
            assert_eq!(limiter.record(phone).await.unwrap(), expected);
        }

        tokio::time::advance(Duration::from_secs(600)).await;
        assert_eq!(
            limiter.check(phone).await.unwrap(),
            RateLimitStatus::Limited { retry_after: 3000 }
        );

        tokio::time::advance(Duration::from_secs(3000)).await;
        assert_eq!(
            limiter.check(phone).await.unwrap(),
            RateLimitStatus::Allowed { attempts: 0 }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_counter_is_created_with_window_expiry() {
        let store = MemoryStore::new();
        let limiter = RateLimiter::new(Arc::new(store.clone()), 3, 3600);
        let key = "sms_rate_limit:+79990000000";

        limiter.record("+79990000000").await.unwrap();
        assert_eq!(store.ttl(key).await.unwrap(), Some(3600));

        tokio::time::advance(Duration::from_secs(100)).await;
        limiter.record("+79990000000").await.unwrap();
        assert_eq!(store.ttl(key).await.unwrap(), Some(3500));
    }
}
