use moka::future::Cache;
use std::time::Duration;

/// In-memory hot cache backed by moka, in front of per-symbol lesson
/// recall. Entries expire on TTL or on invalidation after a write.
pub struct HotCache {
    inner: Cache<String, String>,
}

impl HotCache {
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).await
    }

    pub async fn insert(&self, key: String, value: String) {
        self.inner.insert(key, value).await;
    }

    pub async fn invalidate(&self, key: &str) {
        self.inner.invalidate(key).await;
    }

    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_and_get() {
        let cache = HotCache::new(16, Duration::from_secs(60));
        cache.insert("AAPL".to_string(), "[]".to_string()).await;
        assert_eq!(cache.get("AAPL").await, Some("[]".to_string()));
    }

    #[tokio::test]
    async fn invalidate_removes_entry() {
        let cache = HotCache::new(16, Duration::from_secs(60));
        cache.insert("AAPL".to_string(), "[]".to_string()).await;
        cache.invalidate("AAPL").await;
        assert_eq!(cache.get("AAPL").await, None);
    }

    #[tokio::test]
    async fn ttl_expiration() {
        let cache = HotCache::new(16, Duration::from_millis(50));
        cache.insert("AAPL".to_string(), "[]".to_string()).await;
        assert!(cache.get("AAPL").await.is_some());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(cache.get("AAPL").await.is_none());
    }
}
