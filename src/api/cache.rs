use axum::body::Bytes;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use lru::LruCache;
use serde::Serialize;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use super::error::ApiError;
use crate::service::ServiceError;

/// Short-lived cache of serialized list responses.
///
/// Absorbs bursts of identical list requests. Every successful write through
/// the API clears it, so a client never reads its own stale write. A zero TTL
/// disables caching.
pub struct ResponseCache {
    entries: Mutex<LruCache<String, (Instant, Bytes)>>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    pub fn disabled() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn get(&self, key: &str) -> Option<Bytes> {
        if self.ttl.is_zero() {
            return None;
        }
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = entries
            .get(key)
            .map(|(stored_at, body)| (stored_at.elapsed() < self.ttl, body.clone()));
        match entry {
            Some((true, body)) => Some(body),
            Some((false, _)) => {
                entries.pop(key);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, key: &str, body: Bytes) {
        if self.ttl.is_zero() {
            return;
        }
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .put(key.to_owned(), (Instant::now(), body));
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Serves `key` from the cache, or runs `load` and caches its JSON.
    pub(crate) async fn json<T, F, Fut>(&self, key: &str, load: F) -> Result<Response, ApiError>
    where
        T: Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let body = match self.get(key) {
            Some(body) => body,
            None => {
                let value = load().await?;
                let body = Bytes::from(serde_json::to_vec(&value).map_err(|e| {
                    tracing::error!(error = %e, "Failed to serialize response");
                    ApiError::Internal
                })?);
                self.put(key, body.clone());
                body
            }
        };
        Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
    }
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_within_ttl() {
        let cache = ResponseCache::new(4, Duration::from_secs(60));
        cache.put("/publishers", Bytes::from_static(b"[]"));
        assert_eq!(cache.get("/publishers"), Some(Bytes::from_static(b"[]")));
        assert_eq!(cache.get("/publications"), None);
    }

    #[test]
    fn test_expired_entry_evicted() {
        let cache = ResponseCache::new(4, Duration::from_millis(1));
        cache.put("/publishers", Bytes::from_static(b"[]"));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get("/publishers"), None);
    }

    #[test]
    fn test_clear_and_disabled() {
        let cache = ResponseCache::new(4, Duration::from_secs(60));
        cache.put("/publishers", Bytes::from_static(b"[]"));
        cache.clear();
        assert_eq!(cache.get("/publishers"), None);

        let disabled = ResponseCache::disabled();
        disabled.put("/publishers", Bytes::from_static(b"[]"));
        assert_eq!(disabled.get("/publishers"), None);
    }

    #[test]
    fn test_capacity_bounds_entries() {
        let cache = ResponseCache::new(1, Duration::from_secs(60));
        cache.put("a", Bytes::from_static(b"1"));
        cache.put("b", Bytes::from_static(b"2"));
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(Bytes::from_static(b"2")));
    }
}
