//! Keyed in-memory cache with change-token expiration.
//!
//! An entry is valid until any of its tokens reports a change. Population
//! is single-flight per key: concurrent misses wait for the first caller
//! and then read its result.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, RwLock};

use tracing::trace;

use crate::signal::ChangeToken;

struct CacheEntry<V> {
    value: V,
    tokens: Vec<ChangeToken>,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self) -> bool {
        self.tokens.iter().any(ChangeToken::has_changed)
    }
}

/// Process-wide cache of cloneable values.
pub struct MemoryCache<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    populating: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl<V> Default for MemoryCache<V> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            populating: Mutex::new(HashMap::new()),
        }
    }
}

impl<V: Clone + Send + Sync> MemoryCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a live entry. Expired entries are evicted and reported as a miss.
    pub fn get(&self, key: &str) -> Option<V> {
        {
            let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
            match entries.get(key) {
                Some(entry) if !entry.is_expired() => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if entries.get(key).is_some_and(CacheEntry::is_expired) {
            entries.remove(key);
            trace!(event = "cache.expired", key = %key);
        }
        None
    }

    /// Store a value that expires when any of `tokens` changes.
    pub fn set(&self, key: &str, value: V, tokens: Vec<ChangeToken>) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), CacheEntry { value, tokens });
    }

    /// Drop an entry.
    pub fn remove(&self, key: &str) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
    }

    /// Return the live entry for `key`, or build it with `factory`.
    ///
    /// `tokens` is called right before `factory` so a change raised while
    /// the factory runs expires the stored entry immediately.
    pub async fn get_or_create<T, F, Fut, E>(&self, key: &str, tokens: T, factory: F) -> Result<V, E>
    where
        T: FnOnce() -> Vec<ChangeToken>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }

        let gate = {
            let mut populating = self.populating.lock().unwrap_or_else(|e| e.into_inner());
            populating
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        let _guard = gate.lock().await;

        // Another caller may have populated the entry while we waited.
        if let Some(value) = self.get(key) {
            return Ok(value);
        }

        let tokens = tokens();
        let value = factory().await?;
        self.set(key, value.clone(), tokens);
        trace!(event = "cache.populated", key = %key);
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::Signal;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_get_missing() {
        let cache: MemoryCache<u32> = MemoryCache::new();
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_entry_expires_on_signal() {
        let signal = Signal::new();
        let cache = MemoryCache::new();
        cache.set("k", 7u32, vec![signal.get_token("t")]);
        assert_eq!(cache.get("k"), Some(7));

        signal.signal_token("t");
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_remove() {
        let cache = MemoryCache::new();
        cache.set("k", 1u32, vec![]);
        cache.remove("k");
        assert_eq!(cache.get("k"), None);
    }

    #[tokio::test]
    async fn test_get_or_create_runs_factory_once() {
        let signal = Signal::new();
        let cache = MemoryCache::new();
        let calls = AtomicU32::new(0);

        for _ in 0..3 {
            let value: Result<u32, ()> = cache
                .get_or_create(
                    "k",
                    || vec![signal.get_token("t")],
                    || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok(42)
                    },
                )
                .await;
            assert_eq!(value, Ok(42));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_factory_error_is_not_cached() {
        let cache: MemoryCache<u32> = MemoryCache::new();
        let failed: Result<u32, &str> = cache
            .get_or_create("k", Vec::new, || async { Err("down") })
            .await;
        assert_eq!(failed, Err("down"));

        let ok: Result<u32, &str> = cache.get_or_create("k", Vec::new, || async { Ok(1) }).await;
        assert_eq!(ok, Ok(1));
    }

    #[tokio::test]
    async fn test_signal_during_factory_expires_result() {
        let signal = Signal::new();
        let cache = MemoryCache::new();

        let value: Result<u32, ()> = cache
            .get_or_create(
                "k",
                || vec![signal.get_token("t")],
                || async {
                    signal.signal_token("t");
                    Ok(1)
                },
            )
            .await;
        assert_eq!(value, Ok(1));
        assert_eq!(cache.get("k"), None);
    }

    #[tokio::test]
    async fn test_concurrent_misses_share_one_population() {
        let cache = Arc::new(MemoryCache::new());
        let calls = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_create("k", Vec::new, || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::task::yield_now().await;
                        Ok::<u32, ()>(5)
                    })
                    .await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), Ok(5));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
