// src/generation/cache.rs
//! Generation cache
//!
//! Maps structural cache keys to synthesized implementations. Hits take a
//! shared read lock only. A miss takes an upgradable lock, re-checks the key
//! and runs the factory while other readers keep being served; the lock is
//! upgraded for the insert. At most one synthesis runs per key.
//!
//! Failed syntheses are never cached. Entries live for the lifetime of the
//! cache; there is no eviction.
//!
//! A factory that asks its own cache for a missing entry on the same thread
//! gets `ReentrantSynthesis` instead of blocking on the lock it holds.

use crate::generation::naming::NamingScope;
use crate::generation::request::CacheKey;
use crate::observability::{CACHE_HITS, CACHE_MISSES, SYNTHESIS_FAILURES};
use crate::proxy::ProxyTypeDescriptor;
use crate::utils::errors::{ProxyError, Result};
use once_cell::sync::Lazy;
use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

static SHARED: Lazy<Arc<GenerationCache>> = Lazy::new(|| Arc::new(GenerationCache::new()));

thread_local! {
    /// Caches whose synthesis lock this thread holds
    static SYNTHESIZING: RefCell<Vec<usize>> = RefCell::new(Vec::new());
}

/// Marks a cache as synthesizing on this thread until dropped
struct SynthesisMark(usize);

impl SynthesisMark {
    fn enter(cache: usize) -> Option<Self> {
        SYNTHESIZING.with(|held| {
            let mut held = held.borrow_mut();
            if held.contains(&cache) {
                return None;
            }
            held.push(cache);
            Some(SynthesisMark(cache))
        })
    }
}

impl Drop for SynthesisMark {
    fn drop(&mut self) {
        SYNTHESIZING.with(|held| held.borrow_mut().retain(|&cache| cache != self.0));
    }
}

/// Cache of synthesized implementations
pub struct GenerationCache<V = ProxyTypeDescriptor> {
    /// Synthesized entries by key
    entries: RwLock<HashMap<CacheKey, Arc<V>>>,

    /// Unique names for entries of this cache
    naming: NamingScope,

    /// Hit counter
    hits: AtomicU64,

    /// Miss counter (synthesis attempted)
    misses: AtomicU64,

    /// Failed synthesis counter
    failures: AtomicU64,
}

impl GenerationCache {
    /// Process-wide cache, created on first use and never torn down
    pub fn shared() -> Arc<GenerationCache> {
        Arc::clone(&SHARED)
    }
}

impl<V> GenerationCache<V> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            naming: NamingScope::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    /// Cached entry for `key`, if any
    pub fn get(&self, key: &CacheKey) -> Option<Arc<V>> {
        self.entries.read().get(key).cloned()
    }

    /// Return the entry for `key`, running `factory` once if it is missing
    ///
    /// `factory` runs under the synthesis lock. A nested miss on the same
    /// cache from the same thread fails with `ReentrantSynthesis`; handing the
    /// nested request to another thread and waiting for it deadlocks.
    pub fn get_or_create<F>(&self, key: &CacheKey, factory: F) -> Result<Arc<V>>
    where
        F: FnOnce(&NamingScope) -> Result<V>,
    {
        if let Some(entry) = self.entries.read().get(key) {
            self.record_hit(key);
            return Ok(Arc::clone(entry));
        }

        let _mark = SynthesisMark::enter(self as *const Self as usize).ok_or_else(|| {
            ProxyError::ReentrantSynthesis {
                key: key.to_string(),
            }
        })?;
        let guard = self.entries.upgradable_read();

        // Another caller may have finished synthesis between the two locks
        if let Some(entry) = guard.get(key) {
            self.record_hit(key);
            return Ok(Arc::clone(entry));
        }

        debug!("No cached implementation for {}; synthesizing", key);
        self.misses.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(CACHE_MISSES).increment(1);

        let entry = match factory(&self.naming) {
            Ok(value) => Arc::new(value),
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                metrics::counter!(SYNTHESIS_FAILURES).increment(1);
                warn!("Synthesis for {} failed: {}", key, e);
                return Err(e);
            }
        };

        let mut guard = RwLockUpgradableReadGuard::upgrade(guard);
        guard.insert(key.clone(), Arc::clone(&entry));
        Ok(entry)
    }

    fn record_hit(&self, key: &CacheKey) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(CACHE_HITS).increment(1);
        debug!("Found cached implementation for {}", key);
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn naming(&self) -> &NamingScope {
        &self.naming
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

impl<V> Default for GenerationCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Cached implementations
    pub entries: usize,

    /// Lookups served from the cache
    pub hits: u64,

    /// Lookups that ran a synthesis
    pub misses: u64,

    /// Syntheses that failed
    pub failures: u64,
}

impl CacheStats {
    /// Fraction of lookups served from the cache
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::request::ProxyRequest;
    use crate::model::TypeBuilder;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Barrier;
    use std::thread;

    fn key(name: &str) -> CacheKey {
        let iface = TypeBuilder::interface(name).build().unwrap();
        ProxyRequest::for_interfaces(&[iface]).cache_key("closure")
    }

    #[test]
    fn test_concurrent_get_or_create_synthesizes_once() {
        let cache: Arc<GenerationCache<String>> = Arc::new(GenerationCache::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let key = key("IShared");
        let threads = 16;
        let barrier = Arc::new(Barrier::new(threads));

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                let barrier = Arc::clone(&barrier);
                let key = key.clone();
                thread::spawn(move || {
                    barrier.wait();
                    cache
                        .get_or_create(&key, |naming| {
                            calls.fetch_add(1, Ordering::SeqCst);
                            Ok(naming.unique_name("Proxies.ISharedProxy"))
                        })
                        .unwrap()
                })
            })
            .collect();

        let results: Vec<Arc<String>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| Arc::ptr_eq(r, &results[0])));
        assert_eq!(results[0].as_str(), "Proxies.ISharedProxy");

        let stats = cache.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, threads as u64 - 1);
    }

    #[test]
    fn test_failed_synthesis_is_not_cached() {
        let cache: GenerationCache<String> = GenerationCache::new();
        let key = key("IFlaky");

        let result = cache.get_or_create(&key, |_| {
            Err(ProxyError::InvalidContract("first attempt".to_string()))
        });
        assert!(result.is_err());
        assert!(cache.get(&key).is_none());

        let value = cache.get_or_create(&key, |_| Ok("ok".to_string())).unwrap();
        assert_eq!(value.as_str(), "ok");
        assert_eq!(cache.stats().failures, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_nested_miss_fails_instead_of_blocking() {
        let cache: GenerationCache<usize> = GenerationCache::new();
        let inner_key = key("IInner");

        let outer = cache
            .get_or_create(&key("IOuter"), |_| {
                let nested = cache.get_or_create(&inner_key, |_| Ok(2));
                assert!(matches!(nested, Err(ProxyError::ReentrantSynthesis { .. })));
                Ok(1)
            })
            .unwrap();
        assert_eq!(*outer, 1);

        // The mark is cleared once the outer synthesis finishes
        let inner = cache.get_or_create(&inner_key, |_| Ok(2)).unwrap();
        assert_eq!(*inner, 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_distinct_keys_get_distinct_entries() {
        let cache: GenerationCache<usize> = GenerationCache::new();
        let a = cache.get_or_create(&key("IA"), |_| Ok(1)).unwrap();
        let b = cache.get_or_create(&key("IB"), |_| Ok(2)).unwrap();

        assert_eq!((*a, *b), (1, 2));
        assert_eq!(cache.stats().hit_rate(), 0.0);
    }
}
