//! Bounded least-recently-used cache.
//!
//! [`LruCache`] wraps [`lru::LruCache`] with hit/miss/eviction counters and a
//! fallible get-or-compute entry point used by the spectra and damping caches.
//!
//! Keys for floating point inputs are built with [`quantize`]: values are rounded
//! to [`KEY_DECIMALS`] decimal places and stored as integers, which bounds the
//! number of distinct keys a sampler can generate while exploring a continuous
//! parameter space.

use std::fmt;
use std::hash::Hash;
use std::num::NonZeroUsize;

/// Decimal places kept when turning a float into a cache key.
pub const KEY_DECIMALS: i32 = 5;

/// Round `x` to [`KEY_DECIMALS`] decimal places.
pub fn round_key(x: f64) -> f64 {
    let scale = 10f64.powi(KEY_DECIMALS);
    (x * scale).round() / scale
}

/// Integer cache key for `x` rounded to [`KEY_DECIMALS`] decimal places.
pub fn quantize(x: f64) -> i64 {
    (x * 10f64.powi(KEY_DECIMALS)).round() as i64
}

/// Hit/miss counters, mostly useful for diagnostics and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

pub struct LruCache<K, V> {
    inner: lru::LruCache<K, V>,
    stats: CacheStats,
}

impl<K: Hash + Eq, V> fmt::Debug for LruCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCache")
            .field("len", &self.inner.len())
            .field("capacity", &self.inner.cap())
            .field("stats", &self.stats)
            .finish()
    }
}

impl<K: Hash + Eq + Clone, V> LruCache<K, V> {
    /// Create a cache holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: lru::LruCache::new(capacity),
            stats: CacheStats::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.cap().get()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Membership test that does not touch recency.
    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.contains(key)
    }

    /// Look up `key`, marking it as most recently used.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        self.inner.get(key)
    }

    /// Insert or replace `key`. Returns the evicted entry, if any.
    pub fn insert(&mut self, key: K, value: V) -> Option<(K, V)> {
        // `push` also hands back the old pair when `key` was already present.
        let replaced = self.inner.contains(&key);
        let evicted = self.inner.push(key, value).filter(|_| !replaced);
        if evicted.is_some() {
            self.stats.evictions += 1;
        }
        evicted
    }

    /// Return the cached value for `key`, computing and inserting it on a miss.
    ///
    /// A failed computation leaves the cache untouched.
    pub fn get_or_try_insert_with<E>(
        &mut self,
        key: K,
        compute: impl FnOnce() -> Result<V, E>,
    ) -> Result<&V, E> {
        let miss = !self.inner.contains(&key);
        let full = self.inner.len() == self.inner.cap().get();
        let stats = &mut self.stats;
        if miss {
            stats.misses += 1;
        } else {
            stats.hits += 1;
        }

        let value = self.inner.try_get_or_insert(key, compute)?;
        if miss && full {
            stats.evictions += 1;
        }
        Ok(value)
    }

    /// Drop every entry (statistics are kept).
    pub fn clear(&mut self) {
        self.inner.clear();
    }

    /// Keys ordered from most to least recently used.
    pub fn keys_by_recency(&self) -> Vec<K> {
        self.inner.iter().map(|(k, _)| k.clone()).collect()
    }
}
