//! A generic, thread-safe, capacity-bounded cache with per-entry TTL and
//! least-recently-used eviction. Used twice: the detection cache (flow key
//! -> `DetectionResult`) and the DPI cache (payload hash -> `AnalysisResult`).
//!
//! A single mutex guards one map; recency is tracked with a lazily-cleaned
//! queue instead of an intrusive linked list, so eviction stays close to
//! O(1) amortised without an extra dependency.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

struct Entry<V> {
    value: V,
    expires_at: Instant,
    seq: u64,
}

struct Inner<K, V> {
    map: HashMap<K, Entry<V>>,
    recency: VecDeque<(u64, K)>,
    next_seq: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
}

/// Snapshot of a cache's counters: hits, misses, evicts, hit rate, size,
/// capacity.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size: usize,
    pub capacity: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

pub struct TtlLruCache<K, V> {
    capacity: usize,
    ttl: Duration,
    inner: Mutex<Inner<K, V>>,
}

impl<K, V> TtlLruCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity,
            ttl,
            inner: Mutex::new(Inner {
                map: HashMap::new(),
                recency: VecDeque::new(),
                next_seq: 0,
                hits: 0,
                misses: 0,
                evictions: 0,
            }),
        }
    }

    /// `get(key)`: absent or expired entries are a miss (expired entries are
    /// evicted right away); a fresh hit is promoted to most-recently-used.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();

        let expired = match inner.map.get(key) {
            Some(entry) => entry.expires_at <= now,
            None => {
                inner.misses += 1;
                return None;
            }
        };

        if expired {
            inner.map.remove(key);
            inner.misses += 1;
            return None;
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        let value = {
            let entry = inner.map.get_mut(key).unwrap();
            entry.seq = seq;
            entry.value.clone()
        };
        inner.recency.push_back((seq, key.clone()));
        inner.hits += 1;
        Some(value)
    }

    /// `put(key, value)`: capacity 0 makes every put a no-op. Updating an
    /// existing key refreshes its value, expiry and recency. Otherwise the
    /// key is inserted MRU; if this pushes the map over capacity, the
    /// single least-recently-used entry is evicted.
    pub fn put(&self, key: K, value: V) {
        if self.capacity == 0 {
            return;
        }
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        let seq = inner.next_seq;
        inner.next_seq += 1;

        inner.map.insert(
            key.clone(),
            Entry {
                value,
                expires_at: now + self.ttl,
                seq,
            },
        );
        inner.recency.push_back((seq, key));

        if inner.map.len() > self.capacity {
            Self::evict_one(&mut inner);
        }
    }

    fn evict_one(inner: &mut Inner<K, V>) {
        while let Some((seq, key)) = inner.recency.pop_front() {
            match inner.map.get(&key) {
                Some(entry) if entry.seq == seq => {
                    inner.map.remove(&key);
                    inner.evictions += 1;
                    return;
                }
                // Stale recency record superseded by a later touch; skip it.
                _ => continue,
            }
        }
    }

    /// Full sweep removing every expired entry, regardless of recency
    /// order — recency and expiry are independent orderings, so an
    /// early-exit-at-first-fresh-tail-entry sweep would miss expired
    /// entries that happen to have been touched more recently than a
    /// still-fresh one.
    pub fn cleanup_expired(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        inner.map.retain(|_, entry| entry.expires_at > now);
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.map.clear();
        inner.recency.clear();
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
            size: inner.map.len(),
            capacity: self.capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_hits() {
        let cache = TtlLruCache::new(10, Duration::from_secs(60));
        cache.put("a", 1);
        assert_eq!(cache.get(&"a"), Some(1));
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn capacity_zero_is_always_a_no_op_miss() {
        let cache: TtlLruCache<&str, i32> = TtlLruCache::new(0, Duration::from_secs(60));
        cache.put("a", 1);
        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.stats().size, 0);
    }

    #[test]
    fn inserting_past_capacity_evicts_lru() {
        let cache = TtlLruCache::new(2, Duration::from_secs(60));
        cache.put("a", 1);
        cache.put("b", 2);
        // touch "a" so "b" becomes the least-recently-used entry
        let _ = cache.get(&"a");
        cache.put("c", 3);

        assert_eq!(cache.get(&"a"), Some(1));
        assert_eq!(cache.get(&"b"), None);
        assert_eq!(cache.get(&"c"), Some(3));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn expired_entry_misses_on_read() {
        let cache = TtlLruCache::new(10, Duration::from_millis(1));
        cache.put("a", 1);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(cache.get(&"a"), None);
    }

    #[test]
    fn cleanup_expired_sweeps_every_entry() {
        let cache = TtlLruCache::new(10, Duration::from_millis(1));
        cache.put("a", 1);
        cache.put("b", 2);
        std::thread::sleep(Duration::from_millis(20));
        cache.cleanup_expired();
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn clear_empties_the_cache() {
        let cache = TtlLruCache::new(10, Duration::from_secs(60));
        cache.put("a", 1);
        cache.clear();
        assert_eq!(cache.get(&"a"), None);
    }

    #[test]
    fn size_never_exceeds_capacity() {
        let cache = TtlLruCache::new(3, Duration::from_secs(60));
        for i in 0..50 {
            cache.put(i, i);
        }
        assert!(cache.stats().size <= 3);
    }
}
