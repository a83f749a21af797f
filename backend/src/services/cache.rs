//! Memoization at the query boundary.
//!
//! [`ResultCache`] is keyed by an arbitrary hashable key and offers:
//! - single flight: concurrent callers for one key share one computation
//! - freshness: entries older than the TTL are recomputed
//! - bounded size: the least recently used entry is evicted past capacity
//!
//! Failed computations are never stored.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

struct Entry<V> {
    value: V,
    created_at: Instant,
    last_access: u64,
}

/// Counters exposed on the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
}

/// A caller's share of the per-key lock.
///
/// Dropping it removes the key's lock once no other caller holds it, also
/// when the owning future is cancelled mid-computation.
struct Flight<'a, K: Eq + Hash> {
    inflight: &'a Mutex<HashMap<K, Arc<tokio::sync::Mutex<()>>>>,
    key: K,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl<'a, K: Eq + Hash + Clone> Flight<'a, K> {
    fn join(inflight: &'a Mutex<HashMap<K, Arc<tokio::sync::Mutex<()>>>>, key: K) -> Self {
        let lock = inflight
            .lock()
            .entry(key.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone();
        Self {
            inflight,
            key,
            lock,
        }
    }
}

impl<K: Eq + Hash> Drop for Flight<'_, K> {
    fn drop(&mut self) {
        let mut inflight = self.inflight.lock();
        // One handle in the map plus ours
        if Arc::strong_count(&self.lock) == 2 {
            inflight.remove(&self.key);
        }
    }
}

pub struct ResultCache<K, V> {
    entries: Mutex<HashMap<K, Entry<V>>>,
    inflight: Mutex<HashMap<K, Arc<tokio::sync::Mutex<()>>>>,
    ttl: Duration,
    capacity: usize,
    clock: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K, V> ResultCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            inflight: Mutex::new(HashMap::new()),
            ttl,
            capacity: capacity.max(1),
            clock: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    /// Fresh cached value for `key`, refreshing its recency.
    fn lookup(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock();
        let fresh = match entries.get(key) {
            Some(entry) => entry.created_at.elapsed() < self.ttl,
            None => return None,
        };
        if !fresh {
            entries.remove(key);
            return None;
        }
        let tick = self.tick();
        entries.get_mut(key).map(|entry| {
            entry.last_access = tick;
            entry.value.clone()
        })
    }

    fn store(&self, key: K, value: V) {
        let mut entries = self.entries.lock();
        let tick = self.tick();
        entries.insert(
            key,
            Entry {
                value,
                created_at: Instant::now(),
                last_access: tick,
            },
        );

        while entries.len() > self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.last_access)
                .map(|(k, _)| k.clone());
            match oldest {
                Some(k) => {
                    entries.remove(&k);
                }
                None => break,
            }
        }
    }

    /// Return the cached value for `key`, or run `compute` once and cache
    /// its success.
    ///
    /// While a computation for `key` is in flight, other callers for the
    /// same key wait for it instead of starting their own.
    pub async fn get_or_compute<F, Fut, E>(&self, key: K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.lookup(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(value);
        }

        let flight = Flight::join(&self.inflight, key.clone());
        let _turn = flight.lock.lock().await;

        if let Some(value) = self.lookup(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(value);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let computed = compute().await;
        if let Ok(value) = &computed {
            self.store(key, value.clone());
        }
        computed
    }

    /// Drop one entry. Returns whether it existed.
    pub fn invalidate(&self, key: &K) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    /// Drop every entry whose key matches `predicate`.
    pub fn invalidate_matching(&self, predicate: impl Fn(&K) -> bool) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|k, _| !predicate(k));
        before - entries.len()
    }

    /// Remove entries past the freshness window.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, e| e.created_at.elapsed() < self.ttl);
        before - entries.len()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys with a computation queued or running.
    pub fn inflight_len(&self) -> usize {
        self.inflight.lock().len()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            capacity: self.capacity,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
