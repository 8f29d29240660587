//! In-memory TTL store with a capacity bound and running statistics.
//!
//! One instance per artifact type. All mutation happens under a single mutex
//! that is never held across an await, and readers only ever receive clones,
//! so a half-written entry cannot be observed.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::entry::CacheEntry;
use crate::model::Provenance;

/// Outcome of a read that distinguishes "expired" from "never stored".
#[derive(Debug, Clone)]
pub enum Lookup<T> {
    Fresh(CacheEntry<T>),
    /// The entry was past its TTL. It has been evicted; this is the removed copy.
    Expired(CacheEntry<T>),
    Missing,
}

impl<T> Lookup<T> {
    pub fn fresh(self) -> Option<CacheEntry<T>> {
        match self {
            Lookup::Fresh(entry) => Some(entry),
            _ => None,
        }
    }
}

/// Running counters for one store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub total_requests: u64,
    pub hit_rate: f64,
    pub item_count: usize,
    pub capacity: usize,
    pub evictions: u64,
    pub expirations: u64,
}

/// An entry whose provenance puts it below a confidence threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LowConfidenceEntry {
    pub key: String,
    pub confidence: f32,
    pub provenance: Provenance,
}

struct Slot<T> {
    entry: CacheEntry<T>,
    seq: u64,
}

#[derive(Default)]
struct Counters {
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
}

struct Inner<T> {
    entries: HashMap<String, Slot<T>>,
    /// Set order: sequence number → key. The first entry is the least recently set.
    order: BTreeMap<u64, String>,
    next_seq: u64,
    counters: Counters,
    /// Copies evicted on read, kept for recovery until the key is set, deleted or cleared.
    evicted: HashMap<String, CacheEntry<T>>,
}

impl<T> Inner<T> {
    fn remove(&mut self, key: &str) -> Option<CacheEntry<T>> {
        let slot = self.entries.remove(key)?;
        self.order.remove(&slot.seq);
        Some(slot.entry)
    }
}

/// Bounded key → entry map with lazy expiry.
pub struct CacheStore<T> {
    name: String,
    capacity: usize,
    inner: Mutex<Inner<T>>,
}

impl<T> CacheStore<T> {
    /// Create an empty store. A zero capacity is treated as one.
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            capacity: capacity.max(1),
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                order: BTreeMap::new(),
                next_seq: 0,
                counters: Counters::default(),
                evicted: HashMap::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> std::fmt::Debug for CacheStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("len", &self.lock().entries.len())
            .finish()
    }
}

impl<T: Clone> CacheStore<T> {
    /// Data for `key` if present and unexpired.
    pub fn get(&self, key: &str) -> Option<T> {
        self.lookup(key).fresh().map(|entry| entry.data)
    }

    /// Full entry (data, provenance, timestamps) if present and unexpired.
    pub fn get_entry(&self, key: &str) -> Option<CacheEntry<T>> {
        self.lookup(key).fresh()
    }

    /// Fresh entry for `key` without touching counters or evicting.
    pub fn peek(&self, key: &str) -> Option<CacheEntry<T>> {
        let now = Instant::now();
        self.lock().entries.get(key).filter(|slot| slot.entry.is_valid_at(now)).map(|slot| slot.entry.clone())
    }

    /// Latest copy of `key` for recovery, fresh or not: the stored entry, else
    /// the copy last evicted on read. Does not touch counters.
    pub fn last_known(&self, key: &str) -> Option<CacheEntry<T>> {
        let inner = self.lock();
        inner.entries.get(key).map(|slot| slot.entry.clone()).or_else(|| inner.evicted.get(key).cloned())
    }

    /// Read `key`, evicting it if expired. Validity is re-checked on every call.
    pub fn lookup(&self, key: &str) -> Lookup<T> {
        let now = Instant::now();
        let mut guard = self.lock();
        let inner = &mut *guard;

        let valid = match inner.entries.get(key) {
            Some(slot) => slot.entry.is_valid_at(now),
            None => {
                inner.counters.misses += 1;
                return Lookup::Missing;
            }
        };

        if valid {
            inner.counters.hits += 1;
            return match inner.entries.get(key) {
                Some(slot) => Lookup::Fresh(slot.entry.clone()),
                None => Lookup::Missing,
            };
        }

        inner.counters.misses += 1;
        inner.counters.expirations += 1;
        match inner.remove(key) {
            Some(entry) => {
                tracing::debug!(store = %self.name, key, "evicted expired entry on read");
                if inner.evicted.len() >= self.capacity
                    && let Some(victim) = inner.evicted.keys().next().cloned()
                {
                    inner.evicted.remove(&victim);
                }
                inner.evicted.insert(key.to_string(), entry.clone());
                Lookup::Expired(entry)
            }
            None => Lookup::Missing,
        }
    }

    /// Insert or overwrite. At capacity, the least recently set entry is evicted.
    pub fn set(&self, key: &str, data: T, ttl: Duration, provenance: Provenance) {
        let mut guard = self.lock();
        let inner = &mut *guard;
        inner.evicted.remove(key);

        if inner.remove(key).is_none()
            && inner.entries.len() >= self.capacity
            && let Some((_, oldest)) = inner.order.pop_first()
        {
            inner.entries.remove(&oldest);
            inner.counters.evictions += 1;
            tracing::debug!(store = %self.name, key = %oldest, "evicted least recently set entry");
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.order.insert(seq, key.to_string());
        inner
            .entries
            .insert(key.to_string(), Slot { entry: CacheEntry::new(data, ttl, provenance), seq });
    }

    /// Remove `key`. Returns whether it was present.
    pub fn delete(&self, key: &str) -> bool {
        let mut inner = self.lock();
        inner.evicted.remove(key);
        inner.remove(key).is_some()
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.order.clear();
        inner.evicted.clear();
    }

    /// Keys containing `pattern`; a trailing `*` turns it into a prefix match.
    pub fn keys_matching(&self, pattern: &str) -> Vec<String> {
        let inner = self.lock();
        let mut keys: Vec<String> = inner
            .entries
            .keys()
            .filter(|key| matches_pattern(key, pattern))
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    /// Delete every key matching `pattern`. Returns the number removed.
    pub fn delete_matching(&self, pattern: &str) -> usize {
        let mut guard = self.lock();
        let inner = &mut *guard;
        let keys: Vec<String> = inner
            .entries
            .keys()
            .filter(|key| matches_pattern(key, pattern))
            .cloned()
            .collect();
        for key in &keys {
            inner.remove(key);
        }
        inner.evicted.retain(|key, _| !matches_pattern(key, pattern));
        keys.len()
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        let total_requests = inner.counters.hits + inner.counters.misses;
        let hit_rate = if total_requests == 0 { 0.0 } else { inner.counters.hits as f64 / total_requests as f64 };
        CacheStats {
            hits: inner.counters.hits,
            misses: inner.counters.misses,
            total_requests,
            hit_rate,
            item_count: inner.entries.len(),
            capacity: self.capacity,
            evictions: inner.counters.evictions,
            expirations: inner.counters.expirations,
        }
    }

    pub fn reset_stats(&self) {
        self.lock().counters = Counters::default();
    }

    /// Keys whose TTL has elapsed but that have not been read or swept yet.
    pub fn expired_entries(&self) -> Vec<String> {
        let now = Instant::now();
        let inner = self.lock();
        let mut keys: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, slot)| !slot.entry.is_valid_at(now))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Evict every expired entry. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut guard = self.lock();
        let inner = &mut *guard;
        let expired: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, slot)| !slot.entry.is_valid_at(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            inner.remove(key);
        }
        inner.counters.expirations += expired.len() as u64;
        expired.len()
    }

    /// Entries whose provenance confidence is below `threshold`.
    pub fn low_confidence_entries(&self, threshold: f32) -> Vec<LowConfidenceEntry> {
        let inner = self.lock();
        let mut entries: Vec<LowConfidenceEntry> = inner
            .entries
            .iter()
            .filter(|(_, slot)| slot.entry.confidence() < threshold)
            .map(|(key, slot)| LowConfidenceEntry {
                key: key.clone(),
                confidence: slot.entry.confidence(),
                provenance: slot.entry.provenance,
            })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        entries
    }
}

fn matches_pattern(key: &str, pattern: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => key.starts_with(prefix),
        None => key.contains(pattern),
    }
}

/// Type-erased maintenance view over a store, used by the background optimizer
/// and administrative invalidation.
pub trait CacheMaintenance: Send + Sync {
    fn name(&self) -> &str;
    fn stats(&self) -> CacheStats;
    fn expired_entries(&self) -> Vec<String>;
    fn purge_expired(&self) -> usize;
    fn low_confidence_entries(&self, threshold: f32) -> Vec<LowConfidenceEntry>;
    fn delete_matching(&self, pattern: &str) -> usize;
    fn clear(&self);
}

impl<T: Clone + Send> CacheMaintenance for CacheStore<T> {
    fn name(&self) -> &str {
        CacheStore::name(self)
    }

    fn stats(&self) -> CacheStats {
        CacheStore::stats(self)
    }

    fn expired_entries(&self) -> Vec<String> {
        CacheStore::expired_entries(self)
    }

    fn purge_expired(&self) -> usize {
        CacheStore::purge_expired(self)
    }

    fn low_confidence_entries(&self, threshold: f32) -> Vec<LowConfidenceEntry> {
        CacheStore::low_confidence_entries(self, threshold)
    }

    fn delete_matching(&self, pattern: &str) -> usize {
        CacheStore::delete_matching(self, pattern)
    }

    fn clear(&self) {
        CacheStore::clear(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: Duration = Duration::from_secs(86_400);

    #[test]
    fn test_set_then_get() {
        let store = CacheStore::new("requirements", 10);
        store.set("requirements:fr:tourist:us", "data".to_string(), DAY, Provenance::FusedOfficialAndGenerated);

        assert_eq!(store.get("requirements:fr:tourist:us").as_deref(), Some("data"));
        let entry = store.get_entry("requirements:fr:tourist:us").unwrap();
        assert_eq!(entry.provenance, Provenance::FusedOfficialAndGenerated);
        assert_eq!(entry.confidence(), Provenance::FusedOfficialAndGenerated.confidence());
    }

    #[test]
    fn test_get_missing() {
        let store: CacheStore<String> = CacheStore::new("test", 10);
        assert!(store.get("nonexistent").is_none());
        assert!(matches!(store.lookup("nonexistent"), Lookup::Missing));
    }

    #[tokio::test(start_paused = true)]
    async fn test_peek_leaves_counters_and_entry() {
        let store = CacheStore::new("test", 10);
        store.set("k", 1, Duration::from_secs(10), Provenance::GeneratedOnly);
        assert_eq!(store.peek("k").map(|e| e.data), Some(1));
        assert!(store.peek("other").is_none());

        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(store.peek("k").is_none());
        assert_eq!(store.len(), 1);
        assert_eq!(store.stats().total_requests, 0);
    }

    #[test]
    fn test_overwrite() {
        let store = CacheStore::new("test", 10);
        store.set("k", 1, DAY, Provenance::GeneratedOnly);
        store.set("k", 2, DAY, Provenance::FusedOfficialAndGenerated);
        assert_eq!(store.get("k"), Some(2));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_boundary() {
        let store = CacheStore::new("test", 10);
        let ttl = Duration::from_secs(60);
        store.set("k", "v", ttl, Provenance::GeneratedOnly);

        tokio::time::advance(ttl - Duration::from_millis(1)).await;
        assert_eq!(store.get("k"), Some("v"));

        tokio::time::advance(Duration::from_millis(2)).await;
        assert_eq!(store.get("k"), None);
        assert!(store.is_empty(), "expired entry is evicted on read");
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_returns_expired_copy() {
        let store = CacheStore::new("test", 10);
        store.set("k", "old", Duration::from_secs(1), Provenance::FusedOfficialAndGenerated);
        tokio::time::advance(Duration::from_secs(2)).await;

        match store.lookup("k") {
            Lookup::Expired(entry) => assert_eq!(entry.data, "old"),
            other => panic!("expected expired, got {other:?}"),
        }
        assert!(matches!(store.lookup("k"), Lookup::Missing));
        assert_eq!(store.stats().expirations, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_known_outlives_eviction_on_read() {
        let store = CacheStore::new("requirements", 10);
        store.set("requirements:fr:tourist:us", "old", Duration::from_secs(1), Provenance::GeneratedOnly);
        store.set("requirements:de:tourist:us", "de", Duration::from_secs(1), Provenance::GeneratedOnly);
        tokio::time::advance(Duration::from_secs(2)).await;

        assert_eq!(store.last_known("requirements:fr:tourist:us").map(|e| e.data), Some("old"));
        assert!(matches!(store.lookup("requirements:fr:tourist:us"), Lookup::Expired(_)));
        assert!(matches!(store.lookup("requirements:de:tourist:us"), Lookup::Expired(_)));
        let requests = store.stats().total_requests;

        let entry = store.last_known("requirements:fr:tourist:us").unwrap();
        assert_eq!(entry.data, "old");
        assert!(entry.is_expired());
        assert_eq!(store.stats().total_requests, requests);
        assert!(store.is_empty());

        store.set("requirements:fr:tourist:us", "new", DAY, Provenance::GeneratedOnly);
        assert_eq!(store.last_known("requirements:fr:tourist:us").map(|e| e.data), Some("new"));
        store.delete("requirements:fr:tourist:us");
        assert!(store.last_known("requirements:fr:tourist:us").is_none());

        assert_eq!(store.delete_matching("requirements:de:*"), 0);
        assert!(store.last_known("requirements:de:tourist:us").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_drops_evicted_copies() {
        let store = CacheStore::new("test", 1);
        store.set("a", 1, Duration::from_secs(1), Provenance::GeneratedOnly);
        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(matches!(store.lookup("a"), Lookup::Expired(_)));
        assert!(store.last_known("a").is_some());

        store.clear();
        assert!(store.last_known("a").is_none());
    }

    #[test]
    fn test_capacity_evicts_least_recently_set() {
        let store = CacheStore::new("test", 2);
        store.set("a", 1, DAY, Provenance::GeneratedOnly);
        store.set("b", 2, DAY, Provenance::GeneratedOnly);
        store.set("a", 10, DAY, Provenance::GeneratedOnly);
        store.set("c", 3, DAY, Provenance::GeneratedOnly);

        assert_eq!(store.get("b"), None, "b was set least recently");
        assert_eq!(store.get("a"), Some(10));
        assert_eq!(store.get("c"), Some(3));
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn test_reads_do_not_refresh_set_order() {
        let store = CacheStore::new("test", 2);
        store.set("a", 1, DAY, Provenance::GeneratedOnly);
        store.set("b", 2, DAY, Provenance::GeneratedOnly);
        assert_eq!(store.get("a"), Some(1));
        store.set("c", 3, DAY, Provenance::GeneratedOnly);
        assert_eq!(store.get("a"), None);
    }

    #[test]
    fn test_delete_and_clear() {
        let store = CacheStore::new("test", 10);
        store.set("a", 1, DAY, Provenance::GeneratedOnly);
        store.set("b", 2, DAY, Provenance::GeneratedOnly);

        assert!(store.delete("a"));
        assert!(!store.delete("a"));
        assert_eq!(store.len(), 1);

        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn test_keys_matching() {
        let store = CacheStore::new("test", 10);
        store.set("requirements:fr:tourist:us", 1, DAY, Provenance::GeneratedOnly);
        store.set("requirements:fr:student:gb", 2, DAY, Provenance::GeneratedOnly);
        store.set("requirements:de:tourist:us", 3, DAY, Provenance::GeneratedOnly);

        assert_eq!(store.keys_matching(":fr:"), vec!["requirements:fr:student:gb", "requirements:fr:tourist:us"]);
        assert_eq!(store.keys_matching("requirements:de*"), vec!["requirements:de:tourist:us"]);
        assert!(store.keys_matching("tourist*").is_empty());
        assert_eq!(store.keys_matching("").len(), 3);

        assert_eq!(store.delete_matching(":fr:"), 2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_stats_and_reset() {
        let store = CacheStore::new("test", 10);
        store.set("a", 1, DAY, Provenance::GeneratedOnly);
        store.get("a");
        store.get("a");
        store.get("missing");

        let stats = store.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_requests, 3);
        assert!((stats.hit_rate - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats.item_count, 1);

        store.reset_stats();
        let stats = store.stats();
        assert_eq!(stats.total_requests, 0);
        assert_eq!(stats.hit_rate, 0.0);
        assert_eq!(stats.item_count, 1, "reset does not drop entries");
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entries_and_purge() {
        let store = CacheStore::new("test", 10);
        store.set("short", 1, Duration::from_secs(5), Provenance::GeneratedOnly);
        store.set("long", 2, DAY, Provenance::GeneratedOnly);
        tokio::time::advance(Duration::from_secs(6)).await;

        assert_eq!(store.expired_entries(), vec!["short"]);
        assert_eq!(store.len(), 2, "listing does not evict");

        assert_eq!(store.purge_expired(), 1);
        assert!(store.expired_entries().is_empty());
        assert_eq!(store.get("long"), Some(2));
    }

    #[test]
    fn test_low_confidence_entries() {
        let store = CacheStore::new("test", 10);
        store.set("fused", 1, DAY, Provenance::FusedOfficialAndGenerated);
        store.set("generated", 2, DAY, Provenance::GeneratedOnly);
        store.set("fallback", 3, DAY, Provenance::StaticFallback);

        let low = store.low_confidence_entries(0.75);
        let keys: Vec<&str> = low.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["fallback", "generated"]);
        assert_eq!(low[0].provenance, Provenance::StaticFallback);
    }

    #[test]
    fn test_debug_without_clone() {
        let store: CacheStore<Mutex<u8>> = CacheStore::new("status", 0);
        assert_eq!(store.capacity(), 1);
        assert_eq!(format!("{store:?}"), r#"CacheStore { name: "status", capacity: 1, len: 0 }"#);

        let store = CacheStore::new("catalog", 4);
        store.set("a", 1, DAY, Provenance::GeneratedOnly);
        assert!(format!("{store:?}").contains("len: 1"));
    }

    #[test]
    fn test_maintenance_trait_object() {
        let store = CacheStore::new("requirements", 10);
        store.set("a", 1, DAY, Provenance::GeneratedOnly);
        let view: &dyn CacheMaintenance = &store;
        assert_eq!(view.name(), "requirements");
        assert_eq!(view.stats().item_count, 1);
        view.clear();
        assert!(store.is_empty());
    }
}
