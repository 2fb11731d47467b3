//! Indexed Concurrent Aggregate
//!
//! Keyed collection that also supports stable positional access, for paging
//! UIs that read "the Nth entry" while producers keep inserting.
//!
//! # Design
//!
//! - `DashMap` for key lookup (sharded, readers of other shards never block)
//! - Append-only order list behind a `RwLock`, written only when a key is new
//! - Values are mutated in place through `&V` (atomic fields), never replaced
//! - A structural gate taken shared by every upsert and exclusively by
//!   `clear()`, so a clear never interleaves with a half-done insert
//!
//! Lock order: gate -> map shard -> order list.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::hash::Hash;
use std::ops::Deref;
use std::sync::Arc;

/// One key/value pair held by an [`IndexedAggregate`]
#[derive(Debug)]
pub struct IndexedEntry<K, V> {
    key: K,
    value: V,
}

impl<K, V> IndexedEntry<K, V> {
    /// Key this entry was first observed under
    #[inline(always)]
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Shared value
    #[inline(always)]
    pub fn value(&self) -> &V {
        &self.value
    }
}

impl<K, V> Deref for IndexedEntry<K, V> {
    type Target = V;

    fn deref(&self) -> &V {
        &self.value
    }
}

/// Append-only keyed collection with O(1) key update and O(1) index access
///
/// # Invariants
/// - an entry's index never changes and is never reused until `clear()`
/// - iteration by index follows first-insertion order
/// - a key maps to exactly one value for the container's lifetime
pub struct IndexedAggregate<K, V> {
    map: DashMap<K, Arc<IndexedEntry<K, V>>>,
    order: RwLock<Vec<Arc<IndexedEntry<K, V>>>>,
    gate: RwLock<()>,
}

impl<K, V> IndexedAggregate<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Create an empty aggregate
    pub fn new() -> Self {
        Self {
            map: DashMap::new(),
            order: RwLock::new(Vec::new()),
            gate: RwLock::new(()),
        }
    }

    /// Insert `initial()` under `key` if absent, otherwise `merge` the
    /// existing value in place. Returns the entry either way.
    ///
    /// `initial` runs at most once and only for the caller that wins the
    /// insert; every other concurrent caller for the same key runs `merge`.
    pub fn upsert<I, M>(&self, key: K, initial: I, merge: M) -> Arc<IndexedEntry<K, V>>
    where
        I: FnOnce() -> V,
        M: FnOnce(&V),
    {
        let _gate = self.gate.read();

        // Fast path: shard read lock only
        let existing = self.map.get(&key).map(|e| Arc::clone(e.value()));
        if let Some(entry) = existing {
            merge(&entry.value);
            return entry;
        }

        let inserted = match self.map.entry(key) {
            Entry::Occupied(occupied) => Err(Arc::clone(occupied.get())),
            Entry::Vacant(vacant) => {
                let entry = Arc::new(IndexedEntry {
                    key: vacant.key().clone(),
                    value: initial(),
                });
                // Still under the shard write lock: no other caller can
                // append this key, and the index is assigned exactly once.
                self.order.write().push(Arc::clone(&entry));
                vacant.insert(Arc::clone(&entry));
                Ok(entry)
            }
        };

        match inserted {
            Ok(entry) => entry,
            Err(entry) => {
                merge(&entry.value);
                entry
            }
        }
    }

    /// Entry for `key`, if present
    pub fn get(&self, key: &K) -> Option<Arc<IndexedEntry<K, V>>> {
        self.map.get(key).map(|e| Arc::clone(e.value()))
    }

    /// The `index`-th appended entry, or `None` past the current end
    #[inline]
    pub fn get_by_index(&self, index: usize) -> Option<Arc<IndexedEntry<K, V>>> {
        self.order.read().get(index).cloned()
    }

    /// Up to `count` entries starting at `start`, in index order
    pub fn snapshot_range(&self, start: usize, count: usize) -> Vec<Arc<IndexedEntry<K, V>>> {
        let order = self.order.read();
        order.iter().skip(start).take(count).cloned().collect()
    }

    /// All entries, in index order
    pub fn entries(&self) -> Vec<Arc<IndexedEntry<K, V>>> {
        self.order.read().clone()
    }

    /// Number of distinct keys
    #[inline]
    pub fn len(&self) -> usize {
        self.order.read().len()
    }

    /// Check if empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every entry. Indices restart at zero.
    pub fn clear(&self) {
        let _gate = self.gate.write();
        let mut order = self.order.write();
        self.map.clear();
        order.clear();
    }
}

impl<K, V> Default for IndexedAggregate<K, V>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::thread;

    fn counter(start: u64) -> AtomicU64 {
        AtomicU64::new(start)
    }

    fn bump(v: &AtomicU64) {
        v.fetch_add(1, Ordering::Relaxed);
    }

    #[test]
    fn test_upsert_insert_then_merge() {
        let agg: IndexedAggregate<u16, AtomicU64> = IndexedAggregate::new();

        let first = agg.upsert(443, || counter(1), bump);
        assert_eq!(first.load(Ordering::Relaxed), 1);

        let second = agg.upsert(443, || counter(1), bump);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.load(Ordering::Relaxed), 2);
        assert_eq!(agg.len(), 1);
    }

    #[test]
    fn test_index_order_is_insertion_order() {
        let agg: IndexedAggregate<&str, AtomicU64> = IndexedAggregate::new();
        for key in ["c", "a", "b", "a", "c"] {
            agg.upsert(key, || counter(1), bump);
        }

        let keys: Vec<&str> = (0..agg.len())
            .map(|i| *agg.get_by_index(i).unwrap().key())
            .collect();
        assert_eq!(keys, vec!["c", "a", "b"]);
        assert_eq!(agg.get(&"a").unwrap().load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_get_by_index_out_of_range() {
        let agg: IndexedAggregate<u8, AtomicU64> = IndexedAggregate::new();
        assert!(agg.get_by_index(0).is_none());
        agg.upsert(6, || counter(1), bump);
        assert!(agg.get_by_index(0).is_some());
        assert!(agg.get_by_index(1).is_none());
        assert!(agg.get_by_index(usize::MAX).is_none());
    }

    #[test]
    fn test_snapshot_range_pages() {
        let agg: IndexedAggregate<u32, AtomicU64> = IndexedAggregate::new();
        for key in 0..10u32 {
            agg.upsert(key, || counter(1), bump);
        }

        let page: Vec<u32> = agg.snapshot_range(4, 3).iter().map(|e| *e.key()).collect();
        assert_eq!(page, vec![4, 5, 6]);
        assert_eq!(agg.snapshot_range(8, 10).len(), 2);
        assert!(agg.snapshot_range(20, 5).is_empty());
    }

    #[test]
    fn test_clear_resets_indices() {
        let agg: IndexedAggregate<u32, AtomicU64> = IndexedAggregate::new();
        agg.upsert(1, || counter(1), bump);
        agg.upsert(2, || counter(1), bump);
        agg.clear();

        assert!(agg.is_empty());
        assert!(agg.get(&1).is_none());
        assert!(agg.get_by_index(0).is_none());

        agg.upsert(2, || counter(7), bump);
        assert_eq!(*agg.get_by_index(0).unwrap().key(), 2);
        assert_eq!(agg.get(&2).unwrap().load(Ordering::Relaxed), 7);
    }

    #[test]
    fn test_concurrent_upserts() {
        const THREADS: u64 = 8;
        const PER_THREAD: u64 = 2_000;
        const KEYS: u64 = 257;

        let agg: Arc<IndexedAggregate<u64, AtomicU64>> = Arc::new(IndexedAggregate::new());
        let mut handles = Vec::new();

        for t in 0..THREADS {
            let agg = agg.clone();
            handles.push(thread::spawn(move || {
                for i in 0..PER_THREAD {
                    let key = (t * 31 + i) % KEYS;
                    agg.upsert(key, || counter(1), bump);
                }
            }));
        }

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(agg.len() as u64, KEYS);

        let mut seen = HashSet::new();
        let mut total = 0;
        for i in 0..agg.len() {
            let entry = agg.get_by_index(i).unwrap();
            assert!(seen.insert(*entry.key()), "key {} indexed twice", entry.key());
            total += entry.load(Ordering::Relaxed);
        }
        assert_eq!(seen.len() as u64, KEYS);
        assert_eq!(total, THREADS * PER_THREAD);
    }

    #[test]
    fn test_readers_during_writes() {
        let agg: Arc<IndexedAggregate<u64, AtomicU64>> = Arc::new(IndexedAggregate::new());

        let writer = {
            let agg = agg.clone();
            thread::spawn(move || {
                for key in 0..5_000u64 {
                    agg.upsert(key, || counter(key), bump);
                }
            })
        };

        let reader = {
            let agg = agg.clone();
            thread::spawn(move || {
                let mut last_len = 0;
                for _ in 0..5_000 {
                    let len = agg.len();
                    assert!(len >= last_len);
                    if len > 0 {
                        // index i always holds key i for this writer
                        let entry = agg.get_by_index(len - 1).unwrap();
                        assert_eq!(*entry.key() as usize, len - 1);
                    }
                    last_len = len;
                }
            })
        };

        writer.join().unwrap();
        reader.join().unwrap();
        assert_eq!(agg.len(), 5_000);
    }

    #[test]
    fn test_clear_during_upserts() {
        const WRITERS: u64 = 4;
        const KEYS: u64 = 300;

        let agg: Arc<IndexedAggregate<u64, AtomicU64>> = Arc::new(IndexedAggregate::new());
        let mut handles = Vec::new();

        for t in 0..WRITERS {
            let agg = agg.clone();
            handles.push(thread::spawn(move || {
                for i in 0..5_000u64 {
                    agg.upsert((t * 7 + i) % KEYS, || counter(1), bump);
                }
            }));
        }

        let clearer = {
            let agg = agg.clone();
            thread::spawn(move || {
                for _ in 0..200 {
                    agg.clear();
                    thread::yield_now();
                }
            })
        };

        let reader = {
            let agg = agg.clone();
            thread::spawn(move || {
                for _ in 0..2_000 {
                    assert!(agg.len() as u64 <= KEYS);
                    let entries = agg.entries();
                    let mut seen = HashSet::new();
                    for entry in &entries {
                        assert!(*entry.key() < KEYS);
                        assert!(seen.insert(*entry.key()), "key {} indexed twice", entry.key());
                    }
                }
            })
        };

        for h in handles {
            h.join().unwrap();
        }
        clearer.join().unwrap();
        reader.join().unwrap();

        // Index and key lookup agree once writers settle
        for i in 0..agg.len() {
            let entry = agg.get_by_index(i).unwrap();
            let by_key = agg.get(entry.key()).unwrap();
            assert!(Arc::ptr_eq(&entry, &by_key));
        }
        assert!(agg.get_by_index(agg.len()).is_none());
    }
}
