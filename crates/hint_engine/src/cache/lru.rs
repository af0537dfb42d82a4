//! Least-recently-used cache
//!
//! Entries live in a [`SlotMap`]; slot keys double as the links of an
//! intrusive doubly-linked recency list. A sentinel node closes the list
//! into a ring: `sentinel.next` is the most recently used entry and
//! `sentinel.prev` the least recently used one. Every operation is O(1)
//! and runs under one coarse lock.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

use parking_lot::Mutex;
use slotmap::{DefaultKey, SlotMap};

use super::{CacheError, CacheResult};

/// Recency list node
struct Node<K, V> {
    /// `None` only for the sentinel
    entry: Option<(K, V)>,
    prev: DefaultKey,
    next: DefaultKey,
}

/// Map and list; always mutated together under the cache lock
struct LruInner<K, V> {
    map: HashMap<K, DefaultKey>,
    nodes: SlotMap<DefaultKey, Node<K, V>>,
    sentinel: DefaultKey,
    capacity: usize,
}

impl<K: Hash + Eq + Clone, V> LruInner<K, V> {
    fn new(capacity: usize) -> Self {
        let mut nodes = SlotMap::with_capacity(capacity + 1);
        let sentinel = nodes.insert_with_key(|key| Node {
            entry: None,
            prev: key,
            next: key,
        });

        Self {
            map: HashMap::with_capacity(capacity),
            nodes,
            sentinel,
            capacity,
        }
    }

    fn unlink(&mut self, key: DefaultKey) {
        let (prev, next) = {
            let node = &self.nodes[key];
            (node.prev, node.next)
        };
        self.nodes[prev].next = next;
        self.nodes[next].prev = prev;
    }

    fn push_front(&mut self, key: DefaultKey) {
        let head = self.nodes[self.sentinel].next;
        {
            let node = &mut self.nodes[key];
            node.prev = self.sentinel;
            node.next = head;
        }
        self.nodes[head].prev = key;
        self.nodes[self.sentinel].next = key;
    }

    fn promote(&mut self, key: DefaultKey) {
        self.unlink(key);
        self.push_front(key);
    }

    fn remove_node(&mut self, key: DefaultKey) -> Option<(K, V)> {
        self.unlink(key);
        let entry = self.nodes.remove(key)?.entry?;
        self.map.remove(&entry.0);
        Some(entry)
    }

    fn evict_lru(&mut self) -> Option<(K, V)> {
        let tail = self.nodes[self.sentinel].prev;
        if tail == self.sentinel {
            return None;
        }
        self.remove_node(tail)
    }

    fn clear(&mut self) {
        let sentinel = self.sentinel;
        self.nodes.retain(|key, _| key == sentinel);
        self.map.clear();
        let node = &mut self.nodes[sentinel];
        node.prev = sentinel;
        node.next = sentinel;
    }
}

/// Thread-safe fixed-capacity LRU cache
///
/// Values are handed out by clone, so large values are usually stored
/// behind an [`std::sync::Arc`].
pub struct LruCache<K, V> {
    inner: Mutex<LruInner<K, V>>,
}

impl<K: Hash + Eq + Clone, V: Clone> LruCache<K, V> {
    /// Create a cache holding at most `capacity` entries
    ///
    /// # Errors
    /// [`CacheError::ZeroCapacity`] when `capacity` is zero.
    pub fn new(capacity: usize) -> CacheResult<Self> {
        if capacity == 0 {
            return Err(CacheError::ZeroCapacity);
        }
        Ok(Self {
            inner: Mutex::new(LruInner::new(capacity)),
        })
    }

    /// Insert or replace an entry and mark it most recently used
    ///
    /// Returns the entry evicted to make room, if any.
    pub fn add(&self, key: K, value: V) -> Option<(K, V)> {
        let mut inner = self.inner.lock();

        if let Some(&node) = inner.map.get(&key) {
            if let Some(entry) = inner.nodes[node].entry.as_mut() {
                entry.1 = value;
            }
            inner.promote(node);
            return None;
        }

        let evicted = if inner.map.len() >= inner.capacity {
            inner.evict_lru()
        } else {
            None
        };

        let sentinel = inner.sentinel;
        let node = inner.nodes.insert(Node {
            entry: Some((key.clone(), value)),
            prev: sentinel,
            next: sentinel,
        });
        inner.push_front(node);
        inner.map.insert(key, node);

        evicted
    }

    /// Look up an entry, promoting it to most recently used on a hit
    pub fn try_get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut inner = self.inner.lock();
        let node = *inner.map.get(key)?;
        inner.promote(node);
        inner.nodes[node].entry.as_ref().map(|(_, value)| value.clone())
    }

    /// Remove an entry wherever it sits in the recency order
    pub fn try_remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut inner = self.inner.lock();
        let node = *inner.map.get(key)?;
        inner.remove_node(node).map(|(_, value)| value)
    }

    /// Whether `key` is cached; does not touch recency
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.lock().map.contains_key(key)
    }

    /// Keys from most to least recently used
    pub fn keys(&self) -> Vec<K> {
        let inner = self.inner.lock();
        let mut keys = Vec::with_capacity(inner.map.len());
        let mut cursor = inner.nodes[inner.sentinel].next;
        while cursor != inner.sentinel {
            let node = &inner.nodes[cursor];
            if let Some((key, _)) = &node.entry {
                keys.push(key.clone());
            }
            cursor = node.next;
        }
        keys
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.inner.lock().map.len()
    }

    /// Check if cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of entries
    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity
    }
}

impl<K, V> std::fmt::Debug for LruCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("LruCache")
            .field("len", &inner.map.len())
            .field("capacity", &inner.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_zero_capacity_rejected() {
        assert_eq!(LruCache::<u32, u32>::new(0).unwrap_err(), CacheError::ZeroCapacity);
    }

    #[test]
    fn test_evicts_first_inserted() {
        let cache = LruCache::new(3).unwrap();
        cache.add("a", 1);
        cache.add("b", 2);
        cache.add("c", 3);

        let evicted = cache.add("d", 4);
        assert_eq!(evicted, Some(("a", 1)));
        assert_eq!(cache.len(), 3);
        assert!(!cache.contains("a"));
        assert_eq!(cache.keys(), vec!["d", "c", "b"]);
    }

    #[test]
    fn test_get_promotes() {
        let cache = LruCache::new(3).unwrap();
        cache.add("a", 1);
        cache.add("b", 2);
        cache.add("c", 3);

        assert_eq!(cache.try_get("a"), Some(1));
        let evicted = cache.add("d", 4);

        assert_eq!(evicted, Some(("b", 2)));
        assert!(cache.contains("a"));
    }

    #[test]
    fn test_miss_has_no_side_effects() {
        let cache = LruCache::new(2).unwrap();
        cache.add(1, "one");

        assert_eq!(cache.try_get(&7), None);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.keys(), vec![1]);
    }

    #[test]
    fn test_remove_missing_key() {
        let cache = LruCache::new(2).unwrap();
        cache.add(1, "one");

        assert_eq!(cache.try_remove(&2), None);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_remove_from_middle() {
        let cache = LruCache::new(3).unwrap();
        cache.add(1, 10);
        cache.add(2, 20);
        cache.add(3, 30);

        assert_eq!(cache.try_remove(&2), Some(20));
        assert_eq!(cache.keys(), vec![3, 1]);

        cache.add(4, 40);
        cache.add(5, 50);
        assert_eq!(cache.keys(), vec![5, 4, 3]);
    }

    #[test]
    fn test_add_existing_updates_without_growing() {
        let cache = LruCache::new(2).unwrap();
        cache.add("k", 1);
        cache.add("other", 2);

        assert_eq!(cache.add("k", 5), None);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.try_get("k"), Some(5));
        assert_eq!(cache.keys(), vec!["k", "other"]);
    }

    #[test]
    fn test_capacity_one() {
        let cache = LruCache::new(1).unwrap();
        cache.add(1, 1);
        assert_eq!(cache.add(2, 2), Some((1, 1)));
        assert_eq!(cache.try_get(&2), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clear_resets_list() {
        let cache = LruCache::new(2).unwrap();
        cache.add(1, 1);
        cache.add(2, 2);
        cache.clear();

        assert!(cache.is_empty());
        assert!(cache.keys().is_empty());
        cache.add(3, 3);
        assert_eq!(cache.keys(), vec![3]);
    }

    #[test]
    fn test_concurrent_producers() {
        let cache = Arc::new(LruCache::new(64).unwrap());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..200 {
                        cache.add(t * 1000 + i, i);
                        let _ = cache.try_get(&(t * 1000 + i / 2));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.len(), 64);
        assert_eq!(cache.keys().len(), 64);
    }
}
