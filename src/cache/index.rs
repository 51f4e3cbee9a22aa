//! Expiry Index Module
//!
//! The ordered map the cache uses to find expired buckets without scanning
//! every entry. It has no locking of its own; the cache serialises access.

use std::collections::BTreeMap;

use crate::cache::encoding::ExpiryKey;

// == Ordered Index ==
/// Sorted collection keyed by [`ExpiryKey`].
pub trait OrderedIndex<V> {
    /// Point lookup. Bucket edits go through `delete` + `insert` so the
    /// key set moves instead of being cloned.
    fn get(&self, key: &ExpiryKey) -> Option<&V>;

    /// Inserts or overwrites the value for `key`, returning the old one.
    fn insert(&mut self, key: ExpiryKey, value: V) -> Option<V>;

    /// Removes `key`, returning its value.
    fn delete(&mut self, key: &ExpiryKey) -> Option<V>;

    /// Visits entries in ascending key order until `visit` returns `true`.
    fn walk<F>(&self, visit: F)
    where
        F: FnMut(&ExpiryKey, &V) -> bool;

    /// Number of keys held.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// == BTree Index ==
/// [`OrderedIndex`] backed by a `BTreeMap`.
#[derive(Debug, Clone)]
pub struct BTreeIndex<V> {
    tree: BTreeMap<ExpiryKey, V>,
}

impl<V> BTreeIndex<V> {
    pub fn new() -> Self {
        Self {
            tree: BTreeMap::new(),
        }
    }
}

impl<V> Default for BTreeIndex<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> OrderedIndex<V> for BTreeIndex<V> {
    fn get(&self, key: &ExpiryKey) -> Option<&V> {
        self.tree.get(key)
    }

    fn insert(&mut self, key: ExpiryKey, value: V) -> Option<V> {
        self.tree.insert(key, value)
    }

    fn delete(&mut self, key: &ExpiryKey) -> Option<V> {
        self.tree.remove(key)
    }

    fn walk<F>(&self, mut visit: F)
    where
        F: FnMut(&ExpiryKey, &V) -> bool,
    {
        for (key, value) in &self.tree {
            if visit(key, value) {
                break;
            }
        }
    }

    fn len(&self) -> usize {
        self.tree.len()
    }
}
