//! A lock-guarded [`RBTreeMap`] for sharing between threads.
//!
//! [`SyncRBTreeMap`] wraps the map in a single [`parking_lot::RwLock`]. Every mutation
//! (`insert`, `remove`, `clear`, ...) takes the write lock for its whole duration, including
//! rebalancing, and every read takes the read lock. A reader therefore never sees a tree halfway
//! through a rotation, and readers only run in parallel with other readers.
//!
//! Lookups return owned copies of values because a borrow cannot outlive the read guard. Use
//! [`SyncRBTreeMap::read`] or [`SyncRBTreeMap::write`] to hold a guard across several calls.

use core::borrow::Borrow;
use core::fmt;

use alloc::vec::Vec;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::RBTreeMap;
use crate::error::Error;

/// An [`RBTreeMap`] behind a reader-writer lock.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::thread;
/// use rbtree_map::sync::SyncRBTreeMap;
///
/// let map = Arc::new(SyncRBTreeMap::new());
/// let handles: Vec<_> = (0..4)
///     .map(|t| {
///         let map = Arc::clone(&map);
///         thread::spawn(move || {
///             for i in 0..100 {
///                 map.insert(t * 100 + i, i);
///             }
///         })
///     })
///     .collect();
/// for handle in handles {
///     handle.join().unwrap();
/// }
/// assert_eq!(map.len(), 400);
/// assert_eq!(map.get(&101), Some(1));
/// ```
pub struct SyncRBTreeMap<K, V> {
    inner: RwLock<RBTreeMap<K, V>>,
}

impl<K, V> SyncRBTreeMap<K, V> {
    /// Creates an empty, shareable map.
    #[must_use]
    pub fn new() -> Self {
        SyncRBTreeMap {
            inner: RwLock::new(RBTreeMap::new()),
        }
    }

    /// Wraps an existing map.
    #[must_use]
    pub fn from_map(map: RBTreeMap<K, V>) -> Self {
        SyncRBTreeMap {
            inner: RwLock::new(map),
        }
    }

    /// Unwraps the inner map.
    #[must_use]
    pub fn into_inner(self) -> RBTreeMap<K, V> {
        self.inner.into_inner()
    }

    /// Locks the map for shared reading until the guard is dropped.
    pub fn read(&self) -> RwLockReadGuard<'_, RBTreeMap<K, V>> {
        self.inner.read()
    }

    /// Locks the map for exclusive writing until the guard is dropped.
    pub fn write(&self) -> RwLockWriteGuard<'_, RBTreeMap<K, V>> {
        self.inner.write()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Returns `true` if the map holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Removes every entry under the write lock.
    pub fn clear(&self) {
        self.inner.write().clear();
    }

    /// Returns a clone of the value stored for `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q> + Ord,
        Q: ?Sized + Ord,
        V: Clone,
    {
        self.inner.read().get(key).cloned()
    }

    /// Returns `true` if `key` is present.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q> + Ord,
        Q: ?Sized + Ord,
    {
        self.inner.read().contains_key(key)
    }

    /// Inserts under the write lock. See [`RBTreeMap::insert`].
    pub fn insert(&self, key: K, value: V) -> Option<V>
    where
        K: Ord,
    {
        self.inner.write().insert(key, value)
    }

    /// Removes under the write lock. See [`RBTreeMap::remove`].
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q> + Ord,
        Q: ?Sized + Ord,
    {
        self.inner.write().remove(key)
    }

    /// Removes a key that must be present. See [`RBTreeMap::try_remove`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyNotFound`] if the key is absent.
    pub fn try_remove<Q>(&self, key: &Q) -> Result<V, Error>
    where
        K: Borrow<Q> + Ord,
        Q: ?Sized + Ord,
    {
        self.inner.write().try_remove(key)
    }

    /// Copies out the first entry in key order.
    pub fn first_key_value(&self) -> Option<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        self.inner.read().first_key_value().map(|(k, v)| (k.clone(), v.clone()))
    }

    /// Copies out the last entry in key order.
    pub fn last_key_value(&self) -> Option<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        self.inner.read().last_key_value().map(|(k, v)| (k.clone(), v.clone()))
    }

    /// Copies out the entry preceding `key`. See [`RBTreeMap::predecessor`].
    pub fn predecessor<Q>(&self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q> + Ord + Clone,
        Q: ?Sized + Ord,
        V: Clone,
    {
        self.inner.read().predecessor(key).map(|(k, v)| (k.clone(), v.clone()))
    }

    /// Copies out the entry following `key`. See [`RBTreeMap::successor`].
    pub fn successor<Q>(&self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q> + Ord + Clone,
        Q: ?Sized + Ord,
        V: Clone,
    {
        self.inner.read().successor(key).map(|(k, v)| (k.clone(), v.clone()))
    }

    /// Takes a consistent, sorted copy of every entry under one read lock.
    pub fn snapshot(&self) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        self.inner.read().iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

impl<K, V> Default for SyncRBTreeMap<K, V> {
    fn default() -> Self {
        SyncRBTreeMap::new()
    }
}

impl<K, V> From<RBTreeMap<K, V>> for SyncRBTreeMap<K, V> {
    fn from(map: RBTreeMap<K, V>) -> Self {
        SyncRBTreeMap::from_map(map)
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for SyncRBTreeMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_read() {
            Some(map) => f.debug_tuple("SyncRBTreeMap").field(&*map).finish(),
            None => f.write_str("SyncRBTreeMap(<locked>)"),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use static_assertions::assert_impl_all;

    assert_impl_all!(SyncRBTreeMap<u32, u32>: Send, Sync);

    #[test]
    fn guards_expose_the_full_map() {
        let map = SyncRBTreeMap::new();
        {
            let mut guard = map.write();
            for k in 0..10 {
                guard.insert(k, k * k);
            }
        }
        assert_eq!(map.read().iter().count(), 10);
        assert_eq!(map.successor(&3), Some((4, 16)));
        assert_eq!(map.try_remove(&3), Ok(9));
        assert_eq!(map.try_remove(&3), Err(Error::KeyNotFound));
        assert_eq!(map.predecessor(&4), Some((2, 4)));
        assert_eq!(map.into_inner().len(), 9);
    }

    #[test]
    fn debug_reports_a_held_write_lock() {
        let map = SyncRBTreeMap::from(RBTreeMap::from([(1, 'a')]));
        assert_eq!(alloc::format!("{map:?}"), "SyncRBTreeMap({1: 'a'})");
        let _guard = map.write();
        assert_eq!(alloc::format!("{map:?}"), "SyncRBTreeMap(<locked>)");
    }
}
