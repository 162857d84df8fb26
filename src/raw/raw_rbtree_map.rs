use core::borrow::Borrow;
use core::cmp::Ordering;

use log::debug;
use smallvec::SmallVec;

use super::arena::Arena;
use super::handle::Handle;
use super::node::{Node, Side};
use crate::error::InvariantViolation;

/// The core red-black tree backing `RBTreeMap`.
pub(crate) struct RawRBTreeMap<K, V> {
    /// Arena storing all tree nodes.
    pub(super) nodes: Arena<Node<K>>,
    /// Arena storing all values (separate from nodes so values can be borrowed mutably while
    /// nodes are read).
    pub(super) values: Arena<V>,
    /// Handle to the root node, if the tree is non-empty.
    pub(super) root: Option<Handle>,
    /// Total number of key-value pairs in the tree.
    pub(super) len: usize,
}

/// Where a descent for a key ended.
enum SearchResult {
    /// The key is stored at this node.
    Found(Handle),
    /// The key is absent; it belongs in the given empty child slot of this node.
    Vacant(Handle, Side),
    /// The tree is empty.
    Empty,
}

impl<K, V> RawRBTreeMap<K, V> {
    /// Creates a new, empty tree.
    pub(crate) const fn new() -> Self {
        Self {
            nodes: Arena::new(),
            values: Arena::new(),
            root: None,
            len: 0,
        }
    }

    /// Creates a new tree with room for `capacity` entries before reallocating.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Arena::with_capacity(capacity),
            values: Arena::with_capacity(capacity),
            root: None,
            len: 0,
        }
    }

    /// Returns the number of key-value pairs in the tree.
    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the tree contains no elements.
    pub(crate) const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the capacity of the tree.
    pub(crate) fn capacity(&self) -> usize {
        self.values.capacity()
    }

    /// Drops every node at once; the arenas own the whole structure, so no walk is needed.
    pub(crate) fn clear(&mut self) {
        debug!("clearing tree of {} entries", self.len);
        self.nodes.clear();
        self.values.clear();
        self.root = None;
        self.len = 0;
    }

    /// Returns a reference to a node by handle from a raw pointer.
    ///
    /// # Safety
    /// - `ptr` must point to a valid, allocated `RawRBTreeMap<K, V>`.
    pub(crate) unsafe fn node_ptr<'a>(ptr: *const Self, handle: Handle) -> &'a Node<K> {
        // SAFETY: We only access the `nodes` field through addr_of, avoiding aliasing with
        // the `values` field.
        unsafe { Arena::get_ptr(core::ptr::addr_of!((*ptr).nodes), handle) }
    }

    /// Returns a mutable reference to a value by handle from a raw pointer.
    ///
    /// # Safety
    /// - `ptr` must point to a valid, allocated `RawRBTreeMap<K, V>`.
    /// - The caller must ensure no other mutable references to the values arena exist.
    /// - The caller must have logical exclusive access to the value at `handle`.
    pub(crate) unsafe fn value_mut_ptr<'a>(ptr: *mut Self, handle: Handle) -> &'a mut V {
        // SAFETY: We only access the `values` field, avoiding aliasing with the `nodes` field.
        unsafe { (*core::ptr::addr_of_mut!((*ptr).values)).get_mut(handle) }
    }

    /// Handle of the minimum key.
    pub(crate) fn first(&self) -> Option<Handle> {
        self.root.map(|root| self.nodes.extreme(root, Side::Left))
    }

    /// Handle of the maximum key.
    pub(crate) fn last(&self) -> Option<Handle> {
        self.root.map(|root| self.nodes.extreme(root, Side::Right))
    }

    /// In-order successor of `handle`.
    pub(crate) fn next(&self, handle: Handle) -> Option<Handle> {
        self.nodes.step(handle, Side::Right)
    }

    /// In-order predecessor of `handle`.
    pub(crate) fn prev(&self, handle: Handle) -> Option<Handle> {
        self.nodes.step(handle, Side::Left)
    }

    /// Steps to the in-order neighbour of `handle` from a raw pointer (`forward` = successor).
    ///
    /// # Safety
    /// - `ptr` must point to a valid, allocated `RawRBTreeMap<K, V>`.
    pub(crate) unsafe fn step_ptr(ptr: *const Self, handle: Handle, forward: bool) -> Option<Handle> {
        // SAFETY: Only the `nodes` field is borrowed, never the `values` field.
        let nodes = unsafe { &*core::ptr::addr_of!((*ptr).nodes) };
        nodes.step(handle, if forward { Side::Right } else { Side::Left })
    }

    /// Returns the key and value stored at `handle`.
    pub(crate) fn entry(&self, handle: Handle) -> (&K, &V) {
        let node = self.nodes.get(handle);
        (node.key(), self.values.get(node.value()))
    }

    /// Keeps only the entries for which `f` returns `true`, visiting each entry once in key order.
    pub(crate) fn retain<F>(&mut self, mut f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        let mut current = self.first();
        while let Some(handle) = current {
            let node = self.nodes.get(handle);
            if f(node.key(), self.values.get_mut(node.value())) {
                current = self.next(handle);
                continue;
            }
            // Removing a two-child node pulls its successor's payload into the same slot.
            let refilled = node.has_two_children();
            let next = self.next(handle);
            self.remove_handle(handle);
            current = if refilled { Some(handle) } else { next };
        }
    }

    /// Number of nodes on the longest root-to-leaf path. Walks with an explicit stack.
    pub(crate) fn height(&self) -> usize {
        let mut stack: SmallVec<[(Handle, usize); 64]> = SmallVec::new();
        let mut height = 0;
        if let Some(root) = self.root {
            stack.push((root, 1));
        }
        while let Some((handle, depth)) = stack.pop() {
            height = height.max(depth);
            let node = self.nodes.get(handle);
            for child in [node.left(), node.right()].into_iter().flatten() {
                stack.push((child, depth + 1));
            }
        }
        height
    }

    /// Puts `new` into the slot `old` occupies under its parent, or at the root.
    pub(super) fn replace_subtree(&mut self, old: Handle, new: Option<Handle>) {
        let node = self.nodes.get(old);
        match node.parent() {
            Some(parent) => {
                let side = node.side();
                self.nodes.set_child(parent, side, new);
            }
            None => {
                self.root = new;
                if let Some(new) = new {
                    self.nodes.detach(new);
                }
            }
        }
    }

    /// Unlinks the node at `z` from the tree and rebalances, returning its key and value.
    ///
    /// A node with two children is not unlinked itself: it trades payloads with its in-order
    /// successor, and the successor's node (now holding `z`'s payload) is spliced out instead.
    pub(crate) fn remove_handle(&mut self, z: Handle) -> (K, V) {
        let target = if self.nodes.get(z).has_two_children() {
            let right = self.nodes.get(z).right().expect("`remove_handle()` - two children without a right child!");
            let successor = self.nodes.extreme(right, Side::Left);
            self.nodes.swap_payload(z, successor);
            successor
        } else {
            z
        };

        let node = self.nodes.get(target);
        let child = node.left().or(node.right());
        let parent = node.parent();
        let was_black = !node.is_red();

        self.replace_subtree(target, child);
        let (key, value) = self.nodes.take(target).into_parts();
        let value = self.values.take(value);
        self.len -= 1;

        if was_black {
            self.fixup_after_delete(child, parent);
        }

        (key, value)
    }

    /// Removes and returns the minimum entry.
    pub(crate) fn pop_first(&mut self) -> Option<(K, V)> {
        let first = self.first()?;
        Some(self.remove_handle(first))
    }

    /// Removes and returns the maximum entry.
    pub(crate) fn pop_last(&mut self) -> Option<(K, V)> {
        let last = self.last()?;
        Some(self.remove_handle(last))
    }

    /// Drains all key-value pairs in key order.
    /// This is O(n) as it avoids rebalancing, unlike repeated `pop_first`/`pop_last`.
    pub(crate) fn drain_to_vec(&mut self) -> alloc::vec::Vec<(K, V)> {
        let mut order = alloc::vec::Vec::with_capacity(self.len);
        let mut current = self.first();
        while let Some(handle) = current {
            order.push(handle);
            current = self.next(handle);
        }
        debug!("draining {} entries", order.len());

        let result = order
            .into_iter()
            .map(|handle| {
                let (key, value) = self.nodes.take(handle).into_parts();
                (key, self.values.take(value))
            })
            .collect();

        self.clear();
        result
    }
}

impl<K: Ord, V> RawRBTreeMap<K, V> {
    /// Descends from the root comparing against `key`.
    fn descend<Q>(&self, key: &Q) -> SearchResult
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let Some(mut current) = self.root else {
            return SearchResult::Empty;
        };
        loop {
            let node = self.nodes.get(current);
            let side = match key.cmp(node.key().borrow()) {
                Ordering::Equal => return SearchResult::Found(current),
                Ordering::Less => Side::Left,
                Ordering::Greater => Side::Right,
            };
            match node.child(side) {
                Some(child) => current = child,
                None => return SearchResult::Vacant(current, side),
            }
        }
    }

    /// Returns the handle of the node holding `key`.
    pub(crate) fn search<Q>(&self, key: &Q) -> Option<Handle>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        match self.descend(key) {
            SearchResult::Found(handle) => Some(handle),
            SearchResult::Vacant(..) | SearchResult::Empty => None,
        }
    }

    /// Returns a reference to the value corresponding to the key.
    pub(crate) fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let handle = self.search(key)?;
        Some(self.values.get(self.nodes.get(handle).value()))
    }

    /// Returns a mutable reference to the value corresponding to the key.
    pub(crate) fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let handle = self.search(key)?;
        let value = self.nodes.get(handle).value();
        Some(self.values.get_mut(value))
    }

    /// Returns the key-value pair corresponding to the key.
    pub(crate) fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.search(key).map(|handle| self.entry(handle))
    }

    /// Returns true if the tree contains the specified key.
    pub(crate) fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.search(key).is_some()
    }

    /// Inserts a key-value pair into the tree.
    /// Returns the old value if the key was already present.
    pub(crate) fn insert(&mut self, key: K, value: V) -> Option<V> {
        let slot = match self.descend(&key) {
            SearchResult::Found(handle) => {
                // Key exists: overwrite in place, no structural change.
                let value_handle = self.nodes.get(handle).value();
                return Some(core::mem::replace(self.values.get_mut(value_handle), value));
            }
            SearchResult::Vacant(parent, side) => Some((parent, side)),
            SearchResult::Empty => None,
        };

        let value_handle = self.values.alloc(value);
        let z = self.nodes.alloc(Node::new(key, value_handle));
        match slot {
            Some((parent, side)) => self.nodes.set_child(parent, side, Some(z)),
            None => self.root = Some(z),
        }
        self.len += 1;

        self.fixup_after_insert(z);
        None
    }

    /// Removes a key from the tree and returns the key-value pair.
    pub(crate) fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let handle = self.search(key)?;
        Some(self.remove_handle(handle))
    }

    /// Removes a key from the tree and returns the value.
    pub(crate) fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.remove_entry(key).map(|(_, v)| v)
    }

    /// Handle of the closest key on `side` of `key` (`Right` = strictly greater).
    ///
    /// A stored key is stepped from via parent links; an absent key is bracketed during the
    /// descent by remembering the last node passed on the way towards `side.opposite()`.
    pub(crate) fn neighbour<Q>(&self, key: &Q, side: Side) -> Option<Handle>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        if let SearchResult::Found(handle) = self.descend(key) {
            return self.nodes.step(handle, side);
        }

        let mut best = None;
        let mut current = self.root;
        while let Some(handle) = current {
            let node = self.nodes.get(handle);
            let toward = match key.cmp(node.key().borrow()) {
                Ordering::Less => Side::Left,
                _ => Side::Right,
            };
            if toward == side.opposite() {
                best = Some(handle);
            }
            current = node.child(toward);
        }
        best
    }

    /// Handle of the greatest key strictly less than `key`.
    pub(crate) fn predecessor<Q>(&self, key: &Q) -> Option<Handle>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.neighbour(key, Side::Left)
    }

    /// Handle of the least key strictly greater than `key`.
    pub(crate) fn successor<Q>(&self, key: &Q) -> Option<Handle>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.neighbour(key, Side::Right)
    }

    /// Validates BST order, the red-black coloring rules, link consistency, and `len`.
    pub(crate) fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let Some(root) = self.root else {
            if self.len != 0 {
                return Err(InvariantViolation::LenMismatch {
                    len: self.len,
                    reachable: 0,
                });
            }
            return Ok(());
        };

        if self.nodes.get(root).is_red() {
            return Err(InvariantViolation::RedRoot);
        }
        if self.nodes.get(root).parent().is_some() {
            return Err(InvariantViolation::BrokenParentLink { depth: 0 });
        }

        let mut reachable = 0;
        self.check_subtree(root, 0, None, None, &mut reachable)?;

        if reachable != self.len || self.nodes.len() != self.len || self.values.len() != self.len {
            return Err(InvariantViolation::LenMismatch {
                len: self.len,
                reachable,
            });
        }
        Ok(())
    }

    // Returns the black height of the subtree at `handle`, counting the empty slots below it.
    fn check_subtree(
        &self,
        handle: Handle,
        depth: usize,
        lower: Option<&K>,
        upper: Option<&K>,
        reachable: &mut usize,
    ) -> Result<usize, InvariantViolation> {
        let node = self.nodes.get(handle);
        *reachable += 1;

        if lower.is_some_and(|lower| node.key() <= lower) || upper.is_some_and(|upper| node.key() >= upper) {
            return Err(InvariantViolation::OutOfOrder { depth });
        }

        let mut heights = [0usize; 2];
        for (i, side) in [Side::Left, Side::Right].into_iter().enumerate() {
            let Some(child) = node.child(side) else {
                heights[i] = 1;
                continue;
            };
            let child_node = self.nodes.get(child);
            if child_node.parent() != Some(handle) {
                return Err(InvariantViolation::BrokenParentLink { depth: depth + 1 });
            }
            if child_node.side() != side {
                return Err(InvariantViolation::WrongSide { depth: depth + 1 });
            }
            if node.is_red() && child_node.is_red() {
                return Err(InvariantViolation::RedChildOfRed { depth: depth + 1 });
            }
            let (lower, upper) = match side {
                Side::Left => (lower, Some(node.key())),
                Side::Right => (Some(node.key()), upper),
            };
            heights[i] = self.check_subtree(child, depth + 1, lower, upper, reachable)?;
        }

        if heights[0] != heights[1] {
            return Err(InvariantViolation::BlackHeightMismatch {
                depth,
                left: heights[0],
                right: heights[1],
            });
        }
        Ok(heights[0] + usize::from(!node.is_red()))
    }

    /// Re-validates after a mutation when the `invariant-checks` feature is enabled in a debug build.
    #[inline]
    #[allow(clippy::unused_self)]
    pub(crate) fn debug_check_invariants(&self) {
        #[cfg(all(debug_assertions, feature = "invariant-checks"))]
        if let Err(violation) = self.check_invariants() {
            panic!("red-black tree corrupted: {violation}");
        }
    }
}

impl<K: Clone, V: Clone> Clone for RawRBTreeMap<K, V> {
    // Handles are slot indices, so cloning both arenas slot-for-slot preserves every link.
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            values: self.values.clone(),
            root: self.root,
            len: self.len,
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
mod tests {
    use super::*;
    use crate::raw::node::Color;
    use alloc::vec::Vec;
    use proptest::prelude::*;

    impl<K: Clone, V> RawRBTreeMap<K, V> {
        fn keys_in_order(&self) -> Vec<K> {
            let mut keys = Vec::new();
            let mut current = self.first();
            while let Some(h) = current {
                keys.push(self.nodes.get(h).key().clone());
                current = self.next(h);
            }
            keys
        }
    }

    #[derive(Clone, Debug)]
    enum Op {
        Insert(i32),
        Remove(i32),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => (0i32..1000).prop_map(Op::Insert),
            2 => (0i32..1000).prop_map(Op::Remove),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn tree_invariants_maintained_after_operations(ops in prop::collection::vec(op_strategy(), 0..500)) {
            let mut tree: RawRBTreeMap<i32, i32> = RawRBTreeMap::new();
            let mut expected = alloc::collections::BTreeMap::new();

            for op in ops {
                match op {
                    Op::Insert(key) => {
                        prop_assert_eq!(tree.insert(key, key * 2), expected.insert(key, key * 2));
                    }
                    Op::Remove(key) => {
                        prop_assert_eq!(tree.remove(&key), expected.remove(&key));
                    }
                }
                prop_assert_eq!(tree.check_invariants(), Ok(()));
            }

            let keys: Vec<i32> = expected.keys().copied().collect();
            prop_assert_eq!(tree.keys_in_order(), keys);
        }

        #[test]
        fn neighbour_matches_btreemap(
            keys in prop::collection::btree_set(0i32..500, 0..200),
            probe in 0i32..500,
        ) {
            let mut tree: RawRBTreeMap<i32, ()> = RawRBTreeMap::new();
            for &k in &keys {
                tree.insert(k, ());
            }
            let succ = tree.neighbour(&probe, Side::Right).map(|h| *tree.nodes.get(h).key());
            let pred = tree.neighbour(&probe, Side::Left).map(|h| *tree.nodes.get(h).key());
            prop_assert_eq!(succ, keys.range(probe + 1..).next().copied());
            prop_assert_eq!(pred, keys.range(..probe).next_back().copied());
        }

        #[test]
        fn height_is_logarithmic(count in 1usize..2000) {
            let mut tree: RawRBTreeMap<usize, ()> = RawRBTreeMap::new();
            for i in 0..count {
                tree.insert(i, ());
            }
            // h <= 2 * log2(n + 1)
            let bound = 2 * (usize::BITS - count.leading_zeros()) as usize;
            prop_assert!(tree.height() <= bound, "height {} > {}", tree.height(), bound);
        }
    }

    #[test]
    fn empty_tree() {
        let mut tree: RawRBTreeMap<i32, i32> = RawRBTreeMap::new();
        assert_eq!(tree.check_invariants(), Ok(()));
        assert_eq!(tree.height(), 0);
        assert!(tree.first().is_none());
        assert!(tree.last().is_none());
        assert!(tree.get(&1).is_none());
        assert!(tree.remove(&1).is_none());
        assert!(tree.pop_first().is_none());
        assert!(tree.pop_last().is_none());
        assert!(tree.neighbour(&1, Side::Right).is_none());
    }

    #[test]
    fn overwrite_keeps_structure() {
        let mut tree: RawRBTreeMap<i32, &str> = RawRBTreeMap::new();
        assert_eq!(tree.insert(5, "a"), None);
        let root = tree.root;
        assert_eq!(tree.insert(5, "b"), Some("a"));
        assert_eq!(tree.root, root);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.get(&5), Some(&"b"));
    }

    #[test]
    fn two_child_removal_splices_successor_node() {
        let mut tree: RawRBTreeMap<i32, i32> = RawRBTreeMap::new();
        for k in [2, 1, 3] {
            tree.insert(k, k * 10);
        }
        let root = tree.root.unwrap();
        let three = tree.search(&3).unwrap();

        assert_eq!(tree.remove_entry(&2), Some((2, 20)));
        // The root slot survives with the successor's payload; the successor's slot is freed.
        assert_eq!(tree.root, Some(root));
        assert_eq!(*tree.nodes.get(root).key(), 3);
        assert_eq!(tree.search(&3), Some(root));
        assert_ne!(tree.search(&3), Some(three));
        assert_eq!(tree.get(&3), Some(&30));
        assert_eq!(tree.keys_in_order(), [1, 3]);
        assert_eq!(tree.check_invariants(), Ok(()));
    }

    #[test]
    fn detects_red_root() {
        let mut tree: RawRBTreeMap<i32, ()> = RawRBTreeMap::new();
        tree.insert(1, ());
        let root = tree.root.unwrap();
        tree.nodes.get_mut(root).set_color(Color::Red);
        assert_eq!(tree.check_invariants(), Err(InvariantViolation::RedRoot));
    }

    #[test]
    fn detects_red_red_and_black_height() {
        let mut tree: RawRBTreeMap<i32, ()> = RawRBTreeMap::new();
        for k in [2, 1, 3, 4] {
            tree.insert(k, ());
        }
        let three = tree.search(&3).unwrap();
        tree.nodes.get_mut(three).set_color(Color::Red);
        assert_eq!(tree.check_invariants(), Err(InvariantViolation::RedChildOfRed { depth: 2 }));

        let mut tree: RawRBTreeMap<i32, ()> = RawRBTreeMap::new();
        for k in [2, 1, 3] {
            tree.insert(k, ());
        }
        let one = tree.search(&1).unwrap();
        tree.nodes.get_mut(one).set_color(Color::Black);
        assert_eq!(
            tree.check_invariants(),
            Err(InvariantViolation::BlackHeightMismatch {
                depth: 0,
                left: 2,
                right: 1
            })
        );
    }

    #[test]
    fn detects_broken_links_and_order() {
        let mut tree: RawRBTreeMap<i32, ()> = RawRBTreeMap::new();
        for k in [2, 1, 3] {
            tree.insert(k, ());
        }
        let (root, one) = (tree.root.unwrap(), tree.search(&1).unwrap());
        tree.nodes.detach(one);
        assert_eq!(tree.check_invariants(), Err(InvariantViolation::BrokenParentLink { depth: 1 }));

        tree.nodes.set_child(root, Side::Left, Some(one));
        tree.nodes.swap_payload(root, one);
        assert_eq!(tree.check_invariants(), Err(InvariantViolation::OutOfOrder { depth: 1 }));
    }

    #[test]
    fn drain_yields_sorted_and_empties() {
        let mut tree: RawRBTreeMap<i32, i32> = RawRBTreeMap::new();
        for k in [5, 3, 8, 1, 4, 9, 7] {
            tree.insert(k, -k);
        }
        let drained = tree.drain_to_vec();
        assert_eq!(drained, [(1, -1), (3, -3), (4, -4), (5, -5), (7, -7), (8, -8), (9, -9)]);
        assert!(tree.is_empty());
        assert_eq!(tree.check_invariants(), Ok(()));
    }

    #[test]
    fn clone_preserves_links() {
        let mut tree: RawRBTreeMap<i32, i32> = RawRBTreeMap::new();
        for k in 0..100 {
            tree.insert(k, k);
        }
        for k in (0..100).step_by(3) {
            tree.remove(&k);
        }
        let mut copy = tree.clone();
        assert_eq!(copy.check_invariants(), Ok(()));
        assert_eq!(copy.keys_in_order(), tree.keys_in_order());
        copy.insert(1000, 0);
        assert!(!tree.contains_key(&1000));
        assert_eq!(copy.check_invariants(), Ok(()));
    }
}
