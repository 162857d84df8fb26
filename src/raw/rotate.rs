use log::trace;

use super::handle::Handle;
use super::node::Side;
use super::raw_rbtree_map::RawRBTreeMap;

// Rotations re-link at most three edges and never touch colors; recoloring is the caller's job.
impl<K, V> RawRBTreeMap<K, V> {
    /// Rotates the subtree at `x` so that `x` moves down towards `side`.
    ///
    /// The child of `x` on the opposite side takes its place, and that child's inner subtree is
    /// handed over to `x`. Returns the new subtree root.
    ///
    /// # Panics
    ///
    /// Panics if `x` has no child on the opposite side.
    pub(crate) fn rotate(&mut self, x: Handle, side: Side) -> Handle {
        let up = side.opposite();
        let y = self.nodes.get(x).child(up).expect("`RawRBTreeMap::rotate()` - no child to promote!");
        let inner = self.nodes.get(y).child(side);

        self.replace_subtree(x, Some(y));
        self.nodes.set_child(x, up, inner);
        self.nodes.set_child(y, side, Some(x));

        trace!("rotated {side:?} at slot {}", x.to_index());
        y
    }

    /// Promotes `x.right` into `x`'s position. Corrects a right-right imbalance.
    pub(crate) fn rotate_left(&mut self, x: Handle) -> Handle {
        self.rotate(x, Side::Left)
    }

    /// Promotes `x.left` into `x`'s position. Corrects a left-left imbalance.
    pub(crate) fn rotate_right(&mut self, x: Handle) -> Handle {
        self.rotate(x, Side::Right)
    }

    /// `rotate_left(x.left)` followed by `rotate_right(x)`. Corrects a left-right imbalance.
    pub(crate) fn rotate_left_right(&mut self, x: Handle) -> Handle {
        let left = self.nodes.get(x).left().expect("`RawRBTreeMap::rotate_left_right()` - no left child!");
        self.rotate_left(left);
        self.rotate_right(x)
    }

    /// `rotate_right(x.right)` followed by `rotate_left(x)`. Corrects a right-left imbalance.
    pub(crate) fn rotate_right_left(&mut self, x: Handle) -> Handle {
        let right = self.nodes.get(x).right().expect("`RawRBTreeMap::rotate_right_left()` - no right child!");
        self.rotate_right(right);
        self.rotate_left(x)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use alloc::vec::Vec;
    use proptest::prelude::*;

    impl<K: Clone, V> RawRBTreeMap<K, V> {
        // Walks child links only, so a broken parent link cannot hide a lost subtree.
        fn keys_by_child_links(&self) -> Vec<K> {
            fn walk<K: Clone, V>(tree: &RawRBTreeMap<K, V>, handle: Option<Handle>, out: &mut Vec<K>) {
                if let Some(h) = handle {
                    let node = tree.nodes.get(h);
                    walk(tree, node.left(), out);
                    out.push(node.key().clone());
                    walk(tree, node.right(), out);
                }
            }
            let mut out = Vec::new();
            walk(self, self.root, &mut out);
            out
        }

        // Walks the successor chain, which relies on parent links.
        fn keys_by_parent_links(&self) -> Vec<K> {
            let mut out = Vec::new();
            let mut current = self.first();
            while let Some(h) = current {
                out.push(self.nodes.get(h).key().clone());
                current = self.next(h);
            }
            out
        }

        fn handle_of(&self, key: &K) -> Handle
        where
            K: Ord,
        {
            self.search(key).expect("key should be present")
        }
    }

    fn tree_of(keys: &[i32]) -> RawRBTreeMap<i32, ()> {
        let mut tree = RawRBTreeMap::new();
        for &k in keys {
            tree.insert(k, ());
        }
        tree
    }

    #[test]
    fn rotate_left_at_root_updates_root() {
        // 2 -> (1, 4 -> (3, 5))
        let mut tree = tree_of(&[2, 1, 4, 3, 5]);
        let root = tree.root.unwrap();
        assert_eq!(*tree.nodes.get(root).key(), 2);

        let top = tree.rotate_left(root);
        assert_eq!(tree.root, Some(top));
        assert_eq!(*tree.nodes.get(top).key(), 4);
        assert_eq!(tree.nodes.get(top).parent(), None);

        let two = tree.handle_of(&2);
        assert_eq!(tree.nodes.get(top).left(), Some(two));
        assert_eq!(tree.nodes.get(two).right(), Some(tree.handle_of(&3)));
        assert_eq!(tree.keys_by_child_links(), [1, 2, 3, 4, 5]);
        assert_eq!(tree.keys_by_parent_links(), [1, 2, 3, 4, 5]);
    }

    #[test]
    fn rotate_right_then_left_restores_shape() {
        let mut tree = tree_of(&[4, 2, 6, 1, 3, 5, 7]);
        let four = tree.handle_of(&4);
        let two = tree.handle_of(&2);

        let top = tree.rotate_right(four);
        assert_eq!(top, two);
        assert_eq!(tree.root, Some(two));

        let top = tree.rotate_left(two);
        assert_eq!(top, four);
        assert_eq!(tree.root, Some(four));
        assert_eq!(tree.nodes.get(four).left(), Some(two));
        assert_eq!(tree.nodes.get(two).right(), Some(tree.handle_of(&3)));
        assert_eq!(tree.keys_by_parent_links(), [1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn double_rotations_lift_inner_grandchild() {
        // 4 -> (2 -> (1, 3), 6 -> (5, 7))
        let mut tree = tree_of(&[4, 2, 6, 1, 3, 5, 7]);
        let four = tree.handle_of(&4);
        let top = tree.rotate_left_right(four);
        assert_eq!(*tree.nodes.get(top).key(), 3);
        assert_eq!(tree.root, Some(top));
        assert_eq!(tree.nodes.get(top).left(), Some(tree.handle_of(&2)));
        assert_eq!(tree.nodes.get(top).right(), Some(four));
        assert_eq!(tree.nodes.get(four).left(), None);
        assert_eq!(tree.keys_by_child_links(), [1, 2, 3, 4, 5, 6, 7]);

        let mut tree = tree_of(&[4, 2, 6, 1, 3, 5, 7]);
        let four = tree.handle_of(&4);
        let top = tree.rotate_right_left(four);
        assert_eq!(*tree.nodes.get(top).key(), 5);
        assert_eq!(tree.root, Some(top));
        assert_eq!(tree.nodes.get(four).side(), Side::Left);
        assert_eq!(tree.nodes.get(four).right(), None);
        assert_eq!(tree.keys_by_parent_links(), [1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn rotations_do_not_touch_colors() {
        let mut tree = tree_of(&[4, 2, 6, 1, 3, 5, 7]);
        let colors = |tree: &RawRBTreeMap<i32, ()>| -> Vec<_> {
            (1..=7).map(|k| tree.nodes.get(tree.handle_of(&k)).color()).collect()
        };
        let before = colors(&tree);
        let four = tree.handle_of(&4);
        tree.rotate_right(four);
        assert_eq!(colors(&tree), before);
    }

    #[test]
    #[should_panic(expected = "`RawRBTreeMap::rotate()` - no child to promote!")]
    fn rotate_without_child_panics() {
        let mut tree = tree_of(&[1]);
        let root = tree.root.unwrap();
        tree.rotate_left(root);
    }

    proptest! {
        #[test]
        fn any_rotation_preserves_in_order_keys(
            keys in prop::collection::btree_set(0i32..1000, 1..200),
            picks in prop::collection::vec((any::<prop::sample::Index>(), 0u8..4), 1..20),
        ) {
            let keys: Vec<i32> = keys.into_iter().collect();
            let mut tree = tree_of(&keys);
            let expected = tree.keys_by_child_links();

            for (pick, kind) in picks {
                let x = tree.handle_of(&keys[pick.index(keys.len())]);
                let node = tree.nodes.get(x);
                let (left, right) = (node.left(), node.right());
                let inner_left = left.and_then(|l| tree.nodes.get(l).right());
                let inner_right = right.and_then(|r| tree.nodes.get(r).left());
                match kind {
                    0 if right.is_some() => { tree.rotate_left(x); }
                    1 if left.is_some() => { tree.rotate_right(x); }
                    2 if inner_left.is_some() => { tree.rotate_left_right(x); }
                    3 if inner_right.is_some() => { tree.rotate_right_left(x); }
                    _ => continue,
                }
                prop_assert_eq!(&tree.keys_by_child_links(), &expected);
                prop_assert_eq!(&tree.keys_by_parent_links(), &expected);
            }
        }
    }
}
