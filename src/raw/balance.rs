use log::trace;

use super::handle::Handle;
use super::node::{Color, Side};
use super::raw_rbtree_map::RawRBTreeMap;

impl<K, V> RawRBTreeMap<K, V> {
    /// Restores the red-black rules after `z` was attached as a red leaf.
    ///
    /// Red uncles are resolved by recoloring and climbing; the first black (or absent) uncle is
    /// resolved by at most one single or double rotation, which ends the loop. Black height grows by
    /// at most one, and only when the recoloring reaches the root.
    pub(crate) fn fixup_after_insert(&mut self, mut z: Handle) {
        while let Some(p) = self.nodes.get(z).parent()
            && self.nodes.get(p).is_red()
        {
            // A red parent is never the root, so the grandparent exists and is black.
            let g = self.nodes.get(p).parent().expect("`fixup_after_insert()` - red node without a parent!");
            let p_side = self.nodes.get(p).side();
            let u = self.nodes.get(g).child(p_side.opposite());

            if self.nodes.is_red(u) {
                trace!("insert fixup: red uncle, recolor and climb");
                self.nodes.get_mut(p).set_color(Color::Black);
                if let Some(u) = u {
                    self.nodes.get_mut(u).set_color(Color::Black);
                }
                self.nodes.get_mut(g).set_color(Color::Red);
                z = g;
                continue;
            }

            let top = if self.nodes.get(z).side() == p_side {
                trace!("insert fixup: outer grandchild, single rotation");
                match p_side {
                    Side::Left => self.rotate_right(g),
                    Side::Right => self.rotate_left(g),
                }
            } else {
                trace!("insert fixup: inner grandchild, double rotation");
                match p_side {
                    Side::Left => self.rotate_left_right(g),
                    Side::Right => self.rotate_right_left(g),
                }
            };
            self.nodes.get_mut(top).set_color(Color::Black);
            self.nodes.get_mut(g).set_color(Color::Red);
            break;
        }

        if let Some(root) = self.root {
            self.nodes.get_mut(root).set_color(Color::Black);
        }
    }

    /// Restores equal black height after a black node was spliced out.
    ///
    /// `x` is the node that took the removed node's place, or `None` for an empty slot; `parent` is
    /// the slot's parent and carries the position while `x` is `None`. The subtree at `x` is short
    /// one black node until the deficiency is absorbed by a red node or reaches the root.
    pub(crate) fn fixup_after_delete(&mut self, mut x: Option<Handle>, mut parent: Option<Handle>) {
        while x != self.root && !self.nodes.is_red(x) {
            let Some(p) = parent else { break };
            // Compare slots rather than flags: `x` may be an empty slot with no flag of its own.
            let side = if self.nodes.get(p).left() == x { Side::Left } else { Side::Right };
            let far_side = side.opposite();

            // The sibling subtree has black height >= 1, so it cannot be empty.
            let mut w = self.nodes.get(p).child(far_side).expect("`fixup_after_delete()` - missing sibling!");

            if self.nodes.get(w).is_red() {
                trace!("delete fixup: red sibling, rotate parent towards the deficient side");
                self.nodes.get_mut(w).set_color(Color::Black);
                self.nodes.get_mut(p).set_color(Color::Red);
                self.rotate(p, side);
                w = self.nodes.get(p).child(far_side).expect("`fixup_after_delete()` - missing sibling!");
            }

            let near = self.nodes.get(w).child(side);
            let far = self.nodes.get(w).child(far_side);

            if !self.nodes.is_red(near) && !self.nodes.is_red(far) {
                trace!("delete fixup: black nephews, push deficiency up");
                self.nodes.get_mut(w).set_color(Color::Red);
                x = Some(p);
                parent = self.nodes.get(p).parent();
                continue;
            }

            if !self.nodes.is_red(far) {
                trace!("delete fixup: red near nephew, rotate sibling away");
                let near = near.expect("`fixup_after_delete()` - red nephew must exist!");
                self.nodes.get_mut(near).set_color(Color::Black);
                self.nodes.get_mut(w).set_color(Color::Red);
                self.rotate(w, far_side);
                w = self.nodes.get(p).child(far_side).expect("`fixup_after_delete()` - missing sibling!");
            }

            trace!("delete fixup: red far nephew, final rotation");
            let parent_color = self.nodes.get(p).color();
            self.nodes.get_mut(w).set_color(parent_color);
            self.nodes.get_mut(p).set_color(Color::Black);
            if let Some(far) = self.nodes.get(w).child(far_side) {
                self.nodes.get_mut(far).set_color(Color::Black);
            }
            self.rotate(p, side);
            x = self.root;
            break;
        }

        if let Some(x) = x {
            self.nodes.get_mut(x).set_color(Color::Black);
        }
    }
}
