use super::arena::Arena;
use super::handle::Handle;

/// Node color. A missing child counts as `Black`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Color {
    Red,
    Black,
}

/// Which child slot of its parent a node occupies.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Side {
    Left,
    Right,
}

impl Side {
    #[inline]
    pub(crate) const fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

// Red-black tree vertex. The value lives in a separate arena and is referenced by handle.
#[derive(Clone)]
pub(crate) struct Node<K> {
    key: K,
    value: Handle,
    left: Option<Handle>,
    right: Option<Handle>,
    // Non-owning back-reference; `None` only for the root.
    parent: Option<Handle>,
    // Meaningless for the root.
    is_left: bool,
    color: Color,
}

impl<K> Node<K> {
    /// Creates a detached red leaf.
    pub(crate) fn new(key: K, value: Handle) -> Self {
        Self {
            key,
            value,
            left: None,
            right: None,
            parent: None,
            is_left: false,
            color: Color::Red,
        }
    }

    #[inline]
    pub(crate) fn key(&self) -> &K {
        &self.key
    }

    #[inline]
    pub(crate) fn value(&self) -> Handle {
        self.value
    }

    #[inline]
    pub(crate) fn left(&self) -> Option<Handle> {
        self.left
    }

    #[inline]
    pub(crate) fn right(&self) -> Option<Handle> {
        self.right
    }

    #[inline]
    pub(crate) fn child(&self, side: Side) -> Option<Handle> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    #[inline]
    pub(crate) fn parent(&self) -> Option<Handle> {
        self.parent
    }

    /// Returns the side this node hangs from. Only meaningful when `parent()` is `Some`.
    #[inline]
    pub(crate) fn side(&self) -> Side {
        if self.is_left { Side::Left } else { Side::Right }
    }

    #[inline]
    pub(crate) fn color(&self) -> Color {
        self.color
    }

    #[inline]
    pub(crate) fn is_red(&self) -> bool {
        self.color == Color::Red
    }

    #[inline]
    pub(crate) fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    pub(crate) fn has_two_children(&self) -> bool {
        self.left.is_some() && self.right.is_some()
    }

    /// Consumes the node, returning its key and value handle.
    pub(crate) fn into_parts(self) -> (K, Handle) {
        (self.key, self.value)
    }
}

// Structural mutation goes through the arena so both ends of an edge change together.
impl<K> Arena<Node<K>> {
    /// Color of an optional node; absent children are black.
    #[inline]
    pub(crate) fn color_of(&self, handle: Option<Handle>) -> Color {
        handle.map_or(Color::Black, |h| self.get(h).color)
    }

    #[inline]
    pub(crate) fn is_red(&self, handle: Option<Handle>) -> bool {
        self.color_of(handle) == Color::Red
    }

    /// Makes `child` the `side` child of `parent`, rewriting the child's back-reference.
    ///
    /// The previous occupant of the slot, if any, is left pointing at `parent`; callers relink it.
    pub(crate) fn set_child(&mut self, parent: Handle, side: Side, child: Option<Handle>) {
        let node = self.get_mut(parent);
        match side {
            Side::Left => node.left = child,
            Side::Right => node.right = child,
        }
        if let Some(child) = child {
            let node = self.get_mut(child);
            node.parent = Some(parent);
            node.is_left = side == Side::Left;
        }
    }

    /// Clears a node's back-reference, making it a root.
    pub(crate) fn detach(&mut self, handle: Handle) {
        let node = self.get_mut(handle);
        node.parent = None;
        node.is_left = false;
    }

    /// Exchanges the key/value payload of two nodes, leaving structure and colors in place.
    pub(crate) fn swap_payload(&mut self, a: Handle, b: Handle) {
        let (a, b) = self.pair_mut(a, b);
        core::mem::swap(&mut a.key, &mut b.key);
        core::mem::swap(&mut a.value, &mut b.value);
    }

    /// Leftmost (`Side::Left`) or rightmost (`Side::Right`) node of the subtree at `handle`.
    pub(crate) fn extreme(&self, mut handle: Handle, side: Side) -> Handle {
        while let Some(child) = self.get(handle).child(side) {
            handle = child;
        }
        handle
    }

    /// In-order neighbour of `handle` in direction `side` (`Right` = successor).
    ///
    /// Descends to the nearest extreme of the `side` subtree if there is one, otherwise climbs while
    /// the current node hangs from that same side.
    pub(crate) fn step(&self, handle: Handle, side: Side) -> Option<Handle> {
        if let Some(child) = self.get(handle).child(side) {
            return Some(self.extreme(child, side.opposite()));
        }
        let mut current = handle;
        loop {
            let node = self.get(current);
            let parent = node.parent?;
            if node.side() == side.opposite() {
                return Some(parent);
            }
            current = parent;
        }
    }
}
