use core::borrow::Borrow;
use core::cmp::Ordering;

use alloc::vec::Vec;
use log::trace;
use smallvec::SmallVec;

use super::arena::{Arena, Generation};
use super::handle::Handle;
use super::node::{Color, Links, Side};
use crate::error::{TreeError, TreeResult};

/// The red-black tree backing `RbTree`.
///
/// Topology and keys are stored apart: `links[h.slot()]` holds the color and relations of the
/// node at `h`, `keys` holds its key. `links[0]` is the sentinel, so every fixup rule can read the
/// color or parent of an absent child without checking for it first.
pub(crate) struct RawRbTree<K> {
    /// Color, parent and children of every slot, indexed by `Handle::slot()`.
    links: Vec<Links>,
    /// Keys of live nodes.
    keys: Arena<K>,
    /// Current root, `Handle::NIL` when empty.
    root: Handle,
}

impl<K> RawRbTree<K> {
    /// Creates a new, empty tree.
    pub(crate) fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates a new tree with room for `capacity` nodes.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        let mut links = Vec::with_capacity(capacity + 1);
        links.push(Links::SENTINEL);
        Self {
            links,
            keys: Arena::with_capacity(capacity),
            root: Handle::NIL,
        }
    }

    pub(crate) const fn len(&self) -> usize {
        self.keys.len()
    }

    pub(crate) const fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.keys.capacity()
    }

    pub(crate) fn try_reserve(&mut self, additional: usize) -> TreeResult<()> {
        self.links.try_reserve(additional).map_err(|_| TreeError::AllocFailed)?;
        self.keys.try_reserve(additional)
    }

    /// Generation of a live node, `None` if `handle` does not name one.
    pub(crate) fn generation(&self, handle: Handle) -> Option<Generation> {
        self.keys.generation(handle)
    }

    pub(crate) fn key(&self, handle: Handle) -> &K {
        self.keys.get(handle)
    }

    #[inline]
    fn links(&self, handle: Handle) -> &Links {
        &self.links[handle.slot()]
    }

    #[inline]
    fn links_mut(&mut self, handle: Handle) -> &mut Links {
        &mut self.links[handle.slot()]
    }

    #[inline]
    fn color(&self, handle: Handle) -> Color {
        self.links(handle).color()
    }

    #[inline]
    fn set_color(&mut self, handle: Handle, color: Color) {
        debug_assert!(!handle.is_nil(), "the sentinel is never recolored");
        self.links_mut(handle).set_color(color);
    }

    #[inline]
    fn parent(&self, handle: Handle) -> Handle {
        self.links(handle).parent()
    }

    #[inline]
    fn child(&self, handle: Handle, side: Side) -> Handle {
        self.links(handle).child(side)
    }

    fn swap_colors(&mut self, a: Handle, b: Handle) {
        let (color_a, color_b) = (self.color(a), self.color(b));
        self.set_color(a, color_b);
        self.set_color(b, color_a);
    }

    /// Descends from `from` along `side` as far as possible. Returns `NIL` only if `from` is `NIL`.
    pub(crate) fn extreme(&self, from: Handle, side: Side) -> Handle {
        let mut node = from;
        while !node.is_nil() {
            let next = self.child(node, side);
            if next.is_nil() {
                break;
            }
            node = next;
        }
        node
    }

    /// The smallest node, `NIL` when empty.
    pub(crate) fn first(&self) -> Handle {
        self.extreme(self.root, Side::Left)
    }

    /// The largest node, `NIL` when empty.
    pub(crate) fn last(&self) -> Handle {
        self.extreme(self.root, Side::Right)
    }

    /// In-order neighbour of `node` towards `side`: the successor for `Right`, the predecessor
    /// for `Left`. Returns `NIL` when `node` is the last one in that direction.
    pub(crate) fn step(&self, node: Handle, side: Side) -> Handle {
        let next = self.child(node, side);
        if !next.is_nil() {
            return self.extreme(next, side.opposite());
        }

        let mut node = node;
        let mut parent = self.parent(node);
        while !parent.is_nil() && self.child(parent, side) == node {
            node = parent;
            parent = self.parent(node);
        }
        parent
    }

    /// Promotes `node` above its parent. The rotation direction follows from the side `node` hangs
    /// on: a left child rotates right and vice versa. Colors and in-order sequence are unchanged.
    fn rotate_up(&mut self, node: Handle) {
        let parent = self.parent(node);
        let grandparent = self.parent(parent);
        let side = self.links(parent).side_of(node);
        let inner = self.child(node, side.opposite());

        // The inner grandchild changes hands. Writing the sentinel's parent here is harmless.
        self.links_mut(parent).set_child(side, inner);
        self.links_mut(inner).set_parent(parent);

        if grandparent.is_nil() {
            self.root = node;
        } else {
            let parent_side = self.links(grandparent).side_of(parent);
            self.links_mut(grandparent).set_child(parent_side, node);
        }
        self.links_mut(node).set_parent(grandparent);

        self.links_mut(node).set_child(side.opposite(), parent);
        self.links_mut(parent).set_parent(node);
    }

    /// Puts `replacement` where `node` hangs. `replacement` may be `NIL`.
    fn transplant(&mut self, node: Handle, replacement: Handle) {
        let parent = self.parent(node);
        if parent.is_nil() {
            self.root = replacement;
        } else {
            let side = self.links(parent).side_of(node);
            self.links_mut(parent).set_child(side, replacement);
        }
        self.links_mut(replacement).set_parent(parent);
    }

    /// Restores invariants after linking the red leaf `node`.
    fn insert_fixup(&mut self, node: Handle) {
        let mut node = node;
        loop {
            let parent = self.parent(node);
            if parent.is_nil() {
                self.set_color(node, Color::Black);
                return;
            }
            if self.color(parent) == Color::Black {
                return;
            }

            // A red parent is never the root, so the grandparent is real.
            let grandparent = self.parent(parent);
            let parent_side = self.links(grandparent).side_of(parent);
            let uncle = self.child(grandparent, parent_side.opposite());

            if self.color(uncle) == Color::Red {
                self.set_color(parent, Color::Black);
                self.set_color(uncle, Color::Black);
                self.set_color(grandparent, Color::Red);
                trace!("insert fixup: recolored under {grandparent:?}, moving up");
                node = grandparent;
                continue;
            }

            if self.links(parent).side_of(node) == parent_side {
                // Outer grandchild: one rotation.
                self.rotate_up(parent);
                self.swap_colors(parent, grandparent);
            } else {
                // Inner grandchild: bring it up twice.
                self.rotate_up(node);
                self.rotate_up(node);
                self.swap_colors(node, grandparent);
            }
            trace!("insert fixup: rotated at {grandparent:?}");
            return;
        }
    }

    /// Unlinks `node` and returns its key.
    ///
    /// A node with two children is replaced by its successor node, which takes over its position
    /// and color. Handles to every other node stay valid.
    pub(crate) fn erase(&mut self, node: Handle) -> K {
        let left = self.child(node, Side::Left);
        let right = self.child(node, Side::Right);

        let removed_color;
        let replacement;
        let parent;
        let side;

        if left.is_nil() || right.is_nil() {
            replacement = if left.is_nil() { right } else { left };
            parent = self.parent(node);
            side = self.links(parent).side_of(node);
            removed_color = self.color(node);
            self.transplant(node, replacement);
        } else {
            let successor = self.extreme(right, Side::Left);
            removed_color = self.color(successor);
            replacement = self.child(successor, Side::Right);

            if successor == right {
                parent = successor;
                side = Side::Right;
            } else {
                parent = self.parent(successor);
                side = Side::Left;
                self.transplant(successor, replacement);
                self.links_mut(successor).set_child(Side::Right, right);
                self.links_mut(right).set_parent(successor);
            }

            self.transplant(node, successor);
            self.links_mut(successor).set_child(Side::Left, left);
            self.links_mut(left).set_parent(successor);
            let color = self.color(node);
            self.set_color(successor, color);
        }

        if removed_color == Color::Black {
            self.erase_fixup(replacement, parent, side);
        }

        self.keys.take(node)
    }

    /// Resolves the missing black at `node`, which hangs on `side` of `parent`. `node` may be `NIL`.
    fn erase_fixup(&mut self, node: Handle, parent: Handle, side: Side) {
        let (mut node, mut parent, mut side) = (node, parent, side);
        loop {
            if self.color(node) == Color::Red {
                self.set_color(node, Color::Black);
                return;
            }
            if parent.is_nil() {
                // The deficiency reached the root, where it costs nothing.
                return;
            }

            let sibling = self.child(parent, side.opposite());
            if self.color(sibling) == Color::Red {
                self.swap_colors(parent, sibling);
                self.rotate_up(sibling);
                continue;
            }

            let near = self.child(sibling, side);
            let far = self.child(sibling, side.opposite());

            if self.color(near) == Color::Black && self.color(far) == Color::Black {
                self.set_color(sibling, Color::Red);
                node = parent;
                parent = self.parent(node);
                side = self.links(parent).side_of(node);
                trace!("erase fixup: pushed deficiency up to {node:?}");
                continue;
            }

            if self.color(far) == Color::Black {
                self.swap_colors(sibling, near);
                self.rotate_up(near);
                continue;
            }

            self.swap_colors(parent, sibling);
            self.rotate_up(sibling);
            self.set_color(far, Color::Black);
            trace!("erase fixup: rotated at {parent:?}");
            return;
        }
    }

    /// Releases every node with a depth-first walk. Returns the number of nodes released.
    pub(crate) fn clear(&mut self) -> usize {
        let mut stack: SmallVec<[Handle; 64]> = SmallVec::new();
        if !self.root.is_nil() {
            stack.push(self.root);
        }

        let mut released = 0;
        while let Some(node) = stack.pop() {
            for side in [Side::Left, Side::Right] {
                let child = self.child(node, side);
                if !child.is_nil() {
                    stack.push(child);
                }
            }
            drop(self.keys.take(node));
            released += 1;
        }

        self.root = Handle::NIL;
        self.links[Handle::NIL.slot()] = Links::SENTINEL;
        debug_assert!(self.keys.is_empty());
        released
    }
}

impl<K: Ord> RawRbTree<K> {
    /// Links `key` as a new node and rebalances. Equal keys go to the right of existing ones.
    pub(crate) fn insert(&mut self, key: K) -> TreeResult<Handle> {
        self.links.try_reserve(1).map_err(|_| TreeError::AllocFailed)?;

        let mut parent = Handle::NIL;
        let mut side = Side::Left;
        let mut current = self.root;
        while !current.is_nil() {
            parent = current;
            side = if key < *self.keys.get(current) { Side::Left } else { Side::Right };
            current = self.child(current, side);
        }

        let node = self.keys.try_alloc(key)?;
        let links = Links::leaf(parent);
        if node.slot() == self.links.len() {
            self.links.push(links);
        } else {
            self.links[node.slot()] = links;
        }
        debug_assert_eq!(self.links.len(), self.keys.slot_count() + 1);

        if parent.is_nil() {
            self.root = node;
        } else {
            self.links_mut(parent).set_child(side, node);
        }

        self.insert_fixup(node);
        Ok(node)
    }

    /// Returns the first node with a key equal to `key` met on the way down, if any.
    pub(crate) fn find<Q>(&self, key: &Q) -> Option<Handle>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let mut current = self.root;
        while !current.is_nil() {
            match key.cmp(self.keys.get(current).borrow()) {
                Ordering::Equal => return Some(current),
                Ordering::Less => current = self.child(current, Side::Left),
                Ordering::Greater => current = self.child(current, Side::Right),
            }
        }
        None
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use alloc::collections::BTreeMap;
    use alloc::vec;
    use proptest::prelude::*;

    impl<K: Ord + core::fmt::Debug> RawRbTree<K> {
        /// Checks every red-black and search-tree invariant, panicking with a description of the
        /// first violation found.
        pub(crate) fn validate_invariants(&self) {
            let nil = self.links(Handle::NIL);
            assert_eq!(nil.color(), Color::Black, "sentinel must stay black");
            assert!(nil.child(Side::Left).is_nil() && nil.child(Side::Right).is_nil(), "sentinel gained children");
            assert_eq!(self.links.len(), self.keys.slot_count() + 1, "link table out of step with arena");

            if self.root.is_nil() {
                assert_eq!(self.len(), 0, "empty tree should have len 0");
                return;
            }

            assert_eq!(self.color(self.root), Color::Black, "root must be black");
            assert!(self.parent(self.root).is_nil(), "root must hang off the sentinel");

            let (count, _) = self.validate_subtree(self.root);
            assert_eq!(count, self.len(), "reachable node count differs from len");

            let mut node = self.first();
            let mut previous: Option<&K> = None;
            let mut stepped = 0;
            while !node.is_nil() {
                let key = self.key(node);
                if let Some(previous) = previous {
                    assert!(previous <= key, "in-order keys out of order: {previous:?} before {key:?}");
                }
                previous = Some(key);
                stepped += 1;
                node = self.step(node, Side::Right);
            }
            assert_eq!(stepped, self.len(), "successor walk missed nodes");
        }

        /// Returns (node count, black height) of the subtree at `node`.
        fn validate_subtree(&self, node: Handle) -> (usize, usize) {
            if node.is_nil() {
                return (0, 0);
            }

            let key = self.key(node);
            let mut count = 1;
            let mut heights = [0; 2];
            for side in [Side::Left, Side::Right] {
                let child = self.child(node, side);
                if child.is_nil() {
                    continue;
                }
                assert_eq!(self.parent(child), node, "child {child:?} does not point back to {node:?}");
                if self.color(node) == Color::Red {
                    assert_eq!(self.color(child), Color::Black, "red {key:?} has a red child");
                }
                let child_key = self.key(child);
                match side {
                    Side::Left => assert!(child_key <= key, "{child_key:?} left of {key:?}"),
                    Side::Right => assert!(child_key >= key, "{child_key:?} right of {key:?}"),
                }
                let (child_count, child_height) = self.validate_subtree(child);
                count += child_count;
                heights[side as usize] = child_height + usize::from(self.color(child) == Color::Black);
            }
            assert_eq!(heights[0], heights[1], "black heights differ below {key:?}");
            (count, heights[0])
        }

        fn in_order(&self) -> Vec<&K> {
            let mut keys = Vec::new();
            let mut node = self.first();
            while !node.is_nil() {
                keys.push(self.key(node));
                node = self.step(node, Side::Right);
            }
            keys
        }
    }

    #[test]
    fn empty_tree() {
        let tree: RawRbTree<i32> = RawRbTree::new();
        tree.validate_invariants();
        assert!(tree.is_empty());
        assert!(tree.first().is_nil());
        assert!(tree.last().is_nil());
        assert_eq!(tree.find(&1), None);
    }

    #[test]
    fn first_insert_becomes_black_root() {
        let mut tree = RawRbTree::new();
        let node = tree.insert(10).unwrap();
        assert_eq!(tree.root, node);
        assert_eq!(tree.color(node), Color::Black);
        tree.validate_invariants();
    }

    #[test]
    fn ascending_inserts_stay_balanced() {
        let mut tree = RawRbTree::new();
        for key in 0..1024 {
            tree.insert(key).unwrap();
            tree.validate_invariants();
        }
        // A red-black tree of n nodes is at most 2 * log2(n + 1) deep.
        let mut depth = 0;
        let mut node = tree.last();
        while !node.is_nil() {
            depth += 1;
            node = tree.parent(node);
        }
        assert!(depth <= 20, "rightmost path is {depth} deep");
    }

    #[test]
    fn inner_grandchild_takes_double_rotation() {
        let mut tree = RawRbTree::new();
        let a = tree.insert(10).unwrap();
        let b = tree.insert(5).unwrap();
        let c = tree.insert(7).unwrap();
        tree.validate_invariants();

        assert_eq!(tree.root, c);
        assert_eq!(tree.child(c, Side::Left), b);
        assert_eq!(tree.child(c, Side::Right), a);
        assert_eq!(tree.color(a), Color::Red);
        assert_eq!(tree.color(b), Color::Red);
    }

    #[test]
    fn duplicates_go_right() {
        let mut tree = RawRbTree::new();
        let first = tree.insert(5).unwrap();
        let second = tree.insert(5).unwrap();
        assert_eq!(tree.child(first, Side::Right), second);
        assert_eq!(tree.find(&5), Some(first));
    }

    #[test]
    fn step_walks_both_directions() {
        let mut tree = RawRbTree::new();
        for key in [5, 3, 8, 1, 4, 7, 9] {
            tree.insert(key).unwrap();
        }

        let mut forward = vec![];
        let mut node = tree.first();
        while !node.is_nil() {
            forward.push(*tree.key(node));
            node = tree.step(node, Side::Right);
        }
        assert_eq!(forward, [1, 3, 4, 5, 7, 8, 9]);

        let mut backward = vec![];
        let mut node = tree.last();
        while !node.is_nil() {
            backward.push(*tree.key(node));
            node = tree.step(node, Side::Left);
        }
        assert_eq!(backward, [9, 8, 7, 5, 4, 3, 1]);
    }

    #[test]
    fn erase_with_two_children_keeps_other_handles() {
        let mut tree = RawRbTree::new();
        let handles: Vec<_> = [50, 30, 70, 20, 40, 60, 80, 65].iter().map(|&k| tree.insert(k).unwrap()).collect();

        // 70 has children 60 and 80; its successor is its right child.
        assert_eq!(tree.erase(handles[2]), 70);
        tree.validate_invariants();

        for (&handle, key) in handles.iter().zip([50, 30, 70, 20, 40, 60, 80, 65]) {
            if key == 70 {
                assert_eq!(tree.generation(handle), None);
            } else {
                assert_eq!(*tree.key(handle), key);
            }
        }
        assert_eq!(tree.in_order(), [&20, &30, &40, &50, &60, &65, &80]);
    }

    #[test]
    fn erase_root_min_max_of_three() {
        let mut tree = RawRbTree::new();
        let two = tree.insert(2).unwrap();
        let one = tree.insert(1).unwrap();
        let three = tree.insert(3).unwrap();

        assert_eq!(tree.erase(one), 1);
        tree.validate_invariants();
        assert_eq!(tree.erase(three), 3);
        tree.validate_invariants();
        assert_eq!(tree.erase(two), 2);
        tree.validate_invariants();
        assert!(tree.root.is_nil());
    }

    #[test]
    fn clear_releases_every_node_once() {
        let mut tree = RawRbTree::new();
        let handles: Vec<_> = (0..300).map(|k| tree.insert(k % 17).unwrap()).collect();
        assert_eq!(tree.clear(), 300);
        tree.validate_invariants();
        for handle in handles {
            assert_eq!(tree.generation(handle), None);
        }
        assert_eq!(tree.clear(), 0);

        // Slots are reused after a clear.
        let slots = tree.keys.slot_count();
        tree.insert(1).unwrap();
        assert_eq!(tree.keys.slot_count(), slots);
        tree.validate_invariants();
    }

    #[derive(Clone, Debug)]
    enum Op {
        Insert(u16),
        Erase(usize),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => (0u16..500).prop_map(Op::Insert),
            2 => any::<usize>().prop_map(Op::Erase),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn invariants_hold_after_every_operation(ops in prop::collection::vec(op_strategy(), 0..1_000)) {
            let mut tree = RawRbTree::new();
            let mut live: Vec<(Handle, u16)> = Vec::new();
            let mut model: BTreeMap<u16, usize> = BTreeMap::new();

            for op in ops {
                match op {
                    Op::Insert(key) => {
                        let handle = tree.insert(key).unwrap();
                        live.push((handle, key));
                        *model.entry(key).or_default() += 1;
                    }
                    Op::Erase(which) => {
                        if live.is_empty() {
                            continue;
                        }
                        let (handle, key) = live.swap_remove(which % live.len());
                        prop_assert_eq!(tree.erase(handle), key);
                        let count = model.get_mut(&key).unwrap();
                        *count -= 1;
                        if *count == 0 {
                            model.remove(&key);
                        }
                    }
                }

                tree.validate_invariants();
                prop_assert_eq!(tree.len(), live.len());
                for &(handle, key) in &live {
                    prop_assert_eq!(*tree.key(handle), key);
                }
            }

            for key in 0..500u16 {
                let found = tree.find(&key);
                prop_assert_eq!(found.is_some(), model.contains_key(&key));
                if let Some(handle) = found {
                    prop_assert_eq!(*tree.key(handle), key);
                }
            }

            // Erase whatever is left in the order it was inserted.
            for (handle, key) in live {
                prop_assert_eq!(tree.erase(handle), key);
                tree.validate_invariants();
            }
            prop_assert!(tree.root.is_nil());
        }
    }
}
