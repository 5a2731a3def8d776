use core::borrow::Borrow;
use core::fmt;
use core::iter::FusedIterator;

use alloc::vec::Vec;
use log::debug;

use crate::error::{TreeError, TreeResult};
use crate::node_ref::{NodeRef, TreeId};
use crate::raw::{Handle, RawRbTree, Side};

mod capacity;

/// An ordered index based on a [red-black tree].
///
/// Keys need a total order, given by the [`Ord`] trait. Equal keys are allowed: each insertion
/// creates its own node, placed after every node with an equal key already present, so the
/// in-order sequence is a sorted multiset.
///
/// Every insertion returns a [`NodeRef`] naming the new node. Handles survive rebalancing and the
/// removal of other nodes, and are checked on use: a handle to an erased node or to a node of a
/// different tree is rejected with [`TreeError::InvalidHandle`] instead of corrupting the tree.
///
/// Nodes live in a single arena owned by the tree. Absent children and the root's parent all
/// point at one shared black sentinel, which keeps the rebalancing rules free of special cases.
/// Insertion, lookup, erasure and stepping to a neighbour take O(log n) time.
///
/// It is a logic error for a key to be modified in such a way that its ordering relative to any
/// other key changes while it is in the tree. The behavior resulting from such a logic error is
/// not specified, but will be encapsulated to the `RbTree` that observed it and not result in
/// undefined behavior.
///
/// [red-black tree]: https://en.wikipedia.org/wiki/Red%E2%80%93black_tree
///
/// # Examples
///
/// ```
/// use rb_index::RbTree;
///
/// let mut tree = RbTree::new();
/// for key in [5, 3, 8, 1, 4, 7, 9] {
///     tree.insert(key).unwrap();
/// }
///
/// assert_eq!(tree.flatten(usize::MAX), [1, 3, 4, 5, 7, 8, 9]);
///
/// let eight = tree.find(&8).unwrap();
/// assert_eq!(tree.erase(eight), Ok(8));
/// assert!(!tree.contains(&8));
///
/// let min = tree.min().unwrap();
/// assert_eq!(tree.key(min), Ok(&1));
/// ```
pub struct RbTree<K> {
    raw: RawRbTree<K>,
    id: TreeId,
}

/// An iterator over the keys of an `RbTree`, in ascending order.
///
/// This `struct` is created by the [`iter`] method on [`RbTree`].
///
/// # Examples
///
/// ```
/// use rb_index::RbTree;
///
/// let mut tree = RbTree::new();
/// for key in [3, 1, 2] {
///     tree.insert(key).unwrap();
/// }
///
/// let mut iter = tree.iter();
/// assert_eq!(iter.next(), Some(&1));
/// assert_eq!(iter.next_back(), Some(&3));
/// assert_eq!(iter.next(), Some(&2));
/// assert_eq!(iter.next(), None);
/// ```
///
/// [`iter`]: RbTree::iter
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Iter<'a, K> {
    tree: &'a RawRbTree<K>,
    front: Handle,
    back: Handle,
    remaining: usize,
}

impl<K> RbTree<K> {
    /// Makes a new, empty `RbTree`.
    ///
    /// Does not allocate anything on its own beyond the sentinel.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_index::RbTree;
    ///
    /// let tree: RbTree<i32> = RbTree::new();
    /// assert!(tree.is_empty());
    /// ```
    #[must_use]
    pub fn new() -> Self {
        RbTree {
            raw: RawRbTree::new(),
            id: TreeId::fresh(),
        }
    }

    /// Returns the number of keys in the tree, counting duplicates.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_index::RbTree;
    ///
    /// let mut tree = RbTree::new();
    /// tree.insert(1).unwrap();
    /// tree.insert(1).unwrap();
    /// assert_eq!(tree.len(), 2);
    /// ```
    #[must_use]
    pub const fn len(&self) -> usize {
        self.raw.len()
    }

    /// Returns `true` if the tree holds no keys.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Removes every key from the tree.
    ///
    /// Every [`NodeRef`] previously handed out becomes invalid. Memory is kept for reuse.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_index::{RbTree, TreeError};
    ///
    /// let mut tree = RbTree::new();
    /// let node = tree.insert(1).unwrap();
    /// tree.clear();
    /// assert!(tree.is_empty());
    /// assert_eq!(tree.key(node), Err(TreeError::InvalidHandle));
    /// ```
    ///
    /// # Complexity
    ///
    /// O(n)
    pub fn clear(&mut self) {
        let released = self.raw.clear();
        debug!("cleared {released} nodes from tree {:?}", self.id);
    }

    /// Returns the key stored in `node`.
    ///
    /// # Errors
    ///
    /// [`TreeError::InvalidHandle`] if `node` has been erased or belongs to another tree.
    pub fn key(&self, node: NodeRef) -> TreeResult<&K> {
        let handle = self.resolve(node)?;
        Ok(self.raw.key(handle))
    }

    /// Returns the node holding the smallest key. With duplicates, this is the earliest inserted
    /// of them.
    ///
    /// # Errors
    ///
    /// [`TreeError::Empty`] if the tree holds no keys.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_index::{RbTree, TreeError};
    ///
    /// let mut tree = RbTree::new();
    /// assert_eq!(tree.min(), Err(TreeError::Empty));
    ///
    /// tree.insert(2).unwrap();
    /// tree.insert(1).unwrap();
    /// let min = tree.min().unwrap();
    /// assert_eq!(tree.key(min), Ok(&1));
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn min(&self) -> TreeResult<NodeRef> {
        self.extreme(self.raw.first())
    }

    /// Returns the node holding the largest key. With duplicates, this is the latest inserted of
    /// them.
    ///
    /// # Errors
    ///
    /// [`TreeError::Empty`] if the tree holds no keys.
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn max(&self) -> TreeResult<NodeRef> {
        self.extreme(self.raw.last())
    }

    /// Returns the node that follows `node` in ascending order, or `None` if `node` is the last.
    ///
    /// # Errors
    ///
    /// [`TreeError::InvalidHandle`] if `node` has been erased or belongs to another tree.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_index::RbTree;
    ///
    /// let mut tree = RbTree::new();
    /// let one = tree.insert(1).unwrap();
    /// let two = tree.insert(2).unwrap();
    ///
    /// assert_eq!(tree.successor(one), Ok(Some(two)));
    /// assert_eq!(tree.successor(two), Ok(None));
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n) worst case, amortized O(1) when walking the whole tree.
    pub fn successor(&self, node: NodeRef) -> TreeResult<Option<NodeRef>> {
        self.neighbour(node, Side::Right)
    }

    /// Returns the node that precedes `node` in ascending order, or `None` if `node` is the first.
    ///
    /// # Errors
    ///
    /// [`TreeError::InvalidHandle`] if `node` has been erased or belongs to another tree.
    pub fn predecessor(&self, node: NodeRef) -> TreeResult<Option<NodeRef>> {
        self.neighbour(node, Side::Left)
    }

    /// Removes `node` from the tree and returns its key.
    ///
    /// Every other [`NodeRef`] into this tree stays valid and keeps naming the same key.
    ///
    /// # Errors
    ///
    /// [`TreeError::InvalidHandle`] if `node` has already been erased or belongs to another tree.
    /// The tree is left untouched.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_index::{RbTree, TreeError};
    ///
    /// let mut tree = RbTree::new();
    /// let two = tree.insert(2).unwrap();
    /// let one = tree.insert(1).unwrap();
    ///
    /// assert_eq!(tree.erase(two), Ok(2));
    /// assert_eq!(tree.erase(two), Err(TreeError::InvalidHandle));
    /// assert_eq!(tree.key(one), Ok(&1));
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn erase(&mut self, node: NodeRef) -> TreeResult<K> {
        let handle = self.resolve(node)?;
        Ok(self.raw.erase(handle))
    }

    /// Gets an iterator over the keys of the tree, in ascending order.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_index::RbTree;
    ///
    /// let mut tree = RbTree::new();
    /// for key in [3, 1, 2, 1] {
    ///     tree.insert(key).unwrap();
    /// }
    ///
    /// let keys: Vec<_> = tree.iter().copied().collect();
    /// assert_eq!(keys, [1, 1, 2, 3]);
    /// ```
    pub fn iter(&self) -> Iter<'_, K> {
        Iter {
            tree: &self.raw,
            front: self.raw.first(),
            back: self.raw.last(),
            remaining: self.raw.len(),
        }
    }

    fn node_ref(&self, handle: Handle) -> NodeRef {
        let generation = self.raw.generation(handle).expect("`RbTree::node_ref()` - `handle` is not live!");
        NodeRef {
            tree: self.id,
            handle,
            generation,
        }
    }

    /// Maps a caller's `NodeRef` back to a live handle of this tree.
    fn resolve(&self, node: NodeRef) -> TreeResult<Handle> {
        if node.tree != self.id {
            debug!("rejected {node:?}: it belongs to tree {:?}, not {:?}", node.tree, self.id);
            return Err(TreeError::InvalidHandle);
        }
        if self.raw.generation(node.handle) != Some(node.generation) {
            debug!("rejected {node:?}: the node has been erased");
            return Err(TreeError::InvalidHandle);
        }
        Ok(node.handle)
    }

    fn extreme(&self, handle: Handle) -> TreeResult<NodeRef> {
        if handle.is_nil() {
            return Err(TreeError::Empty);
        }
        Ok(self.node_ref(handle))
    }

    fn neighbour(&self, node: NodeRef, side: Side) -> TreeResult<Option<NodeRef>> {
        let handle = self.resolve(node)?;
        let next = self.raw.step(handle, side);
        Ok((!next.is_nil()).then(|| self.node_ref(next)))
    }
}

impl<K: Ord> RbTree<K> {
    /// Inserts `key` as a new node and returns a handle to it.
    ///
    /// Keys equal to ones already present are kept: the new node goes after all of them in
    /// ascending order.
    ///
    /// # Errors
    ///
    /// [`TreeError::AllocFailed`] if memory for the node could not be obtained. The tree is left
    /// untouched and `key` is dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_index::RbTree;
    ///
    /// let mut tree = RbTree::new();
    /// let first = tree.insert(5).unwrap();
    /// let second = tree.insert(5).unwrap();
    ///
    /// assert_ne!(first, second);
    /// assert_eq!(tree.flatten(10), [5, 5]);
    /// assert_eq!(tree.successor(first), Ok(Some(second)));
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn insert(&mut self, key: K) -> TreeResult<NodeRef> {
        let handle = self.raw.insert(key)?;
        Ok(self.node_ref(handle))
    }

    /// Returns a node whose key equals `key`, if there is one.
    ///
    /// When several nodes hold an equal key, the one met first on the way down from the root is
    /// returned. Which of the duplicates that is depends on the tree's shape and is not specified.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_index::RbTree;
    ///
    /// let mut tree = RbTree::new();
    /// tree.insert("b").unwrap();
    ///
    /// let node = tree.find("b").unwrap();
    /// assert_eq!(tree.key(node), Ok(&"b"));
    /// assert_eq!(tree.find("a"), None);
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn find<Q>(&self, key: &Q) -> Option<NodeRef>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.find(key).map(|handle| self.node_ref(handle))
    }

    /// Returns `true` if the tree holds at least one key equal to `key`.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.find(key).is_some()
    }

    /// Removes one node whose key equals `key` and returns that key, or `None` if there is none.
    ///
    /// The node removed is the one [`find`](RbTree::find) would return.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_index::RbTree;
    ///
    /// let mut tree = RbTree::new();
    /// tree.insert(1).unwrap();
    /// tree.insert(1).unwrap();
    ///
    /// assert_eq!(tree.remove(&1), Some(1));
    /// assert_eq!(tree.remove(&1), Some(1));
    /// assert_eq!(tree.remove(&1), None);
    /// ```
    pub fn remove<Q>(&mut self, key: &Q) -> Option<K>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let handle = self.raw.find(key)?;
        Some(self.raw.erase(handle))
    }
}

impl<K: Clone> RbTree<K> {
    /// Returns up to `capacity` keys in ascending order, starting from the smallest.
    ///
    /// An empty tree yields an empty vector.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_index::RbTree;
    ///
    /// let mut tree = RbTree::new();
    /// for key in [9, 7, 4, 1, 8, 3, 5] {
    ///     tree.insert(key).unwrap();
    /// }
    ///
    /// assert_eq!(tree.flatten(3), [1, 3, 4]);
    /// assert_eq!(tree.flatten(100), [1, 3, 4, 5, 7, 8, 9]);
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n + capacity)
    #[must_use]
    pub fn flatten(&self, capacity: usize) -> Vec<K> {
        let mut keys = Vec::with_capacity(capacity.min(self.len()));
        keys.extend(self.iter().take(capacity).cloned());
        keys
    }

    /// Writes keys in ascending order into `out`, stopping when either runs out, and returns how
    /// many were written. Slots past that count are left as they were.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_index::RbTree;
    ///
    /// let mut tree = RbTree::new();
    /// for key in [2, 3, 1] {
    ///     tree.insert(key).unwrap();
    /// }
    ///
    /// let mut out = [0; 5];
    /// assert_eq!(tree.fill_sorted(&mut out), 3);
    /// assert_eq!(out, [1, 2, 3, 0, 0]);
    /// ```
    pub fn fill_sorted(&self, out: &mut [K]) -> usize {
        let mut written = 0;
        for (slot, key) in out.iter_mut().zip(self.iter()) {
            slot.clone_from(key);
            written += 1;
        }
        written
    }
}

impl<K> Default for RbTree<K> {
    /// Creates an empty `RbTree`.
    fn default() -> RbTree<K> {
        RbTree::new()
    }
}

impl<K: fmt::Debug> fmt::Debug for RbTree<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<'a, K> IntoIterator for &'a RbTree<K> {
    type Item = &'a K;
    type IntoIter = Iter<'a, K>;

    fn into_iter(self) -> Iter<'a, K> {
        self.iter()
    }
}

impl<'a, K> Iterator for Iter<'a, K> {
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        if self.remaining == 0 {
            return None;
        }
        let key = self.tree.key(self.front);
        self.front = self.tree.step(self.front, Side::Right);
        self.remaining -= 1;
        Some(key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, K> DoubleEndedIterator for Iter<'a, K> {
    fn next_back(&mut self) -> Option<&'a K> {
        if self.remaining == 0 {
            return None;
        }
        let key = self.tree.key(self.back);
        self.back = self.tree.step(self.back, Side::Left);
        self.remaining -= 1;
        Some(key)
    }
}

impl<K> ExactSizeIterator for Iter<'_, K> {
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<K> FusedIterator for Iter<'_, K> {}

impl<K> Clone for Iter<'_, K> {
    fn clone(&self) -> Self {
        Iter { ..*self }
    }
}

impl<K: fmt::Debug> fmt::Debug for Iter<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}
