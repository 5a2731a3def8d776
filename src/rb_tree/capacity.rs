use super::RbTree;
use crate::error::TreeResult;
use crate::node_ref::TreeId;
use crate::raw::RawRbTree;

impl<K> RbTree<K> {
    /// Creates an empty tree with room for at least `capacity` keys.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_index::RbTree;
    ///
    /// let tree: RbTree<i32> = RbTree::with_capacity(16);
    /// assert!(tree.is_empty());
    /// assert!(tree.capacity() >= 16);
    /// ```
    ///
    /// # Complexity
    ///
    /// O(capacity) for memory allocation.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        RbTree {
            raw: RawRbTree::with_capacity(capacity),
            id: TreeId::fresh(),
        }
    }

    /// Returns how many keys the tree can hold without allocating.
    ///
    /// Slots freed by erasure are reused before new ones are allocated, so this bounds the number
    /// of keys ever held at once, not the number of insertions.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.raw.capacity()
    }

    /// Reserves room for at least `additional` more keys.
    ///
    /// # Errors
    ///
    /// [`TreeError::AllocFailed`](crate::TreeError::AllocFailed) if the memory could not be
    /// obtained. The tree is still usable and holds the same keys.
    ///
    /// # Examples
    ///
    /// ```
    /// use rb_index::RbTree;
    ///
    /// let mut tree: RbTree<u64> = RbTree::new();
    /// tree.try_reserve(100).unwrap();
    /// assert!(tree.capacity() >= 100);
    /// ```
    pub fn try_reserve(&mut self, additional: usize) -> TreeResult<()> {
        self.raw.try_reserve(additional)
    }
}
