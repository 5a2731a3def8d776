use core::sync::atomic::{AtomicUsize, Ordering};

use crate::raw::{Generation, Handle};

/// Identity of one tree instance, used to reject handles from other trees.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub(crate) struct TreeId(usize);

impl TreeId {
    pub(crate) fn fresh() -> Self {
        static NEXT: AtomicUsize = AtomicUsize::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A handle to one node of an [`RbTree`](crate::RbTree).
///
/// Returned by [`insert`](crate::RbTree::insert), [`find`](crate::RbTree::find) and the other
/// lookups. A `NodeRef` stays valid until the node it names is erased or the tree is cleared,
/// regardless of how the tree is rebalanced in between. Using it after that, or with a different
/// tree, yields [`TreeError::InvalidHandle`](crate::TreeError::InvalidHandle).
///
/// # Examples
///
/// ```
/// use rb_index::{RbTree, TreeError};
///
/// let mut tree = RbTree::new();
/// let node = tree.insert(42).unwrap();
/// assert_eq!(tree.key(node), Ok(&42));
///
/// tree.erase(node).unwrap();
/// assert_eq!(tree.key(node), Err(TreeError::InvalidHandle));
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct NodeRef {
    pub(crate) tree: TreeId,
    pub(crate) handle: Handle,
    pub(crate) generation: Generation,
}
