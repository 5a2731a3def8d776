use core::fmt;

/// Errors reported by [`RbTree`](crate::RbTree) operations.
///
/// No operation that returns an error has modified the tree.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum TreeError {
    /// Memory for a new node could not be reserved, or the handle space is exhausted.
    AllocFailed,
    /// The operation needs at least one key but the tree is empty.
    Empty,
    /// The [`NodeRef`](crate::NodeRef) belongs to another tree or names a node that has been
    /// erased.
    InvalidHandle,
}

/// Shorthand for results carrying a [`TreeError`].
pub type TreeResult<T> = Result<T, TreeError>;

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeError::AllocFailed => f.write_str("failed to allocate a tree node"),
            TreeError::Empty => f.write_str("the tree is empty"),
            TreeError::InvalidHandle => f.write_str("node handle is stale or belongs to another tree"),
        }
    }
}

impl core::error::Error for TreeError {}
