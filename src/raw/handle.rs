#[cfg(test)]
type RawHandle = u16;
#[cfg(not(test))]
type RawHandle = u32;

/// Index of a node in the tree's backing storage.
///
/// Raw value 0 is reserved for the sentinel; live nodes start at 1.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub(crate) struct Handle(RawHandle);

impl Handle {
    /// The shared, permanently black terminator.
    pub(crate) const NIL: Self = Self(0);
    pub(crate) const MAX: usize = (RawHandle::MAX - 1) as usize;

    #[inline]
    pub(crate) const fn from_index(index: usize) -> Self {
        assert!(index <= Self::MAX, "`Handle::from_index()` - `index` > `Handle::MAX`!");
        #[allow(clippy::cast_possible_truncation)]
        Self((index + 1) as RawHandle)
    }

    /// Position in the key arena. Must not be called on `NIL`.
    #[inline]
    pub(crate) const fn to_index(self) -> usize {
        debug_assert!(self.0 != 0, "`Handle::to_index()` - called on `Handle::NIL`!");
        (self.0 - 1) as usize
    }

    /// Position in the link table, where slot 0 is the sentinel.
    #[inline]
    pub(crate) const fn slot(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub(crate) const fn is_nil(self) -> bool {
        self.0 == 0
    }
}
