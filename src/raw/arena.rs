use alloc::vec::Vec;

use super::handle::Handle;
use crate::error::{TreeError, TreeResult};

/// Counter bumped every time a slot is released, so stale handles can be told apart from
/// handles to whatever reuses the slot.
pub(crate) type Generation = u32;

struct Slot<T> {
    generation: Generation,
    element: Option<T>,
}

pub(crate) struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<Handle>,
}

impl<T> Arena<T> {
    pub(crate) const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    /// Number of slots ever handed out, occupied or not.
    pub(crate) fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub(crate) const fn len(&self) -> usize {
        self.slots.len().saturating_sub(self.free.len())
    }

    pub(crate) const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ensures `additional` more elements fit without reallocating.
    pub(crate) fn try_reserve(&mut self, additional: usize) -> TreeResult<()> {
        let fresh = additional.saturating_sub(self.free.len());
        self.slots.try_reserve(fresh).map_err(|_| TreeError::AllocFailed)?;
        // The free list must be able to hold every slot, so `take` never allocates.
        let free_needed = (self.slots.len() + fresh).saturating_sub(self.free.len());
        self.free.try_reserve(free_needed).map_err(|_| TreeError::AllocFailed)?;
        Ok(())
    }

    pub(crate) fn try_alloc(&mut self, element: T) -> TreeResult<Handle> {
        if let Some(h) = self.free.pop() {
            // Reuse a free slot/handle.
            self.slots[h.to_index()].element = Some(element);
            return Ok(h);
        }

        // Use strict less-than so the slot count never exceeds Handle::MAX.
        if self.slots.len() >= Handle::MAX {
            return Err(TreeError::AllocFailed);
        }
        self.try_reserve(1)?;
        self.slots.push(Slot {
            generation: 0,
            element: Some(element),
        });
        Ok(Handle::from_index(self.slots.len() - 1))
    }

    /// Returns the generation of an occupied slot, or `None` if `handle` is out of range or free.
    pub(crate) fn generation(&self, handle: Handle) -> Option<Generation> {
        if handle.is_nil() {
            return None;
        }
        let slot = self.slots.get(handle.to_index())?;
        slot.element.as_ref().map(|_| slot.generation)
    }

    #[inline]
    pub(crate) fn get(&self, handle: Handle) -> &T {
        self.slots[handle.to_index()].element.as_ref().expect("`Arena::get()` - `handle` is invalid!")
    }

    pub(crate) fn take(&mut self, handle: Handle) -> T {
        let slot = &mut self.slots[handle.to_index()];
        let element = slot.element.take().expect("`Arena::take()` - `handle` is invalid!");
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle);
        element
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn arena_capacity() {
        let arena: Arena<u32> = Arena::with_capacity(10);
        assert_eq!(arena.capacity(), 10);
    }

    #[test]
    fn released_slot_gets_new_generation() {
        let mut arena: Arena<u32> = Arena::new();
        let a = arena.try_alloc(1).unwrap();
        let before = arena.generation(a).unwrap();

        assert_eq!(arena.take(a), 1);
        assert_eq!(arena.generation(a), None);

        let b = arena.try_alloc(2).unwrap();
        assert_eq!(a, b, "free slot should be reused");
        assert_ne!(arena.generation(b), Some(before));
    }

    #[test]
    fn nil_and_out_of_range_have_no_generation() {
        let mut arena: Arena<u32> = Arena::new();
        let _ = arena.try_alloc(7).unwrap();
        assert_eq!(arena.generation(Handle::NIL), None);
        assert_eq!(arena.generation(Handle::from_index(5)), None);
    }

    #[test]
    fn exhausting_handles_reports_alloc_failure() {
        let mut arena: Arena<u8> = Arena::new();
        for _ in 0..Handle::MAX {
            arena.try_alloc(0).unwrap();
        }
        assert_eq!(arena.try_alloc(0), Err(TreeError::AllocFailed));
        assert_eq!(arena.len(), Handle::MAX);

        // Releasing one makes room again.
        arena.take(Handle::from_index(3));
        assert_eq!(arena.try_alloc(1), Ok(Handle::from_index(3)));
    }

    proptest! {
        #[test]
        fn arena_behaves_like_vec(operations in prop::collection::vec(strategy(), 0..256)) {
            let mut model: Vec<(Handle, Generation, u32)> = Vec::new();
            let mut released: Vec<(Handle, Generation)> = Vec::new();
            let mut arena: Arena<u32> = Arena::new();

            for operation in operations {
                match operation {
                    Operation::Alloc(value) => {
                        let handle = arena.try_alloc(value).unwrap();
                        let generation = arena.generation(handle).unwrap();
                        model.push((handle, generation, value));
                    }
                    Operation::Get(which) => {
                        if model.is_empty() {
                            continue;
                        }

                        let index = which % model.len();
                        let (handle, _, value) = model[index];
                        prop_assert_eq!(*arena.get(handle), value);
                    }
                    Operation::Take(which) => {
                        if model.is_empty() {
                            continue;
                        }

                        let index = which % model.len();
                        let (handle, generation, value) = model.swap_remove(index);
                        prop_assert_eq!(arena.take(handle), value);
                        released.push((handle, generation));
                    }
                    Operation::Reserve(additional) => {
                        arena.try_reserve(additional).unwrap();
                        prop_assert!(arena.capacity() >= arena.len() + additional.saturating_sub(arena.free.len()));
                    }
                }

                prop_assert_eq!(arena.len(), model.len());
                prop_assert_eq!(arena.is_empty(), model.is_empty());
                prop_assert!(arena.free.capacity() >= arena.slot_count());

                for &(handle, generation, value) in &model {
                    prop_assert_eq!(*arena.get(handle), value);
                    prop_assert_eq!(arena.generation(handle), Some(generation));
                }
                for &(handle, generation) in &released {
                    prop_assert_ne!(arena.generation(handle), Some(generation));
                }
            }
        }
    }

    #[derive(Clone, Debug)]
    enum Operation {
        Alloc(u32),
        Get(usize),
        Take(usize),
        Reserve(usize),
    }

    fn strategy() -> impl Strategy<Value = Operation> {
        prop_oneof![
            20 => any::<u32>().prop_map(Operation::Alloc),
            5 => any::<usize>().prop_map(Operation::Get),
            10 => any::<usize>().prop_map(Operation::Take),
            1 => (0usize..64).prop_map(Operation::Reserve),
        ]
    }
}
