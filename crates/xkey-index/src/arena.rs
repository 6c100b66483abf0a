//! Slab arena addressed by typed slot ids.
//!
//! Buckets and links refer to each other through ids into these arenas
//! instead of pointers. Ids stay valid until the slot is removed; vacated
//! slots are reused by later inserts.

use std::fmt;
use std::marker::PhantomData;

/// A typed index into an [`Arena`].
pub trait SlotId: Copy + Eq + fmt::Debug {
    fn from_slot(slot: usize) -> Self;
    fn slot(self) -> usize;
}

/// Vector-backed slab with a vacant-slot list.
pub struct Arena<I, T> {
    slots: Vec<Option<T>>,
    vacant: Vec<usize>,
    len: usize,
    _id: PhantomData<I>,
}

impl<I: SlotId, T> Arena<I, T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            vacant: Vec::new(),
            len: 0,
            _id: PhantomData,
        }
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Store a value and return its id.
    pub fn insert(&mut self, value: T) -> I {
        let slot = match self.vacant.pop() {
            Some(slot) => {
                debug_assert!(self.slots[slot].is_none());
                self.slots[slot] = Some(value);
                slot
            }
            None => {
                self.slots.push(Some(value));
                self.slots.len() - 1
            }
        };
        self.len += 1;
        I::from_slot(slot)
    }

    /// Take the value out of an occupied slot.
    ///
    /// # Panics
    ///
    /// Panics if the slot is vacant: a stale id means the index is corrupt.
    pub fn remove(&mut self, id: I) -> T {
        let value = self
            .slots
            .get_mut(id.slot())
            .and_then(Option::take)
            .unwrap_or_else(|| panic!("arena remove of vacant slot {id:?}"));
        self.vacant.push(id.slot());
        self.len -= 1;
        value
    }

    pub fn get(&self, id: I) -> Option<&T> {
        self.slots.get(id.slot()).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: I) -> Option<&mut T> {
        self.slots.get_mut(id.slot()).and_then(Option::as_mut)
    }

    /// Iterate occupied slots in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (I, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, value)| value.as_ref().map(|v| (I::from_slot(slot), v)))
    }

    /// Remove every value and release the slot storage.
    pub fn clear(&mut self) {
        self.slots = Vec::new();
        self.vacant = Vec::new();
        self.len = 0;
    }
}

impl<I: SlotId, T> Default for Arena<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: SlotId, T> std::ops::Index<I> for Arena<I, T> {
    type Output = T;

    fn index(&self, id: I) -> &T {
        self.get(id)
            .unwrap_or_else(|| panic!("dangling arena id {id:?}"))
    }
}

impl<I: SlotId, T> std::ops::IndexMut<I> for Arena<I, T> {
    fn index_mut(&mut self, id: I) -> &mut T {
        self.get_mut(id)
            .unwrap_or_else(|| panic!("dangling arena id {id:?}"))
    }
}
