//! Heap storage with runtime capacity.

use super::Storage;
use crate::Capacity;
use std::cell::UnsafeCell;
use std::collections::TryReserveError;
use std::fmt;
use std::mem::MaybeUninit;

/// Heap-allocated slots; the requested size is rounded up to a power of two.
///
/// Uses `Box<[_]>` rather than `Vec<_>`: the slot count only changes when
/// the queue swaps in a whole new storage during `resize`.
pub struct DynamicStorage<T> {
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
}

impl<T> DynamicStorage<T> {
    /// Allocates at least `slots` slots (rounded up to a power of two, min 2).
    ///
    /// # Panics
    ///
    /// Panics if the rounded size overflows `usize`. Like `Vec`, aborts if
    /// the allocator fails.
    pub fn with_capacity(slots: usize) -> Self {
        match Capacity::at_least(slots) {
            Some(capacity) => Self::from_capacity(capacity),
            None => panic!("capacity overflow"),
        }
    }

    /// Allocates exactly `capacity.get()` slots.
    pub fn from_capacity(capacity: Capacity) -> Self {
        let len = capacity.get();
        let mut slots = Vec::with_capacity(len);
        slots.resize_with(len, uninit_slot);
        Self {
            slots: slots.into_boxed_slice(),
        }
    }

    /// Fallible counterpart of [`with_capacity`](Self::with_capacity); the
    /// allocator error is returned as-is.
    pub fn try_with_capacity(slots: usize) -> Result<Self, TryReserveError> {
        match Capacity::at_least(slots) {
            Some(capacity) => Self::try_from_capacity(capacity),
            None => Err(capacity_overflow()),
        }
    }

    /// Fallible counterpart of [`from_capacity`](Self::from_capacity).
    pub fn try_from_capacity(capacity: Capacity) -> Result<Self, TryReserveError> {
        let len = capacity.get();
        let mut slots = Vec::new();
        slots.try_reserve_exact(len)?;
        slots.resize_with(len, uninit_slot);
        Ok(Self {
            slots: slots.into_boxed_slice(),
        })
    }

    /// Returns the slot count as a [`Capacity`].
    #[inline]
    pub fn capacity(&self) -> Capacity {
        Capacity::from_bits(self.slots.len().trailing_zeros() as u8)
    }
}

fn uninit_slot<T>() -> UnsafeCell<MaybeUninit<T>> {
    UnsafeCell::new(MaybeUninit::uninit())
}

/// The error `Vec` reports for an impossible length.
fn capacity_overflow() -> TryReserveError {
    let mut probe: Vec<u8> = Vec::new();
    match probe.try_reserve_exact(usize::MAX) {
        Err(err) => err,
        Ok(()) => unreachable!("usize::MAX bytes always exceeds isize::MAX"),
    }
}

impl<T> fmt::Debug for DynamicStorage<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicStorage")
            .field("slots", &self.slots.len())
            .finish()
    }
}

// SAFETY: the boxed slice length always comes from a `Capacity` (a power of
// two), the heap block never moves while borrowed, and UnsafeCell permits
// writes through `&self`.
unsafe impl<T> Storage for DynamicStorage<T> {
    type Item = T;

    #[inline]
    fn allocated_size(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    fn as_ptr(&self) -> *mut T {
        UnsafeCell::raw_get(self.slots.as_ptr()).cast::<T>()
    }
}
