//! Inline storage with compile-time capacity.
//!
//! The slots are embedded directly in the queue, so `slot(idx)` is a
//! base+offset the compiler can constant-fold, and no allocator is needed.
//! Mind the size: `StaticQueue<u64, 65536>` is half a megabyte and may
//! overflow a default thread stack; put large queues in a `Box` or a static.

use super::Storage;
use std::cell::UnsafeCell;
use std::fmt;
use std::mem::MaybeUninit;

/// Compile-time assertion that N is a power of 2.
/// Required for masking (`cursor & (N - 1)`) instead of modulo.
const fn assert_power_of_two<const N: usize>() {
    assert!(N > 0, "StaticStorage capacity must be > 0");
    assert!(N.is_power_of_two(), "StaticStorage capacity must be a power of 2");
}

/// `N` inline slots; `N` must be a power of two.
pub struct StaticStorage<T, const N: usize> {
    /// `UnsafeCell<MaybeUninit<T>>` gives interior mutability without
    /// requiring `T: Default`.
    slots: [UnsafeCell<MaybeUninit<T>>; N],
}

impl<T, const N: usize> StaticStorage<T, N> {
    const VALID: () = assert_power_of_two::<N>();

    /// Creates storage with every slot uninitialized.
    ///
    /// Fails to compile if `N` is not a power of 2.
    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::VALID;

        Self {
            // SAFETY: an array of `UnsafeCell<MaybeUninit<T>>` has no
            // validity requirement; this is the standard pattern for
            // const-initializing arrays of MaybeUninit.
            slots: unsafe { MaybeUninit::uninit().assume_init() },
        }
    }
}

impl<T, const N: usize> Default for StaticStorage<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> fmt::Debug for StaticStorage<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticStorage").field("slots", &N).finish()
    }
}

// SAFETY: N is a power of two (checked at compile time), the array is
// inline and never moves while borrowed, and UnsafeCell permits writes
// through `&self`.
unsafe impl<T, const N: usize> Storage for StaticStorage<T, N> {
    type Item = T;

    #[inline]
    fn allocated_size(&self) -> usize {
        N
    }

    #[inline]
    fn as_ptr(&self) -> *mut T {
        UnsafeCell::raw_get(self.slots.as_ptr()).cast::<T>()
    }

    #[inline]
    fn wrap(&self, cursor: usize) -> usize {
        cursor & (N - 1)
    }
}
