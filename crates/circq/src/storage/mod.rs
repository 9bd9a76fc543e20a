//! Slot storage backends.
//!
//! A backend owns a power-of-two array of possibly-uninitialized slots and
//! nothing else: which slots are live is tracked by the queue's cursors.
//! Slots are reached through raw pointers derived from `&self` because the
//! producer and consumer write disjoint slots through a shared reference.
//!
//! - [`StaticStorage`]: inline `[_; N]`, no allocation, usable in `const`.
//! - [`DynamicStorage`]: boxed slice sized at runtime, resizable by the queue.

mod dynamic;
mod static_storage;

pub use dynamic::DynamicStorage;
pub use static_storage::StaticStorage;

use std::ptr;

/// A fixed block of element slots addressed by physical index.
///
/// # Safety
///
/// Implementors must guarantee that:
/// - [`allocated_size`](Self::allocated_size) is a non-zero power of two and
///   does not change while the storage is borrowed;
/// - [`as_ptr`](Self::as_ptr) points at `allocated_size()` contiguous,
///   properly aligned slots that may be written through while `&self` is
///   held (interior mutability);
/// - the storage never reads, drops or moves the slot contents itself.
pub unsafe trait Storage {
    /// The element type held by each slot.
    type Item;

    /// Number of physical slots.
    fn allocated_size(&self) -> usize;

    /// Pointer to slot zero.
    fn as_ptr(&self) -> *mut Self::Item;

    /// Maps an unbounded cursor onto a physical slot.
    #[inline]
    fn wrap(&self, cursor: usize) -> usize {
        cursor & (self.allocated_size() - 1)
    }

    /// Pointer to the slot at physical index `pos`.
    #[inline]
    fn slot(&self, pos: usize) -> *mut Self::Item {
        debug_assert!(pos < self.allocated_size());
        // SAFETY: pos is within the allocation per the trait contract.
        unsafe { self.as_ptr().add(pos) }
    }

    /// Moves `value` into the slot at physical index `pos`.
    ///
    /// # Safety
    ///
    /// The slot must be uninitialized and owned by the calling role.
    #[inline]
    unsafe fn construct(&self, pos: usize, value: Self::Item) {
        ptr::write(self.slot(pos), value);
    }

    /// Drops the element in the slot at physical index `pos`.
    ///
    /// # Safety
    ///
    /// The slot must be initialized and owned by the calling role; it is
    /// uninitialized afterwards.
    #[inline]
    unsafe fn destroy(&self, pos: usize) {
        ptr::drop_in_place(self.slot(pos));
    }
}
