//! The consumer capability: element access and removal at `head`.
//!
//! [`Consume`] is implemented by the queue facade and by the [`Consumer`]
//! handle. Reads take `&self` and removals take `&mut self`, so a reference,
//! iterator or [`Cursor`] obtained from the consumer cannot outlive the next
//! pop.

use crate::cursor::{AtomicCursor, Cursor, Iter, IterMut, Mark};
use crate::error::QueueError;
use crate::lifecycle;
use crate::raw::{RawQueue, Sealed};
use crate::storage::Storage;
use crate::sync::{Role, SyncMode, ThreadSafe};
use std::fmt;
use std::ops::{Index, IndexMut};

#[cold]
#[track_caller]
pub(crate) fn out_of_range(index: usize, len: usize) -> ! {
    panic!("index out of range: the len is {len} but the index is {index}")
}

/// Consumer-side operations of a circular queue.
///
/// Sealed: implemented by [`CircularQueue`](crate::CircularQueue) and
/// [`Consumer`].
pub trait Consume: Sealed {
    /// Element type.
    type Item;
    /// Storage backend.
    type Storage: Storage<Item = Self::Item>;
    /// Synchronization mode.
    type Mode: SyncMode;

    #[doc(hidden)]
    fn raw(&self) -> &RawQueue<Self::Storage, Self::Mode>;

    /// Number of elements as seen by the consumer. May be stale low under
    /// concurrent production, never high.
    #[inline]
    fn size_for_read(&self) -> usize {
        self.raw().len(Role::Consumer)
    }

    /// Maximum number of elements the queue holds.
    #[inline]
    fn max_size(&self) -> usize {
        self.raw().max_size()
    }

    /// `true` if the consumer sees no elements.
    #[inline]
    fn is_empty(&self) -> bool {
        self.size_for_read() == 0
    }

    // ---------------------------------------------------------------------
    // ELEMENT ACCESS
    // ---------------------------------------------------------------------

    /// The `index`-th element from the front.
    #[inline]
    fn get(&self, index: usize) -> Option<&Self::Item> {
        // SAFETY: the slot is live and stays live until `&mut self` pops it.
        self.raw()
            .live_slot(Role::Consumer, index)
            .map(|slot| unsafe { &*slot })
    }

    /// Like [`get`](Self::get), reporting the live length on failure.
    fn at(&self, index: usize) -> Result<&Self::Item, QueueError> {
        self.get(index).ok_or_else(|| QueueError::OutOfRange {
            index,
            len: self.size_for_read(),
        })
    }

    /// The `index`-th element without a range check.
    ///
    /// # Safety
    ///
    /// `index` must be below [`size_for_read`](Self::size_for_read).
    #[inline]
    unsafe fn get_unchecked(&self, index: usize) -> &Self::Item {
        let raw = self.raw();
        &*raw.slot_at(raw.head(Role::Consumer).wrapping_add(index))
    }

    /// The oldest element.
    #[inline]
    fn front(&self) -> Option<&Self::Item> {
        self.get(0)
    }

    /// The newest element the consumer can see.
    fn back(&self) -> Option<&Self::Item> {
        let (head, tail) = self.raw().cursors(Role::Consumer);
        // SAFETY: `tail - 1` is live whenever the range is non-empty.
        (head != tail).then(|| unsafe { &*self.raw().slot_at(tail.wrapping_sub(1)) })
    }

    /// Mutable counterpart of [`get`](Self::get).
    #[inline]
    fn get_mut(&mut self, index: usize) -> Option<&mut Self::Item> {
        // SAFETY: live slot, and `&mut self` excludes every other reference
        // handed out by the consumer.
        self.raw()
            .live_slot(Role::Consumer, index)
            .map(|slot| unsafe { &mut *slot })
    }

    /// Mutable counterpart of [`at`](Self::at).
    fn at_mut(&mut self, index: usize) -> Result<&mut Self::Item, QueueError> {
        let len = self.size_for_read();
        self.get_mut(index)
            .ok_or(QueueError::OutOfRange { index, len })
    }

    /// Mutable counterpart of [`front`](Self::front).
    #[inline]
    fn front_mut(&mut self) -> Option<&mut Self::Item> {
        self.get_mut(0)
    }

    /// Mutable counterpart of [`back`](Self::back).
    fn back_mut(&mut self) -> Option<&mut Self::Item> {
        let (head, tail) = self.raw().cursors(Role::Consumer);
        // SAFETY: as in `back`, with exclusive access through `&mut self`.
        (head != tail).then(|| unsafe { &mut *self.raw().slot_at(tail.wrapping_sub(1)) })
    }

    /// Iterates the live elements front to back.
    #[inline]
    fn iter(&self) -> Iter<'_, Self::Storage, Self::Mode> {
        Iter::new(self.raw())
    }

    /// Iterates the live elements front to back, mutably.
    #[inline]
    fn iter_mut(&mut self) -> IterMut<'_, Self::Storage, Self::Mode> {
        IterMut::new(self.raw())
    }

    /// Cursor at the front element.
    #[inline]
    fn begin(&self) -> Cursor<'_, Self::Storage, Self::Mode> {
        let raw = self.raw();
        Cursor::new(raw, raw.head(Role::Consumer))
    }

    /// Cursor one past the newest element.
    #[inline]
    fn end(&self) -> Cursor<'_, Self::Storage, Self::Mode> {
        let raw = self.raw();
        Cursor::new(raw, raw.tail(Role::Consumer))
    }

    /// Shareable cursor starting at the front element.
    fn atomic_begin(&self) -> AtomicCursor<'_, Self::Storage, Self::Mode> {
        AtomicCursor::new(self.begin())
    }

    /// Shareable cursor starting one past the newest element.
    fn atomic_end(&self) -> AtomicCursor<'_, Self::Storage, Self::Mode> {
        AtomicCursor::new(self.end())
    }

    /// The live range as two contiguous slices, front part first.
    fn as_slices(&self) -> (&[Self::Item], &[Self::Item]) {
        let raw = self.raw();
        let (head, tail) = raw.cursors(Role::Consumer);
        // SAFETY: `[head, tail)` is live for the borrow of `self`.
        unsafe { lifecycle::as_slices(raw.storage(), head, tail.wrapping_sub(head)) }
    }

    /// Mutable counterpart of [`as_slices`](Self::as_slices).
    fn as_mut_slices(&mut self) -> (&mut [Self::Item], &mut [Self::Item]) {
        let raw = self.raw();
        let (head, tail) = raw.cursors(Role::Consumer);
        // SAFETY: as above, and `&mut self` makes the borrow exclusive.
        unsafe { lifecycle::as_mut_slices(raw.storage(), head, tail.wrapping_sub(head)) }
    }

    // ---------------------------------------------------------------------
    // REMOVAL
    // ---------------------------------------------------------------------

    /// Moves the front element out.
    #[inline]
    fn pop(&mut self) -> Option<Self::Item> {
        // SAFETY: `&mut self` is the only consumer-role access.
        unsafe { self.raw().take_front() }
    }

    /// Drops the front element, if any.
    #[inline]
    fn pop_front(&mut self) {
        self.pop_front_n(1);
    }

    /// Drops the `n` front elements.
    ///
    /// Popping more than [`size_for_read`](Self::size_for_read) elements is
    /// a logic error: it panics in debug builds and pops everything visible
    /// in release builds.
    #[inline]
    fn pop_front_n(&mut self, n: usize) {
        // SAFETY: `&mut self` is the only consumer-role access.
        unsafe { self.raw().pop_front(n) }
    }

    /// Drops the `n` front elements without checking the element count.
    ///
    /// # Safety
    ///
    /// `n` must not exceed [`size_for_read`](Self::size_for_read).
    #[inline]
    unsafe fn pop_front_n_unchecked(&mut self, n: usize) {
        self.raw().pop_front_unchecked(n);
    }

    /// Drops every element before `mark`.
    ///
    /// A mark past the consumer's view of the back is treated like an
    /// over-pop by [`pop_front_n`](Self::pop_front_n).
    fn pop_front_to(&mut self, mark: Mark) {
        let n = mark.cursor.wrapping_sub(self.raw().head(Role::Consumer));
        self.pop_front_n(n);
    }

    /// Drops every element the consumer can see.
    fn clear(&mut self) {
        let n = self.size_for_read();
        self.pop_front_n(n);
    }
}

/// The consumer half of a split queue.
///
/// `Send` only under a [`ThreadSafe`] mode.
pub struct Consumer<'a, S: Storage, M: SyncMode> {
    raw: &'a RawQueue<S, M>,
}

// SAFETY: under a thread-safe mode the consumer's tail load is Acquire and
// its head store Release; elements received from the producer thread are
// only required to be Send.
unsafe impl<S, M> Send for Consumer<'_, S, M>
where
    S: Storage + Send,
    S::Item: Send,
    M: ThreadSafe,
{
}

impl<'a, S: Storage, M: SyncMode> Consumer<'a, S, M> {
    pub(crate) fn new(raw: &'a RawQueue<S, M>) -> Self {
        Self { raw }
    }
}

impl<S: Storage, M: SyncMode> Sealed for Consumer<'_, S, M> {}

impl<S: Storage, M: SyncMode> Consume for Consumer<'_, S, M> {
    type Item = S::Item;
    type Storage = S;
    type Mode = M;

    #[inline]
    fn raw(&self) -> &RawQueue<S, M> {
        self.raw
    }
}

impl<S: Storage, M: SyncMode> Index<usize> for Consumer<'_, S, M> {
    type Output = S::Item;

    #[track_caller]
    fn index(&self, index: usize) -> &S::Item {
        match self.get(index) {
            Some(value) => value,
            None => out_of_range(index, self.size_for_read()),
        }
    }
}

impl<S: Storage, M: SyncMode> IndexMut<usize> for Consumer<'_, S, M> {
    #[track_caller]
    fn index_mut(&mut self, index: usize) -> &mut S::Item {
        let len = self.size_for_read();
        match self.get_mut(index) {
            Some(value) => value,
            None => out_of_range(index, len),
        }
    }
}

impl<S, M> fmt::Debug for Consumer<'_, S, M>
where
    S: Storage,
    S::Item: fmt::Debug,
    M: SyncMode,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer").field("elements", &self.iter()).finish()
    }
}
