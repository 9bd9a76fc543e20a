//! Positions inside a queue and iterators over its live range.
//!
//! A [`Cursor`] is a logical position plus a shared borrow of the queue it
//! came from. Positions are unbounded sequence numbers, so arithmetic never
//! needs to care about where the storage wraps; only [`Cursor::position`]
//! maps back to a physical slot. Because a cursor borrows its queue, the
//! borrow checker rejects any pop, clear or resize while it is alive.
//! To name a position across such a call, detach it with [`Cursor::mark`].
//!
//! Cursors are handed out by the consumer side only (the facade or a
//! [`Consumer`](crate::Consumer)), and every checked read looks at the
//! cursors from the consumer's perspective.

use crate::raw::RawQueue;
use crate::storage::Storage;
use crate::sync::{Role, SyncMode};
use std::cmp::Ordering as CmpOrdering;
use std::fmt;
use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::sync::atomic::{AtomicUsize, Ordering};

/// A random-access position in a queue.
pub struct Cursor<'a, S: Storage, M: SyncMode> {
    raw: &'a RawQueue<S, M>,
    pos: usize,
}

/// A cursor position detached from its queue borrow.
///
/// Obtained from [`Cursor::mark`] and consumed by
/// [`Consume::pop_front_to`](crate::Consume::pop_front_to). A mark is a bare
/// logical position: it stays valid when the queue is moved, and using it
/// on a queue it did not come from is a logic error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark {
    pub(crate) cursor: usize,
}

impl<'a, S: Storage, M: SyncMode> Cursor<'a, S, M> {
    #[inline]
    pub(crate) fn new(raw: &'a RawQueue<S, M>, pos: usize) -> Self {
        Self { raw, pos }
    }

    /// Physical slot this cursor points at.
    #[inline]
    pub fn position(&self) -> usize {
        self.raw.storage().wrap(self.pos)
    }

    /// The unbounded logical position.
    #[inline]
    pub fn logical(&self) -> usize {
        self.pos
    }

    /// Distance from the queue's current head.
    #[inline]
    pub fn index(&self) -> usize {
        self.pos.wrapping_sub(self.raw.head(Role::Consumer))
    }

    /// Cursor moved by `delta` positions in either direction.
    #[inline]
    #[must_use]
    pub fn offset(self, delta: isize) -> Self {
        Self::new(self.raw, self.pos.wrapping_add_signed(delta))
    }

    /// The following position.
    #[inline]
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn next(self) -> Self {
        self.offset(1)
    }

    /// The preceding position.
    #[inline]
    #[must_use]
    pub fn prev(self) -> Self {
        self.offset(-1)
    }

    /// Forward distance from `self` to `other`.
    #[inline]
    pub fn distance_to(&self, other: &Self) -> usize {
        other.pos.wrapping_sub(self.pos)
    }

    /// Forward distance from `other` to `self`.
    #[inline]
    pub fn distance_from(&self, other: &Self) -> usize {
        self.pos.wrapping_sub(other.pos)
    }

    /// The element at this position, or `None` outside `[head, tail)`.
    #[inline]
    pub fn get(&self) -> Option<&'a S::Item> {
        // SAFETY: the slot is inside the live range and the queue borrow
        // keeps it there for `'a`.
        self.raw
            .live_slot(Role::Consumer, self.index())
            .map(|slot| unsafe { &*slot })
    }

    /// The element at this position without a range check.
    ///
    /// # Safety
    ///
    /// The position must lie in the live range.
    #[inline]
    pub unsafe fn get_unchecked(&self) -> &'a S::Item {
        &*self.raw.slot_at(self.pos)
    }

    /// Detaches the position from the queue borrow.
    #[inline]
    pub fn mark(&self) -> Mark {
        Mark { cursor: self.pos }
    }

    #[inline]
    fn same_queue(&self, other: &Self) -> bool {
        std::ptr::eq(self.raw, other.raw)
    }
}

impl<S: Storage, M: SyncMode> Clone for Cursor<'_, S, M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: Storage, M: SyncMode> Copy for Cursor<'_, S, M> {}

impl<S: Storage, M: SyncMode> fmt::Debug for Cursor<'_, S, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("logical", &self.pos)
            .field("position", &self.position())
            .finish()
    }
}

/// Compares logical positions, so two cursors a full lap apart differ even
/// though they address the same slot.
impl<S: Storage, M: SyncMode> PartialEq for Cursor<'_, S, M> {
    fn eq(&self, other: &Self) -> bool {
        self.same_queue(other) && self.pos == other.pos
    }
}

impl<S: Storage, M: SyncMode> PartialOrd for Cursor<'_, S, M> {
    /// Cursors of different queues are unordered.
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        if self.same_queue(other) {
            Some((*self - *other).cmp(&0))
        } else {
            None
        }
    }
}

impl<S: Storage, M: SyncMode> Sub for Cursor<'_, S, M> {
    type Output = isize;

    /// Signed distance between logical positions; zero exactly when the
    /// cursors are equal.
    fn sub(self, other: Self) -> isize {
        debug_assert!(self.same_queue(&other), "cursors of different queues");
        self.pos.wrapping_sub(other.pos) as isize
    }
}

impl<S: Storage, M: SyncMode> Add<isize> for Cursor<'_, S, M> {
    type Output = Self;

    fn add(self, delta: isize) -> Self {
        self.offset(delta)
    }
}

impl<S: Storage, M: SyncMode> Sub<isize> for Cursor<'_, S, M> {
    type Output = Self;

    fn sub(self, delta: isize) -> Self {
        self.offset(delta.wrapping_neg())
    }
}

impl<S: Storage, M: SyncMode> AddAssign<isize> for Cursor<'_, S, M> {
    fn add_assign(&mut self, delta: isize) {
        *self = self.offset(delta);
    }
}

impl<S: Storage, M: SyncMode> SubAssign<isize> for Cursor<'_, S, M> {
    fn sub_assign(&mut self, delta: isize) {
        *self = self.offset(delta.wrapping_neg());
    }
}

/// The earlier of two cursors of the same queue.
pub fn min<'a, S: Storage, M: SyncMode>(a: Cursor<'a, S, M>, b: Cursor<'a, S, M>) -> Cursor<'a, S, M> {
    if b - a < 0 {
        b
    } else {
        a
    }
}

/// The later of two cursors of the same queue.
pub fn max<'a, S: Storage, M: SyncMode>(a: Cursor<'a, S, M>, b: Cursor<'a, S, M>) -> Cursor<'a, S, M> {
    if b - a > 0 {
        b
    } else {
        a
    }
}

/// Advances `cursor` by `delta`, clamped to `[lo, hi]`.
pub fn clamp_add<'a, S: Storage, M: SyncMode>(
    cursor: Cursor<'a, S, M>,
    delta: isize,
    lo: Cursor<'a, S, M>,
    hi: Cursor<'a, S, M>,
) -> Cursor<'a, S, M> {
    let moved = cursor.offset(delta);
    if delta >= 0 {
        min(moved, hi)
    } else {
        max(moved, lo)
    }
}

// =============================================================================
// ATOMIC CURSOR
// =============================================================================

/// A cursor whose position can be shared and updated across threads.
///
/// Loads are `Acquire`, stores `Release`, read-modify-writes `AcqRel`.
pub struct AtomicCursor<'a, S: Storage, M: SyncMode> {
    raw: &'a RawQueue<S, M>,
    pos: AtomicUsize,
}

impl<'a, S: Storage, M: SyncMode> AtomicCursor<'a, S, M> {
    /// Wraps the position of `cursor`.
    pub fn new(cursor: Cursor<'a, S, M>) -> Self {
        Self {
            raw: cursor.raw,
            pos: AtomicUsize::new(cursor.pos),
        }
    }

    /// Current position.
    #[inline]
    pub fn load(&self) -> Cursor<'a, S, M> {
        Cursor::new(self.raw, self.pos.load(Ordering::Acquire))
    }

    /// Alias of [`load`](Self::load).
    #[inline]
    pub fn snapshot(&self) -> Cursor<'a, S, M> {
        self.load()
    }

    /// Replaces the position.
    #[inline]
    pub fn store(&self, cursor: Cursor<'a, S, M>) {
        debug_assert!(std::ptr::eq(self.raw, cursor.raw));
        self.pos.store(cursor.pos, Ordering::Release);
    }

    /// Advances by `n`, returning the previous position.
    #[inline]
    pub fn fetch_add(&self, n: usize) -> Cursor<'a, S, M> {
        Cursor::new(self.raw, self.pos.fetch_add(n, Ordering::AcqRel))
    }

    /// Moves back by `n`, returning the previous position.
    #[inline]
    pub fn fetch_sub(&self, n: usize) -> Cursor<'a, S, M> {
        Cursor::new(self.raw, self.pos.fetch_sub(n, Ordering::AcqRel))
    }

    /// Consumes the atomic, returning a plain cursor.
    pub fn into_inner(self) -> Cursor<'a, S, M> {
        Cursor::new(self.raw, self.pos.into_inner())
    }
}

impl<'a, S: Storage, M: SyncMode> From<Cursor<'a, S, M>> for AtomicCursor<'a, S, M> {
    fn from(cursor: Cursor<'a, S, M>) -> Self {
        Self::new(cursor)
    }
}

impl<S: Storage, M: SyncMode> fmt::Debug for AtomicCursor<'_, S, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AtomicCursor")
            .field(&self.pos.load(Ordering::Relaxed))
            .finish()
    }
}

// =============================================================================
// ITERATORS
// =============================================================================

/// Iterator over shared references to the live elements, front to back.
pub struct Iter<'a, S: Storage, M: SyncMode> {
    raw: &'a RawQueue<S, M>,
    front: usize,
    back: usize,
}

impl<'a, S: Storage, M: SyncMode> Iter<'a, S, M> {
    /// Iterates the consumer's current view of `[head, tail)`.
    pub(crate) fn new(raw: &'a RawQueue<S, M>) -> Self {
        let (front, back) = raw.cursors(Role::Consumer);
        Self { raw, front, back }
    }

    /// Cursor at the next element [`next`](Iterator::next) would yield.
    pub fn cursor(&self) -> Cursor<'a, S, M> {
        Cursor::new(self.raw, self.front)
    }
}

impl<S: Storage, M: SyncMode> Clone for Iter<'_, S, M> {
    fn clone(&self) -> Self {
        Self {
            raw: self.raw,
            front: self.front,
            back: self.back,
        }
    }
}

impl<'a, S: Storage, M: SyncMode> Iterator for Iter<'a, S, M> {
    type Item = &'a S::Item;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }
        let slot = self.raw.slot_at(self.front);
        self.front = self.front.wrapping_add(1);
        // SAFETY: `[front, back)` was live when the iterator was created and
        // the queue borrow keeps it live.
        Some(unsafe { &*slot })
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.back.wrapping_sub(self.front);
        (len, Some(len))
    }

    #[inline]
    fn nth(&mut self, n: usize) -> Option<Self::Item> {
        if n >= self.len() {
            self.front = self.back;
            return None;
        }
        self.front = self.front.wrapping_add(n);
        self.next()
    }
}

impl<S: Storage, M: SyncMode> DoubleEndedIterator for Iter<'_, S, M> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }
        self.back = self.back.wrapping_sub(1);
        // SAFETY: as in `next`.
        Some(unsafe { &*self.raw.slot_at(self.back) })
    }
}

impl<S: Storage, M: SyncMode> ExactSizeIterator for Iter<'_, S, M> {}

impl<S: Storage, M: SyncMode> FusedIterator for Iter<'_, S, M> {}

impl<S, M> fmt::Debug for Iter<'_, S, M>
where
    S: Storage,
    S::Item: fmt::Debug,
    M: SyncMode,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

/// Iterator over mutable references to the live elements, front to back.
pub struct IterMut<'a, S: Storage, M: SyncMode> {
    raw: &'a RawQueue<S, M>,
    front: usize,
    back: usize,
    _marker: PhantomData<&'a mut S::Item>,
}

impl<'a, S: Storage, M: SyncMode> IterMut<'a, S, M> {
    /// The caller must hold exclusive access to the live range for `'a`.
    pub(crate) fn new(raw: &'a RawQueue<S, M>) -> Self {
        let (front, back) = raw.cursors(Role::Consumer);
        Self {
            raw,
            front,
            back,
            _marker: PhantomData,
        }
    }
}

impl<'a, S: Storage, M: SyncMode> Iterator for IterMut<'a, S, M> {
    type Item = &'a mut S::Item;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }
        let slot = self.raw.slot_at(self.front);
        self.front = self.front.wrapping_add(1);
        // SAFETY: each live slot is yielded at most once and the caller holds
        // exclusive access to the live range.
        Some(unsafe { &mut *slot })
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.back.wrapping_sub(self.front);
        (len, Some(len))
    }

    #[inline]
    fn nth(&mut self, n: usize) -> Option<Self::Item> {
        if n >= self.len() {
            self.front = self.back;
            return None;
        }
        self.front = self.front.wrapping_add(n);
        self.next()
    }
}

impl<S: Storage, M: SyncMode> DoubleEndedIterator for IterMut<'_, S, M> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }
        self.back = self.back.wrapping_sub(1);
        // SAFETY: as in `next`.
        Some(unsafe { &mut *self.raw.slot_at(self.back) })
    }
}

impl<S: Storage, M: SyncMode> ExactSizeIterator for IterMut<'_, S, M> {}

impl<S: Storage, M: SyncMode> FusedIterator for IterMut<'_, S, M> {}

impl<S: Storage, M: SyncMode> fmt::Debug for IterMut<'_, S, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IterMut")
            .field("remaining", &self.back.wrapping_sub(self.front))
            .finish()
    }
}
