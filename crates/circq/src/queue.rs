//! The owning queue facade.
//!
//! [`CircularQueue`] owns the storage and both cursors. Used directly, it
//! holds both capabilities at once: [`Produce`] and [`Consume`] are
//! implemented on it through `&mut self`. For producer/consumer use across
//! contexts, [`split`](CircularQueue::split) lends out one [`Producer`] and
//! one [`Consumer`]; the facade itself is unusable until both are dropped.

use crate::capacity::Capacity;
use crate::consumer::{out_of_range, Consume, Consumer};
use crate::cursor::{Iter, IterMut};
use crate::error::QueueError;
use crate::lifecycle;
use crate::producer::{Produce, Producer};
use crate::raw::{RawQueue, Sealed};
use crate::storage::{DynamicStorage, StaticStorage, Storage};
use crate::sync::{Role, SyncMode, Unsync};
use std::fmt;
use std::ops::{Index, IndexMut};

/// A single-producer single-consumer circular queue.
///
/// `S` is the storage backend and `M` the synchronization mode. One slot is
/// always kept free, so a queue over `2^k` slots holds `2^k - 1` elements.
///
/// The queue is `Sync` only under [`Threads`](crate::Threads). Under the
/// single-core interrupt modes, sharing it with an interrupt handler is a
/// platform decision the caller makes with `unsafe`.
pub struct CircularQueue<S: Storage, M: SyncMode = Unsync> {
    raw: RawQueue<S, M>,
}

/// A queue over `N` inline slots (`N` a power of two).
pub type StaticQueue<T, const N: usize, M = Unsync> = CircularQueue<StaticStorage<T, N>, M>;

/// A queue over a heap buffer sized at runtime.
pub type DynamicQueue<T, M = Unsync> = CircularQueue<DynamicStorage<T>, M>;

impl<S: Storage, M: SyncMode> CircularQueue<S, M> {
    /// Builds an empty queue over `storage`.
    ///
    /// Anything already constructed in the storage is ignored and never
    /// dropped.
    pub fn from_storage(storage: S) -> Self {
        Self {
            raw: RawQueue::from_storage(storage),
        }
    }

    /// Lends out the producer and consumer halves.
    ///
    /// # Example
    ///
    /// ```
    /// use circq_rs::{Consume, Produce, StaticQueue, Threads};
    ///
    /// let mut queue = StaticQueue::<u64, 64, Threads>::new();
    /// let (mut tx, mut rx) = queue.split();
    /// std::thread::scope(|s| {
    ///     s.spawn(move || {
    ///         for i in 0..1000 {
    ///             while tx.try_push(i).is_err() {
    ///                 std::hint::spin_loop();
    ///             }
    ///         }
    ///     });
    ///     let mut expected = 0;
    ///     while expected < 1000 {
    ///         if let Some(v) = rx.pop() {
    ///             assert_eq!(v, expected);
    ///             expected += 1;
    ///         }
    ///     }
    /// });
    /// ```
    pub fn split(&mut self) -> (Producer<'_, S, M>, Consumer<'_, S, M>) {
        (Producer::new(&self.raw), Consumer::new(&self.raw))
    }

    /// Number of live elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.raw.len(Role::Consumer)
    }

    /// `true` if the queue holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `true` if no element can be appended.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() == self.max_size()
    }

    /// Maximum number of live elements: `allocated_size() - 1`.
    #[inline]
    pub fn max_size(&self) -> usize {
        self.raw.max_size()
    }

    /// Number of physical slots.
    #[inline]
    pub fn allocated_size(&self) -> usize {
        self.raw.storage().allocated_size()
    }

    /// Replaces the contents with clones of `other`'s elements.
    ///
    /// Fails with [`QueueError::CapacityExceeded`] before touching `self`
    /// if `other` does not fit. If a clone panics, `self` is left empty.
    pub fn assign_from<S2, M2>(&mut self, other: &CircularQueue<S2, M2>) -> Result<(), QueueError>
    where
        S2: Storage<Item = S::Item>,
        M2: SyncMode,
        S::Item: Clone,
    {
        let n = other.len();
        if n > self.max_size() {
            return Err(QueueError::overflow(n, self.max_size()));
        }
        self.clear();
        self.extend_exact(other.iter().cloned())
    }

    /// Moves every element of `other` to the back of `self`, leaving
    /// `other` empty. Nothing moves if they do not all fit.
    pub fn append<S2, M2>(&mut self, other: &mut CircularQueue<S2, M2>) -> Result<(), QueueError>
    where
        S2: Storage<Item = S::Item>,
        M2: SyncMode,
    {
        let (src_head, src_tail) = other.raw.exclusive_cursors();
        let n = src_tail.wrapping_sub(src_head);
        let src = other.raw.storage();
        let dst = self.raw.storage();
        // SAFETY: `&mut self` and `&mut other` exclude every role; the source
        // range is live, the destination gap is free, and the storages are
        // distinct objects.
        unsafe {
            self.raw.produce(n, |tail| {
                lifecycle::relocate_n(src, src_head, dst, tail, n);
                n
            })
        }
        .map_err(|available| QueueError::overflow(n, available))?;
        other.raw.forget_all();
        Ok(())
    }
}

// =============================================================================
// STATIC BACKEND
// =============================================================================

impl<T, const N: usize, M: SyncMode> CircularQueue<StaticStorage<T, N>, M> {
    /// Creates an empty queue. Usable in `const` and `static` items.
    pub const fn new() -> Self {
        Self {
            raw: RawQueue::from_storage(StaticStorage::new()),
        }
    }

    /// Builds a queue from every element of `values`.
    pub fn try_from_iter<I>(values: I) -> Result<Self, QueueError>
    where
        I: IntoIterator<Item = T>,
    {
        let mut queue = Self::new();
        for value in values {
            queue.push(value)?;
        }
        Ok(queue)
    }

    /// Builds a queue from clones of `values`.
    pub fn from_slice(values: &[T]) -> Result<Self, QueueError>
    where
        T: Clone,
    {
        let mut queue = Self::new();
        queue.extend_from_slice(values)?;
        Ok(queue)
    }

    /// Builds a queue from clones of another queue's elements, of any
    /// backend, capacity or mode.
    pub fn try_from_queue<S2, M2>(other: &CircularQueue<S2, M2>) -> Result<Self, QueueError>
    where
        S2: Storage<Item = T>,
        M2: SyncMode,
        T: Clone,
    {
        let mut queue = Self::new();
        queue.assign_from(other)?;
        Ok(queue)
    }
}

impl<T, const N: usize, M: SyncMode> Default for CircularQueue<StaticStorage<T, N>, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone, const N: usize, M: SyncMode> Clone for CircularQueue<StaticStorage<T, N>, M> {
    fn clone(&self) -> Self {
        let mut queue = Self::new();
        let cloned = queue.try_extend_exact(self.iter().cloned());
        debug_assert!(cloned, "same capacity always fits");
        queue
    }
}

// =============================================================================
// DYNAMIC BACKEND
// =============================================================================

impl<T, M: SyncMode> CircularQueue<DynamicStorage<T>, M> {
    /// Creates an empty queue over at least `slots` slots.
    ///
    /// The slot count is rounded up to a power of two (minimum 2); the queue
    /// then holds one element less than that.
    ///
    /// # Panics
    ///
    /// Panics on capacity overflow; aborts if the allocator fails.
    pub fn with_capacity(slots: usize) -> Self {
        Self::from_storage(DynamicStorage::with_capacity(slots))
    }

    /// Fallible counterpart of [`with_capacity`](Self::with_capacity).
    pub fn try_with_capacity(slots: usize) -> Result<Self, QueueError> {
        Ok(Self::from_storage(DynamicStorage::try_with_capacity(slots)?))
    }

    /// Creates an empty queue over exactly `capacity.get()` slots.
    pub fn from_capacity(capacity: Capacity) -> Self {
        Self::from_storage(DynamicStorage::from_capacity(capacity))
    }

    /// Current slot count.
    #[inline]
    pub fn capacity(&self) -> Capacity {
        self.raw.storage().capacity()
    }

    /// Builds a queue with the same slot count as `other`, holding clones
    /// of its elements. Fails only if allocation fails.
    pub fn try_from_queue<S2, M2>(other: &CircularQueue<S2, M2>) -> Result<Self, QueueError>
    where
        S2: Storage<Item = T>,
        M2: SyncMode,
        T: Clone,
    {
        let mut queue = Self::try_with_capacity(other.allocated_size())?;
        queue.extend_exact(other.iter().cloned())?;
        Ok(queue)
    }

    /// Moves the elements into a new buffer of at least `slots` slots.
    ///
    /// Fails with [`QueueError::CapacityExceeded`] if the new buffer could
    /// not hold the current elements, or with [`QueueError::Alloc`] if the
    /// allocation fails; in both cases the queue is unchanged.
    pub fn resize(&mut self, slots: usize) -> Result<(), QueueError> {
        let (head, tail) = self.raw.exclusive_cursors();
        let len = tail.wrapping_sub(head);
        if let Some(capacity) = Capacity::at_least(slots) {
            if capacity.usable() < len {
                return Err(QueueError::overflow(len, capacity.usable()));
            }
        }
        let storage = DynamicStorage::try_with_capacity(slots)?;
        // SAFETY: `&mut self` excludes both roles, `[head, tail)` is live and
        // the new storage is empty with room for `len` elements.
        unsafe { lifecycle::relocate_n(self.raw.storage(), head, &storage, 0, len) };
        drop(self.raw.replace_storage(storage, len));
        Ok(())
    }
}

impl<T: Clone, M: SyncMode> Clone for CircularQueue<DynamicStorage<T>, M> {
    fn clone(&self) -> Self {
        let mut queue = Self::from_capacity(self.capacity());
        let cloned = queue.try_extend_exact(self.iter().cloned());
        debug_assert!(cloned, "same capacity always fits");
        queue
    }
}

impl<T, M: SyncMode> FromIterator<T> for CircularQueue<DynamicStorage<T>, M> {
    /// Collects into a queue just large enough for every element.
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let values: Vec<T> = iter.into_iter().collect();
        let mut queue = Self::with_capacity(values.len() + 1);
        let moved = queue.try_extend_exact(values);
        debug_assert!(moved, "sized to fit");
        queue
    }
}

// =============================================================================
// CAPABILITIES AND STD TRAITS
// =============================================================================

impl<S: Storage, M: SyncMode> Sealed for CircularQueue<S, M> {}

impl<S: Storage, M: SyncMode> Produce for CircularQueue<S, M> {
    type Item = S::Item;
    type Storage = S;
    type Mode = M;

    #[inline]
    fn raw(&self) -> &RawQueue<S, M> {
        &self.raw
    }
}

impl<S: Storage, M: SyncMode> Consume for CircularQueue<S, M> {
    type Item = S::Item;
    type Storage = S;
    type Mode = M;

    #[inline]
    fn raw(&self) -> &RawQueue<S, M> {
        &self.raw
    }
}

impl<S: Storage, M: SyncMode> Index<usize> for CircularQueue<S, M> {
    type Output = S::Item;

    #[track_caller]
    fn index(&self, index: usize) -> &S::Item {
        match self.get(index) {
            Some(value) => value,
            None => out_of_range(index, self.len()),
        }
    }
}

impl<S: Storage, M: SyncMode> IndexMut<usize> for CircularQueue<S, M> {
    #[track_caller]
    fn index_mut(&mut self, index: usize) -> &mut S::Item {
        let len = self.len();
        match self.get_mut(index) {
            Some(value) => value,
            None => out_of_range(index, len),
        }
    }
}

impl<'a, S: Storage, M: SyncMode> IntoIterator for &'a CircularQueue<S, M> {
    type Item = &'a S::Item;
    type IntoIter = Iter<'a, S, M>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, S: Storage, M: SyncMode> IntoIterator for &'a mut CircularQueue<S, M> {
    type Item = &'a mut S::Item;
    type IntoIter = IterMut<'a, S, M>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<S, M> fmt::Debug for CircularQueue<S, M>
where
    S: Storage,
    S::Item: fmt::Debug,
    M: SyncMode,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<S, M, S2, M2> PartialEq<CircularQueue<S2, M2>> for CircularQueue<S, M>
where
    S: Storage,
    S2: Storage,
    S::Item: PartialEq<S2::Item>,
    M: SyncMode,
    M2: SyncMode,
{
    fn eq(&self, other: &CircularQueue<S2, M2>) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<S, M> Eq for CircularQueue<S, M>
where
    S: Storage,
    S::Item: Eq,
    M: SyncMode,
{
}
