//! The producer capability: everything that appends at `tail`.
//!
//! [`Produce`] is implemented by the queue facade (through `&mut self`) and
//! by the [`Producer`] handle returned from
//! [`CircularQueue::split`](crate::CircularQueue::split). Every append
//! follows the same shape: check free space, construct into the unpublished
//! gap, publish the new tail. When there is not enough room nothing is
//! constructed and nothing is published.
//!
//! Each operation comes in two forms. The `try_` form reports a full queue
//! as `false` (or hands the value back); the plain form returns
//! [`QueueError::CapacityExceeded`].

use crate::error::QueueError;
use crate::lifecycle;
use crate::raw::{RawQueue, Sealed};
use crate::storage::Storage;
use crate::sync::{Role, SyncMode, ThreadSafe};
use std::fmt;

/// Appends `n` elements built by `build(storage, tail)`.
fn append<P, F>(producer: &mut P, n: usize, build: F) -> Result<(), QueueError>
where
    P: Produce + ?Sized,
    F: FnOnce(&P::Storage, usize) -> usize,
{
    let raw = producer.raw();
    // SAFETY: `&mut P` is the only producer-role access to this queue.
    unsafe { raw.produce(n, |tail| build(raw.storage(), tail)) }
        .map_err(|available| QueueError::overflow(n, available))
}

/// Producer-side operations of a circular queue.
///
/// Sealed: implemented by [`CircularQueue`](crate::CircularQueue) and
/// [`Producer`].
pub trait Produce: Sealed {
    /// Element type.
    type Item;
    /// Storage backend.
    type Storage: Storage<Item = Self::Item>;
    /// Synchronization mode.
    type Mode: SyncMode;

    #[doc(hidden)]
    fn raw(&self) -> &RawQueue<Self::Storage, Self::Mode>;

    /// Number of elements as seen by the producer. May be stale high under
    /// concurrent consumption, never low.
    #[inline]
    fn size_for_write(&self) -> usize {
        self.raw().len(Role::Producer)
    }

    /// Maximum number of elements the queue holds.
    #[inline]
    fn max_size(&self) -> usize {
        self.raw().max_size()
    }

    /// Slots the producer may fill right now.
    #[inline]
    fn free_space(&self) -> usize {
        self.raw().free()
    }

    /// `true` if no element can be appended right now.
    #[inline]
    fn is_full(&self) -> bool {
        self.free_space() == 0
    }

    /// Appends `value`, handing it back if the queue is full.
    fn try_push(&mut self, value: Self::Item) -> Result<(), Self::Item> {
        let mut value = Some(value);
        let published = append(self, 1, |storage, tail| {
            // SAFETY: the slot at tail is free and owned by the producer.
            unsafe { lifecycle::construct_n(storage, tail, 1, || value.take()) }
        });
        match value {
            Some(value) => Err(value),
            None => {
                debug_assert!(published.is_ok());
                Ok(())
            }
        }
    }

    /// Appends `value`; on a full queue the value is dropped.
    fn push(&mut self, value: Self::Item) -> Result<(), QueueError> {
        let mut value = Some(value);
        append(self, 1, |storage, tail| {
            // SAFETY: the slot at tail is free and owned by the producer.
            unsafe { lifecycle::construct_n(storage, tail, 1, || value.take()) }
        })
    }

    /// Constructs one element in place with `make`.
    ///
    /// `make` is not called when the queue is full. If it panics, nothing
    /// is published.
    fn try_emplace<F>(&mut self, make: F) -> bool
    where
        F: FnOnce() -> Self::Item,
    {
        self.emplace(make).is_ok()
    }

    /// Failing form of [`try_emplace`](Self::try_emplace).
    fn emplace<F>(&mut self, make: F) -> Result<(), QueueError>
    where
        F: FnOnce() -> Self::Item,
    {
        let mut make = Some(make);
        append(self, 1, |storage, tail| {
            // SAFETY: the slot at tail is free and owned by the producer.
            unsafe { lifecycle::construct_n(storage, tail, 1, || make.take().map(|f| f())) }
        })
    }

    /// Clones every element of `values`, all or nothing.
    fn try_extend_from_slice(&mut self, values: &[Self::Item]) -> bool
    where
        Self::Item: Clone,
    {
        self.extend_from_slice(values).is_ok()
    }

    /// Failing form of [`try_extend_from_slice`](Self::try_extend_from_slice).
    ///
    /// If the k-th clone panics, the k clones already made are dropped and
    /// the queue is unchanged.
    fn extend_from_slice(&mut self, values: &[Self::Item]) -> Result<(), QueueError>
    where
        Self::Item: Clone,
    {
        append(self, values.len(), |storage, tail| {
            // SAFETY: `values.len()` slots from tail are free.
            unsafe { lifecycle::clone_n(storage, tail, values) };
            values.len()
        })
    }

    /// Bitwise-copies `values`, all or nothing. At most two `memcpy`s.
    fn try_copy_from_slice(&mut self, values: &[Self::Item]) -> bool
    where
        Self::Item: Copy,
    {
        self.copy_from_slice(values).is_ok()
    }

    /// Failing form of [`try_copy_from_slice`](Self::try_copy_from_slice).
    fn copy_from_slice(&mut self, values: &[Self::Item]) -> Result<(), QueueError>
    where
        Self::Item: Copy,
    {
        append(self, values.len(), |storage, tail| {
            // SAFETY: `values.len()` slots from tail are free.
            unsafe { lifecycle::copy_n(storage, tail, values) };
            values.len()
        })
    }

    /// Moves every element of an exact-size iterator in, all or nothing.
    ///
    /// The reported length is used for the space check. An iterator that
    /// ends early has the elements it did yield dropped, and nothing is
    /// published.
    fn try_extend_exact<I>(&mut self, values: I) -> bool
    where
        I: IntoIterator<Item = Self::Item>,
        I::IntoIter: ExactSizeIterator,
    {
        self.extend_exact(values).is_ok()
    }

    /// Failing form of [`try_extend_exact`](Self::try_extend_exact).
    ///
    /// Fails with [`QueueError::LengthMismatch`] if the iterator yields fewer
    /// elements than it reported.
    fn extend_exact<I>(&mut self, values: I) -> Result<(), QueueError>
    where
        I: IntoIterator<Item = Self::Item>,
        I::IntoIter: ExactSizeIterator,
    {
        let mut values = values.into_iter();
        let n = values.len();
        let mut yielded = n;
        append(self, n, |storage, tail| {
            // SAFETY: `n` slots from tail are free; a short batch is
            // destroyed before anything is published.
            unsafe {
                let built = lifecycle::construct_n(storage, tail, n, || values.next());
                if built < n {
                    lifecycle::destroy_n(storage, tail, built);
                    yielded = built;
                    return 0;
                }
            }
            n
        })?;
        if yielded < n {
            return Err(QueueError::LengthMismatch {
                expected: n,
                yielded,
            });
        }
        Ok(())
    }

    /// Appends `n` clones of `value`, all or nothing.
    fn try_extend_with(&mut self, n: usize, value: &Self::Item) -> bool
    where
        Self::Item: Clone,
    {
        self.extend_with(n, value).is_ok()
    }

    /// Failing form of [`try_extend_with`](Self::try_extend_with).
    fn extend_with(&mut self, n: usize, value: &Self::Item) -> Result<(), QueueError>
    where
        Self::Item: Clone,
    {
        append(self, n, |storage, tail| {
            // SAFETY: `n` slots from tail are free.
            unsafe { lifecycle::fill_n(storage, tail, n, value) };
            n
        })
    }

    /// Appends `n` default values, all or nothing.
    fn try_extend_default(&mut self, n: usize) -> bool
    where
        Self::Item: Default,
    {
        self.extend_default(n).is_ok()
    }

    /// Failing form of [`try_extend_default`](Self::try_extend_default).
    fn extend_default(&mut self, n: usize) -> Result<(), QueueError>
    where
        Self::Item: Default,
    {
        append(self, n, |storage, tail| {
            // SAFETY: `n` slots from tail are free.
            unsafe { lifecycle::default_n(storage, tail, n) };
            n
        })
    }

    /// Fills every free slot with clones of `value`; returns how many.
    fn fill(&mut self, value: &Self::Item) -> usize
    where
        Self::Item: Clone,
    {
        let n = self.free_space();
        if self.try_extend_with(n, value) {
            n
        } else {
            0
        }
    }

    /// Fills every free slot with default values; returns how many.
    fn fill_default(&mut self) -> usize
    where
        Self::Item: Default,
    {
        let n = self.free_space();
        if self.try_extend_default(n) {
            n
        } else {
            0
        }
    }
}

/// The producer half of a split queue.
///
/// Never reads published elements, so it exposes no element access. `Send`
/// only under a [`ThreadSafe`] mode.
pub struct Producer<'a, S: Storage, M: SyncMode> {
    raw: &'a RawQueue<S, M>,
}

// SAFETY: under a thread-safe mode the producer's tail store is Release and
// its head load Acquire, so moving the handle to another thread is sound for
// element types that may themselves cross threads.
unsafe impl<S, M> Send for Producer<'_, S, M>
where
    S: Storage + Send,
    S::Item: Send,
    M: ThreadSafe,
{
}

impl<'a, S: Storage, M: SyncMode> Producer<'a, S, M> {
    pub(crate) fn new(raw: &'a RawQueue<S, M>) -> Self {
        Self { raw }
    }
}

impl<S: Storage, M: SyncMode> Sealed for Producer<'_, S, M> {}

impl<S: Storage, M: SyncMode> Produce for Producer<'_, S, M> {
    type Item = S::Item;
    type Storage = S;
    type Mode = M;

    #[inline]
    fn raw(&self) -> &RawQueue<S, M> {
        self.raw
    }
}

impl<S: Storage, M: SyncMode> fmt::Debug for Producer<'_, S, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("size_for_write", &self.size_for_write())
            .field("max_size", &self.max_size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::{Consume, DynamicQueue, Produce, QueueError, StaticQueue};
    use std::rc::Rc;

    #[test]
    fn test_try_push_hands_value_back() {
        let mut q = StaticQueue::<String, 2>::new();
        assert_eq!(q.try_push("a".into()), Ok(()));
        assert_eq!(q.try_push("b".into()), Err("b".to_string()));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn test_push_reports_capacity() {
        let mut q = StaticQueue::<u8, 4>::new();
        q.extend_from_slice(&[1, 2]).unwrap();
        assert_eq!(
            q.copy_from_slice(&[3, 4]),
            Err(QueueError::CapacityExceeded {
                requested: 2,
                available: 1
            })
        );
        assert!(q.push(3).is_ok());
        assert!(q.push(4).is_err());
    }

    /// Reports more elements than it yields.
    struct ShortIter<T> {
        values: std::vec::IntoIter<T>,
        claimed: usize,
    }

    impl<T> Iterator for ShortIter<T> {
        type Item = T;

        fn next(&mut self) -> Option<T> {
            self.values.next()
        }

        fn size_hint(&self) -> (usize, Option<usize>) {
            (self.claimed, Some(self.claimed))
        }
    }

    impl<T> ExactSizeIterator for ShortIter<T> {}

    #[test]
    fn test_short_iterator_publishes_nothing() {
        let token = Rc::new(());
        let mut q = StaticQueue::<Rc<()>, 8>::new();
        q.push(Rc::clone(&token)).unwrap();

        let short = ShortIter {
            values: vec![Rc::clone(&token), Rc::clone(&token)].into_iter(),
            claimed: 4,
        };
        assert_eq!(
            q.extend_exact(short),
            Err(QueueError::LengthMismatch {
                expected: 4,
                yielded: 2
            })
        );
        assert_eq!(q.len(), 1);
        assert_eq!(Rc::strong_count(&token), 2);

        let short = ShortIter {
            values: vec![Rc::clone(&token)].into_iter(),
            claimed: 2,
        };
        assert!(!q.try_extend_exact(short));
        assert_eq!(q.size_for_write(), 1);
        assert_eq!(Rc::strong_count(&token), 2);
    }

    #[test]
    fn test_emplace_skips_closure_when_full() {
        let mut q = StaticQueue::<u8, 2>::new();
        assert!(q.try_emplace(|| 1));
        let mut called = false;
        assert!(!q.try_emplace(|| {
            called = true;
            2
        }));
        assert!(!called);
    }

    #[test]
    fn test_bulk_appends_are_all_or_nothing() {
        let mut q = DynamicQueue::<u32>::with_capacity(8);
        assert!(q.try_extend_with(3, &7));
        assert!(!q.try_extend_default(5));
        assert!(!q.try_extend_exact(0..5));
        assert!(q.try_extend_exact(0..4));
        assert!(q.iter().copied().eq([7, 7, 7, 0, 1, 2, 3]));
        assert!(q.is_full());
    }

    #[test]
    fn test_fill_fills_every_free_slot() {
        let mut q = StaticQueue::<u8, 8>::new();
        q.push(1).unwrap();
        assert_eq!(q.fill(&9), 6);
        assert_eq!(q.fill_default(), 0);
        assert_eq!(q.len(), 7);
        q.pop_front_n(3);
        assert_eq!(q.fill_default(), 3);
        assert!(q.iter().copied().eq([9, 9, 9, 9, 0, 0, 0]));
    }

    #[test]
    fn test_producer_handle_appends() {
        let mut q = StaticQueue::<u8, 4>::new();
        {
            let (mut tx, _rx) = q.split();
            assert_eq!(tx.free_space(), 3);
            tx.copy_from_slice(&[1, 2, 3]).unwrap();
            assert!(tx.is_full());
            assert_eq!(tx.size_for_write(), 3);
        }
        assert_eq!(q.len(), 3);
    }
}
