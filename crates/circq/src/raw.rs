use crate::invariants::{
    debug_assert_bounded_count, debug_assert_head_not_past_tail, debug_assert_initialized_read,
    debug_assert_monotonic, debug_assert_power_of_two,
};
use crate::lifecycle;
use crate::storage::Storage;
use crate::sync::{Indices, Role, SyncMode, ThreadSafe};
use std::fmt;
use std::marker::PhantomData;
use std::ptr;

// =============================================================================
// PUBLICATION PROTOCOL
// =============================================================================
//
// Cursors are unbounded `usize` sequence numbers; a slot is addressed as
// `storage.wrap(cursor)`. Live elements occupy exactly `[head, tail)`.
//
// **Producer (append path):**
// 1. Load `tail` plain (only the producer writes it)
// 2. Load `head` with the mode's head-load strength
// 3. If `max_size - (tail - head) < n`: fail, nothing touched
// 4. Construct into `[tail, tail + n)` (unpublished, consumer cannot see it)
// 5. Publish `tail + n` with the mode's tail-store strength
//
// **Consumer (pop path):**
// 1. Load `head` plain (only the consumer writes it)
// 2. Load `tail` with the mode's tail-load strength
// 3. Drop or move out of `[head, head + n)`
// 4. Publish `head + n` with the mode's head-store strength
//
// A panic during step 4 of the producer unwinds before step 5, so a
// half-built batch is never published. A panic inside an element's `Drop`
// during consumer step 3 still publishes the new head (see `PublishHead`),
// so nothing is dropped twice.
//
// =============================================================================

/// Implemented only by the queue facade and the two role handles.
pub trait Sealed {}

/// The shared state behind a queue and both of its role handles.
///
/// Nothing outside this crate can name or call into this type; the public
/// surface reaches it only through the `Produce`/`Consume` capability
/// traits, which pick the role perspective for every access.
pub struct RawQueue<S: Storage, M: SyncMode> {
    indices: Indices<M>,
    storage: S,
    _owns: PhantomData<S::Item>,
}

// SAFETY: with a thread-safe mode every cross-role cursor access is
// acquire/release, so elements published by one thread are fully visible
// to the other. Shared `&RawQueue` hands out `&T` on several threads, so the
// element type must be Sync as well as Send.
unsafe impl<S, M> Sync for RawQueue<S, M>
where
    S: Storage + Send,
    S::Item: Send + Sync,
    M: ThreadSafe,
{
}

/// Publishes a new head when dropped, so a panicking element destructor
/// cannot leave already-dropped elements inside the live range.
struct PublishHead<'a, M: SyncMode> {
    indices: &'a Indices<M>,
    head: usize,
}

impl<M: SyncMode> Drop for PublishHead<'_, M> {
    fn drop(&mut self) {
        self.indices.store_head(self.head);
    }
}

impl<S: Storage, M: SyncMode> RawQueue<S, M> {
    /// Wraps storage whose slots are all uninitialized.
    pub(crate) const fn from_storage(storage: S) -> Self {
        Self {
            indices: Indices::new(),
            storage,
            _owns: PhantomData,
        }
    }

    #[inline]
    pub(crate) fn storage(&self) -> &S {
        &self.storage
    }

    #[inline]
    pub(crate) fn max_size(&self) -> usize {
        debug_assert_power_of_two!(self.storage.allocated_size());
        self.storage.allocated_size() - 1
    }

    /// `(head, tail)` as seen by `role`.
    #[inline]
    pub(crate) fn cursors(&self, role: Role) -> (usize, usize) {
        match role {
            Role::Producer => {
                let tail = self.indices.load_tail(role);
                (self.indices.load_head(role), tail)
            }
            Role::Consumer => {
                let head = self.indices.load_head(role);
                (head, self.indices.load_tail(role))
            }
        }
    }

    #[inline]
    pub(crate) fn head(&self, role: Role) -> usize {
        self.indices.load_head(role)
    }

    #[inline]
    pub(crate) fn tail(&self, role: Role) -> usize {
        self.indices.load_tail(role)
    }

    #[inline]
    pub(crate) fn len(&self, role: Role) -> usize {
        let (head, tail) = self.cursors(role);
        tail.wrapping_sub(head)
    }

    /// Pointer to the element at logical `cursor`.
    #[inline]
    pub(crate) fn slot_at(&self, cursor: usize) -> *mut S::Item {
        self.storage.slot(self.storage.wrap(cursor))
    }

    /// Pointer to the `index`-th live element as seen by `role`, if any.
    #[inline]
    pub(crate) fn live_slot(&self, role: Role, index: usize) -> Option<*mut S::Item> {
        let (head, tail) = self.cursors(role);
        if index < tail.wrapping_sub(head) {
            let cursor = head.wrapping_add(index);
            debug_assert_initialized_read!(cursor, head, tail);
            Some(self.slot_at(cursor))
        } else {
            None
        }
    }

    // ---------------------------------------------------------------------
    // PRODUCER PATH
    // ---------------------------------------------------------------------

    /// Free slots as seen by the producer.
    #[inline]
    pub(crate) fn free(&self) -> usize {
        self.max_size() - self.len(Role::Producer)
    }

    /// Constructs up to `n` elements at tail via `build`, then publishes.
    ///
    /// `build` receives the tail cursor and returns how many slots it
    /// initialized. Returns `Err(free)` without calling `build` if fewer
    /// than `n` slots are free.
    ///
    /// # Safety
    ///
    /// Only the single producer role may call this.
    pub(crate) unsafe fn produce<F>(&self, n: usize, build: F) -> Result<(), usize>
    where
        F: FnOnce(usize) -> usize,
    {
        let (head, tail) = self.cursors(Role::Producer);
        let free = self.max_size() - tail.wrapping_sub(head);
        if n > free {
            return Err(free);
        }

        let built = build(tail);
        debug_assert!(built <= n, "built {} of {} reserved slots", built, n);

        let new_tail = tail.wrapping_add(built);
        debug_assert_monotonic!(tail, new_tail, self.max_size());
        debug_assert_bounded_count!(new_tail.wrapping_sub(head), self.max_size());
        self.indices.store_tail(new_tail);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // CONSUMER PATH
    // ---------------------------------------------------------------------

    /// Moves the front element out and publishes the new head.
    ///
    /// # Safety
    ///
    /// Only the single consumer role may call this.
    pub(crate) unsafe fn take_front(&self) -> Option<S::Item> {
        let (head, tail) = self.cursors(Role::Consumer);
        if head == tail {
            return None;
        }
        let value = ptr::read(self.slot_at(head));
        self.indices.store_head(head.wrapping_add(1));
        Some(value)
    }

    /// Drops up to `n` front elements, clamped to the consumer's view.
    ///
    /// # Safety
    ///
    /// Only the single consumer role may call this.
    pub(crate) unsafe fn pop_front(&self, n: usize) {
        let (head, tail) = self.cursors(Role::Consumer);
        debug_assert_head_not_past_tail!(head, n, tail);
        self.destroy_front(head, n.min(tail.wrapping_sub(head)));
    }

    /// Drops exactly `n` front elements without checking the live count.
    ///
    /// # Safety
    ///
    /// Only the single consumer role may call this, and `n` must not exceed
    /// the number of live elements.
    pub(crate) unsafe fn pop_front_unchecked(&self, n: usize) {
        let head = self.head(Role::Consumer);
        self.destroy_front(head, n);
    }

    unsafe fn destroy_front(&self, head: usize, n: usize) {
        debug_assert_monotonic!(head, head.wrapping_add(n), self.max_size());
        let _publish = PublishHead {
            indices: &self.indices,
            head: head.wrapping_add(n),
        };
        lifecycle::destroy_n(&self.storage, head, n);
    }

    // ---------------------------------------------------------------------
    // EXCLUSIVE ACCESS (no role active)
    // ---------------------------------------------------------------------

    /// Forgets the live range without dropping it; the caller has moved the
    /// elements out.
    pub(crate) fn forget_all(&mut self) {
        let (_, tail) = self.indices.snapshot();
        self.indices.reset(tail, tail);
    }

    /// Replaces the storage and cursors wholesale.
    ///
    /// The old storage must hold no live elements any more.
    pub(crate) fn replace_storage(&mut self, storage: S, len: usize) -> S {
        self.indices.reset(0, len);
        std::mem::replace(&mut self.storage, storage)
    }

    /// Current `(head, tail)` without atomic traffic.
    pub(crate) fn exclusive_cursors(&mut self) -> (usize, usize) {
        self.indices.snapshot()
    }
}

impl<S: Storage, M: SyncMode> Drop for RawQueue<S, M> {
    fn drop(&mut self) {
        let (head, tail) = self.indices.snapshot();
        // SAFETY: `&mut self` excludes both roles; `[head, tail)` is live.
        unsafe { lifecycle::destroy_n(&self.storage, head, tail.wrapping_sub(head)) }
    }
}

impl<S: Storage + fmt::Debug, M: SyncMode> fmt::Debug for RawQueue<S, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawQueue")
            .field("indices", &self.indices)
            .field("storage", &self.storage)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StaticStorage;
    use crate::sync::Unsync;

    #[test]
    fn test_publishes_only_after_build() {
        let raw = RawQueue::<_, Unsync>::from_storage(StaticStorage::<u32, 4>::new());
        unsafe {
            raw.produce(2, |tail| {
                assert_eq!(raw.len(Role::Consumer), 0);
                lifecycle::construct_n(raw.storage(), tail, 2, || Some(7))
            })
            .unwrap();
            assert_eq!(raw.len(Role::Consumer), 2);
            assert_eq!(raw.produce(2, |_| unreachable!()), Err(1));
            assert_eq!(raw.take_front(), Some(7));
        }
        assert_eq!(raw.free(), 2);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "cursor moved backwards or by more than a lap")]
    fn test_head_cannot_skip_a_lap() {
        let raw = RawQueue::<_, Unsync>::from_storage(StaticStorage::<u8, 4>::new());
        // Caught before any slot is touched.
        unsafe { raw.pop_front_unchecked(5) };
    }
}
