//! Head/tail cursors and the per-mode synchronization policy.
//!
//! A queue has exactly two roles. The consumer is the only writer of `head`,
//! the producer is the only writer of `tail`, and each role reads the other
//! role's cursor to compute free space or available elements. The strength
//! every access needs follows from one question: *can the reading role run
//! while the writing role is suspended half-way through an operation?*
//!
//! - A load of the other role's cursor is `Acquire` iff the reader may
//!   preempt the writer. Otherwise the writer is never mid-operation when
//!   the reader runs, and a plain load suffices.
//! - A store of a role's own cursor is protected iff the other role may
//!   preempt it. When the roles also run truly in parallel the store is
//!   `Release`; when only the observer preempts (an interrupt handler on the
//!   same core) an untorn store behind a compiler fence is enough.
//! - A role never preempts itself, so reading its own cursor is plain.
//!
//! The modes only declare who preempts whom. The table below is derived from
//! those two flags by [`load_strength`] and [`store_strength`]:
//!
//! ```text
//! mode               head load (P)  head store (C)  tail load (C)  tail store (P)
//! Unsync             plain          plain           plain          plain
//! ProducerPreempts   acquire        untorn          plain          plain
//! ConsumerPreempts   plain          plain           acquire        untorn
//! Threads            acquire        release         acquire        release
//! ```

use crossbeam_utils::CachePadded;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{compiler_fence, AtomicUsize, Ordering};

mod sealed {
    pub trait Sealed {}
}

/// The perspective an index access is made from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Appends elements and advances `tail`.
    Producer,
    /// Removes elements and advances `head`.
    Consumer,
}

impl Role {
    /// Returns the opposite role.
    #[inline]
    pub const fn other(self) -> Self {
        match self {
            Role::Producer => Role::Consumer,
            Role::Consumer => Role::Producer,
        }
    }

    /// Returns `true` if this role may run while the other is suspended
    /// mid-operation under mode `M`.
    #[inline]
    pub const fn preempts<M: SyncMode>(self) -> bool {
        match self {
            Role::Producer => M::PRODUCER_PREEMPTS,
            Role::Consumer => M::CONSUMER_PREEMPTS,
        }
    }

    const fn is(self, other: Role) -> bool {
        matches!(
            (self, other),
            (Role::Producer, Role::Producer) | (Role::Consumer, Role::Consumer)
        )
    }
}

/// Strength required for loading a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStrength {
    /// No protection; the writer is never mid-store when this runs.
    Plain,
    /// Acquire load, pairs with the writer's protected store.
    Acquire,
}

/// Strength required for storing a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreStrength {
    /// No reader can observe the store in progress.
    Plain,
    /// Single-core preemption: must not tear and must not be reordered
    /// before the slot writes it publishes.
    Untorn,
    /// Parallel reader: release store.
    Release,
}

impl LoadStrength {
    /// Memory ordering implementing this strength.
    #[inline]
    pub const fn ordering(self) -> Ordering {
        match self {
            LoadStrength::Plain => Ordering::Relaxed,
            LoadStrength::Acquire => Ordering::Acquire,
        }
    }
}

impl StoreStrength {
    /// Memory ordering of the store instruction itself.
    #[inline]
    pub const fn ordering(self) -> Ordering {
        match self {
            StoreStrength::Plain | StoreStrength::Untorn => Ordering::Relaxed,
            StoreStrength::Release => Ordering::Release,
        }
    }
}

/// Strength for `reader` loading the cursor owned by `owner` under mode `M`.
pub const fn load_strength<M: SyncMode>(reader: Role, owner: Role) -> LoadStrength {
    if reader.is(owner) || !reader.preempts::<M>() {
        LoadStrength::Plain
    } else {
        LoadStrength::Acquire
    }
}

/// Strength for `owner` publishing its own cursor under mode `M`.
pub const fn store_strength<M: SyncMode>(owner: Role) -> StoreStrength {
    if !owner.other().preempts::<M>() {
        StoreStrength::Plain
    } else if owner.preempts::<M>() {
        StoreStrength::Release
    } else {
        StoreStrength::Untorn
    }
}

/// Compile-time synchronization mode of a queue.
///
/// Implemented only by the four marker types in this module. A mode states
/// which role may interrupt the other; every ordering is derived from that.
pub trait SyncMode: sealed::Sealed + Sized + 'static {
    /// The producer may run while the consumer is suspended mid-operation.
    const PRODUCER_PREEMPTS: bool;
    /// The consumer may run while the producer is suspended mid-operation.
    const CONSUMER_PREEMPTS: bool;

    /// Producer reading `head`.
    const HEAD_LOAD: LoadStrength = load_strength::<Self>(Role::Producer, Role::Consumer);
    /// Consumer publishing `head`.
    const HEAD_STORE: StoreStrength = store_strength::<Self>(Role::Consumer);
    /// Consumer reading `tail`.
    const TAIL_LOAD: LoadStrength = load_strength::<Self>(Role::Consumer, Role::Producer);
    /// Producer publishing `tail`.
    const TAIL_STORE: StoreStrength = store_strength::<Self>(Role::Producer);
}

/// Marker for modes whose roles may live on different threads.
///
/// Only under such a mode are the producer and consumer handles `Send`.
pub trait ThreadSafe: SyncMode {}

/// No synchronization: both roles run on one thread without interrupts.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unsync;

/// Single core; the producer runs in an interrupt that may preempt the consumer.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProducerPreempts;

/// Single core; the consumer runs in an interrupt that may preempt the producer.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsumerPreempts;

/// Producer and consumer run on independent threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct Threads;

impl sealed::Sealed for Unsync {}
impl sealed::Sealed for ProducerPreempts {}
impl sealed::Sealed for ConsumerPreempts {}
impl sealed::Sealed for Threads {}

impl SyncMode for Unsync {
    const PRODUCER_PREEMPTS: bool = false;
    const CONSUMER_PREEMPTS: bool = false;
}

impl SyncMode for ProducerPreempts {
    const PRODUCER_PREEMPTS: bool = true;
    const CONSUMER_PREEMPTS: bool = false;
}

impl SyncMode for ConsumerPreempts {
    const PRODUCER_PREEMPTS: bool = false;
    const CONSUMER_PREEMPTS: bool = true;
}

impl SyncMode for Threads {
    const PRODUCER_PREEMPTS: bool = true;
    const CONSUMER_PREEMPTS: bool = true;
}

impl ThreadSafe for Threads {}

// =============================================================================
// CURSORS
// =============================================================================

/// The `head` and `tail` cursors of one queue.
///
/// Cursors are unbounded `usize` sequence numbers; the physical slot is
/// computed by the storage as `cursor & mask` only when a slot is touched.
/// Each cursor sits on its own cache line so the producer's tail stores do
/// not invalidate the consumer's head line.
pub struct Indices<M: SyncMode> {
    head: CachePadded<AtomicUsize>,
    tail: CachePadded<AtomicUsize>,
    _mode: PhantomData<M>,
}

impl<M: SyncMode> Indices<M> {
    /// Creates an empty pair of cursors at position zero.
    pub const fn new() -> Self {
        Self {
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
            _mode: PhantomData,
        }
    }

    /// Loads `head` from the perspective of `by`.
    #[inline]
    pub fn load_head(&self, by: Role) -> usize {
        let strength = if by.is(Role::Consumer) {
            LoadStrength::Plain
        } else {
            M::HEAD_LOAD
        };
        self.head.load(strength.ordering())
    }

    /// Loads `tail` from the perspective of `by`.
    #[inline]
    pub fn load_tail(&self, by: Role) -> usize {
        let strength = if by.is(Role::Producer) {
            LoadStrength::Plain
        } else {
            M::TAIL_LOAD
        };
        self.tail.load(strength.ordering())
    }

    /// Publishes a new `head`. Consumer only.
    #[inline]
    pub fn store_head(&self, head: usize) {
        publish(&self.head, head, M::HEAD_STORE);
    }

    /// Publishes a new `tail`. Producer only.
    #[inline]
    pub fn store_tail(&self, tail: usize) {
        publish(&self.tail, tail, M::TAIL_STORE);
    }

    /// Overwrites both cursors while no role is active.
    #[inline]
    pub(crate) fn reset(&mut self, head: usize, tail: usize) {
        *self.head.get_mut() = head;
        *self.tail.get_mut() = tail;
    }

    /// Reads both cursors while no role is active.
    #[inline]
    pub(crate) fn snapshot(&mut self) -> (usize, usize) {
        (*self.head.get_mut(), *self.tail.get_mut())
    }
}

impl<M: SyncMode> Default for Indices<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: SyncMode> fmt::Debug for Indices<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Indices")
            .field("head", &self.head.load(Ordering::Relaxed))
            .field("tail", &self.tail.load(Ordering::Relaxed))
            .finish()
    }
}

#[inline]
fn publish(cursor: &AtomicUsize, value: usize, strength: StoreStrength) {
    if let StoreStrength::Untorn = strength {
        compiler_fence(Ordering::Release);
    }
    cursor.store(value, strength.ordering());
}

#[cfg(test)]
mod tests {
    use super::*;
    use LoadStrength::{Acquire, Plain};
    use StoreStrength::{Release, Untorn};

    fn table<M: SyncMode>() -> (LoadStrength, StoreStrength, LoadStrength, StoreStrength) {
        (M::HEAD_LOAD, M::HEAD_STORE, M::TAIL_LOAD, M::TAIL_STORE)
    }

    #[test]
    fn test_derived_table_unsync() {
        assert_eq!(
            table::<Unsync>(),
            (Plain, StoreStrength::Plain, Plain, StoreStrength::Plain)
        );
    }

    #[test]
    fn test_derived_table_producer_preempts() {
        assert_eq!(
            table::<ProducerPreempts>(),
            (Acquire, Untorn, Plain, StoreStrength::Plain)
        );
    }

    #[test]
    fn test_derived_table_consumer_preempts() {
        assert_eq!(
            table::<ConsumerPreempts>(),
            (Plain, StoreStrength::Plain, Acquire, Untorn)
        );
    }

    #[test]
    fn test_derived_table_threads() {
        assert_eq!(table::<Threads>(), (Acquire, Release, Acquire, Release));
    }

    #[test]
    fn test_own_cursor_is_always_plain() {
        assert_eq!(load_strength::<Threads>(Role::Producer, Role::Producer), Plain);
        assert_eq!(load_strength::<Threads>(Role::Consumer, Role::Consumer), Plain);
    }

    #[test]
    fn test_orderings() {
        assert_eq!(Acquire.ordering(), Ordering::Acquire);
        assert_eq!(Untorn.ordering(), Ordering::Relaxed);
        assert_eq!(Release.ordering(), Ordering::Release);
    }

    #[test]
    fn test_indices_roundtrip() {
        let mut idx = Indices::<Threads>::new();
        idx.store_tail(5);
        idx.store_head(2);
        assert_eq!(idx.load_tail(Role::Consumer), 5);
        assert_eq!(idx.load_head(Role::Producer), 2);
        idx.reset(0, 3);
        assert_eq!(idx.snapshot(), (0, 3));
    }
}
