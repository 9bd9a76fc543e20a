//! Loom-based concurrency tests for the `Threads` publication protocol.
//!
//! Run with: `cargo test --features loom --test loom_tests --release`
//!
//! Loom exhaustively explores all possible thread interleavings to find
//! concurrency bugs that might only occur under specific scheduling.
//!
//! The queue itself uses std atomics, so the protocol is modelled here in
//! isolation with a capacity-4 buffer. Every cursor access takes its
//! ordering from the crate's derived table for `Threads`, so weakening the
//! derivation makes these tests fail.

#![cfg(feature = "loom")]

use circq_rs::{SyncMode, Threads};
use loom::cell::UnsafeCell;
use loom::sync::atomic::{AtomicUsize, Ordering};
use loom::sync::Arc;
use loom::thread;

const SLOTS: usize = 4;

/// Same cursor discipline as the crate: unbounded cursors, one spare slot.
struct LoomQueue {
    head: AtomicUsize,
    tail: AtomicUsize,
    slots: [UnsafeCell<u64>; SLOTS],
}

unsafe impl Send for LoomQueue {}
unsafe impl Sync for LoomQueue {}

impl LoomQueue {
    fn new() -> Self {
        Self {
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            slots: std::array::from_fn(|_| UnsafeCell::new(0)),
        }
    }

    /// Producer: construct into the gap, then publish tail.
    fn push(&self, value: u64) -> bool {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Threads::HEAD_LOAD.ordering());
        if tail.wrapping_sub(head) == SLOTS - 1 {
            return false;
        }
        self.slots[tail & (SLOTS - 1)].with_mut(|slot| unsafe { *slot = value });
        self.tail
            .store(tail.wrapping_add(1), Threads::TAIL_STORE.ordering());
        true
    }

    /// Consumer: read the front slot, then publish head.
    fn pop(&self) -> Option<u64> {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Threads::TAIL_LOAD.ordering());
        if head == tail {
            return None;
        }
        let value = self.slots[head & (SLOTS - 1)].with(|slot| unsafe { *slot });
        self.head
            .store(head.wrapping_add(1), Threads::HEAD_STORE.ordering());
        Some(value)
    }
}

/// Values arrive in order and intact.
#[test]
fn loom_fifo_two_items() {
    loom::model(|| {
        let queue = Arc::new(LoomQueue::new());
        let producer_queue = Arc::clone(&queue);

        let producer = thread::spawn(move || {
            assert!(producer_queue.push(42));
            assert!(producer_queue.push(43));
        });

        let mut received = Vec::new();
        for _ in 0..3 {
            if let Some(v) = queue.pop() {
                received.push(v);
            }
            thread::yield_now();
        }
        producer.join().unwrap();
        while let Some(v) = queue.pop() {
            received.push(v);
        }

        assert_eq!(received, [42, 43]);
    });
}

/// A slot freed by the consumer is reused without the producer clobbering
/// a value the consumer is still reading.
#[test]
fn loom_slot_reuse_after_full() {
    loom::model(|| {
        let queue = Arc::new(LoomQueue::new());
        assert!(queue.push(1));
        assert!(queue.push(2));
        assert!(queue.push(3));
        assert!(!queue.push(4), "one slot always stays free");

        let consumer_queue = Arc::clone(&queue);
        let consumer = thread::spawn(move || {
            let first = consumer_queue.pop();
            let second = consumer_queue.pop();
            (first, second)
        });

        let pushed = queue.push(4);
        let (first, second) = consumer.join().unwrap();
        assert_eq!(first, Some(1));
        assert_eq!(second, Some(2));

        let mut rest = Vec::new();
        while let Some(v) = queue.pop() {
            rest.push(v);
        }
        if pushed {
            assert_eq!(rest, [3, 4]);
        } else {
            assert_eq!(rest, [3]);
        }
    });
}

/// Sequential handoff of more items than slots.
#[test]
fn loom_wraps_under_contention() {
    let mut builder = loom::model::Builder::new();
    builder.preemption_bound = Some(3);
    builder.check(|| {
        let queue = Arc::new(LoomQueue::new());
        let producer_queue = Arc::clone(&queue);

        let producer = thread::spawn(move || {
            let mut next = 0u64;
            let mut attempts = 0;
            while next < 4 && attempts < 8 {
                if producer_queue.push(next) {
                    next += 1;
                }
                attempts += 1;
                thread::yield_now();
            }
            next
        });

        let mut received = Vec::new();
        for _ in 0..4 {
            if let Some(v) = queue.pop() {
                received.push(v);
            }
            thread::yield_now();
        }
        let sent = producer.join().unwrap();
        while let Some(v) = queue.pop() {
            received.push(v);
        }

        assert_eq!(received.len() as u64, sent);
        assert!(received.iter().copied().eq(0..sent));
    });
}
