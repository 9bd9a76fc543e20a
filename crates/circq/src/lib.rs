//! circq - Single-Producer Single-Consumer Circular Queue
//!
//! A bounded ring buffer with one producer (appending at `tail`) and one
//! consumer (reading and removing at `head`). The synchronization strength is
//! a type parameter, so the same queue serves a single thread, a single core
//! with one role in an interrupt handler, or two threads, paying only for the
//! ordering the situation needs.
//!
//! # Key Features
//!
//! - Static (inline, `const`-constructible) or dynamic (heap, resizable) storage
//! - Orderings derived from which role may preempt the other
//! - Cache-padded cursors (no false sharing between producer and consumer)
//! - Bulk appends that are all-or-nothing, even if a clone panics
//! - Random-access cursors, double-ended iterators, contiguous slice views
//!
//! # Example
//!
//! ```
//! use circq_rs::prelude::*;
//! use circq_rs::StaticQueue;
//!
//! let mut queue = StaticQueue::<u32, 8>::new();
//!
//! queue.extend_from_slice(&[1, 2, 3]).unwrap();
//! assert_eq!(queue.try_push(4), Ok(()));
//!
//! assert_eq!(queue.pop(), Some(1));
//! assert_eq!(queue.front(), Some(&2));
//! assert_eq!(queue.iter().copied().collect::<Vec<_>>(), [2, 3, 4]);
//! ```
//!
//! # Modes
//!
//! | mode | producer and consumer run |
//! |---|---|
//! | [`Unsync`] | on one thread, no interrupts |
//! | [`ProducerPreempts`] | on one core, producer in an interrupt |
//! | [`ConsumerPreempts`] | on one core, consumer in an interrupt |
//! | [`Threads`] | on independent threads |

// Invariant macros are defined first so the rest of the crate can use them.
mod invariants;

mod capacity;
mod consumer;
pub mod cursor;
mod error;
mod lifecycle;
mod producer;
mod queue;
mod raw;
pub mod storage;
pub mod sync;

pub use capacity::{Capacity, LARGE_CAPACITY, SMALL_CAPACITY};
pub use consumer::{Consume, Consumer};
pub use cursor::{AtomicCursor, Cursor, Iter, IterMut, Mark};
pub use error::QueueError;
pub use producer::{Produce, Producer};
pub use queue::{CircularQueue, DynamicQueue, StaticQueue};
pub use storage::{DynamicStorage, StaticStorage, Storage};
pub use sync::{ConsumerPreempts, ProducerPreempts, Role, SyncMode, ThreadSafe, Threads, Unsync};

/// The two capability traits, for glob import.
pub mod prelude {
    pub use crate::{Consume, Produce};
}
