//! Error types for queue operations.

use std::collections::TryReserveError;
use thiserror::Error;

/// Errors returned by the failing (non-`try_`) queue operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// Not enough free slots for the requested insertion.
    #[error("circular queue overflow: {requested} requested, {available} available")]
    CapacityExceeded {
        /// Number of elements the operation tried to add.
        requested: usize,
        /// Free slots observed at the time of the attempt.
        available: usize,
    },

    /// Checked access past the end of the live range.
    #[error("index {index} out of range for queue of length {len}")]
    OutOfRange {
        /// The requested index, relative to the front.
        index: usize,
        /// Number of live elements observed at the time of the access.
        len: usize,
    },

    /// An exact-size iterator ended before its reported length.
    #[error("iterator yielded {yielded} of {expected} reported elements")]
    LengthMismatch {
        /// Length the iterator reported.
        expected: usize,
        /// Elements it actually produced.
        yielded: usize,
    },

    /// The dynamic backend could not obtain memory.
    #[error(transparent)]
    Alloc(#[from] TryReserveError),
}

impl QueueError {
    /// Returns `true` if retrying after the consumer drains may succeed.
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::CapacityExceeded { .. })
    }

    pub(crate) fn overflow(requested: usize, available: usize) -> Self {
        Self::CapacityExceeded {
            requested,
            available,
        }
    }
}
