//! Debug assertion macros for queue invariants.
//!
//! Only active in debug builds (`debug_assert!`), so release builds pay
//! nothing. Used by the facade, the role handles and the resize path.

// =============================================================================
// Bounded count
// =============================================================================

/// Assert that the live count never exceeds usable capacity.
///
/// **Invariant**: `0 ≤ (tail - head) ≤ allocated_size - 1`
macro_rules! debug_assert_bounded_count {
    ($count:expr, $usable:expr) => {
        debug_assert!(
            $count <= $usable,
            "bounded count violated: {} live elements exceed usable capacity {}",
            $count,
            $usable
        )
    };
}

/// Assert that a pop does not move head past the consumer's view of tail.
///
/// **Invariant**: `new_head - old_head ≤ tail - old_head`
macro_rules! debug_assert_head_not_past_tail {
    ($head:expr, $n:expr, $tail:expr) => {
        debug_assert!(
            $n <= $tail.wrapping_sub($head),
            "over-pop: popping {} elements from head {} with tail {}",
            $n,
            $head,
            $tail
        )
    };
}

/// Assert that a published cursor only moves forward, by at most the usable
/// capacity.
///
/// **Invariant**: `0 ≤ new - old ≤ allocated_size - 1` (wrapping)
macro_rules! debug_assert_monotonic {
    ($old:expr, $new:expr, $usable:expr) => {
        debug_assert!(
            $new.wrapping_sub($old) <= $usable,
            "cursor moved backwards or by more than a lap: {} -> {} (usable {})",
            $old,
            $new,
            $usable
        )
    };
}

// =============================================================================
// Initialized range
// =============================================================================

/// Assert that a logical position lies in the live range.
///
/// **Invariant**: `slot(i) is initialized ⟺ head ≤ i < tail` (wrapping)
macro_rules! debug_assert_initialized_read {
    ($pos:expr, $head:expr, $tail:expr) => {
        debug_assert!(
            $pos.wrapping_sub($head) < $tail.wrapping_sub($head),
            "reading slot at cursor {} outside initialized range [{}, {})",
            $pos,
            $head,
            $tail
        )
    };
}

// =============================================================================
// Power-of-two storage
// =============================================================================

/// Assert that a storage backend reports a power-of-two slot count.
macro_rules! debug_assert_power_of_two {
    ($size:expr) => {
        debug_assert!(
            $size.is_power_of_two(),
            "storage size {} is not a power of two",
            $size
        )
    };
}

pub(crate) use debug_assert_bounded_count;
pub(crate) use debug_assert_head_not_past_tail;
pub(crate) use debug_assert_initialized_read;
pub(crate) use debug_assert_monotonic;
pub(crate) use debug_assert_power_of_two;
