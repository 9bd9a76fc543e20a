/// Allocated slot count for a queue; always a power of two.
///
/// One slot always stays empty so that `head == tail` means empty, which is
/// why [`usable`](Self::usable) is one less than [`get`](Self::get).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Capacity {
    bits: u8,
}

impl Capacity {
    /// Smallest capacity handed out by [`at_least`](Self::at_least): one usable slot.
    pub const MIN: Self = Self { bits: 1 };

    /// Creates a capacity of `1 << bits` slots.
    ///
    /// # Panics
    ///
    /// Panics if `bits` does not fit in a `usize` shift.
    pub const fn from_bits(bits: u8) -> Self {
        assert!((bits as u32) < usize::BITS, "capacity bits out of range");
        Self { bits }
    }

    /// Rounds `slots` up to the next power of two, with a minimum of 2.
    ///
    /// Returns `None` if the rounded size overflows `usize`.
    pub const fn at_least(slots: usize) -> Option<Self> {
        if slots <= 2 {
            return Some(Self::MIN);
        }
        match slots.checked_next_power_of_two() {
            Some(n) => Some(Self {
                bits: n.trailing_zeros() as u8,
            }),
            None => None,
        }
    }

    /// Returns the number of allocated slots.
    #[inline]
    pub const fn get(&self) -> usize {
        1 << self.bits
    }

    /// Returns the mask for index wrapping.
    #[inline]
    pub const fn mask(&self) -> usize {
        self.get() - 1
    }

    /// Returns the maximum number of simultaneously live elements.
    #[inline]
    pub const fn usable(&self) -> usize {
        self.get() - 1
    }

    /// Returns log2 of the slot count.
    #[inline]
    pub const fn bits(&self) -> u8 {
        self.bits
    }
}

impl Default for Capacity {
    fn default() -> Self {
        SMALL_CAPACITY
    }
}

/// 256 slots: a few cache lines of indices plus a small payload window.
pub const SMALL_CAPACITY: Capacity = Capacity::from_bits(8);

/// 64K slots, for high-throughput thread-to-thread transfer.
pub const LARGE_CAPACITY: Capacity = Capacity::from_bits(16);
