//! Running sequence numbers ("Zap") of one storefront store

/// Monotonic counter handing out sequence numbers.
///
/// `last` is the highest number already in use; the next assignment is
/// `last + 1`. A session owns exactly one counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequenceCounter {
    last: u64,
}

impl SequenceCounter {
    /// Counter whose next assignment is `last + 1`
    #[must_use]
    pub const fn starting_after(last: u64) -> Self {
        Self { last }
    }

    #[must_use]
    pub const fn last(&self) -> u64 {
        self.last
    }

    /// Hand out the next sequence number
    pub fn assign_next(&mut self) -> u64 {
        self.last += 1;
        self.last
    }

    /// Account for a number assigned elsewhere, so it is never handed out again
    pub fn observe(&mut self, sequence: u64) {
        self.last = self.last.max(sequence);
    }
}
