//! Tick counting and timeslice budgets.

use portable_atomic::{AtomicU32, AtomicU64, Ordering};

/// Global tick counter for deadline computation.
///
/// This counter is incremented on every clock tick and is the time base
/// job deadlines are expressed in.
pub struct TickCounter {
    /// Number of ticks since system start
    ticks: AtomicU64,
}

impl TickCounter {
    pub const fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
        }
    }

    /// Increment the tick counter and return the new tick count.
    ///
    /// This should only be called from the clock tick path.
    pub fn increment(&self) -> u64 {
        self.ticks.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Get the current tick count.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }
}

impl Default for TickCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-thread execution budget in ticks.
///
/// A quantum of zero means the thread is not budgeted.
pub struct TimeSlice {
    remaining: AtomicU32,
    quantum: AtomicU32,
}

impl TimeSlice {
    pub const fn new(quantum: u32) -> Self {
        Self {
            remaining: AtomicU32::new(quantum),
            quantum: AtomicU32::new(quantum),
        }
    }

    /// Set a new quantum and refill the budget.
    pub fn reset(&self, quantum: u32) {
        self.quantum.store(quantum, Ordering::Release);
        self.remaining.store(quantum, Ordering::Release);
    }

    /// Refill the budget to a full quantum.
    pub fn refill(&self) {
        let quantum = self.quantum.load(Ordering::Acquire);
        self.remaining.store(quantum, Ordering::Release);
    }

    /// Charge one tick to the budget.
    ///
    /// Returns `true` when this tick used up the budget.
    pub fn consume(&self) -> bool {
        if self.quantum.load(Ordering::Acquire) == 0 {
            return false;
        }
        let previous = self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |left| {
                Some(left.saturating_sub(1))
            })
            .unwrap_or(0);
        previous <= 1
    }

    pub fn remaining(&self) -> u32 {
        self.remaining.load(Ordering::Acquire)
    }

    pub fn is_budgeted(&self) -> bool {
        self.quantum.load(Ordering::Acquire) != 0
    }
}
