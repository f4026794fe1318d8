//! Deadline priorities and scheduler time keeping.
//!
//! A priority is a numeric urgency: the smaller the value, the more urgent
//! the thread. Threads with a deadline carry their absolute deadline in ticks
//! as priority. Threads without one run at a background priority, which has
//! the most significant bit set so that any deadline is more urgent than any
//! background level.

use core::cmp::Ordering;
use core::fmt;

pub mod tick;

pub use tick::{TickCounter, TimeSlice};

/// Urgency of a thread. Lower is more urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(u64);

impl Priority {
    /// Marks a priority that is not derived from a deadline.
    pub const BACKGROUND_FLAG: u64 = 1 << 63;

    /// Least urgent priority, used by idle threads.
    pub const IDLE: Priority = Priority(u64::MAX);

    /// Most urgent deadline priority.
    pub const MOST_URGENT: Priority = Priority(0);

    /// Priority for an absolute deadline in ticks.
    ///
    /// Deadlines that would reach into the background range saturate at the
    /// latest representable deadline.
    pub const fn from_deadline(deadline_ticks: u64) -> Self {
        if deadline_ticks & Self::BACKGROUND_FLAG != 0 {
            Priority(Self::BACKGROUND_FLAG - 1)
        } else {
            Priority(deadline_ticks)
        }
    }

    /// Background priority; `level` orders background threads among
    /// themselves.
    pub const fn background(level: u32) -> Self {
        Priority(Self::BACKGROUND_FLAG | level as u64)
    }

    pub const fn from_raw(value: u64) -> Self {
        Priority(value)
    }

    pub const fn value(self) -> u64 {
        self.0
    }

    pub const fn is_background(self) -> bool {
        self.0 & Self::BACKGROUND_FLAG != 0
    }

    /// `true` when `self` must run before `other`.
    pub fn is_more_urgent_than(self, other: Priority) -> bool {
        self.0 < other.0
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Priority::IDLE {
            write!(f, "idle")
        } else if self.is_background() {
            write!(f, "bg:{}", self.0 & !Self::BACKGROUND_FLAG)
        } else {
            write!(f, "d:{}", self.0)
        }
    }
}

/// Priority comparator.
///
/// `Ordering::Less` means `a` is more urgent than `b`.
pub fn priority_compare(a: Priority, b: Priority) -> Ordering {
    a.cmp(&b)
}

/// Priority of a job released now with `relative_deadline` ticks to go.
///
/// A relative deadline of zero means the thread has no deadline and returns
/// to `initial`.
pub fn release_priority(now: u64, relative_deadline: u64, initial: Priority) -> Priority {
    if relative_deadline == 0 {
        initial
    } else {
        Priority::from_deadline(now.saturating_add(relative_deadline))
    }
}
