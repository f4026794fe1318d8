//! Per-thread scheduler records.
//!
//! Threads are owned by the task subsystem; the scheduler only keeps the
//! fields it needs to place them. Records live in a fixed arena (see
//! [`ThreadTable`]) and are addressed by a stable [`ThreadId`], so the ready
//! queue and the scheduled set store ids rather than references back into
//! thread control blocks.

use core::num::NonZeroUsize;

use portable_atomic::{AtomicBool, AtomicU64, AtomicU8, AtomicUsize, Ordering};

use crate::sched::CpuId;
use crate::time::{Priority, TimeSlice};

pub mod table;

pub use table::ThreadTable;

/// Stable handle of a thread known to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadId(NonZeroUsize);

impl core::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ThreadId {
    /// Handle for arena slot `index`.
    pub fn from_index(index: usize) -> Self {
        match NonZeroUsize::new(index.wrapping_add(1)) {
            Some(id) => Self(id),
            None => Self(NonZeroUsize::MAX),
        }
    }

    /// Arena slot of this handle.
    pub fn index(self) -> usize {
        self.0.get() - 1
    }

    /// Get the raw ID value.
    pub fn get(self) -> usize {
        self.0.get()
    }
}

/// Structure a thread is linked into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Location {
    ReadyQueue = 0,
    ScheduledSet = 1,
}

/// Ready-queue membership history of a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PresenceState {
    /// Never inserted into the ready queue
    NeverPresent = 0,
    /// Currently linked into the ready queue
    Present = 1,
    /// Was linked, has been removed since
    NotPresentlyPresent = 2,
}

/// Scheduler-side state of one thread.
///
/// The thread fields (`priority`, `cpu`, the scheduled/executing flags) are
/// written by the scheduler under the scheduled-set lock and read from any
/// processor. `location` and `presence` are only changed together with the
/// structure they describe.
pub struct ThreadRecord {
    allocated: AtomicBool,
    priority: AtomicU64,
    initial_priority: AtomicU64,
    cpu: AtomicUsize,
    is_scheduled: AtomicBool,
    is_executing: AtomicBool,
    in_flight: AtomicBool,
    location: AtomicU8,
    presence: AtomicU8,
    timeslice: TimeSlice,
}

impl ThreadRecord {
    pub(crate) const fn new() -> Self {
        Self {
            allocated: AtomicBool::new(false),
            priority: AtomicU64::new(u64::MAX),
            initial_priority: AtomicU64::new(u64::MAX),
            cpu: AtomicUsize::new(0),
            is_scheduled: AtomicBool::new(false),
            is_executing: AtomicBool::new(false),
            in_flight: AtomicBool::new(false),
            location: AtomicU8::new(Location::ReadyQueue as u8),
            presence: AtomicU8::new(PresenceState::NeverPresent as u8),
            timeslice: TimeSlice::new(0),
        }
    }

    /// Claim this slot for a new thread. Returns `false` if it is in use.
    pub(crate) fn claim(&self, priority: Priority, quantum: u32) -> bool {
        if self
            .allocated
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        self.priority.store(priority.value(), Ordering::Release);
        self.initial_priority.store(priority.value(), Ordering::Release);
        self.cpu.store(0, Ordering::Release);
        self.is_scheduled.store(false, Ordering::Release);
        self.is_executing.store(false, Ordering::Release);
        self.in_flight.store(false, Ordering::Release);
        self.location.store(Location::ReadyQueue as u8, Ordering::Release);
        self.presence.store(PresenceState::NeverPresent as u8, Ordering::Release);
        self.timeslice.reset(quantum);
        true
    }

    pub(crate) fn release(&self) {
        self.allocated.store(false, Ordering::Release);
    }

    pub fn is_allocated(&self) -> bool {
        self.allocated.load(Ordering::Acquire)
    }

    pub fn priority(&self) -> Priority {
        Priority::from_raw(self.priority.load(Ordering::Acquire))
    }

    pub(crate) fn set_priority(&self, priority: Priority) {
        self.priority.store(priority.value(), Ordering::Release);
    }

    pub fn initial_priority(&self) -> Priority {
        Priority::from_raw(self.initial_priority.load(Ordering::Acquire))
    }

    pub fn cpu(&self) -> CpuId {
        self.cpu.load(Ordering::Acquire)
    }

    pub(crate) fn set_cpu(&self, cpu: CpuId) {
        self.cpu.store(cpu, Ordering::Release);
    }

    pub fn is_scheduled(&self) -> bool {
        self.is_scheduled.load(Ordering::Acquire)
    }

    pub(crate) fn set_scheduled(&self, scheduled: bool) {
        self.is_scheduled.store(scheduled, Ordering::Release);
    }

    pub fn is_executing(&self) -> bool {
        self.is_executing.load(Ordering::Acquire)
    }

    pub(crate) fn set_executing(&self, executing: bool) {
        self.is_executing.store(executing, Ordering::Release);
    }

    /// Thread left its structure but still holds its processor.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub(crate) fn set_in_flight(&self, in_flight: bool) {
        self.in_flight.store(in_flight, Ordering::Release);
    }

    /// Clear the in-flight flag, returning whether it was set.
    pub(crate) fn take_in_flight(&self) -> bool {
        self.in_flight.swap(false, Ordering::AcqRel)
    }

    pub fn location(&self) -> Location {
        match self.location.load(Ordering::Acquire) {
            1 => Location::ScheduledSet,
            _ => Location::ReadyQueue,
        }
    }

    pub(crate) fn set_location(&self, location: Location) {
        self.location.store(location as u8, Ordering::Release);
    }

    pub fn presence(&self) -> PresenceState {
        match self.presence.load(Ordering::Acquire) {
            1 => PresenceState::Present,
            2 => PresenceState::NotPresentlyPresent,
            _ => PresenceState::NeverPresent,
        }
    }

    pub(crate) fn set_presence(&self, presence: PresenceState) {
        self.presence.store(presence as u8, Ordering::Release);
    }

    pub fn timeslice(&self) -> &TimeSlice {
        &self.timeslice
    }

    pub fn snapshot(&self, id: ThreadId) -> ThreadInfo {
        ThreadInfo {
            id,
            priority: self.priority(),
            cpu: self.cpu(),
            is_scheduled: self.is_scheduled(),
            is_executing: self.is_executing(),
            in_flight: self.is_in_flight(),
            location: self.location(),
            presence: self.presence(),
        }
    }
}

/// Point-in-time copy of a thread's scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadInfo {
    pub id: ThreadId,
    pub priority: Priority,
    pub cpu: CpuId,
    pub is_scheduled: bool,
    pub is_executing: bool,
    pub in_flight: bool,
    pub location: Location,
    pub presence: PresenceState,
}
