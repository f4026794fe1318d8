//! Scheduler trait: the entry-point table consumed by the kernel.

use core::cmp::Ordering;

use super::{Notifications, Switch};
use crate::errors::SchedResult;
use crate::thread::ThreadId;
use crate::time::{self, Priority};

/// CPU identifier type.
pub type CpuId = usize;

/// Counters describing the current placement of threads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Allocated thread records
    pub threads: usize,
    /// Threads that own a processor
    pub scheduled: usize,
    /// Threads waiting in the ready queue
    pub ready: usize,
    /// Processors left without a scheduled thread
    pub vacant: usize,
}

/// Scheduler entry points.
///
/// Every operation that can move a thread onto or off a processor returns the
/// [`Notifications`] it produced. The caller must deliver them (see
/// [`Notifications::deliver`]) once it is done with scheduler state; the
/// scheduler never signals other processors itself.
pub trait Scheduler: Send + Sync {
    /// Create the scheduler record of a new thread.
    ///
    /// Fails with [`SchedError::NoStorage`](crate::SchedError::NoStorage)
    /// when the record workspace is exhausted. The thread must then not be
    /// admitted.
    fn allocate(&self, priority: Priority) -> SchedResult<ThreadId>;

    /// Release the record of a thread that is neither queued nor scheduled.
    ///
    /// A thread that was extracted but is still executing keeps its record
    /// until its processor dispatched away from it.
    fn free(&self, thread: ThreadId) -> SchedResult<()>;

    /// Make a ready thread known to the scheduler, after equally urgent peers.
    fn enqueue(&self, thread: ThreadId) -> Notifications;

    /// Make a ready thread known to the scheduler, before equally urgent peers.
    fn enqueue_first(&self, thread: ThreadId) -> Notifications;

    /// Remove a thread from scheduling consideration.
    ///
    /// If the thread owned a processor, the most urgent ready thread takes it.
    fn extract(&self, thread: ThreadId) -> Notifications;

    /// Hand the processor of an in-flight thread to the most urgent ready
    /// thread.
    fn schedule(&self, thread: ThreadId) -> Notifications;

    /// Move a thread behind its equally urgent peers.
    fn yield_thread(&self, thread: ThreadId) -> Notifications;

    /// Change the priority of a thread and re-place it.
    fn update(&self, thread: ThreadId, priority: Priority) -> Notifications;

    /// Start a new job of `thread` due `relative_deadline` ticks from now.
    ///
    /// A relative deadline of zero returns the thread to its initial priority.
    fn release_job(&self, thread: ThreadId, relative_deadline: u64) -> Notifications;

    /// Clock tick: advance time and charge executing threads their budget.
    fn tick(&self) -> Notifications;

    /// Bring-up only: make `thread` the scheduled and executing thread of `cpu`.
    ///
    /// A thread enqueued before `cpu` started and more urgent than `thread`
    /// becomes the heir of `cpu` right away.
    fn start_idle(&self, thread: ThreadId, cpu: CpuId) -> SchedResult<()>;

    /// Dispatch point of `cpu`.
    fn dispatch(&self, cpu: CpuId) -> Option<Switch>;

    /// Number of processors managed by this instance.
    fn processor_count(&self) -> usize;

    /// Compare two priorities; `Ordering::Less` means `a` is more urgent.
    fn priority_compare(&self, a: Priority, b: Priority) -> Ordering {
        time::priority_compare(a, b)
    }

    /// A thread blocks: it leaves the scheduler until unblocked.
    fn block(&self, thread: ThreadId) -> Notifications {
        self.extract(thread)
    }

    /// A blocked thread becomes ready again.
    fn unblock(&self, thread: ThreadId) -> Notifications {
        self.enqueue(thread)
    }

    /// Get scheduler statistics.
    fn stats(&self) -> SchedulerStats {
        SchedulerStats::default()
    }
}
