//! Kernel abstraction for driving a scheduler instance.
//!
//! The kernel owns exactly one scheduler instance and calls it on behalf of
//! the thread subsystem. Scheduler operations only report which processors
//! need a reschedule interrupt; the kernel sends them once the operation has
//! returned and its locks are released.

use alloc::vec::Vec;
use core::marker::PhantomData;

use portable_atomic::{AtomicBool, Ordering};
use spin::Mutex;

use crate::arch::Arch;
use crate::errors::{InitError, SchedError, SchedResult};
use crate::sched::{CpuId, Notifications, Scheduler, SchedulerStats, Switch};
use crate::thread::ThreadId;
use crate::time::Priority;

/// Main kernel handle that manages the scheduler.
///
/// # Type Parameters
///
/// * `A` - Architecture implementation
/// * `S` - Scheduler implementation
pub struct Kernel<A: Arch, S: Scheduler> {
    /// Scheduler instance
    scheduler: S,
    /// Architecture marker (zero-sized)
    _arch: PhantomData<fn() -> A>,
    /// Whether every processor has received its idle thread
    started: AtomicBool,
    /// Threads deleted while still running, freed once switched away from
    retired: Mutex<Vec<ThreadId>>,
}

impl<A: Arch, S: Scheduler> Kernel<A, S> {
    /// Create a new kernel instance around `scheduler`.
    pub const fn new(scheduler: S) -> Self {
        Self {
            scheduler,
            _arch: PhantomData,
            started: AtomicBool::new(false),
            retired: Mutex::new(Vec::new()),
        }
    }

    /// Start every processor with its idle thread.
    ///
    /// `idle_threads[i]` becomes the first thread of processor `i`, so there
    /// must be exactly one per processor. Can only succeed once.
    pub fn bring_up(&self, idle_threads: &[ThreadId]) -> SchedResult<()> {
        let processors = self.scheduler.processor_count();
        if idle_threads.len() != processors {
            return Err(InitError::IdleThreadMismatch {
                idle: idle_threads.len(),
                processors,
            }
            .into());
        }
        if self
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SchedError::AlreadyStarted);
        }
        for (cpu, &thread) in idle_threads.iter().enumerate() {
            self.scheduler.start_idle(thread, cpu)?;
        }
        log::debug!("kernel: {} processors started", processors);
        Ok(())
    }

    /// Check if the processors have been started.
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Get a reference to the scheduler.
    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Admit a new ready thread of the given priority.
    pub fn spawn(&self, priority: Priority) -> SchedResult<ThreadId> {
        let thread = self.scheduler.allocate(priority)?;
        self.deliver(self.scheduler.enqueue(thread));
        Ok(thread)
    }

    /// Take a thread out of scheduling until it is unblocked.
    pub fn block(&self, thread: ThreadId) {
        self.deliver(self.scheduler.block(thread));
    }

    pub fn unblock(&self, thread: ThreadId) {
        self.deliver(self.scheduler.unblock(thread));
    }

    /// Let equally urgent threads run before `thread`.
    pub fn yield_now(&self, thread: ThreadId) {
        self.deliver(self.scheduler.yield_thread(thread));
    }

    pub fn set_priority(&self, thread: ThreadId, priority: Priority) {
        self.deliver(self.scheduler.update(thread, priority));
    }

    /// Start the next job of a periodic thread.
    pub fn release_job(&self, thread: ThreadId, relative_deadline: u64) {
        self.deliver(self.scheduler.release_job(thread, relative_deadline));
    }

    /// Handle a clock tick.
    ///
    /// This should be called from the timer interrupt handler of one
    /// processor.
    pub fn tick(&self) {
        self.deliver(self.scheduler.tick());
    }

    /// Remove a thread from scheduling and release its record.
    ///
    /// A thread deleting itself is still executing; its record is released
    /// by the dispatch that switches its processor away from it.
    pub fn delete(&self, thread: ThreadId) -> SchedResult<()> {
        self.deliver(self.scheduler.extract(thread));
        // held across `free` so a concurrent dispatch cannot miss the thread
        let mut retired = self.retired.lock();
        match self.scheduler.free(thread) {
            Err(SchedError::StillExecuting(_)) => {
                log::debug!("kernel: {} deleted while running", thread);
                retired.push(thread);
                Ok(())
            }
            result => result,
        }
    }

    /// Dispatch point of `cpu`; returns the switch the processor must make.
    pub fn dispatch(&self, cpu: CpuId) -> Option<Switch> {
        let switch = self.scheduler.dispatch(cpu)?;
        if let Some(from) = switch.from {
            self.reap(from);
        }
        Some(switch)
    }

    fn reap(&self, thread: ThreadId) {
        let mut retired = self.retired.lock();
        if let Some(pos) = retired.iter().position(|&t| t == thread) {
            retired.swap_remove(pos);
            if let Err(e) = self.scheduler.free(thread) {
                log::warn!("kernel: cannot release deleted thread {}: {}", thread, e);
            }
        }
    }

    /// Get current scheduler statistics.
    pub fn stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }

    fn deliver(&self, notes: Notifications) {
        if !notes.vacated().is_empty() {
            log::warn!("processors {:?} are left without a thread", notes.vacated());
        }
        notes.deliver::<A>();
    }
}
