//! Global earliest-deadline-first scheduler.
//!
//! The P most urgent ready threads own the P processors. Threads that own a
//! processor are kept in the [`ScheduledSet`], ordered most urgent first so
//! the eviction candidate is its tail; all other ready threads wait in the
//! [`ReadyQueue`]. Every operation keeps a thread linked into exactly one of
//! the two, and moves a thread between them only together with a processor
//! exchange.
//!
//! # Locking
//!
//! Each operation holds the scheduled-set lock for its whole duration, which
//! serializes operations against each other and against dispatch points. The
//! ready-queue lock is taken inside it only around a single structural change
//! or a read of the most urgent ready thread. Per-processor locks come last
//! and are never nested.

use alloc::vec::Vec;
use core::marker::PhantomData;

use spin::Mutex;

use super::allocator::{allocate_processor, assign_vacant};
use super::percpu::{PerCpu, Processors, Switch};
use super::ready::ReadyQueue;
use super::scheduled::ScheduledSet;
use super::trait_def::{CpuId, Scheduler, SchedulerStats};
use super::Notifications;
use crate::arch::{Arch, InterruptGuard};
use crate::config::SchedulerConfig;
use crate::errors::{SchedError, SchedResult};
use crate::thread::{Location, ThreadId, ThreadInfo, ThreadTable};
use crate::time::{release_priority, Priority, TickCounter};

/// Position of a thread among equally urgent peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TieBreak {
    /// Behind equally urgent peers
    #[default]
    Fifo,
    /// In front of equally urgent peers
    Lifo,
}

impl TieBreak {
    /// Whether a thread of priority `a` goes in front of one of priority `b`.
    pub fn precedes(self, a: Priority, b: Priority) -> bool {
        match self {
            TieBreak::Fifo => a.is_more_urgent_than(b),
            TieBreak::Lifo => a <= b,
        }
    }
}

/// One G-EDF scheduler instance.
///
/// Created once by the kernel and shared by reference between processors.
/// `A` supplies the identity of the calling processor and interrupt masking.
pub struct GlobalEdf<A: Arch> {
    config: SchedulerConfig,
    threads: ThreadTable,
    scheduled: Mutex<ScheduledSet>,
    ready: Mutex<ReadyQueue>,
    processors: Processors,
    clock: TickCounter,
    _arch: PhantomData<fn() -> A>,
}

impl<A: Arch> GlobalEdf<A> {
    /// Create an instance for `config`.
    ///
    /// The processors have no scheduled thread until each one received its
    /// idle thread through [`Scheduler::start_idle`].
    pub fn new(config: SchedulerConfig) -> SchedResult<Self> {
        config.validate()?;
        let capacity = config.max_threads();
        log::debug!(
            "global-edf: {} processors, {} thread records, timeslice {:?}",
            config.processors(),
            capacity,
            config.timeslice()
        );
        Ok(Self {
            threads: ThreadTable::new(capacity),
            scheduled: Mutex::new(ScheduledSet::new(capacity)),
            ready: Mutex::new(ReadyQueue::new(capacity)),
            processors: Processors::new(config.processors()),
            clock: TickCounter::new(),
            config,
            _arch: PhantomData,
        })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn threads(&self) -> &ThreadTable {
        &self.threads
    }

    /// Enqueue `thread` with an explicit tie-break.
    pub fn enqueue_ordered(&self, thread: ThreadId, order: TieBreak) -> Notifications {
        let mut set = self.scheduled.lock();
        let mut notes = Notifications::none();
        self.enqueue_locked(&mut set, thread, order, A::current_cpu(), &mut notes);
        notes
    }

    fn enqueue_locked(
        &self,
        set: &mut ScheduledSet,
        thread: ThreadId,
        order: TieBreak,
        current: CpuId,
        notes: &mut Notifications,
    ) {
        let record = self.threads.get(thread);
        if record.take_in_flight() {
            self.enqueue_in_flight(set, thread, order, current, notes);
            return;
        }

        let own = record.cpu();
        let vacant = if set.vacant().contains(own) {
            set.reoccupy(own);
            Some(own)
        } else {
            set.claim_vacant()
        };
        if let Some(cpu) = vacant {
            assign_vacant(&self.threads, &self.processors, thread, cpu, current, notes);
            self.link_scheduled(set, thread, order);
            return;
        }

        match set.lowest() {
            Some(lowest) if order.precedes(record.priority(), self.threads.get(lowest).priority()) => {
                allocate_processor(&self.threads, &self.processors, thread, lowest, current, notes);
                set.extract(lowest);
                self.link_scheduled(set, thread, order);
                self.ready.lock().insert(lowest, self.threads.get(lowest));
                log::trace!("enqueue {}: admitted, {} preempted", thread, lowest);
            }
            Some(_) => {
                self.ready.lock().insert(thread, record);
                log::trace!("enqueue {}: ready", thread);
            }
            None => {
                log::warn!("enqueue {} before any processor was started", thread);
                self.ready.lock().insert(thread, record);
            }
        }
    }

    /// The thread still owns its processor but is linked nowhere.
    fn enqueue_in_flight(
        &self,
        set: &mut ScheduledSet,
        thread: ThreadId,
        order: TieBreak,
        current: CpuId,
        notes: &mut Notifications,
    ) {
        let record = self.threads.get(thread);
        let best = self.ready.lock().first();
        match best {
            Some(best) if self.threads.get(best).priority().is_more_urgent_than(record.priority()) => {
                allocate_processor(&self.threads, &self.processors, best, thread, current, notes);
                self.move_ready_to_scheduled(set, best);
                self.ready.lock().insert(thread, record);
                log::trace!("enqueue {}: in flight, {} takes its processor", thread, best);
            }
            _ => self.link_scheduled(set, thread, order),
        }
    }

    fn link_scheduled(&self, set: &mut ScheduledSet, thread: ThreadId, order: TieBreak) {
        let threads = &self.threads;
        let priority = threads.get(thread).priority();
        set.insert_ordered(thread, |member| {
            order.precedes(priority, threads.get(member).priority())
        });
        threads.get(thread).set_location(Location::ScheduledSet);
    }

    fn move_ready_to_scheduled(&self, set: &mut ScheduledSet, thread: ThreadId) {
        let removed = self.ready.lock().remove(thread, self.threads.get(thread));
        debug_assert!(removed, "thread {} was not ready", thread);
        self.link_scheduled(set, thread, TieBreak::Fifo);
    }

    fn extract_locked(
        &self,
        set: &mut ScheduledSet,
        thread: ThreadId,
        current: CpuId,
        notes: &mut Notifications,
    ) {
        let record = self.threads.get(thread);
        if !set.extract(thread) {
            // no-op for a thread that never was ready
            self.ready.lock().remove(thread, record);
        }
        record.set_in_flight(false);
        if record.is_scheduled() {
            self.release_processor(set, thread, current, notes);
        }
    }

    /// `thread` gives up its processor to the most urgent ready thread.
    fn release_processor(
        &self,
        set: &mut ScheduledSet,
        thread: ThreadId,
        current: CpuId,
        notes: &mut Notifications,
    ) {
        let best = self.ready.lock().first();
        match best {
            Some(best) => {
                allocate_processor(&self.threads, &self.processors, best, thread, current, notes);
                self.move_ready_to_scheduled(set, best);
            }
            None => {
                let record = self.threads.get(thread);
                let cpu = record.cpu();
                record.set_scheduled(false);
                {
                    let mut block = self.processors[cpu].acquire();
                    block.heir = None;
                    block.dispatch_necessary = false;
                }
                set.vacate(cpu);
                notes.vacate(cpu);
                log::debug!("cpu {}: {} left with nothing ready", cpu, thread);
            }
        }
    }

    fn yield_locked(&self, set: &mut ScheduledSet, thread: ThreadId, current: CpuId) -> Notifications {
        let mut notes = Notifications::none();
        self.extract_locked(set, thread, current, &mut notes);
        self.enqueue_locked(set, thread, TieBreak::Fifo, current, &mut notes);
        notes
    }

    /// Scheduled threads, most urgent first.
    pub fn scheduled_threads(&self) -> Vec<ThreadId> {
        self.scheduled.lock().iter().collect()
    }

    /// Ready threads, most urgent first.
    pub fn ready_threads(&self) -> Vec<ThreadId> {
        self.ready.lock().iter().collect()
    }

    pub fn highest_ready(&self) -> Option<ThreadId> {
        self.ready.lock().first()
    }

    pub fn lowest_scheduled(&self) -> Option<ThreadId> {
        self.scheduled.lock().lowest()
    }

    /// Snapshot of an allocated thread.
    pub fn thread(&self, thread: ThreadId) -> Option<ThreadInfo> {
        if !self.threads.contains(thread) {
            return None;
        }
        Some(self.threads.get(thread).snapshot(thread))
    }

    pub fn processor(&self, cpu: CpuId) -> Option<PerCpu> {
        self.processors.get(cpu).map(|processor| processor.snapshot())
    }

    /// Ticks since the scheduler was created.
    pub fn now(&self) -> u64 {
        self.clock.ticks()
    }
}

impl<A: Arch> Scheduler for GlobalEdf<A> {
    fn allocate(&self, priority: Priority) -> SchedResult<ThreadId> {
        let quantum = self.config.timeslice().unwrap_or(0);
        let thread = self.threads.allocate(priority, quantum)?;
        log::trace!("allocate {} at {}", thread, priority);
        Ok(thread)
    }

    fn free(&self, thread: ThreadId) -> SchedResult<()> {
        let set = self.scheduled.lock();
        let record = self.threads.get(thread);
        let queued = self.ready.lock().contains(thread);
        if set.contains(thread) || queued || record.is_scheduled() || record.is_in_flight() {
            return Err(SchedError::StillPlaced(thread));
        }
        // dispatch clears the flag under this lock
        if record.is_executing() {
            return Err(SchedError::StillExecuting(thread));
        }
        self.threads.free(thread);
        Ok(())
    }

    fn enqueue(&self, thread: ThreadId) -> Notifications {
        self.enqueue_ordered(thread, TieBreak::Fifo)
    }

    fn enqueue_first(&self, thread: ThreadId) -> Notifications {
        self.enqueue_ordered(thread, TieBreak::Lifo)
    }

    fn extract(&self, thread: ThreadId) -> Notifications {
        let mut set = self.scheduled.lock();
        let mut notes = Notifications::none();
        self.extract_locked(&mut set, thread, A::current_cpu(), &mut notes);
        if !notes.vacated().is_empty() {
            log::warn!("extract {}: processors {:?} have no thread", thread, notes.vacated());
        }
        notes
    }

    fn schedule(&self, thread: ThreadId) -> Notifications {
        let mut set = self.scheduled.lock();
        let mut notes = Notifications::none();
        let record = self.threads.get(thread);
        if !record.take_in_flight() {
            return notes;
        }
        let best = self.ready.lock().first();
        match best {
            Some(best) => {
                allocate_processor(
                    &self.threads,
                    &self.processors,
                    best,
                    thread,
                    A::current_cpu(),
                    &mut notes,
                );
                self.move_ready_to_scheduled(&mut set, best);
                self.ready.lock().insert(thread, record);
            }
            None => self.link_scheduled(&mut set, thread, TieBreak::Fifo),
        }
        notes
    }

    fn yield_thread(&self, thread: ThreadId) -> Notifications {
        let _irq = InterruptGuard::<A>::new();
        let mut set = self.scheduled.lock();
        self.yield_locked(&mut set, thread, A::current_cpu())
    }

    fn update(&self, thread: ThreadId, priority: Priority) -> Notifications {
        let mut set = self.scheduled.lock();
        let mut notes = Notifications::none();
        let record = self.threads.get(thread);
        if set.extract(thread) {
            record.set_in_flight(true);
            record.set_priority(priority);
            self.enqueue_locked(&mut set, thread, TieBreak::Fifo, A::current_cpu(), &mut notes);
            return notes;
        }
        let was_ready = self.ready.lock().remove(thread, record);
        record.set_priority(priority);
        if was_ready {
            self.enqueue_locked(&mut set, thread, TieBreak::Fifo, A::current_cpu(), &mut notes);
        }
        notes
    }

    fn release_job(&self, thread: ThreadId, relative_deadline: u64) -> Notifications {
        let initial = self.threads.get(thread).initial_priority();
        let priority = release_priority(self.clock.ticks(), relative_deadline, initial);
        log::trace!("release {}: priority {}", thread, priority);
        self.update(thread, priority)
    }

    fn tick(&self) -> Notifications {
        self.clock.increment();
        let _irq = InterruptGuard::<A>::new();
        let mut set = self.scheduled.lock();
        let current = A::current_cpu();
        let mut notes = Notifications::none();
        for processor in self.processors.iter() {
            let Some(thread) = processor.snapshot().executing else {
                continue;
            };
            // a thread blocked since its processor last dispatched is not charged
            if !set.contains(thread) {
                continue;
            }
            let record = self.threads.get(thread);
            if record.timeslice().consume() {
                record.timeslice().refill();
                log::trace!("cpu {}: budget of {} exhausted", processor.id(), thread);
                notes.merge(self.yield_locked(&mut set, thread, current));
            }
        }
        notes
    }

    fn start_idle(&self, thread: ThreadId, cpu: CpuId) -> SchedResult<()> {
        let processor = self.processors.get(cpu).ok_or(SchedError::InvalidCpu(cpu))?;
        let mut set = self.scheduled.lock();
        let record = self.threads.get(thread);
        record.set_scheduled(true);
        record.set_cpu(cpu);
        record.set_location(Location::ScheduledSet);
        record.timeslice().reset(0);
        set.append(thread);
        {
            let mut block = processor.acquire();
            block.heir = Some(thread);
            block.executing = Some(thread);
            block.dispatch_necessary = false;
        }
        record.set_executing(true);
        log::debug!("cpu {}: idle thread {}", cpu, thread);

        let best = self.ready.lock().first();
        if let Some(best) = best {
            if self.threads.get(best).priority().is_more_urgent_than(record.priority()) {
                // a starting processor dispatches before it runs anything
                let mut notes = Notifications::none();
                allocate_processor(&self.threads, &self.processors, best, thread, cpu, &mut notes);
                debug_assert!(notes.interrupts().is_empty());
                set.extract(thread);
                self.move_ready_to_scheduled(&mut set, best);
                self.ready.lock().insert(thread, record);
                log::debug!("cpu {}: {} was ready before bring-up", cpu, best);
            }
        }
        Ok(())
    }

    fn dispatch(&self, cpu: CpuId) -> Option<Switch> {
        let _set = self.scheduled.lock();
        self.processors.dispatch(cpu, &self.threads)
    }

    fn processor_count(&self) -> usize {
        self.processors.count()
    }

    fn stats(&self) -> SchedulerStats {
        let set = self.scheduled.lock();
        let ready = self.ready.lock().len();
        SchedulerStats {
            threads: self.threads.live(),
            scheduled: set.len(),
            ready,
            vacant: set.vacant().len(),
        }
    }
}
