//! Test helper utilities and common functionality.

use alloc::collections::BTreeSet;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

use crate::arch::Arch;
use crate::config::SchedulerConfig;
use crate::sched::{CpuId, GlobalEdf, Scheduler};
use crate::thread::{Location, PresenceState, ThreadId};
use crate::time::Priority;

std::thread_local! {
    static CURRENT_CPU: Cell<CpuId> = Cell::new(0);
    static INTERRUPTS_ENABLED: Cell<bool> = Cell::new(true);
    static SENT: RefCell<Vec<CpuId>> = RefCell::new(Vec::new());
}

/// Architecture whose processor identity and interrupt log are per test
/// thread, so parallel tests do not observe each other.
pub(crate) struct TestArch;

impl TestArch {
    /// Act as processor `cpu` from now on.
    pub(crate) fn run_on(cpu: CpuId) {
        CURRENT_CPU.with(|current| current.set(cpu));
    }

    /// Interrupts delivered so far, oldest first; clears the log.
    pub(crate) fn take_sent() -> Vec<CpuId> {
        SENT.with(|sent| core::mem::take(&mut *sent.borrow_mut()))
    }
}

impl Arch for TestArch {
    fn enable_interrupts() {
        INTERRUPTS_ENABLED.with(|enabled| enabled.set(true));
    }

    fn disable_interrupts() {
        INTERRUPTS_ENABLED.with(|enabled| enabled.set(false));
    }

    fn interrupts_enabled() -> bool {
        INTERRUPTS_ENABLED.with(Cell::get)
    }

    fn current_cpu() -> CpuId {
        CURRENT_CPU.with(Cell::get)
    }

    fn send_interrupt(cpu: CpuId) {
        assert_ne!(cpu, Self::current_cpu(), "interrupt sent to the current processor");
        SENT.with(|sent| sent.borrow_mut().push(cpu));
    }
}

pub(crate) type TestEdf = GlobalEdf<TestArch>;

/// Scheduler with every processor running an idle thread.
pub(crate) fn started(processors: usize, max_threads: usize) -> (TestEdf, Vec<ThreadId>) {
    TestArch::run_on(0);
    TestArch::take_sent();
    let edf = TestEdf::new(SchedulerConfig::new(processors, max_threads))
        .expect("valid test configuration");
    let idle = (0..processors)
        .map(|cpu| {
            let thread = edf.allocate(Priority::IDLE).expect("idle thread record");
            edf.start_idle(thread, cpu).expect("idle thread start");
            thread
        })
        .collect();
    (edf, idle)
}

/// Allocate and enqueue a thread, delivering the resulting interrupts.
pub(crate) fn spawn(edf: &TestEdf, deadline: u64) -> ThreadId {
    let thread = edf
        .allocate(Priority::from_deadline(deadline))
        .expect("thread record");
    edf.enqueue(thread).deliver::<TestArch>();
    thread
}

/// Check every structural invariant observable through the public API.
///
/// `placed` is the set of threads the caller expects to be known to the
/// scheduler (enqueued and not extracted since).
pub(crate) fn check_invariants(edf: &TestEdf, placed: &BTreeSet<ThreadId>) {
    let scheduled = edf.scheduled_threads();
    let ready = edf.ready_threads();
    let stats = edf.stats();

    // every placed thread is in exactly one structure
    let scheduled_set: BTreeSet<ThreadId> = scheduled.iter().copied().collect();
    let ready_set: BTreeSet<ThreadId> = ready.iter().copied().collect();
    assert_eq!(scheduled_set.len(), scheduled.len(), "duplicate scheduled entry");
    assert_eq!(ready_set.len(), ready.len(), "duplicate ready entry");
    assert!(scheduled_set.is_disjoint(&ready_set));
    let all: BTreeSet<ThreadId> = scheduled_set.union(&ready_set).copied().collect();
    assert_eq!(&all, placed);

    // every processor is owned by one scheduled thread or vacant
    assert_eq!(scheduled.len() + stats.vacant, edf.processor_count());
    assert_eq!(stats.scheduled, scheduled.len());
    assert_eq!(stats.ready, ready.len());

    let mut cpus = BTreeSet::new();
    for &thread in &scheduled {
        let info = edf.thread(thread).expect("scheduled thread is allocated");
        assert!(info.is_scheduled, "{} scheduled without the flag", thread);
        assert!(!info.in_flight);
        assert_eq!(info.location, Location::ScheduledSet);
        assert!(cpus.insert(info.cpu), "two threads own cpu {}", info.cpu);
        let processor = edf.processor(info.cpu).expect("valid cpu");
        assert_eq!(processor.heir, Some(thread), "cpu {} heir", info.cpu);
    }
    for &thread in &ready {
        let info = edf.thread(thread).expect("ready thread is allocated");
        assert!(!info.is_scheduled, "{} ready but scheduled", thread);
        assert_eq!(info.location, Location::ReadyQueue);
        assert_eq!(info.presence, PresenceState::Present);
    }

    // scheduled set runs from most to least urgent
    for pair in scheduled.windows(2) {
        let a = edf.thread(pair[0]).map(|info| info.priority);
        let b = edf.thread(pair[1]).map(|info| info.priority);
        assert!(a <= b, "scheduled set out of order: {:?} before {:?}", a, b);
    }

    // no ready thread is more urgent than a scheduled one
    if let (Some(&lowest), Some(&best)) = (scheduled.last(), ready.first()) {
        let lowest = edf.thread(lowest).map(|info| info.priority);
        let best = edf.thread(best).map(|info| info.priority);
        assert!(lowest <= best, "ready {:?} beats scheduled {:?}", best, lowest);
    }
}

/// Priority of `thread`, for readable assertions.
pub(crate) fn priority_of(edf: &TestEdf, thread: ThreadId) -> Priority {
    edf.thread(thread).expect("allocated thread").priority
}
