//! Property-based tests for verifying scheduler invariants.

#[cfg(test)]
mod property_tests {
    use crate::sched::{CpuId, Scheduler};
    use crate::tests::helpers::{check_invariants, started, TestArch, TestEdf};
    use crate::thread::ThreadId;
    use crate::time::Priority;
    use alloc::collections::BTreeSet;
    use alloc::vec::Vec;
    use proptest::prelude::*;

    const PROCESSORS: usize = 3;
    const MAX_THREADS: usize = 12;

    /// One scheduler call. Thread operands index the allocated threads.
    /// Deadlines start at 1 so `Priority::MOST_URGENT` beats every thread.
    #[derive(Debug, Clone)]
    enum Op {
        Spawn(u64),
        Block(usize),
        Unblock(usize, bool),
        Yield(usize),
        Update(usize, u64),
        ReleaseJob(usize, u64),
        Tick,
        Dispatch(CpuId),
        RunOn(CpuId),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => (1u64..20).prop_map(Op::Spawn),
            2 => any::<usize>().prop_map(Op::Block),
            2 => (any::<usize>(), any::<bool>()).prop_map(|(i, lifo)| Op::Unblock(i, lifo)),
            2 => any::<usize>().prop_map(Op::Yield),
            2 => (any::<usize>(), 1u64..20).prop_map(|(i, d)| Op::Update(i, d)),
            1 => (any::<usize>(), 0u64..20).prop_map(|(i, d)| Op::ReleaseJob(i, d)),
            1 => Just(Op::Tick),
            2 => (0..PROCESSORS).prop_map(Op::Dispatch),
            1 => (0..PROCESSORS).prop_map(Op::RunOn),
        ]
    }

    /// Threads the test knows about and which of them are enqueued.
    struct Model {
        threads: Vec<ThreadId>,
        placed: BTreeSet<ThreadId>,
    }

    impl Model {
        fn pick(&self, index: usize) -> Option<ThreadId> {
            if self.threads.is_empty() {
                None
            } else {
                Some(self.threads[index % self.threads.len()])
            }
        }
    }

    fn apply(edf: &TestEdf, model: &mut Model, op: &Op) {
        match *op {
            Op::Spawn(deadline) => {
                if let Ok(thread) = edf.allocate(Priority::from_deadline(deadline)) {
                    edf.enqueue(thread).deliver::<TestArch>();
                    model.threads.push(thread);
                    model.placed.insert(thread);
                }
            }
            Op::Block(i) => {
                if let Some(thread) = model.pick(i).filter(|t| model.placed.contains(t)) {
                    edf.block(thread).deliver::<TestArch>();
                    model.placed.remove(&thread);
                }
            }
            Op::Unblock(i, lifo) => {
                if let Some(thread) = model.pick(i).filter(|t| !model.placed.contains(t)) {
                    let notes = if lifo {
                        edf.enqueue_first(thread)
                    } else {
                        edf.unblock(thread)
                    };
                    notes.deliver::<TestArch>();
                    model.placed.insert(thread);
                }
            }
            Op::Yield(i) => {
                if let Some(thread) = model.pick(i).filter(|t| model.placed.contains(t)) {
                    edf.yield_thread(thread).deliver::<TestArch>();
                }
            }
            Op::Update(i, deadline) => {
                if let Some(thread) = model.pick(i) {
                    edf.update(thread, Priority::from_deadline(deadline))
                        .deliver::<TestArch>();
                }
            }
            Op::ReleaseJob(i, relative) => {
                if let Some(thread) = model.pick(i) {
                    edf.release_job(thread, relative).deliver::<TestArch>();
                }
            }
            Op::Tick => edf.tick().deliver::<TestArch>(),
            Op::Dispatch(cpu) => {
                let _ = edf.dispatch(cpu);
            }
            Op::RunOn(cpu) => TestArch::run_on(cpu),
        }
    }

    fn fresh() -> (TestEdf, Model) {
        let (edf, idle) = started(PROCESSORS, MAX_THREADS);
        let model = Model {
            placed: idle.iter().copied().collect(),
            threads: idle,
        };
        (edf, model)
    }

    proptest! {
        #[test]
        fn invariants_hold_after_every_operation(ops in proptest::collection::vec(op(), 1..60)) {
            let (edf, mut model) = fresh();
            for op in &ops {
                apply(&edf, &mut model, op);
                check_invariants(&edf, &model.placed);
            }
        }

        #[test]
        fn yield_never_changes_membership(
            ops in proptest::collection::vec(op(), 0..30),
            pick in any::<usize>(),
        ) {
            let (edf, mut model) = fresh();
            for op in &ops {
                apply(&edf, &mut model, op);
            }
            let placed: Vec<ThreadId> = model.placed.iter().copied().collect();
            if !placed.is_empty() {
                let thread = placed[pick % placed.len()];
                let before: BTreeSet<ThreadId> = edf.scheduled_threads().into_iter().collect();
                let _ = edf.yield_thread(thread);
                let after: BTreeSet<ThreadId> = edf.scheduled_threads().into_iter().collect();
                let priority = edf.thread(thread).map(|info| info.priority);

                // only an equally urgent peer can take the yielding thread's place
                for gone in before.difference(&after) {
                    assert_eq!(*gone, thread);
                }
                for new in after.difference(&before) {
                    assert_eq!(edf.thread(*new).map(|info| info.priority), priority);
                }
                check_invariants(&edf, &model.placed);
            }
        }

        #[test]
        fn most_urgent_thread_is_admitted(
            ops in proptest::collection::vec(op(), 0..30),
        ) {
            let (edf, mut model) = fresh();
            for op in &ops {
                apply(&edf, &mut model, op);
            }
            if let Ok(urgent) = edf.allocate(Priority::MOST_URGENT) {
                let vacant = edf.stats().vacant;
                let lowest = edf.lowest_scheduled();
                let _ = edf.enqueue(urgent);
                model.placed.insert(urgent);

                assert!(edf.scheduled_threads().contains(&urgent));
                if vacant == 0 {
                    let lowest = lowest.unwrap();
                    assert!(edf.ready_threads().contains(&lowest));
                }
                check_invariants(&edf, &model.placed);
            }
        }
    }
}
