//! Processor allocation: hand the processor of one thread to another.

use super::percpu::Processors;
use super::{CpuId, Notifications};
use crate::thread::{ThreadId, ThreadTable};

/// Bind `incoming` to the processor `outgoing` holds.
///
/// If `incoming` is still executing somewhere (it lost its processor but
/// that processor has not dispatched yet), it stays where it is: it becomes
/// the heir of its own processor again and the thread that processor was
/// about to switch to moves to `outgoing`'s processor instead. This keeps a
/// processor from losing track of a thread that is mid-dispatch on it.
///
/// A processor other than `current` that gets a new heir is added to the
/// interrupt list of `notes`.
pub(crate) fn allocate_processor(
    threads: &ThreadTable,
    processors: &Processors,
    incoming: ThreadId,
    outgoing: ThreadId,
    current: CpuId,
    notes: &mut Notifications,
) {
    let scheduled = threads.get(incoming);
    let victim = threads.get(outgoing);
    let cpu_of_scheduled = scheduled.cpu();
    let cpu_of_victim = victim.cpu();

    scheduled.set_scheduled(true);
    victim.set_scheduled(false);

    let heir = if scheduled.is_executing() {
        let mut block = processors[cpu_of_scheduled].acquire();
        // an executing thread's processor is never vacant
        debug_assert!(block.heir.is_some(), "cpu {} has no heir", cpu_of_scheduled);
        block.heir.replace(incoming).unwrap_or(incoming)
    } else {
        incoming
    };

    if heir != outgoing {
        threads.get(heir).set_cpu(cpu_of_victim);
        {
            let mut block = processors[cpu_of_victim].acquire();
            block.heir = Some(heir);
            block.dispatch_necessary = true;
        }
        if cpu_of_victim != current {
            notes.request_interrupt(cpu_of_victim);
        }
    }
    log::trace!(
        "allocate cpu {}: {} replaces {} (heir {})",
        cpu_of_victim,
        incoming,
        outgoing,
        heir
    );
}

/// Bind `thread` to a processor that has no scheduled thread.
pub(crate) fn assign_vacant(
    threads: &ThreadTable,
    processors: &Processors,
    thread: ThreadId,
    cpu: CpuId,
    current: CpuId,
    notes: &mut Notifications,
) {
    let record = threads.get(thread);
    record.set_scheduled(true);
    if record.is_executing() && record.cpu() == cpu {
        processors[cpu].acquire().heir = Some(thread);
    } else {
        record.set_cpu(cpu);
        let mut block = processors[cpu].acquire();
        block.heir = Some(thread);
        block.dispatch_necessary = true;
        if cpu != current {
            notes.request_interrupt(cpu);
        }
    }
    notes.claim(cpu);
    log::trace!("assign vacant cpu {} to {}", cpu, thread);
}
