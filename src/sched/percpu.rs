//! Per-processor control blocks.
//!
//! Each processor has a heir slot (the thread it switches to at its next
//! dispatch point), the thread it is executing, and a dispatch-necessary
//! flag. All three live behind a lock private to that processor, separate
//! from the scheduler locks.

use alloc::boxed::Box;
use alloc::vec::Vec;

use spin::{Mutex, MutexGuard};

use super::CpuId;
use crate::thread::{ThreadId, ThreadTable};

/// Mutable part of a processor control block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PerCpu {
    pub heir: Option<ThreadId>,
    pub executing: Option<ThreadId>,
    pub dispatch_necessary: bool,
}

pub struct Processor {
    id: CpuId,
    state: Mutex<PerCpu>,
}

impl Processor {
    fn new(id: CpuId) -> Self {
        Self {
            id,
            state: Mutex::new(PerCpu::default()),
        }
    }

    pub fn id(&self) -> CpuId {
        self.id
    }

    /// Lock this control block until the guard is dropped.
    pub fn acquire(&self) -> MutexGuard<'_, PerCpu> {
        self.state.lock()
    }

    pub fn snapshot(&self) -> PerCpu {
        *self.state.lock()
    }
}

/// A thread switch performed at a dispatch point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Switch {
    pub cpu: CpuId,
    pub from: Option<ThreadId>,
    pub to: ThreadId,
}

/// Control blocks of all configured processors.
pub struct Processors {
    cpus: Box<[Processor]>,
}

impl Processors {
    pub fn new(count: usize) -> Self {
        let cpus: Vec<Processor> = (0..count).map(Processor::new).collect();
        Self {
            cpus: cpus.into_boxed_slice(),
        }
    }

    pub fn get(&self, cpu: CpuId) -> Option<&Processor> {
        self.cpus.get(cpu)
    }

    pub fn count(&self) -> usize {
        self.cpus.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Processor> {
        self.cpus.iter()
    }

    /// Dispatch point of `cpu`: make the heir the executing thread.
    ///
    /// Does nothing unless a dispatch was requested. A heir that is still
    /// executing on another processor is left pending until that processor
    /// has switched away from it.
    pub fn dispatch(&self, cpu: CpuId, threads: &ThreadTable) -> Option<Switch> {
        let mut block = self.cpus.get(cpu)?.acquire();
        if !block.dispatch_necessary {
            return None;
        }
        let heir = block.heir?;
        if block.executing == Some(heir) {
            block.dispatch_necessary = false;
            return None;
        }
        let incoming = threads.get(heir);
        if incoming.is_executing() {
            return None;
        }
        block.dispatch_necessary = false;
        let from = block.executing.replace(heir);
        if let Some(from) = from {
            threads.get(from).set_executing(false);
        }
        incoming.set_executing(true);
        incoming.set_cpu(cpu);
        log::debug!("cpu {}: dispatch {:?} -> {}", cpu, from, heir);
        Some(Switch { cpu, from, to: heir })
    }
}

impl core::ops::Index<CpuId> for Processors {
    type Output = Processor;

    fn index(&self, cpu: CpuId) -> &Processor {
        &self.cpus[cpu]
    }
}
