//! Processor sets and the pending-notification output of scheduler operations.
//!
//! Scheduler operations mutate heir slots but never raise interrupts
//! themselves. They return the processors that must be signaled, and the
//! caller delivers the interrupts once the scheduler locks are dropped.

use core::fmt;

use super::CpuId;
use crate::arch::Arch;

/// Set of processors, one bit per processor index.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CpuMask(u64);

impl CpuMask {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, cpu: CpuId) {
        debug_assert!(cpu < 64);
        self.0 |= 1 << cpu;
    }

    pub fn remove(&mut self, cpu: CpuId) {
        debug_assert!(cpu < 64);
        self.0 &= !(1 << cpu);
    }

    pub fn contains(&self, cpu: CpuId) -> bool {
        cpu < 64 && self.0 & (1 << cpu) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Remove and return the lowest processor in the set.
    pub fn pop_first(&mut self) -> Option<CpuId> {
        if self.0 == 0 {
            return None;
        }
        let cpu = self.0.trailing_zeros() as CpuId;
        self.0 &= self.0 - 1;
        Some(cpu)
    }

    pub fn union(self, other: CpuMask) -> CpuMask {
        CpuMask(self.0 | other.0)
    }

    pub fn iter(&self) -> CpuMaskIter {
        CpuMaskIter(*self)
    }
}

impl fmt::Debug for CpuMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl IntoIterator for CpuMask {
    type Item = CpuId;
    type IntoIter = CpuMaskIter;

    fn into_iter(self) -> CpuMaskIter {
        CpuMaskIter(self)
    }
}

/// Iterator over the processors of a [`CpuMask`], lowest first.
pub struct CpuMaskIter(CpuMask);

impl Iterator for CpuMaskIter {
    type Item = CpuId;

    fn next(&mut self) -> Option<CpuId> {
        self.0.pop_first()
    }
}

/// Side effects a scheduler operation left for its caller to carry out.
#[must_use = "processors listed in `interrupts` must be signaled"]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Notifications {
    interrupts: CpuMask,
    vacated: CpuMask,
}

impl Notifications {
    pub const fn none() -> Self {
        Self {
            interrupts: CpuMask::empty(),
            vacated: CpuMask::empty(),
        }
    }

    /// `cpu` has a new heir and is not the processor that made the change.
    pub fn request_interrupt(&mut self, cpu: CpuId) {
        self.interrupts.insert(cpu);
    }

    /// `cpu` lost its scheduled thread and nothing was ready to replace it.
    pub fn vacate(&mut self, cpu: CpuId) {
        self.vacated.insert(cpu);
    }

    pub fn claim(&mut self, cpu: CpuId) {
        self.vacated.remove(cpu);
    }

    pub fn interrupts(&self) -> CpuMask {
        self.interrupts
    }

    pub fn vacated(&self) -> CpuMask {
        self.vacated
    }

    pub fn is_empty(&self) -> bool {
        self.interrupts.is_empty() && self.vacated.is_empty()
    }

    pub fn merge(&mut self, other: Notifications) {
        self.interrupts = self.interrupts.union(other.interrupts);
        self.vacated = self.vacated.union(other.vacated);
    }

    /// Send every requested inter-processor interrupt.
    pub fn deliver<A: Arch>(self) {
        for cpu in self.interrupts {
            log::trace!("reschedule interrupt -> cpu {}", cpu);
            A::send_interrupt(cpu);
        }
    }
}
