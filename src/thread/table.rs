//! Fixed-size arena of thread records.
//!
//! Sized once at scheduler initialization, like the kernel workspace the
//! records would otherwise be carved from. Slots are claimed lock-free.

use alloc::boxed::Box;
use alloc::vec::Vec;

use portable_atomic::{AtomicUsize, Ordering};

use super::{ThreadId, ThreadRecord};
use crate::errors::{SchedError, SchedResult};
use crate::time::Priority;

pub struct ThreadTable {
    slots: Box<[ThreadRecord]>,
    live: AtomicUsize,
}

impl ThreadTable {
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        for _ in 0..capacity {
            slots.push(ThreadRecord::new());
        }
        Self {
            slots: slots.into_boxed_slice(),
            live: AtomicUsize::new(0),
        }
    }

    /// Claim a record for a new thread.
    ///
    /// Fails with [`SchedError::NoStorage`] when every slot is in use; the
    /// caller must not admit the thread.
    pub fn allocate(&self, priority: Priority, quantum: u32) -> SchedResult<ThreadId> {
        for (index, slot) in self.slots.iter().enumerate() {
            if slot.claim(priority, quantum) {
                self.live.fetch_add(1, Ordering::AcqRel);
                return Ok(ThreadId::from_index(index));
            }
        }
        Err(SchedError::NoStorage)
    }

    /// Return a record to the arena.
    pub fn free(&self, id: ThreadId) {
        let slot = self.get(id);
        if slot.is_allocated() {
            slot.release();
            self.live.fetch_sub(1, Ordering::AcqRel);
        }
    }

    /// Record of `id`.
    ///
    /// `id` must have been produced by this table.
    pub fn get(&self, id: ThreadId) -> &ThreadRecord {
        &self.slots[id.index()]
    }

    pub fn contains(&self, id: ThreadId) -> bool {
        self.slots
            .get(id.index())
            .map_or(false, ThreadRecord::is_allocated)
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of allocated records.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_until_exhausted() {
        let table = ThreadTable::new(2);
        let a = table.allocate(Priority::from_deadline(1), 0).unwrap();
        let b = table.allocate(Priority::from_deadline(2), 0).unwrap();
        assert_ne!(a, b);
        assert_eq!(table.live(), 2);
        assert_eq!(
            table.allocate(Priority::from_deadline(3), 0),
            Err(SchedError::NoStorage)
        );
    }

    #[test]
    fn test_free_makes_slot_reusable() {
        let table = ThreadTable::new(1);
        let a = table.allocate(Priority::IDLE, 0).unwrap();
        table.free(a);
        assert_eq!(table.live(), 0);
        assert!(!table.contains(a));

        let b = table.allocate(Priority::from_deadline(7), 0).unwrap();
        assert_eq!(a, b);
        assert_eq!(table.get(b).priority(), Priority::from_deadline(7));
    }

    #[test]
    fn test_double_free_is_harmless() {
        let table = ThreadTable::new(1);
        let a = table.allocate(Priority::IDLE, 0).unwrap();
        table.free(a);
        table.free(a);
        assert_eq!(table.live(), 0);
    }
}
