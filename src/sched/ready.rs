//! Ready queue: threads that are ready but hold no processor.
//!
//! A balanced search tree keyed by (priority, insertion sequence). Lower
//! priority values are more urgent, so the natural ascending key order puts
//! the most urgent thread at the leftmost position. Equal priorities keep
//! insertion order.
//!
//! The tree nodes are per-thread: `nodes[i]` is the key thread slot `i` is
//! linked under, which is how a thread is found again for removal.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::vec;

use crate::thread::{Location, PresenceState, ThreadId, ThreadRecord};
use crate::time::Priority;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct ReadyKey {
    priority: Priority,
    seq: u64,
}

pub struct ReadyQueue {
    tree: BTreeMap<ReadyKey, ThreadId>,
    nodes: Box<[Option<ReadyKey>]>,
    next_seq: u64,
}

impl ReadyQueue {
    /// Empty queue able to link `capacity` thread slots.
    pub fn new(capacity: usize) -> Self {
        Self {
            tree: BTreeMap::new(),
            nodes: vec![None; capacity].into_boxed_slice(),
            next_seq: 0,
        }
    }

    /// Link `id` under its current priority.
    ///
    /// The thread must not already be linked.
    pub fn insert(&mut self, id: ThreadId, record: &ThreadRecord) {
        debug_assert!(self.nodes[id.index()].is_none(), "thread {} already ready", id);
        let key = ReadyKey {
            priority: record.priority(),
            seq: self.next_seq,
        };
        self.next_seq = self.next_seq.wrapping_add(1);
        self.tree.insert(key, id);
        self.nodes[id.index()] = Some(key);
        record.set_location(Location::ReadyQueue);
        record.set_presence(PresenceState::Present);
    }

    /// Unlink `id`. Returns `false` if it was not linked, which covers a
    /// thread that was never present.
    pub fn remove(&mut self, id: ThreadId, record: &ThreadRecord) -> bool {
        match self.nodes[id.index()].take() {
            Some(key) => {
                let removed = self.tree.remove(&key);
                debug_assert_eq!(removed, Some(id));
                record.set_presence(PresenceState::NotPresentlyPresent);
                true
            }
            None => false,
        }
    }

    /// Most urgent ready thread.
    pub fn first(&self) -> Option<ThreadId> {
        self.tree.values().next().copied()
    }

    pub fn contains(&self, id: ThreadId) -> bool {
        self.nodes.get(id.index()).map_or(false, Option::is_some)
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Ready threads, most urgent first.
    pub fn iter(&self) -> impl Iterator<Item = ThreadId> + '_ {
        self.tree.values().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thread::ThreadTable;
    use alloc::vec::Vec;

    fn table_with(priorities: &[u64]) -> (ThreadTable, Vec<ThreadId>) {
        let table = ThreadTable::new(priorities.len());
        let ids = priorities
            .iter()
            .map(|&p| table.allocate(Priority::from_deadline(p), 0).unwrap())
            .collect();
        (table, ids)
    }

    #[test]
    fn test_first_is_most_urgent() {
        let (table, ids) = table_with(&[30, 10, 20]);
        let mut queue = ReadyQueue::new(table.capacity());
        assert!(queue.first().is_none());
        for &id in &ids {
            queue.insert(id, table.get(id));
        }
        assert_eq!(queue.first(), Some(ids[1]));
        let order: Vec<ThreadId> = queue.iter().collect();
        assert_eq!(order, alloc::vec![ids[1], ids[2], ids[0]]);
    }

    #[test]
    fn test_equal_priorities_are_fifo() {
        let (table, ids) = table_with(&[5, 5, 5]);
        let mut queue = ReadyQueue::new(table.capacity());
        queue.insert(ids[2], table.get(ids[2]));
        queue.insert(ids[0], table.get(ids[0]));
        queue.insert(ids[1], table.get(ids[1]));
        let order: Vec<ThreadId> = queue.iter().collect();
        assert_eq!(order, alloc::vec![ids[2], ids[0], ids[1]]);
    }

    #[test]
    fn test_presence_transitions() {
        let (table, ids) = table_with(&[1]);
        let id = ids[0];
        let record = table.get(id);
        let mut queue = ReadyQueue::new(table.capacity());

        assert_eq!(record.presence(), PresenceState::NeverPresent);
        assert!(!queue.remove(id, record));
        assert_eq!(record.presence(), PresenceState::NeverPresent);

        queue.insert(id, record);
        assert_eq!(record.presence(), PresenceState::Present);
        assert_eq!(record.location(), Location::ReadyQueue);
        assert!(queue.contains(id));

        assert!(queue.remove(id, record));
        assert_eq!(record.presence(), PresenceState::NotPresentlyPresent);
        assert!(!queue.remove(id, record));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_remove_uses_key_from_insertion() {
        let (table, ids) = table_with(&[8, 9]);
        let mut queue = ReadyQueue::new(table.capacity());
        queue.insert(ids[0], table.get(ids[0]));
        queue.insert(ids[1], table.get(ids[1]));

        // Priority changed while linked; removal still finds the node
        table.get(ids[0]).set_priority(Priority::from_deadline(100));
        assert!(queue.remove(ids[0], table.get(ids[0])));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.first(), Some(ids[1]));
    }
}
