//! Scheduled set: the threads that own a processor.
//!
//! A doubly-linked list over thread slots, most urgent at the head, so the
//! eviction candidate is always the tail. Ordered insertion walks the list
//! (bounded by the processor count); removal and `lowest` are O(1).

use alloc::boxed::Box;
use alloc::vec;

use super::{CpuId, CpuMask};
use crate::thread::ThreadId;

#[derive(Debug, Clone, Copy, Default)]
struct Link {
    prev: Option<ThreadId>,
    next: Option<ThreadId>,
    linked: bool,
}

pub struct ScheduledSet {
    links: Box<[Link]>,
    head: Option<ThreadId>,
    tail: Option<ThreadId>,
    len: usize,
    /// Processors whose thread was extracted with nothing ready to take over.
    vacant: CpuMask,
}

impl ScheduledSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            links: vec![Link::default(); capacity].into_boxed_slice(),
            head: None,
            tail: None,
            len: 0,
            vacant: CpuMask::empty(),
        }
    }

    /// Insert `id` before the first member it precedes, or at the tail.
    ///
    /// `precedes(member)` answers whether `id` goes in front of `member`;
    /// that predicate carries the FIFO/LIFO tie-break.
    pub fn insert_ordered<F>(&mut self, id: ThreadId, mut precedes: F)
    where
        F: FnMut(ThreadId) -> bool,
    {
        let mut cursor = self.head;
        while let Some(member) = cursor {
            if precedes(member) {
                self.link_before(id, member);
                return;
            }
            cursor = self.links[member.index()].next;
        }
        self.append(id);
    }

    /// Link `id` at the tail without comparison.
    pub fn append(&mut self, id: ThreadId) {
        debug_assert!(!self.contains(id), "thread {} already scheduled", id);
        let tail = self.tail;
        self.links[id.index()] = Link {
            prev: tail,
            next: None,
            linked: true,
        };
        match tail {
            Some(tail) => self.links[tail.index()].next = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        self.len += 1;
    }

    fn link_before(&mut self, id: ThreadId, member: ThreadId) {
        debug_assert!(!self.contains(id), "thread {} already scheduled", id);
        let prev = self.links[member.index()].prev;
        self.links[id.index()] = Link {
            prev,
            next: Some(member),
            linked: true,
        };
        self.links[member.index()].prev = Some(id);
        match prev {
            Some(prev) => self.links[prev.index()].next = Some(id),
            None => self.head = Some(id),
        }
        self.len += 1;
    }

    /// Unlink `id`. Returns `false` if it was not a member.
    pub fn extract(&mut self, id: ThreadId) -> bool {
        let link = self.links[id.index()];
        if !link.linked {
            return false;
        }
        match link.prev {
            Some(prev) => self.links[prev.index()].next = link.next,
            None => self.head = link.next,
        }
        match link.next {
            Some(next) => self.links[next.index()].prev = link.prev,
            None => self.tail = link.prev,
        }
        self.links[id.index()] = Link::default();
        self.len -= 1;
        true
    }

    /// Least urgent member; `None` only before bring-up.
    pub fn lowest(&self) -> Option<ThreadId> {
        self.tail
    }

    pub fn contains(&self, id: ThreadId) -> bool {
        self.links.get(id.index()).map_or(false, |link| link.linked)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Members from most to least urgent.
    pub fn iter(&self) -> ScheduledIter<'_> {
        ScheduledIter {
            set: self,
            cursor: self.head,
        }
    }

    pub(crate) fn vacate(&mut self, cpu: CpuId) {
        self.vacant.insert(cpu);
    }

    pub(crate) fn claim_vacant(&mut self) -> Option<CpuId> {
        self.vacant.pop_first()
    }

    pub(crate) fn reoccupy(&mut self, cpu: CpuId) {
        self.vacant.remove(cpu);
    }

    pub fn vacant(&self) -> CpuMask {
        self.vacant
    }
}

pub struct ScheduledIter<'a> {
    set: &'a ScheduledSet,
    cursor: Option<ThreadId>,
}

impl Iterator for ScheduledIter<'_> {
    type Item = ThreadId;

    fn next(&mut self) -> Option<ThreadId> {
        let current = self.cursor?;
        self.cursor = self.set.links[current.index()].next;
        Some(current)
    }
}
