use std::collections::VecDeque;

use hub::{Intent, IntentPriority};

/// Items that know which priority class they belong to.
pub trait Prioritized {
    fn priority(&self) -> IntentPriority;
}

impl Prioritized for Intent {
    fn priority(&self) -> IntentPriority {
        Intent::priority(self)
    }
}

fn index(priority: IntentPriority) -> usize {
    match priority {
        IntentPriority::P0 => 0,
        IntentPriority::P1 => 1,
        IntentPriority::P2 => 2,
    }
}

/// Fixed set of FIFO queues drained P0 ≻ P1 ≻ P2.
#[derive(Debug)]
pub struct PQueues<T> {
    buckets: [VecDeque<T>; 3],
}

impl<T> Default for PQueues<T> {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl<T> PQueues<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates empty queues with an initial capacity per priority bucket.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buckets: std::array::from_fn(|_| VecDeque::with_capacity(capacity)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(VecDeque::is_empty)
    }

    pub fn len(&self) -> usize {
        self.buckets.iter().map(VecDeque::len).sum()
    }

    /// Number of items per bucket, ordered `[P0, P1, P2]`.
    pub fn len_per_priority(&self) -> [usize; 3] {
        std::array::from_fn(|i| self.buckets[i].len())
    }

    pub fn enqueue(&mut self, priority: IntentPriority, item: T) {
        self.buckets[index(priority)].push_back(item);
    }

    /// Pops the oldest item of the highest non-empty priority.
    pub fn pop_next(&mut self) -> Option<T> {
        self.buckets.iter_mut().find_map(VecDeque::pop_front)
    }

    /// Drops every queued item, returning how many were discarded.
    pub fn clear(&mut self) -> usize {
        let dropped = self.len();
        self.buckets.iter_mut().for_each(VecDeque::clear);
        dropped
    }
}

impl<T: Prioritized> PQueues<T> {
    /// Enqueues `item` in the bucket it names.
    pub fn push(&mut self, item: T) {
        self.enqueue(item.priority(), item);
    }
}
