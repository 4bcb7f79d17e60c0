use std::collections::VecDeque;

use crate::model::WorkItem;

/// FIFO backlog of lookups waiting for a free slot.
#[derive(Debug, Default)]
pub struct TaskQueue {
    items: VecDeque<WorkItem>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: WorkItem) {
        self.items.push_back(item);
    }

    pub fn pop_front(&mut self) -> Option<WorkItem> {
        self.items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
