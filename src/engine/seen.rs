//! Bounded dedup set of processed message ids

use std::collections::{HashSet, VecDeque};

/// Remembers the most recent `capacity` ids, evicting the oldest first
#[derive(Debug)]
pub struct SeenSet {
    capacity: usize,
    order: VecDeque<String>,
    ids: HashSet<String>,
}

impl SeenSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity.min(1024)),
            ids: HashSet::with_capacity(capacity.min(1024)),
        }
    }

    /// Mark `id` as seen. Returns false if it already was.
    pub fn insert(&mut self, id: &str) -> bool {
        if self.ids.contains(id) {
            return false;
        }

        while self.order.len() >= self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.ids.remove(&oldest);
                }
                None => break,
            }
        }

        self.ids.insert(id.to_string());
        self.order.push_back(id.to_string());
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
