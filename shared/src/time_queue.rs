use std::{
    cmp::Reverse,
    collections::{BinaryHeap, HashMap},
    time::Duration,
};

/// Delayed work items ordered by due time, then by insertion order.
///
/// Time is whatever monotonic clock the owner drives it with, expressed as a
/// `Duration` since some fixed origin.
pub struct TimeQueue<T> {
    heap: BinaryHeap<Reverse<(Duration, u64)>>,
    items: HashMap<u64, T>,
    next_key: u64,
}

impl<T> Default for TimeQueue<T> {
    fn default() -> Self {
        Self {
            heap: BinaryHeap::new(),
            items: HashMap::new(),
            next_key: 0,
        }
    }
}

impl<T> TimeQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_item(&mut self, due: Duration, item: T) {
        let key = self.next_key;
        self.next_key += 1;
        self.heap.push(Reverse((due, key)));
        self.items.insert(key, item);
    }

    /// Removes and returns the earliest item due at `now`
    pub fn pop_due(&mut self, now: Duration) -> Option<T> {
        loop {
            let Reverse((due, key)) = *self.heap.peek()?;
            if due > now {
                return None;
            }
            self.heap.pop();
            if let Some(item) = self.items.remove(&key) {
                return Some(item);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drops every item for which `keep` returns false
    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) {
        self.items.retain(|_, item| keep(item));
        let items = &self.items;
        self.heap.retain(|Reverse((_, key))| items.contains_key(key));
    }
}
