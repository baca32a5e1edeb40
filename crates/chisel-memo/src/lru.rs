//! Doubly linked recency list with a hash index.
//!
//! Entries live in a slab of slots; `prev`/`next` indices form the recency
//! list (head = most recently used, tail = least recently used) and a
//! `HashMap` maps keys to slots. The two structures are always mutated
//! together; [`MemoCache`](crate::MemoCache) guards them with one lock.

use chisel_state::Snapshot;
use std::collections::HashMap;
use std::time::{Duration, Instant};

struct Entry {
    key: String,
    value: Snapshot,
    stored_at: Instant,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Bounded LRU store from derived keys to produced snapshots.
pub(crate) struct LruList {
    slots: Vec<Option<Entry>>,
    free: Vec<usize>,
    index: HashMap<String, usize>,
    head: Option<usize>,
    tail: Option<usize>,
    capacity: usize,
}

impl LruList {
    /// Create a list bounded to `capacity` entries (at least one).
    pub(crate) fn new(capacity: usize) -> Self {
        LruList {
            slots: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            head: None,
            tail: None,
            capacity: capacity.max(1),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.index.len()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    /// Look up `key`, bumping it to the most-recently-used position on a
    /// hit. An entry older than `ttl` counts as absent and is dropped.
    pub(crate) fn get(&mut self, key: &str, ttl: Option<Duration>) -> Option<Snapshot> {
        let slot = *self.index.get(key)?;
        if let Some(ttl) = ttl {
            let expired = self.slots[slot]
                .as_ref()
                .is_some_and(|e| e.stored_at.elapsed() >= ttl);
            if expired {
                self.remove_slot(slot);
                return None;
            }
        }
        self.detach(slot);
        self.push_front(slot);
        self.slots[slot].as_ref().map(|e| e.value.clone())
    }

    /// Insert or refresh `key`. At capacity, the least-recently-used entry
    /// is evicted first.
    pub(crate) fn insert(&mut self, key: String, value: Snapshot) {
        if let Some(&slot) = self.index.get(&key) {
            if let Some(entry) = self.slots[slot].as_mut() {
                entry.value = value;
                entry.stored_at = Instant::now();
            }
            self.detach(slot);
            self.push_front(slot);
            return;
        }

        if self.len() >= self.capacity {
            if let Some(tail) = self.tail {
                let evicted = self.remove_slot(tail);
                if let Some(entry) = evicted {
                    tracing::debug!(key = %entry.key, "evicted least-recently-used cache entry");
                }
            }
        }

        let entry = Entry {
            key: key.clone(),
            value,
            stored_at: Instant::now(),
            prev: None,
            next: None,
        };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(entry);
                slot
            }
            None => {
                self.slots.push(Some(entry));
                self.slots.len() - 1
            }
        };
        self.index.insert(key, slot);
        self.push_front(slot);
    }

    /// Drop every entry.
    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.index.clear();
        self.head = None;
        self.tail = None;
    }

    /// True if `key` is present (recency and TTL untouched; test hook).
    #[cfg(test)]
    pub(crate) fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Keys from most to least recently used (test hook).
    #[cfg(test)]
    pub(crate) fn keys_by_recency(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.len());
        let mut cursor = self.head;
        while let Some(slot) = cursor {
            if let Some(entry) = self.slots[slot].as_ref() {
                out.push(entry.key.clone());
                cursor = entry.next;
            } else {
                break;
            }
        }
        out
    }

    /// Unlink `slot` from the recency list.
    fn detach(&mut self, slot: usize) {
        let (prev, next) = match self.slots[slot].as_ref() {
            Some(entry) => (entry.prev, entry.next),
            None => return,
        };
        match prev {
            Some(p) => {
                if let Some(entry) = self.slots[p].as_mut() {
                    entry.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(n) => {
                if let Some(entry) = self.slots[n].as_mut() {
                    entry.prev = prev;
                }
            }
            None => self.tail = prev,
        }
        if let Some(entry) = self.slots[slot].as_mut() {
            entry.prev = None;
            entry.next = None;
        }
    }

    /// Link `slot` in as the new head (most recently used).
    fn push_front(&mut self, slot: usize) {
        let old_head = self.head;
        if let Some(entry) = self.slots[slot].as_mut() {
            entry.prev = None;
            entry.next = old_head;
        }
        if let Some(h) = old_head {
            if let Some(entry) = self.slots[h].as_mut() {
                entry.prev = Some(slot);
            }
        }
        self.head = Some(slot);
        if self.tail.is_none() {
            self.tail = Some(slot);
        }
    }

    /// Remove `slot` entirely, returning its entry.
    fn remove_slot(&mut self, slot: usize) -> Option<Entry> {
        self.detach(slot);
        let entry = self.slots[slot].take()?;
        self.index.remove(&entry.key);
        self.free.push(slot);
        Some(entry)
    }
}
