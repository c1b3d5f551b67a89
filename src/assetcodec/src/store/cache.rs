//! Render cache: an insertion-ordered bound on however many rendered
//! sprite previews a client keeps around at once (spec §4.9 "Render
//! cache", §9 "Render cache").
//!
//! The cache is deliberately generic over its entry type -- a preview
//! might be a decoded pixel buffer, a GPU handle, or a thumbnail, and
//! none of that is this crate's concern; it only owns the eviction
//! policy.

use std::collections::{HashMap, VecDeque};

/// Entries evict oldest-first once `max_size` would be exceeded.
pub struct RenderCache<T> {
    max_size: usize,
    order: VecDeque<u32>,
    entries: HashMap<u32, T>,
}

impl<T> RenderCache<T> {
    pub fn new(max_size: usize) -> Self {
        RenderCache {
            max_size,
            order: VecDeque::new(),
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, id: u32) -> Option<&T> {
        self.entries.get(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Inserts or replaces `id`'s entry, evicting from the front until
    /// the cache is back within `max_size`.
    pub fn insert(&mut self, id: u32, value: T) {
        if self.entries.insert(id, value).is_none() {
            self.order.push_back(id);
        }
        self.evict_to_bound();
    }

    /// Drops `id`'s entry, if any -- used when a sprite's content
    /// changes underneath a cached preview.
    pub fn invalidate(&mut self, id: u32) {
        if self.entries.remove(&id).is_some() {
            self.order.retain(|&cached| cached != id);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Changes the bound, trimming immediately if the cache is now
    /// over it.
    pub fn set_max_size(&mut self, max_size: usize) {
        self.max_size = max_size;
        self.evict_to_bound();
    }

    fn evict_to_bound(&mut self) {
        while self.entries.len() > self.max_size {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eviction_is_oldest_first() {
        let mut cache = RenderCache::new(2);
        cache.insert(1, "a");
        cache.insert(2, "b");
        cache.insert(3, "c");

        assert_eq!(cache.len(), 2);
        assert!(cache.get(1).is_none());
        assert_eq!(cache.get(2), Some(&"b"));
        assert_eq!(cache.get(3), Some(&"c"));
    }

    #[test]
    fn set_max_size_trims_immediately() {
        let mut cache = RenderCache::new(5);
        for id in 1..=4u32 {
            cache.insert(id, id);
        }
        cache.set_max_size(2);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(3), Some(&3));
        assert_eq!(cache.get(4), Some(&4));
    }

    #[test]
    fn invalidate_removes_a_single_entry() {
        let mut cache = RenderCache::new(10);
        cache.insert(1, "a");
        cache.insert(2, "b");
        cache.invalidate(1);
        assert!(cache.get(1).is_none());
        assert_eq!(cache.get(2), Some(&"b"));
    }
}
