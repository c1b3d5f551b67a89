//! The sprite store (spec §4.9, component C9): a lazy SPR accessor
//! overlaid with unsaved edits, a bounded render cache, selection
//! state, and a single in-flight bulk-operation descriptor.
//!
//! The store never copies the accessor's underlying buffer; overrides
//! and deletions exist purely to shadow it, and `getAllSprites`
//! materialises the effective view only when the caller actually needs
//! one (typically on compile).

pub mod cache;
pub mod operation;

use std::collections::{BTreeMap, BTreeSet};

use crate::error::Result;
use crate::spr::SprAccessor;

pub use cache::RenderCache;
pub use operation::{OperationKind, OperationTracker, SpriteOperation};

/// The render cache's default bound (spec §4.9 "a configurable max
/// size, default 2000").
pub const DEFAULT_CACHE_MAX_SIZE: usize = 2000;

/// The current selection: one primary id plus a multi-select list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub current: Option<u32>,
    pub multi: Vec<u32>,
}

/// Overlays unsaved edits on top of an optional lazy SPR accessor.
pub struct SpriteStore {
    accessor: Option<SprAccessor>,
    overrides: BTreeMap<u32, Vec<u8>>,
    deletions: BTreeSet<u32>,
    changes: BTreeSet<u32>,
    cache: RenderCache<Vec<u8>>,
    cache_max_size: usize,
    selection: Selection,
    operation: OperationTracker,
}

impl Default for SpriteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SpriteStore {
    pub fn new() -> Self {
        SpriteStore {
            accessor: None,
            overrides: BTreeMap::new(),
            deletions: BTreeSet::new(),
            changes: BTreeSet::new(),
            cache: RenderCache::new(DEFAULT_CACHE_MAX_SIZE),
            cache_max_size: DEFAULT_CACHE_MAX_SIZE,
            selection: Selection::default(),
            operation: OperationTracker::default(),
        }
    }

    pub fn accessor(&self) -> Option<&SprAccessor> {
        self.accessor.as_ref()
    }

    pub fn changed_sprite_ids(&self) -> &BTreeSet<u32> {
        &self.changes
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn select(&mut self, id: Option<u32>) {
        self.selection.current = id;
    }

    pub fn select_multi(&mut self, ids: Vec<u32>) {
        self.selection.multi = ids;
    }

    pub fn operation(&self) -> Option<&SpriteOperation> {
        self.operation.current()
    }

    pub fn start_operation(&mut self, kind: OperationKind, ids: Vec<u32>) {
        self.operation.start(kind, ids);
    }

    pub fn update_operation_progress(&mut self, completed: usize) {
        self.operation.update_progress(completed);
    }

    pub fn complete_operation(&mut self) -> Option<SpriteOperation> {
        self.operation.complete()
    }

    pub fn cancel_operation(&mut self) -> Option<SpriteOperation> {
        self.operation.cancel()
    }

    /// Resolution policy: deletions shadow overrides, overrides shadow
    /// the accessor, and an absent id resolves to `None` rather than
    /// an error (spec §4.9 "Resolution policy").
    pub fn has(&self, id: u32) -> bool {
        if self.deletions.contains(&id) {
            return false;
        }
        if self.overrides.contains_key(&id) {
            return true;
        }
        self.accessor.as_ref().is_some_and(|a| a.has(id))
    }

    pub fn get(&self, id: u32) -> Result<Option<Vec<u8>>> {
        if self.deletions.contains(&id) {
            return Ok(None);
        }
        if let Some(pixels) = self.overrides.get(&id) {
            return Ok(Some(pixels.clone()));
        }
        match &self.accessor {
            Some(accessor) => accessor.get(id),
            None => Ok(None),
        }
    }

    /// The size of the effective view: accessor ids union override ids,
    /// minus deletions.
    pub fn sprite_count(&self) -> usize {
        self.effective_ids().len()
    }

    fn effective_ids(&self) -> BTreeSet<u32> {
        let mut ids: BTreeSet<u32> = match &self.accessor {
            Some(accessor) => accessor.ids().collect(),
            None => BTreeSet::new(),
        };
        ids.extend(self.overrides.keys().copied());
        for id in &self.deletions {
            ids.remove(id);
        }
        ids
    }

    pub fn set_sprite(&mut self, id: u32, pixels: Vec<u8>) {
        self.overrides.insert(id, pixels);
        self.deletions.remove(&id);
        self.changes.insert(id);
        self.cache.invalidate(id);
    }

    pub fn remove_sprite(&mut self, id: u32) {
        self.overrides.remove(&id);
        self.deletions.insert(id);
        self.changes.insert(id);
        self.cache.invalidate(id);
    }

    /// Allocates `max(accessor.spriteCount, max-overridden-id) + 1`,
    /// stores `pixels` there, and returns the new id.
    pub fn add_sprite(&mut self, pixels: Vec<u8>) -> u32 {
        let accessor_count = self.accessor.as_ref().map_or(0, |a| a.sprite_count());
        let max_overridden = self.overrides.keys().next_back().copied().unwrap_or(0);
        let id = accessor_count.max(max_overridden) + 1;
        self.set_sprite(id, pixels);
        id
    }

    /// Bulk `setSprite`; each id is inserted into `changes` at most once
    /// regardless of how many times it is touched in one call.
    pub fn replace_sprites(&mut self, entries: impl IntoIterator<Item = (u32, Vec<u8>)>) {
        for (id, pixels) in entries {
            self.set_sprite(id, pixels);
        }
    }

    /// Replaces the accessor, disposing the previous one, and resets
    /// every other piece of edit state. The cache's size setting
    /// survives; its contents do not.
    pub fn load_from_buffer(&mut self, buffer: Vec<u8>, extended: bool, transparency: bool) -> Result<()> {
        if let Some(mut previous) = self.accessor.take() {
            previous.dispose();
        }
        self.accessor = Some(SprAccessor::parse(buffer, extended, transparency)?);
        self.overrides.clear();
        self.deletions.clear();
        self.changes.clear();
        self.selection = Selection::default();
        self.cache.clear();
        self.operation.clear();
        Ok(())
    }

    /// Disposes the accessor and zeroes every sub-state, including the
    /// pending operation.
    pub fn clear_sprites(&mut self) {
        if let Some(mut accessor) = self.accessor.take() {
            accessor.dispose();
        }
        self.overrides.clear();
        self.deletions.clear();
        self.changes.clear();
        self.selection = Selection::default();
        self.cache.clear();
        self.operation.clear();
    }

    /// Materialises the effective view into an owned map, used on
    /// compile to hand the whole sprite set to the SPR writer.
    pub fn get_all_sprites(&self) -> Result<BTreeMap<u32, Vec<u8>>> {
        let mut out = BTreeMap::new();
        for id in self.effective_ids() {
            if let Some(pixels) = self.get(id)? {
                out.insert(id, pixels);
            }
        }
        Ok(out)
    }

    pub fn cache_max_size(&self) -> usize {
        self.cache_max_size
    }

    pub fn set_cache_max_size(&mut self, max_size: usize) {
        self.cache_max_size = max_size;
        self.cache.set_max_size(max_size);
    }

    pub fn cached_render(&self, id: u32) -> Option<&Vec<u8>> {
        self.cache.get(id)
    }

    pub fn cache_render(&mut self, id: u32, preview: Vec<u8>) {
        self.cache.insert(id, preview);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spr::write_spr;

    fn store_with_three_sprites() -> SpriteStore {
        let mut sprites = BTreeMap::new();
        sprites.insert(1u32, vec![b'A'; 4096]);
        sprites.insert(2u32, vec![b'B'; 4096]);
        sprites.insert(3u32, vec![b'C'; 4096]);
        let bytes = write_spr(1, 3, &sprites, false, true).unwrap();

        let mut store = SpriteStore::new();
        store.load_from_buffer(bytes, false, true).unwrap();
        store
    }

    #[test]
    fn overlay_resolution_matches_the_boundary_scenario() {
        let mut store = store_with_three_sprites();

        store.set_sprite(2, vec![b'b'; 4096]);
        store.remove_sprite(3);
        let new_id = store.add_sprite(vec![b'D'; 4096]);

        assert_eq!(store.get(1).unwrap(), Some(vec![b'A'; 4096]));
        assert_eq!(store.get(2).unwrap(), Some(vec![b'b'; 4096]));
        assert!(!store.has(3));
        assert_eq!(new_id, 4);
        assert_eq!(store.get(4).unwrap(), Some(vec![b'D'; 4096]));

        let changed: BTreeSet<u32> = store.changed_sprite_ids().clone();
        assert_eq!(changed, BTreeSet::from([2, 3, 4]));
        assert_eq!(store.sprite_count(), 3);
    }

    #[test]
    fn remove_then_set_clears_the_deletion() {
        let mut store = store_with_three_sprites();
        store.remove_sprite(1);
        assert!(!store.has(1));
        store.set_sprite(1, vec![b'Z'; 4096]);
        assert!(store.has(1));
        assert_eq!(store.get(1).unwrap(), Some(vec![b'Z'; 4096]));
    }

    #[test]
    fn clear_sprites_resets_everything_including_the_operation() {
        let mut store = store_with_three_sprites();
        store.start_operation(OperationKind::Export, vec![1, 2, 3]);
        store.clear_sprites();

        assert!(!store.has(1));
        assert_eq!(store.sprite_count(), 0);
        assert!(store.operation().is_none());
        assert!(store.changed_sprite_ids().is_empty());
    }

    #[test]
    fn load_from_buffer_disposes_the_previous_accessor() {
        let mut store = store_with_three_sprites();
        store.set_sprite(1, vec![b'x'; 4096]);

        let mut sprites = BTreeMap::new();
        sprites.insert(1u32, vec![b'Q'; 4096]);
        let bytes = write_spr(2, 1, &sprites, false, true).unwrap();
        store.load_from_buffer(bytes, false, true).unwrap();

        assert_eq!(store.get(1).unwrap(), Some(vec![b'Q'; 4096]));
        assert!(store.changed_sprite_ids().is_empty());
    }

    #[test]
    fn set_cache_max_size_trims_the_render_cache() {
        let mut store = SpriteStore::new();
        for id in 1..=5u32 {
            store.cache_render(id, vec![id as u8]);
        }
        store.set_cache_max_size(2);
        assert_eq!(store.cached_render(4), Some(&vec![4u8]));
        assert_eq!(store.cached_render(5), Some(&vec![5u8]));
        assert!(store.cached_render(1).is_none());
    }
}
