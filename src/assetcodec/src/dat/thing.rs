//! In-memory thing model (spec §3, §4.8, component C8).
//!
//! `Thing` carries the superset of every flag any DAT wire version can
//! ever emit; narrower versions simply leave the fields they don't
//! represent at their zero default. This is what makes the round-trip
//! property in spec §8 ("up to the documented zero-defaults of fields
//! the wire version does not represent") checkable without a different
//! struct per version.

use std::collections::BTreeMap;

use crate::error::{AssetError, Result};

/// Hard cap on sprites referenced by one frame group (spec §3 invariant 4).
pub const MAX_SPRITES_PER_GROUP: usize = 4096;

/// Closed category enumeration (spec §3 "Thing category").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ThingCategory {
    Item,
    Outfit,
    Effect,
    Missile,
}

impl ThingCategory {
    /// The lowest valid id for this category: items start at 100,
    /// everything else starts at 1.
    pub fn min_id(self) -> u32 {
        match self {
            ThingCategory::Item => 100,
            _ => 1,
        }
    }

    /// Only outfits may carry a second (Walking) frame group.
    pub fn allows_walking_group(self) -> bool {
        matches!(self, ThingCategory::Outfit)
    }
}

/// Which frame-group slot a layout occupies. Only outfits with the
/// frame-groups feature ever populate [`FrameGroupSlot::Walking`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameGroupSlot {
    Default,
    Walking,
}

/// Animation playback mode for a frame group with `frames > 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationMode {
    Async,
    Sync,
}

/// Per-frame (min, max) duration pair, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameDuration {
    pub min_duration: u32,
    pub max_duration: u32,
}

/// Present only when `frames > 1`; absent entirely on the wire and in
/// memory for a single-frame group (spec §3 invariant 6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationDescriptor {
    pub mode: AnimationMode,
    /// Signed; `-1` means infinite.
    pub loop_count: i32,
    pub start_frame: i8,
    pub frame_durations: Vec<FrameDuration>,
}

/// One animation/pattern-state layout of sprite references (spec §3
/// "Frame group").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameGroup {
    pub width: u8,
    pub height: u8,
    /// Bounding-box pixel size. Absent (and defaulted to 32) iff
    /// `width == 1 && height == 1` — spec §3 invariant 5, bit-exact.
    pub exact_size: Option<u8>,
    pub layers: u8,
    pub pattern_x: u8,
    pub pattern_y: u8,
    pub pattern_z: u8,
    pub frames: u8,
    pub animation: Option<AnimationDescriptor>,
    pub sprite_index: Vec<u32>,
}

impl FrameGroup {
    /// A frame group with the smallest legal layout: 1×1, one layer,
    /// one pattern in every axis, one frame, and its single sprite slot
    /// set to the empty reference `0` -- `total_sprites()` is 1 for this
    /// layout, and `validate()` requires `sprite_index.len() == total`.
    pub fn empty() -> Self {
        FrameGroup {
            width: 1,
            height: 1,
            exact_size: None,
            layers: 1,
            pattern_x: 1,
            pattern_y: 1,
            pattern_z: 1,
            frames: 1,
            animation: None,
            sprite_index: vec![0],
        }
    }

    /// `width · height · layers · patternX · patternY · patternZ · frames`.
    pub fn total_sprites(&self) -> usize {
        self.width as usize
            * self.height as usize
            * self.layers as usize
            * self.pattern_x as usize
            * self.pattern_y as usize
            * self.pattern_z as usize
            * self.frames as usize
    }

    /// The effective exact size: the explicit byte if present, else the
    /// synthesised 32 for a 1×1 group.
    pub fn effective_exact_size(&self) -> u8 {
        self.exact_size.unwrap_or(32)
    }

    /// Validates the bit-exact invariants this crate enforces on every
    /// frame group, whether freshly constructed or freshly read:
    /// `exactSize` presence matches the 1×1 rule, sprite count is
    /// within bounds and matches `sprite_index.len()`, and an animation
    /// descriptor is present iff `frames > 1`.
    pub fn validate(&self) -> Result<()> {
        let is_1x1 = self.width == 1 && self.height == 1;
        if is_1x1 && self.exact_size.is_some() {
            return Err(AssetError::format(
                "frame_group",
                "exactSize must be absent for a 1x1 group",
            ));
        }
        if !is_1x1 && self.exact_size.is_none() {
            return Err(AssetError::format(
                "frame_group",
                "exactSize must be present for a group larger than 1x1",
            ));
        }

        let total = self.total_sprites();
        if total > MAX_SPRITES_PER_GROUP {
            return Err(AssetError::format(
                "frame_group",
                format!("frame group computes {total} sprites, exceeding the {MAX_SPRITES_PER_GROUP} cap"),
            ));
        }
        if self.sprite_index.len() != total {
            return Err(AssetError::format(
                "frame_group",
                format!(
                    "spriteIndex has {} entries, expected {total}",
                    self.sprite_index.len()
                ),
            ));
        }

        if self.frames <= 1 && self.animation.is_some() {
            return Err(AssetError::format(
                "frame_group",
                "a single-frame group must not carry an animation descriptor",
            ));
        }
        if self.frames > 1 {
            if let Some(animation) = &self.animation {
                if animation.frame_durations.len() != self.frames as usize {
                    return Err(AssetError::format(
                        "frame_group",
                        "animation descriptor's duration count must equal frames",
                    ));
                }
            }
        }

        Ok(())
    }
}

/// One cardinal-direction signed pixel offset pair, used by
/// [`Bones::north`]..[`Bones::west`] (V4+, spec §4.5 "HasBones").
/// Always stored and emitted in North, South, East, West order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoneOffset {
    pub x: i16,
    pub y: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bones {
    pub north: BoneOffset,
    pub south: BoneOffset,
    pub east: BoneOffset,
    pub west: BoneOffset,
}

/// Market category/restriction record (V5+, spec §4.5 "MarketItem").
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MarketInfo {
    pub category: u16,
    pub trade_as: u16,
    pub show_as: u16,
    pub name: String,
    pub restrict_profession: u16,
    pub restrict_level: u16,
}

/// Read/write text-field capability (Writable / WritableOnce).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextCap {
    pub max_text_length: u16,
}

/// The full, version-superset record for one (category, id) thing
/// (spec §3 "Thing"). Every field not represented by the wire version
/// in use stays at its zero default on write, and is never populated on
/// read.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Thing {
    // Layer-selector flags: Ground / GroundBorder / OnBottom / OnTop are
    // mutually exclusive; at most one is ever set.
    pub is_ground: bool,
    pub ground_speed: u16,
    pub is_ground_border: bool,
    pub is_on_bottom: bool,
    pub is_on_top: bool,

    pub is_container: bool,
    pub is_stackable: bool,
    pub is_force_use: bool,
    pub is_multi_use: bool,
    pub writable: Option<TextCap>,
    /// V1 only; dropped starting V2 (spec §4.5 "V2 ... drops Writable-
    /// Once-Only quirk of V1").
    pub writable_once: Option<TextCap>,
    pub is_fluid_container: bool,
    pub is_splash: bool,
    pub is_not_walkable: bool,
    pub is_not_moveable: bool,
    pub blocks_projectile: bool,
    pub is_pickupable: bool,
    /// V2+.
    pub is_hangable: bool,
    pub is_vertical: bool,
    pub is_horizontal: bool,
    pub is_rotatable: bool,

    pub light_level: u16,
    pub light_color: u16,

    /// V4+.
    pub dont_hide: bool,
    /// No payload before V3; `(i16, i16)` pixel offset from V3 on (spec
    /// §4.5 "V3 ... turns HAS_OFFSET into a carrier of (i16, i16)").
    pub has_offset: bool,
    pub offset: (i16, i16),

    pub elevation: Option<u16>,
    pub lens_help: Option<u16>,
    pub minimap_color: Option<u16>,

    /// V4+.
    pub has_charges: bool,
    pub is_wrappable: bool,
    pub is_unwrappable: bool,
    pub bones: Option<Bones>,
    /// V4+.
    pub ignore_look: bool,

    /// V5+.
    pub cloth_slot: Option<u16>,
    pub is_translucent: bool,
    pub market: Option<MarketInfo>,

    /// V6+.
    pub no_move_animation: bool,
    pub default_action: Option<u8>,
    pub is_top_effect: bool,
    pub is_usable: bool,

    groups: BTreeMap<FrameGroupSlotKey, FrameGroup>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum FrameGroupSlotKey {
    Default,
    Walking,
}

impl From<FrameGroupSlot> for FrameGroupSlotKey {
    fn from(slot: FrameGroupSlot) -> Self {
        match slot {
            FrameGroupSlot::Default => FrameGroupSlotKey::Default,
            FrameGroupSlot::Walking => FrameGroupSlotKey::Walking,
        }
    }
}

impl Thing {
    /// A factory-default thing: no flags set, one empty Default frame
    /// group (spec §3 "Lifecycle" — "a thing is created empty").
    pub fn new_empty() -> Self {
        let mut thing = Thing::default();
        thing
            .groups
            .insert(FrameGroupSlotKey::Default, FrameGroup::empty());
        thing
    }

    pub fn get_frame_group(&self, slot: FrameGroupSlot) -> Option<&FrameGroup> {
        self.groups.get(&slot.into())
    }

    pub fn set_frame_group(&mut self, slot: FrameGroupSlot, group: FrameGroup) {
        self.groups.insert(slot.into(), group);
    }

    pub fn remove_frame_group(&mut self, slot: FrameGroupSlot) -> Option<FrameGroup> {
        self.groups.remove(&slot.into())
    }

    /// Groups in slot order (Default, then Walking if present).
    pub fn frame_groups(&self) -> impl Iterator<Item = (FrameGroupSlot, &FrameGroup)> {
        self.groups.iter().map(|(key, group)| {
            let slot = match key {
                FrameGroupSlotKey::Default => FrameGroupSlot::Default,
                FrameGroupSlotKey::Walking => FrameGroupSlot::Walking,
            };
            (slot, group)
        })
    }

    pub fn has_walking_group(&self) -> bool {
        self.groups.contains_key(&FrameGroupSlotKey::Walking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_id_splits_items_from_the_rest() {
        assert_eq!(ThingCategory::Item.min_id(), 100);
        assert_eq!(ThingCategory::Outfit.min_id(), 1);
        assert_eq!(ThingCategory::Effect.min_id(), 1);
        assert_eq!(ThingCategory::Missile.min_id(), 1);
    }

    #[test]
    fn exact_size_gate_rejects_mismatch() {
        let mut group = FrameGroup::empty();
        group.exact_size = Some(32);
        assert!(group.validate().is_err());

        let mut group = FrameGroup::empty();
        group.width = 2;
        group.sprite_index = vec![1; group.total_sprites()];
        assert!(group.validate().is_err()); // missing exact_size for a 2x1 group
        group.exact_size = Some(32);
        assert!(group.validate().is_ok());
    }

    #[test]
    fn sprite_count_cap_is_enforced() {
        let mut group = FrameGroup::empty();
        group.pattern_x = 255;
        group.pattern_y = 255;
        group.pattern_z = 255;
        assert!(group.validate().is_err());
    }

    #[test]
    fn new_empty_thing_has_one_default_group() {
        let thing = Thing::new_empty();
        assert!(thing.get_frame_group(FrameGroupSlot::Default).is_some());
        assert!(thing.get_frame_group(FrameGroupSlot::Walking).is_none());
        assert!(!thing.has_walking_group());
    }
}
