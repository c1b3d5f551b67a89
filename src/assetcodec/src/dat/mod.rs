//! The DAT thing-metadata file format (spec §4.5-§4.6, components C5/C6).

mod duration;
mod features;
mod flags;
mod reader;
pub(crate) mod texture;
mod thing;
mod writer;

pub use duration::{DurationPolicy, HistoricalDurationPolicy};
pub use features::{ClientFeatures, DatVersion};
pub use flags::Flag;
pub use reader::read_dat;
pub use thing::{
    AnimationDescriptor, AnimationMode, BoneOffset, Bones, FrameDuration, FrameGroup,
    FrameGroupSlot, MarketInfo, TextCap, Thing, ThingCategory, MAX_SPRITES_PER_GROUP,
};
pub use writer::write_dat;

/// The four per-category id ranges a DAT file's header declares, and the
/// parsed/about-to-be-written things for each (spec §4.6 "Header").
#[derive(Debug, Clone, Default)]
pub struct ThingTable {
    pub items: std::collections::BTreeMap<u32, Thing>,
    pub outfits: std::collections::BTreeMap<u32, Thing>,
    pub effects: std::collections::BTreeMap<u32, Thing>,
    pub missiles: std::collections::BTreeMap<u32, Thing>,
}

impl ThingTable {
    pub fn category_map(&self, category: ThingCategory) -> &std::collections::BTreeMap<u32, Thing> {
        match category {
            ThingCategory::Item => &self.items,
            ThingCategory::Outfit => &self.outfits,
            ThingCategory::Effect => &self.effects,
            ThingCategory::Missile => &self.missiles,
        }
    }

    pub fn category_map_mut(
        &mut self,
        category: ThingCategory,
    ) -> &mut std::collections::BTreeMap<u32, Thing> {
        match category {
            ThingCategory::Item => &mut self.items,
            ThingCategory::Outfit => &mut self.outfits,
            ThingCategory::Effect => &mut self.effects,
            ThingCategory::Missile => &mut self.missiles,
        }
    }

    /// The highest id written in each category's run, or `0` if the
    /// category is empty; this is exactly what the DAT header stores
    /// (spec §4.6 "Header", §9 "sparse id runs").
    pub fn max_id(&self, category: ThingCategory) -> u32 {
        self.category_map(category).keys().next_back().copied().unwrap_or(0)
    }
}

/// A complete parsed DAT file: the client feature tuple it was parsed
/// under, and the four category tables (spec §4.6).
#[derive(Debug, Clone)]
pub struct DatFile {
    pub version: DatVersion,
    pub features: ClientFeatures,
    pub signature: u32,
    pub things: ThingTable,
}
