//! OBD sub-version 3 (spec §4.7 "V3"): an outfit may carry both its
//! Default and Walking frame groups in one packet, each with its own
//! sprite records immediately following its layout.
//!
//! Unlike the DAT texture block ([`crate::dat::texture`]), whose
//! multi-group emission is gated on the client's frame-groups feature,
//! V3's multi-group capability is unconditional for outfits: it is a
//! property of the OBD wire version itself, not of the originating
//! client build. So this module walks its own group loop rather than
//! reusing `texture::read_frame_groups`/`write_frame_groups`.

use std::collections::BTreeMap;

use crate::dat::texture::{self, group_tag};
use crate::dat::{DurationPolicy, FrameGroupSlot, Thing, ThingCategory};
use crate::error::{AssetError, Result};
use crate::stream::{ByteReader, ByteWriter};

use super::{
    category_from_byte, category_to_byte, features_for, properties, read_sprite_records,
    write_sprite_records, ObdFile, ObdVersion, V3_MARKER,
};

/// The two-slot (Default, Walking) model this crate's [`FrameGroupSlot`]
/// supports; a V3 packet claiming more groups than this is rejected.
pub const MAX_OUTFIT_FRAME_GROUPS: u8 = 2;

pub fn read_body(reader: &mut ByteReader, duration_policy: &dyn DurationPolicy) -> Result<ObdFile> {
    // The marker word was already consumed by `read_obd`'s dispatch.
    let client_version = reader.read_u16()?;
    let category = category_from_byte(reader.read_u8()?)?;
    let sprites_start = reader.read_u32()? as u64;

    let mut thing = Thing::new_empty();
    properties::read_properties(reader, &mut thing)?;

    let group_count = if category == ThingCategory::Outfit {
        let count = reader.read_u8()?;
        if count > MAX_OUTFIT_FRAME_GROUPS {
            return Err(AssetError::format(
                "obd_v3",
                format!("{count} frame groups exceeds the two-slot (Default/Walking) model"),
            ));
        }
        count
    } else {
        1
    };

    if reader.position() != sprites_start {
        return Err(AssetError::format(
            "obd_v3",
            format!(
                "spritesStart mismatch: header said {sprites_start}, group header ended at {}",
                reader.position()
            ),
        ));
    }

    let dat_version = crate::dat::DatVersion::from_client_version(client_version);
    let features = features_for(client_version);

    let mut sprites = BTreeMap::new();
    for i in 0..group_count {
        if category == ThingCategory::Outfit {
            let _tag = reader.read_u8()?; // bypassed, spec §9 Open Questions
        }
        let slot = if i == 0 { FrameGroupSlot::Default } else { FrameGroupSlot::Walking };

        let group = texture::read_frame_group(reader, dat_version, features, category, duration_policy)?;
        let ids = group.sprite_index.clone();
        thing.set_frame_group(slot, group);

        let group_sprites = read_sprite_records(reader, &ids, false)?;
        sprites.extend(group_sprites);
    }

    Ok(ObdFile {
        version: ObdVersion::V3,
        client_version,
        category,
        thing,
        sprites,
    })
}

pub fn write_body(writer: &mut ByteWriter, file: &ObdFile) -> Result<()> {
    writer.write_u16(V3_MARKER)?;
    writer.write_u16(file.client_version)?;
    writer.write_u8(category_to_byte(file.category))?;

    let sprites_start_offset = writer.position();
    writer.write_u32(0)?;

    properties::write_properties(writer, file.category, &file.thing)?;

    let groups: Vec<_> = file.thing.frame_groups().collect();
    if groups.is_empty() {
        return Err(AssetError::format("obd_v3", "thing has no frame group to write"));
    }

    if file.category == ThingCategory::Outfit {
        writer.write_u8(groups.len() as u8)?;
    } else if groups.len() > 1 {
        return Err(AssetError::format(
            "obd_v3",
            "only an outfit may carry more than one frame group",
        ));
    }

    let sprites_start = writer.position();
    let end_position = sprites_start;
    writer.set_position(sprites_start_offset);
    writer.write_u32(sprites_start as u32)?;
    writer.set_position(end_position);

    let dat_version = crate::dat::DatVersion::from_client_version(file.client_version);
    let features = features_for(file.client_version);

    for (slot, group) in &groups {
        if file.category == ThingCategory::Outfit {
            writer.write_u8(group_tag(*slot))?;
        }
        texture::write_frame_group(writer, dat_version, features, group)?;
        write_sprite_records(writer, &group.sprite_index, &file.sprites, false)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dat::{AnimationDescriptor, AnimationMode, FrameDuration, FrameGroup, HistoricalDurationPolicy};

    const POLICY: HistoricalDurationPolicy = HistoricalDurationPolicy;

    #[test]
    fn outfit_roundtrips_default_and_walking_groups() {
        let mut thing = Thing::new_empty();

        let mut default_group = FrameGroup::empty();
        default_group.pattern_x = 4;
        default_group.sprite_index = vec![1, 2, 3, 4];
        thing.set_frame_group(FrameGroupSlot::Default, default_group);

        let mut walking_group = FrameGroup::empty();
        walking_group.pattern_x = 4;
        walking_group.frames = 2;
        walking_group.animation = Some(AnimationDescriptor {
            mode: AnimationMode::Sync,
            loop_count: -1,
            start_frame: 0,
            frame_durations: vec![
                FrameDuration { min_duration: 100, max_duration: 100 },
                FrameDuration { min_duration: 100, max_duration: 100 },
            ],
        });
        walking_group.sprite_index = vec![10, 11, 12, 13, 14, 15, 16, 17];
        thing.set_frame_group(FrameGroupSlot::Walking, walking_group);

        let mut sprites = BTreeMap::new();
        for id in 1..=4u32 {
            sprites.insert(id, vec![id as u8; crate::pixels::TILE_BYTES]);
        }
        for id in 10..=17u32 {
            sprites.insert(id, vec![id as u8; crate::pixels::TILE_BYTES]);
        }

        let file = ObdFile {
            version: ObdVersion::V3,
            client_version: 1098,
            category: ThingCategory::Outfit,
            thing,
            sprites,
        };

        let bytes = super::super::write_obd(&file).unwrap();
        let read_back = super::super::read_obd(&bytes, &POLICY).unwrap();

        assert_eq!(read_back.version, ObdVersion::V3);
        let default = read_back.thing.get_frame_group(FrameGroupSlot::Default).unwrap();
        assert_eq!(default.pattern_x, 4);
        let walking = read_back.thing.get_frame_group(FrameGroupSlot::Walking).unwrap();
        assert_eq!(walking.frames, 2);
        let animation = walking.animation.as_ref().unwrap();
        assert_eq!(animation.mode, AnimationMode::Sync);
        assert_eq!(animation.loop_count, -1);

        for id in 1..=4u32 {
            assert_eq!(read_back.sprites.get(&id).unwrap(), &vec![id as u8; crate::pixels::TILE_BYTES]);
        }
        for id in 10..=17u32 {
            assert_eq!(read_back.sprites.get(&id).unwrap(), &vec![id as u8; crate::pixels::TILE_BYTES]);
        }
    }

    #[test]
    fn non_outfit_never_writes_group_count() {
        let mut thing = Thing::new_empty();
        let mut group = FrameGroup::empty();
        group.sprite_index = vec![1];
        thing.set_frame_group(FrameGroupSlot::Default, group);

        let mut sprites = BTreeMap::new();
        sprites.insert(1, vec![9u8; crate::pixels::TILE_BYTES]);

        let file = ObdFile {
            version: ObdVersion::V3,
            client_version: 1098,
            category: ThingCategory::Item,
            thing,
            sprites,
        };

        let bytes = super::super::write_obd(&file).unwrap();
        let read_back = super::super::read_obd(&bytes, &POLICY).unwrap();
        assert_eq!(read_back.category, ThingCategory::Item);
        assert!(read_back.thing.get_frame_group(FrameGroupSlot::Walking).is_none());
    }
}
