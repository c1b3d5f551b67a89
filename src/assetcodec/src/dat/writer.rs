//! DAT file writer (spec §4.6, component C6).
//!
//! Mirrors [`super::reader`] field-for-field, applying the writer-side
//! symmetry rules documented there and the two legacy tag-byte quirks
//! from [`super::flags::write_tag`].

use super::features::{ClientFeatures, DatVersion};
use super::flags::{self, Flag};
use super::texture;
use super::thing::{Bones, MarketInfo, TextCap, Thing, ThingCategory};
use super::{DatFile, ThingTable};
use crate::error::Result;
use crate::stream::ByteWriter;

/// Serialises a complete DAT file back to bytes.
pub fn write_dat(file: &DatFile) -> Result<Vec<u8>> {
    let mut writer = ByteWriter::new();

    writer.write_u32(file.signature)?;
    writer.write_u16(file.things.max_id(ThingCategory::Item) as u16)?;
    writer.write_u16(file.things.max_id(ThingCategory::Outfit) as u16)?;
    writer.write_u16(file.things.max_id(ThingCategory::Effect) as u16)?;
    writer.write_u16(file.things.max_id(ThingCategory::Missile) as u16)?;

    write_category(&mut writer, file.version, file.features, ThingCategory::Item, &file.things)?;
    write_category(&mut writer, file.version, file.features, ThingCategory::Outfit, &file.things)?;
    write_category(&mut writer, file.version, file.features, ThingCategory::Effect, &file.things)?;
    write_category(&mut writer, file.version, file.features, ThingCategory::Missile, &file.things)?;

    Ok(writer.into_bytes())
}

fn write_category(
    writer: &mut ByteWriter,
    version: DatVersion,
    features: ClientFeatures,
    category: ThingCategory,
    things: &ThingTable,
) -> Result<()> {
    let min_id = category.min_id();
    let max_id = things.max_id(category);
    if max_id < min_id {
        return Ok(());
    }

    let map = things.category_map(category);
    for id in min_id..=max_id {
        let thing = map.get(&id).cloned().unwrap_or_else(Thing::new_empty);
        write_thing(writer, version, features, category, &thing)?;
    }
    Ok(())
}

fn write_thing(
    writer: &mut ByteWriter,
    version: DatVersion,
    features: ClientFeatures,
    category: ThingCategory,
    thing: &Thing,
) -> Result<()> {
    write_flags(writer, version, thing)?;
    texture::write_frame_groups(writer, version, features, category, thing)?;
    Ok(())
}

fn write_flags(writer: &mut ByteWriter, version: DatVersion, thing: &Thing) -> Result<()> {
    for flag in flags::write_order(version) {
        if !flag_is_set(flag, thing) {
            continue;
        }
        let tag = flags::write_tag(version, flag)
            .expect("write_order only yields flags present in this version's table");
        writer.write_u8(tag)?;
        write_flag_payload(writer, version, flag, thing)?;
    }
    writer.write_u8(flags::TERMINATOR)
}

fn flag_is_set(flag: Flag, thing: &Thing) -> bool {
    match flag {
        Flag::Ground => thing.is_ground,
        Flag::GroundBorder => thing.is_ground_border,
        Flag::OnBottom => thing.is_on_bottom,
        Flag::OnTop => thing.is_on_top,
        Flag::Container => thing.is_container,
        Flag::Stackable => thing.is_stackable,
        Flag::ForceUse => thing.is_force_use,
        Flag::MultiUse => thing.is_multi_use,
        Flag::Writable => thing.writable.is_some(),
        Flag::WritableOnce => thing.writable_once.is_some(),
        Flag::FluidContainer => thing.is_fluid_container,
        Flag::Splash => thing.is_splash,
        Flag::NotWalkable => thing.is_not_walkable,
        Flag::NotMoveable => thing.is_not_moveable,
        Flag::BlockProjectile => thing.blocks_projectile,
        Flag::Pickupable => thing.is_pickupable,
        Flag::Hangable => thing.is_hangable,
        Flag::Vertical => thing.is_vertical,
        Flag::Horizontal => thing.is_horizontal,
        Flag::Rotatable => thing.is_rotatable,
        Flag::LightInfo => thing.light_level != 0 || thing.light_color != 0,
        Flag::HasOffset => thing.has_offset,
        Flag::Elevation => thing.elevation.is_some(),
        Flag::LensHelp => thing.lens_help.is_some(),
        Flag::MinimapColor => thing.minimap_color.is_some(),
        Flag::DontHide => thing.dont_hide,
        Flag::HasCharges => thing.has_charges,
        Flag::Wrap => thing.is_wrappable,
        Flag::Unwrap => thing.is_unwrappable,
        Flag::HasBones => thing.bones.is_some(),
        Flag::IgnoreLook => thing.ignore_look,
        Flag::Cloth => thing.cloth_slot.is_some(),
        Flag::Translucent => thing.is_translucent,
        Flag::MarketItem => thing.market.is_some(),
        Flag::NoMoveAnimation => thing.no_move_animation,
        Flag::DefaultAction => thing.default_action.is_some(),
        Flag::TopEffect => thing.is_top_effect,
        Flag::Usable => thing.is_usable,
    }
}

fn write_flag_payload(writer: &mut ByteWriter, version: DatVersion, flag: Flag, thing: &Thing) -> Result<()> {
    match flag {
        Flag::Ground => writer.write_u16(thing.ground_speed)?,
        Flag::Writable => writer.write_u16(thing.writable.unwrap().max_text_length)?,
        Flag::WritableOnce => writer.write_u16(thing.writable_once.unwrap().max_text_length)?,
        Flag::LightInfo => {
            writer.write_u16(thing.light_level)?;
            writer.write_u16(thing.light_color)?;
        }
        Flag::HasOffset => {
            if version >= DatVersion::V3 {
                writer.write_i16(thing.offset.0)?;
                writer.write_i16(thing.offset.1)?;
            }
        }
        Flag::Elevation => writer.write_u16(thing.elevation.unwrap())?,
        Flag::LensHelp => writer.write_u16(thing.lens_help.unwrap())?,
        Flag::MinimapColor => writer.write_u16(thing.minimap_color.unwrap())?,
        Flag::HasBones => write_bones(writer, &thing.bones.unwrap())?,
        Flag::Cloth => writer.write_u16(thing.cloth_slot.unwrap())?,
        Flag::MarketItem => write_market(writer, thing.market.as_ref().unwrap())?,
        Flag::DefaultAction => writer.write_u8(thing.default_action.unwrap())?,
        // All remaining flags are bare: their presence in the tag stream
        // carries the whole payload, with no trailing bytes.
        _ => {}
    }
    Ok(())
}

fn write_bones(writer: &mut ByteWriter, bones: &Bones) -> Result<()> {
    for offset in [bones.north, bones.south, bones.east, bones.west] {
        writer.write_i16(offset.x)?;
        writer.write_i16(offset.y)?;
    }
    Ok(())
}

fn write_market(writer: &mut ByteWriter, market: &MarketInfo) -> Result<()> {
    writer.write_u16(market.category)?;
    writer.write_u16(market.trade_as)?;
    writer.write_u16(market.show_as)?;
    writer.write_latin1_prefixed_string(&market.name)?;
    writer.write_u16(market.restrict_profession)?;
    writer.write_u16(market.restrict_level)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::duration::HistoricalDurationPolicy;
    use super::super::reader::read_dat;
    use super::*;
    use crate::dat::thing::FrameGroup;

    fn sample_file() -> DatFile {
        let mut things = ThingTable::default();

        let mut item = Thing::new_empty();
        item.is_container = true;
        item.is_stackable = true;
        item.light_level = 5;
        item.light_color = 215;
        things.items.insert(100, item);

        let mut wrappable = Thing::new_empty();
        wrappable.is_wrappable = true;
        things.items.insert(101, wrappable);

        DatFile {
            version: DatVersion::V6,
            features: ClientFeatures::empty(),
            signature: 0x4D2A_1000,
            things,
        }
    }

    #[test]
    fn roundtrip_preserves_flags() {
        let file = sample_file();
        let bytes = write_dat(&file).unwrap();
        let read_back = read_dat(&bytes, 1100, ClientFeatures::empty(), &HistoricalDurationPolicy).unwrap();

        let item = read_back.things.items.get(&100).unwrap();
        assert!(item.is_container);
        assert!(item.is_stackable);
        assert_eq!(item.light_level, 5);
        assert_eq!(item.light_color, 215);

        let wrappable = read_back.things.items.get(&101).unwrap();
        assert!(wrappable.is_wrappable);
    }

    #[test]
    fn v4_writer_emits_v6_wrap_tag_on_the_wire() {
        let mut thing = Thing::new_empty();
        thing.is_wrappable = true;

        let mut writer = ByteWriter::new();
        write_flags(&mut writer, DatVersion::V4, &thing).unwrap();
        let bytes = writer.into_bytes();

        assert_eq!(bytes[0], flags::write_tag(DatVersion::V4, Flag::Wrap).unwrap());
        assert_eq!(bytes[0], flags::read_tag(DatVersion::V6, Flag::Wrap).unwrap());
    }

    #[test]
    fn unwritten_ids_in_range_round_trip_as_empty_things() {
        let mut things = ThingTable::default();
        things.items.insert(100, Thing::new_empty());
        // id 102 sets max_id but 101 is never inserted -- it must still
        // serialise as a legal (empty) record so the fixed-width id run
        // stays parseable.
        let mut far = Thing::new_empty();
        far.set_frame_group(crate::dat::FrameGroupSlot::Default, FrameGroup::empty());
        things.items.insert(102, far);

        let file = DatFile {
            version: DatVersion::V6,
            features: ClientFeatures::empty(),
            signature: 1,
            things,
        };

        let bytes = write_dat(&file).unwrap();
        let read_back = read_dat(&bytes, 1100, ClientFeatures::empty(), &HistoricalDurationPolicy).unwrap();
        assert!(read_back.things.items.contains_key(&101));
    }
}
