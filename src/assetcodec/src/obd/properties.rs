//! OBD property flag dictionary (spec §4.7, component C7).
//!
//! The exchange format uses its own flat, version-independent flag
//! table -- unlike the six version-specific DAT tables in
//! [`crate::dat`] -- since an OBD file always describes a single thing
//! captured from a known, already-resolved client version. Only
//! `TopEffect` is category-gated (spec §4.7 "Category-gated flags
//! (TopEffect) are silently skipped when writing from a non-matching
//! category"); the writer drops it for a non-effect rather than
//! erroring, since a thing can carry a flag left over from being copied
//! out of a different category's table.

use crate::dat::{Bones, MarketInfo, TextCap, Thing, ThingCategory};
use crate::error::{AssetError, Result};
use crate::stream::{ByteReader, ByteWriter};

pub const TERMINATOR: u8 = 0xFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObdFlag {
    Ground,
    GroundBorder,
    OnBottom,
    OnTop,
    Container,
    Stackable,
    ForceUse,
    MultiUse,
    Writable,
    WritableOnce,
    FluidContainer,
    Splash,
    NotWalkable,
    NotMoveable,
    BlockProjectile,
    Pickupable,
    Hangable,
    Vertical,
    Horizontal,
    Rotatable,
    LightInfo,
    HasOffset,
    Elevation,
    LensHelp,
    MinimapColor,
    DontHide,
    HasCharges,
    Wrap,
    Unwrap,
    HasBones,
    IgnoreLook,
    Cloth,
    Translucent,
    MarketItem,
    NoMoveAnimation,
    DefaultAction,
    TopEffect,
    Usable,
}

const ORDER: &[ObdFlag] = &[
    ObdFlag::Ground,
    ObdFlag::GroundBorder,
    ObdFlag::OnBottom,
    ObdFlag::OnTop,
    ObdFlag::Container,
    ObdFlag::Stackable,
    ObdFlag::ForceUse,
    ObdFlag::MultiUse,
    ObdFlag::Writable,
    ObdFlag::WritableOnce,
    ObdFlag::FluidContainer,
    ObdFlag::Splash,
    ObdFlag::NotWalkable,
    ObdFlag::NotMoveable,
    ObdFlag::BlockProjectile,
    ObdFlag::Pickupable,
    ObdFlag::Hangable,
    ObdFlag::Vertical,
    ObdFlag::Horizontal,
    ObdFlag::Rotatable,
    ObdFlag::LightInfo,
    ObdFlag::HasOffset,
    ObdFlag::Elevation,
    ObdFlag::LensHelp,
    ObdFlag::MinimapColor,
    ObdFlag::DontHide,
    ObdFlag::HasCharges,
    ObdFlag::Wrap,
    ObdFlag::Unwrap,
    ObdFlag::HasBones,
    ObdFlag::IgnoreLook,
    ObdFlag::Cloth,
    ObdFlag::Translucent,
    ObdFlag::MarketItem,
    ObdFlag::NoMoveAnimation,
    ObdFlag::DefaultAction,
    ObdFlag::TopEffect,
    ObdFlag::Usable,
];

fn tag(flag: ObdFlag) -> u8 {
    ORDER.iter().position(|f| *f == flag).expect("flag in ORDER") as u8
}

fn flag_for_tag(tag_byte: u8) -> Option<ObdFlag> {
    ORDER.get(tag_byte as usize).copied()
}

/// `false` means the writer must skip this flag for `category` even if
/// the in-memory thing carries it set.
fn applies_to_category(flag: ObdFlag, category: ThingCategory) -> bool {
    match flag {
        ObdFlag::TopEffect => category == ThingCategory::Effect,
        _ => true,
    }
}

pub fn read_properties(reader: &mut ByteReader, thing: &mut Thing) -> Result<()> {
    loop {
        let raw_tag = reader.read_u8()?;
        if raw_tag == TERMINATOR {
            break;
        }
        let flag = flag_for_tag(raw_tag).ok_or_else(|| {
            AssetError::format("obd_properties", format!("unknown property tag 0x{raw_tag:02x}"))
        })?;
        apply_flag(reader, flag, thing)?;
    }
    Ok(())
}

pub fn write_properties(writer: &mut ByteWriter, category: ThingCategory, thing: &Thing) -> Result<()> {
    for &flag in ORDER {
        if !applies_to_category(flag, category) {
            continue;
        }
        if !flag_is_set(flag, thing) {
            continue;
        }
        writer.write_u8(tag(flag))?;
        write_flag_payload(writer, flag, thing)?;
    }
    writer.write_u8(TERMINATOR)
}

fn flag_is_set(flag: ObdFlag, thing: &Thing) -> bool {
    match flag {
        ObdFlag::Ground => thing.is_ground,
        ObdFlag::GroundBorder => thing.is_ground_border,
        ObdFlag::OnBottom => thing.is_on_bottom,
        ObdFlag::OnTop => thing.is_on_top,
        ObdFlag::Container => thing.is_container,
        ObdFlag::Stackable => thing.is_stackable,
        ObdFlag::ForceUse => thing.is_force_use,
        ObdFlag::MultiUse => thing.is_multi_use,
        ObdFlag::Writable => thing.writable.is_some(),
        ObdFlag::WritableOnce => thing.writable_once.is_some(),
        ObdFlag::FluidContainer => thing.is_fluid_container,
        ObdFlag::Splash => thing.is_splash,
        ObdFlag::NotWalkable => thing.is_not_walkable,
        ObdFlag::NotMoveable => thing.is_not_moveable,
        ObdFlag::BlockProjectile => thing.blocks_projectile,
        ObdFlag::Pickupable => thing.is_pickupable,
        ObdFlag::Hangable => thing.is_hangable,
        ObdFlag::Vertical => thing.is_vertical,
        ObdFlag::Horizontal => thing.is_horizontal,
        ObdFlag::Rotatable => thing.is_rotatable,
        ObdFlag::LightInfo => thing.light_level != 0 || thing.light_color != 0,
        ObdFlag::HasOffset => thing.has_offset,
        ObdFlag::Elevation => thing.elevation.is_some(),
        ObdFlag::LensHelp => thing.lens_help.is_some(),
        ObdFlag::MinimapColor => thing.minimap_color.is_some(),
        ObdFlag::DontHide => thing.dont_hide,
        ObdFlag::HasCharges => thing.has_charges,
        ObdFlag::Wrap => thing.is_wrappable,
        ObdFlag::Unwrap => thing.is_unwrappable,
        ObdFlag::HasBones => thing.bones.is_some(),
        ObdFlag::IgnoreLook => thing.ignore_look,
        ObdFlag::Cloth => thing.cloth_slot.is_some(),
        ObdFlag::Translucent => thing.is_translucent,
        ObdFlag::MarketItem => thing.market.is_some(),
        ObdFlag::NoMoveAnimation => thing.no_move_animation,
        ObdFlag::DefaultAction => thing.default_action.is_some(),
        ObdFlag::TopEffect => thing.is_top_effect,
        ObdFlag::Usable => thing.is_usable,
    }
}

fn apply_flag(reader: &mut ByteReader, flag: ObdFlag, thing: &mut Thing) -> Result<()> {
    match flag {
        ObdFlag::Ground => {
            thing.is_ground = true;
            thing.ground_speed = reader.read_u16()?;
        }
        ObdFlag::GroundBorder => thing.is_ground_border = true,
        ObdFlag::OnBottom => thing.is_on_bottom = true,
        ObdFlag::OnTop => thing.is_on_top = true,
        ObdFlag::Container => thing.is_container = true,
        ObdFlag::Stackable => thing.is_stackable = true,
        ObdFlag::ForceUse => thing.is_force_use = true,
        ObdFlag::MultiUse => thing.is_multi_use = true,
        ObdFlag::Writable => {
            thing.writable = Some(TextCap {
                max_text_length: reader.read_u16()?,
            });
        }
        ObdFlag::WritableOnce => {
            thing.writable_once = Some(TextCap {
                max_text_length: reader.read_u16()?,
            });
        }
        ObdFlag::FluidContainer => thing.is_fluid_container = true,
        ObdFlag::Splash => thing.is_splash = true,
        ObdFlag::NotWalkable => thing.is_not_walkable = true,
        ObdFlag::NotMoveable => thing.is_not_moveable = true,
        ObdFlag::BlockProjectile => thing.blocks_projectile = true,
        ObdFlag::Pickupable => thing.is_pickupable = true,
        ObdFlag::Hangable => thing.is_hangable = true,
        ObdFlag::Vertical => thing.is_vertical = true,
        ObdFlag::Horizontal => thing.is_horizontal = true,
        ObdFlag::Rotatable => thing.is_rotatable = true,
        ObdFlag::LightInfo => {
            thing.light_level = reader.read_u16()?;
            thing.light_color = reader.read_u16()?;
        }
        ObdFlag::HasOffset => {
            thing.has_offset = true;
            thing.offset = (reader.read_i16()?, reader.read_i16()?);
        }
        ObdFlag::Elevation => thing.elevation = Some(reader.read_u16()?),
        ObdFlag::LensHelp => thing.lens_help = Some(reader.read_u16()?),
        ObdFlag::MinimapColor => thing.minimap_color = Some(reader.read_u16()?),
        ObdFlag::DontHide => thing.dont_hide = true,
        ObdFlag::HasCharges => thing.has_charges = true,
        ObdFlag::Wrap => thing.is_wrappable = true,
        ObdFlag::Unwrap => thing.is_unwrappable = true,
        ObdFlag::HasBones => {
            thing.bones = Some(Bones {
                north: read_bone_offset(reader)?,
                south: read_bone_offset(reader)?,
                east: read_bone_offset(reader)?,
                west: read_bone_offset(reader)?,
            });
        }
        ObdFlag::IgnoreLook => thing.ignore_look = true,
        ObdFlag::Cloth => thing.cloth_slot = Some(reader.read_u16()?),
        ObdFlag::Translucent => thing.is_translucent = true,
        ObdFlag::MarketItem => {
            thing.market = Some(MarketInfo {
                category: reader.read_u16()?,
                trade_as: reader.read_u16()?,
                show_as: reader.read_u16()?,
                name: reader.read_latin1_prefixed_string()?,
                restrict_profession: reader.read_u16()?,
                restrict_level: reader.read_u16()?,
            });
        }
        ObdFlag::NoMoveAnimation => thing.no_move_animation = true,
        ObdFlag::DefaultAction => thing.default_action = Some(reader.read_u8()?),
        ObdFlag::TopEffect => thing.is_top_effect = true,
        ObdFlag::Usable => thing.is_usable = true,
    }
    Ok(())
}

fn write_flag_payload(writer: &mut ByteWriter, flag: ObdFlag, thing: &Thing) -> Result<()> {
    match flag {
        ObdFlag::Ground => writer.write_u16(thing.ground_speed)?,
        ObdFlag::Writable => writer.write_u16(thing.writable.unwrap().max_text_length)?,
        ObdFlag::WritableOnce => writer.write_u16(thing.writable_once.unwrap().max_text_length)?,
        ObdFlag::LightInfo => {
            writer.write_u16(thing.light_level)?;
            writer.write_u16(thing.light_color)?;
        }
        ObdFlag::HasOffset => {
            writer.write_i16(thing.offset.0)?;
            writer.write_i16(thing.offset.1)?;
        }
        ObdFlag::Elevation => writer.write_u16(thing.elevation.unwrap())?,
        ObdFlag::LensHelp => writer.write_u16(thing.lens_help.unwrap())?,
        ObdFlag::MinimapColor => writer.write_u16(thing.minimap_color.unwrap())?,
        ObdFlag::HasBones => write_bones(writer, &thing.bones.unwrap())?,
        ObdFlag::Cloth => writer.write_u16(thing.cloth_slot.unwrap())?,
        ObdFlag::MarketItem => write_market(writer, thing.market.as_ref().unwrap())?,
        ObdFlag::DefaultAction => writer.write_u8(thing.default_action.unwrap())?,
        _ => {}
    }
    Ok(())
}

fn read_bone_offset(reader: &mut ByteReader) -> Result<crate::dat::BoneOffset> {
    Ok(crate::dat::BoneOffset {
        x: reader.read_i16()?,
        y: reader.read_i16()?,
    })
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
    use super::*;

    #[test]
    fn top_effect_dropped_for_non_effect_category() {
        let mut thing = Thing::new_empty();
        thing.is_top_effect = true;

        let mut writer = ByteWriter::new();
        write_properties(&mut writer, ThingCategory::Item, &thing).unwrap();
        let bytes = writer.into_bytes();

        // Only the terminator should have been written.
        assert_eq!(bytes, vec![TERMINATOR]);
    }

    #[test]
    fn top_effect_kept_for_effect_category() {
        let mut thing = Thing::new_empty();
        thing.is_top_effect = true;

        let mut writer = ByteWriter::new();
        write_properties(&mut writer, ThingCategory::Effect, &thing).unwrap();
        let bytes = writer.into_bytes();

        let mut reader = ByteReader::new(&bytes);
        let mut read_back = Thing::new_empty();
        read_properties(&mut reader, &mut read_back).unwrap();
        assert!(read_back.is_top_effect);
    }
}
