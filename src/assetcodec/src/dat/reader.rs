//! DAT file reader (spec §4.6, component C6).
//!
//! Parsing is whole-file, fatal-on-first-error: any malformed flag tag,
//! bounds violation, or truncated stream aborts the entire read rather
//! than producing a partially-populated table (spec §4.6 "Parsing is
//! all-or-nothing").

use super::duration::DurationPolicy;
use super::features::{ClientFeatures, DatVersion};
use super::flags::{self, Flag};
use super::texture;
use super::thing::{Bones, MarketInfo, TextCap, Thing, ThingCategory};
use super::{DatFile, ThingTable};
use crate::error::Result;
use crate::stream::ByteReader;

/// Parses a complete DAT file.
///
/// `client_version` selects the wire version (spec §4.5's thresholds)
/// and, together with `features`, the exact set of flags and texture
/// fields expected; callers that already know the exact feature tuple
/// for their client build should have applied
/// [`ClientFeatures::apply_version_defaults`] before calling this.
/// `duration_policy` supplies the per-category default animation
/// duration used whenever a multi-frame group has no explicit duration
/// data on the wire (improved animations off).
pub fn read_dat(
    data: &[u8],
    client_version: u16,
    features: ClientFeatures,
    duration_policy: &dyn DurationPolicy,
) -> Result<DatFile> {
    let version = DatVersion::from_client_version(client_version);
    let mut reader = ByteReader::new(data);

    let signature = reader.read_u32()?;
    let max_item_id = reader.read_u16()? as u32;
    let max_outfit_id = reader.read_u16()? as u32;
    let max_effect_id = reader.read_u16()? as u32;
    let max_missile_id = reader.read_u16()? as u32;

    let mut things = ThingTable::default();
    read_category(
        &mut reader,
        version,
        features,
        ThingCategory::Item,
        max_item_id,
        duration_policy,
        &mut things.items,
    )?;
    read_category(
        &mut reader,
        version,
        features,
        ThingCategory::Outfit,
        max_outfit_id,
        duration_policy,
        &mut things.outfits,
    )?;
    read_category(
        &mut reader,
        version,
        features,
        ThingCategory::Effect,
        max_effect_id,
        duration_policy,
        &mut things.effects,
    )?;
    read_category(
        &mut reader,
        version,
        features,
        ThingCategory::Missile,
        max_missile_id,
        duration_policy,
        &mut things.missiles,
    )?;

    Ok(DatFile {
        version,
        features,
        signature,
        things,
    })
}

fn read_category(
    reader: &mut ByteReader,
    version: DatVersion,
    features: ClientFeatures,
    category: ThingCategory,
    max_id: u32,
    duration_policy: &dyn DurationPolicy,
    out: &mut std::collections::BTreeMap<u32, Thing>,
) -> Result<()> {
    let min_id = category.min_id();
    if max_id < min_id {
        return Ok(());
    }
    for id in min_id..=max_id {
        let thing = read_thing(reader, version, features, category, duration_policy)?;
        out.insert(id, thing);
    }
    Ok(())
}

fn read_thing(
    reader: &mut ByteReader,
    version: DatVersion,
    features: ClientFeatures,
    category: ThingCategory,
    duration_policy: &dyn DurationPolicy,
) -> Result<Thing> {
    let mut thing = Thing::new_empty();
    read_flags(reader, version, &mut thing)?;
    texture::read_frame_groups(reader, version, features, category, duration_policy, &mut thing)?;
    Ok(thing)
}

fn read_flags(reader: &mut ByteReader, version: DatVersion, thing: &mut Thing) -> Result<()> {
    let mut previous_tag: Option<u8> = None;

    loop {
        let tag = reader.read_u8()?;
        if tag == flags::TERMINATOR {
            break;
        }

        let flag = flags::require_known_tag(version, tag, previous_tag)?;
        apply_flag(reader, version, flag, thing)?;
        previous_tag = Some(tag);
    }

    Ok(())
}

fn apply_flag(reader: &mut ByteReader, version: DatVersion, flag: Flag, thing: &mut Thing) -> Result<()> {
    match flag {
        Flag::Ground => {
            thing.is_ground = true;
            thing.ground_speed = reader.read_u16()?;
        }
        Flag::GroundBorder => thing.is_ground_border = true,
        Flag::OnBottom => thing.is_on_bottom = true,
        Flag::OnTop => thing.is_on_top = true,
        Flag::Container => thing.is_container = true,
        Flag::Stackable => thing.is_stackable = true,
        Flag::ForceUse => thing.is_force_use = true,
        Flag::MultiUse => thing.is_multi_use = true,
        Flag::Writable => {
            thing.writable = Some(TextCap {
                max_text_length: reader.read_u16()?,
            });
        }
        Flag::WritableOnce => {
            thing.writable_once = Some(TextCap {
                max_text_length: reader.read_u16()?,
            });
        }
        Flag::FluidContainer => thing.is_fluid_container = true,
        Flag::Splash => thing.is_splash = true,
        Flag::NotWalkable => thing.is_not_walkable = true,
        Flag::NotMoveable => thing.is_not_moveable = true,
        Flag::BlockProjectile => thing.blocks_projectile = true,
        Flag::Pickupable => thing.is_pickupable = true,
        Flag::Hangable => thing.is_hangable = true,
        Flag::Vertical => thing.is_vertical = true,
        Flag::Horizontal => thing.is_horizontal = true,
        Flag::Rotatable => thing.is_rotatable = true,
        Flag::LightInfo => {
            thing.light_level = reader.read_u16()?;
            thing.light_color = reader.read_u16()?;
        }
        Flag::HasOffset => {
            thing.has_offset = true;
            if version >= DatVersion::V3 {
                thing.offset = (reader.read_i16()?, reader.read_i16()?);
            }
        }
        Flag::Elevation => thing.elevation = Some(reader.read_u16()?),
        Flag::LensHelp => thing.lens_help = Some(reader.read_u16()?),
        Flag::MinimapColor => thing.minimap_color = Some(reader.read_u16()?),
        Flag::DontHide => thing.dont_hide = true,
        Flag::HasCharges => thing.has_charges = true,
        Flag::Wrap => thing.is_wrappable = true,
        Flag::Unwrap => thing.is_unwrappable = true,
        Flag::HasBones => {
            thing.bones = Some(Bones {
                north: read_bone_offset(reader)?,
                south: read_bone_offset(reader)?,
                east: read_bone_offset(reader)?,
                west: read_bone_offset(reader)?,
            });
        }
        Flag::IgnoreLook => thing.ignore_look = true,
        Flag::Cloth => thing.cloth_slot = Some(reader.read_u16()?),
        Flag::Translucent => thing.is_translucent = true,
        Flag::MarketItem => {
            thing.market = Some(MarketInfo {
                category: reader.read_u16()?,
                trade_as: reader.read_u16()?,
                show_as: reader.read_u16()?,
                name: reader.read_latin1_prefixed_string()?,
                restrict_profession: reader.read_u16()?,
                restrict_level: reader.read_u16()?,
            });
        }
        Flag::NoMoveAnimation => thing.no_move_animation = true,
        Flag::DefaultAction => thing.default_action = Some(reader.read_u8()?),
        Flag::TopEffect => thing.is_top_effect = true,
        Flag::Usable => thing.is_usable = true,
    }

    Ok(())
}

fn read_bone_offset(reader: &mut ByteReader) -> Result<super::thing::BoneOffset> {
    Ok(super::thing::BoneOffset {
        x: reader.read_i16()?,
        y: reader.read_i16()?,
    })
}

