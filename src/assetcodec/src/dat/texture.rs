//! Texture pattern block: the frame-group layout that follows a thing's
//! flag block in every DAT version (spec §4.6, part of component C6).
//!
//! Outfits gain a second (Walking) frame group once the frame-groups
//! feature is on (spec §3 "Frame group", §4.8); every other category,
//! and outfits without that feature, carry exactly one (Default) group
//! with no group-count/group-tag bytes at all.

use super::duration::DurationPolicy;
use super::features::{ClientFeatures, DatVersion};
use super::thing::{
    AnimationDescriptor, AnimationMode, FrameDuration, FrameGroup, FrameGroupSlot,
    MAX_SPRITES_PER_GROUP, Thing, ThingCategory,
};
use crate::error::{AssetError, Result};
use crate::stream::{ByteReader, ByteWriter};

/// The tag byte written ahead of a group in slot order. Per spec §9
/// Open Questions, only the *count* of groups is semantically consumed
/// by a reader; the tag byte's value is bypassed, not decoded back into
/// a slot. This crate's readers therefore never call a matching
/// "tag to slot" function -- group identity comes from read order.
pub(crate) fn group_tag(slot: FrameGroupSlot) -> u8 {
    match slot {
        FrameGroupSlot::Default => 0,
        FrameGroupSlot::Walking => 1,
    }
}

/// Reads every frame group belonging to `thing`'s category and installs
/// them directly on `thing`.
pub fn read_frame_groups(
    reader: &mut ByteReader,
    version: DatVersion,
    features: ClientFeatures,
    category: ThingCategory,
    duration_policy: &dyn DurationPolicy,
    thing: &mut Thing,
) -> Result<()> {
    let has_multiple_groups = category.allows_walking_group() && features.contains(ClientFeatures::FRAME_GROUPS);

    if has_multiple_groups {
        let group_count = reader.read_u8()?;
        if group_count > 2 {
            return Err(AssetError::format(
                "texture_pattern",
                format!("{group_count} frame groups exceeds the two-slot (Default/Walking) model"),
            ));
        }
        for i in 0..group_count {
            let _tag = reader.read_u8()?; // bypassed, spec §9 Open Questions
            let slot = if i == 0 { FrameGroupSlot::Default } else { FrameGroupSlot::Walking };
            let group = read_frame_group(reader, version, features, category, duration_policy)?;
            thing.set_frame_group(slot, group);
        }
    } else {
        let group = read_frame_group(reader, version, features, category, duration_policy)?;
        thing.set_frame_group(FrameGroupSlot::Default, group);
    }

    Ok(())
}

/// Writes every frame group `thing` carries, in slot order, with the
/// group-count/group-tag prefix only when the category and feature set
/// allow more than one group.
pub fn write_frame_groups(
    writer: &mut ByteWriter,
    version: DatVersion,
    features: ClientFeatures,
    category: ThingCategory,
    thing: &Thing,
) -> Result<()> {
    let has_multiple_groups = category.allows_walking_group() && features.contains(ClientFeatures::FRAME_GROUPS);
    let groups: Vec<_> = thing.frame_groups().collect();

    if has_multiple_groups {
        writer.write_u8(groups.len() as u8)?;
        for (slot, group) in &groups {
            writer.write_u8(group_tag(*slot))?;
            write_frame_group(writer, version, features, group)?;
        }
    } else {
        let (_, group) = groups
            .first()
            .ok_or_else(|| AssetError::format("texture_pattern", "thing has no frame group to write"))?;
        write_frame_group(writer, version, features, group)?;
    }

    Ok(())
}

/// Reads one frame group: dimensions, the conditional `exactSize` byte,
/// layer/pattern counts, the frame count, the conditional animation
/// descriptor, and the sprite index table.
///
/// When `frames > 1` and the improved-animations feature is off, no
/// duration data exists on the wire at all; `duration_policy` supplies
/// the `(minDuration, maxDuration)` pair synthesised for every frame
/// (spec §4.6 point 3, §9 "OBD version 1 duration policy").
pub fn read_frame_group(
    reader: &mut ByteReader,
    version: DatVersion,
    features: ClientFeatures,
    category: ThingCategory,
    duration_policy: &dyn DurationPolicy,
) -> Result<FrameGroup> {
    let width = reader.read_u8()?;
    let height = reader.read_u8()?;

    let exact_size = if width > 1 || height > 1 {
        Some(reader.read_u8()?)
    } else {
        None
    };

    let layers = reader.read_u8()?;
    let pattern_x = reader.read_u8()?;
    let pattern_y = reader.read_u8()?;
    let pattern_z = if version >= DatVersion::V3 {
        reader.read_u8()?
    } else {
        1
    };
    let frames = reader.read_u8()?;

    let animation = if frames > 1 {
        if features.contains(ClientFeatures::IMPROVED_ANIMATIONS) {
            Some(read_animation_descriptor(reader, frames)?)
        } else {
            Some(synthesize_animation_descriptor(frames, category, duration_policy))
        }
    } else {
        None
    };

    let total = width as usize
        * height as usize
        * layers as usize
        * pattern_x as usize
        * pattern_y as usize
        * pattern_z as usize
        * frames as usize;
    if total > MAX_SPRITES_PER_GROUP {
        return Err(AssetError::format(
            "texture_pattern",
            format!("frame group computes {total} sprites, exceeding the {MAX_SPRITES_PER_GROUP} cap"),
        ));
    }

    let mut sprite_index = Vec::with_capacity(total);
    for _ in 0..total {
        let id = if features.contains(ClientFeatures::EXTENDED) {
            reader.read_u32()?
        } else {
            reader.read_u16()? as u32
        };
        sprite_index.push(id);
    }

    let group = FrameGroup {
        width,
        height,
        exact_size,
        layers,
        pattern_x,
        pattern_y,
        pattern_z,
        frames,
        animation,
        sprite_index,
    };
    group.validate()?;
    Ok(group)
}

/// Writes one frame group, applying the writer-side symmetry rules:
/// `exactSize` only for a group larger than 1x1, `patternZ` only from
/// version 755 on, and the animation descriptor only when both
/// `frames > 1` and the improved-animations feature is set.
pub fn write_frame_group(
    writer: &mut ByteWriter,
    version: DatVersion,
    features: ClientFeatures,
    group: &FrameGroup,
) -> Result<()> {
    group.validate()?;

    writer.write_u8(group.width)?;
    writer.write_u8(group.height)?;
    if group.width > 1 || group.height > 1 {
        writer.write_u8(group.effective_exact_size())?;
    }
    writer.write_u8(group.layers)?;
    writer.write_u8(group.pattern_x)?;
    writer.write_u8(group.pattern_y)?;
    if version >= DatVersion::V3 {
        writer.write_u8(group.pattern_z)?;
    }
    writer.write_u8(group.frames)?;

    if group.frames > 1 && features.contains(ClientFeatures::IMPROVED_ANIMATIONS) {
        let animation = group.animation.as_ref().ok_or_else(|| {
            AssetError::format(
                "texture_pattern",
                "improved-animations feature requires an animation descriptor for a multi-frame group",
            )
        })?;
        write_animation_descriptor(writer, animation)?;
    }

    for &id in &group.sprite_index {
        if features.contains(ClientFeatures::EXTENDED) {
            writer.write_u32(id)?;
        } else {
            writer.write_u16(id as u16)?;
        }
    }

    Ok(())
}

/// Builds the `(d, d)`-per-frame descriptor a non-improved-animations
/// multi-frame group never stores on the wire, using `duration_policy`'s
/// category default. `mode`/`loopCount`/`startFrame` carry no wire
/// presence either in this case, so they take the values the legacy
/// client assumed: asynchronous, looping forever, starting at frame 0.
fn synthesize_animation_descriptor(
    frames: u8,
    category: ThingCategory,
    duration_policy: &dyn DurationPolicy,
) -> AnimationDescriptor {
    let (min_duration, max_duration) = duration_policy.default_duration(category);
    AnimationDescriptor {
        mode: AnimationMode::Async,
        loop_count: -1,
        start_frame: 0,
        frame_durations: vec![FrameDuration { min_duration, max_duration }; frames as usize],
    }
}

fn read_animation_descriptor(reader: &mut ByteReader, frames: u8) -> Result<AnimationDescriptor> {
    let mode = match reader.read_u8()? {
        0 => AnimationMode::Async,
        1 => AnimationMode::Sync,
        other => {
            return Err(AssetError::format(
                "texture_pattern",
                format!("unknown animation mode {other}"),
            ));
        }
    };
    let loop_count = reader.read_i32()?;
    let start_frame = reader.read_i8()?;

    let mut frame_durations = Vec::with_capacity(frames as usize);
    for _ in 0..frames {
        let min_duration = reader.read_u32()?;
        let max_duration = reader.read_u32()?;
        frame_durations.push(FrameDuration {
            min_duration,
            max_duration,
        });
    }

    Ok(AnimationDescriptor {
        mode,
        loop_count,
        start_frame,
        frame_durations,
    })
}

fn write_animation_descriptor(writer: &mut ByteWriter, animation: &AnimationDescriptor) -> Result<()> {
    writer.write_u8(match animation.mode {
        AnimationMode::Async => 0,
        AnimationMode::Sync => 1,
    })?;
    writer.write_i32(animation.loop_count)?;
    writer.write_i8(animation.start_frame)?;
    for duration in &animation.frame_durations {
        writer.write_u32(duration.min_duration)?;
        writer.write_u32(duration.max_duration)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::duration::HistoricalDurationPolicy;

    const POLICY: HistoricalDurationPolicy = HistoricalDurationPolicy;

    #[test]
    fn single_frame_group_roundtrips() {
        let mut group = FrameGroup::empty();
        group.width = 2;
        group.height = 1;
        group.exact_size = Some(32);
        group.sprite_index = vec![7, 8];

        let features = ClientFeatures::empty();
        let mut writer = ByteWriter::new();
        write_frame_group(&mut writer, DatVersion::V6, features, &group).unwrap();

        let bytes = writer.into_bytes();
        let mut reader = ByteReader::new(&bytes);
        let read_back = read_frame_group(&mut reader, DatVersion::V6, features, ThingCategory::Item, &POLICY).unwrap();
        assert_eq!(read_back, group);
    }

    #[test]
    fn pattern_z_absent_before_755() {
        let group = FrameGroup::empty();
        let features = ClientFeatures::empty();
        let mut writer = ByteWriter::new();
        write_frame_group(&mut writer, DatVersion::V1, features, &group).unwrap();
        // width, height, layers, patternX, patternY, frames -- no patternZ, no exactSize.
        assert_eq!(writer.into_bytes().len(), 6);
    }

    #[test]
    fn non_improved_multi_frame_group_synthesises_durations_from_policy() {
        let mut group = FrameGroup::empty();
        group.frames = 3;
        group.sprite_index = vec![1, 2, 3];

        let features = ClientFeatures::empty();
        let mut writer = ByteWriter::new();
        write_frame_group(&mut writer, DatVersion::V6, features, &group).unwrap();
        // No improved-animations feature: the descriptor never touches the wire.
        let bytes = writer.into_bytes();

        let mut reader = ByteReader::new(&bytes);
        let read_back =
            read_frame_group(&mut reader, DatVersion::V6, features, ThingCategory::Outfit, &POLICY).unwrap();
        let animation = read_back.animation.unwrap();
        assert_eq!(animation.frame_durations.len(), 3);
        assert!(animation.frame_durations.iter().all(|d| d.min_duration == 300 && d.max_duration == 300));
    }

    #[test]
    fn outfit_with_frame_groups_feature_writes_group_count_and_tags() {
        let mut thing = Thing::new_empty();
        thing.set_frame_group(FrameGroupSlot::Walking, FrameGroup::empty());

        let features = ClientFeatures::FRAME_GROUPS;
        let mut writer = ByteWriter::new();
        write_frame_groups(&mut writer, DatVersion::V6, features, ThingCategory::Outfit, &thing).unwrap();
        let bytes = writer.into_bytes();

        assert_eq!(bytes[0], 2); // group count
        assert_eq!(bytes[1], 0); // Default tag

        let mut reader = ByteReader::new(&bytes);
        let mut read_thing = Thing::new_empty();
        read_frame_groups(&mut reader, DatVersion::V6, features, ThingCategory::Outfit, &POLICY, &mut read_thing)
            .unwrap();
        assert!(read_thing.has_walking_group());
    }

    #[test]
    fn item_never_gets_group_count_prefix_even_with_feature_on() {
        let thing = Thing::new_empty();
        let features = ClientFeatures::FRAME_GROUPS;
        let mut writer = ByteWriter::new();
        write_frame_groups(&mut writer, DatVersion::V6, features, ThingCategory::Item, &thing).unwrap();
        // Same byte layout as a single bare frame group: no leading count byte.
        assert_eq!(writer.into_bytes().len(), 6);
    }
}
