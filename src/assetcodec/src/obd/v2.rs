//! OBD sub-version 2 (spec §4.7 "V2"): adds the `200` marker word and a
//! back-patched `spritesStart` absolute offset ahead of the properties
//! block, so a reader can seek straight to the embedded sprite table
//! without walking the texture pattern first. Like V1, a V2 file never
//! carries more than one (Default) frame group -- multi-group outfits
//! are a V3-only capability (spec §4.7 says so only of V3's "Outfits
//! therefore may carry both a Default and a Walking sprite set").
//!
//! V2's defining feature is that every sprite record is a fixed 4096
//! bytes, zero-padded if the source tile is shorter or absent, rather
//! than V1/V3's variable-length RLE-compressed record -- it wastes
//! space but makes every sprite's offset computable from its position.

use crate::dat::{DurationPolicy, Thing};
use crate::error::{AssetError, Result};
use crate::stream::{ByteReader, ByteWriter};

use super::{
    category_from_byte, category_to_byte, features_for, properties, read_sprite_records,
    write_sprite_records, ObdFile, ObdVersion, V2_MARKER,
};

pub fn read_body(reader: &mut ByteReader, duration_policy: &dyn DurationPolicy) -> Result<ObdFile> {
    // The marker word was already consumed by `read_obd`'s dispatch.
    let client_version = reader.read_u16()?;
    let category = category_from_byte(reader.read_u8()?)?;
    let sprites_start = reader.read_u32()? as u64;

    let mut thing = Thing::new_empty();
    properties::read_properties(reader, &mut thing)?;

    let dat_version = crate::dat::DatVersion::from_client_version(client_version);
    let features = features_for(client_version);
    let group = crate::dat::texture::read_frame_group(reader, dat_version, features, category, duration_policy)?;
    let ids = group.sprite_index.clone();
    thing.set_frame_group(crate::dat::FrameGroupSlot::Default, group);

    if reader.position() != sprites_start {
        return Err(AssetError::format(
            "obd_v2",
            format!(
                "spritesStart mismatch: header said {sprites_start}, texture block ended at {}",
                reader.position()
            ),
        ));
    }

    let sprites = read_sprite_records(reader, &ids, true)?;

    Ok(ObdFile {
        version: ObdVersion::V2,
        client_version,
        category,
        thing,
        sprites,
    })
}

pub fn write_body(writer: &mut ByteWriter, file: &ObdFile) -> Result<()> {
    writer.write_u16(V2_MARKER)?;
    writer.write_u16(file.client_version)?;
    writer.write_u8(category_to_byte(file.category))?;

    let sprites_start_offset = writer.position();
    writer.write_u32(0)?;

    properties::write_properties(writer, file.category, &file.thing)?;

    let dat_version = crate::dat::DatVersion::from_client_version(file.client_version);
    let features = features_for(file.client_version);
    let group = file
        .thing
        .get_frame_group(crate::dat::FrameGroupSlot::Default)
        .ok_or_else(|| AssetError::format("obd_v2", "thing has no default frame group"))?;
    crate::dat::texture::write_frame_group(writer, dat_version, features, group)?;

    let sprites_start = writer.position();
    let end_position = sprites_start;
    writer.set_position(sprites_start_offset);
    writer.write_u32(sprites_start as u32)?;
    writer.set_position(end_position);

    write_sprite_records(writer, &group.sprite_index, &file.sprites, true)?;

    Ok(())
}
