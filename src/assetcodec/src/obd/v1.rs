//! OBD sub-version 1: the oldest, marker-less layout (spec §4.7 "V1").
//!
//! No marker word, no `spritesStart` placeholder, and no multi-group
//! outfits -- the stream is simply `clientVersion, categoryName,
//! properties, one texture pattern, embedded sprites`. Unlike V2/V3,
//! the category travels as a length-prefixed name rather than a byte
//! code, and a multi-frame group here never carries an animation
//! descriptor at all -- durations always come from `duration_policy`.

use crate::dat::{DurationPolicy, Thing};
use crate::error::Result;
use crate::stream::{ByteReader, ByteWriter};

use super::{
    category_from_name, category_to_name, features_for, properties, read_sprite_records,
    write_sprite_records, ObdFile, ObdVersion,
};

pub fn read_body(reader: &mut ByteReader, duration_policy: &dyn DurationPolicy) -> Result<ObdFile> {
    let client_version = reader.read_u16()?;
    let category = category_from_name(&reader.read_prefixed_string()?)?;

    let mut thing = Thing::new_empty();
    properties::read_properties(reader, &mut thing)?;

    let dat_version = crate::dat::DatVersion::from_client_version(client_version);
    let features = features_for(client_version);
    let group = crate::dat::texture::read_frame_group(reader, dat_version, features, category, duration_policy)?;
    let ids = group.sprite_index.clone();
    thing.set_frame_group(crate::dat::FrameGroupSlot::Default, group);

    let sprites = read_sprite_records(reader, &ids, false)?;

    Ok(ObdFile {
        version: ObdVersion::V1,
        client_version,
        category,
        thing,
        sprites,
    })
}

pub fn write_body(writer: &mut ByteWriter, file: &ObdFile) -> Result<()> {
    writer.write_u16(file.client_version)?;
    writer.write_prefixed_string(category_to_name(file.category))?;

    properties::write_properties(writer, file.category, &file.thing)?;

    let dat_version = crate::dat::DatVersion::from_client_version(file.client_version);
    let features = features_for(file.client_version);
    let group = file
        .thing
        .get_frame_group(crate::dat::FrameGroupSlot::Default)
        .ok_or_else(|| crate::error::AssetError::format("obd_v1", "thing has no default frame group"))?;
    crate::dat::texture::write_frame_group(writer, dat_version, features, group)?;

    write_sprite_records(writer, &group.sprite_index, &file.sprites, false)?;

    Ok(())
}
