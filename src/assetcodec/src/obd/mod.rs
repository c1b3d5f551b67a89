//! The OBD single-object exchange format (spec §4.2, §4.7, component C7).
//!
//! An OBD file is an LZMA-Alone stream wrapping one self-contained
//! thing: its properties, its texture pattern(s), and the actual pixel
//! bodies of every sprite id its `spriteIndex` references, so the file
//! never depends on the sheet it was exported from. Three sub-versions
//! exist; [`read_obd`] detects which one a stream contains from the
//! first `u16` after decompression (spec §4.7 "Version detection").

mod v1;
mod v2;
mod v3;

pub mod properties;

use std::collections::BTreeMap;

use crate::dat::{ClientFeatures, DurationPolicy, Thing, ThingCategory};
use crate::error::{AssetError, Result};
use crate::lzma;
use crate::stream::{ByteReader, ByteWriter};

/// OBD sub-version, selected by the marker word at the start of the
/// decompressed stream (spec §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObdVersion {
    /// No marker word: the stream opens directly with `clientVersion`,
    /// which is always `>= 710` for a real client build.
    V1,
    /// Marker word `200`.
    V2,
    /// Marker word `300`.
    V3,
}

const V2_MARKER: u16 = 200;
const V3_MARKER: u16 = 300;
const MIN_V1_CLIENT_VERSION: u16 = 710;

/// Embedded sprite bodies are always carried with an explicit alpha
/// byte: an OBD file is meant to preserve a thing exactly, and the
/// classic opaque encoding would silently clip existing transparency.
const EMBEDDED_SPRITE_TRANSPARENCY: bool = true;

/// A fully parsed OBD file.
#[derive(Debug, Clone)]
pub struct ObdFile {
    pub version: ObdVersion,
    pub client_version: u16,
    pub category: ThingCategory,
    pub thing: Thing,
    /// Decompressed 4096-byte ARGB tiles, keyed by the sprite ids that
    /// appear in `thing`'s frame group(s) `spriteIndex`.
    pub sprites: BTreeMap<u32, Vec<u8>>,
}

/// Decompresses and parses a complete OBD file.
///
/// `duration_policy` supplies the per-category default animation
/// duration: a V1 file never stores explicit durations, and a V2/V3
/// file's frame group may still omit them if its originating client
/// predates improved animations (spec §4.6 point 3, §9).
pub fn read_obd(data: &[u8], duration_policy: &dyn DurationPolicy) -> Result<ObdFile> {
    let decompressed = lzma::decompress(data)?;
    let mut reader = ByteReader::new(&decompressed);

    let first_word = reader.read_u16()?;
    let version = if first_word == V3_MARKER {
        ObdVersion::V3
    } else if first_word == V2_MARKER {
        ObdVersion::V2
    } else if first_word >= MIN_V1_CLIENT_VERSION {
        reader.set_position(0);
        ObdVersion::V1
    } else {
        return Err(AssetError::format(
            "obd",
            format!("unknown OBD format (marker word {first_word})"),
        ));
    };

    match version {
        ObdVersion::V1 => v1::read_body(&mut reader, duration_policy),
        ObdVersion::V2 => v2::read_body(&mut reader, duration_policy),
        ObdVersion::V3 => v3::read_body(&mut reader, duration_policy),
    }
}

/// Serialises and compresses a complete OBD file.
pub fn write_obd(file: &ObdFile) -> Result<Vec<u8>> {
    let mut writer = ByteWriter::new();
    match file.version {
        ObdVersion::V1 => v1::write_body(&mut writer, file)?,
        ObdVersion::V2 => v2::write_body(&mut writer, file)?,
        ObdVersion::V3 => v3::write_body(&mut writer, file)?,
    }
    lzma::compress(writer.as_slice(), lzma::DEFAULT_LEVEL)
}

fn category_from_byte(byte: u8) -> Result<ThingCategory> {
    match byte {
        0 => Ok(ThingCategory::Item),
        1 => Ok(ThingCategory::Outfit),
        2 => Ok(ThingCategory::Effect),
        3 => Ok(ThingCategory::Missile),
        other => Err(AssetError::format("obd", format!("unknown category byte {other}"))),
    }
}

fn category_to_byte(category: ThingCategory) -> u8 {
    match category {
        ThingCategory::Item => 0,
        ThingCategory::Outfit => 1,
        ThingCategory::Effect => 2,
        ThingCategory::Missile => 3,
    }
}

/// V1 names its category instead of encoding it as a byte (spec §4.7
/// "V1 body": `categoryName:UTF-8-length-prefixed`).
fn category_from_name(name: &str) -> Result<ThingCategory> {
    match name {
        "item" => Ok(ThingCategory::Item),
        "outfit" => Ok(ThingCategory::Outfit),
        "effect" => Ok(ThingCategory::Effect),
        "missile" => Ok(ThingCategory::Missile),
        other => Err(AssetError::format("obd", format!("unknown category name {other:?}"))),
    }
}

fn category_to_name(category: ThingCategory) -> &'static str {
    match category {
        ThingCategory::Item => "item",
        ThingCategory::Outfit => "outfit",
        ThingCategory::Effect => "effect",
        ThingCategory::Missile => "missile",
    }
}

fn features_for(client_version: u16) -> ClientFeatures {
    ClientFeatures::empty().apply_version_defaults(client_version)
}

/// Reads one frame group's embedded sprite records: exactly `ids.len()`
/// of them (one per `spriteIndex` slot, duplicates and all -- spec
/// §4.7 "a sequence of variable-length sprite records ... of length
/// totalSprites"), each carrying its own `id:u32` rather than a
/// renumbering assigned by position.
///
/// `fixed_size` selects V2's fixed 4096-byte padded record over
/// V1/V3's variable-length RLE-compressed record.
fn read_sprite_records(
    reader: &mut ByteReader,
    ids: &[u32],
    fixed_size: bool,
) -> Result<BTreeMap<u32, Vec<u8>>> {
    let mut sprites = BTreeMap::new();
    for _ in ids {
        let id = reader.read_u32()?;
        if fixed_size {
            let tile = reader.read_bytes(crate::pixels::TILE_BYTES)?;
            sprites.insert(id, tile);
        } else {
            let len = reader.read_u32()? as usize;
            if len == 0 {
                // "len==0 means no sprite bytes" -- the slot stays absent.
                continue;
            }
            let compressed = reader.read_bytes(len)?;
            let tile = crate::pixels::decompress(&compressed, EMBEDDED_SPRITE_TRANSPARENCY)?;
            sprites.insert(id, tile);
        }
    }
    Ok(sprites)
}

/// Writes one frame group's embedded sprite records, one per `ids`
/// entry in order. A missing `sprites` entry writes a zero-length
/// record (variable form) or an all-zero 4096-byte tile (fixed form).
fn write_sprite_records(
    writer: &mut ByteWriter,
    ids: &[u32],
    sprites: &BTreeMap<u32, Vec<u8>>,
    fixed_size: bool,
) -> Result<()> {
    for &id in ids {
        writer.write_u32(id)?;
        let tile = sprites.get(&id);
        if fixed_size {
            let mut padded = tile.cloned().unwrap_or_default();
            padded.resize(crate::pixels::TILE_BYTES, 0);
            writer.write_bytes(&padded)?;
        } else {
            match tile {
                Some(tile) => {
                    let compressed = crate::pixels::compress(tile, EMBEDDED_SPRITE_TRANSPARENCY)?;
                    writer.write_u32(compressed.len() as u32)?;
                    writer.write_bytes(&compressed)?;
                }
                None => writer.write_u32(0)?,
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dat::HistoricalDurationPolicy;

    const POLICY: HistoricalDurationPolicy = HistoricalDurationPolicy;

    #[test]
    fn v1_roundtrips_through_lzma() {
        let mut thing = Thing::new_empty();
        thing.is_pickupable = true;

        let file = ObdFile {
            version: ObdVersion::V1,
            client_version: 772,
            category: ThingCategory::Item,
            thing,
            sprites: BTreeMap::new(),
        };

        let bytes = write_obd(&file).unwrap();
        let read_back = read_obd(&bytes, &POLICY).unwrap();
        assert_eq!(read_back.version, ObdVersion::V1);
        assert_eq!(read_back.client_version, 772);
        assert!(read_back.thing.is_pickupable);
    }

    #[test]
    fn unknown_marker_is_fatal() {
        // A too-small first word: not a marker, not a plausible client version.
        let mut writer = ByteWriter::new();
        writer.write_u16(42).unwrap();
        let compressed = lzma::compress(writer.as_slice(), lzma::DEFAULT_LEVEL).unwrap();
        assert!(read_obd(&compressed, &POLICY).is_err());
    }
}
