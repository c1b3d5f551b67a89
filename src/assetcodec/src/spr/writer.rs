//! SPR file writer (spec §4.4, component C4).
//!
//! Sprite ids form a sparse `1..=count` mapping (most ids in a large
//! sheet are unused placeholders); the writer takes two passes over
//! that mapping -- first compressing every present body and laying out
//! offsets, then emitting the header, address table, and bodies in one
//! shot -- since every address must be known before the address table
//! itself can be written.

use std::collections::BTreeMap;

use crate::error::{AssetError, Result};
use crate::pixels;
use crate::stream::ByteWriter;

/// Highest sprite count representable in the 16-bit (non-extended)
/// count field. `0xFFFF` is reserved, so the count is clamped to
/// `0xFFFE` rather than wrapping (spec §4.4 "Extended vs. classic
/// count field").
pub const MAX_CLASSIC_SPRITE_COUNT: u32 = 0xFFFE;

/// Serialises `sprites` (a sparse id -> 4096-byte ARGB tile map) into a
/// complete SPR file.
///
/// `requested_count` sets the address table length regardless of the
/// highest id actually present; in non-extended mode it is silently
/// clamped to [`MAX_CLASSIC_SPRITE_COUNT`]. Any id beyond the
/// (possibly clamped) count is dropped from the output -- the caller
/// is expected to have sized `requested_count` from the same id space
/// `sprites` was built from.
pub fn write_spr(
    signature: u32,
    requested_count: u32,
    sprites: &BTreeMap<u32, Vec<u8>>,
    extended: bool,
    transparency: bool,
) -> Result<Vec<u8>> {
    let count = if extended {
        requested_count
    } else {
        requested_count.min(MAX_CLASSIC_SPRITE_COUNT)
    };

    let mut bodies: Vec<(u32, Vec<u8>)> = Vec::new();
    for (&id, tile) in sprites {
        if id == 0 || id > count {
            continue;
        }
        if tile.len() != pixels::TILE_BYTES {
            return Err(AssetError::format(
                "spr_writer",
                format!("sprite {id} is not a {}-byte tile", pixels::TILE_BYTES),
            ));
        }
        let compressed = pixels::compress(tile, transparency)?;
        bodies.push((id, compressed));
    }

    let header_len: u64 = if extended { 8 } else { 6 };
    let address_table_len: u64 = count as u64 * 4;
    let mut cursor = header_len + address_table_len;

    let mut addresses = vec![0u32; count as usize];
    let mut body_bytes = Vec::new();
    for (id, compressed) in &bodies {
        addresses[*id as usize - 1] = cursor as u32;
        body_bytes.extend_from_slice(&LEGACY_KEY_COLOR);
        body_bytes.extend_from_slice(&(compressed.len() as u16).to_le_bytes());
        body_bytes.extend_from_slice(compressed);
        cursor += 3 + 2 + compressed.len() as u64;
    }

    let mut writer = ByteWriter::with_capacity((header_len + address_table_len) as usize + body_bytes.len());
    writer.write_u32(signature)?;
    if extended {
        writer.write_u32(count)?;
    } else {
        writer.write_u16(count as u16)?;
    }
    for address in addresses {
        writer.write_u32(address)?;
    }
    writer.write_bytes(&body_bytes)?;

    Ok(writer.into_bytes())
}

const LEGACY_KEY_COLOR: [u8; 3] = [0xFF, 0x00, 0xFF];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spr::accessor::SprAccessor;

    #[test]
    fn count_clamps_to_classic_maximum() {
        let sprites = BTreeMap::new();
        let bytes = write_spr(1, 0x1_0000, &sprites, false, false).unwrap();
        let accessor = SprAccessor::parse(bytes, false, false).unwrap();
        assert_eq!(accessor.sprite_count(), MAX_CLASSIC_SPRITE_COUNT);
    }

    #[test]
    fn extended_mode_is_not_clamped() {
        let sprites = BTreeMap::new();
        let bytes = write_spr(1, 0x1_0000, &sprites, true, false).unwrap();
        let accessor = SprAccessor::parse(bytes, true, false).unwrap();
        assert_eq!(accessor.sprite_count(), 0x1_0000);
    }

    #[test]
    fn rejects_wrong_sized_tile() {
        let mut sprites = BTreeMap::new();
        sprites.insert(1, vec![0u8; 10]);
        assert!(write_spr(1, 1, &sprites, false, false).is_err());
    }
}
