//! Sprite pixel RLE codec (spec §4.3, component C3).
//!
//! Each sprite tile is exactly 32×32 ARGB pixels (4096 bytes). The wire
//! encoding runs transparent/coloured chunks: `[transparentCount:u16]
//! [colouredCount:u16][colouredPixel × colouredCount]`, stopping as soon
//! as the remainder of the tile is entirely transparent. A fully
//! transparent tile therefore serialises to nothing at all.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read, Write};

use crate::error::{AssetError, Result};

/// Pixel count per tile: 32 × 32.
pub const PIXEL_COUNT: usize = 32 * 32;
/// Byte length of one decompressed ARGB tile.
pub const TILE_BYTES: usize = PIXEL_COUNT * 4;

/// Byte substituted for every transparent channel in the RGB-hash
/// projection, kept bit-for-bit compatible with the legacy
/// content-addressed sprite deduplicator (spec §4.3).
pub const RGB_HASH_TRANSPARENT_BYTE: u8 = 0x11;

fn is_transparent(pixel: &[u8]) -> bool {
    pixel == [0, 0, 0, 0]
}

/// Compresses a 4096-byte ARGB tile into the RLE chunk stream.
///
/// `transparency` selects whether coloured pixels carry an explicit
/// alpha byte (4 bytes/pixel) or are written as opaque RGB (3
/// bytes/pixel, alpha is reconstructed as `0xFF` on decode).
pub fn compress(tile: &[u8], transparency: bool) -> Result<Vec<u8>> {
    if tile.len() != TILE_BYTES {
        return Err(AssetError::format(
            "sprite_pixels",
            format!("tile must be {TILE_BYTES} bytes, got {}", tile.len()),
        ));
    }

    let pixels: Vec<&[u8]> = tile.chunks_exact(4).collect();
    let mut out = Vec::new();
    let mut i = 0usize;

    while i < pixels.len() {
        let transparent_start = i;
        while i < pixels.len() && is_transparent(pixels[i]) {
            i += 1;
        }
        let transparent_count = i - transparent_start;

        let coloured_start = i;
        while i < pixels.len() && !is_transparent(pixels[i]) {
            i += 1;
        }
        let coloured_count = i - coloured_start;

        if coloured_count == 0 {
            // Remainder of the tile is entirely transparent: stop here,
            // per spec "chunks stop once the remaining tile is entirely
            // transparent."
            break;
        }

        out.write_u16::<LittleEndian>(transparent_count as u16)?;
        out.write_u16::<LittleEndian>(coloured_count as u16)?;
        for pixel in &pixels[coloured_start..coloured_start + coloured_count] {
            if transparency {
                out.write_all(pixel)?;
            } else {
                out.write_all(&pixel[..3])?;
            }
        }
    }

    Ok(out)
}

/// Decompresses an RLE chunk stream into a 4096-byte ARGB tile. An empty
/// `compressed` slice decodes to an all-zero (fully transparent) tile.
/// Any trailing pixels the stream doesn't account for are transparent.
pub fn decompress(compressed: &[u8], transparency: bool) -> Result<Vec<u8>> {
    let mut out = vec![0u8; TILE_BYTES];
    let mut cursor = Cursor::new(compressed);
    let mut pixel_index = 0usize;

    while (cursor.position() as usize) < compressed.len() && pixel_index < PIXEL_COUNT {
        let transparent_count = cursor.read_u16::<LittleEndian>()? as usize;
        let coloured_count = cursor.read_u16::<LittleEndian>()? as usize;

        pixel_index += transparent_count;

        for _ in 0..coloured_count {
            if pixel_index >= PIXEL_COUNT {
                return Err(AssetError::format(
                    "sprite_pixels",
                    "coloured run overruns tile bounds",
                ));
            }
            let offset = pixel_index * 4;
            if transparency {
                let mut pixel = [0u8; 4];
                cursor.read_exact(&mut pixel)?;
                out[offset..offset + 4].copy_from_slice(&pixel);
            } else {
                let mut rgb = [0u8; 3];
                cursor.read_exact(&mut rgb)?;
                out[offset] = rgb[0];
                out[offset + 1] = rgb[1];
                out[offset + 2] = rgb[2];
                out[offset + 3] = 0xFF;
            }
            pixel_index += 1;
        }
    }

    Ok(out)
}

/// Projects a decompressed 4096-byte ARGB tile into a 3-byte-per-pixel
/// RGB view, substituting [`RGB_HASH_TRANSPARENT_BYTE`] for every
/// channel of a transparent pixel. Used only to feed a content hash that
/// must match the legacy deduplicator bit-for-bit; never used for
/// rendering.
pub fn rgb_hash_view(tile: &[u8]) -> Result<Vec<u8>> {
    if tile.len() != TILE_BYTES {
        return Err(AssetError::format(
            "sprite_pixels",
            format!("tile must be {TILE_BYTES} bytes, got {}", tile.len()),
        ));
    }

    let mut out = Vec::with_capacity(PIXEL_COUNT * 3);
    for pixel in tile.chunks_exact(4) {
        if is_transparent(pixel) {
            out.extend_from_slice(&[RGB_HASH_TRANSPARENT_BYTE; 3]);
        } else {
            out.extend_from_slice(&pixel[..3]);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_tile(r: u8, g: u8, b: u8, a: u8) -> Vec<u8> {
        let mut tile = Vec::with_capacity(TILE_BYTES);
        for _ in 0..PIXEL_COUNT {
            tile.extend_from_slice(&[r, g, b, a]);
        }
        tile
    }

    #[test]
    fn fully_transparent_tile_compresses_to_empty() {
        let tile = vec![0u8; TILE_BYTES];
        let compressed = compress(&tile, true).unwrap();
        assert!(compressed.is_empty());
        let round_tripped = decompress(&compressed, true).unwrap();
        assert_eq!(round_tripped, tile);
    }

    #[test]
    fn opaque_roundtrip_forces_alpha_ff() {
        let tile = solid_tile(10, 20, 30, 0);
        let compressed = compress(&tile, false).unwrap();
        let decompressed = decompress(&compressed, false).unwrap();
        let expected = solid_tile(10, 20, 30, 0xFF);
        assert_eq!(decompressed, expected);
    }

    #[test]
    fn transparent_mode_roundtrip_is_exact() {
        let mut tile = vec![0u8; TILE_BYTES];
        // First half opaque, second half transparent.
        for i in 0..(PIXEL_COUNT / 2) {
            let offset = i * 4;
            tile[offset] = 1;
            tile[offset + 1] = 2;
            tile[offset + 2] = 3;
            tile[offset + 3] = 255;
        }
        let compressed = compress(&tile, true).unwrap();
        let decompressed = decompress(&compressed, true).unwrap();
        assert_eq!(decompressed, tile);
    }

    #[test]
    fn rejects_wrong_length() {
        let tile = vec![0u8; 10];
        assert!(compress(&tile, true).is_err());
    }

    #[test]
    fn rgb_hash_substitutes_marker_byte() {
        let tile = vec![0u8; TILE_BYTES];
        let hash_view = rgb_hash_view(&tile).unwrap();
        assert!(hash_view.iter().all(|&b| b == RGB_HASH_TRANSPARENT_BYTE));
    }
}
