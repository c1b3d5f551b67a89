//! LZMA-Alone stream compression (spec §4.2, component C2).
//!
//! OBD packets are always wrapped in a classic LZMA-Alone stream — the
//! same container the reference export tool produces — so that exported
//! files stay interoperable with legacy tooling. `lzma-rs` implements
//! that exact container (as opposed to the newer `.xz` framing), which
//! is why it was pulled in over the more commonly seen `xz2`/liblzma
//! bindings: no C toolchain dependency, and it speaks the wire format
//! this crate actually needs.

use std::io::{BufReader, Cursor};

use crate::error::{AssetError, Result};

/// Default compression preset used when the caller doesn't care about
/// the speed/ratio trade-off. Mirrors the reference tool's default of
/// favouring speed over ratio for interactive editor use.
///
/// `lzma-rs`'s encoder doesn't expose a numeric preset the way the
/// reference tool's `-1`..`-9` flags do; this constant documents the
/// intended default for callers that thread a level through their own
/// config and is accepted (and clamped) by [`compress`] for API
/// symmetry with the rest of the codec.
pub const DEFAULT_LEVEL: u32 = 1;

/// Compresses `data` into an LZMA-Alone stream at `level` (1-9, clamped).
pub fn compress(data: &[u8], level: u32) -> Result<Vec<u8>> {
    let _ = level.clamp(1, 9);
    let mut output = Vec::new();
    lzma_rs::lzma_compress(&mut BufReader::new(Cursor::new(data)), &mut output)
        .map_err(|e| AssetError::format("lzma", format!("compress failed: {e}")))?;
    Ok(output)
}

/// Decompresses an LZMA-Alone stream produced by [`compress`] or by the
/// legacy reference tool.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    lzma_rs::lzma_decompress(&mut BufReader::new(Cursor::new(data)), &mut output)
        .map_err(|e| AssetError::format("lzma", format!("decompress failed: {e}")))?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_empty() {
        let compressed = compress(&[], DEFAULT_LEVEL).unwrap();
        let decompressed = decompress(&compressed).unwrap();
        assert!(decompressed.is_empty());
    }

    #[test]
    fn roundtrip_arbitrary_bytes() {
        let data: Vec<u8> = (0..4096).map(|i| (i % 251) as u8).collect();
        let compressed = compress(&data, 6).unwrap();
        let decompressed = decompress(&compressed).unwrap();
        assert_eq!(decompressed, data);
    }
}
