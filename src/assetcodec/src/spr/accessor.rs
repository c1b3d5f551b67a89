//! Lazy SPR accessor (spec §4.4, component C4).
//!
//! Parsing an SPR file means reading its signature and address table
//! only; sprite bodies are decompressed on demand by [`SprAccessor::get`]
//! rather than all at once, since a client's sprite sheet can be tens of
//! thousands of 32x32 tiles and most sessions only ever touch a handful.

use std::collections::BTreeMap;

use crate::error::{AssetError, Result};
use crate::pixels;
use crate::stream::ByteReader;

/// Three-byte legacy transparency key written ahead of every sprite
/// body. No reader in this crate has ever consulted it -- decoding
/// relies entirely on the RLE chunk stream that follows -- but it is
/// preserved on write for byte-for-byte compatibility with the legacy
/// reference tool.
const LEGACY_KEY_COLOR: [u8; 3] = [0xFF, 0x00, 0xFF];

/// An opened SPR file: its header fields and address table, with
/// sprite bodies decoded lazily.
pub struct SprAccessor {
    data: Option<Vec<u8>>,
    signature: u32,
    transparency: bool,
    addresses: Vec<u32>,
}

impl SprAccessor {
    /// Parses `data`'s header and address table. `extended` selects
    /// whether the sprite count (and therefore the address table
    /// length) is a 16 or 32-bit field; `transparency` selects how
    /// sprite bodies are later decompressed by [`Self::get`].
    pub fn parse(data: Vec<u8>, extended: bool, transparency: bool) -> Result<Self> {
        let (signature, addresses) = {
            let mut reader = ByteReader::new(&data);
            let signature = reader.read_u32()?;
            let count = if extended {
                reader.read_u32()?
            } else {
                reader.read_u16()? as u32
            };
            let mut addresses = Vec::with_capacity(count as usize);
            for _ in 0..count {
                addresses.push(reader.read_u32()?);
            }
            (signature, addresses)
        };

        Ok(SprAccessor {
            data: Some(data),
            signature,
            transparency,
            addresses,
        })
    }

    pub fn signature(&self) -> u32 {
        self.signature
    }

    pub fn sprite_count(&self) -> u32 {
        self.addresses.len() as u32
    }

    /// `true` iff `id` is within the address table and its slot is
    /// non-empty (spec §3 invariant: overlay `has` is built on this).
    pub fn has(&self, id: u32) -> bool {
        id >= 1
            && (id as usize) <= self.addresses.len()
            && self.addresses[id as usize - 1] != 0
    }

    /// Every present id, ascending.
    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        (1..=self.addresses.len() as u32).filter(move |&id| self.has(id))
    }

    /// Decodes one sprite into a 4096-byte ARGB tile, or `None` if `id`
    /// has no body. Errors if the accessor has been [`Self::dispose`]d.
    pub fn get(&self, id: u32) -> Result<Option<Vec<u8>>> {
        if !self.has(id) {
            return Ok(None);
        }

        let data = self.require_data()?;
        let offset = self.addresses[id as usize - 1] as u64;

        let mut reader = ByteReader::new(data);
        reader.set_position(offset);
        let _legacy_key = reader.read_bytes(3)?;
        let compressed_len = reader.read_u16()? as usize;
        let compressed = reader.read_bytes(compressed_len)?;

        let tile = pixels::decompress(&compressed, self.transparency)?;
        Ok(Some(tile))
    }

    /// Decodes every present sprite at once.
    pub fn extract_all(&self) -> Result<BTreeMap<u32, Vec<u8>>> {
        let mut out = BTreeMap::new();
        for id in self.ids() {
            if let Some(tile) = self.get(id)? {
                out.insert(id, tile);
            }
        }
        Ok(out)
    }

    /// Releases the underlying buffer. Every subsequent [`Self::get`]
    /// fails with [`AssetError::Resource`]; [`Self::has`]/[`Self::ids`]
    /// keep working since they only consult the already-parsed address
    /// table (spec §4.4 "disposing frees the body buffer, not the
    /// index").
    pub fn dispose(&mut self) {
        self.data = None;
    }

    pub fn is_disposed(&self) -> bool {
        self.data.is_none()
    }

    fn require_data(&self) -> Result<&[u8]> {
        self.data
            .as_deref()
            .ok_or(AssetError::Resource("spr accessor has been disposed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spr::writer::write_spr;

    #[test]
    fn empty_slots_report_absent() {
        let mut sprites = BTreeMap::new();
        sprites.insert(1, vec![0u8; 4096]);
        let bytes = write_spr(0xABCD, 2, &sprites, false, false).unwrap();

        let accessor = SprAccessor::parse(bytes, false, false).unwrap();
        assert!(accessor.has(1));
        assert!(!accessor.has(2));
        assert!(!accessor.has(3));
    }

    #[test]
    fn dispose_frees_body_access_but_keeps_index() {
        let mut sprites = BTreeMap::new();
        sprites.insert(1, vec![0u8; 4096]);
        let bytes = write_spr(1, 1, &sprites, false, false).unwrap();

        let mut accessor = SprAccessor::parse(bytes, false, false).unwrap();
        accessor.dispose();
        assert!(accessor.has(1));
        assert!(accessor.get(1).is_err());
    }

    #[test]
    fn roundtrip_decodes_solid_tile() {
        let mut tile = vec![0u8; 4096];
        for chunk in tile.chunks_exact_mut(4) {
            chunk.copy_from_slice(&[1, 2, 3, 255]);
        }
        let mut sprites = BTreeMap::new();
        sprites.insert(5, tile.clone());
        let bytes = write_spr(1, 5, &sprites, false, false).unwrap();

        let accessor = SprAccessor::parse(bytes, false, false).unwrap();
        let decoded = accessor.get(5).unwrap().unwrap();
        assert_eq!(decoded, tile);
    }
}
