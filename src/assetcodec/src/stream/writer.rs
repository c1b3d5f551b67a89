use byteorder::{LittleEndian, WriteBytesExt};
use std::io::{Cursor, Write};

use crate::error::Result;

/// A growable little-endian output buffer with a settable cursor.
///
/// The cursor is the reason this wraps a `Cursor<Vec<u8>>` instead of a
/// bare `Vec<u8>`: OBD V2/V3 headers reserve a `spritesStart` placeholder
/// up front and back-patch it once the real offset is known (spec §4.7),
/// which needs an absolute seek-and-overwrite, not just append.
pub struct ByteWriter {
    cursor: Cursor<Vec<u8>>,
}

impl ByteWriter {
    pub fn new() -> Self {
        ByteWriter {
            cursor: Cursor::new(Vec::new()),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        ByteWriter {
            cursor: Cursor::new(Vec::with_capacity(capacity)),
        }
    }

    pub fn position(&self) -> u64 {
        self.cursor.position()
    }

    pub fn set_position(&mut self, position: u64) {
        self.cursor.set_position(position);
    }

    pub fn write_u8(&mut self, v: u8) -> Result<()> {
        Ok(self.cursor.write_u8(v)?)
    }

    pub fn write_i8(&mut self, v: i8) -> Result<()> {
        Ok(self.cursor.write_i8(v)?)
    }

    pub fn write_u16(&mut self, v: u16) -> Result<()> {
        Ok(self.cursor.write_u16::<LittleEndian>(v)?)
    }

    pub fn write_i16(&mut self, v: i16) -> Result<()> {
        Ok(self.cursor.write_i16::<LittleEndian>(v)?)
    }

    pub fn write_u32(&mut self, v: u32) -> Result<()> {
        Ok(self.cursor.write_u32::<LittleEndian>(v)?)
    }

    pub fn write_i32(&mut self, v: i32) -> Result<()> {
        Ok(self.cursor.write_i32::<LittleEndian>(v)?)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        Ok(self.cursor.write_all(bytes)?)
    }

    /// Writes `s` as latin-1, one byte per scalar. Callers are
    /// responsible for ensuring `s` is representable in latin-1 (every
    /// string that reaches this crate's writers originates from a
    /// latin-1 read or from market/item names which the game's tooling
    /// constrains to that charset).
    pub fn write_latin1_string(&mut self, s: &str) -> Result<()> {
        let bytes: Vec<u8> = s.chars().map(|c| c as u32 as u8).collect();
        self.write_bytes(&bytes)
    }

    pub fn write_prefixed_string(&mut self, s: &str) -> Result<()> {
        self.write_u16(s.len() as u16)?;
        self.write_bytes(s.as_bytes())
    }

    /// Writes a two-byte-length-prefixed latin-1 string (spec §4.5
    /// "MarketItem ... latin-1 name with 16-bit length prefix").
    pub fn write_latin1_prefixed_string(&mut self, s: &str) -> Result<()> {
        let bytes: Vec<u8> = s.chars().map(|c| c as u32 as u8).collect();
        self.write_u16(bytes.len() as u16)?;
        self.write_bytes(&bytes)
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.cursor.into_inner()
    }

    pub fn as_slice(&self) -> &[u8] {
        self.cursor.get_ref()
    }
}

impl Default for ByteWriter {
    fn default() -> Self {
        Self::new()
    }
}
