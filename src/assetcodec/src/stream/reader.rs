use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};

use crate::error::{AssetError, Result};

/// A cursor over an in-memory buffer, little-endian throughout.
///
/// The reader never copies the input up front — it borrows or owns the
/// `Vec<u8>` it was built from and materialises only what callers ask
/// for, which is what lets the SPR lazy accessor (component C4) sit on
/// top of a multi-hundred-megabyte buffer without doubling peak memory.
pub struct ByteReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        ByteReader {
            cursor: Cursor::new(data),
        }
    }

    pub fn position(&self) -> u64 {
        self.cursor.position()
    }

    pub fn set_position(&mut self, position: u64) {
        self.cursor.set_position(position);
    }

    pub fn remaining(&self) -> usize {
        let len = self.cursor.get_ref().len() as u64;
        len.saturating_sub(self.cursor.position()) as usize
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.cursor.read_u8()?)
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.cursor.read_i8()?)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(self.cursor.read_u16::<LittleEndian>()?)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(self.cursor.read_i16::<LittleEndian>()?)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(self.cursor.read_u32::<LittleEndian>()?)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.cursor.read_i32::<LittleEndian>()?)
    }

    /// Reads exactly `len` bytes, returning them as an owned `Vec<u8>`.
    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.cursor.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Borrows `len` bytes from the underlying buffer without copying.
    /// Used by the SPR accessor to hand back sprite bodies in place.
    pub fn peek_slice(&self, start: u64, len: usize) -> Result<&'a [u8]> {
        let data = *self.cursor.get_ref();
        let start = start as usize;
        let end = start
            .checked_add(len)
            .ok_or_else(|| AssetError::format("stream", "slice length overflow"))?;
        data.get(start..end)
            .ok_or_else(|| AssetError::format("stream", "slice out of bounds"))
    }

    /// Reads a latin-1 string of exactly `len` bytes. Latin-1 maps every
    /// byte value to the Unicode scalar of the same ordinal, so this
    /// conversion never fails.
    pub fn read_latin1_string(&mut self, len: usize) -> Result<String> {
        let bytes = self.read_bytes(len)?;
        Ok(bytes.into_iter().map(|b| b as char).collect())
    }

    /// Reads a two-byte-length-prefixed UTF-8 string.
    pub fn read_prefixed_string(&mut self) -> Result<String> {
        let len = self.read_u16()? as usize;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes)
            .map_err(|e| AssetError::format("stream", format!("invalid utf-8 string: {e}")))
    }

    /// Reads a two-byte-length-prefixed latin-1 string, used by the
    /// market-item name field (spec §4.5 "MarketItem ... latin-1 name
    /// with 16-bit length prefix").
    pub fn read_latin1_prefixed_string(&mut self) -> Result<String> {
        let len = self.read_u16()? as usize;
        self.read_latin1_string(len)
    }

    pub fn as_slice(&self) -> &'a [u8] {
        *self.cursor.get_ref()
    }
}
