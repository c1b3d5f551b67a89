//! Little-endian binary I/O primitives (spec §4.1, component C1).
//!
//! [`ByteReader`] wraps an owned or borrowed byte slice with a cursor;
//! [`ByteWriter`] owns a geometrically-growing `Vec<u8>`. Both expose
//! latin-1 strings of a caller-specified length and a two-byte-length-
//! prefixed UTF-8 string, matching the handful of string encodings the
//! wire formats in this crate actually use.

mod reader;
mod writer;

pub use reader::ByteReader;
pub use writer::ByteWriter;
