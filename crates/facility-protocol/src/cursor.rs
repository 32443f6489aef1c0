//! Big-endian primitive encoding over byte buffers.
//!
//! ```text
//! byte    1 byte
//! int32   4 bytes, most significant first
//! int64   8 bytes, most significant first
//! double  IEEE-754 bit pattern, written as int64
//! string  int32 byte length + raw UTF-8 bytes, no terminator
//! ```

use crate::error::{WireError, WireResult};

/// Growable write side of the cursor.
#[derive(Debug, Default, Clone)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty writer with room for `cap` bytes.
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            buf: Vec::with_capacity(cap),
        }
    }

    pub fn write_byte(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_i64(&mut self, value: i64) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    /// Writes the raw bit pattern of `value`; NaN payloads survive untouched.
    pub fn write_f64(&mut self, value: f64) {
        self.buf.extend_from_slice(&value.to_bits().to_be_bytes());
    }

    /// Writes a length-prefixed UTF-8 string.
    ///
    /// The prefix counts bytes, not characters.
    pub fn write_str(&mut self, value: &str) -> WireResult<()> {
        let len = i32::try_from(value.len()).map_err(|_| WireError::StringTooLong(value.len()))?;
        self.write_i32(len);
        self.buf.extend_from_slice(value.as_bytes());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Position-tracking read side of the cursor over a borrowed slice.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    slice: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(slice: &'a [u8]) -> Self {
        Self { slice, pos: 0 }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.slice.len().saturating_sub(self.pos)
    }

    #[inline]
    fn need(&self, n: usize) -> WireResult<()> {
        let remaining = self.remaining();
        if n > remaining {
            Err(WireError::BufferExhausted {
                needed: n,
                remaining,
            })
        } else {
            Ok(())
        }
    }

    fn read_bytes(&mut self, len: usize) -> WireResult<&'a [u8]> {
        self.need(len)?;
        let bytes = &self.slice[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> WireResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_byte(&mut self) -> WireResult<u8> {
        self.need(1)?;
        let byte = self.slice[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    pub fn read_i32(&mut self) -> WireResult<i32> {
        Ok(i32::from_be_bytes(self.read_array()?))
    }

    pub fn read_i64(&mut self) -> WireResult<i64> {
        Ok(i64::from_be_bytes(self.read_array()?))
    }

    pub fn read_f64(&mut self) -> WireResult<f64> {
        Ok(f64::from_bits(u64::from_be_bytes(self.read_array()?)))
    }

    /// Reads a length-prefixed UTF-8 string.
    ///
    /// The length is taken as unsigned and bounds-checked before anything is
    /// allocated, so a corrupt prefix fails with `BufferExhausted`.
    pub fn read_string(&mut self) -> WireResult<String> {
        let len = u32::from_be_bytes(self.read_array()?) as usize;
        let bytes = self.read_bytes(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| WireError::InvalidUtf8)
    }

    /// Returns the unread tail of the slice.
    pub fn as_slice(&self) -> &'a [u8] {
        &self.slice[self.pos.min(self.slice.len())..]
    }
}
