//! A bounded little-endian cursor over an in-memory buffer.
//!
//! Every decoder in the crate reads through this type rather than touching
//! `std::io` directly: it turns "read past the end" into a typed
//! [`CursorError::Truncated`] instead of a short read, and keeps alignment
//! and length-prefixed string helpers in one place.

use thiserror::Error;

use super::strings::{StringEncoding, StringError};

#[derive(Debug, Error)]
pub enum CursorError {
    #[error("TRUNCATED: tried to read {requested} bytes at offset {offset}, only {available} available")]
    Truncated { offset: u64, requested: u64, available: u64 },

    #[error("seek to {0} is out of bounds (len {1})")]
    SeekOutOfBounds(u64, u64),

    #[error("string decode error: {0}")]
    StringError(#[from] StringError),
}

/// A read/write cursor over an owned byte buffer, bounds-checked on every
/// access. Writers append in place; readers never see a short read.
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: u64,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn remaining(&self) -> u64 {
        self.len().saturating_sub(self.pos)
    }

    pub fn seek_absolute(&mut self, pos: u64) -> Result<(), CursorError> {
        if pos > self.len() {
            return Err(CursorError::SeekOutOfBounds(pos, self.len()));
        }
        self.pos = pos;
        Ok(())
    }

    pub fn seek_relative(&mut self, delta: i64) -> Result<(), CursorError> {
        let target = (self.pos as i64)
            .checked_add(delta)
            .filter(|&p| p >= 0)
            .ok_or(CursorError::SeekOutOfBounds(self.pos, self.len()))?;
        self.seek_absolute(target as u64)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CursorError> {
        let start = self.pos as usize;
        let end = start.checked_add(n).ok_or(CursorError::Truncated {
            offset: self.pos,
            requested: n as u64,
            available: self.remaining(),
        })?;
        if end > self.data.len() {
            return Err(CursorError::Truncated {
                offset: self.pos,
                requested: n as u64,
                available: self.remaining(),
            });
        }
        self.pos = end as u64;
        Ok(&self.data[start..end])
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], CursorError> {
        self.take(n)
    }

    pub fn read_u8(&mut self) -> Result<u8, CursorError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, CursorError> {
        Ok(u16::from_le_bytes(self.take(2)?.try_into().unwrap()))
    }

    pub fn read_u32(&mut self) -> Result<u32, CursorError> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    pub fn read_u64(&mut self) -> Result<u64, CursorError> {
        Ok(u64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    pub fn read_i32(&mut self) -> Result<i32, CursorError> {
        Ok(i32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    pub fn read_i64(&mut self) -> Result<i64, CursorError> {
        Ok(i64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    pub fn read_f32(&mut self) -> Result<f32, CursorError> {
        Ok(f32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    pub fn read_f64(&mut self) -> Result<f64, CursorError> {
        Ok(f64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    /// Reads a `u32` length prefix followed by that many bytes decoded with
    /// `encoding`, per spec §4.A's explicit-encoding string codec.
    pub fn read_prefixed_string(&mut self, encoding: StringEncoding) -> Result<String, CursorError> {
        let len = self.read_u32()? as usize;
        let bytes = self.take(len)?;
        Ok(encoding.decode(bytes)?)
    }

    /// Reads a `u32` length prefix, the string bytes, and the padding to the
    /// next 4-byte boundary (Godot pads string records this way).
    pub fn read_prefixed_string_padded(&mut self, encoding: StringEncoding) -> Result<String, CursorError> {
        let len = self.read_u32()? as usize;
        let bytes = self.take(len)?;
        let s = encoding.decode(bytes)?;
        self.align_to(4)?;
        Ok(s)
    }

    pub fn align_to(&mut self, boundary: u64) -> Result<(), CursorError> {
        let rem = self.pos % boundary;
        if rem != 0 {
            self.seek_relative((boundary - rem) as i64)?;
        }
        Ok(())
    }
}

/// A growable little-endian byte writer, mirroring [`Cursor`]'s read side.
#[derive(Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn position(&self) -> u64 {
        self.buf.len() as u64
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_bytes(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    pub fn write_prefixed_string(&mut self, s: &str, encoding: StringEncoding) {
        let bytes = encoding.encode(s);
        self.write_u32(bytes.len() as u32);
        self.write_bytes(&bytes);
    }

    pub fn write_prefixed_string_padded(&mut self, s: &str, encoding: StringEncoding) {
        self.write_prefixed_string(s, encoding);
        let rem = self.buf.len() % 4;
        if rem != 0 {
            self.buf.resize(self.buf.len() + (4 - rem), 0);
        }
    }

    /// Patches 4 bytes at `offset` with a little-endian `u32`, used by table
    /// headers whose size is only known after writing the table body.
    pub fn patch_u32(&mut self, offset: usize, v: u32) {
        self.buf[offset..offset + 4].copy_from_slice(&v.to_le_bytes());
    }
}
