//! Big-endian output buffer used by the PDX encoders.

use crate::error::{GridError, Result};
use bytes::{BufMut, BytesMut};

/// Length marker written in place of a length prefix for a null value.
pub const NULL_LENGTH: i32 = -1;

/// Trait for writing primitive values in the gridcache binary format.
///
/// All multi-byte values are written in big-endian byte order.
pub trait DataOutput {
    /// Writes a single signed byte.
    fn write_byte(&mut self, v: i8) -> Result<()>;

    /// Writes a single unsigned byte.
    fn write_u8(&mut self, v: u8) -> Result<()>;

    /// Writes a boolean as a single byte (0 for false, 1 for true).
    fn write_bool(&mut self, v: bool) -> Result<()>;

    /// Writes a 16-bit signed integer.
    fn write_short(&mut self, v: i16) -> Result<()>;

    /// Writes a 16-bit unsigned integer (a UTF-16 code unit).
    fn write_u16(&mut self, v: u16) -> Result<()>;

    /// Writes a 32-bit signed integer.
    fn write_int(&mut self, v: i32) -> Result<()>;

    /// Writes a 64-bit signed integer.
    fn write_long(&mut self, v: i64) -> Result<()>;

    /// Writes a 32-bit IEEE-754 float.
    fn write_float(&mut self, v: f32) -> Result<()>;

    /// Writes a 64-bit IEEE-754 float.
    fn write_double(&mut self, v: f64) -> Result<()>;

    /// Writes raw bytes without a length prefix.
    fn write_bytes(&mut self, v: &[u8]) -> Result<()>;

    /// Writes a UTF-8 string prefixed with its byte length.
    fn write_string(&mut self, v: &str) -> Result<()>;

    /// Writes a string prefixed with its length in UTF-16 code units.
    fn write_wide_string(&mut self, v: &str) -> Result<()>;

    /// Writes an element count or byte length, rejecting values beyond `i32::MAX`.
    fn write_len(&mut self, len: usize) -> Result<()> {
        let len = i32::try_from(len).map_err(|_| {
            GridError::Serialization(format!("length {len} exceeds the wire maximum"))
        })?;
        self.write_int(len)
    }

    /// Writes the null length marker.
    fn write_null(&mut self) -> Result<()> {
        self.write_int(NULL_LENGTH)
    }
}

/// A buffer-based implementation of `DataOutput`.
#[derive(Debug)]
pub struct ObjectDataOutput {
    buffer: BytesMut,
}

impl ObjectDataOutput {
    /// Creates a new `ObjectDataOutput` with default capacity.
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(64),
        }
    }

    /// Creates a new `ObjectDataOutput` with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
        }
    }

    /// Returns the written bytes as a slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Consumes the output and returns the written bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer.to_vec()
    }

    /// Returns the number of bytes written.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if no bytes have been written.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Default for ObjectDataOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl DataOutput for ObjectDataOutput {
    fn write_byte(&mut self, v: i8) -> Result<()> {
        self.buffer.put_i8(v);
        Ok(())
    }

    fn write_u8(&mut self, v: u8) -> Result<()> {
        self.buffer.put_u8(v);
        Ok(())
    }

    fn write_bool(&mut self, v: bool) -> Result<()> {
        self.buffer.put_u8(u8::from(v));
        Ok(())
    }

    fn write_short(&mut self, v: i16) -> Result<()> {
        self.buffer.put_i16(v);
        Ok(())
    }

    fn write_u16(&mut self, v: u16) -> Result<()> {
        self.buffer.put_u16(v);
        Ok(())
    }

    fn write_int(&mut self, v: i32) -> Result<()> {
        self.buffer.put_i32(v);
        Ok(())
    }

    fn write_long(&mut self, v: i64) -> Result<()> {
        self.buffer.put_i64(v);
        Ok(())
    }

    fn write_float(&mut self, v: f32) -> Result<()> {
        self.buffer.put_f32(v);
        Ok(())
    }

    fn write_double(&mut self, v: f64) -> Result<()> {
        self.buffer.put_f64(v);
        Ok(())
    }

    fn write_bytes(&mut self, v: &[u8]) -> Result<()> {
        self.buffer.put_slice(v);
        Ok(())
    }

    fn write_string(&mut self, v: &str) -> Result<()> {
        self.write_len(v.len())?;
        self.write_bytes(v.as_bytes())
    }

    fn write_wide_string(&mut self, v: &str) -> Result<()> {
        let units: Vec<u16> = v.encode_utf16().collect();
        self.write_len(units.len())?;
        for unit in units {
            self.buffer.put_u16(unit);
        }
        Ok(())
    }
}
