//! Big-endian input cursor used by the PDX decoders.

use crate::error::{GridError, Result};
use bytes::Buf;
use std::io::Cursor;

/// Trait for reading primitive values from the gridcache binary format.
///
/// All multi-byte values are read in big-endian byte order.
pub trait DataInput {
    /// Reads a single signed byte.
    fn read_byte(&mut self) -> Result<i8>;

    /// Reads a single unsigned byte.
    fn read_u8(&mut self) -> Result<u8>;

    /// Reads a boolean from a single byte.
    fn read_bool(&mut self) -> Result<bool>;

    /// Reads a 16-bit signed integer.
    fn read_short(&mut self) -> Result<i16>;

    /// Reads a 16-bit unsigned integer.
    fn read_u16(&mut self) -> Result<u16>;

    /// Reads a 32-bit signed integer.
    fn read_int(&mut self) -> Result<i32>;

    /// Reads a 64-bit signed integer.
    fn read_long(&mut self) -> Result<i64>;

    /// Reads a 32-bit IEEE-754 float.
    fn read_float(&mut self) -> Result<f32>;

    /// Reads a 64-bit IEEE-754 float.
    fn read_double(&mut self) -> Result<f64>;

    /// Reads the specified number of raw bytes.
    fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>>;

    /// Reads a length or count prefix; `None` for the null marker.
    fn read_len(&mut self) -> Result<Option<usize>> {
        let len = self.read_int()?;
        match len {
            -1 => Ok(None),
            n if n < 0 => Err(GridError::Serialization(format!("invalid length: {n}"))),
            n => Ok(Some(n as usize)),
        }
    }

    /// Reads a nullable, length-prefixed UTF-8 string.
    fn read_string(&mut self) -> Result<Option<String>> {
        let Some(len) = self.read_len()? else {
            return Ok(None);
        };
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|e| GridError::Serialization(format!("invalid UTF-8 string: {e}")))
    }

    /// Reads a nullable string prefixed with its UTF-16 code unit count.
    fn read_wide_string(&mut self) -> Result<Option<String>> {
        let Some(units) = self.read_len()? else {
            return Ok(None);
        };
        let raw = self.read_bytes(units.checked_mul(2).ok_or_else(|| {
            GridError::Serialization(format!("invalid wide string length: {units}"))
        })?)?;
        let units: Vec<u16> = raw
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16(&units)
            .map(Some)
            .map_err(|e| GridError::Serialization(format!("invalid UTF-16 string: {e}")))
    }
}

/// A buffer-based implementation of `DataInput`.
#[derive(Debug)]
pub struct ObjectDataInput<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> ObjectDataInput<'a> {
    /// Creates a new `ObjectDataInput` from the given byte slice.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(data),
        }
    }

    /// Returns the number of bytes remaining to be read.
    pub fn remaining(&self) -> usize {
        self.cursor.remaining()
    }

    /// Returns the current position in the buffer.
    pub fn position(&self) -> u64 {
        self.cursor.position()
    }

    /// Fails unless every byte of the input has been consumed.
    pub fn expect_end(&self) -> Result<()> {
        match self.cursor.remaining() {
            0 => Ok(()),
            n => Err(GridError::Serialization(format!(
                "{n} trailing byte(s) after value"
            ))),
        }
    }

    fn ensure_remaining(&self, n: usize) -> Result<()> {
        if self.cursor.remaining() < n {
            Err(GridError::Serialization(format!(
                "insufficient data: need {} bytes, have {}",
                n,
                self.cursor.remaining()
            )))
        } else {
            Ok(())
        }
    }
}

impl DataInput for ObjectDataInput<'_> {
    fn read_byte(&mut self) -> Result<i8> {
        self.ensure_remaining(1)?;
        Ok(self.cursor.get_i8())
    }

    fn read_u8(&mut self) -> Result<u8> {
        self.ensure_remaining(1)?;
        Ok(self.cursor.get_u8())
    }

    fn read_bool(&mut self) -> Result<bool> {
        self.ensure_remaining(1)?;
        Ok(self.cursor.get_u8() != 0)
    }

    fn read_short(&mut self) -> Result<i16> {
        self.ensure_remaining(2)?;
        Ok(self.cursor.get_i16())
    }

    fn read_u16(&mut self) -> Result<u16> {
        self.ensure_remaining(2)?;
        Ok(self.cursor.get_u16())
    }

    fn read_int(&mut self) -> Result<i32> {
        self.ensure_remaining(4)?;
        Ok(self.cursor.get_i32())
    }

    fn read_long(&mut self) -> Result<i64> {
        self.ensure_remaining(8)?;
        Ok(self.cursor.get_i64())
    }

    fn read_float(&mut self) -> Result<f32> {
        self.ensure_remaining(4)?;
        Ok(self.cursor.get_f32())
    }

    fn read_double(&mut self) -> Result<f64> {
        self.ensure_remaining(8)?;
        Ok(self.cursor.get_f64())
    }

    fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        self.ensure_remaining(len)?;
        let mut buf = vec![0u8; len];
        self.cursor.copy_to_slice(&mut buf);
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialization::{DataOutput, ObjectDataOutput};

    #[test]
    fn test_new_input() {
        let data = [1, 2, 3, 4];
        let input = ObjectDataInput::new(&data);
        assert_eq!(input.remaining(), 4);
        assert_eq!(input.position(), 0);
    }

    #[test]
    fn test_read_byte_negative() {
        let data = [0xFFu8];
        let mut input = ObjectDataInput::new(&data);
        assert_eq!(input.read_byte().unwrap(), -1);
    }

    #[test]
    fn test_read_bool_nonzero_is_true() {
        let data = [42u8, 0];
        let mut input = ObjectDataInput::new(&data);
        assert!(input.read_bool().unwrap());
        assert!(!input.read_bool().unwrap());
    }

    #[test]
    fn test_read_int_big_endian() {
        let data = [0x01, 0x02, 0x03, 0x04];
        let mut input = ObjectDataInput::new(&data);
        assert_eq!(input.read_int().unwrap(), 0x01020304);
        input.expect_end().unwrap();
    }

    #[test]
    fn test_read_past_end_fails() {
        let data = [0x01, 0x02];
        let mut input = ObjectDataInput::new(&data);
        let err = input.read_int().unwrap_err();
        assert!(err.to_string().contains("insufficient data"));
    }

    #[test]
    fn test_read_len_null_and_negative() {
        let data = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE];
        let mut input = ObjectDataInput::new(&data);
        assert_eq!(input.read_len().unwrap(), None);
        assert!(input.read_len().is_err());
    }

    #[test]
    fn test_read_string_written_by_output() {
        let mut output = ObjectDataOutput::new();
        output.write_string("grid").unwrap();
        output.write_null().unwrap();
        let bytes = output.into_bytes();

        let mut input = ObjectDataInput::new(&bytes);
        assert_eq!(input.read_string().unwrap().as_deref(), Some("grid"));
        assert_eq!(input.read_string().unwrap(), None);
    }

    #[test]
    fn test_read_wide_string_with_surrogates() {
        let mut output = ObjectDataOutput::new();
        output.write_wide_string("x\u{1F600}").unwrap();
        let bytes = output.into_bytes();

        let mut input = ObjectDataInput::new(&bytes);
        assert_eq!(input.read_wide_string().unwrap().as_deref(), Some("x\u{1F600}"));
    }

    #[test]
    fn test_read_invalid_utf8() {
        let data = [0, 0, 0, 2, 0xC3, 0x28];
        let mut input = ObjectDataInput::new(&data);
        assert!(input.read_string().is_err());
    }

    #[test]
    fn test_expect_end_reports_trailing_bytes() {
        let data = [1u8, 2];
        let mut input = ObjectDataInput::new(&data);
        input.read_u8().unwrap();
        assert!(input.expect_end().is_err());
    }
}
