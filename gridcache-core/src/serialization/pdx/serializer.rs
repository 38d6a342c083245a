//! Framing of PDX records as typed values.

use super::{PdxDeserializable, PdxReader, PdxRecord, PdxSerializable, PdxWriter};
use crate::error::{GridError, Result};
use crate::serialization::{DataInput, DataOutput, ObjectDataInput, ObjectDataOutput};

/// Type id that prefixes a serialized PDX record.
pub const PDX_TYPE_ID: i32 = -10;

/// Serializes PDX objects with their type id header.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdxSerializer {
    ignore_unread_fields: bool,
}

impl PdxSerializer {
    /// Creates a serializer that preserves unread fields.
    pub fn new() -> Self {
        Self::default()
    }

    /// When true, readers created by this serializer drop unread fields.
    pub fn with_ignore_unread_fields(mut self, ignore: bool) -> Self {
        self.ignore_unread_fields = ignore;
        self
    }

    /// Returns whether unread fields are dropped.
    pub fn ignores_unread_fields(&self) -> bool {
        self.ignore_unread_fields
    }

    /// Serializes a value as a framed PDX record.
    pub fn serialize<T: PdxSerializable + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        let mut writer = PdxWriter::new(value.type_name());
        value.to_pdx(&mut writer)?;
        let record = writer.to_bytes()?;

        let mut out = ObjectDataOutput::with_capacity(record.len() + 4);
        out.write_int(PDX_TYPE_ID)?;
        out.write_bytes(&record)?;
        Ok(out.into_bytes())
    }

    /// Decodes a framed PDX record without binding it to a type.
    pub fn deserialize_record(&self, data: &[u8]) -> Result<PdxRecord> {
        let mut input = ObjectDataInput::new(data);
        let type_id = input.read_int()?;
        if type_id != PDX_TYPE_ID {
            return Err(GridError::Serialization(format!(
                "expected PDX type id {PDX_TYPE_ID}, found {type_id}"
            )));
        }
        let record = PdxRecord::decode_from(&mut input)?;
        input.expect_end()?;
        Ok(record)
    }

    /// Deserializes a framed PDX record into `T`.
    pub fn deserialize<T: PdxDeserializable>(&self, data: &[u8]) -> Result<T> {
        let record = self.deserialize_record(data)?;
        let mut reader = PdxReader::new(record).ignore_unread_fields(self.ignore_unread_fields);
        T::from_pdx(&mut reader)
    }
}
