//! Record framing: the ordered list of named, tagged field payloads.

use std::collections::HashMap;

use super::reader::{decode_field, PdxValue};
use super::PdxFieldType;
use crate::error::{GridError, Result};
use crate::serialization::{DataInput, DataOutput, ObjectDataInput, ObjectDataOutput};

const IDENTITY_FLAG: u8 = 0x01;

/// One encoded field as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawField {
    pub(crate) name: String,
    pub(crate) field_type: PdxFieldType,
    pub(crate) identity: bool,
    pub(crate) payload: Vec<u8>,
}

impl RawField {
    pub(crate) fn encode_into(&self, out: &mut ObjectDataOutput) -> Result<()> {
        out.write_string(&self.name)?;
        out.write_byte(self.field_type.id())?;
        out.write_u8(if self.identity { IDENTITY_FLAG } else { 0 })?;
        out.write_len(self.payload.len())?;
        out.write_bytes(&self.payload)
    }

    fn decode_from(input: &mut ObjectDataInput<'_>) -> Result<Self> {
        let name = input
            .read_string()?
            .ok_or_else(|| GridError::Serialization("null PDX field name".to_string()))?;
        let field_type = PdxFieldType::from_id(input.read_byte()?)?;
        let flags = input.read_u8()?;
        let len = input.read_len()?.ok_or_else(|| {
            GridError::Serialization(format!("null payload for field '{name}'"))
        })?;
        let payload = input.read_bytes(len)?;
        Ok(Self {
            name,
            field_type,
            identity: flags & IDENTITY_FLAG != 0,
            payload,
        })
    }
}

pub(crate) fn encode_record(type_name: &str, fields: &[RawField]) -> Result<Vec<u8>> {
    let payload_len: usize = fields.iter().map(|f| f.name.len() + f.payload.len() + 10).sum();
    let mut out = ObjectDataOutput::with_capacity(type_name.len() + 8 + payload_len);
    out.write_string(type_name)?;
    out.write_len(fields.len())?;
    for field in fields {
        field.encode_into(&mut out)?;
    }
    Ok(out.into_bytes())
}

/// A decoded PDX record with lazily decoded field values.
#[derive(Debug, Clone, PartialEq)]
pub struct PdxRecord {
    type_name: String,
    fields: Vec<RawField>,
    index: HashMap<String, usize>,
}

impl PdxRecord {
    /// Parses a record from its wire form.
    ///
    /// Fails on unknown tags, duplicate field names and trailing bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut input = ObjectDataInput::new(data);
        let record = Self::decode_from(&mut input)?;
        input.expect_end()?;
        Ok(record)
    }

    pub(crate) fn decode_from(input: &mut ObjectDataInput<'_>) -> Result<Self> {
        let type_name = input
            .read_string()?
            .ok_or_else(|| GridError::Serialization("null PDX type name".to_string()))?;
        let count = input.read_len()?.ok_or_else(|| {
            GridError::Serialization(format!("null field count for '{type_name}'"))
        })?;

        let mut fields = Vec::with_capacity(count.min(input.remaining()));
        let mut index = HashMap::with_capacity(count.min(input.remaining()));
        for position in 0..count {
            let field = RawField::decode_from(input)?;
            if index.insert(field.name.clone(), position).is_some() {
                return Err(GridError::Serialization(format!(
                    "duplicate field '{}' in record of type '{}'",
                    field.name, type_name
                )));
            }
            fields.push(field);
        }

        Ok(Self {
            type_name,
            fields,
            index,
        })
    }

    /// Re-encodes this record.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        encode_record(&self.type_name, &self.fields)
    }

    /// Returns the type name.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns the number of fields.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Returns the field names in wire order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Returns true if a field with the given name exists.
    pub fn has_field(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Returns the wire type of the named field.
    pub fn field_type(&self, name: &str) -> Option<PdxFieldType> {
        self.raw(name).map(|f| f.field_type)
    }

    /// Returns the names of the fields that make up this record's identity.
    ///
    /// When the writer marked no identity field, every field is returned.
    pub fn identity_fields(&self) -> Vec<&str> {
        let marked: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.identity)
            .map(|f| f.name.as_str())
            .collect();
        if marked.is_empty() {
            self.field_names().collect()
        } else {
            marked
        }
    }

    /// Decodes the named field, or returns `None` if the record lacks it.
    pub fn value(&self, name: &str) -> Result<Option<PdxValue>> {
        self.raw(name).map(decode_field).transpose()
    }

    /// Decodes every field in wire order.
    pub fn values(&self) -> Result<Vec<(&str, PdxValue)>> {
        self.fields
            .iter()
            .map(|f| Ok((f.name.as_str(), decode_field(f)?)))
            .collect()
    }

    pub(crate) fn raw(&self, name: &str) -> Option<&RawField> {
        self.index.get(name).map(|&i| &self.fields[i])
    }

    pub(crate) fn raw_fields(&self) -> &[RawField] {
        &self.fields
    }
}
