//! The PDX field writer session.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::field::{CacheableObjectArray, CacheableValue, ObjectGraph, PdxField};
use super::record::{encode_record, RawField};
use super::{PdxFieldType, PdxSerializable, PdxUnreadFields};
use crate::error::{GridError, Result};
use crate::serialization::{DataOutput, ObjectDataOutput};

/// Collects the named fields of one object into a PDX record.
///
/// Every `write_*` method appends one field and returns the writer again, so
/// calls can be chained with `?`. A field name may be written only once. A
/// failed write leaves the session as it was before the call.
#[derive(Debug)]
pub struct PdxWriter {
    type_name: String,
    fields: Vec<RawField>,
    written: HashMap<String, usize>,
    unread_written: bool,
    graph: ObjectGraph,
}

impl PdxWriter {
    /// Starts a writer session for the given type name.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
            written: HashMap::new(),
            unread_written: false,
            graph: ObjectGraph::default(),
        }
    }

    /// Returns the type name this writer records.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns the number of fields written so far.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if a field with the given name was written.
    pub fn has_field(&self, name: &str) -> bool {
        self.written.contains_key(name)
    }

    /// Returns true if the named field was marked as an identity field.
    pub fn is_identity_field(&self, name: &str) -> bool {
        self.written
            .get(name)
            .is_some_and(|&i| self.fields[i].identity)
    }

    fn write_with<F>(&mut self, name: &str, field_type: PdxFieldType, encode: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut ObjectDataOutput, &mut ObjectGraph) -> Result<()>,
    {
        if name.is_empty() {
            return Err(GridError::IllegalState(format!(
                "field name must not be empty for type '{}'",
                self.type_name
            )));
        }
        if self.written.contains_key(name) {
            return Err(GridError::IllegalState(format!(
                "field '{}' has already been written for type '{}'",
                name, self.type_name
            )));
        }

        let mut out = ObjectDataOutput::with_capacity(field_type.fixed_size().unwrap_or(16));
        encode(&mut out, &mut self.graph)?;

        self.written.insert(name.to_string(), self.fields.len());
        self.fields.push(RawField {
            name: name.to_string(),
            field_type,
            identity: false,
            payload: out.into_bytes(),
        });
        Ok(self)
    }

    /// Writes any value with a PDX wire mapping.
    ///
    /// The wire tag follows from `T`: `i32` is written as an int field,
    /// `Option<String>` as a nullable string field, `Vec<i64>` as a long
    /// array, and so on.
    pub fn write<T: PdxField + ?Sized>(&mut self, name: &str, value: &T) -> Result<&mut Self> {
        self.write_with(name, T::FIELD_TYPE, |out, graph| value.encode(out, graph))
    }

    /// Writes a boolean field.
    pub fn write_boolean(&mut self, name: &str, value: bool) -> Result<&mut Self> {
        self.write(name, &value)
    }

    /// Writes a byte field.
    pub fn write_byte(&mut self, name: &str, value: i8) -> Result<&mut Self> {
        self.write(name, &value)
    }

    /// Writes a single-byte character field.
    pub fn write_char(&mut self, name: &str, value: u8) -> Result<&mut Self> {
        self.write(name, &value)
    }

    /// Writes a wide character field. The character must fit in one UTF-16
    /// code unit.
    pub fn write_wide_char(&mut self, name: &str, value: char) -> Result<&mut Self> {
        self.write(name, &value)
    }

    /// Writes a short field.
    pub fn write_short(&mut self, name: &str, value: i16) -> Result<&mut Self> {
        self.write(name, &value)
    }

    /// Writes an int field.
    pub fn write_int(&mut self, name: &str, value: i32) -> Result<&mut Self> {
        self.write(name, &value)
    }

    /// Writes a long field.
    pub fn write_long(&mut self, name: &str, value: i64) -> Result<&mut Self> {
        self.write(name, &value)
    }

    /// Writes a float field.
    pub fn write_float(&mut self, name: &str, value: f32) -> Result<&mut Self> {
        self.write(name, &value)
    }

    /// Writes a double field.
    pub fn write_double(&mut self, name: &str, value: f64) -> Result<&mut Self> {
        self.write(name, &value)
    }

    /// Writes a date field with millisecond precision.
    pub fn write_date(&mut self, name: &str, value: Option<&DateTime<Utc>>) -> Result<&mut Self> {
        self.write(name, &value)
    }

    /// Writes a UTF-8 string field.
    pub fn write_string(&mut self, name: &str, value: Option<&str>) -> Result<&mut Self> {
        self.write(name, &value)
    }

    /// Writes a UTF-16 string field.
    pub fn write_wide_string(&mut self, name: &str, value: Option<&str>) -> Result<&mut Self> {
        self.write_with(name, PdxFieldType::WideString, |out, _| match value {
            Some(s) => out.write_wide_string(s),
            None => out.write_null(),
        })
    }

    /// Writes an object field holding any value of the object graph.
    ///
    /// Nested PDX objects and arrays are checked for cycles; a value that
    /// contains itself fails with a serialization error.
    pub fn write_object(&mut self, name: &str, value: &CacheableValue) -> Result<&mut Self> {
        self.write(name, value)
    }

    /// Writes a boolean array field.
    pub fn write_boolean_array(&mut self, name: &str, value: Option<&[bool]>) -> Result<&mut Self> {
        self.write(name, &value)
    }

    /// Writes a single-byte character array field.
    pub fn write_char_array(&mut self, name: &str, value: Option<&[u8]>) -> Result<&mut Self> {
        self.write(name, &value)
    }

    /// Writes a wide character array field.
    pub fn write_wide_char_array(&mut self, name: &str, value: Option<&[char]>) -> Result<&mut Self> {
        self.write(name, &value)
    }

    /// Writes a byte array field.
    pub fn write_byte_array(&mut self, name: &str, value: Option<&[i8]>) -> Result<&mut Self> {
        self.write(name, &value)
    }

    /// Writes a short array field.
    pub fn write_short_array(&mut self, name: &str, value: Option<&[i16]>) -> Result<&mut Self> {
        self.write(name, &value)
    }

    /// Writes an int array field.
    pub fn write_int_array(&mut self, name: &str, value: Option<&[i32]>) -> Result<&mut Self> {
        self.write(name, &value)
    }

    /// Writes a long array field.
    pub fn write_long_array(&mut self, name: &str, value: Option<&[i64]>) -> Result<&mut Self> {
        self.write(name, &value)
    }

    /// Writes a float array field.
    pub fn write_float_array(&mut self, name: &str, value: Option<&[f32]>) -> Result<&mut Self> {
        self.write(name, &value)
    }

    /// Writes a double array field.
    pub fn write_double_array(&mut self, name: &str, value: Option<&[f64]>) -> Result<&mut Self> {
        self.write(name, &value)
    }

    /// Writes a UTF-8 string array field.
    pub fn write_string_array(&mut self, name: &str, value: Option<&[String]>) -> Result<&mut Self> {
        self.write(name, &value)
    }

    /// Writes a UTF-16 string array field.
    pub fn write_wide_string_array(
        &mut self,
        name: &str,
        value: Option<&[String]>,
    ) -> Result<&mut Self> {
        self.write_with(name, PdxFieldType::WideStringArray, |out, _| {
            let Some(items) = value else {
                return out.write_null();
            };
            out.write_len(items.len())?;
            items.iter().try_for_each(|s| out.write_wide_string(s))
        })
    }

    /// Writes an object array field.
    pub fn write_object_array(
        &mut self,
        name: &str,
        value: Option<&CacheableObjectArray>,
    ) -> Result<&mut Self> {
        self.write(name, &value)
    }

    /// Writes an array of byte arrays field.
    pub fn write_array_of_byte_arrays(
        &mut self,
        name: &str,
        value: Option<&[Vec<i8>]>,
    ) -> Result<&mut Self> {
        self.write(name, &value)
    }

    /// Marks an already written field as part of the object's identity.
    ///
    /// Marking the same field twice has no further effect.
    pub fn mark_identity_field(&mut self, name: &str) -> Result<&mut Self> {
        let Some(&position) = self.written.get(name) else {
            return Err(GridError::IllegalState(format!(
                "cannot mark '{}' as identity field: it has not been written for type '{}'",
                name, self.type_name
            )));
        };
        self.fields[position].identity = true;
        Ok(self)
    }

    /// Replays fields that an earlier read did not consume.
    ///
    /// Must be called before any other field is written, and at most once.
    pub fn write_unread_fields(&mut self, unread: &PdxUnreadFields) -> Result<&mut Self> {
        if self.unread_written {
            return Err(GridError::IllegalState(format!(
                "unread fields have already been written for type '{}'",
                self.type_name
            )));
        }
        if !self.fields.is_empty() {
            return Err(GridError::IllegalState(format!(
                "unread fields must be written before any other field of type '{}'",
                self.type_name
            )));
        }
        for field in unread.raw_fields() {
            self.written.insert(field.name.clone(), self.fields.len());
            self.fields.push(field.clone());
        }
        self.unread_written = true;
        Ok(self)
    }

    /// Encodes the record written so far.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        encode_record(&self.type_name, &self.fields)
    }
}

/// Encodes a nested PDX object that shares the enclosing object's graph.
pub(crate) fn encode_nested(value: &dyn PdxSerializable, graph: &mut ObjectGraph) -> Result<Vec<u8>> {
    let mut writer = PdxWriter::new(value.type_name());
    writer.graph = std::mem::take(graph);
    let result = value.to_pdx(&mut writer);
    *graph = std::mem::take(&mut writer.graph);
    result?;
    writer.to_bytes()
}
