//! Decoding of PDX field payloads and the typed field reader.

use std::collections::HashSet;

use chrono::{DateTime, TimeZone, Utc};

use super::field::{value_tag, MAX_OBJECT_DEPTH, NULL_DATE};
use super::record::{PdxRecord, RawField};
use super::{PdxFieldType, PdxUnreadFields};
use crate::error::{GridError, Result};
use crate::serialization::{DataInput, ObjectDataInput};

/// A decoded PDX field or object graph value.
#[derive(Debug, Clone, PartialEq)]
pub enum PdxValue {
    /// A null string, date, array or object.
    Null,
    /// Boolean value.
    Boolean(bool),
    /// Signed 8-bit integer.
    Byte(i8),
    /// Single-byte character.
    Char(u8),
    /// Wide character.
    WideChar(char),
    /// Signed 16-bit integer.
    Short(i16),
    /// Signed 32-bit integer.
    Int(i32),
    /// Signed 64-bit integer.
    Long(i64),
    /// 32-bit floating point.
    Float(f32),
    /// 64-bit floating point.
    Double(f64),
    /// Point in time.
    Date(DateTime<Utc>),
    /// String, from either a UTF-8 or a UTF-16 encoding.
    String(String),
    /// Opaque bytes from the object graph.
    Bytes(Vec<u8>),
    /// A nested PDX object.
    Record(Box<PdxRecord>),
    /// Object array or nested object graph array.
    Array(Vec<PdxValue>),
    /// Boolean array.
    BooleanArray(Vec<bool>),
    /// Single-byte character array.
    CharArray(Vec<u8>),
    /// Wide character array.
    WideCharArray(Vec<char>),
    /// Byte array.
    ByteArray(Vec<i8>),
    /// Short array.
    ShortArray(Vec<i16>),
    /// Int array.
    IntArray(Vec<i32>),
    /// Long array.
    LongArray(Vec<i64>),
    /// Float array.
    FloatArray(Vec<f32>),
    /// Double array.
    DoubleArray(Vec<f64>),
    /// String array, from either encoding.
    StringArray(Vec<String>),
    /// Array of byte arrays.
    ByteArrays(Vec<Vec<i8>>),
}

fn decode_date(millis: i64) -> Result<PdxValue> {
    if millis == NULL_DATE {
        return Ok(PdxValue::Null);
    }
    Utc.timestamp_millis_opt(millis)
        .single()
        .map(PdxValue::Date)
        .ok_or_else(|| GridError::Serialization(format!("date out of range: {millis}")))
}

fn decode_wide_char(unit: u16) -> Result<char> {
    char::from_u32(u32::from(unit)).ok_or_else(|| {
        GridError::Serialization(format!("unpaired surrogate 0x{unit:04X} in wide char"))
    })
}

fn decode_array<T>(
    input: &mut ObjectDataInput<'_>,
    wrap: fn(Vec<T>) -> PdxValue,
    mut read: impl FnMut(&mut ObjectDataInput<'_>) -> Result<T>,
) -> Result<PdxValue> {
    let Some(count) = input.read_len()? else {
        return Ok(PdxValue::Null);
    };
    let mut items = Vec::with_capacity(count.min(input.remaining()));
    for _ in 0..count {
        items.push(read(input)?);
    }
    Ok(wrap(items))
}

fn non_null<T>(value: Option<T>, what: &str) -> Result<T> {
    value.ok_or_else(|| GridError::Serialization(format!("null element in {what}")))
}

fn decode_object(input: &mut ObjectDataInput<'_>, depth: usize) -> Result<PdxValue> {
    if depth > MAX_OBJECT_DEPTH {
        return Err(GridError::Serialization(format!(
            "object graph nested deeper than {MAX_OBJECT_DEPTH} levels"
        )));
    }
    let value = match input.read_byte()? {
        value_tag::NULL => PdxValue::Null,
        value_tag::BOOL => PdxValue::Boolean(input.read_bool()?),
        value_tag::BYTE => PdxValue::Byte(input.read_byte()?),
        value_tag::SHORT => PdxValue::Short(input.read_short()?),
        value_tag::INT => PdxValue::Int(input.read_int()?),
        value_tag::LONG => PdxValue::Long(input.read_long()?),
        value_tag::FLOAT => PdxValue::Float(input.read_float()?),
        value_tag::DOUBLE => PdxValue::Double(input.read_double()?),
        value_tag::STRING => input.read_string()?.map_or(PdxValue::Null, PdxValue::String),
        value_tag::DATE => decode_date(input.read_long()?)?,
        value_tag::BYTES => match input.read_len()? {
            Some(len) => PdxValue::Bytes(input.read_bytes(len)?),
            None => PdxValue::Null,
        },
        value_tag::PDX => {
            let len = non_null(input.read_len()?, "nested object")?;
            let nested = input.read_bytes(len)?;
            PdxValue::Record(Box::new(PdxRecord::from_bytes(&nested)?))
        }
        value_tag::ARRAY => decode_array(input, PdxValue::Array, |i| decode_object(i, depth + 1))?,
        tag => {
            return Err(GridError::Serialization(format!(
                "unknown object value tag: {tag}"
            )))
        }
    };
    Ok(value)
}

pub(crate) fn decode_field(field: &RawField) -> Result<PdxValue> {
    let mut input = ObjectDataInput::new(&field.payload);
    let input = &mut input;
    let value = match field.field_type {
        PdxFieldType::Boolean => PdxValue::Boolean(input.read_bool()?),
        PdxFieldType::Byte => PdxValue::Byte(input.read_byte()?),
        PdxFieldType::Char => PdxValue::Char(input.read_u8()?),
        PdxFieldType::WideChar => PdxValue::WideChar(decode_wide_char(input.read_u16()?)?),
        PdxFieldType::Short => PdxValue::Short(input.read_short()?),
        PdxFieldType::Int => PdxValue::Int(input.read_int()?),
        PdxFieldType::Long => PdxValue::Long(input.read_long()?),
        PdxFieldType::Float => PdxValue::Float(input.read_float()?),
        PdxFieldType::Double => PdxValue::Double(input.read_double()?),
        PdxFieldType::Date => decode_date(input.read_long()?)?,
        PdxFieldType::String => input.read_string()?.map_or(PdxValue::Null, PdxValue::String),
        PdxFieldType::WideString => input
            .read_wide_string()?
            .map_or(PdxValue::Null, PdxValue::String),
        PdxFieldType::Object => decode_object(input, 0)?,
        PdxFieldType::BooleanArray => decode_array(input, PdxValue::BooleanArray, |i| i.read_bool())?,
        PdxFieldType::CharArray => decode_array(input, PdxValue::CharArray, |i| i.read_u8())?,
        PdxFieldType::WideCharArray => decode_array(input, PdxValue::WideCharArray, |i| {
            decode_wide_char(i.read_u16()?)
        })?,
        PdxFieldType::ByteArray => decode_array(input, PdxValue::ByteArray, |i| i.read_byte())?,
        PdxFieldType::ShortArray => decode_array(input, PdxValue::ShortArray, |i| i.read_short())?,
        PdxFieldType::IntArray => decode_array(input, PdxValue::IntArray, |i| i.read_int())?,
        PdxFieldType::LongArray => decode_array(input, PdxValue::LongArray, |i| i.read_long())?,
        PdxFieldType::FloatArray => decode_array(input, PdxValue::FloatArray, |i| i.read_float())?,
        PdxFieldType::DoubleArray => {
            decode_array(input, PdxValue::DoubleArray, |i| i.read_double())?
        }
        PdxFieldType::StringArray => decode_array(input, PdxValue::StringArray, |i| {
            non_null(i.read_string()?, "string array")
        })?,
        PdxFieldType::WideStringArray => decode_array(input, PdxValue::StringArray, |i| {
            non_null(i.read_wide_string()?, "wide string array")
        })?,
        PdxFieldType::ObjectArray => decode_array(input, PdxValue::Array, |i| decode_object(i, 1))?,
        PdxFieldType::ArrayOfByteArrays => decode_array(input, PdxValue::ByteArrays, |i| {
            let inner = decode_array(i, PdxValue::ByteArray, |i| i.read_byte())?;
            match inner {
                PdxValue::ByteArray(bytes) => Ok(bytes),
                _ => Err(GridError::Serialization(
                    "null element in array of byte arrays".to_string(),
                )),
            }
        })?,
    };
    input.expect_end().map_err(|e| {
        GridError::Serialization(format!("field '{}': {}", field.name, e))
    })?;
    Ok(value)
}

/// A Rust type that can be extracted from a decoded PDX field.
pub trait FromPdxValue: Sized {
    /// The wire tag this type is read from.
    const FIELD_TYPE: PdxFieldType;

    /// Converts the decoded value; `None` if the value has another shape.
    fn from_pdx_value(value: PdxValue) -> Option<Self>;
}

macro_rules! from_pdx_value {
    ($ty:ty, $field_type:ident, $variant:ident) => {
        impl FromPdxValue for $ty {
            const FIELD_TYPE: PdxFieldType = PdxFieldType::$field_type;

            fn from_pdx_value(value: PdxValue) -> Option<Self> {
                match value {
                    PdxValue::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

from_pdx_value!(bool, Boolean, Boolean);
from_pdx_value!(i8, Byte, Byte);
from_pdx_value!(u8, Char, Char);
from_pdx_value!(char, WideChar, WideChar);
from_pdx_value!(i16, Short, Short);
from_pdx_value!(i32, Int, Int);
from_pdx_value!(i64, Long, Long);
from_pdx_value!(f32, Float, Float);
from_pdx_value!(f64, Double, Double);
from_pdx_value!(DateTime<Utc>, Date, Date);
from_pdx_value!(String, String, String);
from_pdx_value!(Vec<bool>, BooleanArray, BooleanArray);
from_pdx_value!(Vec<u8>, CharArray, CharArray);
from_pdx_value!(Vec<char>, WideCharArray, WideCharArray);
from_pdx_value!(Vec<i8>, ByteArray, ByteArray);
from_pdx_value!(Vec<i16>, ShortArray, ShortArray);
from_pdx_value!(Vec<i32>, IntArray, IntArray);
from_pdx_value!(Vec<i64>, LongArray, LongArray);
from_pdx_value!(Vec<f32>, FloatArray, FloatArray);
from_pdx_value!(Vec<f64>, DoubleArray, DoubleArray);
from_pdx_value!(Vec<String>, StringArray, StringArray);
from_pdx_value!(Vec<Vec<i8>>, ArrayOfByteArrays, ByteArrays);

impl FromPdxValue for PdxValue {
    const FIELD_TYPE: PdxFieldType = PdxFieldType::Object;

    fn from_pdx_value(value: PdxValue) -> Option<Self> {
        Some(value)
    }
}

impl<T: FromPdxValue> FromPdxValue for Option<T> {
    const FIELD_TYPE: PdxFieldType = T::FIELD_TYPE;

    fn from_pdx_value(value: PdxValue) -> Option<Self> {
        match value {
            PdxValue::Null => Some(None),
            other => T::from_pdx_value(other).map(Some),
        }
    }
}

/// Reads the fields of one PDX record.
///
/// The reader remembers which fields were asked for, so that the rest can be
/// carried forward with [`read_unread_fields`](Self::read_unread_fields).
#[derive(Debug)]
pub struct PdxReader {
    record: PdxRecord,
    read: HashSet<String>,
    ignore_unread_fields: bool,
}

impl PdxReader {
    /// Creates a reader over a decoded record.
    pub fn new(record: PdxRecord) -> Self {
        Self {
            record,
            read: HashSet::new(),
            ignore_unread_fields: false,
        }
    }

    /// Parses a record from bytes and creates a reader over it.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        PdxRecord::from_bytes(data).map(Self::new)
    }

    /// When set, [`read_unread_fields`](Self::read_unread_fields) always
    /// returns an empty carrier.
    pub fn ignore_unread_fields(mut self, ignore: bool) -> Self {
        self.ignore_unread_fields = ignore;
        self
    }

    /// Returns the underlying record.
    pub fn record(&self) -> &PdxRecord {
        &self.record
    }

    /// Returns the type name of the record.
    pub fn type_name(&self) -> &str {
        self.record.type_name()
    }

    /// Returns true if the record has the named field.
    pub fn has_field(&self, name: &str) -> bool {
        self.record.has_field(name)
    }

    /// Returns the field names in record order.
    pub fn field_names(&self) -> Vec<&str> {
        self.record.field_names().collect()
    }

    /// Returns the identity fields; every field when none was marked.
    pub fn identity_fields(&self) -> Vec<&str> {
        self.record.identity_fields()
    }

    /// Returns true if the named field is part of the record's identity.
    pub fn is_identity_field(&self, name: &str) -> bool {
        self.record.identity_fields().contains(&name)
    }

    /// Reads the named field as `T`.
    ///
    /// Fails if the field is missing, has a different wire type, or is null
    /// and `T` is not an `Option`.
    pub fn read<T: FromPdxValue>(&mut self, name: &str) -> Result<T> {
        match self.read_typed(name, T::FIELD_TYPE)? {
            Some(value) => T::from_pdx_value(value).ok_or_else(|| {
                GridError::Serialization(format!(
                    "field '{}' of '{}' is null",
                    name,
                    self.record.type_name()
                ))
            }),
            None => Err(GridError::Serialization(format!(
                "no field '{}' in record of type '{}'",
                name,
                self.record.type_name()
            ))),
        }
    }

    /// Reads the named field, or returns `T::default()` when the record was
    /// written by a version of the type that did not have it.
    pub fn read_or_default<T: FromPdxValue + Default>(&mut self, name: &str) -> Result<T> {
        if self.record.has_field(name) {
            self.read(name)
        } else {
            Ok(T::default())
        }
    }

    fn read_typed(&mut self, name: &str, expected: PdxFieldType) -> Result<Option<PdxValue>> {
        let Some(field) = self.record.raw(name) else {
            return Ok(None);
        };
        let compatible = field.field_type == expected
            || matches!(
                (field.field_type, expected),
                (PdxFieldType::WideString, PdxFieldType::String)
                    | (PdxFieldType::WideStringArray, PdxFieldType::StringArray)
            );
        if !compatible {
            return Err(GridError::Serialization(format!(
                "field '{}' type mismatch: expected {:?}, found {:?}",
                name, expected, field.field_type
            )));
        }
        let value = decode_field(field)?;
        self.read.insert(name.to_string());
        Ok(Some(value))
    }

    /// Reads a boolean field.
    pub fn read_boolean(&mut self, name: &str) -> Result<bool> {
        self.read(name)
    }

    /// Reads a byte field.
    pub fn read_byte(&mut self, name: &str) -> Result<i8> {
        self.read(name)
    }

    /// Reads a single-byte character field.
    pub fn read_char(&mut self, name: &str) -> Result<u8> {
        self.read(name)
    }

    /// Reads a wide character field.
    pub fn read_wide_char(&mut self, name: &str) -> Result<char> {
        self.read(name)
    }

    /// Reads a short field.
    pub fn read_short(&mut self, name: &str) -> Result<i16> {
        self.read(name)
    }

    /// Reads an int field.
    pub fn read_int(&mut self, name: &str) -> Result<i32> {
        self.read(name)
    }

    /// Reads a long field.
    pub fn read_long(&mut self, name: &str) -> Result<i64> {
        self.read(name)
    }

    /// Reads a float field.
    pub fn read_float(&mut self, name: &str) -> Result<f32> {
        self.read(name)
    }

    /// Reads a double field.
    pub fn read_double(&mut self, name: &str) -> Result<f64> {
        self.read(name)
    }

    /// Reads a date field.
    pub fn read_date(&mut self, name: &str) -> Result<Option<DateTime<Utc>>> {
        self.read(name)
    }

    /// Reads a string field written with either string encoding.
    pub fn read_string(&mut self, name: &str) -> Result<Option<String>> {
        self.read(name)
    }

    /// Reads an object field.
    pub fn read_object(&mut self, name: &str) -> Result<PdxValue> {
        self.read(name)
    }

    /// Reads a boolean array field.
    pub fn read_boolean_array(&mut self, name: &str) -> Result<Option<Vec<bool>>> {
        self.read(name)
    }

    /// Reads a single-byte character array field.
    pub fn read_char_array(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
        self.read(name)
    }

    /// Reads a wide character array field.
    pub fn read_wide_char_array(&mut self, name: &str) -> Result<Option<Vec<char>>> {
        self.read(name)
    }

    /// Reads a byte array field.
    pub fn read_byte_array(&mut self, name: &str) -> Result<Option<Vec<i8>>> {
        self.read(name)
    }

    /// Reads a short array field.
    pub fn read_short_array(&mut self, name: &str) -> Result<Option<Vec<i16>>> {
        self.read(name)
    }

    /// Reads an int array field.
    pub fn read_int_array(&mut self, name: &str) -> Result<Option<Vec<i32>>> {
        self.read(name)
    }

    /// Reads a long array field.
    pub fn read_long_array(&mut self, name: &str) -> Result<Option<Vec<i64>>> {
        self.read(name)
    }

    /// Reads a float array field.
    pub fn read_float_array(&mut self, name: &str) -> Result<Option<Vec<f32>>> {
        self.read(name)
    }

    /// Reads a double array field.
    pub fn read_double_array(&mut self, name: &str) -> Result<Option<Vec<f64>>> {
        self.read(name)
    }

    /// Reads a string array field written with either string encoding.
    pub fn read_string_array(&mut self, name: &str) -> Result<Option<Vec<String>>> {
        self.read(name)
    }

    /// Reads an object array field.
    pub fn read_object_array(&mut self, name: &str) -> Result<Option<Vec<PdxValue>>> {
        match self.read_typed(name, PdxFieldType::ObjectArray)? {
            Some(PdxValue::Array(items)) => Ok(Some(items)),
            Some(_) => Ok(None),
            None => Err(GridError::Serialization(format!(
                "no field '{}' in record of type '{}'",
                name,
                self.record.type_name()
            ))),
        }
    }

    /// Reads an array of byte arrays field.
    pub fn read_array_of_byte_arrays(&mut self, name: &str) -> Result<Option<Vec<Vec<i8>>>> {
        self.read(name)
    }

    /// Collects every field that has not been read so far.
    ///
    /// Pass the result to [`PdxWriter::write_unread_fields`](super::PdxWriter::write_unread_fields)
    /// when the object is written again, so that fields added by newer
    /// versions of the type survive the round trip.
    pub fn read_unread_fields(&mut self) -> PdxUnreadFields {
        if self.ignore_unread_fields {
            return PdxUnreadFields::default();
        }
        let unread = self
            .record
            .raw_fields()
            .iter()
            .filter(|f| !self.read.contains(&f.name))
            .cloned()
            .collect();
        PdxUnreadFields::from_raw(unread)
    }
}
