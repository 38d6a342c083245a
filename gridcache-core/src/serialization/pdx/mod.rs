//! PDX structured field serialization.
//!
//! A PDX record carries its type name and an ordered list of named, tagged
//! fields, so a peer can decode it without sharing the class definition. An
//! object writes itself through a [`PdxWriter`] session:
//!
//! ```
//! use gridcache_core::serialization::pdx::{PdxSerializable, PdxWriter};
//! use gridcache_core::Result;
//!
//! struct Order {
//!     id: i64,
//!     customer: String,
//! }
//!
//! impl PdxSerializable for Order {
//!     fn type_name(&self) -> &str {
//!         "com.example.Order"
//!     }
//!
//!     fn to_pdx(&self, writer: &mut PdxWriter) -> Result<()> {
//!         writer
//!             .write_long("id", self.id)?
//!             .write_string("customer", Some(self.customer.as_str()))?
//!             .mark_identity_field("id")?;
//!         Ok(())
//!     }
//! }
//! ```
//!
//! Fields written by a newer version of a type and not understood by the
//! current one are kept in [`PdxUnreadFields`] and replayed on the next write.

mod field;
mod reader;
mod record;
mod serializer;
mod unread;
mod writer;

use crate::error::{GridError, Result};

pub use field::{CacheableObjectArray, CacheableValue, NullablePdxField, ObjectGraph, PdxField};
pub use reader::{FromPdxValue, PdxReader, PdxValue};
pub use record::PdxRecord;
pub use serializer::{PdxSerializer, PDX_TYPE_ID};
pub use unread::PdxUnreadFields;
pub use writer::PdxWriter;

/// Wire type tag of a PDX field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i8)]
pub enum PdxFieldType {
    /// Boolean, one byte.
    Boolean = 0,
    /// Signed 8-bit integer.
    Byte = 1,
    /// Single-byte character.
    Char = 2,
    /// UTF-16 code unit character.
    WideChar = 3,
    /// Signed 16-bit integer.
    Short = 4,
    /// Signed 32-bit integer.
    Int = 5,
    /// Signed 64-bit integer.
    Long = 6,
    /// 32-bit floating point.
    Float = 7,
    /// 64-bit floating point.
    Double = 8,
    /// Milliseconds since the Unix epoch.
    Date = 9,
    /// Length-prefixed UTF-8 string.
    String = 10,
    /// Length-prefixed UTF-16 string.
    WideString = 11,
    /// Any value of the object graph.
    Object = 12,
    /// Array of booleans.
    BooleanArray = 13,
    /// Array of single-byte characters.
    CharArray = 14,
    /// Array of wide characters.
    WideCharArray = 15,
    /// Array of bytes.
    ByteArray = 16,
    /// Array of shorts.
    ShortArray = 17,
    /// Array of ints.
    IntArray = 18,
    /// Array of longs.
    LongArray = 19,
    /// Array of floats.
    FloatArray = 20,
    /// Array of doubles.
    DoubleArray = 21,
    /// Array of UTF-8 strings.
    StringArray = 22,
    /// Array of UTF-16 strings.
    WideStringArray = 23,
    /// Array of object graph values.
    ObjectArray = 24,
    /// Array of independently sized byte arrays.
    ArrayOfByteArrays = 25,
}

impl PdxFieldType {
    /// Creates a field type from its wire tag.
    pub fn from_id(id: i8) -> Result<Self> {
        let field_type = match id {
            0 => Self::Boolean,
            1 => Self::Byte,
            2 => Self::Char,
            3 => Self::WideChar,
            4 => Self::Short,
            5 => Self::Int,
            6 => Self::Long,
            7 => Self::Float,
            8 => Self::Double,
            9 => Self::Date,
            10 => Self::String,
            11 => Self::WideString,
            12 => Self::Object,
            13 => Self::BooleanArray,
            14 => Self::CharArray,
            15 => Self::WideCharArray,
            16 => Self::ByteArray,
            17 => Self::ShortArray,
            18 => Self::IntArray,
            19 => Self::LongArray,
            20 => Self::FloatArray,
            21 => Self::DoubleArray,
            22 => Self::StringArray,
            23 => Self::WideStringArray,
            24 => Self::ObjectArray,
            25 => Self::ArrayOfByteArrays,
            _ => {
                return Err(GridError::Serialization(format!(
                    "unknown PDX field type tag: {id}"
                )))
            }
        };
        Ok(field_type)
    }

    /// Returns the wire tag of this field type.
    pub fn id(&self) -> i8 {
        *self as i8
    }

    /// Returns true if this is an array type.
    pub fn is_array(&self) -> bool {
        self.id() >= Self::BooleanArray.id()
    }

    /// Returns the payload size for fixed-width scalar types.
    pub fn fixed_size(&self) -> Option<usize> {
        match self {
            Self::Boolean | Self::Byte | Self::Char => Some(1),
            Self::WideChar | Self::Short => Some(2),
            Self::Int | Self::Float => Some(4),
            Self::Long | Self::Double | Self::Date => Some(8),
            _ => None,
        }
    }
}

/// Trait for types that write themselves as PDX records.
pub trait PdxSerializable: Send + Sync {
    /// Returns the type name recorded in the serialized form.
    fn type_name(&self) -> &str;

    /// Writes this object's fields to the given writer.
    fn to_pdx(&self, writer: &mut PdxWriter) -> Result<()>;
}

/// Trait for types that can be rebuilt from a PDX record.
pub trait PdxDeserializable: Sized {
    /// Reads this object's fields from the given reader.
    fn from_pdx(reader: &mut PdxReader) -> Result<Self>;
}
