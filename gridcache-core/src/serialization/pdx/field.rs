//! The closed set of Rust types that can be written as PDX fields.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::writer::encode_nested;
use super::{PdxFieldType, PdxSerializable};
use crate::error::{GridError, Result};
use crate::serialization::{DataOutput, ObjectDataOutput};

pub(crate) mod value_tag {
    pub const NULL: i8 = 0;
    pub const BOOL: i8 = 1;
    pub const BYTE: i8 = 2;
    pub const SHORT: i8 = 3;
    pub const INT: i8 = 4;
    pub const LONG: i8 = 5;
    pub const FLOAT: i8 = 6;
    pub const DOUBLE: i8 = 7;
    pub const STRING: i8 = 8;
    pub const DATE: i8 = 9;
    pub const BYTES: i8 = 10;
    pub const PDX: i8 = 11;
    pub const ARRAY: i8 = 12;
}

/// Date value written in place of a null date.
pub(crate) const NULL_DATE: i64 = -1;

mod sealed {
    pub trait Sealed {}
}

/// A value that can be written as a single PDX field.
///
/// The set of implementors is closed; each maps to exactly one
/// [`PdxFieldType`]. `char` maps to [`PdxFieldType::WideChar`] and `u8` to the
/// single-byte [`PdxFieldType::Char`]; bytes are `i8`.
pub trait PdxField: sealed::Sealed {
    /// The wire tag written for this type.
    const FIELD_TYPE: PdxFieldType;

    #[doc(hidden)]
    fn encode(&self, out: &mut ObjectDataOutput, graph: &mut ObjectGraph) -> Result<()>;
}

/// A field type with a null representation, usable through `Option<T>`.
pub trait NullablePdxField: PdxField {
    #[doc(hidden)]
    fn encode_null(out: &mut ObjectDataOutput) -> Result<()>;
}

/// Deepest nesting of object graph values that is written or read.
pub(crate) const MAX_OBJECT_DEPTH: usize = 64;

/// Tracks the object references on the current encoding path.
///
/// A reference that is entered while already on the path is a cycle. The
/// path may hold at most [`MAX_OBJECT_DEPTH`] references.
#[doc(hidden)]
#[derive(Debug, Default)]
pub struct ObjectGraph {
    path: Vec<usize>,
}

impl ObjectGraph {
    pub(crate) fn enter(&mut self, id: usize, what: &str) -> Result<()> {
        if self.path.contains(&id) {
            return Err(GridError::Serialization(format!(
                "cycle detected: {what} contains a reference to itself"
            )));
        }
        if self.depth() >= MAX_OBJECT_DEPTH {
            return Err(GridError::Serialization(format!(
                "object graph nested deeper than {MAX_OBJECT_DEPTH} levels at {what}"
            )));
        }
        self.path.push(id);
        Ok(())
    }

    pub(crate) fn exit(&mut self) {
        self.path.pop();
    }

    pub(crate) fn depth(&self) -> usize {
        self.path.len()
    }
}

pub(crate) fn encode_wide_char(out: &mut ObjectDataOutput, c: char) -> Result<()> {
    let mut buf = [0u16; 2];
    match c.encode_utf16(&mut buf) {
        [unit] => out.write_u16(*unit),
        _ => Err(GridError::Serialization(format!(
            "character {c:?} does not fit in a single UTF-16 code unit"
        ))),
    }
}

fn encode_slice<T>(
    out: &mut ObjectDataOutput,
    items: &[T],
    mut encode: impl FnMut(&mut ObjectDataOutput, &T) -> Result<()>,
) -> Result<()> {
    out.write_len(items.len())?;
    for item in items {
        encode(out, item)?;
    }
    Ok(())
}

macro_rules! scalar_field {
    ($ty:ty, $field_type:ident, |$out:ident, $v:ident| $body:expr) => {
        impl sealed::Sealed for $ty {}

        impl PdxField for $ty {
            const FIELD_TYPE: PdxFieldType = PdxFieldType::$field_type;

            fn encode(&self, $out: &mut ObjectDataOutput, _graph: &mut ObjectGraph) -> Result<()> {
                let $v = *self;
                $body
            }
        }
    };
}

scalar_field!(bool, Boolean, |out, v| out.write_bool(v));
scalar_field!(i8, Byte, |out, v| out.write_byte(v));
scalar_field!(u8, Char, |out, v| out.write_u8(v));
scalar_field!(char, WideChar, |out, v| encode_wide_char(out, v));
scalar_field!(i16, Short, |out, v| out.write_short(v));
scalar_field!(i32, Int, |out, v| out.write_int(v));
scalar_field!(i64, Long, |out, v| out.write_long(v));
scalar_field!(f32, Float, |out, v| out.write_float(v));
scalar_field!(f64, Double, |out, v| out.write_double(v));

impl sealed::Sealed for DateTime<Utc> {}

impl PdxField for DateTime<Utc> {
    const FIELD_TYPE: PdxFieldType = PdxFieldType::Date;

    fn encode(&self, out: &mut ObjectDataOutput, _graph: &mut ObjectGraph) -> Result<()> {
        out.write_long(self.timestamp_millis())
    }
}

impl NullablePdxField for DateTime<Utc> {
    fn encode_null(out: &mut ObjectDataOutput) -> Result<()> {
        out.write_long(NULL_DATE)
    }
}

impl sealed::Sealed for str {}

impl PdxField for str {
    const FIELD_TYPE: PdxFieldType = PdxFieldType::String;

    fn encode(&self, out: &mut ObjectDataOutput, _graph: &mut ObjectGraph) -> Result<()> {
        out.write_string(self)
    }
}

impl NullablePdxField for str {
    fn encode_null(out: &mut ObjectDataOutput) -> Result<()> {
        out.write_null()
    }
}

impl sealed::Sealed for String {}

impl PdxField for String {
    const FIELD_TYPE: PdxFieldType = PdxFieldType::String;

    fn encode(&self, out: &mut ObjectDataOutput, _graph: &mut ObjectGraph) -> Result<()> {
        out.write_string(self)
    }
}

impl NullablePdxField for String {
    fn encode_null(out: &mut ObjectDataOutput) -> Result<()> {
        out.write_null()
    }
}

macro_rules! array_field {
    ($elem:ty, $field_type:ident, |$out:ident, $v:ident| $body:expr) => {
        impl sealed::Sealed for [$elem] {}

        impl PdxField for [$elem] {
            const FIELD_TYPE: PdxFieldType = PdxFieldType::$field_type;

            fn encode(&self, out: &mut ObjectDataOutput, _graph: &mut ObjectGraph) -> Result<()> {
                encode_slice(out, self, |$out, $v| $body)
            }
        }

        impl NullablePdxField for [$elem] {
            fn encode_null(out: &mut ObjectDataOutput) -> Result<()> {
                out.write_null()
            }
        }
    };
}

array_field!(bool, BooleanArray, |out, v| out.write_bool(*v));
array_field!(u8, CharArray, |out, v| out.write_u8(*v));
array_field!(char, WideCharArray, |out, v| encode_wide_char(out, *v));
array_field!(i8, ByteArray, |out, v| out.write_byte(*v));
array_field!(i16, ShortArray, |out, v| out.write_short(*v));
array_field!(i32, IntArray, |out, v| out.write_int(*v));
array_field!(i64, LongArray, |out, v| out.write_long(*v));
array_field!(f32, FloatArray, |out, v| out.write_float(*v));
array_field!(f64, DoubleArray, |out, v| out.write_double(*v));
array_field!(String, StringArray, |out, v| out.write_string(v));
array_field!(Vec<i8>, ArrayOfByteArrays, |out, v| encode_slice(out, v, |out, b| out
    .write_byte(*b)));

impl sealed::Sealed for [CacheableValue] {}

impl PdxField for [CacheableValue] {
    const FIELD_TYPE: PdxFieldType = PdxFieldType::ObjectArray;

    fn encode(&self, out: &mut ObjectDataOutput, graph: &mut ObjectGraph) -> Result<()> {
        encode_slice(out, self, |out, v| v.encode_value(out, graph))
    }
}

impl NullablePdxField for [CacheableValue] {
    fn encode_null(out: &mut ObjectDataOutput) -> Result<()> {
        out.write_null()
    }
}

impl<T> sealed::Sealed for Vec<T> where [T]: sealed::Sealed {}

impl<T> PdxField for Vec<T>
where
    [T]: PdxField,
{
    const FIELD_TYPE: PdxFieldType = <[T] as PdxField>::FIELD_TYPE;

    fn encode(&self, out: &mut ObjectDataOutput, graph: &mut ObjectGraph) -> Result<()> {
        self.as_slice().encode(out, graph)
    }
}

impl<T> NullablePdxField for Vec<T>
where
    [T]: NullablePdxField,
{
    fn encode_null(out: &mut ObjectDataOutput) -> Result<()> {
        <[T] as NullablePdxField>::encode_null(out)
    }
}

impl<T: sealed::Sealed + ?Sized> sealed::Sealed for &T {}

impl<T: PdxField + ?Sized> PdxField for &T {
    const FIELD_TYPE: PdxFieldType = T::FIELD_TYPE;

    fn encode(&self, out: &mut ObjectDataOutput, graph: &mut ObjectGraph) -> Result<()> {
        (**self).encode(out, graph)
    }
}

impl<T: NullablePdxField + ?Sized> NullablePdxField for &T {
    fn encode_null(out: &mut ObjectDataOutput) -> Result<()> {
        T::encode_null(out)
    }
}

impl<T: NullablePdxField> sealed::Sealed for Option<T> {}

impl<T: NullablePdxField> PdxField for Option<T> {
    const FIELD_TYPE: PdxFieldType = T::FIELD_TYPE;

    fn encode(&self, out: &mut ObjectDataOutput, graph: &mut ObjectGraph) -> Result<()> {
        match self {
            Some(value) => value.encode(out, graph),
            None => T::encode_null(out),
        }
    }
}

/// A value of the dynamically typed object graph written by
/// [`PdxWriter::write_object`](super::PdxWriter::write_object).
#[derive(Clone)]
pub enum CacheableValue {
    /// The null reference.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed 8-bit integer.
    Byte(i8),
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
    /// UTF-8 string.
    String(String),
    /// Point in time, millisecond precision on the wire.
    Date(DateTime<Utc>),
    /// Opaque bytes.
    Bytes(Vec<u8>),
    /// A nested PDX object.
    Pdx(Arc<dyn PdxSerializable>),
    /// A shared array of values.
    Array(CacheableObjectArray),
}

impl CacheableValue {
    /// Wraps a PDX object as an object graph value.
    pub fn pdx<T: PdxSerializable + 'static>(value: T) -> Self {
        Self::Pdx(Arc::new(value))
    }

    pub(crate) fn encode_value(
        &self,
        out: &mut ObjectDataOutput,
        graph: &mut ObjectGraph,
    ) -> Result<()> {
        match self {
            Self::Null => out.write_byte(value_tag::NULL),
            Self::Bool(v) => {
                out.write_byte(value_tag::BOOL)?;
                out.write_bool(*v)
            }
            Self::Byte(v) => {
                out.write_byte(value_tag::BYTE)?;
                out.write_byte(*v)
            }
            Self::Short(v) => {
                out.write_byte(value_tag::SHORT)?;
                out.write_short(*v)
            }
            Self::Int(v) => {
                out.write_byte(value_tag::INT)?;
                out.write_int(*v)
            }
            Self::Long(v) => {
                out.write_byte(value_tag::LONG)?;
                out.write_long(*v)
            }
            Self::Float(v) => {
                out.write_byte(value_tag::FLOAT)?;
                out.write_float(*v)
            }
            Self::Double(v) => {
                out.write_byte(value_tag::DOUBLE)?;
                out.write_double(*v)
            }
            Self::String(v) => {
                out.write_byte(value_tag::STRING)?;
                out.write_string(v)
            }
            Self::Date(v) => {
                out.write_byte(value_tag::DATE)?;
                out.write_long(v.timestamp_millis())
            }
            Self::Bytes(v) => {
                out.write_byte(value_tag::BYTES)?;
                out.write_len(v.len())?;
                out.write_bytes(v)
            }
            Self::Pdx(object) => {
                let id = Arc::as_ptr(object) as *const () as usize;
                graph.enter(id, &format!("object of type '{}'", object.type_name()))?;
                let nested = encode_nested(object.as_ref(), graph);
                graph.exit();
                let nested = nested?;
                out.write_byte(value_tag::PDX)?;
                out.write_len(nested.len())?;
                out.write_bytes(&nested)
            }
            Self::Array(array) => {
                graph.enter(array.id(), "object array")?;
                let items = array.snapshot();
                let result = out
                    .write_byte(value_tag::ARRAY)
                    .and_then(|_| encode_slice(out, &items, |out, v| v.encode_value(out, graph)));
                graph.exit();
                result
            }
        }
    }
}

impl fmt::Debug for CacheableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            Self::Byte(v) => f.debug_tuple("Byte").field(v).finish(),
            Self::Short(v) => f.debug_tuple("Short").field(v).finish(),
            Self::Int(v) => f.debug_tuple("Int").field(v).finish(),
            Self::Long(v) => f.debug_tuple("Long").field(v).finish(),
            Self::Float(v) => f.debug_tuple("Float").field(v).finish(),
            Self::Double(v) => f.debug_tuple("Double").field(v).finish(),
            Self::String(v) => f.debug_tuple("String").field(v).finish(),
            Self::Date(v) => f.debug_tuple("Date").field(v).finish(),
            Self::Bytes(v) => f.debug_tuple("Bytes").field(&v.len()).finish(),
            Self::Pdx(v) => f.debug_tuple("Pdx").field(&v.type_name()).finish(),
            Self::Array(v) => f.debug_tuple("Array").field(&v.len()).finish(),
        }
    }
}

impl From<bool> for CacheableValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for CacheableValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<i64> for CacheableValue {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<f64> for CacheableValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for CacheableValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for CacheableValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<DateTime<Utc>> for CacheableValue {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Date(v)
    }
}

impl From<Vec<u8>> for CacheableValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<CacheableObjectArray> for CacheableValue {
    fn from(v: CacheableObjectArray) -> Self {
        Self::Array(v)
    }
}

impl<T: Into<CacheableValue>> From<Option<T>> for CacheableValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

impl sealed::Sealed for CacheableValue {}

impl PdxField for CacheableValue {
    const FIELD_TYPE: PdxFieldType = PdxFieldType::Object;

    fn encode(&self, out: &mut ObjectDataOutput, graph: &mut ObjectGraph) -> Result<()> {
        self.encode_value(out, graph)
    }
}

/// A shared, growable array of object graph values.
///
/// Clones share the same storage, so an array may end up containing itself;
/// encoding such an array fails instead of recursing forever.
#[derive(Clone, Default)]
pub struct CacheableObjectArray {
    items: Arc<RwLock<Vec<CacheableValue>>>,
}

impl CacheableObjectArray {
    /// Creates an empty array.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value.
    pub fn push(&self, value: impl Into<CacheableValue>) {
        self.items.write().push(value.into());
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Returns true if the array has no elements.
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    /// Returns a copy of the current elements.
    pub fn snapshot(&self) -> Vec<CacheableValue> {
        self.items.read().clone()
    }

    fn id(&self) -> usize {
        Arc::as_ptr(&self.items) as usize
    }
}

impl From<Vec<CacheableValue>> for CacheableObjectArray {
    fn from(items: Vec<CacheableValue>) -> Self {
        Self {
            items: Arc::new(RwLock::new(items)),
        }
    }
}

impl fmt::Debug for CacheableObjectArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.snapshot().iter()).finish()
    }
}

impl sealed::Sealed for CacheableObjectArray {}

impl PdxField for CacheableObjectArray {
    const FIELD_TYPE: PdxFieldType = PdxFieldType::ObjectArray;

    fn encode(&self, out: &mut ObjectDataOutput, graph: &mut ObjectGraph) -> Result<()> {
        graph.enter(self.id(), "object array")?;
        let items = self.snapshot();
        let result = encode_slice(out, &items, |out, v| v.encode_value(out, graph));
        graph.exit();
        result
    }
}

impl NullablePdxField for CacheableObjectArray {
    fn encode_null(out: &mut ObjectDataOutput) -> Result<()> {
        out.write_null()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode<T: PdxField + ?Sized>(value: &T) -> Result<Vec<u8>> {
        let mut out = ObjectDataOutput::new();
        value.encode(&mut out, &mut ObjectGraph::default())?;
        Ok(out.into_bytes())
    }

    #[test]
    fn scalar_encodings_are_fixed_width() {
        assert_eq!(encode(&true).unwrap(), vec![1]);
        assert_eq!(encode(&-2i8).unwrap(), vec![0xFE]);
        assert_eq!(encode(&b'A').unwrap(), vec![0x41]);
        assert_eq!(encode(&'A').unwrap(), vec![0x00, 0x41]);
        assert_eq!(encode(&0x0102i16).unwrap(), vec![1, 2]);
        assert_eq!(encode(&42i32).unwrap(), vec![0, 0, 0, 42]);
        assert_eq!(encode(&1i64).unwrap(), vec![0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(encode(&1.0f64).unwrap().len(), 8);
    }

    #[test]
    fn wide_char_outside_bmp_is_rejected() {
        let err = encode(&'\u{1F600}').unwrap_err();
        assert!(matches!(err, GridError::Serialization(_)));
    }

    #[test]
    fn option_uses_null_marker() {
        assert_eq!(encode(&None::<String>).unwrap(), vec![0xFF; 4]);
        assert_eq!(encode(&Some("hi")).unwrap(), vec![0, 0, 0, 2, b'h', b'i']);
        assert_eq!(<Option<Vec<i32>> as PdxField>::FIELD_TYPE, PdxFieldType::IntArray);
    }

    #[test]
    fn arrays_are_count_prefixed() {
        assert_eq!(
            encode(&vec![true, false, true]).unwrap(),
            vec![0, 0, 0, 3, 1, 0, 1]
        );
        assert_eq!(
            encode(&[1i16, 2][..]).unwrap(),
            vec![0, 0, 0, 2, 0, 1, 0, 2]
        );
    }

    #[test]
    fn array_of_byte_arrays_keeps_each_length() {
        let value: Vec<Vec<i8>> = vec![vec![1], vec![], vec![2, 3]];
        assert_eq!(
            encode(&value).unwrap(),
            vec![0, 0, 0, 3, 0, 0, 0, 1, 1, 0, 0, 0, 0, 0, 0, 0, 2, 2, 3]
        );
    }

    #[test]
    fn null_date_is_minus_one() {
        assert_eq!(encode(&None::<DateTime<Utc>>).unwrap(), vec![0xFF; 8]);
    }

    #[test]
    fn object_values_are_tagged() {
        assert_eq!(encode(&CacheableValue::Null).unwrap(), vec![value_tag::NULL as u8]);
        assert_eq!(
            encode(&CacheableValue::from(7)).unwrap(),
            vec![value_tag::INT as u8, 0, 0, 0, 7]
        );
        assert_eq!(
            encode(&CacheableValue::from(None::<i32>)).unwrap(),
            vec![value_tag::NULL as u8]
        );
    }

    #[test]
    fn self_referential_array_is_rejected() {
        let array = CacheableObjectArray::new();
        array.push(1);
        array.push(CacheableValue::Array(array.clone()));
        let err = encode(&array).unwrap_err();
        assert!(err.to_string().contains("cycle detected"));
    }

    #[test]
    fn shared_but_acyclic_array_is_accepted() {
        let inner = CacheableObjectArray::from(vec![CacheableValue::Int(1)]);
        let outer = CacheableObjectArray::new();
        outer.push(inner.clone());
        outer.push(inner);
        let bytes = encode(&outer).unwrap();
        assert_eq!(&bytes[..4], &[0, 0, 0, 2]);
    }

    #[test]
    fn graph_path_is_balanced_after_encoding() {
        let mut graph = ObjectGraph::default();
        let array = CacheableObjectArray::from(vec![CacheableValue::from("x")]);
        let mut out = ObjectDataOutput::new();
        array.encode(&mut out, &mut graph).unwrap();
        assert_eq!(graph.depth(), 0);
    }
}
