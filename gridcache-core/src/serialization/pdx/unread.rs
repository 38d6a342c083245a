//! Carrier for fields a reader did not consume.

use super::record::RawField;

/// Fields of a record that the reading type did not ask for.
///
/// Obtained from [`PdxReader::read_unread_fields`](super::PdxReader::read_unread_fields)
/// and written back with
/// [`PdxWriter::write_unread_fields`](super::PdxWriter::write_unread_fields). The
/// payloads are kept in their encoded form, together with their identity flag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdxUnreadFields {
    fields: Vec<RawField>,
}

impl PdxUnreadFields {
    pub(crate) fn from_raw(fields: Vec<RawField>) -> Self {
        Self { fields }
    }

    pub(crate) fn raw_fields(&self) -> &[RawField] {
        &self.fields
    }

    /// Returns true if no field was left unread.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the number of unread fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns the unread field names in record order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Returns true if the named field was left unread.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }
}
