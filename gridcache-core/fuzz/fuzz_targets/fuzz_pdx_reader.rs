#![no_main]

use libfuzzer_sys::fuzz_target;

use gridcache_core::serialization::pdx::{
    PdxDeserializable, PdxReader, PdxSerializable, PdxSerializer, PdxUnreadFields, PdxWriter,
};
use gridcache_core::Result;

#[derive(Debug, Default)]
struct FuzzPdx {
    flag: bool,
    small: i8,
    count: i32,
    total: i64,
    ratio: f64,
    label: Option<String>,
    tags: Option<Vec<String>>,
    samples: Option<Vec<i32>>,
    unread: PdxUnreadFields,
}

impl PdxSerializable for FuzzPdx {
    fn type_name(&self) -> &str {
        "FuzzPdx"
    }

    fn to_pdx(&self, writer: &mut PdxWriter) -> Result<()> {
        writer
            .write_unread_fields(&self.unread)?
            .write_boolean("flag", self.flag)?
            .write_byte("small", self.small)?
            .write_int("count", self.count)?
            .write_long("total", self.total)?
            .write_double("ratio", self.ratio)?
            .write_string("label", self.label.as_deref())?
            .write_string_array("tags", self.tags.as_deref())?
            .write_int_array("samples", self.samples.as_deref())?;
        Ok(())
    }
}

impl PdxDeserializable for FuzzPdx {
    fn from_pdx(reader: &mut PdxReader) -> Result<Self> {
        Ok(Self {
            flag: reader.read_or_default("flag")?,
            small: reader.read_or_default("small")?,
            count: reader.read_or_default("count")?,
            total: reader.read_or_default("total")?,
            ratio: reader.read_or_default("ratio")?,
            label: reader.read_or_default("label")?,
            tags: reader.read_or_default("tags")?,
            samples: reader.read_or_default("samples")?,
            unread: reader.read_unread_fields(),
        })
    }
}

fuzz_target!(|data: &[u8]| {
    let serializer = PdxSerializer::new();
    if let Ok(value) = serializer.deserialize::<FuzzPdx>(data) {
        // A value that was read must be writable again with its unread fields.
        let bytes = serializer
            .serialize(&value)
            .expect("re-serializing a decoded value must succeed");
        let _ = serializer.deserialize::<FuzzPdx>(&bytes);
    }
});
