#![no_main]

use libfuzzer_sys::fuzz_target;

use gridcache_core::serialization::pdx::{PdxRecord, PdxSerializer};

fuzz_target!(|data: &[u8]| {
    if let Ok(record) = PdxRecord::from_bytes(data) {
        let _ = record.values();
        let _ = record.identity_fields();
        // Flag bits other than identity are dropped, so compare decoded forms.
        let bytes = record.to_bytes().expect("an accepted record must re-encode");
        let again = PdxRecord::from_bytes(&bytes).expect("a re-encoded record must decode");
        assert_eq!(again.field_names().collect::<Vec<_>>(), record.field_names().collect::<Vec<_>>());
        assert_eq!(again.identity_fields(), record.identity_fields());
    }

    let _ = PdxSerializer::new().deserialize_record(data);
});
