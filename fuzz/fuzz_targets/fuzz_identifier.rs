#![no_main]

use libfuzzer_sys::fuzz_target;
use patient_vcf::identifier::IdentifierSplitter;

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);

    // Splitting should never panic
    if let Ok(id) = IdentifierSplitter::default().split(&raw) {
        // Both parts are non-empty substrings of the input
        assert!(!id.patient_id.is_empty());
        assert!(!id.sample_id.is_empty());
        assert!(raw.starts_with(&format!("{}_", id.patient_id)));
        assert!(raw.ends_with(&id.sample_id));
    }
});
