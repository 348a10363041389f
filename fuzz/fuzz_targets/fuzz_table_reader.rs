#![no_main]

use libfuzzer_sys::fuzz_target;
use patient_vcf::{
    aggregate::DuplicatePolicy, convert_rows, identifier::IdentifierSplitter, output::WriterSink,
    table::{Columns, Reader},
};
use std::io::{self, Cursor};

fuzz_target!(|data: &[u8]| {
    let Ok(reader) = Reader::new(Cursor::new(data), b',', Columns::default()) else {
        return;
    };

    // Whole pipeline into a discarding sink; errors are expected, panics are not
    let mut sink = WriterSink::new(io::sink());
    let _ = convert_rows(
        reader.take(1000),
        &IdentifierSplitter::default(),
        DuplicatePolicy::KeepFirst,
        &mut sink,
    );
});
