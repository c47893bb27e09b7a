#![no_main]

//! Fuzz target for the CSV line tokenizer and value parsers.
//!
//! Export files arrive with arbitrary quoting, embedded commas and broken
//! timestamps; none of that may panic the tokenizer or the normalizers.

use libfuzzer_sys::fuzz_target;

use alignzo::csv;

fuzz_target!(|data: &str| {
    let fields = csv::split_line(data);

    // Every field came from the input, so the total field length can never
    // exceed the input length.
    let total: usize = fields.iter().map(|f| f.len()).sum();
    assert!(total <= data.len());

    for field in &fields {
        let _ = csv::parse_source_datetime(field);
        let _ = csv::parse_source_number(field);
    }

    let _ = csv::slugify(data);
    let _ = csv::column_for_header(data);
});
