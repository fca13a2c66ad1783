//! Fuzz target for policy index parsing.
//!
//! Goal: the parser should **never panic**. Rejections are reported as reasons.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_index_parser
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = governant_engine::parse_index(text);
    }
});
