//! Fuzz target for result normalization.
//!
//! Any JSON value the evaluator can hand back must normalize without panicking, and a
//! decision built from it must agree with the individual normalizers.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_normalize
//! ```

#![no_main]

use governant_domain::{classify, decide, to_boolean, to_list, unwrap_eval_output};
use libfuzzer_sys::fuzz_target;
use serde_json::Value;

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = serde_json::from_slice::<Value>(data) else {
        return;
    };

    let _ = classify(&raw);
    let allow = to_boolean(&raw);
    let list = to_list(&raw);

    let decision = decide(&raw, &raw);
    assert_eq!(decision.violations, list);
    assert_eq!(decision.allow, allow && list.is_empty());

    let _ = unwrap_eval_output(raw);
});
