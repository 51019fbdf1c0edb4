//! Fuzz target for redaction pattern parsing and matching.
//!
//! Arbitrary patterns must either parse or be rejected, never panic, and a
//! parsed pattern must answer for any variable name.

#![no_main]

use bk_redact::NamePattern;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (&str, &str)| {
    let (raw, name) = input;
    if let Ok(pattern) = NamePattern::parse(raw) {
        let _ = pattern.matches(name);
    }
});
