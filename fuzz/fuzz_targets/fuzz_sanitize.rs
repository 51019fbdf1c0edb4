//! Fuzz target for the identifier sanitizer.
//!
//! Output must keep the character count, contain only safe characters and
//! be stable when sanitized again.

#![no_main]

use bk_common::{is_safe_char, sanitize};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|raw: &str| {
    let once = sanitize(raw);
    assert_eq!(once.chars().count(), raw.chars().count());
    assert!(once.chars().all(is_safe_char));
    assert_eq!(sanitize(&once), once);
});
