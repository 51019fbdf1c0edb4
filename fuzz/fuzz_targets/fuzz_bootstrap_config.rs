//! Fuzz target for bootstrap.json configuration parsing.
//!
//! Tests that JSON configuration parsing handles arbitrary input without
//! panicking.

#![no_main]

use bk_bootstrap::BootstrapConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = serde_json::from_slice::<BootstrapConfig>(data);
});
