#![no_main]

use std::path::Path;

use libfuzzer_sys::fuzz_target;
use runguard_core::Settings;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = Settings::from_yaml(s, Path::new("/nonexistent"));
    }
});
