#![no_main]

use libfuzzer_sys::fuzz_target;
use runguard_core::{MinisignPublicKey, MinisignSignature, SignatureVerifier};

const KEY: &str = "RWTV8L06+shYI7Xw1H+NBGmsUYlbEkbrdYxr4c0ImLCAr8NGx75VhxGQ";

fuzz_target!(|data: &[u8]| {
    let _ = MinisignSignature::parse(data);
    if let Ok(key) = MinisignPublicKey::parse(KEY) {
        // Arbitrary bytes must never verify against the fixed key.
        assert!(key.verify(b"payload", data).is_err());
    }
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = MinisignPublicKey::parse(text);
    }
});
