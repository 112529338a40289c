#![no_main]

use etm_envelope::wire::{decode_blob, from_text};
use etm_envelope::Suite;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = decode_blob(data, Suite::Standard);
    let _ = decode_blob(data, Suite::Compat);
    if let Ok(text) = core::str::from_utf8(data) {
        let _ = from_text(text);
    }
});
