#![no_main]

use etm_envelope::{Cipher, CipherConfig};
use libfuzzer_sys::fuzz_target;
use once_cell::sync::Lazy;

static CIPHERS: Lazy<[Cipher; 2]> =
    Lazy::new(|| [Cipher::new(), Cipher::with_config(CipherConfig::compat())]);

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    // first byte splits the input into key and blob
    let split = (data[0] as usize) % data.len();
    let (key, blob) = data[1..].split_at(split.min(data.len() - 1));

    for cipher in CIPHERS.iter() {
        if cipher.open_raw(key, blob).is_ok() {
            panic!("forged blob accepted");
        }
    }
});
