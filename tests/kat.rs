//! Known Answer / interop tests

use std::sync::atomic::{AtomicU8, Ordering};

use aes::Aes256;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use cbc::cipher::{block_padding::Pkcs7, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use etm_envelope::wire::{
    self, decode_blob, COMPAT_HEADER_BYTES, HEX_MAC_BYTES, IV_BYTES, MAC_BYTES, SALT_BYTES,
    STANDARD_HEADER_BYTES,
};
use etm_envelope::{
    kdf, Cipher, CipherConfig, EntropySource, HashAlgorithm, RandomnessUnavailable, Strength,
    Suite,
};

/// Emits 0, 1, 2, ... across all draws.
#[derive(Default)]
struct Sequence(AtomicU8);

impl EntropySource for Sequence {
    fn fill(&self, dest: &mut [u8]) -> Result<Strength, RandomnessUnavailable> {
        for b in dest.iter_mut() {
            *b = self.0.fetch_add(1, Ordering::SeqCst);
        }
        Ok(Strength::Strong)
    }
}

fn reference_pbkdf2(p: &[u8], s: &[u8], c: u32, len: usize) -> Vec<u8> {
    let mut out = vec![0u8; len];
    pbkdf2::pbkdf2_hmac::<Sha256>(p, s, c, &mut out);
    out
}

#[test]
fn test_wire_constants() {
    assert_eq!(IV_BYTES, 16);
    assert_eq!(SALT_BYTES, 8);
    assert_eq!(MAC_BYTES, 32);
    assert_eq!(HEX_MAC_BYTES, 64);
    assert_eq!(STANDARD_HEADER_BYTES, 16 + 8 + 32);
    assert_eq!(COMPAT_HEADER_BYTES, 16 + 8 + 64);
}

#[test]
fn test_kdf_matches_reference_pbkdf2() {
    let ours = etm_envelope::derive_key(b"password", b"salt1234", 1000, 32).unwrap();
    assert_eq!(&ours[..], &reference_pbkdf2(b"password", b"salt1234", 1000, 32)[..]);

    let cases: [(&[u8], &[u8], u32, usize); 4] = [
        (b"password", b"salt", 1, 20),
        (b"passwordPASSWORDpassword", b"saltSALTsaltSALTsaltSALTsaltSALTsalt", 50, 40),
        (b"", b"salt", 3, 64),
        (b"key", b"", 7, 100),
    ];
    for (p, s, c, len) in cases {
        let ours = etm_envelope::derive_key(p, s, c, len).unwrap();
        assert_eq!(&ours[..], &reference_pbkdf2(p, s, c, len)[..]);
    }
}

#[test]
fn test_kdf_offset_matches_reference_window() {
    let full = reference_pbkdf2(b"pw", b"salt", 5, 80);
    let window = kdf::derive_key(b"pw", b"salt", 5, 30, HashAlgorithm::Sha256, 40).unwrap();
    assert_eq!(&window[..], &full[40..70]);
}

#[test]
fn test_kdf_is_deterministic_and_input_sensitive() {
    let base = etm_envelope::derive_key(b"pw", b"salt1234", 10, 32).unwrap();
    assert_eq!(base, etm_envelope::derive_key(b"pw", b"salt1234", 10, 32).unwrap());
    assert_ne!(base, etm_envelope::derive_key(b"pX", b"salt1234", 10, 32).unwrap());
    assert_ne!(base, etm_envelope::derive_key(b"pw", b"salt1235", 10, 32).unwrap());
    assert_ne!(base, etm_envelope::derive_key(b"pw", b"salt1234", 11, 32).unwrap());
}

#[test]
fn test_salt_and_iv_come_from_entropy_source() {
    let cipher = Cipher::with_entropy(CipherConfig::default(), Sequence::default());
    let raw = cipher.seal_raw(b"key", b"test").unwrap();

    let parts = decode_blob(&raw, Suite::Standard).unwrap();
    // salt is drawn first, then the iv
    assert_eq!(parts.salt, &[0, 1, 2, 3, 4, 5, 6, 7]);
    assert_eq!(parts.iv, &[8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23]);
    assert_eq!(parts.cipher_bytes.len(), 16);
}

#[test]
fn test_deterministic_source_gives_reproducible_blob() {
    let a = Cipher::with_entropy(CipherConfig::default(), Sequence::default());
    let b = Cipher::with_entropy(CipherConfig::default(), Sequence::default());
    assert_eq!(a.seal(b"key", b"test").unwrap(), b.seal(b"key", b"test").unwrap());
}

/// Assemble a blob exactly as the legacy helper does.
fn legacy_blob(base_key: &[u8], plaintext: &[u8], salt: [u8; 8], iv: [u8; 16]) -> String {
    let key = reference_pbkdf2(base_key, &salt, 1000, 64);

    let ct = cbc::Encryptor::<Aes256>::new_from_slices(&key[..32], &iv)
        .unwrap()
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(&key).unwrap();
    mac.update(&ct);
    let hex_tag = hex::encode(mac.finalize().into_bytes());

    let mut raw = Vec::new();
    raw.extend_from_slice(&iv);
    raw.extend_from_slice(&salt);
    raw.extend_from_slice(hex_tag.as_bytes());
    raw.extend_from_slice(&ct);
    STANDARD.encode(raw)
}

#[test]
fn test_compat_opens_legacy_blob() {
    let blob = legacy_blob(b"legacy base key", b"stored secret", [7u8; 8], [9u8; 16]);
    let cipher = Cipher::with_config(CipherConfig::compat());
    assert_eq!(cipher.open(b"legacy base key", &blob).unwrap(), b"stored secret");

    // the standard suite must not accept it
    assert!(Cipher::new().open(b"legacy base key", &blob).is_err());
}

#[test]
fn test_compat_seal_matches_legacy_layout() {
    let cipher = Cipher::with_entropy(CipherConfig::compat(), Sequence::default());
    let blob = cipher.seal(b"legacy base key", b"stored secret").unwrap();

    let salt: [u8; 8] = core::array::from_fn(|i| i as u8);
    let iv: [u8; 16] = core::array::from_fn(|i| (i + 8) as u8);
    assert_eq!(blob, legacy_blob(b"legacy base key", b"stored secret", salt, iv));
}

#[test]
fn test_encoded_len_matches_seal_output() {
    for suite in [Suite::Standard, Suite::Compat] {
        let cipher = Cipher::with_config(CipherConfig::default().with_suite(suite));
        for len in [1usize, 16, 64, 100] {
            let blob = cipher.seal(b"k", &vec![1u8; len]).unwrap();
            assert_eq!(blob.len(), wire::encoded_len(len, suite));
        }
    }
}

#[test]
fn test_inspect_reports_layout() {
    let cipher = Cipher::with_entropy(CipherConfig::default(), Sequence::default());
    let blob = cipher.seal(b"k", b"0123456789abcdef0").unwrap();

    let info = etm_envelope::inspect(&blob, Suite::Standard).unwrap();
    assert_eq!(info.suite, Suite::Standard);
    assert_eq!(info.total_bytes, STANDARD_HEADER_BYTES + 32);
    assert_eq!(info.cipher_bytes, 32);
    assert_eq!(info.max_plaintext_bytes, 31);
    assert_eq!(info.salt_hex, "0001020304050607");

    assert!(etm_envelope::inspect("AAAA", Suite::Standard).is_err());
}
