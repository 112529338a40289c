//! # ETM Envelope
//!
//! Encrypt-then-MAC for data sealed under a long-lived base secret.
//!
//! ## Quick Start
//!
//! ```rust
//! let base_key = etm_envelope::generate_key().unwrap();
//!
//! let blob = etm_envelope::seal(base_key.as_bytes(), b"secret").unwrap();
//! let plaintext = etm_envelope::open(base_key.as_bytes(), &blob).unwrap();
//!
//! assert_eq!(plaintext, b"secret");
//! ```
//!
//! ## Construction
//!
//! - **KDF**: PBKDF2-HMAC-SHA256, 8-byte random salt, 1000 iterations, 64-byte output
//! - **Cipher**: AES-256-CBC with PKCS#7 padding and a random 16-byte IV
//! - **MAC**: HMAC-SHA256 over the cipher bytes, compared in constant time
//! - **Uniform errors**: every `open` failure is the same `DecryptionError`
//! - **Blob**: base64 of `iv || salt || mac || cipher_bytes`
//!
//! ## What's NOT Provided
//!
//! - Key management or rotation
//! - Streaming encryption
//! - Empty plaintexts (they seal, but never open)
//! - IV integrity: the MAC does not cover the IV, so an IV bit flip opens
//!   with the matching bit of the first plaintext block flipped

#![deny(unsafe_code)]
#![doc(html_root_url = "https://docs.rs/etm-envelope/0.1.0")]

mod cipher;
mod error;

pub mod config;
pub mod envelope;
pub mod kdf;
pub mod keygen;
pub mod random;
pub mod wire;

use zeroize::Zeroizing;

pub use config::{CipherConfig, DEFAULT_ITERATIONS};
pub use envelope::Cipher;
pub use error::{
    ConfigError, DecryptionError, EncodingError, KdfError, RandomnessUnavailable, RangeError,
    SealError,
};
pub use kdf::HashAlgorithm;
pub use keygen::{generate_key, GeneratedKey, GENERATED_KEY_BYTES};
pub use random::{EntropySource, OsEntropy, Strength};
pub use wire::{inspect, BlobInfo, Suite};

/// SDK version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// PBKDF2-HMAC-SHA256 from the start of the output stream.
///
/// See [`kdf::derive_key`] for other hashes and offsets.
pub fn derive_key(
    password: &[u8],
    salt: &[u8],
    iterations: u32,
    key_length: usize,
) -> Result<Zeroizing<Vec<u8>>, KdfError> {
    kdf::derive_key(password, salt, iterations, key_length, HashAlgorithm::Sha256, 0)
}

/// Integer in `[min, max)`; `uniform_random_int(x, x) == Ok(x)`.
pub fn uniform_random_int(min: i64, max: i64) -> Result<i64, RangeError> {
    random::uniform_int(min, max)
}

/// Seal with the default configuration.
pub fn seal(base_key: &[u8], plaintext: &[u8]) -> Result<String, SealError> {
    Cipher::new().seal(base_key, plaintext)
}

/// Open with the default configuration.
pub fn open(base_key: &[u8], blob: &str) -> Result<Vec<u8>, DecryptionError> {
    Cipher::new().open(base_key, blob)
}
