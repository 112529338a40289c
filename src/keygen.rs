//! Base key generation
//!
//! key = lowercase_hex( SHA-256( random[100] ) )   (64 ASCII bytes)

use core::fmt;

use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::RandomnessUnavailable;
use crate::random::{fill_secure, EntropySource, OsEntropy};

/// Length of a generated key in bytes.
pub const GENERATED_KEY_BYTES: usize = 64;

/// Random bytes hashed into each key.
pub const SEED_BYTES: usize = 100;

/// 64 bytes of key material, usable directly as a base key.
///
/// Stored as hex text so it survives text columns and config files.
#[derive(Clone, PartialEq, Eq)]
pub struct GeneratedKey {
    hex: Zeroizing<String>,
}

impl GeneratedKey {
    pub fn as_bytes(&self) -> &[u8] {
        self.hex.as_bytes()
    }

    pub fn as_str(&self) -> &str {
        &self.hex
    }
}

impl AsRef<[u8]> for GeneratedKey {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl fmt::Debug for GeneratedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("GeneratedKey([REDACTED])")
    }
}

/// Generate a fresh key from the OS source.
pub fn generate_key() -> Result<GeneratedKey, RandomnessUnavailable> {
    generate_key_with(&OsEntropy)
}

/// Generate a fresh key from `source`. Weak draws are discarded and the
/// whole seed redrawn.
pub fn generate_key_with<S>(source: &S) -> Result<GeneratedKey, RandomnessUnavailable>
where
    S: EntropySource + ?Sized,
{
    let mut seed = Zeroizing::new([0u8; SEED_BYTES]);
    fill_secure(source, seed.as_mut_slice())?;

    let mut digest = Zeroizing::new([0u8; 32]);
    digest.copy_from_slice(&Sha256::digest(seed.as_slice()));
    let hex = Zeroizing::new(hex::encode(digest.as_slice()));
    debug_assert_eq!(hex.len(), GENERATED_KEY_BYTES);

    Ok(GeneratedKey { hex })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::Strength;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        weak: usize,
        calls: AtomicUsize,
    }

    impl EntropySource for Counting {
        fn fill(&self, dest: &mut [u8]) -> Result<Strength, RandomnessUnavailable> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            dest.fill(n as u8);
            Ok(if n < self.weak { Strength::Weak } else { Strength::Strong })
        }
    }

    #[test]
    fn key_is_64_hex_chars() {
        let key = generate_key().unwrap();
        assert_eq!(key.as_bytes().len(), GENERATED_KEY_BYTES);
        assert!(key.as_str().bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()));
    }

    #[test]
    fn successive_keys_differ() {
        assert_ne!(generate_key().unwrap(), generate_key().unwrap());
    }

    #[test]
    fn key_is_sha256_of_accepted_seed() {
        let src = Counting { weak: 2, calls: AtomicUsize::new(0) };
        let key = generate_key_with(&src).unwrap();
        // third draw (index 2) is the first strong one
        let expected = hex::encode(Sha256::digest([2u8; SEED_BYTES]));
        assert_eq!(key.as_str(), expected);
    }

    #[test]
    fn debug_redacts_material() {
        let key = generate_key().unwrap();
        let shown = format!("{:?}", key);
        assert!(!shown.contains(key.as_str()));
    }
}
