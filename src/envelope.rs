//! Encrypt-then-MAC envelope engine.
//!
//! seal: salt, iv <- random; dk = PBKDF2-HMAC-SHA256(base_key, salt, c, 64)
//!       ct = AES-256-CBC(enc_key, iv, plaintext); tag = HMAC-SHA256(mac_key, ct)
//!       blob = base64(iv || salt || tag || ct)
//!
//! open: the tag is only compared after the decryption has run, and
//! every rejection surfaces as the same `DecryptionError`.

use subtle::Choice;
use zeroize::Zeroizing;

use crate::config::CipherConfig;
use crate::error::{DecryptionError, SealError};
use crate::kdf::{self, HashAlgorithm};
use crate::random::{random_array, EntropySource, OsEntropy};
use crate::wire::{self, Suite, DERIVED_KEY_BYTES, IV_BYTES, SALT_BYTES};
use crate::{cipher, keygen};

/// Authenticated cipher over a caller-held base key.
///
/// Stateless apart from its configuration; share it freely between
/// threads.
///
/// # Example
///
/// ```
/// use etm_envelope::Cipher;
///
/// let cipher = Cipher::new();
/// let base_key = etm_envelope::generate_key()?;
///
/// let blob = cipher.seal(base_key.as_bytes(), b"hello world")?;
/// let plaintext = cipher.open(base_key.as_bytes(), &blob)?;
///
/// assert_eq!(plaintext, b"hello world");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct Cipher<E: EntropySource = OsEntropy> {
    config: CipherConfig,
    entropy: E,
}

impl Default for Cipher<OsEntropy> {
    fn default() -> Self {
        Self::new()
    }
}

impl Cipher<OsEntropy> {
    /// Default configuration: standard suite, 1000 iterations.
    pub fn new() -> Self {
        Self::with_config(CipherConfig::default())
    }

    pub fn with_config(config: CipherConfig) -> Self {
        Self {
            config,
            entropy: OsEntropy,
        }
    }
}

impl<E: EntropySource> Cipher<E> {
    /// Use a custom entropy source for salts and IVs.
    pub fn with_entropy(config: CipherConfig, entropy: E) -> Self {
        Self { config, entropy }
    }

    pub fn config(&self) -> &CipherConfig {
        &self.config
    }

    /// Generate a base key from this cipher's entropy source.
    pub fn generate_key(&self) -> Result<keygen::GeneratedKey, SealError> {
        Ok(keygen::generate_key_with(&self.entropy)?)
    }

    /// Encrypt then MAC `plaintext` under `base_key`; returns base64 text.
    ///
    /// An empty plaintext seals fine but never opens: `open` treats an
    /// empty result as a failure.
    pub fn seal(&self, base_key: &[u8], plaintext: &[u8]) -> Result<String, SealError> {
        let raw = self.seal_raw(base_key, plaintext)?;
        Ok(wire::to_text(&raw))
    }

    /// `seal` without the base64 step.
    pub fn seal_raw(&self, base_key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, SealError> {
        let suite = self.config.suite;
        let salt: [u8; SALT_BYTES] = random_array(&self.entropy)?;
        let iv: [u8; IV_BYTES] = random_array(&self.entropy)?;

        let derived = self.derive(base_key, &salt)?;
        let keys = kdf::sub_keys(&derived, suite)?;

        let cipher_bytes = cipher::cbc_encrypt(&keys.enc, &iv, plaintext)?;
        let tag = cipher::mac(&keys.mac, &cipher_bytes)?;
        let mac_field = encode_tag(&tag, suite);

        let raw = wire::encode_blob(&iv, &salt, &mac_field, &cipher_bytes, suite)?;

        tracing::debug!(
            suite = %suite,
            plaintext_len = plaintext.len(),
            blob_len = raw.len(),
            "sealed envelope"
        );

        Ok(raw)
    }

    /// Verify and decrypt a base64 blob produced by `seal`.
    ///
    /// # Error Behavior
    ///
    /// Returns the opaque `DecryptionError` for ALL failure modes:
    /// - Wrong base key or configuration
    /// - Tampered salt, tag or cipher bytes
    /// - Invalid base64, truncated or misaligned blob
    /// - Empty decrypted plaintext
    ///
    /// The tag covers the cipher bytes only. A flipped IV bit is not
    /// detected: it flips the same bit of the first plaintext block.
    pub fn open(&self, base_key: &[u8], blob: &str) -> Result<Vec<u8>, DecryptionError> {
        let raw = wire::from_text(blob).map_err(|e| {
            tracing::debug!("envelope rejected");
            e
        })?;
        self.open_raw(base_key, &raw)
    }

    /// `open` for an already base64-decoded blob.
    pub fn open_raw(&self, base_key: &[u8], raw: &[u8]) -> Result<Vec<u8>, DecryptionError> {
        let result = self.try_open(base_key, raw);
        match &result {
            Ok(pt) => tracing::debug!(suite = %self.config.suite, plaintext_len = pt.len(), "opened envelope"),
            Err(_) => tracing::debug!(suite = %self.config.suite, "envelope rejected"),
        }
        result
    }

    fn try_open(&self, base_key: &[u8], raw: &[u8]) -> Result<Vec<u8>, DecryptionError> {
        let suite = self.config.suite;
        let parts = wire::decode_blob(raw, suite)?;

        let derived = self.derive(base_key, parts.salt).map_err(|_| DecryptionError)?;
        let keys = kdf::sub_keys(&derived, suite)?;

        // Decrypt first so the work done does not depend on the tag.
        let decrypted = cipher::cbc_decrypt(&keys.enc, parts.iv, parts.cipher_bytes);

        let tag = cipher::mac(&keys.mac, parts.cipher_bytes)?;
        let expected = encode_tag(&tag, suite);
        let tag_ok = cipher::tags_match(parts.mac, &expected);

        let (plaintext, decrypt_ok) = match decrypted {
            Ok(pt) => (pt, Choice::from(1)),
            Err(_) => (Zeroizing::new(Vec::new()), Choice::from(0)),
        };
        let non_empty = Choice::from(u8::from(!plaintext.is_empty()));

        if bool::from(tag_ok & decrypt_ok & non_empty) {
            Ok(plaintext.to_vec())
        } else {
            Err(DecryptionError)
        }
    }

    fn derive(
        &self,
        base_key: &[u8],
        salt: &[u8; SALT_BYTES],
    ) -> Result<Zeroizing<Vec<u8>>, SealError> {
        Ok(kdf::derive_key(
            base_key,
            salt,
            self.config.iterations.get(),
            DERIVED_KEY_BYTES,
            HashAlgorithm::Sha256,
            0,
        )?)
    }
}

/// Tag as it appears on the wire for `suite`.
fn encode_tag(tag: &[u8], suite: Suite) -> Zeroizing<Vec<u8>> {
    match suite {
        Suite::Standard => Zeroizing::new(tag.to_vec()),
        Suite::Compat => Zeroizing::new(hex::encode(tag).into_bytes()),
    }
}
