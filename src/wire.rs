//! Wire format
//!
//! Standard suite:
//!   iv[16] || salt[8] || mac[32] || cipher_bytes[16n]
//!
//! Compat suite (blobs written by the legacy PHP helper):
//!   iv[16] || salt[8] || hex(mac)[64] || cipher_bytes[16n]
//!
//! Both are carried as standard base64 text. The layout has no version
//! byte; the suite is chosen by configuration on both sides.

use core::fmt;
use core::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::{ConfigError, DecryptionError, EncodingError};

/// Protocol identifier for KDF domain separation
pub const PROTOCOL_ID: &[u8] = b"etm-envelope-v1";

// ---------------------------------------------------------------------------
// Component sizes
// ---------------------------------------------------------------------------

pub const IV_BYTES: usize = 16;
pub const SALT_BYTES: usize = 8;

/// AES block size; cipher bytes are always a positive multiple of it.
pub const BLOCK_BYTES: usize = 16;

/// PBKDF2 output length (512 bits)
pub const DERIVED_KEY_BYTES: usize = 64;
pub const AES_KEY_BYTES: usize = 32;

/// Raw HMAC-SHA256 tag
pub const MAC_BYTES: usize = 32;

/// Lowercase hex HMAC-SHA256 tag (compat suite)
pub const HEX_MAC_BYTES: usize = 2 * MAC_BYTES;

pub const STANDARD_HEADER_BYTES: usize = IV_BYTES + SALT_BYTES + MAC_BYTES; // 56
pub const COMPAT_HEADER_BYTES: usize = IV_BYTES + SALT_BYTES + HEX_MAC_BYTES; // 88

/// Envelope layout selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Suite {
    /// Raw 32-byte tag, independent cipher/MAC sub-keys.
    #[default]
    Standard,
    /// Hex tag, shared derived key. Reads and writes legacy blobs.
    Compat,
}

impl Suite {
    /// Bytes the MAC occupies on the wire.
    pub const fn mac_field_bytes(self) -> usize {
        match self {
            Self::Standard => MAC_BYTES,
            Self::Compat => HEX_MAC_BYTES,
        }
    }

    /// iv + salt + mac field
    pub const fn header_bytes(self) -> usize {
        match self {
            Self::Standard => STANDARD_HEADER_BYTES,
            Self::Compat => COMPAT_HEADER_BYTES,
        }
    }

    /// Smallest decodable blob: header plus one cipher block.
    pub const fn min_blob_bytes(self) -> usize {
        self.header_bytes() + BLOCK_BYTES
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Compat => "compat",
        }
    }
}

impl fmt::Display for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Suite {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "compat" | "legacy" => Ok(Self::Compat),
            _ => Err(ConfigError::UnknownSuite(s.to_string())),
        }
    }
}

/// Borrowed view of a parsed blob.
#[derive(Debug, Clone, Copy)]
pub struct BlobParts<'a> {
    pub iv: &'a [u8; IV_BYTES],
    pub salt: &'a [u8; SALT_BYTES],
    pub mac: &'a [u8],
    pub cipher_bytes: &'a [u8],
}

pub fn decode_blob(data: &[u8], suite: Suite) -> Result<BlobParts<'_>, DecryptionError> {
    if data.len() < suite.min_blob_bytes() {
        return Err(DecryptionError);
    }

    let salt_start = IV_BYTES;
    let mac_start = salt_start + SALT_BYTES;
    let body_start = suite.header_bytes();

    let iv: &[u8; IV_BYTES] = data[..salt_start]
        .try_into()
        .map_err(|_| DecryptionError)?;
    let salt: &[u8; SALT_BYTES] = data[salt_start..mac_start]
        .try_into()
        .map_err(|_| DecryptionError)?;
    let mac = &data[mac_start..body_start];

    let cipher_bytes = &data[body_start..];
    if cipher_bytes.len() % BLOCK_BYTES != 0 {
        return Err(DecryptionError);
    }

    Ok(BlobParts {
        iv,
        salt,
        mac,
        cipher_bytes,
    })
}

pub fn encode_blob(
    iv: &[u8; IV_BYTES],
    salt: &[u8; SALT_BYTES],
    mac: &[u8],
    cipher_bytes: &[u8],
    suite: Suite,
) -> Result<Vec<u8>, EncodingError> {
    if mac.len() != suite.mac_field_bytes() {
        return Err(EncodingError);
    }
    if cipher_bytes.is_empty() || cipher_bytes.len() % BLOCK_BYTES != 0 {
        return Err(EncodingError);
    }

    let mut out = Vec::with_capacity(suite.header_bytes() + cipher_bytes.len());
    out.extend_from_slice(iv);
    out.extend_from_slice(salt);
    out.extend_from_slice(mac);
    out.extend_from_slice(cipher_bytes);

    Ok(out)
}

/// Base64 transport encoding.
pub fn to_text(raw: &[u8]) -> String {
    STANDARD.encode(raw)
}

pub fn from_text(text: &str) -> Result<Vec<u8>, DecryptionError> {
    STANDARD.decode(text.trim()).map_err(|_| DecryptionError)
}

/// Cipher bytes produced for a plaintext (PKCS#7 always adds padding).
pub const fn padded_len(plaintext_len: usize) -> usize {
    (plaintext_len / BLOCK_BYTES + 1) * BLOCK_BYTES
}

/// Length of the base64 text `seal` produces for a plaintext.
///
/// Use this to size storage columns.
pub const fn encoded_len(plaintext_len: usize, suite: Suite) -> usize {
    let raw = suite.header_bytes() + padded_len(plaintext_len);
    raw.div_ceil(3) * 4
}

// ---------------------------------------------------------------------------
// Inspection (for ops/debugging)
// ---------------------------------------------------------------------------

/// Blob metadata (extracted without decryption).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobInfo {
    pub suite: Suite,
    /// Decoded length
    pub total_bytes: usize,
    pub cipher_bytes: usize,
    /// Plaintext is between `cipher_bytes - 16` and `cipher_bytes - 1`.
    pub max_plaintext_bytes: usize,
    /// Salt is public; shown as hex.
    pub salt_hex: String,
}

impl fmt::Display for BlobInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ETM {} | {} bytes ({} cipher, <= {} plaintext) | salt {}",
            self.suite, self.total_bytes, self.cipher_bytes, self.max_plaintext_bytes, self.salt_hex
        )
    }
}

/// Inspect a base64 blob without decrypting. Reveals nothing secret.
pub fn inspect(blob: &str, suite: Suite) -> Result<BlobInfo, DecryptionError> {
    let raw = from_text(blob)?;
    let parts = decode_blob(&raw, suite)?;

    Ok(BlobInfo {
        suite,
        total_bytes: raw.len(),
        cipher_bytes: parts.cipher_bytes.len(),
        max_plaintext_bytes: parts.cipher_bytes.len() - 1,
        salt_hex: hex::encode(parts.salt),
    })
}
