//! KDF: PBKDF2 over HMAC (RFC 8018 §5.2)
//!
//! T_i = U_1 ^ U_2 ^ ... ^ U_c
//! U_1 = HMAC(password, salt || INT_32_BE(i)),  U_j = HMAC(password, U_{j-1})
//! DK  = (T_1 || T_2 || ...)[start_offset .. start_offset + key_length]
//!
//! Sub-keys for the standard suite:
//! enc = HKDF-SHA256(dk, info = PROTOCOL_ID || b"|enc", len=32)
//! mac = HKDF-SHA256(dk, info = PROTOCOL_ID || b"|mac", len=32)

use core::fmt;
use core::str::FromStr;

use hkdf::Hkdf;
use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha384, Sha512};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{ConfigError, EncodingError, KdfError};
use crate::wire::{Suite, AES_KEY_BYTES, DERIVED_KEY_BYTES, PROTOCOL_ID};

/// Hash behind the HMAC pseudo-random function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    /// Digest size in bytes, i.e. the PBKDF2 block size.
    pub const fn output_size(self) -> usize {
        match self {
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "").as_str() {
            "sha256" => Ok(Self::Sha256),
            "sha384" => Ok(Self::Sha384),
            "sha512" => Ok(Self::Sha512),
            _ => Err(ConfigError::UnknownHash(s.to_string())),
        }
    }
}

/// Derive `key_length` bytes from `password` and `salt`.
///
/// `start_offset` skips that many bytes of the PBKDF2 output stream before
/// the returned window begins. The result is deterministic.
pub fn derive_key(
    password: &[u8],
    salt: &[u8],
    iterations: u32,
    key_length: usize,
    hash: HashAlgorithm,
    start_offset: usize,
) -> Result<Zeroizing<Vec<u8>>, KdfError> {
    if iterations == 0 {
        return Err(KdfError::ZeroIterations);
    }
    if key_length == 0 {
        return Err(KdfError::ZeroLength);
    }
    let end = start_offset
        .checked_add(key_length)
        .ok_or(KdfError::OutputTooLong)?;

    let stream = match hash {
        HashAlgorithm::Sha256 => pbkdf2_stream::<Hmac<Sha256>>(password, salt, iterations, end)?,
        HashAlgorithm::Sha384 => pbkdf2_stream::<Hmac<Sha384>>(password, salt, iterations, end)?,
        HashAlgorithm::Sha512 => pbkdf2_stream::<Hmac<Sha512>>(password, salt, iterations, end)?,
    };

    Ok(Zeroizing::new(stream[start_offset..end].to_vec()))
}

/// Compute enough whole PBKDF2 blocks to cover `len` bytes.
fn pbkdf2_stream<M>(
    password: &[u8],
    salt: &[u8],
    iterations: u32,
    len: usize,
) -> Result<Zeroizing<Vec<u8>>, KdfError>
where
    M: Mac + KeyInit + Clone,
{
    let prf = <M as KeyInit>::new_from_slice(password).map_err(|_| KdfError::InvalidPassword)?;
    let block_len = <M as hmac::digest::OutputSizeUser>::output_size();
    let blocks = u32::try_from(len.div_ceil(block_len)).map_err(|_| KdfError::OutputTooLong)?;

    let mut out = Zeroizing::new(Vec::with_capacity(blocks as usize * block_len));

    for index in 1..=blocks {
        let mut mac = prf.clone();
        mac.update(salt);
        mac.update(&index.to_be_bytes());
        let mut running = mac.finalize().into_bytes();
        let mut block = running.clone();

        for _ in 1..iterations {
            let mut mac = prf.clone();
            mac.update(&running);
            running = mac.finalize().into_bytes();
            block
                .iter_mut()
                .zip(running.iter())
                .for_each(|(acc, u)| *acc ^= u);
        }

        out.extend_from_slice(&block);
        running.as_mut_slice().zeroize();
        block.as_mut_slice().zeroize();
    }

    Ok(out)
}

/// Cipher key and MAC key for one envelope. Wiped on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub(crate) struct SubKeys {
    pub enc: [u8; AES_KEY_BYTES],
    pub mac: Vec<u8>,
}

/// Split a 64-byte derived key into the keys a suite uses.
///
/// Compat reuses the derived key: AES takes the first 32 bytes and HMAC
/// the whole 64. Standard expands two labelled, independent sub-keys.
pub(crate) fn sub_keys(derived: &[u8], suite: Suite) -> Result<SubKeys, EncodingError> {
    if derived.len() != DERIVED_KEY_BYTES {
        return Err(EncodingError);
    }

    match suite {
        Suite::Compat => {
            let mut keys = SubKeys {
                enc: [0u8; AES_KEY_BYTES],
                mac: derived.to_vec(),
            };
            keys.enc.copy_from_slice(&derived[..AES_KEY_BYTES]);
            Ok(keys)
        }
        Suite::Standard => {
            let hk = Hkdf::<Sha256>::new(None, derived);
            let mut keys = SubKeys {
                enc: [0u8; AES_KEY_BYTES],
                mac: vec![0u8; 32],
            };

            hk.expand(&label(b"|enc"), &mut keys.enc)
                .map_err(|_| EncodingError)?;
            hk.expand(&label(b"|mac"), &mut keys.mac)
                .map_err(|_| EncodingError)?;

            Ok(keys)
        }
    }
}

fn label(purpose: &[u8]) -> Vec<u8> {
    let mut info = Vec::with_capacity(PROTOCOL_ID.len() + purpose.len());
    info.extend_from_slice(PROTOCOL_ID);
    info.extend_from_slice(purpose);
    info
}
