//! Block cipher and MAC: AES-256-CBC (PKCS#7) + HMAC-SHA256

use aes::Aes256;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::{Choice, ConstantTimeEq};
use zeroize::Zeroizing;

use crate::error::{DecryptionError, EncodingError};
use crate::wire::{AES_KEY_BYTES, IV_BYTES, MAC_BYTES};

type HmacSha256 = Hmac<Sha256>;

/// CBC encrypt (seal path). Output length is the padded length.
pub fn cbc_encrypt(
    key: &[u8; AES_KEY_BYTES],
    iv: &[u8; IV_BYTES],
    plaintext: &[u8],
) -> Result<Vec<u8>, EncodingError> {
    let cipher = cbc::Encryptor::<Aes256>::new_from_slices(key, iv).map_err(|_| EncodingError)?;
    Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}

/// CBC decrypt (open path). Bad padding is a DecryptionError.
pub fn cbc_decrypt(
    key: &[u8; AES_KEY_BYTES],
    iv: &[u8; IV_BYTES],
    cipher_bytes: &[u8],
) -> Result<Zeroizing<Vec<u8>>, DecryptionError> {
    let cipher = cbc::Decryptor::<Aes256>::new_from_slices(key, iv).map_err(|_| DecryptionError)?;
    cipher
        .decrypt_padded_vec_mut::<Pkcs7>(cipher_bytes)
        .map(Zeroizing::new)
        .map_err(|_| DecryptionError)
}

/// HMAC-SHA256 over `data`.
pub fn mac(key: &[u8], data: &[u8]) -> Result<[u8; MAC_BYTES], EncodingError> {
    let mut m = <HmacSha256 as Mac>::new_from_slice(key).map_err(|_| EncodingError)?;
    m.update(data);
    let tag = m.finalize().into_bytes();
    let mut out = [0u8; MAC_BYTES];
    out.copy_from_slice(&tag);
    Ok(out)
}

/// Constant-time tag comparison. Unequal lengths compare unequal.
pub fn tags_match(received: &[u8], computed: &[u8]) -> Choice {
    received.ct_eq(computed)
}
