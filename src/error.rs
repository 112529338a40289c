//! Unified error types for ETM Envelope.

use core::fmt;

/// The single failure returned by `open`.
///
/// Malformed input and authentication failure are deliberately the same
/// value so callers (and attackers) cannot tell which check rejected a blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecryptionError;

impl fmt::Display for DecryptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "decryption failed")
    }
}

impl std::error::Error for DecryptionError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodingError;

impl fmt::Display for EncodingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "encoding error")
    }
}

impl std::error::Error for EncodingError {}

/// Normalize encode errors into decrypt errors (oracle discipline).
impl From<EncodingError> for DecryptionError {
    fn from(_: EncodingError) -> Self {
        DecryptionError
    }
}

/// The entropy source failed, or kept reporting weak output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomnessUnavailable;

impl fmt::Display for RandomnessUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cryptographic randomness unavailable")
    }
}

impl std::error::Error for RandomnessUnavailable {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KdfError {
    ZeroIterations,
    ZeroLength,
    /// More than 2^32 - 1 hash blocks would be needed.
    OutputTooLong,
    /// The PRF refused the password as an HMAC key.
    InvalidPassword,
}

impl fmt::Display for KdfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroIterations => write!(f, "iteration count must be at least 1"),
            Self::ZeroLength => write!(f, "key length must be at least 1"),
            Self::OutputTooLong => write!(f, "requested key length is too long"),
            Self::InvalidPassword => write!(f, "password rejected as HMAC key"),
        }
    }
}

impl std::error::Error for KdfError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeError {
    Inverted { min: i64, max: i64 },
    RandomnessUnavailable,
}

impl fmt::Display for RangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inverted { min, max } => write!(f, "invalid range: max {} < min {}", max, min),
            Self::RandomnessUnavailable => RandomnessUnavailable.fmt(f),
        }
    }
}

impl std::error::Error for RangeError {}

impl From<RandomnessUnavailable> for RangeError {
    fn from(_: RandomnessUnavailable) -> Self {
        Self::RandomnessUnavailable
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SealError {
    RandomnessUnavailable,
    KeyDerivation(KdfError),
    Encoding,
}

impl fmt::Display for SealError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RandomnessUnavailable => RandomnessUnavailable.fmt(f),
            Self::KeyDerivation(e) => write!(f, "key derivation failed: {}", e),
            Self::Encoding => EncodingError.fmt(f),
        }
    }
}

impl std::error::Error for SealError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::KeyDerivation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RandomnessUnavailable> for SealError {
    fn from(_: RandomnessUnavailable) -> Self {
        Self::RandomnessUnavailable
    }
}

impl From<KdfError> for SealError {
    fn from(e: KdfError) -> Self {
        Self::KeyDerivation(e)
    }
}

impl From<EncodingError> for SealError {
    fn from(_: EncodingError) -> Self {
        Self::Encoding
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidIterations(String),
    UnknownSuite(String),
    UnknownHash(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidIterations(v) => write!(f, "invalid iteration count: {:?}", v),
            Self::UnknownSuite(v) => write!(f, "unknown suite: {:?} (expected standard or compat)", v),
            Self::UnknownHash(v) => write!(f, "unsupported hash algorithm: {:?} (expected sha256, sha384 or sha512)", v),
        }
    }
}

impl std::error::Error for ConfigError {}
