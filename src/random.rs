//! Secure randomness: entropy sources and range sampling.

use crate::error::{RandomnessUnavailable, RangeError};

/// Number of draws tried before a source that keeps reporting weak output
/// is given up on.
pub const MAX_ENTROPY_ATTEMPTS: usize = 8;

/// Quality a source reports for one draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strength {
    Strong,
    Weak,
}

/// Byte source used for salts, IVs, key seeds and range sampling.
///
/// Implementations must be safe to share between threads.
pub trait EntropySource: Send + Sync {
    fn fill(&self, dest: &mut [u8]) -> Result<Strength, RandomnessUnavailable>;
}

impl<S: EntropySource + ?Sized> EntropySource for &S {
    fn fill(&self, dest: &mut [u8]) -> Result<Strength, RandomnessUnavailable> {
        (**self).fill(dest)
    }
}

/// The operating system CSPRNG. Process-wide, seeded by the OS.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn fill(&self, dest: &mut [u8]) -> Result<Strength, RandomnessUnavailable> {
        getrandom::getrandom(dest).map_err(|e| {
            tracing::error!(error = %e, "OS entropy source failed");
            RandomnessUnavailable
        })?;
        Ok(Strength::Strong)
    }
}

/// Fill `dest` with strong output, redrawing the whole buffer after a weak
/// draw. Source errors are returned immediately.
pub fn fill_secure<S>(source: &S, dest: &mut [u8]) -> Result<(), RandomnessUnavailable>
where
    S: EntropySource + ?Sized,
{
    for attempt in 1..=MAX_ENTROPY_ATTEMPTS {
        match source.fill(dest)? {
            Strength::Strong => return Ok(()),
            Strength::Weak => {
                tracing::warn!(attempt, len = dest.len(), "entropy source reported weak output; redrawing");
            }
        }
    }

    dest.fill(0);
    Err(RandomnessUnavailable)
}

pub fn random_array<const N: usize, S>(source: &S) -> Result<[u8; N], RandomnessUnavailable>
where
    S: EntropySource + ?Sized,
{
    let mut out = [0u8; N];
    fill_secure(source, &mut out)?;
    Ok(out)
}

/// Integer in `[min, max)` from the OS source.
///
/// `uniform_int(x, x)` returns `x` without drawing. The value is the
/// big-endian draw reduced modulo the range, so it carries a small bias
/// for ranges that are not a power of 256; fine for picking lengths and
/// offsets, not for generating secrets.
pub fn uniform_int(min: i64, max: i64) -> Result<i64, RangeError> {
    uniform_int_with(&OsEntropy, min, max)
}

pub fn uniform_int_with<S>(source: &S, min: i64, max: i64) -> Result<i64, RangeError>
where
    S: EntropySource + ?Sized,
{
    if max == min {
        return Ok(min);
    }
    if max < min {
        return Err(RangeError::Inverted { min, max });
    }

    // max > min, so the span fits in u64.
    let range = (i128::from(max) - i128::from(min)) as u64;
    let width = byte_width(range);

    let mut buf = [0u8; 8];
    fill_secure(source, &mut buf[8 - width..])?;
    let draw = u64::from_be_bytes(buf) % range;

    Ok((i128::from(min) + i128::from(draw)) as i64)
}

/// Bytes needed to represent `range`: floor(log2(range) / 8) + 1.
fn byte_width(range: u64) -> usize {
    (range.ilog2() / 8 + 1) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Reports weak output for the first `weak` draws.
    struct Flaky {
        weak: usize,
        calls: AtomicUsize,
    }

    impl EntropySource for Flaky {
        fn fill(&self, dest: &mut [u8]) -> Result<Strength, RandomnessUnavailable> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            dest.fill(0xA5);
            Ok(if n < self.weak { Strength::Weak } else { Strength::Strong })
        }
    }

    struct Broken;

    impl EntropySource for Broken {
        fn fill(&self, _dest: &mut [u8]) -> Result<Strength, RandomnessUnavailable> {
            Err(RandomnessUnavailable)
        }
    }

    /// Always returns 0xFF bytes and counts how many were requested.
    struct Saturated {
        last_len: AtomicUsize,
    }

    impl EntropySource for Saturated {
        fn fill(&self, dest: &mut [u8]) -> Result<Strength, RandomnessUnavailable> {
            self.last_len.store(dest.len(), Ordering::SeqCst);
            dest.fill(0xFF);
            Ok(Strength::Strong)
        }
    }

    #[test]
    fn byte_width_follows_log2() {
        assert_eq!(byte_width(1), 1);
        assert_eq!(byte_width(255), 1);
        assert_eq!(byte_width(256), 2);
        assert_eq!(byte_width(65_535), 2);
        assert_eq!(byte_width(65_536), 3);
        assert_eq!(byte_width(u64::MAX), 8);
    }

    #[test]
    fn degenerate_range_returns_min() {
        assert_eq!(uniform_int(7, 7), Ok(7));
        assert_eq!(uniform_int_with(&Broken, -3, -3), Ok(-3));
    }

    #[test]
    fn inverted_range_is_rejected() {
        assert_eq!(uniform_int(5, 1), Err(RangeError::Inverted { min: 5, max: 1 }));
    }

    #[test]
    fn values_stay_in_half_open_range() {
        for (min, max) in [(0, 1), (0, 2), (-10, 10), (1000, 1300), (i64::MIN, i64::MAX)] {
            for _ in 0..200 {
                let v = uniform_int(min, max).unwrap();
                assert!(v >= min && v < max, "{} not in [{}, {})", v, min, max);
            }
        }
    }

    #[test]
    fn unit_range_always_min() {
        for _ in 0..50 {
            assert_eq!(uniform_int(41, 42), Ok(41));
        }
    }

    #[test]
    fn reduction_is_modulo_range() {
        let src = Saturated { last_len: AtomicUsize::new(0) };
        // range 300 needs 2 bytes: 0xFFFF % 300 = 135
        assert_eq!(uniform_int_with(&src, 0, 300), Ok(135));
        assert_eq!(src.last_len.load(Ordering::SeqCst), 2);
        assert_eq!(uniform_int_with(&src, -100, 200), Ok(35));
    }

    #[test]
    fn weak_draws_are_redrawn() {
        let src = Flaky { weak: 3, calls: AtomicUsize::new(0) };
        let bytes: [u8; 4] = random_array(&src).unwrap();
        assert_eq!(bytes, [0xA5; 4]);
        assert_eq!(src.calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn persistent_weakness_is_fatal() {
        let src = Flaky { weak: usize::MAX, calls: AtomicUsize::new(0) };
        let mut buf = [0u8; 16];
        assert_eq!(fill_secure(&src, &mut buf), Err(RandomnessUnavailable));
        assert_eq!(buf, [0u8; 16]);
        assert_eq!(src.calls.load(Ordering::SeqCst), MAX_ENTROPY_ATTEMPTS);
    }

    #[test]
    fn source_failure_propagates() {
        assert_eq!(random_array::<8, _>(&Broken), Err(RandomnessUnavailable));
        assert_eq!(uniform_int_with(&Broken, 0, 10), Err(RangeError::RandomnessUnavailable));
    }
}
