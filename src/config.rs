//! Cipher configuration.
//!
//! Iterations and suite are not recorded in the blob, so the same
//! configuration must be used to seal and to open.

use core::num::NonZeroU32;

use crate::error::ConfigError;
use crate::wire::Suite;

/// PBKDF2 iteration count used when nothing else is configured.
pub const DEFAULT_ITERATIONS: NonZeroU32 = match NonZeroU32::new(1000) {
    Some(n) => n,
    None => unreachable!(),
};

/// Environment variable overriding the iteration count.
pub const ENV_ITERATIONS: &str = "ETM_ITERATIONS";

/// Environment variable selecting the suite (`standard` or `compat`).
pub const ENV_SUITE: &str = "ETM_SUITE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CipherConfig {
    pub iterations: NonZeroU32,
    pub suite: Suite,
}

impl Default for CipherConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            suite: Suite::Standard,
        }
    }
}

impl CipherConfig {
    /// Settings that read and write blobs from the legacy helper.
    pub fn compat() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            suite: Suite::Compat,
        }
    }

    pub fn with_iterations(mut self, iterations: NonZeroU32) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_suite(mut self, suite: Suite) -> Self {
        self.suite = suite;
        self
    }

    /// Defaults overridden by `ETM_ITERATIONS` / `ETM_SUITE` when set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_ITERATIONS) {
            config.iterations = parse_iterations(&raw)?;
        }
        if let Some(raw) = lookup(ENV_SUITE) {
            config.suite = raw.parse()?;
        }

        Ok(config)
    }
}

pub fn parse_iterations(raw: &str) -> Result<NonZeroU32, ConfigError> {
    raw.trim()
        .parse::<NonZeroU32>()
        .map_err(|_| ConfigError::InvalidIterations(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |name| {
            pairs
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn defaults() {
        let c = CipherConfig::default();
        assert_eq!(c.iterations.get(), 1000);
        assert_eq!(c.suite, Suite::Standard);
        assert_eq!(CipherConfig::compat().suite, Suite::Compat);
    }

    #[test]
    fn lookup_overrides() {
        let c = CipherConfig::from_lookup(env(&[(ENV_ITERATIONS, "20000"), (ENV_SUITE, "compat")]))
            .unwrap();
        assert_eq!(c.iterations.get(), 20_000);
        assert_eq!(c.suite, Suite::Compat);
    }

    #[test]
    fn lookup_missing_keeps_defaults() {
        assert_eq!(CipherConfig::from_lookup(env(&[])).unwrap(), CipherConfig::default());
    }

    #[test]
    fn rejects_bad_values() {
        assert_eq!(
            CipherConfig::from_lookup(env(&[(ENV_ITERATIONS, "0")])),
            Err(ConfigError::InvalidIterations("0".into()))
        );
        assert_eq!(
            CipherConfig::from_lookup(env(&[(ENV_SUITE, "gcm")])),
            Err(ConfigError::UnknownSuite("gcm".into()))
        );
    }
}
