// ── Runtime connection configuration ──
//
// Describes *where* the hosted backend lives. The consumer constructs a
// `ClientConfig` directly or loads it from the environment; core never
// reads config files.

use figment::{Figment, providers::Env};
use serde::Deserialize;
use url::Url;

use crate::error::CoreError;

/// Environment variable prefix for [`ClientConfig::from_env`].
pub const ENV_PREFIX: &str = "TETHER_";

/// Configuration for connecting to a single backend.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Backend base URL (e.g., `https://pb.example.com`).
    pub url: Url,
}

impl ClientConfig {
    pub fn new(url: Url) -> Self {
        Self { url }
    }

    /// Load configuration from the environment.
    ///
    /// Reads `TETHER_URL` through figment's `Env` provider. A missing or
    /// unparseable URL is a hard configuration failure.
    pub fn from_env() -> Result<Self, CoreError> {
        Figment::new()
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()
            .map_err(|e| CoreError::Config {
                message: e.to_string(),
            })
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // One test, three Jail blocks: `set_env` mutates process state, so
    // the scenarios must not run on parallel test threads.
    #[test]
    fn from_env_scenarios() {
        // Missing URL is a hard configuration failure.
        figment::Jail::expect_with(|_jail| {
            let result = ClientConfig::from_env();
            assert!(matches!(result, Err(CoreError::Config { .. })));
            Ok(())
        });

        // A well-formed URL loads.
        figment::Jail::expect_with(|jail| {
            jail.set_env("TETHER_URL", "https://backend.example.com");

            let config = ClientConfig::from_env().unwrap();
            assert_eq!(config.url.as_str(), "https://backend.example.com/");
            Ok(())
        });

        // An unparseable URL is also a configuration failure.
        figment::Jail::expect_with(|jail| {
            jail.set_env("TETHER_URL", "not a url");

            let result = ClientConfig::from_env();
            assert!(matches!(result, Err(CoreError::Config { .. })));
            Ok(())
        });
    }
}
