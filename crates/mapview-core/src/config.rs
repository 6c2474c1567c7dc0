//! Cache configuration, loadable from TOML.
//!
//! ```toml
//! [plans]
//! capacity = 1000
//!
//! [templates]
//! fill_policy = "last_writer_wins"
//! ```

use crate::cache::FillPolicy;
use serde::Deserialize;
use std::num::NonZeroUsize;
use thiserror::Error as ThisError;

///
/// ConfigError
///

#[remain::sorted]
#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("invalid cache config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("store '{store}' has a zero capacity")]
    ZeroCapacity { store: &'static str },
}

///
/// CacheConfig
///
/// One section per store. Every store defaults to first-writer-wins and an
/// unbounded size.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    pub plans: StoreConfig,
    pub templates: StoreConfig,
    pub shapers: StoreConfig,
    pub views: StoreConfig,
}

impl CacheConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (store, section) in [
            ("plans", &self.plans),
            ("templates", &self.templates),
            ("shapers", &self.shapers),
            ("views", &self.views),
        ] {
            if section.capacity == Some(0) {
                return Err(ConfigError::ZeroCapacity { store });
            }
        }

        Ok(())
    }
}

///
/// StoreConfig
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub capacity: Option<usize>,
    pub fill_policy: FillPolicy,
}

impl StoreConfig {
    #[must_use]
    pub const fn bounded(capacity: usize, fill_policy: FillPolicy) -> Self {
        Self {
            capacity: Some(capacity),
            fill_policy,
        }
    }

    /// Effective capacity; zero is treated as unbounded.
    #[must_use]
    pub fn capacity(&self) -> Option<NonZeroUsize> {
        self.capacity.and_then(NonZeroUsize::new)
    }
}

///
/// TESTS
///
