//! Process-wide configuration, created once at startup and threaded into the
//! schema builder and every `Db` handle. Immutable after construction.

use crate::store::ConsistencyLevel;
use serde::Deserialize;
use std::{fs, path::Path};
use thiserror::Error as ThisError;

/// Uniqueness checks on time-ordered indexes load the whole index row; past
/// this many entries the check can no longer be trusted and appends fail.
pub const DEFAULT_UNIQUENESS_SCAN_CAP: usize = 20_000_000;

/// Default column count requested by a single-row load.
pub const DEFAULT_SLICE_LIMIT: usize = 10_000;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

///
/// Config
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub cluster: String,
    pub keyspace: String,
    pub read_consistency: ConsistencyLevel,
    pub write_consistency: ConsistencyLevel,
    pub slice_limit: usize,
    pub uniqueness_scan_cap: usize,
    pub serialize_index_appends: bool,
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cluster: "default".to_string(),
            keyspace: "default".to_string(),
            read_consistency: ConsistencyLevel::One,
            write_consistency: ConsistencyLevel::One,
            slice_limit: DEFAULT_SLICE_LIMIT,
            uniqueness_scan_cap: DEFAULT_UNIQUENESS_SCAN_CAP,
            serialize_index_appends: true,
            debug: false,
        }
    }
}

impl Config {
    /// Parse and validate a TOML document; missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;

        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.keyspace.is_empty() {
            return Err(ConfigError::Invalid("keyspace must not be empty".to_string()));
        }
        if self.slice_limit == 0 {
            return Err(ConfigError::Invalid("slice_limit must be positive".to_string()));
        }
        if self.uniqueness_scan_cap == 0 {
            return Err(ConfigError::Invalid(
                "uniqueness_scan_cap must be positive".to_string(),
            ));
        }

        Ok(())
    }

    #[must_use]
    pub fn with_keyspace(mut self, keyspace: impl Into<String>) -> Self {
        self.keyspace = keyspace.into();
        self
    }

    #[must_use]
    pub const fn with_uniqueness_scan_cap(mut self, cap: usize) -> Self {
        self.uniqueness_scan_cap = cap;
        self
    }

    #[must_use]
    pub const fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}
