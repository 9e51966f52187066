//! TOML configuration for the consistency policy.
//!
//! ```toml
//! [consistency]
//! default_read = "ONE"
//! default_write = "QUORUM"
//!
//! [consistency.tables.users]
//! read = "LOCAL_QUORUM"
//! write = "ALL"
//! ```

use serde::Deserialize;
use std::{collections::BTreeMap, fs, io, path::Path};
use thiserror::Error as ThisError;
use wideorm_core::consistency::{AccessKind, ConsistencyLevel, ConsistencyPolicy};

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("cannot read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

///
/// MapperConfig
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MapperConfig {
    #[serde(default)]
    pub consistency: ConsistencyConfig,
}

impl MapperConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_toml_str(&source)
    }
}

///
/// ConsistencyConfig
///
/// Global default levels plus per-table entries. Table entries override
/// whatever the entity declarations seeded for the same table.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConsistencyConfig {
    #[serde(default = "ConsistencyConfig::fallback")]
    pub default_read: ConsistencyLevel,

    #[serde(default = "ConsistencyConfig::fallback")]
    pub default_write: ConsistencyLevel,

    #[serde(default)]
    pub tables: BTreeMap<String, TableConsistency>,
}

impl ConsistencyConfig {
    const fn fallback() -> ConsistencyLevel {
        ConsistencyLevel::One
    }

    /// Fresh policy carrying only the configured defaults.
    #[must_use]
    pub const fn policy(&self) -> ConsistencyPolicy {
        ConsistencyPolicy::new(self.default_read, self.default_write)
    }

    /// Overwrite defaults and table entries on an existing policy.
    pub fn apply(&self, policy: &mut ConsistencyPolicy) {
        policy.set_default(AccessKind::Read, self.default_read);
        policy.set_default(AccessKind::Write, self.default_write);

        for (table, levels) in &self.tables {
            if let Some(read) = levels.read {
                policy.set_level(table, AccessKind::Read, read);
            }
            if let Some(write) = levels.write {
                policy.set_level(table, AccessKind::Write, write);
            }
        }
    }
}

impl Default for ConsistencyConfig {
    fn default() -> Self {
        Self {
            default_read: Self::fallback(),
            default_write: Self::fallback(),
            tables: BTreeMap::new(),
        }
    }
}

///
/// TableConsistency
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TableConsistency {
    #[serde(default)]
    pub read: Option<ConsistencyLevel>,

    #[serde(default)]
    pub write: Option<ConsistencyLevel>,
}

///
/// TESTS
///
