//! Configuration
//!
//! Layers, lowest precedence first: built-in defaults, the global file
//! (`$XDG_CONFIG_HOME/sqlfs/config.toml`), an explicit file, then
//! `SQLFS__<SECTION>__<KEY>` environment variables.

pub mod facade;
pub mod merge;
pub mod paths;
pub mod sources;

pub use facade::ConfigLoader;

use crate::logging::LoggingConfig;
use crate::tree::NameCase;
use serde::{Deserialize, Serialize};

/// Store-level options applied when a store is opened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    /// Label written to the info table of new stores
    pub label: String,
    pub name_case: NameCase,
    /// Move a partially initialized store aside instead of refusing to open it
    pub backup_partial_store: bool,
    pub busy_timeout_ms: u64,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            label: "SQLFS".to_string(),
            name_case: NameCase::Sensitive,
            backup_partial_store: true,
            busy_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SqlFsConfig {
    pub store: StoreOptions,
    pub logging: LoggingConfig,
}
