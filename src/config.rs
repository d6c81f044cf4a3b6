//! The TOML configuration file. Every field is optional:
//!
//! ```toml
//! [solver]
//! max_length = 20
//! target_length = 19
//! time_budget_ms = 5000
//! node_budget = 100000000
//! threads = 4
//!
//! [tables]
//! cache_dir = "/var/cache/twophase"
//! no_cache = false
//! ```

use crate::{pruning::PruningTables, solver::SolverConfig};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub solver: SolverConfig,
    pub tables: TableConfig,
}

/// Where pruning tables are cached between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TableConfig {
    /// Defaults to a `twophase-tables` folder in the user's cache directory.
    pub cache_dir: Option<PathBuf>,
    /// Always generate the tables and never touch the disk.
    pub no_cache: bool,
}

impl Config {
    /// Read a configuration file.
    ///
    /// # Errors
    ///
    /// If the file cannot be read or is not a valid configuration.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }
}

impl TableConfig {
    /// The directory tables are cached in, or `None` if caching is off or
    /// there is no cache directory on this platform.
    #[must_use]
    pub fn cache_dir(&self) -> Option<PathBuf> {
        if self.no_cache {
            return None;
        }
        self.cache_dir.clone().or_else(PruningTables::default_cache_dir)
    }

    /// Load the tables from the cache directory, generating and saving them
    /// if needed.
    #[must_use]
    pub fn load_tables(&self) -> PruningTables {
        match self.cache_dir() {
            Some(dir) => PruningTables::load_or_generate(&dir),
            None => PruningTables::generate(),
        }
    }
}
