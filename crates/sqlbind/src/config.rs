//! Database configuration

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Options for opening a [`crate::Database`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database file; `None` opens a private in-memory database
    pub path: Option<PathBuf>,
    /// Open the file read-only
    pub read_only: bool,
    /// How long to wait on a locked database before failing
    pub busy_timeout_ms: u64,
    /// Enforce foreign key constraints
    pub foreign_keys: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            read_only: false,
            busy_timeout_ms: 5000,
            foreign_keys: true,
        }
    }
}

impl DatabaseConfig {
    /// In-memory database with default options
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// File-backed database with default options
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
            ..Self::default()
        }
    }

    /// Parse from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))
    }

    /// Reject option combinations the engine cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.read_only && self.path.is_none() {
            return Err(Error::Config(
                "read_only requires a database path".to_string(),
            ));
        }
        Ok(())
    }
}
