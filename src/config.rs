// src/config.rs
//
// Store configuration
//
// Resolution order: defaults -> optional JSON file -> environment overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

pub const ENV_DB_PATH: &str = "DATAREPO_DB_PATH";
pub const ENV_POOL_SIZE: &str = "DATAREPO_POOL_SIZE";
pub const ENV_BUSY_TIMEOUT_MS: &str = "DATAREPO_BUSY_TIMEOUT_MS";

/// Connection and pool settings for the SQLite store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Database file location
    pub database_path: PathBuf,

    /// Maximum pooled connections
    pub max_connections: u32,

    /// SQLite busy timeout before a statement gives up on a lock
    pub busy_timeout_ms: u64,

    /// How long a pool checkout may wait
    pub connection_timeout_ms: u64,

    /// Enable write-ahead logging
    pub wal: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let database_path = dirs::data_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("datarepo")
            .join("datarepo.db");

        Self {
            database_path,
            max_connections: 8,
            busy_timeout_ms: 5000,
            connection_timeout_ms: 30_000,
            wal: true,
        }
    }
}

impl StoreConfig {
    /// Config pointing at an explicit database file, other settings default
    pub fn at_path(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            ..Self::default()
        }
    }

    /// Load from a JSON file; missing keys fall back to defaults
    pub fn from_json_file(path: &Path) -> AppResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: StoreConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `DATAREPO_*` environment overrides
    pub fn with_env_overrides(self) -> AppResult<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides<F>(mut self, lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_DB_PATH) {
            self.database_path = PathBuf::from(path);
        }
        if let Some(size) = lookup(ENV_POOL_SIZE) {
            self.max_connections = size
                .parse()
                .map_err(|_| AppError::Config(format!("{} must be an integer, got '{}'", ENV_POOL_SIZE, size)))?;
        }
        if let Some(timeout) = lookup(ENV_BUSY_TIMEOUT_MS) {
            self.busy_timeout_ms = timeout.parse().map_err(|_| {
                AppError::Config(format!("{} must be an integer, got '{}'", ENV_BUSY_TIMEOUT_MS, timeout))
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.max_connections == 0 {
            return Err(AppError::Config("max_connections must be at least 1".to_string()));
        }
        if self.database_path.as_os_str().is_empty() {
            return Err(AppError::Config("database_path cannot be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_path_layout() {
        let config = StoreConfig::default();
        assert!(config.database_path.ends_with("datarepo/datarepo.db"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_json_file_fills_missing_keys_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "database_path": "/tmp/custom.db", "max_connections": 2 }}"#).unwrap();

        let config = StoreConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/custom.db"));
        assert_eq!(config.max_connections, 2);
        assert_eq!(config.busy_timeout_ms, 5000);
    }

    #[test]
    fn test_overrides_apply_and_validate() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_DB_PATH, "/tmp/env.db"),
            (ENV_POOL_SIZE, "3"),
        ]);
        let config = StoreConfig::default()
            .with_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/tmp/env.db"));
        assert_eq!(config.max_connections, 3);
    }

    #[test]
    fn test_bad_override_is_config_error() {
        let result = StoreConfig::default().with_overrides(|key| {
            (key == ENV_POOL_SIZE).then(|| "many".to_string())
        });
        assert!(matches!(result, Err(AppError::Config(_))));

        let zero = StoreConfig::default().with_overrides(|key| {
            (key == ENV_POOL_SIZE).then(|| "0".to_string())
        });
        assert!(matches!(zero, Err(AppError::Config(_))));
    }
}
