//! Shelf configuration with environment variable and file-based loading.
//!
//! Environment variables:
//! - `PAPERDOCK_DATA_PATH`: Base path for storage
//! - `PAPERDOCK_DATA_READONLY`: Set to "true" for read-only mode
//!
//! Default path: `~/.paperdock`

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Configuration for document storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShelfConfig {
    /// Base path for storage.
    /// Documents live in `{base_path}/documents/`, records in
    /// `{base_path}/records.json`.
    pub base_path: PathBuf,

    /// Read-only mode - prevents any writes to the blob directory.
    #[serde(default)]
    pub read_only: bool,
}

impl Default for ShelfConfig {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
            read_only: false,
        }
    }
}

/// Get the default storage path (~/.paperdock).
fn default_base_path() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".paperdock"))
        .unwrap_or_else(|| PathBuf::from(".paperdock"))
}

impl ShelfConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let base_path = env::var("PAPERDOCK_DATA_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_base_path());

        let read_only = env::var("PAPERDOCK_DATA_READONLY")
            .map(|v| v.to_lowercase() == "true" || v == "1")
            .unwrap_or(false);

        Ok(Self {
            base_path,
            read_only,
        })
    }

    /// Load configuration from a TOML file, falling back to environment.
    ///
    /// The file should contain a `[shelf]` section:
    /// ```toml
    /// [shelf]
    /// base_path = "/var/lib/paperdock"
    /// read_only = false
    /// ```
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        let table: toml::Table = contents
            .parse()
            .with_context(|| format!("failed to parse TOML: {}", path.display()))?;

        if let Some(shelf_section) = table.get("shelf") {
            let config: ShelfConfig = shelf_section
                .clone()
                .try_into()
                .context("failed to parse [shelf] section")?;
            Ok(config)
        } else {
            // No [shelf] section, fall back to env
            Self::from_env()
        }
    }

    /// Create a config with a specific base path.
    pub fn with_base_path(path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: path.into(),
            read_only: false,
        }
    }

    /// Create a read-only config with a specific base path.
    pub fn read_only(path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: path.into(),
            read_only: true,
        }
    }

    /// Get the documents directory path.
    pub fn documents_dir(&self) -> PathBuf {
        self.base_path.join("documents")
    }

    /// Get the record store file path.
    pub fn records_path(&self) -> PathBuf {
        self.base_path.join("records.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ShelfConfig::default();
        assert!(config.base_path.to_string_lossy().contains(".paperdock"));
        assert!(!config.read_only);
    }

    #[test]
    fn test_with_base_path() {
        let config = ShelfConfig::with_base_path("/custom/path");
        assert_eq!(config.base_path, PathBuf::from("/custom/path"));
        assert!(!config.read_only);
    }

    #[test]
    fn test_read_only_config() {
        let config = ShelfConfig::read_only("/srv/paperdock");
        assert_eq!(config.base_path, PathBuf::from("/srv/paperdock"));
        assert!(config.read_only);
    }

    #[test]
    fn test_derived_paths() {
        let config = ShelfConfig::with_base_path("/test/shelf");
        assert_eq!(
            config.documents_dir(),
            PathBuf::from("/test/shelf/documents")
        );
        assert_eq!(
            config.records_path(),
            PathBuf::from("/test/shelf/records.json")
        );
    }

    #[test]
    fn test_from_file_with_section() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("paperdock.toml");
        std::fs::write(
            &path,
            "[shelf]\nbase_path = \"/tank/paperdock\"\nread_only = true\n",
        )
        .unwrap();

        let config = ShelfConfig::from_file(&path).unwrap();
        assert_eq!(config.base_path, PathBuf::from("/tank/paperdock"));
        assert!(config.read_only);
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = ShelfConfig {
            base_path: PathBuf::from("/custom/shelf"),
            read_only: true,
        };
        let json = serde_json::to_string(&config).unwrap();
        let restored: ShelfConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config.base_path, restored.base_path);
        assert_eq!(config.read_only, restored.read_only);
    }

    #[test]
    fn test_from_env_uses_defaults() {
        env::remove_var("PAPERDOCK_DATA_PATH");
        env::remove_var("PAPERDOCK_DATA_READONLY");

        let config = ShelfConfig::from_env().unwrap();
        assert!(config.base_path.to_string_lossy().contains(".paperdock"));
        assert!(!config.read_only);
    }
}
