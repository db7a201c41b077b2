//! BlobDirectory: the filesystem area holding uploaded documents.
//!
//! Documents are stored flat under `{base_path}/documents/` by their
//! validated leaf name. The directory is the sole writer; the streaming
//! path only ever asks for a path and reads. A record pointing at a name
//! that is no longer here is surfaced as absence, never a panic.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::config::ShelfConfig;
use crate::name::DocumentName;

/// Filesystem-backed document storage.
#[derive(Debug, Clone)]
pub struct BlobDirectory {
    config: ShelfConfig,
}

impl BlobDirectory {
    /// Create a new BlobDirectory with the given configuration.
    ///
    /// Creates the documents directory if it doesn't exist (unless in
    /// read-only mode).
    pub fn new(config: ShelfConfig) -> Result<Self> {
        if !config.read_only {
            fs::create_dir_all(config.documents_dir())
                .context("failed to create documents directory")?;
        }

        Ok(Self { config })
    }

    /// Create a BlobDirectory at a specific base path.
    pub fn at_path(path: impl Into<PathBuf>) -> Result<Self> {
        Self::new(ShelfConfig::with_base_path(path))
    }

    /// Get the configuration.
    pub fn config(&self) -> &ShelfConfig {
        &self.config
    }

    /// Get the path where a document would be stored.
    fn document_path(&self, name: &DocumentName) -> PathBuf {
        self.config.documents_dir().join(name.as_str())
    }

    /// Write a document, replacing any existing content under the same name.
    pub fn store(&self, name: &DocumentName, data: &[u8]) -> Result<()> {
        if self.config.read_only {
            anyhow::bail!("blob directory is in read-only mode");
        }

        let path = self.document_path(name);
        fs::write(&path, data)
            .with_context(|| format!("failed to write document {}", name))?;
        Ok(())
    }

    /// Get the filesystem path for a document, if it exists.
    pub fn path(&self, name: &DocumentName) -> Option<PathBuf> {
        let path = self.document_path(name);
        if path.exists() {
            Some(path)
        } else {
            None
        }
    }

    /// Get a document's size in bytes.
    ///
    /// Returns `Ok(None)` if the document doesn't exist.
    pub fn size(&self, name: &DocumentName) -> Result<Option<u64>> {
        let path = self.document_path(name);
        match fs::metadata(&path) {
            Ok(meta) => Ok(Some(meta.len())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("failed to stat document {}", name)),
        }
    }

    /// Check if a document exists without touching it.
    pub fn exists(&self, name: &DocumentName) -> bool {
        self.document_path(name).exists()
    }

    /// Remove a document. Returns whether anything was deleted.
    pub fn remove(&self, name: &DocumentName) -> Result<bool> {
        if self.config.read_only {
            anyhow::bail!("blob directory is in read-only mode");
        }

        let path = self.document_path(name);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("failed to remove document {}", name)),
        }
    }
}
