//! Document records: integer id to filename, with JSON persistence.
//!
//! Ids are allocated on insert (max existing + 1, starting at 1), the same
//! scheme a rowid-backed table gives. Single writer at a time is assumed;
//! the locking here only keeps concurrent readers safe.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::name::DocumentName;

/// A stored document record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileRecord {
    /// Unique identifier, generated on creation
    pub id: u64,

    /// Leaf filename inside the blob directory
    pub filename: DocumentName,

    /// When this was uploaded
    pub created_at: DateTime<Utc>,
}

/// Trait for record storage backends
pub trait RecordStore: Send + Sync {
    /// Get record by id
    fn get(&self, id: u64) -> Result<Option<FileRecord>>;

    /// Create a record for a filename, allocating the next id
    fn insert(&self, filename: DocumentName) -> Result<FileRecord>;

    /// Delete a record by id
    fn delete(&self, id: u64) -> Result<bool>;

    /// Get all records (callers sort as needed)
    fn all(&self) -> Result<Vec<FileRecord>>;

    /// Get count of records
    fn count(&self) -> Result<usize> {
        Ok(self.all()?.len())
    }

    /// Check if a record exists
    fn exists(&self, id: u64) -> Result<bool> {
        Ok(self.get(id)?.is_some())
    }

    /// Persist to storage (if applicable)
    fn flush(&self) -> Result<()> {
        Ok(()) // No-op for in-memory stores
    }
}

/// In-memory record store (HashMap-backed)
#[derive(Debug)]
pub struct InMemoryStore {
    records: RwLock<HashMap<u64, FileRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_records(records: Vec<FileRecord>) -> Self {
        let map = records.into_iter().map(|r| (r.id, r)).collect();
        Self {
            records: RwLock::new(map),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore for InMemoryStore {
    fn get(&self, id: u64) -> Result<Option<FileRecord>> {
        let records = self.records.read().unwrap();
        Ok(records.get(&id).cloned())
    }

    fn insert(&self, filename: DocumentName) -> Result<FileRecord> {
        let mut records = self.records.write().unwrap();
        let id = records.keys().max().copied().unwrap_or(0) + 1;
        let record = FileRecord {
            id,
            filename,
            created_at: Utc::now(),
        };
        records.insert(id, record.clone());
        Ok(record)
    }

    fn delete(&self, id: u64) -> Result<bool> {
        let mut records = self.records.write().unwrap();
        Ok(records.remove(&id).is_some())
    }

    fn all(&self) -> Result<Vec<FileRecord>> {
        let records = self.records.read().unwrap();
        Ok(records.values().cloned().collect())
    }

    fn count(&self) -> Result<usize> {
        let records = self.records.read().unwrap();
        Ok(records.len())
    }

    fn exists(&self, id: u64) -> Result<bool> {
        let records = self.records.read().unwrap();
        Ok(records.contains_key(&id))
    }
}

/// File-backed record store (JSON + InMemoryStore)
pub struct FileStore {
    path: PathBuf,
    store: InMemoryStore,
}

impl FileStore {
    /// Create/load from file
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let records = if path.exists() {
            let json = std::fs::read_to_string(&path)?;
            serde_json::from_str::<Vec<FileRecord>>(&json)?
        } else {
            Vec::new()
        };

        Ok(Self {
            path,
            store: InMemoryStore::from_records(records),
        })
    }

    /// Save to disk
    pub fn save(&self) -> Result<()> {
        let records = self.store.all()?;
        let json = serde_json::to_string_pretty(&records)?;

        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Atomic write: write to temp, then rename
        let temp_path = self.path.with_extension("tmp");
        std::fs::write(&temp_path, json)?;
        std::fs::rename(&temp_path, &self.path)?;

        Ok(())
    }
}

impl RecordStore for FileStore {
    fn get(&self, id: u64) -> Result<Option<FileRecord>> {
        self.store.get(id)
    }

    fn insert(&self, filename: DocumentName) -> Result<FileRecord> {
        self.store.insert(filename)
    }

    fn delete(&self, id: u64) -> Result<bool> {
        self.store.delete(id)
    }

    fn all(&self) -> Result<Vec<FileRecord>> {
        self.store.all()
    }

    fn count(&self) -> Result<usize> {
        self.store.count()
    }

    fn exists(&self, id: u64) -> Result<bool> {
        self.store.exists(id)
    }

    fn flush(&self) -> Result<()> {
        self.save()
    }
}
