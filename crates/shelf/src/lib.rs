//! Storage for Paperdock: document records and the blob directory.
//!
//! Two concerns live here, both free of HTTP knowledge:
//! - **records**: a persistent mapping from an integer id to a document
//!   filename, JSON-backed with an in-memory index.
//! - **blobs**: the on-disk directory holding the uploaded documents
//!   themselves, addressed by validated leaf filenames.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use shelf::{BlobDirectory, DocumentName, FileStore, RecordStore, ShelfConfig};
//!
//! let config = ShelfConfig::with_base_path("/var/lib/paperdock");
//! let blobs = BlobDirectory::new(config.clone()).unwrap();
//! let records = FileStore::new(config.records_path()).unwrap();
//!
//! let name: DocumentName = "report.pdf".parse().unwrap();
//! blobs.store(&name, b"%PDF-1.4 ...").unwrap();
//! let record = records.insert(name).unwrap();
//! println!("stored as id {}", record.id);
//! ```
//!
//! # Configuration
//!
//! Environment variables:
//! - `PAPERDOCK_DATA_PATH`: Base path for storage (default: `~/.paperdock`)
//! - `PAPERDOCK_DATA_READONLY`: Set to "true" for read-only mode

pub mod blobs;
pub mod config;
pub mod name;
pub mod records;

// Re-exports for convenience
pub use blobs::BlobDirectory;
pub use config::ShelfConfig;
pub use name::{DocumentName, NameError};
pub use records::{FileRecord, FileStore, InMemoryStore, RecordStore};
