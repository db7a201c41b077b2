//! DocumentName: a validated leaf filename for a stored PDF.
//!
//! Names address files inside the blob directory, so they must be plain
//! leaf names: no path separators, no empty stem, and a fixed `.pdf`
//! extension. Validation happens once at the boundary; the rest of the
//! system passes the typed name around.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A validated document filename, always `<stem>.pdf`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentName(String);

/// Errors that can occur when validating a document name.
#[derive(Debug, Error)]
pub enum NameError {
    #[error("document name is empty")]
    Empty,

    #[error("document name must end in .pdf")]
    NotPdf,

    #[error("document name must not contain path separators")]
    PathSeparator,
}

impl DocumentName {
    /// Create from a client-supplied filename (validates format).
    pub fn from_str_checked(s: &str) -> Result<Self, NameError> {
        if s.is_empty() {
            return Err(NameError::Empty);
        }
        if s.contains('/') || s.contains('\\') {
            return Err(NameError::PathSeparator);
        }
        match s.strip_suffix(".pdf") {
            Some(stem) if !stem.is_empty() => Ok(Self(s.to_string())),
            Some(_) => Err(NameError::Empty),
            None => Err(NameError::NotPdf),
        }
    }

    /// Get the full name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for DocumentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DocumentName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_checked(s)
    }
}

impl AsRef<str> for DocumentName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
