//! Error types for persistence operations.
//!
//! Only fatal conditions are errors: a document that is not JSON, a root
//! that is not an object, a schema newer than this build, and file I/O.
//! Missing or malformed fields inside a document are logged and replaced
//! with defaults by the codec.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or writing persisted state.
#[derive(Debug, Error)]
pub enum StateError {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a file
    #[error("failed to write file '{path}': {source}")]
    WriteFile {
        /// Path of the file that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to create directory
    #[error("failed to create directory '{path}': {source}")]
    CreateDir {
        /// Path of the directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Document is not valid JSON
    #[error("invalid JSON document: {0}")]
    Json(#[from] serde_json::Error),

    /// Failed to parse TOML
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to serialize TOML
    #[error("failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// A document or section that must be a JSON object is not one
    #[error("expected '{0}' to be an object")]
    NotAnObject(String),

    /// Document was written by a newer schema
    #[error("unsupported schema version {found} (newest supported is {supported})")]
    UnsupportedVersion {
        /// Version found in the document.
        found: u64,
        /// Newest version this build reads.
        supported: u32,
    },

    /// Host configuration values are out of range
    #[error("invalid host config: {0}")]
    InvalidConfig(String),
}

impl StateError {
    /// Create a read file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StateError::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Create a write file error.
    pub fn write_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StateError::WriteFile {
            path: path.into(),
            source,
        }
    }

    /// Create a create directory error.
    pub fn create_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StateError::CreateDir {
            path: path.into(),
            source,
        }
    }

    /// Create a not-an-object error for the named section.
    pub fn not_an_object(section: impl Into<String>) -> Self {
        StateError::NotAnObject(section.into())
    }
}
