//! Error types for the Hearth core library.
//!
//! Absence (no relationship between two agents, no such faction) is an
//! expected steady state and is modelled with `Option` or typed outcomes,
//! never with an error variant.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for all Hearth operations.
#[derive(Error, Debug)]
pub enum HearthError {
    /// A caller-supplied argument or a persisted file failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Reading or writing durable storage failed.
    #[error("Storage error at {path}: {source}")]
    Storage {
        /// File that was being read or written.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// A named entity already exists.
    #[error("Duplicate {kind}: {name}")]
    Duplicate {
        /// What kind of entity collided (e.g. "faction").
        kind: &'static str,
        /// The colliding name.
        name: String,
    },

    /// Encoding state for persistence failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl HearthError {
    /// Wrap an I/O error with the path it concerned.
    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, HearthError>;
