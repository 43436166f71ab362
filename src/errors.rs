//! Error types for the filestack content engine.
//!
//! This module defines the error type shared by every store operation and the
//! coarse [`ErrorKind`] the web layer uses to decide how to respond.

use std::{io, path::PathBuf};

use thiserror::Error;

/// The main error type for filestack.
#[derive(Error, Debug)]
pub enum FsError {
    /// Errors related to file I/O operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Errors related to JSON (de)serialization, mostly of the config file.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Low level XML reader/writer failure.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// A document parsed but its structure or a field value is unusable.
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// No item with this slug in the searched scope.
    #[error("Item not found: {slug}")]
    NotFound { slug: String },

    /// A listing page index past the end of the post stream.
    #[error("No items on page {page}")]
    EmptyPage { page: usize },

    /// The name is already held by a different catalog entry.
    #[error("Name already in use: {name}")]
    NameCollision { name: String },

    /// Catalog entry without content file, or the other way around.
    #[error("Consistency violation: {message}")]
    ConsistencyViolation { message: String },

    /// Page parents loop back onto themselves.
    #[error("Menu cycle detected at page id {id}")]
    MenuCycle { id: String },

    /// Every slug candidate for a new item already had a content file.
    #[error("Could not find a free slug after {attempts} attempts")]
    SlugExhausted { attempts: usize },

    /// Errors related to configuration.
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Directory creation or access failed.
    #[error("Failed to create or access directory: {path}")]
    DirectoryError { path: PathBuf },

    /// for mutex lock acquisition issues
    #[error("{message}")]
    LockAcquisitionFailed { message: String },
}

/// Coarse error classification handed to the caller layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    NameCollision,
    ConsistencyViolation,
    Parse,
    Io,
    Structure,
    Config,
}

impl FsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FsError::NotFound { .. } | FsError::EmptyPage { .. } => ErrorKind::NotFound,
            FsError::NameCollision { .. } => ErrorKind::NameCollision,
            FsError::ConsistencyViolation { .. } => ErrorKind::ConsistencyViolation,
            FsError::Parse { .. } | FsError::Xml(_) => ErrorKind::Parse,
            FsError::Io(_) | FsError::DirectoryError { .. } | FsError::LockAcquisitionFailed { .. } => {
                ErrorKind::Io
            }
            FsError::MenuCycle { .. } | FsError::SlugExhausted { .. } => ErrorKind::Structure,
            FsError::Serialization(_) | FsError::ConfigError { .. } => ErrorKind::Config,
        }
    }

    pub(crate) fn parse(message: impl Into<String>) -> Self {
        FsError::Parse {
            message: message.into(),
        }
    }
}
