//! Error types for exif-rename
//!
//! [`Error`] covers batch-level failures that abort a run before any file is
//! renamed. [`MediaError`] covers everything that can go wrong for a single
//! file; those are caught at the task boundary and never abort the batch.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for batch-level operations
pub type Result<T> = std::result::Result<T, Error>;

/// Batch-level error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Backup of {path} failed: {source}")]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Backup directory {0} already exists, refusing to overwrite it")]
    BackupExists(PathBuf),

    #[error("Cannot read root directory {path}: {source}")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Why a single file could not be renamed
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("unreadable container: {0}")]
    UnreadableContainer(String),

    #[error("compressed movie resource (cmov) is not supported")]
    UnsupportedCompressedContainer,

    #[error("reference movie resource (rmra) is not supported")]
    UnsupportedReferenceContainer,

    #[error("movie header atom (mvhd) not found, first child of moov is '{0}'")]
    MovieHeaderNotFound(String),

    #[error("movie header creation time is unset")]
    UnsetCreationTime,

    #[error("could not decode EXIF data: {0}")]
    ExifUnreadable(String),

    #[error("no DateTimeOriginal or DateTime tag in EXIF data")]
    NoUsableTimestampField,

    #[error("malformed {tag} value '{value}'")]
    MalformedTimestampField { tag: String, value: String },

    #[error("no free name for '{stem}' after {limit} attempts")]
    CollisionBoundExceeded { stem: String, limit: u32 },

    #[error("rename to {target} failed: {source}")]
    RenameIo {
        target: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported extension '{0}'")]
    UnsupportedExtension(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    /// Short machine-friendly name of the error kind, used in log fields
    pub fn kind(&self) -> &'static str {
        match self {
            MediaError::UnreadableContainer(_) => "UnreadableContainer",
            MediaError::UnsupportedCompressedContainer => "UnsupportedCompressedContainer",
            MediaError::UnsupportedReferenceContainer => "UnsupportedReferenceContainer",
            MediaError::MovieHeaderNotFound(_) => "MovieHeaderNotFound",
            MediaError::UnsetCreationTime => "UnsetCreationTime",
            MediaError::ExifUnreadable(_) => "ExifUnreadable",
            MediaError::NoUsableTimestampField => "NoUsableTimestampField",
            MediaError::MalformedTimestampField { .. } => "MalformedTimestampField",
            MediaError::CollisionBoundExceeded { .. } => "CollisionBoundExceeded",
            MediaError::RenameIo { .. } => "RenameIOFailure",
            MediaError::UnsupportedExtension(_) => "UnsupportedExtension",
            MediaError::Io(_) => "Io",
        }
    }
}
