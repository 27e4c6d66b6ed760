//! Time extraction module
//!
//! This module resolves the capture time of a media file from:
//! - EXIF metadata in images (`DateTimeOriginal`, then `DateTime`)
//! - The movie header atom of QuickTime/MP4 containers
//!
//! Filesystem timestamps are never used.

pub mod exif;
pub mod filename;
pub mod video;

use crate::config::{Config, MediaKind};
use crate::error::MediaError;
use chrono::{DateTime, Local};
use std::path::Path;
use tracing::debug;

/// Capture time of a media file, in the process's local zone
pub type MediaTimestamp = DateTime<Local>;

/// Source of the extracted timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSource {
    /// Extracted from EXIF metadata
    Exif,
    /// Extracted from the QuickTime movie header
    MovieHeader,
}

/// Result of metadata resolution
#[derive(Debug, Clone)]
pub struct ResolvedMedia {
    /// The extracted timestamp
    pub timestamp: MediaTimestamp,
    /// The file's extension as found on disk, without the dot
    pub extension: String,
    /// Source of the timestamp
    pub source: TimeSource,
}

/// Resolve the capture time and extension of a media file
pub fn resolve(path: &Path, config: &Config) -> Result<ResolvedMedia, MediaError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_string();

    let (timestamp, source) = match config.media_kind(&extension) {
        Some(MediaKind::Movie) => (video::extract_video_time(path)?, TimeSource::MovieHeader),
        Some(MediaKind::Picture) => (exif::extract_exif_time(path)?, TimeSource::Exif),
        None => return Err(MediaError::UnsupportedExtension(extension)),
    };

    debug!(?path, ?source, %timestamp, "Resolved capture time");

    Ok(ResolvedMedia {
        timestamp,
        extension,
        source,
    })
}
