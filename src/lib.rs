//! exif-rename - rename media files so they sort chronologically
//!
//! This library renames photos and videos in place using their embedded
//! capture time, with support for:
//! - EXIF metadata extraction for images
//! - QuickTime/MP4 movie header parsing for videos
//! - Collision-free names with atomic reservation
//! - A backup mirror that is verified and discarded after the batch
//! - Parallel processing with Rayon

pub mod backup;
pub mod cli;
pub mod config;
pub mod error;
pub mod process;
pub mod rename;
pub mod time;

#[cfg(test)]
pub(crate) mod test_support;

pub use backup::BackupDecision;
pub use cli::Cli;
pub use config::{Config, ConfigError, MediaKind};
pub use error::{Error, MediaError, Result};
pub use process::{BackupOutcome, FileResult, ProcessingStatus, Processor, RunReport};
pub use rename::NameResolver;
pub use time::{MediaTimestamp, ResolvedMedia, TimeSource};
