//! Collision-free target names
//!
//! A target name is `<rendered timestamp>[-N].<ext>`. Real runs claim the
//! name by creating an empty placeholder with `create_new`, which fails if
//! anything else (another worker, another process) got there first. The
//! rename then atomically replaces the placeholder, so no existing file is
//! ever overwritten.

use crate::config::Config;
use crate::error::{Error, MediaError};
use crate::time::MediaTimestamp;
use crate::time::filename::TimestampFormat;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Computes and claims target names
#[derive(Debug, Clone)]
pub struct NameResolver {
    format: TimestampFormat,
    collision_limit: u32,
    lowercase_extension: bool,
}

impl NameResolver {
    pub fn new(config: &Config) -> Result<Self, Error> {
        Ok(Self {
            format: TimestampFormat::parse(&config.format)?,
            collision_limit: config.collision_limit,
            lowercase_extension: config.lowercase_extension,
        })
    }

    /// The format used for stems
    pub fn format(&self) -> &TimestampFormat {
        &self.format
    }

    /// Render the stem for a timestamp
    pub fn render(&self, timestamp: &MediaTimestamp) -> String {
        self.format.render(timestamp)
    }

    /// File name for a stem, optional collision index and extension
    pub fn file_name(&self, stem: &str, index: Option<u32>, extension: &str) -> String {
        let extension = if self.lowercase_extension {
            extension.to_lowercase()
        } else {
            extension.to_string()
        };

        let mut name = match index {
            Some(n) => format!("{stem}-{n}"),
            None => stem.to_string(),
        };
        if !extension.is_empty() {
            name.push('.');
            name.push_str(&extension);
        }
        name
    }

    /// Candidate paths in probe order: bare name, then `-1` up to the limit
    fn candidates<'a>(
        &'a self,
        stem: &'a str,
        directory: &'a Path,
        extension: &'a str,
    ) -> impl Iterator<Item = PathBuf> + 'a {
        std::iter::once(None)
            .chain((1..=self.collision_limit).map(Some))
            .map(move |index| directory.join(self.file_name(stem, index, extension)))
    }

    /// First free target path, by existence check only
    ///
    /// Nothing is claimed; used for dry runs.
    pub fn resolve(
        &self,
        timestamp: &MediaTimestamp,
        directory: &Path,
        extension: &str,
    ) -> Result<PathBuf, MediaError> {
        let stem = self.render(timestamp);
        self.candidates(&stem, directory, extension)
            .find(|candidate| !candidate.exists())
            .ok_or_else(|| self.exhausted(&stem))
    }

    /// Claim the first free target path with an exclusive placeholder
    pub fn reserve(
        &self,
        timestamp: &MediaTimestamp,
        directory: &Path,
        extension: &str,
    ) -> Result<Reservation, MediaError> {
        let stem = self.render(timestamp);

        for candidate in self.candidates(&stem, directory, extension) {
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&candidate)
            {
                Ok(_) => {
                    debug!(path = ?candidate, "Reserved target name");
                    return Ok(Reservation {
                        path: candidate,
                        armed: true,
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(MediaError::RenameIo {
                        target: candidate,
                        source: e,
                    });
                }
            }
        }

        Err(self.exhausted(&stem))
    }

    fn exhausted(&self, stem: &str) -> MediaError {
        MediaError::CollisionBoundExceeded {
            stem: stem.to_string(),
            limit: self.collision_limit,
        }
    }
}

/// A claimed target name backed by an empty placeholder file
///
/// Dropping an uncommitted reservation removes the placeholder.
#[derive(Debug)]
pub struct Reservation {
    path: PathBuf,
    armed: bool,
}

impl Reservation {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Move `source` onto the reserved name
    pub fn commit(mut self, source: &Path) -> Result<PathBuf, MediaError> {
        fs::rename(source, &self.path).map_err(|e| MediaError::RenameIo {
            target: self.path.clone(),
            source: e,
        })?;
        self.armed = false;
        Ok(std::mem::take(&mut self.path))
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if self.armed
            && let Err(e) = fs::remove_file(&self.path)
        {
            warn!(path = ?self.path, error = %e, "Failed to remove name placeholder");
        }
    }
}
