//! Configuration for a rename batch
//!
//! One immutable [`Config`] value is built at startup (defaults, then an
//! optional TOML file, then CLI overrides) and handed to every component.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default timestamp format, renders as `2024-01-15 14.30.00`
pub const DEFAULT_FORMAT: &str = "%Y-%m-%d %H.%M.%S";

/// Suffix appended to the root's name to form the backup directory
pub const DEFAULT_BACKUP_SUFFIX: &str = " - Backup Exif";

/// Default size of the worker pool
pub const DEFAULT_WORKERS: usize = 100;

/// Highest `-N` suffix tried before giving up on a name
pub const DEFAULT_COLLISION_LIMIT: u32 = 1_000_000;

/// Which metadata branch a file goes through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// EXIF-bearing still image
    Picture,
    /// QuickTime/MP4 container
    Movie,
}

/// Configuration for exif-rename
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory whose media files are renamed in place
    pub root: PathBuf,

    /// strftime-style pattern for the new file stem
    pub format: String,

    /// Number of worker threads
    pub workers: usize,

    /// Highest collision suffix to try
    pub collision_limit: u32,

    /// Picture extensions (case-insensitive, without dot)
    pub picture_extensions: Vec<String>,

    /// Movie extensions (case-insensitive, without dot)
    pub movie_extensions: Vec<String>,

    /// Suffix for the sibling backup directory
    pub backup_suffix: String,

    /// Write the extension in lower case in the new name
    pub lowercase_extension: bool,

    /// Compute names only; no backup, no renames
    pub dry_run: bool,

    /// Verbose output
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::new(),
            format: DEFAULT_FORMAT.to_string(),
            workers: DEFAULT_WORKERS,
            collision_limit: DEFAULT_COLLISION_LIMIT,
            picture_extensions: [
                "JPG", "TIF", "BMP", "PNG", "JPEG", "GIF", "CR2", "ARW", "HEIC", "NEF",
            ]
            .iter()
            .map(|e| e.to_string())
            .collect(),
            movie_extensions: vec!["MOV".into(), "MP4".into()],
            backup_suffix: DEFAULT_BACKUP_SUFFIX.to_string(),
            lowercase_extension: true,
            dry_run: false,
            verbose: false,
        }
    }
}

impl Config {
    /// Create a default configuration for the given root
    pub fn for_root<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Check if an extension belongs to the picture set
    pub fn is_picture(&self, ext: &str) -> bool {
        self.picture_extensions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(ext))
    }

    /// Check if an extension belongs to the movie set
    pub fn is_movie(&self, ext: &str) -> bool {
        self.movie_extensions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(ext))
    }

    /// Check if an extension is in the combined picture/movie set
    pub fn is_supported(&self, ext: &str) -> bool {
        self.is_picture(ext) || self.is_movie(ext)
    }

    /// Classify an extension; movies win if a user lists one in both sets
    pub fn media_kind(&self, ext: &str) -> Option<MediaKind> {
        if self.is_movie(ext) {
            Some(MediaKind::Movie)
        } else if self.is_picture(ext) {
            Some(MediaKind::Picture)
        } else {
            None
        }
    }

    /// Check if a path has a supported extension
    pub fn is_supported_path(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.is_supported(ext))
    }

    /// Validate settings that cannot be checked by the type system
    pub fn validate(&self) -> Result<(), Error> {
        crate::time::filename::TimestampFormat::parse(&self.format)?;

        if self.workers == 0 {
            return Err(Error::InvalidInput("workers must be at least 1".into()));
        }
        if self.collision_limit == 0 {
            return Err(Error::InvalidInput(
                "collision_limit must be at least 1".into(),
            ));
        }
        if self.backup_suffix.is_empty() || self.backup_suffix.contains(std::path::is_separator) {
            return Err(Error::InvalidInput(format!(
                "backup suffix '{}' must be non-empty and contain no path separator",
                self.backup_suffix
            )));
        }
        if self.picture_extensions.is_empty() && self.movie_extensions.is_empty() {
            return Err(Error::InvalidInput("no media extensions configured".into()));
        }

        Ok(())
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(config)
    }
}

/// Errors that can occur when loading configuration
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read configuration file
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse configuration file
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError { path, source } => {
                write!(f, "Failed to read config file '{}': {}", path.display(), source)
            }
            ConfigError::ParseError { path, source } => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ReadError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
        }
    }
}
