//! CLI argument parsing with clap

use crate::config::Config;
use clap::Parser;
use std::path::PathBuf;

/// exif-rename - rename photos and videos by capture time
///
/// Renames every photo and video under DIRECTORY in place to its embedded
/// capture time (EXIF for images, movie header for QuickTime/MP4), so file
/// names sort chronologically. A sibling "<DIRECTORY> - Backup Exif" copy is
/// taken first and removed again when the file counts still match.
#[derive(Parser, Debug)]
#[command(name = "exif-rename")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory to process (recursively)
    pub directory: PathBuf,

    /// strftime-style format for new names [default: "%Y-%m-%d %H.%M.%S"]
    pub format: Option<String>,

    /// Path to configuration file (TOML format)
    ///
    /// CLI arguments override config file settings.
    #[arg(short = 'C', long)]
    pub config: Option<PathBuf>,

    /// Number of parallel workers
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,

    /// Highest "-N" suffix tried when a name is taken
    #[arg(long)]
    pub collision_limit: Option<u32>,

    /// Keep the extension's case instead of lower-casing it
    #[arg(long)]
    pub keep_extension_case: bool,

    /// Dry run mode - show what would be renamed without doing it
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Output log format as JSON
    #[arg(long)]
    pub json_log: bool,

    /// Also write the log to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Merge CLI arguments with config from file
    /// CLI arguments take precedence over config file settings
    pub fn merge_with_config(&self, mut config: Config) -> Config {
        config.root = self.directory.clone();

        if let Some(ref format) = self.format {
            config.format = format.clone();
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(limit) = self.collision_limit {
            config.collision_limit = limit;
        }
        if self.keep_extension_case {
            config.lowercase_extension = false;
        }
        if self.dry_run {
            config.dry_run = true;
        }
        if self.verbose {
            config.verbose = true;
        }

        config
    }

    /// Convert CLI arguments to Config (when no config file is used)
    pub fn to_config(&self) -> Config {
        self.merge_with_config(Config::default())
    }
}
