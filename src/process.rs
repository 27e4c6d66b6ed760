//! Batch processor with a bounded Rayon worker pool
//!
//! Handles the core logic of:
//! - Backing up the root directory
//! - Scanning for media files and skipping already-named ones
//! - Extracting timestamps and renaming files in parallel
//! - Verifying the backup afterwards

use crate::backup::{self, BackupDecision};
use crate::config::Config;
use crate::error::{Error, MediaError, Result};
use crate::rename::NameResolver;
use crate::time::{self, MediaTimestamp, TimeSource};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{Level, debug, error, info, span, warn};
use walkdir::WalkDir;

/// Result of processing a single file
#[derive(Debug, Clone)]
pub struct FileResult {
    /// Source file path
    pub source: PathBuf,
    /// New path (renamed, or would be renamed in a dry run)
    pub destination: Option<PathBuf>,
    /// Extracted capture time
    pub timestamp: Option<MediaTimestamp>,
    /// Where the capture time came from
    pub time_source: Option<TimeSource>,
    /// Processing status
    pub status: ProcessingStatus,
    /// Error kind and message (if failed)
    pub error: Option<FileError>,
}

/// A per-file failure, flattened for reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileError {
    pub kind: &'static str,
    pub message: String,
}

impl From<&MediaError> for FileError {
    fn from(e: &MediaError) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

/// Status of file processing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStatus {
    /// File was renamed
    Renamed,
    /// File name already in the desired format
    Skipped,
    /// Processing failed, file left untouched
    Failed,
    /// Dry run - would have been renamed
    DryRun,
    /// Not started because the run was interrupted
    Cancelled,
}

impl FileResult {
    fn new(source: &Path, status: ProcessingStatus) -> Self {
        Self {
            source: source.to_path_buf(),
            destination: None,
            timestamp: None,
            time_source: None,
            status,
            error: None,
        }
    }
}

/// What happened to the backup mirror
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupOutcome {
    /// Dry run, no backup taken
    NotTaken,
    /// Counts matched and the mirror was deleted
    Removed { path: PathBuf, count: usize },
    /// Counts differed; the mirror stays for manual recovery
    Retained {
        path: PathBuf,
        original: usize,
        backup: usize,
    },
    /// Verification or removal failed; the mirror stays
    Unverified { path: PathBuf, error: String },
}

/// Everything a finished batch reports
#[derive(Debug)]
pub struct RunReport {
    pub results: Vec<FileResult>,
    /// Entries the directory walk could not read
    pub walk_errors: Vec<String>,
    pub backup: BackupOutcome,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn failures(&self) -> impl Iterator<Item = &FileResult> {
        self.results
            .iter()
            .filter(|r| r.status == ProcessingStatus::Failed)
    }

    pub fn count(&self, status: ProcessingStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    pub fn summary(&self) -> String {
        format!(
            "Total: {}, Renamed: {}, Skipped: {}, Failed: {}, Cancelled: {}",
            self.results.len(),
            self.count(ProcessingStatus::Renamed) + self.count(ProcessingStatus::DryRun),
            self.count(ProcessingStatus::Skipped),
            self.count(ProcessingStatus::Failed),
            self.count(ProcessingStatus::Cancelled)
        )
    }
}

/// Outcome of the rename pipeline for one file
enum Renamed {
    Done(PathBuf),
    Planned(PathBuf),
    Unchanged,
}

/// Main processor for a rename batch
pub struct Processor {
    config: Config,
    names: NameResolver,
    cancel: Arc<AtomicBool>,
}

impl Processor {
    /// Create a new processor with the given configuration
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let names = NameResolver::new(&config)?;

        Ok(Self {
            config,
            names,
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Flag that stops new files from being started once set
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Run the processing pipeline
    pub fn run(&self) -> Result<RunReport> {
        let _span = span!(Level::INFO, "processor_run").entered();
        let started = Instant::now();

        let root = self.validate_root()?;

        let backup_path = if self.config.dry_run {
            info!("Dry run, skipping backup");
            None
        } else {
            let path = backup::snapshot(&root, &self.config)?;
            info!(backup = ?path, "Backup created");
            Some(path)
        };

        info!(root = ?root, "Scanning for media files...");
        let (files, walk_errors) = self.collect_files(&root)?;
        info!(count = files.len(), "Found media files");

        let mut results = Vec::with_capacity(files.len());
        let mut pending = Vec::new();
        for path in files {
            if self.is_already_named(&path) {
                info!(?path, "Already in desired date format, skipping");
                results.push(FileResult::new(&path, ProcessingStatus::Skipped));
            } else {
                pending.push(path);
            }
        }

        if !pending.is_empty() {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.workers)
                .thread_name(|i| format!("exif-rename-{i}"))
                .build()?;

            // install() returns once every task has finished
            let processed: Vec<FileResult> =
                pool.install(|| pending.par_iter().map(|path| self.process_file(path)).collect());
            results.extend(processed);
        }

        let backup = match backup_path {
            Some(path) => self.finish_backup(&root, path),
            None => BackupOutcome::NotTaken,
        };

        let report = RunReport {
            results,
            walk_errors,
            backup,
            elapsed: started.elapsed(),
        };
        info!("{}", report.summary());
        info!(elapsed = ?report.elapsed, "Completed");

        Ok(report)
    }

    fn validate_root(&self) -> Result<PathBuf> {
        let root = &self.config.root;
        if root.as_os_str().is_empty() {
            return Err(Error::InvalidInput("no directory given".into()));
        }

        let root = fs::canonicalize(root).map_err(|e| {
            Error::InvalidInput(format!("path does not exist or is invalid: {} ({e})", root.display()))
        })?;
        if !root.is_dir() {
            return Err(Error::InvalidInput(format!(
                "{} is not a directory",
                root.display()
            )));
        }
        Ok(root)
    }

    /// Collect media files under the root
    ///
    /// Unreadable entries below the root are recorded and skipped; an
    /// unreadable root is fatal.
    fn collect_files(&self, root: &Path) -> Result<(Vec<PathBuf>, Vec<String>)> {
        let mut files = Vec::new();
        let mut walk_errors = Vec::new();

        for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    return Err(Error::RootUnreadable {
                        path: root.to_path_buf(),
                        source: e,
                    });
                }
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable entry");
                    walk_errors.push(e.to_string());
                    continue;
                }
            };

            if entry.file_type().is_file() && self.config.is_supported_path(entry.path()) {
                files.push(entry.into_path());
            }
        }

        debug!(files = files.len(), errors = walk_errors.len(), "Scan finished");
        Ok((files, walk_errors))
    }

    fn is_already_named(&self, path: &Path) -> bool {
        path.file_stem()
            .and_then(|s| s.to_str())
            .is_some_and(|stem| self.names.format().matches_stem(stem))
    }

    /// Process a single file; never fails, errors end up in the result
    fn process_file(&self, path: &Path) -> FileResult {
        let _file_span = span!(Level::DEBUG, "process_file", ?path).entered();

        if self.cancel.load(Ordering::Relaxed) {
            return FileResult::new(path, ProcessingStatus::Cancelled);
        }

        let resolved = match time::resolve(path, &self.config) {
            Ok(resolved) => resolved,
            Err(e) => return self.failed(path, None, &e),
        };

        let mut result = match self.rename(path, &resolved.timestamp, &resolved.extension) {
            Ok(Renamed::Done(dest)) => {
                info!(
                    source = ?path,
                    destination = ?dest,
                    time_source = ?resolved.source,
                    timestamp = %resolved.timestamp,
                    "Renamed file"
                );
                FileResult {
                    destination: Some(dest),
                    ..FileResult::new(path, ProcessingStatus::Renamed)
                }
            }
            Ok(Renamed::Planned(dest)) => {
                info!(source = ?path, destination = ?dest, "Would rename file");
                FileResult {
                    destination: Some(dest),
                    ..FileResult::new(path, ProcessingStatus::DryRun)
                }
            }
            Ok(Renamed::Unchanged) => {
                debug!(?path, "Name already matches capture time");
                FileResult::new(path, ProcessingStatus::Skipped)
            }
            Err(e) => return self.failed(path, Some(resolved.timestamp), &e),
        };

        result.timestamp = Some(resolved.timestamp);
        result.time_source = Some(resolved.source);
        result
    }

    fn rename(
        &self,
        path: &Path,
        timestamp: &MediaTimestamp,
        extension: &str,
    ) -> std::result::Result<Renamed, MediaError> {
        let directory = path.parent().unwrap_or_else(|| Path::new("."));

        let desired = self
            .names
            .file_name(&self.names.render(timestamp), None, extension);
        if path.file_name().is_some_and(|name| name == desired.as_str()) {
            return Ok(Renamed::Unchanged);
        }

        if self.config.dry_run {
            let target = self.names.resolve(timestamp, directory, extension)?;
            return Ok(Renamed::Planned(target));
        }

        let reservation = self.names.reserve(timestamp, directory, extension)?;
        let target = reservation.commit(path)?;
        Ok(Renamed::Done(target))
    }

    fn failed(&self, path: &Path, timestamp: Option<MediaTimestamp>, e: &MediaError) -> FileResult {
        error!(?path, kind = e.kind(), error = %e, "Failed to rename file");
        FileResult {
            timestamp,
            error: Some(FileError::from(e)),
            ..FileResult::new(path, ProcessingStatus::Failed)
        }
    }

    fn finish_backup(&self, root: &Path, path: PathBuf) -> BackupOutcome {
        let decision = match backup::verify(root, &path, &self.config) {
            Ok(decision) => decision,
            Err(e) => {
                error!(backup = ?path, error = %e, "Could not verify backup, keeping it");
                return BackupOutcome::Unverified {
                    path,
                    error: e.to_string(),
                };
            }
        };

        if let Err(e) = backup::conclude(&path, decision) {
            error!(backup = ?path, error = %e, "Could not remove backup");
            return BackupOutcome::Unverified {
                path,
                error: e.to_string(),
            };
        }

        match decision {
            BackupDecision::Discard { count } => BackupOutcome::Removed { path, count },
            BackupDecision::Keep { original, backup } => BackupOutcome::Retained {
                path,
                original,
                backup,
            },
        }
    }
}
