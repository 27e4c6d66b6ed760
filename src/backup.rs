//! Backup mirror of the target tree
//!
//! Before any rename the whole root is copied to a sibling directory named
//! `<root name><suffix>`. After the batch the number of media files in both
//! trees is compared: equal counts discard the mirror, anything else keeps
//! it for manual recovery. The comparison is by count only; it does not
//! detect a file that was corrupted or swapped for another.

use crate::config::Config;
use crate::error::{Error, Result};
use filetime::FileTime;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// What to do with the mirror after a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupDecision {
    /// Both trees hold the same number of media files
    Discard { count: usize },
    /// Counts differ; keep the mirror
    Keep { original: usize, backup: usize },
}

/// Path of the mirror for a root directory
pub fn backup_path_for(root: &Path, suffix: &str) -> Result<PathBuf> {
    let name = root.file_name().ok_or_else(|| {
        Error::InvalidInput(format!("{} has no directory name to back up", root.display()))
    })?;
    let parent = root.parent().ok_or_else(|| {
        Error::InvalidInput(format!("{} has no parent directory", root.display()))
    })?;

    let mut backup_name = name.to_os_string();
    backup_name.push(suffix);
    Ok(parent.join(backup_name))
}

/// Mirror every directory and file under `root` into the backup directory
///
/// Refuses to run if the backup directory already exists. A partially
/// written mirror is removed again on failure.
pub fn snapshot(root: &Path, config: &Config) -> Result<PathBuf> {
    let backup = backup_path_for(root, &config.backup_suffix)?;
    if backup.exists() {
        return Err(Error::BackupExists(backup));
    }

    info!(source = ?root, backup = ?backup, "Creating backup");

    if let Err(e) = copy_tree(root, &backup) {
        if let Err(cleanup) = fs::remove_dir_all(&backup) {
            warn!(backup = ?backup, error = %cleanup, "Failed to remove partial backup");
        }
        return Err(Error::Backup {
            path: root.to_path_buf(),
            source: e,
        });
    }

    Ok(backup)
}

fn copy_tree(root: &Path, backup: &Path) -> io::Result<()> {
    let mut files = 0usize;

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(io::Error::other)?;
        let dest = backup.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&dest)?;
        } else if file_type.is_file() {
            // fs::copy carries the permission bits over
            fs::copy(entry.path(), &dest)?;
            let metadata = entry.metadata().map_err(io::Error::from)?;
            filetime::set_file_mtime(&dest, FileTime::from_last_modification_time(&metadata))?;
            files += 1;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &dest)?;
        }
    }

    debug!(files, "Backup copy finished");
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(source: &Path, dest: &Path) -> io::Result<()> {
    let target = fs::read_link(source)?;
    std::os::unix::fs::symlink(target, dest)
}

#[cfg(not(unix))]
fn copy_symlink(source: &Path, _dest: &Path) -> io::Result<()> {
    warn!(path = ?source, "Symlink not mirrored on this platform");
    Ok(())
}

/// Count regular files with a picture or movie extension under `dir`
pub fn count_media_files(dir: &Path, config: &Config) -> Result<usize> {
    let mut count = 0usize;
    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = entry.map_err(io::Error::from)?;
        if entry.file_type().is_file() && config.is_supported_path(entry.path()) {
            count += 1;
        }
    }
    Ok(count)
}

/// Compare media file counts of the original tree and its mirror
pub fn verify(root: &Path, backup: &Path, config: &Config) -> Result<BackupDecision> {
    let original = count_media_files(root, config)?;
    let mirrored = count_media_files(backup, config)?;

    if original == mirrored {
        Ok(BackupDecision::Discard { count: original })
    } else {
        Ok(BackupDecision::Keep {
            original,
            backup: mirrored,
        })
    }
}

/// Act on a decision: delete the mirror on `Discard`, report on `Keep`
pub fn conclude(backup: &Path, decision: BackupDecision) -> Result<()> {
    match decision {
        BackupDecision::Discard { count } => {
            fs::remove_dir_all(backup)?;
            info!(backup = ?backup, count, "Backup removed, counts matched");
        }
        BackupDecision::Keep { original, backup: mirrored } => {
            warn!(
                backup = ?backup,
                original,
                backup_count = mirrored,
                "Backup retained due to file count mismatch"
            );
        }
    }
    Ok(())
}
