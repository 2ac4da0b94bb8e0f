//! Write safety around engine output
//!
//! Operations that rewrite a document in place never let the engine write
//! over the original: output goes to a sibling staging file that is moved
//! over the target once verified, and a [`BackupGuard`] restores the
//! original if anything fails before the operation commits.

use crate::error::{DomainError, ErrorCode, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Create the parent directories of `path`
pub fn ensure_output_directory(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
            fs::create_dir_all(parent)
                .map_err(|err| DomainError::io(ErrorCode::IoFailure, parent, &err))?;
            debug!(directory = %parent.display(), "created output directory");
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Fail with `FILE_NOT_FOUND` unless `path` is an existing file
pub fn require_existing_file(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(DomainError::new(
            ErrorCode::FileNotFound,
            format!("File not found: {}", path.display()),
        )
        .with_path(path))
    }
}

/// Fail with `FILE_READ_ONLY` if `path` exists and cannot be written
pub fn check_writable(path: &Path) -> Result<()> {
    match fs::metadata(path) {
        Ok(metadata) if metadata.permissions().readonly() => Err(DomainError::new(
            ErrorCode::FileReadOnly,
            format!("File is read-only: {}", path.display()),
        )
        .with_path(path)),
        Ok(_) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(DomainError::io(ErrorCode::IoFailure, path, &err)),
    }
}

/// Size of a file in bytes
pub fn file_size(path: &Path) -> Result<u64> {
    fs::metadata(path)
        .map(|metadata| metadata.len())
        .map_err(|err| {
            let code = match err.kind() {
                std::io::ErrorKind::NotFound => ErrorCode::FileNotFound,
                _ => ErrorCode::IoFailure,
            };
            DomainError::io(code, path, &err)
        })
}

/// Check that an output file exists and is non-empty; returns its size
pub fn verify_output(path: &Path) -> Result<u64> {
    let size = match fs::metadata(path) {
        Ok(metadata) => metadata.len(),
        Err(_) => {
            return Err(DomainError::new(
                ErrorCode::OutputMissing,
                format!("Output file was not created: {}", path.display()),
            )
            .with_path(path))
        }
    };
    if size == 0 {
        return Err(DomainError::new(
            ErrorCode::OutputEmpty,
            format!("Output file is empty: {}", path.display()),
        )
        .with_path(path));
    }
    Ok(size)
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Copy of a file taken before it is rewritten
///
/// Dropping an uncommitted guard copies the backup back over the original.
#[derive(Debug)]
pub struct BackupGuard {
    original: PathBuf,
    backup: PathBuf,
    keep_backup: bool,
    armed: bool,
}

impl BackupGuard {
    /// Copy `path` to `<path><suffix>`
    pub fn create(path: &Path, suffix: &str) -> Result<Self> {
        let backup = with_suffix(path, suffix);
        fs::copy(path, &backup).map_err(|err| {
            DomainError::io(ErrorCode::IoFailure, path, &err)
                .with_context("backup_path", backup.display().to_string())
        })?;
        debug!(original = %path.display(), backup = %backup.display(), "backup created");
        Ok(Self {
            original: path.to_path_buf(),
            backup,
            keep_backup: false,
            armed: true,
        })
    }

    /// Leave the backup file on disk after commit
    pub fn keep_backup(mut self, keep: bool) -> Self {
        self.keep_backup = keep;
        self
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup
    }

    /// Put the backed-up content back over the original
    pub fn restore(&mut self) -> Result<()> {
        self.armed = false;
        fs::copy(&self.backup, &self.original)
            .map_err(|err| DomainError::io(ErrorCode::IoFailure, &self.original, &err))?;
        debug!(original = %self.original.display(), "original restored from backup");
        self.discard();
        Ok(())
    }

    /// Accept the new content
    pub fn commit(mut self) -> Result<()> {
        self.armed = false;
        self.discard();
        Ok(())
    }

    fn discard(&self) {
        if self.keep_backup {
            return;
        }
        if let Err(err) = fs::remove_file(&self.backup) {
            warn!(backup = %self.backup.display(), %err, "failed to remove backup");
        }
    }
}

impl Drop for BackupGuard {
    fn drop(&mut self) {
        if self.armed {
            if let Err(error) = self.restore() {
                warn!(%error, "failed to restore original from backup");
            }
        }
    }
}

/// Deletes a partially written output unless disarmed
#[derive(Debug)]
pub struct PartialOutputGuard {
    path: PathBuf,
    armed: bool,
}

impl PartialOutputGuard {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            armed: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Keep the output
    pub fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PartialOutputGuard {
    fn drop(&mut self) {
        if self.armed && self.path.exists() {
            match fs::remove_file(&self.path) {
                Ok(()) => debug!(path = %self.path.display(), "removed partial output"),
                Err(err) => warn!(path = %self.path.display(), %err, "failed to remove partial output"),
            }
        }
    }
}

/// Output staged next to its final location and moved into place on commit
#[derive(Debug)]
pub struct StagedWrite {
    target: PathBuf,
    staging: PartialOutputGuard,
}

impl StagedWrite {
    pub fn new(target: &Path) -> Self {
        let name = target
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        let staging = target.with_file_name(format!(".{name}.{}.tmp", Uuid::new_v4().simple()));
        Self {
            target: target.to_path_buf(),
            staging: PartialOutputGuard::new(&staging),
        }
    }

    /// Where the engine should write
    pub fn path(&self) -> &Path {
        self.staging.path()
    }

    /// Move the staged file over the target
    pub fn commit(self) -> Result<()> {
        fs::rename(self.staging.path(), &self.target)
            .map_err(|err| DomainError::io(ErrorCode::IoFailure, &self.target, &err))?;
        self.staging.disarm();
        Ok(())
    }
}
