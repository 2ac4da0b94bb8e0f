//! Page mutation operations
//!
//! Every operation follows the same shape: validate inputs, check for
//! cancellation, open jobs, validate indices against the live page count,
//! mutate, write through a staging file, verify, and release the jobs. Jobs
//! are released by [`Job`]'s `Drop` on every path out of an operation.
//!
//! These functions run on the caller's thread and do not catch panics. A
//! panic unwinds through them, still releasing jobs and restoring backups
//! from `Drop`. [`crate::DocumentMutator`] is the boundary that turns a
//! panic into an `UNEXPECTED_ERROR`; callers of the synchronous functions
//! that need the same guarantee must wrap them in
//! [`std::panic::catch_unwind`] themselves.

pub mod delete;
pub mod extract;
pub mod insert;
pub mod merge;
pub mod optimize;
pub mod reorder;
pub mod rotate;
pub mod split;

pub use delete::delete_pages;
pub use extract::extract_pages;
pub use insert::{insert_blank_page, PageSize};
pub use merge::merge_pdfs;
pub use optimize::{optimize_pdf, OptimizationResult, OptimizeOptions};
pub use reorder::{move_page, reorder_pages, reverse_pages};
pub use rotate::{rotate_pages, RotationAngle};
pub use split::{split_into_chunks, split_pdf};

use crate::config::MutatorConfig;
use crate::error::{DomainError, Result};
use crate::job::{Job, SharedEngine};
use crate::native::WriteFlags;
use crate::progress::{CancellationToken, ProgressReporter, ProgressSink};
use crate::safety::{
    check_writable, ensure_output_directory, file_size, verify_output, BackupGuard, StagedWrite,
};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, info_span, warn};
use uuid::Uuid;

/// What every operation runs against
#[derive(Clone)]
pub struct OperationEnv {
    pub engine: SharedEngine,
    pub config: MutatorConfig,
}

impl OperationEnv {
    pub fn new(engine: SharedEngine, config: MutatorConfig) -> Self {
        Self { engine, config }
    }
}

impl fmt::Debug for OperationEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationEnv")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Per-call options shared by all operations
#[derive(Clone, Default)]
pub struct OperationOptions {
    /// Receives 0-100 progress updates
    pub progress: Option<Arc<dyn ProgressSink>>,
    /// Polled between engine calls
    pub cancel: Option<CancellationToken>,
    /// Attached to logs and errors; generated when absent
    pub correlation_id: Option<String>,
}

impl OperationOptions {
    pub fn with_progress(mut self, sink: impl ProgressSink + 'static) -> Self {
        self.progress = Some(Arc::new(sink));
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }
}

impl fmt::Debug for OperationOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationOptions")
            .field("progress", &self.progress.is_some())
            .field("cancel", &self.cancel)
            .field("correlation_id", &self.correlation_id)
            .finish()
    }
}

/// State of one running operation
pub(crate) struct OperationContext {
    correlation_id: String,
    progress: ProgressReporter,
    cancel: Option<CancellationToken>,
}

impl OperationContext {
    fn new(options: &OperationOptions) -> Self {
        Self {
            correlation_id: options
                .correlation_id
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            progress: ProgressReporter::new(options.progress.clone()),
            cancel: options.cancel.clone(),
        }
    }

    /// Run `body` inside a tracing span, tagging any error it returns
    pub(crate) fn run<T>(
        operation: &'static str,
        options: &OperationOptions,
        body: impl FnOnce(&mut OperationContext) -> Result<T>,
    ) -> Result<T> {
        let mut ctx = Self::new(options);
        let span = info_span!("operation", operation, correlation_id = %ctx.correlation_id);
        let _entered = span.enter();

        let result = body(&mut ctx);
        let elapsed_ms = ctx.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => info!(elapsed_ms, "operation completed"),
            Err(error) if error.is_cancelled() => info!(elapsed_ms, "operation cancelled"),
            Err(error) => warn!(elapsed_ms, code = %error.code(), %error, "operation failed"),
        }
        result.map_err(|error| {
            error
                .with_context_if_absent("operation", operation)
                .with_context_if_absent("correlation_id", ctx.correlation_id.clone())
        })
    }

    /// `Err(CANCELLED)` if the caller asked to stop
    pub(crate) fn checkpoint(&self) -> Result<()> {
        match &self.cancel {
            Some(token) => token.check(),
            None => Ok(()),
        }
    }

    pub(crate) fn report(&mut self, percentage: f64, stage: &'static str) {
        self.progress.report(percentage, stage);
    }

    pub(crate) fn advance(&mut self, delta: f64, stage: &'static str) {
        self.progress.advance(delta, stage);
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.progress.elapsed()
    }
}

/// Fail with `INVALID_ARGUMENT` on an empty path
pub(crate) fn require_path(path: &Path, what: &str) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(DomainError::invalid_argument(format!("{what} path is empty")));
    }
    Ok(())
}

/// Check 0-based indices against `[0, total)`; empty lists are rejected
pub(crate) fn validate_page_indices(indices: &[usize], total_pages: u32) -> Result<()> {
    if indices.is_empty() {
        return Err(DomainError::invalid_argument("No page indices given"));
    }
    let total = total_pages as usize;
    match indices.iter().find(|&&index| index >= total) {
        Some(&index) => Err(DomainError::page_out_of_range(index, total)),
        None => Ok(()),
    }
}

/// Write `job` to a new or existing `target` through a staging file
///
/// Returns the size of the written file.
pub(crate) fn write_output(env: &OperationEnv, job: &Job, target: &Path, flags: &WriteFlags) -> Result<u64> {
    ensure_output_directory(target)?;
    check_writable(target)?;

    let staged = StagedWrite::new(target);
    let on_target = |error: DomainError| {
        error
            .with_context("staging_path", staged.path().display().to_string())
            .with_path(target)
    };
    job.write(staged.path(), flags).map_err(on_target)?;
    let size = if env.config.verify_output {
        verify_output(staged.path()).map_err(on_target)?
    } else {
        file_size(staged.path()).map_err(on_target)?
    };
    staged.commit()?;
    Ok(size)
}

/// Rewrite the file `job` was read from, restoring it on failure
pub(crate) fn rewrite_in_place(
    env: &OperationEnv,
    ctx: &OperationContext,
    job: &Job,
    path: &Path,
    flags: &WriteFlags,
) -> Result<u64> {
    check_writable(path)?;
    let backup = if env.config.create_backup {
        Some(BackupGuard::create(path, &env.config.backup_suffix)?.keep_backup(env.config.keep_backup))
    } else {
        None
    };

    ctx.checkpoint()?;
    let size = write_output(env, job, path, flags)?;
    if let Some(backup) = backup {
        backup.commit()?;
    }
    Ok(size)
}
