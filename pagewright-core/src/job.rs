//! Scoped ownership of engine jobs
//!
//! A [`Job`] owns exactly one native handle and releases it when dropped, so
//! every early return and `?` in an operation frees what it acquired. Engine
//! failures are turned into [`DomainError`]s here, while the engine's last
//! error message for the handle is still available.

use crate::error::{DomainError, Result};
use crate::native::{JobHandle, MediaBox, NativeCode, StructuralEngine, WriteFlags};
use crate::operations::RotationAngle;
use crate::translate::translate;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Engine shared by every job of a mutator
pub type SharedEngine = Arc<dyn StructuralEngine>;

/// One open native document tree
pub struct Job {
    engine: SharedEngine,
    handle: JobHandle,
    source: Option<PathBuf>,
    released: bool,
}

impl Job {
    fn acquire(engine: &SharedEngine, source: Option<&Path>) -> Result<Self> {
        let handle = engine.create_job().map_err(|code| translate(code, None))?;
        debug!(job = %handle, source = ?source, "job acquired");
        Ok(Self {
            engine: Arc::clone(engine),
            handle,
            source: source.map(Path::to_path_buf),
            released: false,
        })
    }

    /// Parse `path` into a new job
    pub fn open(engine: &SharedEngine, path: &Path) -> Result<Self> {
        let job = Self::acquire(engine, Some(path))?;
        job.engine
            .read(job.handle, path)
            .map_err(|code| job.failure(code))?;
        Ok(job)
    }

    /// A job holding a document with no pages
    pub fn empty(engine: &SharedEngine) -> Result<Self> {
        let job = Self::acquire(engine, None)?;
        job.engine
            .init_empty(job.handle)
            .map_err(|code| job.failure(code))?;
        Ok(job)
    }

    /// File this job was read from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    fn failure(&self, code: NativeCode) -> DomainError {
        let message = self.engine.last_error(self.handle);
        let error = translate(code, message.as_deref());
        match &self.source {
            Some(path) => error.with_context_if_absent("path", path.display().to_string()),
            None => error,
        }
    }

    /// Live page count
    pub fn page_count(&self) -> Result<u32> {
        self.engine
            .page_count(self.handle)
            .map_err(|code| self.failure(code))
    }

    /// Effective media box of a 1-based page
    pub fn media_box(&self, page_number: u32) -> Result<MediaBox> {
        let page = self
            .engine
            .page(self.handle, page_number)
            .map_err(|code| self.failure(code))?;
        self.engine
            .media_box(self.handle, page)
            .map_err(|code| self.failure(code))
    }

    /// Append pages of `source` to `target` in the order `range` lists them
    ///
    /// `None` copies every page.
    pub fn add_pages(target: &Job, source: &Job, range: Option<&str>) -> Result<()> {
        if !std::ptr::addr_eq(Arc::as_ptr(&target.engine), Arc::as_ptr(&source.engine)) {
            return Err(DomainError::invalid_argument(
                "Cannot copy pages between jobs of different engines",
            ));
        }
        target
            .engine
            .add_pages(target.handle, source.handle, range)
            .map_err(|code| {
                let error = target.failure(code);
                match range {
                    Some(range) => error.with_context("page_range", range),
                    None => error,
                }
            })
    }

    /// Remove the pages named by a wire-format range in one call
    pub fn remove_pages(&self, range: &str) -> Result<()> {
        self.engine
            .remove_pages(self.handle, range)
            .map_err(|code| self.failure(code).with_context("page_range", range))
    }

    /// Rotate a 1-based page by `angle` relative to its current rotation
    pub fn rotate_page(&self, page_number: u32, angle: RotationAngle) -> Result<()> {
        let page = self
            .engine
            .page(self.handle, page_number)
            .map_err(|code| self.failure(code))?;
        self.engine
            .rotate_page(self.handle, page, angle.to_degrees(), true)
            .map_err(|code| self.failure(code).with_context("page_number", page_number))
    }

    /// Insert a blank page that becomes page `position` (1-based)
    pub fn insert_blank_page(&self, position: u32, media_box: MediaBox) -> Result<()> {
        self.engine
            .insert_blank_page(self.handle, position, media_box)
            .map_err(|code| self.failure(code).with_context("position", position))
    }

    /// Serialize the job to `path`
    pub fn write(&self, path: &Path, flags: &WriteFlags) -> Result<()> {
        self.engine
            .write(self.handle, path, flags)
            .map_err(|code| {
                translate(code, self.engine.last_error(self.handle).as_deref()).with_path(path)
            })
    }

    /// Release the handle now, surfacing release failures
    pub fn close(mut self) -> Result<()> {
        self.released = true;
        debug!(job = %self.handle, "job released");
        self.engine
            .release(self.handle)
            .map_err(|code| translate(code, None))
    }
}

impl Drop for Job {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        match self.engine.release(self.handle) {
            Ok(()) => debug!(job = %self.handle, source = ?self.source(), "job released"),
            Err(code) => {
                warn!(job = %self.handle, source = ?self.source(), %code, "failed to release job")
            }
        }
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("handle", &self.handle)
            .field("source", &self.source)
            .finish()
    }
}
