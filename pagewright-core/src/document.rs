//! Documents handed to in-place operations, and the collaborators that
//! produce and render them

use crate::error::{DomainError, Result};
use std::path::{Path, PathBuf};

/// Token a [`DocumentLoader`] may attach to a document it keeps open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadedHandle(pub u64);

/// A document on disk as seen by a loader
///
/// `page_count` is cached at load time; operations always read the live count
/// from their own job instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    path: PathBuf,
    page_count: u32,
    handle: Option<LoadedHandle>,
}

impl DocumentRef {
    pub fn new(path: impl Into<PathBuf>, page_count: u32) -> Self {
        Self {
            path: path.into(),
            page_count,
            handle: None,
        }
    }

    pub fn with_handle(mut self, handle: LoadedHandle) -> Self {
        self.handle = Some(handle);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn handle(&self) -> Option<LoadedHandle> {
        self.handle
    }

    /// Fail unless the document points at a file name
    pub(crate) fn validate(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(DomainError::invalid_argument("Document path is empty"));
        }
        Ok(())
    }
}

/// Opens documents for viewing; supplied by the host application
pub trait DocumentLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<DocumentRef>;
}

/// Rasterizes pages; supplied by the host application
pub trait PageRenderer: Send + Sync {
    /// Render a 1-based page to encoded image bytes
    fn render(&self, handle: LoadedHandle, page_number: u32, zoom: f32, dpi: u32) -> Result<Vec<u8>>;
}
