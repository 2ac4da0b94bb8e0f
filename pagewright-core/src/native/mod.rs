//! Structural engine boundary
//!
//! The mutation engine never touches the document object graph itself. It
//! drives a structural editing backend through opaque job handles, in the
//! style of a C library: create a handle, read a file into it, issue page
//! operations, write, release. Failures come back as a [`NativeCode`]; the
//! detailed message is fetched separately with
//! [`StructuralEngine::last_error`].
//!
//! Raw codes stop here. Everything above [`crate::job`] sees
//! [`crate::error::DomainError`] only.

pub mod codes;
pub mod lopdf_engine;

pub use codes::NativeCode;
pub use lopdf_engine::LopdfEngine;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Result of a native call
pub type NativeResult<T> = std::result::Result<T, NativeCode>;

/// Opaque token for one native parse tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobHandle(u64);

impl JobHandle {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job#{}", self.0)
    }
}

/// Opaque token for one page inside a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageHandle(u64);

impl PageHandle {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// A page rectangle in PDF user space units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MediaBox {
    pub llx: f64,
    pub lly: f64,
    pub urx: f64,
    pub ury: f64,
}

impl MediaBox {
    pub const fn new(llx: f64, lly: f64, urx: f64, ury: f64) -> Self {
        Self { llx, lly, urx, ury }
    }

    pub fn width(&self) -> f64 {
        (self.urx - self.llx).abs()
    }

    pub fn height(&self) -> f64 {
        (self.ury - self.lly).abs()
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.llx, self.lly, self.urx, self.ury]
    }
}

/// Flags applied to a job when it is written
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteFlags {
    /// Compress content streams
    pub compress_streams: bool,
    /// Drop unreferenced objects and empty streams
    pub remove_unreferenced: bool,
    /// Pack objects into object streams
    pub object_streams: bool,
    /// Write a linearized ("fast web view") file
    pub linearize: bool,
}

/// An external structural PDF editing engine
///
/// Implementations own the native trees behind every [`JobHandle`] and must
/// be safe to share between threads; a single handle is only ever used by
/// one thread at a time.
pub trait StructuralEngine: Send + Sync {
    /// Whether process-wide initialization has happened
    fn is_initialized(&self) -> bool;

    /// Allocate a new, empty job handle
    fn create_job(&self) -> NativeResult<JobHandle>;

    /// Parse `path` into the job
    fn read(&self, job: JobHandle, path: &Path) -> NativeResult<()>;

    /// Initialize the job with a document that has no pages
    fn init_empty(&self, job: JobHandle) -> NativeResult<()>;

    /// Number of pages in the job's tree
    fn page_count(&self, job: JobHandle) -> NativeResult<u32>;

    /// Append pages of `source` to `target`
    ///
    /// `range` selects pages in wire format (`"1-3,7"`) or as an explicit
    /// order (`"3,1,2"`); pages are appended in the order listed. `None`
    /// appends every page.
    fn add_pages(&self, target: JobHandle, source: JobHandle, range: Option<&str>) -> NativeResult<()>;

    /// Remove the pages named by `range` in one structural call
    fn remove_pages(&self, job: JobHandle, range: &str) -> NativeResult<()>;

    /// Look up a page by 1-based number
    fn page(&self, job: JobHandle, page_number: u32) -> NativeResult<PageHandle>;

    /// Set or adjust a page's rotation
    fn rotate_page(&self, job: JobHandle, page: PageHandle, degrees: i32, relative: bool) -> NativeResult<()>;

    /// Effective media box of a page
    fn media_box(&self, job: JobHandle, page: PageHandle) -> NativeResult<MediaBox>;

    /// Insert a blank page so it becomes page `position` (1-based)
    ///
    /// `0` or any position past the last page appends.
    fn insert_blank_page(&self, job: JobHandle, position: u32, media_box: MediaBox) -> NativeResult<()>;

    /// Serialize the job to `path`
    fn write(&self, job: JobHandle, path: &Path, flags: &WriteFlags) -> NativeResult<()>;

    /// Message describing the most recent failure on `job`
    fn last_error(&self, job: JobHandle) -> Option<String>;

    /// Release the native tree; a handle must not be used afterwards
    fn release(&self, job: JobHandle) -> NativeResult<()>;

    /// Number of handles currently allocated
    fn open_handles(&self) -> usize;
}
