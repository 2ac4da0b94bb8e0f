//! # pagewright
//!
//! Page-level PDF mutation on top of a structural editing engine.
//!
//! ## Features
//!
//! - **Merge** two or more documents into one
//! - **Split** by page range, by index list, or into fixed-size chunks
//! - **Optimize** with stream compression and unreferenced object removal
//! - **Rotate, delete, reorder and insert** pages in place, with backup and
//!   restore around every rewrite
//! - **Progress and cancellation** for every operation
//! - **Stable errors**: every failure is a [`DomainError`] with a machine
//!   readable code and category
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pagewright::{DocumentMutator, LopdfEngine, OperationOptions, Result};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<()> {
//! let mutator = DocumentMutator::new(Arc::new(LopdfEngine::initialized()))?;
//!
//! mutator
//!     .merge(
//!         vec!["a.pdf".into(), "b.pdf".into()],
//!         "merged.pdf".into(),
//!         OperationOptions::default(),
//!     )
//!     .await?;
//!
//! mutator
//!     .split("merged.pdf".into(), "1-3,7".into(), "excerpt.pdf".into(), OperationOptions::default())
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Page numbering
//!
//! Range strings (`"1-3,7"`) are 1-based and inclusive. Operations that take
//! page indices (rotate, delete, reorder, insert, extract) use 0-based
//! indices.

pub mod config;
pub mod document;
pub mod error;
pub mod job;
pub mod native;
pub mod operations;
pub mod progress;
pub mod ranges;
pub mod safety;
pub mod service;
pub mod translate;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use config::MutatorConfig;
pub use document::{DocumentLoader, DocumentRef, LoadedHandle, PageRenderer};
pub use error::{DomainError, ErrorCategory, ErrorCode, ErrorSeverity, Result};
pub use native::{LopdfEngine, MediaBox, StructuralEngine, WriteFlags};
pub use operations::{
    OperationEnv, OperationOptions, OptimizationResult, OptimizeOptions, PageSize, RotationAngle,
};
pub use progress::{CancellationToken, ProgressSink, ProgressUpdate};
pub use ranges::PageRange;
pub use service::DocumentMutator;

/// Current version of pagewright
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
