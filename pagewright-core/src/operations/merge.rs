//! PDF merging
//!
//! The first source becomes the base document; every other source is opened
//! as its own job and appended to it in order.

use super::{require_path, write_output, OperationContext, OperationEnv, OperationOptions};
use crate::error::{DomainError, ErrorCode, Result};
use crate::job::Job;
use crate::native::WriteFlags;
use crate::safety::require_existing_file;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Merge `sources` into a new file at `output_path`
///
/// Needs at least two sources, all of which must exist before anything is
/// opened. Nothing is written unless every source was appended.
pub fn merge_pdfs<P: AsRef<Path>>(
    env: &OperationEnv,
    sources: &[P],
    output_path: &Path,
    options: &OperationOptions,
) -> Result<PathBuf> {
    OperationContext::run("merge", options, |ctx| {
        if sources.len() < 2 {
            return Err(DomainError::new(
                ErrorCode::InsufficientSources,
                format!("At least two documents are required to merge, got {}", sources.len()),
            )
            .with_context("source_count", sources.len()));
        }
        require_path(output_path, "Output")?;
        for source in sources {
            require_existing_file(source.as_ref())?;
        }
        ctx.checkpoint()?;

        let count = sources.len() as f64;
        let base = Job::open(&env.engine, sources[0].as_ref())?;
        ctx.report(10.0, "loaded");

        for source in &sources[1..] {
            ctx.checkpoint()?;
            let next = Job::open(&env.engine, source.as_ref())?;
            Job::add_pages(&base, &next, None)?;
            debug!(source = %source.as_ref().display(), "source appended");
            ctx.advance(80.0 / count, "merging");
        }

        ctx.checkpoint()?;
        ctx.report(90.0, "writing");
        let size = write_output(env, &base, output_path, &WriteFlags::default())?;
        ctx.report(100.0, "complete");
        debug!(sources = sources.len(), size, "merge written");
        Ok(output_path.to_path_buf())
    })
}

#[cfg(test)]
#[path = "merge_tests.rs"]
mod merge_tests;
