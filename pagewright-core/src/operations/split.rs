//! PDF splitting

use super::{require_path, write_output, OperationContext, OperationEnv, OperationOptions};
use crate::error::{DomainError, Result};
use crate::job::Job;
use crate::native::WriteFlags;
use crate::ranges;
use crate::safety::{require_existing_file, PartialOutputGuard};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Copy the pages named by the wire-format `selection` of `source` into a
/// new document at `output_path`
pub(crate) fn write_selection(
    env: &OperationEnv,
    source: &Job,
    selection: &str,
    output_path: &Path,
) -> Result<u64> {
    let output = Job::empty(&env.engine)?;
    Job::add_pages(&output, source, Some(selection))?;
    write_output(env, &output, output_path, &WriteFlags::default())
}

/// Write the pages named by `range` (e.g. `"1-3,7"`) to `output_path`
///
/// The range is validated against the live page count and normalized
/// before it reaches the engine, so `"3,1-2"` yields pages 1-3 in document
/// order.
pub fn split_pdf(
    env: &OperationEnv,
    source_path: &Path,
    range: &str,
    output_path: &Path,
    options: &OperationOptions,
) -> Result<PathBuf> {
    OperationContext::run("split", options, |ctx| {
        let parsed = ranges::parse(range)?;
        require_path(output_path, "Output")?;
        require_existing_file(source_path)?;
        ctx.checkpoint()?;

        let selection = Job::open(&env.engine, source_path)?;
        ranges::validate_against_page_count(&parsed, selection.page_count()?)?;
        let wire = ranges::to_wire_string(&parsed);
        ctx.report(10.0, "loaded");

        ctx.checkpoint()?;
        let size = write_selection(env, &selection, &wire, output_path)?;
        debug!(range = %wire, size, "split written");
        ctx.report(100.0, "complete");
        Ok(output_path.to_path_buf())
    })
}

/// Split `source_path` into files of `chunk_size` pages each
///
/// Parts are named `<stem>_part_<n>.pdf` (1-based) inside `output_dir`.
/// On failure or cancellation, parts already written are removed.
pub fn split_into_chunks(
    env: &OperationEnv,
    source_path: &Path,
    chunk_size: usize,
    output_dir: &Path,
    options: &OperationOptions,
) -> Result<Vec<PathBuf>> {
    OperationContext::run("split_into_chunks", options, |ctx| {
        if chunk_size == 0 {
            return Err(DomainError::invalid_argument("Chunk size must be at least 1"));
        }
        require_path(output_dir, "Output directory")?;
        require_existing_file(source_path)?;
        let stem = source_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        ctx.checkpoint()?;

        let selection = Job::open(&env.engine, source_path)?;
        let total = selection.page_count()? as usize;
        if total == 0 {
            return Err(DomainError::invalid_argument("Document has no pages to split")
                .with_path(source_path));
        }
        ctx.report(5.0, "loaded");

        let parts = total.div_ceil(chunk_size);
        let mut written = Vec::with_capacity(parts);
        for part in 0..parts {
            ctx.checkpoint()?;
            let first = part * chunk_size + 1;
            let last = (first + chunk_size - 1).min(total);
            let pages: Vec<u32> = (first as u32..=last as u32).collect();
            let path = output_dir.join(format!("{stem}_part_{}.pdf", part + 1));

            write_selection(env, &selection, &ranges::compress(&pages), &path)?;
            written.push(PartialOutputGuard::new(&path));
            ctx.advance(95.0 / parts as f64, "splitting");
        }

        let paths = written
            .into_iter()
            .map(|guard| {
                let path = guard.path().to_path_buf();
                guard.disarm();
                path
            })
            .collect::<Vec<_>>();
        debug!(parts = paths.len(), chunk_size, "split into chunks");
        ctx.report(100.0, "complete");
        Ok(paths)
    })
}

#[cfg(test)]
#[path = "split_tests.rs"]
mod split_tests;
