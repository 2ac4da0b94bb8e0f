//! Page extraction by index

use super::split::write_selection;
use super::{require_path, validate_page_indices, OperationContext, OperationEnv, OperationOptions};
use crate::error::Result;
use crate::job::Job;
use crate::ranges;
use crate::safety::require_existing_file;
use std::path::{Path, PathBuf};

/// Write the pages at 0-based `page_indices` to a new document
///
/// Pages keep document order; duplicate indices are collapsed.
pub fn extract_pages(
    env: &OperationEnv,
    source_path: &Path,
    page_indices: &[usize],
    output_path: &Path,
    options: &OperationOptions,
) -> Result<PathBuf> {
    OperationContext::run("extract_pages", options, |ctx| {
        require_path(output_path, "Output")?;
        require_existing_file(source_path)?;
        ctx.checkpoint()?;

        let selection = Job::open(&env.engine, source_path)?;
        validate_page_indices(page_indices, selection.page_count()?)?;
        let wire = ranges::compress(&ranges::to_one_based_sorted(page_indices));
        ctx.report(10.0, "loaded");

        ctx.checkpoint()?;
        write_selection(env, &selection, &wire, output_path)?;
        ctx.report(100.0, "complete");
        Ok(output_path.to_path_buf())
    })
}
