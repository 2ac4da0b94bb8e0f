//! Page deletion

use super::{rewrite_in_place, validate_page_indices, OperationContext, OperationEnv, OperationOptions};
use crate::document::DocumentRef;
use crate::error::{DomainError, ErrorCode, Result};
use crate::job::Job;
use crate::native::WriteFlags;
use crate::ranges;
use crate::safety::check_writable;
use tracing::debug;

/// Delete the pages at 0-based `page_indices` and write the document back
/// in place
///
/// At least one page must survive: asking for as many indices as the
/// document has pages fails with `CANNOT_DELETE_ALL_PAGES`. All selected
/// pages go in a single structural call.
pub fn delete_pages(
    env: &OperationEnv,
    document: &DocumentRef,
    page_indices: &[usize],
    options: &OperationOptions,
) -> Result<()> {
    OperationContext::run("delete_pages", options, |ctx| {
        document.validate()?;
        if page_indices.is_empty() {
            return Err(DomainError::invalid_argument("No page indices given"));
        }
        check_writable(document.path())?;
        ctx.checkpoint()?;

        let job = Job::open(&env.engine, document.path())?;
        let total = job.page_count()?;
        if page_indices.len() >= total as usize {
            return Err(DomainError::new(
                ErrorCode::CannotDeleteAllPages,
                format!(
                    "Cannot delete {} pages from a document with {total} pages",
                    page_indices.len()
                ),
            )
            .with_context("requested", page_indices.len())
            .with_context("total_pages", total));
        }
        validate_page_indices(page_indices, total)?;
        ctx.report(10.0, "loaded");

        let pages = ranges::to_one_based_sorted(page_indices);
        let range = ranges::compress(&pages);
        ctx.checkpoint()?;
        job.remove_pages(&range)?;
        debug!(%range, remaining = total as usize - pages.len(), "pages removed");
        ctx.report(60.0, "deleting");

        rewrite_in_place(env, ctx, &job, document.path(), &WriteFlags::default())?;
        ctx.report(100.0, "complete");
        Ok(())
    })
}

#[cfg(test)]
#[path = "delete_tests.rs"]
mod delete_tests;
