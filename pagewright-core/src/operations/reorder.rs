//! Page reordering
//!
//! The document is rebuilt rather than edited: a fresh empty tree receives
//! every page of the source in the new order, then replaces the file.

use super::{rewrite_in_place, validate_page_indices, OperationContext, OperationEnv, OperationOptions};
use crate::document::DocumentRef;
use crate::error::{DomainError, Result};
use crate::job::Job;
use crate::native::WriteFlags;
use crate::ranges;
use crate::safety::check_writable;
use tracing::debug;

/// Move the pages at 0-based `page_indices` so they start at `target_index`
///
/// `target_index` must lie in `[0, total)`. It is a position among the pages
/// that stay put and is clamped to their count. Moved pages keep their
/// relative order.
pub fn reorder_pages(
    env: &OperationEnv,
    document: &DocumentRef,
    page_indices: &[usize],
    target_index: usize,
    options: &OperationOptions,
) -> Result<()> {
    OperationContext::run("reorder_pages", options, |ctx| {
        if page_indices.is_empty() {
            return Err(DomainError::invalid_argument("No page indices given"));
        }
        rebuild(env, ctx, document, |total| {
            validate_page_indices(page_indices, total)?;
            if target_index >= total as usize {
                return Err(DomainError::page_out_of_range(target_index, total as usize)
                    .with_context("argument", "target_index"));
            }
            Ok(ranges::build_permutation(total, page_indices, target_index))
        })
    })
}

/// Reverse the page order
pub fn reverse_pages(env: &OperationEnv, document: &DocumentRef, options: &OperationOptions) -> Result<()> {
    OperationContext::run("reverse_pages", options, |ctx| {
        rebuild(env, ctx, document, |total| Ok((1..=total).rev().collect()))
    })
}

/// Move one page so it ends up at 0-based position `to`
pub fn move_page(
    env: &OperationEnv,
    document: &DocumentRef,
    from: usize,
    to: usize,
    options: &OperationOptions,
) -> Result<()> {
    OperationContext::run("move_page", options, |ctx| {
        rebuild(env, ctx, document, |total| {
            validate_page_indices(&[from, to], total)?;
            Ok(ranges::build_permutation(total, &[from], to))
        })
    })
}

/// Rebuild `document` with the page order produced by `order_for`, which
/// receives the live page count
fn rebuild(
    env: &OperationEnv,
    ctx: &mut OperationContext,
    document: &DocumentRef,
    order_for: impl FnOnce(u32) -> Result<Vec<u32>>,
) -> Result<()> {
    document.validate()?;
    check_writable(document.path())?;
    ctx.checkpoint()?;

    let source = Job::open(&env.engine, document.path())?;
    let total = source.page_count()?;
    let order = order_for(total)?;
    ctx.report(10.0, "loaded");

    let order = ranges::order_string(&order);
    debug!(%order, "rebuilding page order");
    ctx.checkpoint()?;
    let output = Job::empty(&env.engine)?;
    Job::add_pages(&output, &source, Some(&order))?;
    ctx.report(60.0, "reordering");

    rewrite_in_place(env, ctx, &output, document.path(), &WriteFlags::default())?;
    ctx.report(100.0, "complete");
    Ok(())
}

#[cfg(test)]
#[path = "reorder_tests.rs"]
mod reorder_tests;
