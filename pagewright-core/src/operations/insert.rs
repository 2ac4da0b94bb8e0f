//! Blank page insertion

use super::{rewrite_in_place, OperationContext, OperationEnv, OperationOptions};
use crate::document::DocumentRef;
use crate::error::{DomainError, Result};
use crate::job::Job;
use crate::native::{MediaBox, WriteFlags};
use crate::safety::check_writable;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Size of an inserted page
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum PageSize {
    /// US Letter, 612 x 792
    Letter,
    /// A4, 595 x 842
    A4,
    /// US Legal, 612 x 1008
    Legal,
    /// Explicit media box
    Custom(MediaBox),
    /// Same as the page before the insertion point (page 1 when inserting
    /// at the front)
    #[default]
    SameAsCurrent,
}

impl PageSize {
    /// Fixed media box, or `None` for [`PageSize::SameAsCurrent`]
    pub fn media_box(&self) -> Option<MediaBox> {
        match self {
            PageSize::Letter => Some(MediaBox::new(0.0, 0.0, 612.0, 792.0)),
            PageSize::A4 => Some(MediaBox::new(0.0, 0.0, 595.0, 842.0)),
            PageSize::Legal => Some(MediaBox::new(0.0, 0.0, 612.0, 1008.0)),
            PageSize::Custom(media_box) => Some(*media_box),
            PageSize::SameAsCurrent => None,
        }
    }
}

/// Insert a blank page so it lands at 0-based `insert_at_index`
///
/// `insert_at_index` may equal the page count, which appends.
pub fn insert_blank_page(
    env: &OperationEnv,
    document: &DocumentRef,
    insert_at_index: usize,
    page_size: PageSize,
    options: &OperationOptions,
) -> Result<()> {
    OperationContext::run("insert_blank_page", options, |ctx| {
        document.validate()?;
        if let Some(media_box) = page_size.media_box() {
            if !(media_box.width() > 0.0 && media_box.height() > 0.0) {
                return Err(DomainError::invalid_argument(format!(
                    "Page size must be positive, got {} x {}",
                    media_box.width(),
                    media_box.height()
                )));
            }
        }
        check_writable(document.path())?;
        ctx.checkpoint()?;

        let job = Job::open(&env.engine, document.path())?;
        let total = job.page_count()? as usize;
        if insert_at_index > total {
            return Err(DomainError::page_out_of_range(insert_at_index, total));
        }
        ctx.report(10.0, "loaded");

        let media_box = match page_size.media_box() {
            Some(media_box) => media_box,
            None => {
                let reference = insert_at_index.max(1) as u32;
                job.media_box(reference)?
            }
        };

        ctx.checkpoint()?;
        let position = insert_at_index as u32 + 1;
        job.insert_blank_page(position, media_box)?;
        debug!(position, width = media_box.width(), height = media_box.height(), "blank page inserted");
        ctx.report(60.0, "inserting");

        rewrite_in_place(env, ctx, &job, document.path(), &WriteFlags::default())?;
        ctx.report(100.0, "complete");
        Ok(())
    })
}

#[cfg(test)]
#[path = "insert_tests.rs"]
mod insert_tests;
