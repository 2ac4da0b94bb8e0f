//! Page rotation

use super::{rewrite_in_place, validate_page_indices, OperationContext, OperationEnv, OperationOptions};
use crate::document::DocumentRef;
use crate::error::{DomainError, ErrorCode, Result};
use crate::job::Job;
use crate::native::WriteFlags;
use crate::safety::check_writable;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Rotation angle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RotationAngle {
    /// No rotation (0 degrees)
    None,
    /// 90 degrees clockwise
    Clockwise90,
    /// 180 degrees
    Rotate180,
    /// 270 degrees clockwise (90 degrees counter-clockwise)
    Clockwise270,
}

impl RotationAngle {
    /// Create from any multiple of 90; negative values are normalized
    pub fn from_degrees(degrees: i32) -> Result<Self> {
        match degrees.rem_euclid(360) {
            0 => Ok(RotationAngle::None),
            90 => Ok(RotationAngle::Clockwise90),
            180 => Ok(RotationAngle::Rotate180),
            270 => Ok(RotationAngle::Clockwise270),
            _ => Err(DomainError::new(
                ErrorCode::InvalidRotation,
                format!("Invalid rotation angle: {degrees} (must be a multiple of 90)"),
            )
            .with_context("degrees", degrees)),
        }
    }

    pub fn to_degrees(self) -> i32 {
        match self {
            RotationAngle::None => 0,
            RotationAngle::Clockwise90 => 90,
            RotationAngle::Rotate180 => 180,
            RotationAngle::Clockwise270 => 270,
        }
    }

    /// Combine two rotations
    pub fn combine(self, other: RotationAngle) -> RotationAngle {
        match (self.to_degrees() + other.to_degrees()) % 360 {
            90 => RotationAngle::Clockwise90,
            180 => RotationAngle::Rotate180,
            270 => RotationAngle::Clockwise270,
            _ => RotationAngle::None,
        }
    }
}

impl fmt::Display for RotationAngle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.to_degrees())
    }
}

/// Rotate the pages at 0-based `page_indices` by `angle`, relative to their
/// current rotation, and write the document back in place
///
/// Every index is validated before the first page is touched.
pub fn rotate_pages(
    env: &OperationEnv,
    document: &DocumentRef,
    page_indices: &[usize],
    angle: RotationAngle,
    options: &OperationOptions,
) -> Result<()> {
    OperationContext::run("rotate_pages", options, |ctx| {
        document.validate()?;
        if page_indices.is_empty() {
            return Err(DomainError::invalid_argument("No page indices given"));
        }
        check_writable(document.path())?;
        ctx.checkpoint()?;

        let job = Job::open(&env.engine, document.path())?;
        let total = job.page_count()?;
        validate_page_indices(page_indices, total)?;
        ctx.report(10.0, "loaded");

        let step = 80.0 / page_indices.len() as f64;
        for &index in page_indices {
            ctx.checkpoint()?;
            job.rotate_page(index as u32 + 1, angle)?;
            ctx.advance(step, "rotating");
        }
        debug!(pages = page_indices.len(), %angle, "pages rotated");

        ctx.report(90.0, "writing");
        rewrite_in_place(env, ctx, &job, document.path(), &WriteFlags::default())?;
        ctx.report(100.0, "complete");
        Ok(())
    })
}

#[cfg(test)]
#[path = "rotate_tests.rs"]
mod rotate_tests;
