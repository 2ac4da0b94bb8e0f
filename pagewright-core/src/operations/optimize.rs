//! Size optimization

use super::{require_path, rewrite_in_place, write_output, OperationContext, OperationEnv, OperationOptions};
use crate::error::Result;
use crate::job::Job;
use crate::native::WriteFlags;
use crate::safety::{file_size, require_existing_file};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Options for optimization
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptimizeOptions {
    /// Write flags; `None` uses the mutator's configured defaults
    pub flags: Option<WriteFlags>,
}

impl OptimizeOptions {
    pub fn with_flags(mut self, flags: WriteFlags) -> Self {
        self.flags = Some(flags);
        self
    }

    pub fn with_compression(mut self, compress_streams: bool) -> Self {
        self.flags.get_or_insert_with(WriteFlags::default).compress_streams = compress_streams;
        self
    }

    pub fn with_linearization(mut self, linearize: bool) -> Self {
        self.flags.get_or_insert_with(WriteFlags::default).linearize = linearize;
        self
    }
}

/// Outcome of an optimization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub output_path: PathBuf,
    /// Size of the source in bytes
    pub original_size: u64,
    /// Size of the output in bytes
    pub optimized_size: u64,
    /// Percentage saved; negative when the output grew
    pub reduction_percentage: f64,
    pub elapsed: Duration,
}

impl OptimizationResult {
    pub fn grew(&self) -> bool {
        self.optimized_size > self.original_size
    }
}

/// `(original - optimized) / original * 100`, or 0 for an empty original
pub fn reduction_percentage(original_size: u64, optimized_size: u64) -> f64 {
    if original_size == 0 {
        return 0.0;
    }
    (original_size as f64 - optimized_size as f64) / original_size as f64 * 100.0
}

/// Rewrite `source_path` with optimization flags to `output_path`
///
/// `output_path` may be the source itself; the original is then backed up
/// and restored on failure.
pub fn optimize_pdf(
    env: &OperationEnv,
    source_path: &Path,
    output_path: &Path,
    optimize: &OptimizeOptions,
    options: &OperationOptions,
) -> Result<OptimizationResult> {
    OperationContext::run("optimize", options, |ctx| {
        require_path(output_path, "Output")?;
        require_existing_file(source_path)?;
        let flags = optimize.flags.clone().unwrap_or_else(|| env.config.optimize_flags.clone());
        let original_size = file_size(source_path)?;
        ctx.checkpoint()?;

        let job = Job::open(&env.engine, source_path)?;
        ctx.report(20.0, "loaded");

        ctx.checkpoint()?;
        ctx.report(40.0, "writing");
        let optimized_size = if same_file(source_path, output_path) {
            rewrite_in_place(env, ctx, &job, source_path, &flags)?
        } else {
            write_output(env, &job, output_path, &flags)?
        };

        let result = OptimizationResult {
            output_path: output_path.to_path_buf(),
            original_size,
            optimized_size,
            reduction_percentage: reduction_percentage(original_size, optimized_size),
            elapsed: ctx.elapsed(),
        };
        if result.grew() {
            warn!(
                original_size,
                optimized_size,
                "optimized output is larger than the source"
            );
        } else {
            info!(
                original_size,
                optimized_size,
                reduction_percentage = result.reduction_percentage,
                "document optimized"
            );
        }
        ctx.report(100.0, "complete");
        Ok(result)
    })
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
#[path = "optimize_tests.rs"]
mod optimize_tests;
