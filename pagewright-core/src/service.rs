//! Async entry point
//!
//! [`DocumentMutator`] runs each operation on tokio's blocking pool so engine
//! calls never stall the caller's executor. Panics inside an operation are
//! caught at this boundary and come back as `UNEXPECTED_ERROR`.

use crate::config::MutatorConfig;
use crate::document::DocumentRef;
use crate::error::{DomainError, ErrorCode, Result};
use crate::job::SharedEngine;
use crate::operations::{
    self, OperationEnv, OperationOptions, OptimizationResult, OptimizeOptions, PageSize,
    RotationAngle,
};
use std::any::Any;
use std::path::PathBuf;
use tracing::error;

/// Page mutation service over a shared structural engine
#[derive(Debug, Clone)]
pub struct DocumentMutator {
    env: OperationEnv,
}

impl DocumentMutator {
    /// Create a mutator with the default configuration
    pub fn new(engine: SharedEngine) -> Result<Self> {
        Self::with_config(engine, MutatorConfig::default())
    }

    /// Create a mutator; the engine must already be initialized
    pub fn with_config(engine: SharedEngine, config: MutatorConfig) -> Result<Self> {
        if !engine.is_initialized() {
            return Err(DomainError::new(
                ErrorCode::EngineNotInitialized,
                "Structural engine has not been initialized",
            ));
        }
        Ok(Self {
            env: OperationEnv::new(engine, config),
        })
    }

    pub fn config(&self) -> &MutatorConfig {
        &self.env.config
    }

    async fn run_blocking<T, F>(&self, operation: &'static str, body: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&OperationEnv) -> Result<T> + Send + 'static,
    {
        let env = self.env.clone();
        match tokio::task::spawn_blocking(move || body(&env)).await {
            Ok(result) => result,
            Err(join_error) if join_error.is_panic() => {
                let error = panic_error(join_error.into_panic()).with_context("operation", operation);
                error!(operation, %error, "operation panicked");
                Err(error)
            }
            Err(join_error) => Err(DomainError::unexpected("JoinError", join_error.to_string())
                .with_context("operation", operation)),
        }
    }

    pub async fn merge(
        &self,
        sources: Vec<PathBuf>,
        output_path: PathBuf,
        options: OperationOptions,
    ) -> Result<PathBuf> {
        self.run_blocking("merge", move |env| {
            operations::merge_pdfs(env, &sources, &output_path, &options)
        })
        .await
    }

    pub async fn split(
        &self,
        source_path: PathBuf,
        range: String,
        output_path: PathBuf,
        options: OperationOptions,
    ) -> Result<PathBuf> {
        self.run_blocking("split", move |env| {
            operations::split_pdf(env, &source_path, &range, &output_path, &options)
        })
        .await
    }

    pub async fn split_into_chunks(
        &self,
        source_path: PathBuf,
        chunk_size: usize,
        output_dir: PathBuf,
        options: OperationOptions,
    ) -> Result<Vec<PathBuf>> {
        self.run_blocking("split_into_chunks", move |env| {
            operations::split_into_chunks(env, &source_path, chunk_size, &output_dir, &options)
        })
        .await
    }

    pub async fn extract_pages(
        &self,
        source_path: PathBuf,
        page_indices: Vec<usize>,
        output_path: PathBuf,
        options: OperationOptions,
    ) -> Result<PathBuf> {
        self.run_blocking("extract_pages", move |env| {
            operations::extract_pages(env, &source_path, &page_indices, &output_path, &options)
        })
        .await
    }

    pub async fn optimize(
        &self,
        source_path: PathBuf,
        output_path: PathBuf,
        optimize: OptimizeOptions,
        options: OperationOptions,
    ) -> Result<OptimizationResult> {
        self.run_blocking("optimize", move |env| {
            operations::optimize_pdf(env, &source_path, &output_path, &optimize, &options)
        })
        .await
    }

    pub async fn rotate_pages(
        &self,
        document: DocumentRef,
        page_indices: Vec<usize>,
        angle: RotationAngle,
        options: OperationOptions,
    ) -> Result<()> {
        self.run_blocking("rotate_pages", move |env| {
            operations::rotate_pages(env, &document, &page_indices, angle, &options)
        })
        .await
    }

    pub async fn delete_pages(
        &self,
        document: DocumentRef,
        page_indices: Vec<usize>,
        options: OperationOptions,
    ) -> Result<()> {
        self.run_blocking("delete_pages", move |env| {
            operations::delete_pages(env, &document, &page_indices, &options)
        })
        .await
    }

    pub async fn reorder_pages(
        &self,
        document: DocumentRef,
        page_indices: Vec<usize>,
        target_index: usize,
        options: OperationOptions,
    ) -> Result<()> {
        self.run_blocking("reorder_pages", move |env| {
            operations::reorder_pages(env, &document, &page_indices, target_index, &options)
        })
        .await
    }

    pub async fn reverse_pages(&self, document: DocumentRef, options: OperationOptions) -> Result<()> {
        self.run_blocking("reverse_pages", move |env| {
            operations::reverse_pages(env, &document, &options)
        })
        .await
    }

    pub async fn move_page(
        &self,
        document: DocumentRef,
        from: usize,
        to: usize,
        options: OperationOptions,
    ) -> Result<()> {
        self.run_blocking("move_page", move |env| {
            operations::move_page(env, &document, from, to, &options)
        })
        .await
    }

    pub async fn insert_blank_page(
        &self,
        document: DocumentRef,
        insert_at_index: usize,
        page_size: PageSize,
        options: OperationOptions,
    ) -> Result<()> {
        self.run_blocking("insert_blank_page", move |env| {
            operations::insert_blank_page(env, &document, insert_at_index, page_size, &options)
        })
        .await
    }
}

fn panic_error(payload: Box<dyn Any + Send>) -> DomainError {
    let (type_name, message) = if let Some(message) = payload.downcast_ref::<&'static str>() {
        ("&str", (*message).to_string())
    } else if let Some(message) = payload.downcast_ref::<String>() {
        ("String", message.clone())
    } else if let Some(error) = payload.downcast_ref::<DomainError>() {
        ("DomainError", error.to_string())
    } else {
        ("unknown", "operation panicked".to_string())
    };
    DomainError::unexpected("panic", format!("Unexpected failure: {message}"))
        .with_context("panic_payload", type_name)
}
