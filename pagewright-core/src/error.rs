//! Domain error taxonomy
//!
//! Every failure leaving this crate is a [`DomainError`]: a stable
//! machine-readable [`ErrorCode`], the [`ErrorCategory`] it belongs to, a
//! severity, a human-readable message, and a bag of diagnostic context
//! (file path, page indices, page counts, correlation id).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Result type used across the mutation engine
pub type Result<T> = std::result::Result<T, DomainError>;

/// Broad classification of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    /// Bad input: paths, ranges, options, page indices
    Validation,
    /// File system failures and output verification
    Io,
    /// Password-protected or encrypted input
    Security,
    /// Engine failures, out-of-memory, unexpected errors
    System,
    /// Caller-requested abort
    Cancelled,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCategory::Validation => "validation",
            ErrorCategory::Io => "io",
            ErrorCategory::Security => "security",
            ErrorCategory::System => "system",
            ErrorCategory::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// How serious a failure is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

/// Stable error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation
    InvalidArgument,
    InvalidPageRange,
    PageOutOfRange,
    InsufficientSources,
    CannotDeleteAllPages,
    InvalidRotation,
    DocumentCorrupt,
    PageOperationFailed,
    // IO
    FileNotFound,
    IoFailure,
    FileReadOnly,
    OutputMissing,
    OutputEmpty,
    // Security
    PasswordRequired,
    // System
    OutOfMemory,
    EngineUnsupported,
    EngineFailure,
    EngineNotInitialized,
    UnexpectedError,
    // Cancelled
    Cancelled,
}

impl ErrorCode {
    /// Wire representation of the code
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidArgument => "INVALID_ARGUMENT",
            ErrorCode::InvalidPageRange => "INVALID_PAGE_RANGE",
            ErrorCode::PageOutOfRange => "PAGE_OUT_OF_RANGE",
            ErrorCode::InsufficientSources => "INSUFFICIENT_SOURCES",
            ErrorCode::CannotDeleteAllPages => "CANNOT_DELETE_ALL_PAGES",
            ErrorCode::InvalidRotation => "INVALID_ROTATION",
            ErrorCode::DocumentCorrupt => "DOCUMENT_CORRUPT",
            ErrorCode::PageOperationFailed => "PAGE_OPERATION_FAILED",
            ErrorCode::FileNotFound => "FILE_NOT_FOUND",
            ErrorCode::IoFailure => "IO_FAILURE",
            ErrorCode::FileReadOnly => "FILE_READ_ONLY",
            ErrorCode::OutputMissing => "OUTPUT_MISSING",
            ErrorCode::OutputEmpty => "OUTPUT_EMPTY",
            ErrorCode::PasswordRequired => "PASSWORD_REQUIRED",
            ErrorCode::OutOfMemory => "OUT_OF_MEMORY",
            ErrorCode::EngineUnsupported => "ENGINE_UNSUPPORTED",
            ErrorCode::EngineFailure => "ENGINE_FAILURE",
            ErrorCode::EngineNotInitialized => "ENGINE_NOT_INITIALIZED",
            ErrorCode::UnexpectedError => "UNEXPECTED_ERROR",
            ErrorCode::Cancelled => "CANCELLED",
        }
    }

    /// Category this code belongs to
    pub fn category(self) -> ErrorCategory {
        match self {
            ErrorCode::InvalidArgument
            | ErrorCode::InvalidPageRange
            | ErrorCode::PageOutOfRange
            | ErrorCode::InsufficientSources
            | ErrorCode::CannotDeleteAllPages
            | ErrorCode::InvalidRotation
            | ErrorCode::DocumentCorrupt
            | ErrorCode::PageOperationFailed => ErrorCategory::Validation,
            ErrorCode::FileNotFound
            | ErrorCode::IoFailure
            | ErrorCode::FileReadOnly
            | ErrorCode::OutputMissing
            | ErrorCode::OutputEmpty => ErrorCategory::Io,
            ErrorCode::PasswordRequired => ErrorCategory::Security,
            ErrorCode::OutOfMemory
            | ErrorCode::EngineUnsupported
            | ErrorCode::EngineFailure
            | ErrorCode::EngineNotInitialized
            | ErrorCode::UnexpectedError => ErrorCategory::System,
            ErrorCode::Cancelled => ErrorCategory::Cancelled,
        }
    }

    /// Severity assigned when the caller does not override it
    pub fn default_severity(self) -> ErrorSeverity {
        match self {
            ErrorCode::Cancelled => ErrorSeverity::Info,
            ErrorCode::InvalidPageRange
            | ErrorCode::PageOutOfRange
            | ErrorCode::CannotDeleteAllPages
            | ErrorCode::InvalidRotation
            | ErrorCode::PageOperationFailed => ErrorSeverity::Warning,
            ErrorCode::OutOfMemory | ErrorCode::EngineNotInitialized => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure returned by every public operation
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{message} [{code}]")]
pub struct DomainError {
    code: ErrorCode,
    category: ErrorCategory,
    severity: ErrorSeverity,
    message: String,
    context: BTreeMap<String, Value>,
    occurred_at: DateTime<Utc>,
}

impl DomainError {
    /// Create an error; category and severity follow from the code
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            category: code.category(),
            severity: code.default_severity(),
            message: message.into(),
            context: BTreeMap::new(),
            occurred_at: Utc::now(),
        }
    }

    /// Shorthand for an [`ErrorCode::InvalidArgument`] error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidArgument, message)
    }

    /// Shorthand for an [`ErrorCode::InvalidPageRange`] error
    pub fn invalid_range(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidPageRange, message)
    }

    /// A page index outside the document
    pub fn page_out_of_range(index: usize, total_pages: usize) -> Self {
        Self::new(
            ErrorCode::PageOutOfRange,
            format!("Page index {index} out of bounds (document has {total_pages} pages)"),
        )
        .with_context("page_index", index)
        .with_context("total_pages", total_pages)
    }

    /// The caller requested cancellation
    pub fn cancelled() -> Self {
        Self::new(ErrorCode::Cancelled, "Operation cancelled")
    }

    /// Wrap an unexpected failure, keeping the original type name
    pub fn unexpected(type_name: &str, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::UnexpectedError, message).with_context("exception_type", type_name)
    }

    /// Wrap a file system error raised while touching `path`
    pub fn io(code: ErrorCode, path: &Path, err: &std::io::Error) -> Self {
        Self::new(code, format!("{}: {err}", path.display()))
            .with_path(path)
            .with_context("io_kind", format!("{:?}", err.kind()))
    }

    /// Attach a diagnostic key/value pair
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Attach a file path under the `path` key
    pub fn with_path(self, path: &Path) -> Self {
        self.with_context("path", path.display().to_string())
    }

    /// Override the default severity
    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = severity;
        self
    }

    /// Attach context only if the key is not already present
    pub(crate) fn with_context_if_absent(
        mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.context.entry(key.into()).or_insert_with(|| value.into());
        self
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    pub fn severity(&self) -> ErrorSeverity {
        self.severity
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn context(&self) -> &BTreeMap<String, Value> {
        &self.context
    }

    /// Look up one context value
    pub fn context_value(&self, key: &str) -> Option<&Value> {
        self.context.get(key)
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn is_cancelled(&self) -> bool {
        self.code == ErrorCode::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoError, ErrorKind};

    #[test]
    fn test_domain_error_display() {
        let error = DomainError::invalid_range("Start 5 is greater than end 2");
        assert_eq!(
            error.to_string(),
            "Start 5 is greater than end 2 [INVALID_PAGE_RANGE]"
        );
    }

    #[test]
    fn test_category_follows_code() {
        let cases = [
            (ErrorCode::InvalidPageRange, ErrorCategory::Validation),
            (ErrorCode::DocumentCorrupt, ErrorCategory::Validation),
            (ErrorCode::FileNotFound, ErrorCategory::Io),
            (ErrorCode::OutputMissing, ErrorCategory::Io),
            (ErrorCode::PasswordRequired, ErrorCategory::Security),
            (ErrorCode::OutOfMemory, ErrorCategory::System),
            (ErrorCode::UnexpectedError, ErrorCategory::System),
            (ErrorCode::Cancelled, ErrorCategory::Cancelled),
        ];

        for (code, category) in cases {
            assert_eq!(DomainError::new(code, "x").category(), category, "{code}");
        }
    }

    #[test]
    fn test_default_severity() {
        assert_eq!(DomainError::cancelled().severity(), ErrorSeverity::Info);
        assert_eq!(
            DomainError::page_out_of_range(3, 2).severity(),
            ErrorSeverity::Warning
        );
        assert_eq!(
            DomainError::new(ErrorCode::OutOfMemory, "oom").severity(),
            ErrorSeverity::Critical
        );
        assert_eq!(
            DomainError::new(ErrorCode::FileNotFound, "missing")
                .with_severity(ErrorSeverity::Critical)
                .severity(),
            ErrorSeverity::Critical
        );
    }

    #[test]
    fn test_context_accumulates() {
        let error = DomainError::page_out_of_range(7, 5)
            .with_context("correlation_id", "abc")
            .with_path(Path::new("/tmp/doc.pdf"));

        assert_eq!(error.context_value("page_index"), Some(&Value::from(7)));
        assert_eq!(error.context_value("total_pages"), Some(&Value::from(5)));
        assert_eq!(error.context_value("correlation_id"), Some(&Value::from("abc")));
        assert_eq!(
            error.context_value("path"),
            Some(&Value::from("/tmp/doc.pdf"))
        );
    }

    #[test]
    fn test_context_if_absent_keeps_existing() {
        let error = DomainError::cancelled()
            .with_context("correlation_id", "first")
            .with_context_if_absent("correlation_id", "second");
        assert_eq!(
            error.context_value("correlation_id"),
            Some(&Value::from("first"))
        );
    }

    #[test]
    fn test_unexpected_keeps_type_name() {
        let error = DomainError::unexpected("std::io::Error", "disk exploded");
        assert_eq!(error.code(), ErrorCode::UnexpectedError);
        assert_eq!(error.category(), ErrorCategory::System);
        assert_eq!(
            error.context_value("exception_type"),
            Some(&Value::from("std::io::Error"))
        );
    }

    #[test]
    fn test_io_error_context() {
        let io_error = IoError::new(ErrorKind::PermissionDenied, "access denied");
        let error = DomainError::io(ErrorCode::IoFailure, Path::new("out.pdf"), &io_error);

        assert!(error.message().contains("access denied"));
        assert_eq!(
            error.context_value("io_kind"),
            Some(&Value::from("PermissionDenied"))
        );
    }

    #[test]
    fn test_serializes_stable_code() {
        let error = DomainError::new(ErrorCode::CannotDeleteAllPages, "no");
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["code"], "CANNOT_DELETE_ALL_PAGES");
        assert_eq!(json["category"], "VALIDATION");
        assert_eq!(json["severity"], "WARNING");
    }

    #[test]
    fn test_code_strings_match_serde() {
        for code in [
            ErrorCode::InvalidArgument,
            ErrorCode::FileReadOnly,
            ErrorCode::EngineNotInitialized,
            ErrorCode::Cancelled,
        ] {
            let json = serde_json::to_value(code).unwrap();
            assert_eq!(json, Value::from(code.as_str()));
        }
    }

    #[test]
    fn test_error_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DomainError>();
    }
}
