//! Translation of engine status codes into [`DomainError`]

use crate::error::{DomainError, ErrorCode};
use crate::native::NativeCode;

/// Domain code for a native status code
///
/// Unknown codes degrade to [`ErrorCode::EngineFailure`].
pub fn domain_code(code: NativeCode) -> ErrorCode {
    match code {
        NativeCode::FILE_NOT_FOUND => ErrorCode::FileNotFound,
        NativeCode::SYSTEM => ErrorCode::IoFailure,
        NativeCode::PASSWORD => ErrorCode::PasswordRequired,
        NativeCode::DAMAGED => ErrorCode::DocumentCorrupt,
        NativeCode::PAGES => ErrorCode::PageOperationFailed,
        NativeCode::OUT_OF_MEMORY => ErrorCode::OutOfMemory,
        NativeCode::UNSUPPORTED => ErrorCode::EngineUnsupported,
        _ => ErrorCode::EngineFailure,
    }
}

/// Build a [`DomainError`] from a native failure
///
/// The engine's message is kept verbatim when it has any content; otherwise
/// the code's own description is used. The raw code is kept under
/// `native_code`.
pub fn translate(code: NativeCode, message: Option<&str>) -> DomainError {
    let message = match message {
        Some(text) if !text.trim().is_empty() => text.to_string(),
        _ => code.describe().to_string(),
    };
    DomainError::new(domain_code(code), message).with_context("native_code", code.raw())
}
