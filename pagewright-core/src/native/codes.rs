//! Numeric status codes reported by the structural engine

use std::fmt;

/// A raw engine status code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeCode(i32);

impl NativeCode {
    pub const SUCCESS: NativeCode = NativeCode(0);
    /// Engine bug or misuse of a handle
    pub const INTERNAL: NativeCode = NativeCode(1);
    /// Operating system failure (I/O, permissions)
    pub const SYSTEM: NativeCode = NativeCode(2);
    /// Feature not available in this engine build
    pub const UNSUPPORTED: NativeCode = NativeCode(3);
    /// Missing or wrong password
    pub const PASSWORD: NativeCode = NativeCode(4);
    /// Input is damaged beyond repair
    pub const DAMAGED: NativeCode = NativeCode(5);
    /// Invalid page selection or page tree problem
    pub const PAGES: NativeCode = NativeCode(6);
    /// Object-level problem while editing
    pub const OBJECT: NativeCode = NativeCode(7);
    /// Input file does not exist
    pub const FILE_NOT_FOUND: NativeCode = NativeCode(8);
    /// Allocation failure
    pub const OUT_OF_MEMORY: NativeCode = NativeCode(9);

    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> i32 {
        self.0
    }

    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }

    /// Human-readable description used when the engine supplies no message
    pub fn describe(self) -> &'static str {
        match self {
            Self::SUCCESS => "success",
            Self::INTERNAL => "internal engine error",
            Self::SYSTEM => "system error while accessing a file",
            Self::UNSUPPORTED => "operation not supported by the engine",
            Self::PASSWORD => "document is encrypted and requires a valid password",
            Self::DAMAGED => "document is damaged or not a valid PDF",
            Self::PAGES => "invalid page selection",
            Self::OBJECT => "invalid object in document",
            Self::FILE_NOT_FOUND => "file not found",
            Self::OUT_OF_MEMORY => "engine ran out of memory",
            _ => "unknown engine error",
        }
    }
}

impl fmt::Display for NativeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.0, self.describe())
    }
}
