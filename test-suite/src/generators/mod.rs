//! PDF Test Generators
//!
//! Builds small PDFs with lopdf so tests never depend on checked-in fixtures.

pub mod invalid_pdfs;
pub mod test_pdf_builder;

pub use test_pdf_builder::{PageSpec, TestPdfBuilder};
