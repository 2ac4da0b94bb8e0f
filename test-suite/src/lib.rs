//! Test Suite for pagewright
//!
//! Integration tests drive the public async API against PDFs generated on
//! the fly. This crate holds the generators and shared utilities.

pub mod generators;

pub use generators::{invalid_pdfs, TestPdfBuilder};

/// Common test utilities
pub mod utils {
    use lopdf::{Document, Object};
    use std::path::Path;
    use std::sync::Once;

    static TRACING: Once = Once::new();

    /// Install a test subscriber once; `RUST_LOG` selects the level
    pub fn init_tracing() {
        TRACING.call_once(|| {
            let filter = tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_test_writer()
                .try_init();
        });
    }

    /// Create a temporary directory for test outputs
    pub fn create_test_output_dir() -> anyhow::Result<tempfile::TempDir> {
        Ok(tempfile::tempdir()?)
    }

    /// Label of every page in document order; unlabelled pages read as 0
    pub fn page_labels<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<i64>> {
        read_page_integers(path.as_ref(), b"SourcePage")
    }

    /// `/Rotate` of every page in document order
    pub fn page_rotations<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<i64>> {
        read_page_integers(path.as_ref(), b"Rotate")
    }

    /// Number of pages in a PDF on disk
    pub fn page_count<P: AsRef<Path>>(path: P) -> anyhow::Result<usize> {
        Ok(Document::load(path.as_ref())?.get_pages().len())
    }

    fn read_page_integers(path: &Path, key: &[u8]) -> anyhow::Result<Vec<i64>> {
        let doc = Document::load(path)?;
        let mut values = Vec::new();
        for id in doc.get_pages().into_values() {
            let page = doc.get_dictionary(id)?;
            values.push(page.get(key).and_then(Object::as_i64).unwrap_or(0));
        }
        Ok(values)
    }
}
