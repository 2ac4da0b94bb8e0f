//! Invalid PDF Generators
//!
//! Generates deliberately broken inputs for error mapping tests.

use super::TestPdfBuilder;
use anyhow::Result;
use lopdf::{Dictionary, Object};
use std::fs;
use std::path::{Path, PathBuf};

/// Bytes that are not a PDF at all
pub fn write_garbage(dir: &Path, name: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, b"this is not a portable document\n")?;
    Ok(path)
}

/// A file with a PDF header and nothing else
pub fn write_header_only(dir: &Path, name: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n")?;
    Ok(path)
}

/// A zero-byte file
pub fn write_empty(dir: &Path, name: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, b"")?;
    Ok(path)
}

/// A document whose trailer names a standard security handler
pub fn write_encrypted(dir: &Path, name: &str) -> Result<PathBuf> {
    let mut doc = TestPdfBuilder::with_pages(2).build_document();
    let encrypt_id = doc.add_object(Dictionary::from_iter(vec![
        ("Filter", Object::Name(b"Standard".to_vec())),
        ("V", Object::Integer(2)),
        ("R", Object::Integer(3)),
        ("Length", Object::Integer(128)),
        ("P", Object::Integer(-3904)),
        ("O", Object::string_literal(vec![0u8; 32])),
        ("U", Object::string_literal(vec![0u8; 32])),
    ]));
    doc.trailer.set("Encrypt", Object::Reference(encrypt_id));
    doc.trailer.set(
        "ID",
        Object::Array(vec![
            Object::string_literal(vec![1u8; 16]),
            Object::string_literal(vec![1u8; 16]),
        ]),
    );

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    let path = dir.join(name);
    fs::write(&path, bytes)?;
    Ok(path)
}
