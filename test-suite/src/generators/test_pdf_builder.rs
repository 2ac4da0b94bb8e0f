//! Test PDF Builder
//!
//! A builder for creating test PDFs with specific page layouts. Every page
//! carries a `/SourcePage` label (its 1-based position in the built file) so
//! tests can follow pages through merges, splits and reorders.

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::path::{Path, PathBuf};

/// One page of a test document
#[derive(Debug, Clone, PartialEq)]
pub struct PageSpec {
    pub width: f32,
    pub height: f32,
    pub rotation: i64,
    pub text: String,
}

impl PageSpec {
    pub fn letter(text: impl Into<String>) -> Self {
        Self {
            width: 612.0,
            height: 792.0,
            rotation: 0,
            text: text.into(),
        }
    }
}

/// Builder for creating test PDFs
#[derive(Debug, Clone)]
pub struct TestPdfBuilder {
    version: String,
    pages: Vec<PageSpec>,
    label_offset: i64,
    padding: usize,
    orphan_objects: usize,
    title: Option<String>,
}

impl Default for TestPdfBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestPdfBuilder {
    /// Create a new PDF builder with no pages
    pub fn new() -> Self {
        Self {
            version: "1.7".to_string(),
            pages: Vec::new(),
            label_offset: 0,
            padding: 0,
            orphan_objects: 0,
            title: None,
        }
    }

    /// `count` Letter pages with text "Page N"
    pub fn with_pages(count: usize) -> Self {
        let mut builder = Self::new();
        for number in 1..=count {
            builder.add_page(PageSpec::letter(format!("Page {number}")));
        }
        builder
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    /// Start page labels at `offset + 1`; handy for telling merge inputs apart
    pub fn with_label_offset(mut self, offset: i64) -> Self {
        self.label_offset = offset;
        self
    }

    /// Repeat each content stream line `lines` times, uncompressed
    pub fn with_padding(mut self, lines: usize) -> Self {
        self.padding = lines;
        self
    }

    /// Add streams nothing references
    pub fn with_orphan_objects(mut self, count: usize) -> Self {
        self.orphan_objects = count;
        self
    }

    pub fn add_page(&mut self, page: PageSpec) -> &mut Self {
        self.pages.push(page);
        self
    }

    pub fn add_sized_page(&mut self, width: f32, height: f32) -> &mut Self {
        let text = format!("{width}x{height}");
        self.add_page(PageSpec {
            width,
            height,
            rotation: 0,
            text,
        })
    }

    pub fn add_rotated_page(&mut self, rotation: i64) -> &mut Self {
        let mut page = PageSpec::letter(format!("Rotated {rotation}"));
        page.rotation = rotation;
        self.add_page(page)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Assemble the lopdf document
    pub fn build_document(&self) -> Document {
        let mut doc = Document::with_version(self.version.as_str());
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type1".to_vec())),
            ("BaseFont", Object::Name(b"Helvetica".to_vec())),
        ]));

        let mut kids = Vec::with_capacity(self.pages.len());
        for (index, page) in self.pages.iter().enumerate() {
            let page_id = self.add_page_object(&mut doc, pages_id, page, index as i64 + 1);
            kids.push(Object::Reference(page_id));
        }

        for _ in 0..self.orphan_objects {
            doc.add_object(Stream::new(Dictionary::new(), vec![b'0'; 2048]));
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(Dictionary::from_iter(vec![
                ("Type", Object::Name(b"Pages".to_vec())),
                ("Kids", Object::Array(kids)),
                ("Count", Object::Integer(self.pages.len() as i64)),
                (
                    "Resources",
                    Object::Dictionary(Dictionary::from_iter(vec![(
                        "Font",
                        Object::Dictionary(Dictionary::from_iter(vec![(
                            "F1",
                            Object::Reference(font_id),
                        )])),
                    )])),
                ),
            ])),
        );
        let catalog_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        if let Some(title) = &self.title {
            let info_id = doc.add_object(Dictionary::from_iter(vec![(
                "Title",
                Object::string_literal(title.as_str()),
            )]));
            doc.trailer.set("Info", Object::Reference(info_id));
        }
        doc
    }

    fn add_page_object(&self, doc: &mut Document, parent: ObjectId, page: &PageSpec, number: i64) -> ObjectId {
        let line = format!("BT /F1 18 Tf 72 720 Td ({}) Tj ET\n", page.text);
        let content = line.repeat(self.padding.max(1));
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

        let mut dict = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(parent)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(page.width),
                    Object::Real(page.height),
                ]),
            ),
            ("Contents", Object::Reference(content_id)),
            ("SourcePage", Object::Integer(self.label_offset + number)),
        ]);
        if page.rotation != 0 {
            dict.set("Rotate", Object::Integer(page.rotation));
        }
        doc.add_object(dict)
    }

    /// Serialize to bytes
    pub fn build(&self) -> anyhow::Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.build_document().save_to(&mut bytes)?;
        Ok(bytes)
    }

    /// Write to `dir/name` and return the path
    pub fn write_to(&self, dir: &Path, name: &str) -> anyhow::Result<PathBuf> {
        let path = dir.join(name);
        std::fs::write(&path, self.build()?)?;
        Ok(path)
    }
}
