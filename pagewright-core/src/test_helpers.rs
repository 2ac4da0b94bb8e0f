//! Helpers for building small PDFs in unit tests
//!
//! Every generated page carries a `/SourcePage` integer so tests can check
//! page order after copies, deletions and reorders.

use lopdf::{Dictionary, Document, Object, Stream};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

fn content_for(label: &str) -> Vec<u8> {
    format!("BT /F1 24 Tf 72 720 Td ({label}) Tj ET").into_bytes()
}

fn font_resources(doc: &mut Document) -> Dictionary {
    let font_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
    ]));
    Dictionary::from_iter(vec![(
        "Font",
        Object::Dictionary(Dictionary::from_iter(vec![("F1", Object::Reference(font_id))])),
    )])
}

fn finish(mut doc: Document, pages_id: lopdf::ObjectId, dir: &Path, name: &str) -> PathBuf {
    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));
    let path = dir.join(name);
    doc.save(&path).unwrap();
    path
}

/// A Letter-sized PDF with `pages` labelled pages; the media box and fonts
/// are inherited from the page tree root
pub fn write_labelled_pdf(dir: &Path, name: &str, pages: u32) -> PathBuf {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let resources = font_resources(&mut doc);

    let mut kids = Vec::new();
    for number in 1..=pages {
        let content_id = doc.add_object(Stream::new(
            Dictionary::new(),
            content_for(&format!("Page {number}")),
        ));
        let page_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("Contents", Object::Reference(content_id)),
            ("SourcePage", Object::Integer(i64::from(number))),
        ]));
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(i64::from(pages))),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(612),
                    Object::Integer(792),
                ]),
            ),
            ("Resources", Object::Dictionary(resources)),
        ])),
    );
    finish(doc, pages_id, dir, name)
}

/// One page per size; each page sits under its own intermediate node that
/// carries the media box
pub fn write_sized_pdf(dir: &Path, name: &str, sizes: &[(f32, f32)]) -> PathBuf {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for (index, &(width, height)) in sizes.iter().enumerate() {
        let node_id = doc.new_object_id();
        let content_id = doc.add_object(Stream::new(
            Dictionary::new(),
            content_for(&format!("{width}x{height}")),
        ));
        let page_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(node_id)),
            ("Contents", Object::Reference(content_id)),
            ("SourcePage", Object::Integer(index as i64 + 1)),
        ]));
        doc.objects.insert(
            node_id,
            Object::Dictionary(Dictionary::from_iter(vec![
                ("Type", Object::Name(b"Pages".to_vec())),
                ("Parent", Object::Reference(pages_id)),
                ("Kids", Object::Array(vec![Object::Reference(page_id)])),
                ("Count", Object::Integer(1)),
                (
                    "MediaBox",
                    Object::Array(vec![
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Real(width),
                        Object::Real(height),
                    ]),
                ),
            ])),
        );
        kids.push(Object::Reference(node_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(sizes.len() as i64)),
        ])),
    );
    finish(doc, pages_id, dir, name)
}

/// `/SourcePage` of every page in order; pages without one read as 0
pub fn source_pages(path: &Path) -> Vec<i64> {
    let doc = Document::load(path).unwrap();
    doc.get_pages()
        .values()
        .map(|&id| {
            doc.get_dictionary(id)
                .and_then(|page| page.get(b"SourcePage"))
                .and_then(Object::as_i64)
                .unwrap_or(0)
        })
        .collect()
}

/// Effective rotation of every page in order
pub fn page_rotations(path: &Path) -> Vec<i64> {
    let doc = Document::load(path).unwrap();
    doc.get_pages()
        .values()
        .map(|&id| {
            doc.get_dictionary(id)
                .and_then(|page| page.get(b"Rotate"))
                .and_then(Object::as_i64)
                .unwrap_or(0)
        })
        .collect()
}

/// Page count of a PDF on disk
pub fn page_count(path: &Path) -> usize {
    Document::load(path).unwrap().get_pages().len()
}

/// Effective media box width and height of every page in order
pub fn page_sizes(path: &Path) -> Vec<(f64, f64)> {
    let doc = Document::load(path).unwrap();
    let number = |object: &Object| match object {
        Object::Integer(value) => *value as f64,
        Object::Real(value) => f64::from(*value),
        other => panic!("not a number: {other:?}"),
    };
    doc.get_pages()
        .values()
        .map(|&id| {
            let mut node = doc.get_dictionary(id).unwrap();
            let media_box = loop {
                if let Ok(Object::Array(items)) = node.get(b"MediaBox") {
                    break items.clone();
                }
                let parent = node.get(b"Parent").and_then(Object::as_reference).unwrap();
                node = doc.get_dictionary(parent).unwrap();
            };
            (
                number(&media_box[2]) - number(&media_box[0]),
                number(&media_box[3]) - number(&media_box[1]),
            )
        })
        .collect()
}

/// A single-page PDF with a large uncompressed content stream and an
/// unreferenced object
pub fn write_bloated_pdf(dir: &Path, name: &str) -> PathBuf {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let content = "BT /F1 12 Tf 72 720 Td (All work and no play) Tj ET\n".repeat(400);
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));
    doc.add_object(Stream::new(Dictionary::new(), vec![b'x'; 4096]));
    let page_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Page".to_vec())),
        ("Parent", Object::Reference(pages_id)),
        ("Contents", Object::Reference(content_id)),
        ("SourcePage", Object::Integer(1)),
    ]));
    doc.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(vec![Object::Reference(page_id)])),
            ("Count", Object::Integer(1)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(612),
                    Object::Integer(792),
                ]),
            ),
        ])),
    );
    finish(doc, pages_id, dir, name)
}

/// A labelled PDF whose page `from` (1-based) carries a Link annotation
/// pointing at page `to`
pub fn write_linked_pdf(dir: &Path, name: &str, pages: u32, from: u32, to: u32) -> PathBuf {
    let path = write_labelled_pdf(dir, name, pages);
    let mut doc = Document::load(&path).unwrap();
    let page_ids = doc.get_pages();
    let (from_id, to_id) = (page_ids[&from], page_ids[&to]);

    let link_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Annot".to_vec())),
        ("Subtype", Object::Name(b"Link".to_vec())),
        (
            "Rect",
            Object::Array(vec![
                Object::Integer(72),
                Object::Integer(700),
                Object::Integer(200),
                Object::Integer(720),
            ]),
        ),
        ("P", Object::Reference(from_id)),
        (
            "Dest",
            Object::Array(vec![Object::Reference(to_id), Object::Name(b"Fit".to_vec())]),
        ),
    ]));
    doc.get_object_mut(from_id)
        .and_then(Object::as_dict_mut)
        .unwrap()
        .set("Annots", Object::Array(vec![Object::Reference(link_id)]));
    doc.save(&path).unwrap();
    path
}

/// For every page with a Link annotation: its `/SourcePage`, the
/// `/SourcePage` of the tree page its destination names (`None` when the
/// destination is not a page in the tree) and whether `/P` names the page
/// itself
pub fn link_targets(path: &Path) -> Vec<(i64, Option<i64>, bool)> {
    let doc = Document::load(path).unwrap();
    let pages = doc.get_pages();
    let label = |id| {
        doc.get_dictionary(id)
            .and_then(|page| page.get(b"SourcePage"))
            .and_then(Object::as_i64)
            .unwrap_or(0)
    };

    let mut links = Vec::new();
    for &page_id in pages.values() {
        let page = doc.get_dictionary(page_id).unwrap();
        let Ok(Object::Array(annots)) = page.get(b"Annots") else {
            continue;
        };
        for annot in annots {
            let annot = match annot {
                Object::Reference(id) => doc.get_dictionary(*id).unwrap(),
                Object::Dictionary(dict) => dict,
                other => panic!("not an annotation: {other:?}"),
            };
            let dest = match annot.get(b"Dest") {
                Ok(Object::Array(items)) => items.first().and_then(|first| first.as_reference().ok()),
                _ => None,
            };
            let target = dest
                .filter(|id| pages.values().any(|page| page == id))
                .map(label);
            let own_page = annot.get(b"P").and_then(Object::as_reference).ok() == Some(page_id);
            links.push((label(page_id), target, own_page));
        }
    }
    links
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` under a thread-local subscriber and return what it logged
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let value = tracing::subscriber::with_default(subscriber, f);
    let logs = String::from_utf8_lossy(&buffer.0.lock().unwrap()).into_owned();
    (value, logs)
}
