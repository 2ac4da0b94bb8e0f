//! Structural engine backed by lopdf
//!
//! Every job owns one in-memory [`lopdf::Document`]. Page copies between jobs
//! are deep: the page dictionary and everything reachable from it (content
//! streams, resources, annotations) are cloned into the target under fresh
//! object ids, with inherited page attributes materialized on the copy.

use super::{
    JobHandle, MediaBox, NativeCode, NativeResult, PageHandle, StructuralEngine, WriteFlags,
};
use lopdf::{Dictionary, Document, Object, ObjectId, SaveOptions, Stream};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{debug, trace};

/// Page attributes a page may inherit from its ancestors
const INHERITABLE_ATTRIBUTES: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Guard against cyclic /Parent chains
const MAX_TREE_DEPTH: usize = 64;

#[derive(Debug, Error)]
enum EngineError {
    #[error("engine is not initialized")]
    NotInitialized,

    #[error("unknown job handle {0}")]
    UnknownHandle(JobHandle),

    #[error("{0} has no document loaded")]
    NotLoaded(JobHandle),

    #[error("{0} already holds a document")]
    AlreadyLoaded(JobHandle),

    #[error("{0}: file not found")]
    FileNotFound(PathBuf),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{0}: document is encrypted")]
    Encrypted(PathBuf),

    #[error("{path}: {message}")]
    Damaged { path: PathBuf, message: String },

    #[error("invalid page selection '{selection}': {reason}")]
    Selection { selection: String, reason: String },

    #[error("page {page} does not exist (document has {total} pages)")]
    PageNotFound { page: u32, total: u32 },

    #[error("rotation must be a multiple of 90 degrees, got {0}")]
    Rotation(i32),

    #[error("source and target of a page copy must be different jobs")]
    SameJob,

    #[error("malformed page tree: {0}")]
    PageTree(String),

    #[error("{0} is not supported by the lopdf engine")]
    Unsupported(&'static str),

    #[error("failed to write {path}: {message}")]
    Write { path: PathBuf, message: String },
}

impl EngineError {
    fn code(&self) -> NativeCode {
        match self {
            Self::NotInitialized
            | Self::UnknownHandle(_)
            | Self::NotLoaded(_)
            | Self::AlreadyLoaded(_)
            | Self::SameJob => NativeCode::INTERNAL,
            Self::FileNotFound(_) => NativeCode::FILE_NOT_FOUND,
            Self::Io { source, .. } if source.kind() == std::io::ErrorKind::OutOfMemory => {
                NativeCode::OUT_OF_MEMORY
            }
            Self::Io { .. } | Self::Write { .. } => NativeCode::SYSTEM,
            Self::Encrypted(_) => NativeCode::PASSWORD,
            Self::Damaged { .. } => NativeCode::DAMAGED,
            Self::Selection { .. } | Self::PageNotFound { .. } | Self::Rotation(_) => {
                NativeCode::PAGES
            }
            Self::PageTree(_) => NativeCode::OBJECT,
            Self::Unsupported(_) => NativeCode::UNSUPPORTED,
        }
    }

    fn selection(selection: &str, reason: impl Into<String>) -> Self {
        Self::Selection {
            selection: selection.to_string(),
            reason: reason.into(),
        }
    }

    fn tree(error: impl ToString) -> Self {
        Self::PageTree(error.to_string())
    }
}

#[derive(Default)]
struct JobSlot {
    document: Option<Document>,
    last_error: Option<String>,
}

/// In-process [`StructuralEngine`] built on lopdf
pub struct LopdfEngine {
    initialized: AtomicBool,
    next_handle: AtomicU64,
    jobs: Mutex<HashMap<JobHandle, Arc<Mutex<JobSlot>>>>,
}

impl Default for LopdfEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl LopdfEngine {
    /// Create an engine that still needs [`LopdfEngine::initialize`]
    pub fn new() -> Self {
        Self {
            initialized: AtomicBool::new(false),
            next_handle: AtomicU64::new(1),
            jobs: Mutex::new(HashMap::new()),
        }
    }

    /// Create an engine that is ready for use
    pub fn initialized() -> Self {
        let engine = Self::new();
        engine.initialize();
        engine
    }

    /// Process-wide startup
    pub fn initialize(&self) {
        if !self.initialized.swap(true, Ordering::SeqCst) {
            debug!("lopdf engine initialized");
        }
    }

    /// Refuse new jobs; existing handles can still be released
    pub fn shutdown(&self) {
        if self.initialized.swap(false, Ordering::SeqCst) {
            debug!(open_handles = self.open_handles(), "lopdf engine shut down");
        }
    }

    fn jobs(&self) -> MutexGuard<'_, HashMap<JobHandle, Arc<Mutex<JobSlot>>>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn slot(&self, job: JobHandle) -> NativeResult<Arc<Mutex<JobSlot>>> {
        self.jobs()
            .get(&job)
            .cloned()
            .ok_or_else(|| EngineError::UnknownHandle(job).code())
    }

    /// Record a failure on the slot and hand back its code
    fn finish<T>(job: JobHandle, slot: &mut JobSlot, result: Result<T, EngineError>) -> NativeResult<T> {
        result.map_err(|error| {
            let code = error.code();
            debug!(%job, code = code.raw(), %error, "engine call failed");
            slot.last_error = Some(error.to_string());
            code
        })
    }

    fn with_document<T>(
        &self,
        job: JobHandle,
        f: impl FnOnce(&mut Document) -> Result<T, EngineError>,
    ) -> NativeResult<T> {
        let slot = self.slot(job)?;
        let mut guard = lock(&slot);
        let result = match guard.document.as_mut() {
            Some(document) => f(document),
            None => Err(EngineError::NotLoaded(job)),
        };
        Self::finish(job, &mut guard, result)
    }

    fn load_into(&self, job: JobHandle, load: impl FnOnce() -> Result<Document, EngineError>) -> NativeResult<()> {
        let slot = self.slot(job)?;
        let mut guard = lock(&slot);
        let result = if guard.document.is_some() {
            Err(EngineError::AlreadyLoaded(job))
        } else {
            load()
        }
        .map(|document| guard.document = Some(document));
        Self::finish(job, &mut guard, result)
    }
}

fn lock(slot: &Mutex<JobSlot>) -> MutexGuard<'_, JobSlot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

impl StructuralEngine for LopdfEngine {
    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    fn create_job(&self) -> NativeResult<JobHandle> {
        if !self.is_initialized() {
            return Err(EngineError::NotInitialized.code());
        }
        let handle = JobHandle::from_raw(self.next_handle.fetch_add(1, Ordering::SeqCst));
        self.jobs().insert(handle, Arc::new(Mutex::new(JobSlot::default())));
        trace!(job = %handle, "job created");
        Ok(handle)
    }

    fn read(&self, job: JobHandle, path: &Path) -> NativeResult<()> {
        self.load_into(job, || load_document(path))?;
        debug!(%job, path = %path.display(), "document read");
        Ok(())
    }

    fn init_empty(&self, job: JobHandle) -> NativeResult<()> {
        self.load_into(job, || Ok(empty_document()))
    }

    fn page_count(&self, job: JobHandle) -> NativeResult<u32> {
        self.with_document(job, |document| Ok(document.get_pages().len() as u32))
    }

    fn add_pages(&self, target: JobHandle, source: JobHandle, range: Option<&str>) -> NativeResult<()> {
        let target_slot = self.slot(target)?;
        if target == source {
            return Self::finish(target, &mut lock(&target_slot), Err(EngineError::SameJob));
        }
        let source_slot = self.slot(source)?;

        let mut target_guard = lock(&target_slot);
        let source_guard = lock(&source_slot);
        let result = match (target_guard.document.as_mut(), source_guard.document.as_ref()) {
            (Some(target_doc), Some(source_doc)) => transplant_pages(target_doc, source_doc, range),
            (None, _) => Err(EngineError::NotLoaded(target)),
            (_, None) => Err(EngineError::NotLoaded(source)),
        };
        drop(source_guard);
        let copied = Self::finish(target, &mut target_guard, result)?;
        trace!(%target, %source, copied, "pages appended");
        Ok(())
    }

    fn remove_pages(&self, job: JobHandle, range: &str) -> NativeResult<()> {
        self.with_document(job, |document| {
            let total = document.get_pages().len() as u32;
            let mut pages = parse_selection(range, total)?;
            pages.sort_unstable();
            pages.dedup();
            document.delete_pages(&pages);
            Ok(())
        })
    }

    fn page(&self, job: JobHandle, page_number: u32) -> NativeResult<PageHandle> {
        self.with_document(job, |document| {
            let pages = document.get_pages();
            pages
                .get(&page_number)
                .map(|&id| encode_page(id))
                .ok_or(EngineError::PageNotFound {
                    page: page_number,
                    total: pages.len() as u32,
                })
        })
    }

    fn rotate_page(&self, job: JobHandle, page: PageHandle, degrees: i32, relative: bool) -> NativeResult<()> {
        self.with_document(job, |document| {
            if degrees % 90 != 0 {
                return Err(EngineError::Rotation(degrees));
            }
            let page_id = decode_page(page);
            let current = page_attribute(document, page_id, b"Rotate")?
                .and_then(|value| resolve_number(document, &value))
                .map_or(0, |value| value as i64);
            let rotation = if relative {
                current + i64::from(degrees)
            } else {
                i64::from(degrees)
            }
            .rem_euclid(360);
            page_dictionary_mut(document, page_id)?.set("Rotate", rotation);
            Ok(())
        })
    }

    fn media_box(&self, job: JobHandle, page: PageHandle) -> NativeResult<MediaBox> {
        self.with_document(job, |document| {
            let page_id = decode_page(page);
            let value = page_attribute(document, page_id, b"MediaBox")?
                .ok_or_else(|| EngineError::tree(format!("page {page_id:?} has no /MediaBox")))?;
            read_media_box(document, &value)
                .ok_or_else(|| EngineError::tree(format!("page {page_id:?} has an unreadable /MediaBox")))
        })
    }

    fn insert_blank_page(&self, job: JobHandle, position: u32, media_box: MediaBox) -> NativeResult<()> {
        self.with_document(job, |document| insert_blank(document, position, media_box))
    }

    fn write(&self, job: JobHandle, path: &Path, flags: &WriteFlags) -> NativeResult<()> {
        self.with_document(job, |document| {
            if flags.linearize {
                return Err(EngineError::Unsupported("linearization"));
            }
            document.prune_objects();
            if flags.remove_unreferenced {
                document.delete_zero_length_streams();
                document.prune_objects();
                document.renumber_objects();
            }
            if flags.compress_streams {
                document.compress();
            }
            let write_error = |error: std::io::Error| EngineError::Write {
                path: path.to_path_buf(),
                message: error.to_string(),
            };
            if flags.object_streams {
                // Compressed xref entries need a cross-reference stream
                let options = SaveOptions::builder()
                    .use_object_streams(true)
                    .use_xref_streams(true)
                    .compression_level(6)
                    .build();
                let mut file = BufWriter::new(File::create(path).map_err(write_error)?);
                document.save_with_options(&mut file, options).map_err(write_error)?;
                file.flush().map_err(write_error)?;
            } else {
                document.save(path).map_err(write_error)?;
            }
            Ok(())
        })?;
        debug!(%job, path = %path.display(), ?flags, "document written");
        Ok(())
    }

    fn last_error(&self, job: JobHandle) -> Option<String> {
        let slot = self.slot(job).ok()?;
        let guard = lock(&slot);
        guard.last_error.clone()
    }

    fn release(&self, job: JobHandle) -> NativeResult<()> {
        match self.jobs().remove(&job) {
            Some(_) => {
                trace!(%job, "job released");
                Ok(())
            }
            None => Err(EngineError::UnknownHandle(job).code()),
        }
    }

    fn open_handles(&self) -> usize {
        self.jobs().len()
    }
}

fn load_document(path: &Path) -> Result<Document, EngineError> {
    let bytes = std::fs::read(path).map_err(|source| match source.kind() {
        std::io::ErrorKind::NotFound => EngineError::FileNotFound(path.to_path_buf()),
        _ => EngineError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;

    match Document::load_mem(&bytes) {
        Ok(document) if document.is_encrypted() => Err(EngineError::Encrypted(path.to_path_buf())),
        Ok(document) => Ok(document),
        Err(_) if contains(&bytes, b"/Encrypt") => Err(EngineError::Encrypted(path.to_path_buf())),
        Err(error) => Err(EngineError::Damaged {
            path: path.to_path_buf(),
            message: error.to_string(),
        }),
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

fn empty_document() -> Document {
    let mut document = Document::with_version("1.7");
    let pages_id = document.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(Vec::new())),
        ("Count", Object::Integer(0)),
    ]));
    let catalog_id = document.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    document.trailer.set("Root", Object::Reference(catalog_id));
    document
}

fn encode_page(id: ObjectId) -> PageHandle {
    PageHandle::from_raw((u64::from(id.0) << 16) | u64::from(id.1))
}

fn decode_page(page: PageHandle) -> ObjectId {
    let raw = page.raw();
    ((raw >> 16) as u32, (raw & 0xFFFF) as u16)
}

/// Parse a page selection into 1-based page numbers, in the order listed
///
/// Accepts `N`, `N-M` and descending `M-N` tokens separated by commas.
fn parse_selection(selection: &str, total: u32) -> Result<Vec<u32>, EngineError> {
    let number = |token: &str| -> Result<u32, EngineError> {
        let token = token.trim();
        let page = token
            .parse::<u32>()
            .map_err(|_| EngineError::selection(selection, format!("'{token}' is not a page number")))?;
        if page == 0 || page > total {
            return Err(EngineError::PageNotFound { page, total });
        }
        Ok(page)
    };

    let mut pages = Vec::new();
    for token in selection.split(',') {
        let token = token.trim();
        if token.is_empty() {
            return Err(EngineError::selection(selection, "empty token"));
        }
        match token.split_once('-') {
            Some((start, end)) => {
                let (start, end) = (number(start)?, number(end)?);
                if start <= end {
                    pages.extend(start..=end);
                } else {
                    pages.extend((end..=start).rev());
                }
            }
            None => pages.push(number(token)?),
        }
    }
    Ok(pages)
}

fn pages_root(document: &Document) -> Result<ObjectId, EngineError> {
    let catalog_id = document
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|_| EngineError::tree("trailer has no /Root"))?;
    document
        .get_dictionary(catalog_id)
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(|_| EngineError::tree("catalog has no /Pages"))
}

fn page_dictionary_mut(document: &mut Document, id: ObjectId) -> Result<&mut Dictionary, EngineError> {
    document
        .get_object_mut(id)
        .and_then(Object::as_dict_mut)
        .map_err(|error| EngineError::tree(format!("object {id:?}: {error}")))
}

/// Look up a page attribute on the page itself, then up the /Parent chain
fn page_attribute(document: &Document, page_id: ObjectId, key: &[u8]) -> Result<Option<Object>, EngineError> {
    let mut current = page_id;
    for _ in 0..MAX_TREE_DEPTH {
        let node = document
            .get_dictionary(current)
            .map_err(|error| EngineError::tree(format!("object {current:?}: {error}")))?;
        if let Ok(value) = node.get(key) {
            return Ok(Some(value.clone()));
        }
        match node.get(b"Parent").and_then(Object::as_reference) {
            Ok(parent) => current = parent,
            Err(_) => return Ok(None),
        }
    }
    Err(EngineError::tree("page tree is too deep or cyclic"))
}

fn resolve_number(document: &Document, value: &Object) -> Option<f64> {
    match value {
        Object::Integer(value) => Some(*value as f64),
        Object::Real(value) => Some(f64::from(*value)),
        Object::Reference(id) => document
            .get_object(*id)
            .ok()
            .and_then(|value| resolve_number(document, value)),
        _ => None,
    }
}

fn read_media_box(document: &Document, value: &Object) -> Option<MediaBox> {
    let items = match value {
        Object::Array(items) => items,
        Object::Reference(id) => return document.get_object(*id).ok().and_then(|value| read_media_box(document, value)),
        _ => return None,
    };
    let numbers = items
        .iter()
        .map(|item| resolve_number(document, item))
        .collect::<Option<Vec<_>>>()?;
    match numbers.as_slice() {
        [llx, lly, urx, ury] => Some(MediaBox::new(*llx, *lly, *urx, *ury)),
        _ => None,
    }
}

fn number_object(value: f64) -> Object {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        Object::Integer(value as i64)
    } else {
        Object::Real(value as f32)
    }
}

fn media_box_object(media_box: &MediaBox) -> Object {
    Object::Array(media_box.as_array().iter().map(|&v| number_object(v)).collect())
}

/// Append `kids` to the /Kids of the page tree node `node_id`
fn append_kids(document: &mut Document, node_id: ObjectId, kids: &[ObjectId]) -> Result<(), EngineError> {
    let node = page_dictionary_mut(document, node_id)?;
    if !matches!(node.get(b"Kids"), Ok(Object::Array(_))) {
        node.set("Kids", Object::Array(Vec::new()));
    }
    if let Ok(Object::Array(existing)) = node.get_mut(b"Kids") {
        existing.extend(kids.iter().map(|&id| Object::Reference(id)));
    }
    let count = node.get(b"Count").and_then(Object::as_i64).unwrap_or(0);
    node.set("Count", count + kids.len() as i64);
    Ok(())
}

/// Bump /Count on `start` and every ancestor
fn increment_counts(document: &mut Document, start: ObjectId) -> Result<(), EngineError> {
    let mut current = Some(start);
    for _ in 0..MAX_TREE_DEPTH {
        let Some(id) = current else {
            return Ok(());
        };
        let node = page_dictionary_mut(document, id)?;
        let count = node.get(b"Count").and_then(Object::as_i64).unwrap_or(0);
        node.set("Count", count + 1);
        current = node.get(b"Parent").and_then(Object::as_reference).ok();
    }
    Err(EngineError::tree("page tree is too deep or cyclic"))
}

fn insert_blank(document: &mut Document, position: u32, media_box: MediaBox) -> Result<(), EngineError> {
    let pages = document.get_pages();
    let root_id = pages_root(document)?;
    let anchor = match position {
        0 => None,
        n => pages.get(&n).copied(),
    };

    let content_id = document.add_object(Stream::new(Dictionary::new(), Vec::new()));
    let mut page = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Page".to_vec())),
        ("MediaBox", media_box_object(&media_box)),
        ("Resources", Object::Dictionary(Dictionary::new())),
        ("Contents", Object::Reference(content_id)),
    ]);

    let Some(anchor_id) = anchor else {
        page.set("Parent", Object::Reference(root_id));
        let page_id = document.add_object(page);
        return append_kids(document, root_id, &[page_id]);
    };

    let parent_id = document
        .get_dictionary(anchor_id)
        .and_then(|anchor| anchor.get(b"Parent"))
        .and_then(Object::as_reference)
        .map_err(|_| EngineError::tree(format!("page {anchor_id:?} has no /Parent")))?;
    page.set("Parent", Object::Reference(parent_id));
    let page_id = document.add_object(page);

    let parent = page_dictionary_mut(document, parent_id)?;
    let Ok(Object::Array(kids)) = parent.get_mut(b"Kids") else {
        return Err(EngineError::tree(format!("node {parent_id:?} has no /Kids")));
    };
    let at = kids
        .iter()
        .position(|kid| matches!(kid, Object::Reference(id) if *id == anchor_id))
        .ok_or_else(|| EngineError::tree(format!("page {anchor_id:?} is not a kid of its parent")))?;
    kids.insert(at, Object::Reference(page_id));
    increment_counts(document, parent_id)
}

/// Deep-copy the selected pages of `source` onto the end of `target`
///
/// Returns the number of pages appended.
fn transplant_pages(target: &mut Document, source: &Document, range: Option<&str>) -> Result<usize, EngineError> {
    let source_pages = source.get_pages();
    let total = source_pages.len() as u32;
    let selection = match range {
        Some(range) => parse_selection(range, total)?,
        None => (1..=total).collect(),
    };
    let root_id = pages_root(target)?;

    let selected = selection
        .iter()
        .map(|number| {
            source_pages
                .get(number)
                .copied()
                .ok_or(EngineError::PageNotFound { page: *number, total })
        })
        .collect::<Result<Vec<_>, _>>()?;

    // Reserve every page id up front so links between copied pages land on
    // the copies; links to pages left behind resolve to null
    let mut copier = ObjectCopier::new(source, source_pages.values().copied());
    let kids: Vec<ObjectId> = selected
        .iter()
        .map(|&page_id| copier.reserve_page(target, page_id))
        .collect();
    for (&page_id, &new_id) in selected.iter().zip(&kids) {
        let page = flatten_page(source, page_id)?;
        copier.copy_page(target, &page, new_id, root_id);
    }
    append_kids(target, root_id, &kids)?;
    Ok(kids.len())
}

/// Clone a page dictionary with inherited attributes made explicit
fn flatten_page(source: &Document, page_id: ObjectId) -> Result<Dictionary, EngineError> {
    let mut page = source
        .get_dictionary(page_id)
        .map_err(|error| EngineError::tree(format!("page {page_id:?}: {error}")))?
        .clone();
    for key in INHERITABLE_ATTRIBUTES {
        if page.get(key).is_err() {
            if let Some(value) = page_attribute(source, page_id, key)? {
                page.set(key.to_vec(), value);
            }
        }
    }
    page.remove(b"Parent");
    Ok(page)
}

/// Copies objects from one document into another, remapping references
struct ObjectCopier<'a> {
    source: &'a Document,
    remapped: HashMap<ObjectId, ObjectId>,
    /// Source pages outside the selection; references to them become null
    unselected_pages: HashSet<ObjectId>,
}

impl<'a> ObjectCopier<'a> {
    fn new(source: &'a Document, pages: impl IntoIterator<Item = ObjectId>) -> Self {
        Self {
            source,
            remapped: HashMap::new(),
            unselected_pages: pages.into_iter().collect(),
        }
    }

    /// Allocate the target id for a copy of `page_id`
    ///
    /// A page selected twice gets a second id; references keep pointing at
    /// the first copy.
    fn reserve_page(&mut self, target: &mut Document, page_id: ObjectId) -> ObjectId {
        let new_id = target.new_object_id();
        self.unselected_pages.remove(&page_id);
        self.remapped.entry(page_id).or_insert(new_id);
        new_id
    }

    fn copy_page(&mut self, target: &mut Document, page: &Dictionary, page_id: ObjectId, parent: ObjectId) {
        let mut copied = self.copy_dictionary(target, page);
        copied.set("Parent", Object::Reference(parent));
        target.objects.insert(page_id, Object::Dictionary(copied));
    }

    fn copy_object(&mut self, target: &mut Document, object: &Object) -> Object {
        match object {
            Object::Reference(id) => self.copy_reference(target, *id),
            Object::Dictionary(dict) => Object::Dictionary(self.copy_dictionary(target, dict)),
            Object::Array(items) => Object::Array(items.iter().map(|item| self.copy_object(target, item)).collect()),
            Object::Stream(stream) => {
                let mut copied = stream.clone();
                copied.dict = self.copy_dictionary(target, &stream.dict);
                Object::Stream(copied)
            }
            other => other.clone(),
        }
    }

    fn copy_reference(&mut self, target: &mut Document, id: ObjectId) -> Object {
        if let Some(&mapped) = self.remapped.get(&id) {
            return Object::Reference(mapped);
        }
        if self.unselected_pages.contains(&id) {
            return Object::Null;
        }
        let source = self.source;
        let Ok(resolved) = source.get_object(id) else {
            return Object::Null;
        };
        // Reserve the id first so cycles resolve to it
        let new_id = target.new_object_id();
        self.remapped.insert(id, new_id);
        let copied = self.copy_object(target, resolved);
        target.objects.insert(new_id, copied);
        Object::Reference(new_id)
    }

    fn copy_dictionary(&mut self, target: &mut Document, dict: &Dictionary) -> Dictionary {
        let page_node = matches!(
            dict.get(b"Type"),
            Ok(Object::Name(name)) if name == b"Page" || name == b"Pages"
        );
        let mut copied = Dictionary::new();
        for (key, value) in dict.iter() {
            if page_node && key.as_slice() == b"Parent" {
                continue;
            }
            copied.set(key.clone(), self.copy_object(target, value));
        }
        copied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{
        link_targets, page_rotations, source_pages, write_labelled_pdf, write_linked_pdf, write_sized_pdf,
    };
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn engine_with(path: &Path) -> (LopdfEngine, JobHandle) {
        let engine = LopdfEngine::initialized();
        let job = engine.create_job().unwrap();
        engine.read(job, path).unwrap();
        (engine, job)
    }

    #[test]
    fn test_uninitialized_engine_refuses_jobs() {
        let engine = LopdfEngine::new();
        assert!(!engine.is_initialized());
        assert_eq!(engine.create_job(), Err(NativeCode::INTERNAL));

        engine.initialize();
        let job = engine.create_job().unwrap();
        engine.shutdown();
        assert_eq!(engine.create_job(), Err(NativeCode::INTERNAL));
        assert_eq!(engine.release(job), Ok(()));
        assert_eq!(engine.open_handles(), 0);
    }

    #[test]
    fn test_read_reports_native_codes() {
        let dir = TempDir::new().unwrap();
        let engine = LopdfEngine::initialized();

        let job = engine.create_job().unwrap();
        let missing = dir.path().join("missing.pdf");
        assert_eq!(engine.read(job, &missing), Err(NativeCode::FILE_NOT_FOUND));
        assert!(engine.last_error(job).unwrap().contains("missing.pdf"));

        let garbage = dir.path().join("garbage.pdf");
        std::fs::write(&garbage, b"this is not a pdf at all").unwrap();
        assert_eq!(engine.read(job, &garbage), Err(NativeCode::DAMAGED));

        engine.release(job).unwrap();
        assert_eq!(engine.last_error(job), None);
        assert_eq!(engine.release(job), Err(NativeCode::INTERNAL));
    }

    #[test]
    fn test_add_pages_in_listed_order() {
        let dir = TempDir::new().unwrap();
        let input = write_labelled_pdf(dir.path(), "in.pdf", 5);
        let (engine, source) = engine_with(&input);

        let target = engine.create_job().unwrap();
        engine.init_empty(target).unwrap();
        assert_eq!(engine.page_count(target), Ok(0));

        engine.add_pages(target, source, Some("4,1-2,5")).unwrap();
        let output = dir.path().join("out.pdf");
        engine.write(target, &output, &WriteFlags::default()).unwrap();

        assert_eq!(source_pages(&output), vec![4, 1, 2, 5]);
        assert_eq!(engine.page_count(source), Ok(5));
    }

    #[test]
    fn test_add_pages_rejects_bad_selection() {
        let dir = TempDir::new().unwrap();
        let input = write_labelled_pdf(dir.path(), "in.pdf", 3);
        let (engine, source) = engine_with(&input);
        let target = engine.create_job().unwrap();
        engine.init_empty(target).unwrap();

        assert_eq!(engine.add_pages(target, source, Some("2,9")), Err(NativeCode::PAGES));
        assert!(engine.last_error(target).unwrap().contains("page 9"));
        assert_eq!(engine.add_pages(target, source, Some("1,,2")), Err(NativeCode::PAGES));
        assert_eq!(engine.add_pages(source, source, None), Err(NativeCode::INTERNAL));
        assert_eq!(engine.page_count(target), Ok(0));
    }

    #[test]
    fn test_copied_pages_keep_inherited_media_box() {
        let dir = TempDir::new().unwrap();
        let input = write_sized_pdf(dir.path(), "sized.pdf", &[(595.0, 842.0), (842.0, 595.0)]);
        let (engine, source) = engine_with(&input);
        let target = engine.create_job().unwrap();
        engine.init_empty(target).unwrap();
        engine.add_pages(target, source, Some("2")).unwrap();

        let page = engine.page(target, 1).unwrap();
        let media_box = engine.media_box(target, page).unwrap();
        assert_eq!(media_box.width(), 842.0);
        assert_eq!(media_box.height(), 595.0);
    }

    #[test]
    fn test_remove_pages() {
        let dir = TempDir::new().unwrap();
        let input = write_labelled_pdf(dir.path(), "in.pdf", 6);
        let (engine, job) = engine_with(&input);

        engine.remove_pages(job, "2,4-5").unwrap();
        assert_eq!(engine.page_count(job), Ok(3));

        let output = dir.path().join("out.pdf");
        engine.write(job, &output, &WriteFlags::default()).unwrap();
        assert_eq!(source_pages(&output), vec![1, 3, 6]);
    }

    #[test]
    fn test_rotate_page_relative_and_absolute() {
        let dir = TempDir::new().unwrap();
        let input = write_labelled_pdf(dir.path(), "in.pdf", 2);
        let (engine, job) = engine_with(&input);

        let first = engine.page(job, 1).unwrap();
        engine.rotate_page(job, first, 270, true).unwrap();
        engine.rotate_page(job, first, 180, true).unwrap();
        let second = engine.page(job, 2).unwrap();
        engine.rotate_page(job, second, -90, false).unwrap();
        assert_eq!(engine.rotate_page(job, second, 45, true), Err(NativeCode::PAGES));

        let output = dir.path().join("out.pdf");
        engine.write(job, &output, &WriteFlags::default()).unwrap();
        assert_eq!(page_rotations(&output), vec![90, 270]);
    }

    #[test]
    fn test_insert_blank_page_positions() {
        let dir = TempDir::new().unwrap();
        let input = write_labelled_pdf(dir.path(), "in.pdf", 3);
        let (engine, job) = engine_with(&input);

        engine.insert_blank_page(job, 2, MediaBox::new(0.0, 0.0, 100.0, 200.0)).unwrap();
        engine.insert_blank_page(job, 0, MediaBox::new(0.0, 0.0, 612.0, 792.0)).unwrap();
        engine.insert_blank_page(job, 99, MediaBox::new(0.0, 0.0, 612.0, 792.0)).unwrap();
        assert_eq!(engine.page_count(job), Ok(6));

        let blank = engine.page(job, 2).unwrap();
        assert_eq!(engine.media_box(job, blank), Ok(MediaBox::new(0.0, 0.0, 100.0, 200.0)));

        let output = dir.path().join("out.pdf");
        engine.write(job, &output, &WriteFlags::default()).unwrap();
        // Blank pages carry no source marker and read back as 0
        assert_eq!(source_pages(&output), vec![1, 0, 2, 3, 0, 0]);
    }

    #[test]
    fn test_write_flags() {
        let dir = TempDir::new().unwrap();
        let input = write_labelled_pdf(dir.path(), "in.pdf", 2);
        let (engine, job) = engine_with(&input);
        let output = dir.path().join("out.pdf");

        let linearized = WriteFlags {
            linearize: true,
            ..WriteFlags::default()
        };
        assert_eq!(engine.write(job, &output, &linearized), Err(NativeCode::UNSUPPORTED));
        assert!(!output.exists());

        let compressed = WriteFlags {
            compress_streams: true,
            remove_unreferenced: true,
            ..WriteFlags::default()
        };
        engine.write(job, &output, &compressed).unwrap();
        assert_eq!(source_pages(&output), vec![1, 2]);

        let unwritable = dir.path().join("no-such-dir").join("out.pdf");
        assert_eq!(engine.write(job, &unwritable, &compressed), Err(NativeCode::SYSTEM));
    }

    #[test]
    fn test_object_streams_write_readable_output() {
        let dir = TempDir::new().unwrap();
        let input = write_labelled_pdf(dir.path(), "in.pdf", 3);
        let (engine, job) = engine_with(&input);
        let output = dir.path().join("packed.pdf");

        let packed = WriteFlags {
            object_streams: true,
            compress_streams: true,
            remove_unreferenced: true,
            linearize: false,
        };
        engine.write(job, &output, &packed).unwrap();

        let written = std::fs::read(&output).unwrap();
        assert!(written.windows(b"/ObjStm".len()).any(|w| w == b"/ObjStm"));
        assert_eq!(source_pages(&output), vec![1, 2, 3]);
    }

    #[test]
    fn test_copied_links_point_at_copied_pages() {
        let dir = TempDir::new().unwrap();
        let input = write_linked_pdf(dir.path(), "linked.pdf", 3, 1, 3);
        let (engine, source) = engine_with(&input);

        let target = engine.create_job().unwrap();
        engine.init_empty(target).unwrap();
        engine.add_pages(target, source, Some("3,1")).unwrap();
        let output = dir.path().join("out.pdf");
        engine.write(target, &output, &WriteFlags::default()).unwrap();

        assert_eq!(source_pages(&output), vec![3, 1]);
        assert_eq!(link_targets(&output), vec![(1, Some(3), true)]);

        let doc = Document::load(&output).unwrap();
        let page_objects = doc
            .objects
            .values()
            .filter(|object| matches!(object.type_name(), Ok(name) if name == b"Page"))
            .count();
        assert_eq!(page_objects, 2);
    }

    #[test]
    fn test_links_to_dropped_pages_become_null() {
        let dir = TempDir::new().unwrap();
        let input = write_linked_pdf(dir.path(), "linked.pdf", 3, 1, 3);
        let (engine, source) = engine_with(&input);

        let target = engine.create_job().unwrap();
        engine.init_empty(target).unwrap();
        engine.add_pages(target, source, Some("1-2")).unwrap();
        let output = dir.path().join("out.pdf");
        engine.write(target, &output, &WriteFlags::default()).unwrap();

        assert_eq!(source_pages(&output), vec![1, 2]);
        assert_eq!(link_targets(&output), vec![(1, None, true)]);
        assert_eq!(Document::load(&output).unwrap().get_pages().len(), 2);
    }

    #[test]
    fn test_parse_selection() {
        assert_eq!(parse_selection("3,1-2", 3).unwrap(), vec![3, 1, 2]);
        assert_eq!(parse_selection("3-1", 3).unwrap(), vec![3, 2, 1]);
        assert!(matches!(parse_selection("0", 3), Err(EngineError::PageNotFound { page: 0, .. })));
        assert!(matches!(parse_selection("a", 3), Err(EngineError::Selection { .. })));
        assert!(matches!(parse_selection("", 3), Err(EngineError::Selection { .. })));
    }
}
