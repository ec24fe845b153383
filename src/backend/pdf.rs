//! `lopdf`-backed decoder and encoder.
//!
//! Pages are copied by walking the page's object graph and re-inserting
//! every reachable object into the output under a fresh id. Stream bodies
//! are cloned untouched, so the copied content is byte-for-byte the source
//! content.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId, Stream};

use super::{DecodedDocument, Decoder, Encoder, OutputDocument, SourcePage};
use crate::compose::{ComposeOptions, OutputMetadata};
use crate::error::{CompositionError, CopyError, ImportError};
use crate::model::Rotation;

/// Page attributes a leaf may inherit from its ancestors in the page tree.
const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guard against cyclic `/Parent` chains in malformed files.
const MAX_TREE_DEPTH: usize = 64;

/// Output PDF version.
const OUTPUT_VERSION: &str = "1.7";

/// Decodes PDF bytes with `lopdf`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfDecoder;

impl LopdfDecoder {
    /// Create a decoder.
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for LopdfDecoder {
    type Document = LopdfSource;

    fn decode(&self, bytes: &[u8]) -> Result<LopdfSource, ImportError> {
        let doc = LopdfDocument::load_mem(bytes)?;
        if doc.is_encrypted() {
            return Err(ImportError::Encrypted);
        }

        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
        log::debug!(
            "Decoded PDF {} with {} pages and {} objects",
            doc.version,
            pages.len(),
            doc.objects.len()
        );

        Ok(LopdfSource {
            doc: Arc::new(doc),
            pages,
        })
    }
}

/// A decoded source document.
#[derive(Debug, Clone)]
pub struct LopdfSource {
    doc: Arc<LopdfDocument>,
    pages: Vec<ObjectId>,
}

impl LopdfSource {
    /// Direct access to the underlying `lopdf::Document`.
    pub fn raw_doc(&self) -> &LopdfDocument {
        &self.doc
    }
}

impl DecodedDocument for LopdfSource {
    type Page = LopdfPage;

    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page(&self, index: u32) -> Result<LopdfPage, CopyError> {
        let id = *self
            .pages
            .get(index as usize)
            .ok_or(CopyError::OutOfRange {
                index,
                page_count: self.page_count(),
            })?;

        let rotation = inherited_attribute(&self.doc, id, b"Rotate")
            .map(|value| rotation_from_object(&self.doc, &value))
            .unwrap_or_default();

        Ok(LopdfPage {
            doc: Arc::clone(&self.doc),
            id,
            rotation,
        })
    }
}

/// One page of a [`LopdfSource`].
#[derive(Debug, Clone)]
pub struct LopdfPage {
    doc: Arc<LopdfDocument>,
    id: ObjectId,
    rotation: Rotation,
}

impl LopdfPage {
    /// Object id of the page dictionary in its source.
    pub fn object_id(&self) -> ObjectId {
        self.id
    }

    /// The source document this page belongs to.
    pub fn raw_doc(&self) -> &LopdfDocument {
        &self.doc
    }
}

impl SourcePage for LopdfPage {
    fn intrinsic_rotation(&self) -> Rotation {
        self.rotation
    }
}

/// Creates [`LopdfOutput`] accumulators.
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfEncoder;

impl LopdfEncoder {
    /// Create an encoder.
    pub fn new() -> Self {
        Self
    }
}

impl Encoder<LopdfPage> for LopdfEncoder {
    type Output = LopdfOutput;

    fn new_document(&self, options: &ComposeOptions) -> LopdfOutput {
        LopdfOutput::new(options.metadata.clone(), options.compress)
    }
}

/// Output document being assembled.
pub struct LopdfOutput {
    doc: LopdfDocument,
    pages_id: ObjectId,
    kids: Vec<Object>,
    /// (source document address, source object id) -> output object id.
    /// Lets pages from one source share fonts and images in the output.
    /// Only holds objects that cannot reach a page-tree node.
    copied: HashMap<(usize, ObjectId), ObjectId>,
    /// Whether a source object can reach a page-tree node.
    page_bound: HashMap<(usize, ObjectId), bool>,
    metadata: OutputMetadata,
    compress: bool,
}

impl LopdfOutput {
    fn new(metadata: OutputMetadata, compress: bool) -> Self {
        let mut doc = LopdfDocument::with_version(OUTPUT_VERSION);
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
            copied: HashMap::new(),
            page_bound: HashMap::new(),
            metadata,
            compress,
        }
    }
}

impl OutputDocument<LopdfPage> for LopdfOutput {
    fn append_copied_page(&mut self, page: &LopdfPage, rotation: Rotation) -> Result<(), CopyError> {
        let source: &LopdfDocument = &page.doc;
        let leaf = source
            .get_dictionary(page.id)
            .map_err(|e| CopyError::Malformed(e.to_string()))?;

        let mut flattened = leaf.clone();
        for key in INHERITABLE_KEYS {
            if !flattened.has(key) {
                if let Some(value) = inherited_attribute(source, page.id, key) {
                    flattened.set(key.to_vec(), value);
                }
            }
        }
        flattened.remove(b"Parent");

        let new_page_id = self.doc.new_object_id();
        let mut copier = ObjectCopier {
            source,
            source_key: Arc::as_ptr(&page.doc) as usize,
            page_id: page.id,
            new_page_id,
            target: &mut self.doc,
            copied: &mut self.copied,
            page_bound: &mut self.page_bound,
            page_copies: HashMap::new(),
        };
        let mut dict = copier.copy_dictionary(&flattened)?;
        dict.set("Parent", Object::Reference(self.pages_id));
        dict.set("Rotate", Object::Integer(i64::from(rotation.degrees())));

        self.doc
            .objects
            .insert(new_page_id, Object::Dictionary(dict));
        self.kids.push(Object::Reference(new_page_id));
        Ok(())
    }

    fn page_count(&self) -> usize {
        self.kids.len()
    }

    fn finalize(mut self) -> Result<Vec<u8>, CompositionError> {
        let count = self.kids.len() as i64;
        let pages = Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(self.kids)),
            ("Count", Object::Integer(count)),
        ]);
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(self.pages_id)),
        ]));
        self.doc.trailer.set("Root", Object::Reference(catalog_id));

        if let Some(info) = info_dictionary(&self.metadata) {
            let info_id = self.doc.add_object(info);
            self.doc.trailer.set("Info", Object::Reference(info_id));
        }

        if self.compress {
            self.doc.compress();
        }

        let mut bytes = Vec::new();
        self.doc
            .save_to(&mut bytes)
            .map_err(|e| CompositionError::Encode(format!("Failed to save PDF: {}", e)))?;
        Ok(bytes)
    }
}

/// Deep-copies objects reachable from one page into the output document.
struct ObjectCopier<'a> {
    source: &'a LopdfDocument,
    source_key: usize,
    page_id: ObjectId,
    new_page_id: ObjectId,
    target: &'a mut LopdfDocument,
    copied: &'a mut HashMap<(usize, ObjectId), ObjectId>,
    page_bound: &'a mut HashMap<(usize, ObjectId), bool>,
    /// Copies of page-bound objects (annotations and the like). These are
    /// never shared with another output page.
    page_copies: HashMap<ObjectId, ObjectId>,
}

impl ObjectCopier<'_> {
    fn copy_object(&mut self, object: &Object) -> Result<Object, CopyError> {
        Ok(match object {
            Object::Reference(id) => self.copy_reference(*id)?,
            Object::Array(items) => Object::Array(
                items
                    .iter()
                    .map(|item| self.copy_object(item))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Object::Dictionary(dict) => Object::Dictionary(self.copy_dictionary(dict)?),
            Object::Stream(stream) => Object::Stream(self.copy_stream(stream)?),
            other => other.clone(),
        })
    }

    fn copy_dictionary(&mut self, dict: &Dictionary) -> Result<Dictionary, CopyError> {
        let mut copy = Dictionary::new();
        for (key, value) in dict.iter() {
            copy.set(key.clone(), self.copy_object(value)?);
        }
        Ok(copy)
    }

    fn copy_stream(&mut self, stream: &Stream) -> Result<Stream, CopyError> {
        let mut copy = stream.clone();
        copy.dict = self.copy_dictionary(&stream.dict)?;
        Ok(copy)
    }

    fn copy_reference(&mut self, id: ObjectId) -> Result<Object, CopyError> {
        // Back-references to the page being copied (e.g. annotation /P).
        if id == self.page_id {
            return Ok(Object::Reference(self.new_page_id));
        }
        if let Some(new_id) = self
            .page_copies
            .get(&id)
            .or_else(|| self.copied.get(&(self.source_key, id)))
        {
            return Ok(Object::Reference(*new_id));
        }

        // A dangling reference is equivalent to null.
        let Ok(object) = self.source.get_object(id) else {
            log::debug!("Dropping dangling reference {:?}", id);
            return Ok(Object::Null);
        };
        // Other pages of the source are not part of this copy.
        if is_page_tree_node(object) {
            return Ok(Object::Null);
        }

        let new_id = self.target.new_object_id();
        // Registered before recursing so reference cycles terminate.
        if self.is_page_bound(id) {
            self.page_copies.insert(id, new_id);
        } else {
            self.copied.insert((self.source_key, id), new_id);
        }
        let copy = self.copy_object(object)?;
        self.target.objects.insert(new_id, copy);
        Ok(Object::Reference(new_id))
    }
}

impl ObjectCopier<'_> {
    /// Check whether `root` can reach a page-tree node in the source.
    ///
    /// Copies of such objects depend on which page is being copied, since
    /// page references are rewritten, so they must not be shared.
    fn is_page_bound(&mut self, root: ObjectId) -> bool {
        if let Some(&bound) = self.page_bound.get(&(self.source_key, root)) {
            return bound;
        }

        let mut seen = HashSet::new();
        let mut stack = vec![root];
        let mut bound = false;
        while let Some(id) = stack.pop() {
            if id == self.page_id {
                bound = true;
                break;
            }
            if !seen.insert(id) || self.page_bound.get(&(self.source_key, id)) == Some(&false) {
                continue;
            }
            let Ok(object) = self.source.get_object(id) else {
                continue;
            };
            if is_page_tree_node(object) {
                bound = true;
                break;
            }
            collect_references(object, &mut stack);
        }

        if bound {
            self.page_bound.insert((self.source_key, root), true);
        } else {
            // Everything reachable from a free object is free too.
            for id in seen {
                self.page_bound.insert((self.source_key, id), false);
            }
        }
        bound
    }
}

fn collect_references(object: &Object, out: &mut Vec<ObjectId>) {
    match object {
        Object::Reference(id) => out.push(*id),
        Object::Array(items) => items.iter().for_each(|item| collect_references(item, out)),
        Object::Dictionary(dict) => dict.iter().for_each(|(_, v)| collect_references(v, out)),
        Object::Stream(stream) => stream
            .dict
            .iter()
            .for_each(|(_, v)| collect_references(v, out)),
        _ => {}
    }
}

fn is_page_tree_node(object: &Object) -> bool {
    let Object::Dictionary(dict) = object else {
        return false;
    };
    matches!(
        dict.get(b"Type"),
        Ok(Object::Name(name)) if name.as_slice() == b"Page" || name.as_slice() == b"Pages"
    )
}

/// Look up `key` on a page, walking up `/Parent` links if the leaf lacks it.
fn inherited_attribute(doc: &LopdfDocument, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        let parent = node.get(b"Parent").and_then(|p| p.as_reference()).ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

/// Read a `/Rotate` value. Anything that is not a multiple of 90 counts as 0.
fn rotation_from_object(doc: &LopdfDocument, value: &Object) -> Rotation {
    let resolved = match value {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    };
    let degrees = resolved
        .and_then(|o| o.as_i64().ok())
        .and_then(|d| i32::try_from(d).ok());

    match degrees.map(Rotation::from_degrees) {
        Some(Ok(rotation)) => rotation,
        Some(Err(_)) | None => {
            log::warn!("Ignoring invalid /Rotate value {:?}", value);
            Rotation::R0
        }
    }
}

fn info_dictionary(metadata: &OutputMetadata) -> Option<Dictionary> {
    let mut info = Dictionary::new();
    let text_fields = [
        ("Title", &metadata.title),
        ("Author", &metadata.author),
        ("Creator", &metadata.creator),
        ("Producer", &metadata.producer),
    ];
    for (key, value) in text_fields {
        if let Some(value) = value {
            info.set(key, Object::string_literal(value.as_str()));
        }
    }
    if metadata.timestamps {
        let now = chrono::Utc::now().format("D:%Y%m%d%H%M%SZ").to_string();
        info.set("CreationDate", Object::string_literal(now.as_str()));
        info.set("ModDate", Object::string_literal(now.as_str()));
    }

    if info.is_empty() {
        None
    } else {
        Some(info)
    }
}
