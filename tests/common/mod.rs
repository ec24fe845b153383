//! Shared fixtures for integration tests.

#![allow(dead_code)]

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use pdfworker::backend::{DecodedDocument, Decoder, Encoder, OutputDocument, Renderer, SourcePage};
use pdfworker::{ComposeOptions, CompositionError, CopyError, ImportError, RasterImage, Rotation};

/// Content stream text for page `index` of a source labelled `label`.
pub fn page_text(label: &str, index: usize) -> Vec<u8> {
    format!("BT /F1 18 Tf 72 720 Td ({}-{}) Tj ET", label, index).into_bytes()
}

/// Build a PDF with `pages` pages. Page `i` shows `label-i` and carries
/// `/Rotate rotations[i]` when given.
pub fn build_pdf(label: &str, pages: usize, rotations: &[i64]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
    ]));
    let resources_id = doc.add_object(Dictionary::from_iter([(
        "Font",
        Object::Dictionary(Dictionary::from_iter([("F1", Object::Reference(font_id))])),
    )]));

    let mut kids = Vec::new();
    for i in 0..pages {
        let content_id = doc.add_object(Stream::new(Dictionary::new(), page_text(label, i)));
        let mut page = Dictionary::from_iter([
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("Contents", Object::Reference(content_id)),
            ("Resources", Object::Reference(resources_id)),
            (
                "MediaBox",
                Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()]),
            ),
        ]);
        if let Some(&rotate) = rotations.get(i) {
            page.set("Rotate", Object::Integer(rotate));
        }
        kids.push(Object::Reference(doc.add_object(page)));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(count)),
        ])),
    );

    let catalog_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// One output page: its content stream bytes and its `/Rotate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPage {
    pub content: Vec<u8>,
    pub rotate: i64,
}

/// Load composed bytes and describe each page in order.
pub fn output_pages(bytes: &[u8]) -> Vec<OutputPage> {
    let doc = Document::load_mem(bytes).unwrap();
    doc.get_pages()
        .into_values()
        .map(|id| OutputPage {
            content: content_of(&doc, id),
            rotate: doc
                .get_dictionary(id)
                .unwrap()
                .get(b"Rotate")
                .and_then(|r| r.as_i64())
                .unwrap_or(0),
        })
        .collect()
}

fn content_of(doc: &Document, page_id: ObjectId) -> Vec<u8> {
    let contents = doc
        .get_dictionary(page_id)
        .unwrap()
        .get(b"Contents")
        .unwrap()
        .as_reference()
        .unwrap();
    match doc.get_object(contents).unwrap() {
        Object::Stream(stream) => stream.content.clone(),
        other => panic!("expected content stream, got {:?}", other),
    }
}

/// Renders a 1x1 preview whose single pixel encodes the intrinsic rotation.
pub struct DotRenderer;

impl<P: SourcePage> Renderer<P> for DotRenderer {
    fn render(&self, page: &P, scale: f32) -> Result<RasterImage, ImportError> {
        assert!(scale > 0.0);
        let value = (page.intrinsic_rotation().degrees() / 90) as u8;
        Ok(RasterImage::new(1, 1, vec![value, 0, 0, 255]))
    }
}

/// Always fails to render.
pub struct BrokenRenderer;

impl<P: SourcePage> Renderer<P> for BrokenRenderer {
    fn render(&self, _page: &P, _scale: f32) -> Result<RasterImage, ImportError> {
        Err(ImportError::Corrupt("renderer offline".to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tag backend: a source is a list of page tags, an output is the list of
// (tag, rotation) pairs. Tag 0xFF cannot be copied.
// ---------------------------------------------------------------------------

pub const POISON: u8 = 0xFF;

#[derive(Default)]
pub struct TagDecoder;

pub struct TagDocument(Vec<u8>);

pub struct TagPage(u8);

impl SourcePage for TagPage {
    fn intrinsic_rotation(&self) -> Rotation {
        Rotation::R0
    }
}

impl DecodedDocument for TagDocument {
    type Page = TagPage;

    fn page_count(&self) -> u32 {
        self.0.len() as u32
    }

    fn page(&self, index: u32) -> Result<TagPage, CopyError> {
        self.0
            .get(index as usize)
            .map(|&tag| TagPage(tag))
            .ok_or(CopyError::OutOfRange {
                index,
                page_count: self.page_count(),
            })
    }
}

impl Decoder for TagDecoder {
    type Document = TagDocument;

    fn decode(&self, bytes: &[u8]) -> Result<TagDocument, ImportError> {
        Ok(TagDocument(bytes.to_vec()))
    }
}

#[derive(Default)]
pub struct TagEncoder;

pub struct TagOutput(Vec<u8>);

impl OutputDocument<TagPage> for TagOutput {
    fn append_copied_page(&mut self, page: &TagPage, rotation: Rotation) -> Result<(), CopyError> {
        if page.0 == POISON {
            return Err(CopyError::Malformed("poisoned page".to_string()));
        }
        self.0.push(page.0);
        self.0.push((rotation.degrees() / 90) as u8);
        Ok(())
    }

    fn page_count(&self) -> usize {
        self.0.len() / 2
    }

    fn finalize(self) -> Result<Vec<u8>, CompositionError> {
        Ok(self.0)
    }
}

impl Encoder<TagPage> for TagEncoder {
    type Output = TagOutput;

    fn new_document(&self, _options: &ComposeOptions) -> TagOutput {
        TagOutput(Vec::new())
    }
}
