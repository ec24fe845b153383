//! Backend abstraction layer.
//!
//! The session and the composition engine only talk to PDF machinery through
//! these traits: a [`Decoder`] turns raw bytes into a navigable document, an
//! [`Encoder`] accumulates copied pages into a new document, and an optional
//! [`Renderer`] produces preview thumbnails. [`pdf`] provides the `lopdf`
//! implementation of the first two.

pub mod pdf;

pub use pdf::{LopdfDecoder, LopdfEncoder, LopdfOutput, LopdfPage, LopdfSource};

use crate::compose::ComposeOptions;
use crate::error::{CompositionError, CopyError, ImportError};
use crate::model::{RasterImage, Rotation};

/// Page type handed out by a decoder's documents.
pub type PageOf<D> = <<D as Decoder>::Document as DecodedDocument>::Page;

/// A single page of a decoded source.
pub trait SourcePage {
    /// Rotation the page already carries in its source document.
    fn intrinsic_rotation(&self) -> Rotation;
}

/// A decoded source document.
pub trait DecodedDocument {
    /// Handle to one page.
    type Page: SourcePage;

    /// Number of pages.
    fn page_count(&self) -> u32;

    /// Page at zero-based `index`.
    fn page(&self, index: u32) -> Result<Self::Page, CopyError>;
}

/// Turns raw bytes into a [`DecodedDocument`].
pub trait Decoder {
    /// Decoded document type.
    type Document: DecodedDocument;

    /// Decode a whole file. Failures are treated as hard import failures.
    fn decode(&self, bytes: &[u8]) -> Result<Self::Document, ImportError>;
}

/// Accumulates copied pages and serializes the result.
pub trait OutputDocument<P> {
    /// Copy `page` in as the next output page with its rotation set to
    /// `rotation`.
    fn append_copied_page(&mut self, page: &P, rotation: Rotation) -> Result<(), CopyError>;

    /// Number of pages appended so far.
    fn page_count(&self) -> usize;

    /// Serialize the accumulated document.
    fn finalize(self) -> Result<Vec<u8>, CompositionError>;
}

/// Creates empty output documents.
pub trait Encoder<P> {
    /// Output accumulator type.
    type Output: OutputDocument<P>;

    /// Start a new, empty output document.
    fn new_document(&self, options: &ComposeOptions) -> Self::Output;
}

/// Renders page previews. Never used by composition.
pub trait Renderer<P>: Send + Sync {
    /// Render `page` at `scale` (1.0 = 72 dpi).
    fn render(&self, page: &P, scale: f32) -> Result<RasterImage, ImportError>;
}
