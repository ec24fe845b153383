//! Error types for pdfworker.
//!
//! Failures are split by the stage that produces them: importing a file,
//! mutating the page collection, or composing the output.

use std::io;
use thiserror::Error;

use crate::model::{PageId, SourceId};

/// Result type alias for pdfworker operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error for any pdfworker operation.
#[derive(Error, Debug)]
pub enum Error {
    /// A file could not be imported.
    #[error(transparent)]
    Import(#[from] ImportError),

    /// The page collection rejected a mutation.
    #[error(transparent)]
    Collection(#[from] CollectionError),

    /// The output document could not be composed.
    #[error(transparent)]
    Composition(#[from] CompositionError),
}

/// Errors raised while importing a source file.
///
/// Reported per file; one bad file never aborts the rest of a batch.
#[derive(Error, Debug)]
pub enum ImportError {
    /// The payload is not a PDF (or a PDF version we do not accept).
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The payload looks like a PDF but its structure cannot be decoded.
    #[error("Corrupted PDF: {0}")]
    Corrupt(String),

    /// Encrypted documents are not supported.
    #[error("Document is encrypted")]
    Encrypted,

    /// Reading the file failed.
    #[error("I/O error: {0}")]
    IoFailure(#[from] io::Error),
}

/// Internal-consistency violations of the page collection or source registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollectionError {
    /// No page with this id is in the collection.
    #[error("Page {0} not found")]
    NotFound(PageId),

    /// A page with this id is already in the collection.
    #[error("Duplicate page id {0}")]
    DuplicateId(PageId),

    /// No source with this id is registered.
    #[error("Source {0} not found")]
    SourceNotFound(SourceId),

    /// A page record pointed past the end of its source.
    #[error("Page index {index} is out of range (source has {page_count} pages)")]
    PageIndexOutOfRange {
        /// Zero-based page index requested
        index: u32,
        /// Page count of the source
        page_count: u32,
    },

    /// Rotation was not a multiple of 90 degrees.
    #[error("Invalid rotation: {0} degrees is not a multiple of 90")]
    InvalidRotation(i32),
}

/// Errors that abort an export. No partial output is ever returned.
#[derive(Error, Debug)]
pub enum CompositionError {
    /// A page referenced a source that is not available to the pass.
    #[error("Source {0} is unavailable")]
    SourceUnavailable(SourceId),

    /// Copying one page into the output failed.
    #[error("Failed to copy page {page_id} at position {position}: {reason}")]
    PageCopyFailed {
        /// Zero-based position in the output order
        position: usize,
        /// Record that failed
        page_id: PageId,
        /// Backend message
        reason: String,
    },

    /// There are no pages to export.
    #[error("Cannot export an empty page collection")]
    EmptyCollection,

    /// Another export pass has not finished yet.
    #[error("An export is already in progress")]
    ExportInProgress,

    /// Serializing the output document failed.
    #[error("Encoding error: {0}")]
    Encode(String),
}

/// A backend failed to hand out or copy a single page.
///
/// The composition engine wraps it into [`CompositionError::PageCopyFailed`]
/// together with the page's output position.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CopyError {
    /// The source has fewer pages than the record expects.
    #[error("page index {index} is out of range (source has {page_count} pages)")]
    OutOfRange {
        /// Zero-based page index requested
        index: u32,
        /// Page count of the decoded source
        page_count: u32,
    },

    /// The page object graph is broken.
    #[error("malformed page: {0}")]
    Malformed(String),
}

impl From<lopdf::Error> for ImportError {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => ImportError::IoFailure(e),
            lopdf::Error::Decryption(_) => ImportError::Encrypted,
            _ => ImportError::Corrupt(err.to_string()),
        }
    }
}

impl From<lopdf::Error> for CompositionError {
    fn from(err: lopdf::Error) -> Self {
        CompositionError::Encode(err.to_string())
    }
}
