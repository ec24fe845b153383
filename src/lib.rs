//! # pdfworker
//!
//! Compose a single PDF from pages of many PDFs.
//!
//! Pages are imported from any number of source files, then reordered,
//! rotated or deleted independently, and finally composed into one output
//! document. Page content is copied byte-for-byte from its source.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdfworker::Workspace;
//!
//! fn main() -> pdfworker::Result<()> {
//!     let mut workspace = Workspace::new();
//!     let report = workspace.import_file("scan.pdf")?;
//!
//!     // Last page first, upside down.
//!     let last = *report.page_ids.last().unwrap();
//!     workspace.move_page(last, 0)?;
//!     workspace.set_rotation(last, 180)?;
//!
//!     let output = workspace.export()?;
//!     std::fs::write("merged.pdf", output.bytes).unwrap();
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Stable page identity**: records keep their id across every edit
//! - **Rotation composition**: the user's rotation is added to the page's own
//! - **All-or-nothing export**: any failing page aborts with no output
//! - **Parallel decoding**: uses Rayon when many sources feed one export
//! - **Pluggable backends**: decoding, encoding and previews sit behind traits

pub mod backend;
pub mod compose;
pub mod detect;
pub mod error;
pub mod model;
pub mod workspace;

// Re-export commonly used types
pub use backend::{LopdfDecoder, LopdfEncoder};
pub use compose::{ComposeOptions, ComposeResult, CompositionEngine, OutputMetadata};
pub use detect::{detect_format_from_bytes, is_pdf_bytes, PdfFormat};
pub use error::{CollectionError, CompositionError, CopyError, Error, ImportError, Result};
pub use model::{
    JsonFormat, PageCollection, PageId, PageRecord, RasterImage, Rotation, SourceDocument,
    SourceId, SourceRegistry,
};
pub use workspace::{
    BatchImport, ExportJob, ExportReport, ImportOptions, ImportReport, Mutation, MutationOutcome,
    Workspace,
};

/// Concatenate whole PDF documents in the given order.
///
/// # Example
///
/// ```no_run
/// let a = std::fs::read("a.pdf").unwrap();
/// let b = std::fs::read("b.pdf").unwrap();
/// let merged = pdfworker::merge(&[&a, &b]).unwrap();
/// std::fs::write("merged.pdf", merged).unwrap();
/// ```
pub fn merge(documents: &[&[u8]]) -> Result<Vec<u8>> {
    merge_with_options(documents, ComposeOptions::default())
}

/// Concatenate whole PDF documents with custom compose options.
pub fn merge_with_options(documents: &[&[u8]], options: ComposeOptions) -> Result<Vec<u8>> {
    let mut workspace = Workspace::new()
        .with_import_options(ImportOptions::new().with_previews(false))
        .with_compose_options(options);

    for (index, bytes) in documents.iter().enumerate() {
        let name = format!("document {}", index + 1);
        workspace.import_bytes(Some(&name), *bytes)?;
    }

    Ok(workspace.export()?.into_bytes())
}
