//! Document composition.
//!
//! The [`CompositionEngine`] walks an ordered list of page records, resolves
//! each one back to its source document, copies the page into an output
//! accumulator with the combined rotation, and serializes the result.
//!
//! # Example
//!
//! ```no_run
//! use pdfworker::backend::{LopdfDecoder, LopdfEncoder};
//! use pdfworker::compose::{ComposeOptions, CompositionEngine};
//! use pdfworker::model::{PageCollection, SourceRegistry};
//!
//! # fn run(pages: &PageCollection, registry: &SourceRegistry) -> pdfworker::Result<()> {
//! let options = ComposeOptions::default();
//! let engine = CompositionEngine::new(&LopdfDecoder, &LopdfEncoder, &options);
//! let result = engine.compose_collection(pages, registry)?;
//! std::fs::write("merged.pdf", result.bytes).unwrap();
//! # Ok(())
//! # }
//! ```

mod engine;
mod options;

pub use engine::{collect_source_bytes, ComposeResult, CompositionEngine, SourceBytes};
pub use options::{ComposeOptions, OutputMetadata, DEFAULT_PRODUCER};
