//! In-memory model of the composition session.
//!
//! A [`SourceRegistry`] owns the bytes of every imported file, and a
//! [`PageCollection`] holds the ordered [`PageRecord`]s that point back into
//! those sources. Neither type knows anything about PDF syntax.

mod collection;
mod page;
mod source;

pub use collection::{JsonFormat, PageCollection};
pub use page::{PageId, PageRecord, RasterImage, Rotation};
pub use source::{SourceDocument, SourceId, SourceRegistry};
