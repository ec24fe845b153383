//! Source documents and the registry that owns their bytes.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::PageCollection;
use crate::error::CollectionError;

/// Identity of one import event.
///
/// Importing the same file twice yields two different ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(Uuid);

impl SourceId {
    /// Generate a fresh id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SourceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One imported input file.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Identity of the import event
    pub id: SourceId,

    /// Original file name, if known
    pub name: Option<String>,

    /// Raw file content; never mutated after registration
    pub bytes: Arc<[u8]>,

    /// Number of pages in the decoded document
    pub page_count: u32,

    /// When the file was imported
    pub imported_at: DateTime<Utc>,
}

impl SourceDocument {
    /// Size of the raw content in bytes.
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    /// Name for log messages.
    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.id.to_string())
    }
}

/// Owns the bytes of every imported source for the session.
///
/// Sources stay registered after their last page is deleted, so a removed
/// page can be re-added without importing the file again. Call
/// [`SourceRegistry::retain_referenced`] to drop the unreferenced ones.
#[derive(Debug, Default)]
pub struct SourceRegistry {
    sources: HashMap<SourceId, SourceDocument>,
}

impl SourceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the bytes of one import event and return its new id.
    pub fn register(
        &mut self,
        bytes: impl Into<Arc<[u8]>>,
        page_count: u32,
        name: Option<String>,
    ) -> SourceId {
        let id = SourceId::new();
        let document = SourceDocument {
            id,
            name,
            bytes: bytes.into(),
            page_count,
            imported_at: Utc::now(),
        };
        log::debug!(
            "Registered source {} ({} pages, {} bytes)",
            document.display_name(),
            page_count,
            document.byte_len()
        );
        self.sources.insert(id, document);
        id
    }

    /// Look up a source.
    pub fn get(&self, id: SourceId) -> Result<&SourceDocument, CollectionError> {
        self.sources
            .get(&id)
            .ok_or(CollectionError::SourceNotFound(id))
    }

    /// Check whether a source is registered.
    pub fn contains(&self, id: SourceId) -> bool {
        self.sources.contains_key(&id)
    }

    /// Drop a source. Returns it if it was registered.
    pub fn release(&mut self, id: SourceId) -> Option<SourceDocument> {
        self.sources.remove(&id)
    }

    /// Drop every source that no page in `pages` references.
    ///
    /// Returns the number of sources released.
    pub fn retain_referenced(&mut self, pages: &PageCollection) -> usize {
        let before = self.sources.len();
        self.sources.retain(|id, _| pages.references_source(*id));
        let released = before - self.sources.len();
        if released > 0 {
            log::debug!("Released {} unreferenced source(s)", released);
        }
        released
    }

    /// Ids of all registered sources.
    pub fn ids(&self) -> impl Iterator<Item = SourceId> + '_ {
        self.sources.keys().copied()
    }

    /// Number of registered sources.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Check if no source is registered.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Total bytes held across all sources.
    pub fn total_bytes(&self) -> usize {
        self.sources.values().map(SourceDocument::byte_len).sum()
    }

    /// Drop every source.
    pub fn clear(&mut self) {
        self.sources.clear();
    }
}
