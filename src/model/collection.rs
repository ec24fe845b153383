//! The ordered page list the user edits.

use std::collections::HashSet;

use serde::Serialize;

use super::{PageId, PageRecord, Rotation, SourceId};
use crate::error::CollectionError;

/// JSON output format for [`PageCollection::to_json`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

/// Ordered list of page records. The order is the output page order.
///
/// Page ids are unique within the collection.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PageCollection {
    pages: Vec<PageRecord>,
}

impl PageCollection {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append records at the end, keeping their order.
    ///
    /// Nothing is appended if any id is already present or repeats inside
    /// `records`.
    pub fn append(&mut self, records: Vec<PageRecord>) -> Result<(), CollectionError> {
        let mut seen: HashSet<PageId> = self.pages.iter().map(|p| p.id).collect();
        for record in &records {
            if !seen.insert(record.id) {
                return Err(CollectionError::DuplicateId(record.id));
            }
        }
        self.pages.extend(records);
        Ok(())
    }

    /// Remove the record with `id`; later records shift down by one.
    pub fn remove(&mut self, id: PageId) -> Result<PageRecord, CollectionError> {
        let index = self.index_of(id)?;
        Ok(self.pages.remove(index))
    }

    /// Pick up the record with `id` and drop it at `to_index`.
    ///
    /// `to_index` is clamped to the length of the list without the record.
    /// Returns the index the record ended up at.
    pub fn move_to(&mut self, id: PageId, to_index: usize) -> Result<usize, CollectionError> {
        let from = self.index_of(id)?;
        let record = self.pages.remove(from);
        let to = to_index.min(self.pages.len());
        self.pages.insert(to, record);
        Ok(to)
    }

    /// Replace the record's rotation with `degrees` normalized mod 360.
    ///
    /// This sets an absolute value; calling it twice with 90 leaves 90.
    pub fn set_rotation(&mut self, id: PageId, degrees: i32) -> Result<Rotation, CollectionError> {
        let rotation = Rotation::from_degrees(degrees)?;
        let index = self.index_of(id)?;
        self.pages[index].rotation = rotation;
        Ok(rotation)
    }

    /// Read the current rotation, add 90 and store it.
    pub fn rotate_clockwise(&mut self, id: PageId) -> Result<Rotation, CollectionError> {
        let current = self.get(id).ok_or(CollectionError::NotFound(id))?.rotation;
        self.set_rotation(id, current.degrees() + 90)
    }

    /// Remove every record.
    pub fn clear(&mut self) {
        self.pages.clear();
    }

    /// Snapshot of the records in current order.
    pub fn to_ordered_list(&self) -> Vec<PageRecord> {
        self.pages.clone()
    }

    /// Look up a record.
    pub fn get(&self, id: PageId) -> Option<&PageRecord> {
        self.pages.iter().find(|p| p.id == id)
    }

    /// Current index of a record.
    pub fn position(&self, id: PageId) -> Option<usize> {
        self.pages.iter().position(|p| p.id == id)
    }

    /// Check whether any record points at `source_id`.
    pub fn references_source(&self, source_id: SourceId) -> bool {
        self.pages.iter().any(|p| p.source_id == source_id)
    }

    /// Iterate records in order.
    pub fn iter(&self) -> std::slice::Iter<'_, PageRecord> {
        self.pages.iter()
    }

    /// Page ids in order.
    pub fn ids(&self) -> Vec<PageId> {
        self.pages.iter().map(|p| p.id).collect()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Check if the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Serialize the page order (without previews) for a UI layer.
    pub fn to_json(&self, format: JsonFormat) -> serde_json::Result<String> {
        match format {
            JsonFormat::Pretty => serde_json::to_string_pretty(self),
            JsonFormat::Compact => serde_json::to_string(self),
        }
    }

    fn index_of(&self, id: PageId) -> Result<usize, CollectionError> {
        self.position(id).ok_or(CollectionError::NotFound(id))
    }
}

impl<'a> IntoIterator for &'a PageCollection {
    type Item = &'a PageRecord;
    type IntoIter = std::slice::Iter<'a, PageRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.pages.iter()
    }
}
