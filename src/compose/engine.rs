//! The composition engine: page records in, one output document out.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rayon::prelude::*;

use super::ComposeOptions;
use crate::backend::{DecodedDocument, Decoder, Encoder, OutputDocument, PageOf, SourcePage};
use crate::error::{CompositionError, CopyError};
use crate::model::{PageCollection, PageId, PageRecord, SourceId, SourceRegistry};

/// Raw bytes of every source a pass may need, keyed by id.
pub type SourceBytes = HashMap<SourceId, Arc<[u8]>>;

/// Collect the bytes of every source referenced by `pages`.
///
/// Sources missing from the registry are left out; the engine reports them
/// as [`CompositionError::SourceUnavailable`].
pub fn collect_source_bytes(pages: &[PageRecord], registry: &SourceRegistry) -> SourceBytes {
    let mut sources = SourceBytes::new();
    for record in pages {
        if sources.contains_key(&record.source_id) {
            continue;
        }
        if let Ok(source) = registry.get(record.source_id) {
            sources.insert(record.source_id, Arc::clone(&source.bytes));
        }
    }
    sources
}

/// Output of one composition pass.
#[derive(Debug, Clone)]
pub struct ComposeResult {
    /// Serialized output document
    pub bytes: Vec<u8>,

    /// Number of pages written
    pub page_count: usize,

    /// Number of distinct sources decoded during the pass
    pub sources_decoded: usize,
}

impl ComposeResult {
    /// Size of the output in bytes.
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    /// Take the output bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// First record that needs a given source; decode errors are reported
/// against it.
struct SourceUse {
    source_id: SourceId,
    position: usize,
    page_id: PageId,
}

/// Builds one output document from an ordered list of page records.
///
/// Stateless between calls: decoded sources are cached for one pass only.
pub struct CompositionEngine<'a, D, E> {
    decoder: &'a D,
    encoder: &'a E,
    options: &'a ComposeOptions,
}

impl<'a, D, E> CompositionEngine<'a, D, E>
where
    D: Decoder + Sync,
    D::Document: Send,
    E: Encoder<PageOf<D>>,
{
    /// Create an engine over the given backends.
    pub fn new(decoder: &'a D, encoder: &'a E, options: &'a ComposeOptions) -> Self {
        Self {
            decoder,
            encoder,
            options,
        }
    }

    /// Compose the current contents of `pages`.
    pub fn compose_collection(
        &self,
        pages: &PageCollection,
        registry: &SourceRegistry,
    ) -> Result<ComposeResult, CompositionError> {
        let snapshot = pages.to_ordered_list();
        let sources = collect_source_bytes(&snapshot, registry);
        self.compose(&snapshot, &sources)
    }

    /// Compose `pages` in order.
    ///
    /// Any failure aborts the whole pass; no bytes are produced.
    pub fn compose(
        &self,
        pages: &[PageRecord],
        sources: &SourceBytes,
    ) -> Result<ComposeResult, CompositionError> {
        if pages.is_empty() {
            return Err(CompositionError::EmptyCollection);
        }

        let uses = source_uses(pages);
        if let Some(missing) = uses.iter().find(|u| !sources.contains_key(&u.source_id)) {
            return Err(CompositionError::SourceUnavailable(missing.source_id));
        }

        log::debug!(
            "Composing {} pages from {} source(s)",
            pages.len(),
            uses.len()
        );
        let decoded = self.decode_sources(&uses, sources)?;

        let mut output = self.encoder.new_document(self.options);
        for (position, record) in pages.iter().enumerate() {
            let document = decoded
                .get(&record.source_id)
                .ok_or(CompositionError::SourceUnavailable(record.source_id))?;

            let page = document
                .page(record.source_page_index)
                .map_err(|e| copy_failed(position, record, e))?;

            let rotation = page.intrinsic_rotation().compose(record.rotation);
            log::debug!(
                "Page {}: source {} #{} rotated {} (intrinsic {})",
                position,
                record.source_id,
                record.source_page_index,
                rotation,
                page.intrinsic_rotation()
            );

            output
                .append_copied_page(&page, rotation)
                .map_err(|e| copy_failed(position, record, e))?;
        }

        let page_count = output.page_count();
        let bytes = output.finalize()?;
        log::info!(
            "Composed {} pages ({} bytes) from {} source(s)",
            page_count,
            bytes.len(),
            decoded.len()
        );

        Ok(ComposeResult {
            bytes,
            page_count,
            sources_decoded: decoded.len(),
        })
    }

    fn decode_sources(
        &self,
        uses: &[SourceUse],
        sources: &SourceBytes,
    ) -> Result<HashMap<SourceId, D::Document>, CompositionError> {
        let decoder = self.decoder;
        let decode = |source_use: &SourceUse| decode_one(decoder, source_use, sources);

        let results: Vec<_> = if self.options.parallel && uses.len() > 1 {
            uses.par_iter().map(decode).collect()
        } else {
            uses.iter().map(decode).collect()
        };

        // Errors surface in page order regardless of completion order.
        results.into_iter().collect()
    }
}

fn decode_one<D: Decoder>(
    decoder: &D,
    source_use: &SourceUse,
    sources: &SourceBytes,
) -> Result<(SourceId, D::Document), CompositionError> {
    let bytes = sources
        .get(&source_use.source_id)
        .ok_or(CompositionError::SourceUnavailable(source_use.source_id))?;

    decoder
        .decode(bytes)
        .map(|document| (source_use.source_id, document))
        .map_err(|e| CompositionError::PageCopyFailed {
            position: source_use.position,
            page_id: source_use.page_id,
            reason: format!("source could not be decoded: {}", e),
        })
}

/// Distinct sources in order of first appearance.
fn source_uses(pages: &[PageRecord]) -> Vec<SourceUse> {
    let mut seen = HashSet::new();
    pages
        .iter()
        .enumerate()
        .filter(|(_, record)| seen.insert(record.source_id))
        .map(|(position, record)| SourceUse {
            source_id: record.source_id,
            position,
            page_id: record.id,
        })
        .collect()
}

fn copy_failed(position: usize, record: &PageRecord, err: CopyError) -> CompositionError {
    CompositionError::PageCopyFailed {
        position,
        page_id: record.id,
        reason: err.to_string(),
    }
}
