//! The editing session: import, page edits and export.
//!
//! A [`Workspace`] owns the [`SourceRegistry`] and the [`PageCollection`]
//! and is the only place both are mutated. Exports run against a frozen
//! [`ExportJob`] snapshot; edits that arrive while an export is in flight
//! are queued and applied once it finishes.
//!
//! # Example
//!
//! ```no_run
//! use pdfworker::Workspace;
//!
//! fn main() -> pdfworker::Result<()> {
//!     let mut workspace = Workspace::new();
//!     let a = workspace.import_file("a.pdf")?;
//!     let b = workspace.import_file("b.pdf")?;
//!
//!     // Put the first page of b.pdf in front and turn it sideways.
//!     workspace.move_page(b.page_ids[0], 0)?;
//!     workspace.rotate_clockwise(b.page_ids[0])?;
//!     workspace.remove(a.page_ids[1])?;
//!
//!     let result = workspace.export()?;
//!     std::fs::write("merged.pdf", result.bytes).unwrap();
//!     Ok(())
//! }
//! ```

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;

use crate::backend::{
    DecodedDocument, Decoder, Encoder, LopdfDecoder, LopdfEncoder, PageOf, Renderer,
};
use crate::compose::{
    collect_source_bytes, ComposeOptions, ComposeResult, CompositionEngine, SourceBytes,
};
use crate::detect::detect_format_from_bytes;
use crate::error::{CollectionError, CompositionError, Error, ImportError, Result};
use crate::model::{PageCollection, PageId, PageRecord, Rotation, SourceId, SourceRegistry};

/// Thumbnail scale used for previews.
pub const DEFAULT_PREVIEW_SCALE: f32 = 0.5;

/// Options for importing files.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Render a preview for each page (requires a renderer)
    pub render_previews: bool,

    /// Preview scale (1.0 = 72 dpi)
    pub preview_scale: f32,

    /// Reject payloads without a `%PDF-` header before decoding
    pub check_header: bool,
}

impl ImportOptions {
    /// Create new import options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable preview rendering.
    pub fn with_previews(mut self, render: bool) -> Self {
        self.render_previews = render;
        self
    }

    /// Set preview scale.
    pub fn with_preview_scale(mut self, scale: f32) -> Self {
        self.preview_scale = scale;
        self
    }

    /// Enable or disable the header check.
    pub fn with_header_check(mut self, check: bool) -> Self {
        self.check_header = check;
        self
    }
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            render_previews: true,
            preview_scale: DEFAULT_PREVIEW_SCALE,
            check_header: true,
        }
    }
}

/// An edit to the page collection.
#[derive(Debug, Clone)]
pub enum Mutation {
    /// Add records at the end
    Append(Vec<PageRecord>),
    /// Delete a record
    Remove(PageId),
    /// Pick up a record and drop it at `to_index`
    Move {
        /// Record to move
        id: PageId,
        /// Target index
        to_index: usize,
    },
    /// Set absolute rotation
    SetRotation {
        /// Record to rotate
        id: PageId,
        /// Multiple of 90
        degrees: i32,
    },
    /// Add a quarter turn to the current rotation
    RotateClockwise(PageId),
    /// Remove every record
    Clear,
}

/// What happened to a [`Mutation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// Applied to the collection immediately
    Applied,
    /// Queued until the running export finishes
    Deferred,
}

/// Result of importing one file.
#[derive(Debug, Clone)]
pub struct ImportReport {
    /// Registry id of the imported file
    pub source_id: SourceId,

    /// File name, if known
    pub name: Option<String>,

    /// Ids of the new page records, in source page order
    pub page_ids: Vec<PageId>,

    /// Whether the pages were queued behind a running export
    pub outcome: MutationOutcome,
}

impl ImportReport {
    /// Number of pages imported.
    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }
}

/// Result of importing several files.
#[derive(Debug, Default)]
pub struct BatchImport {
    /// Files imported successfully, in input order
    pub imported: Vec<ImportReport>,

    /// Files that failed, with their names
    pub failures: Vec<(String, Error)>,
}

impl BatchImport {
    /// Check whether every file was imported.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Total pages imported across all files.
    pub fn page_count(&self) -> usize {
        self.imported.iter().map(ImportReport::page_count).sum()
    }
}

/// Frozen input of one export pass.
///
/// Holds its own copy of the page order and shared handles to the source
/// bytes, so it can be run on another thread while the workspace keeps
/// accepting (deferred) edits.
#[derive(Debug, Clone)]
pub struct ExportJob {
    pages: Vec<PageRecord>,
    sources: SourceBytes,
    options: ComposeOptions,
}

impl ExportJob {
    /// Page order of this pass.
    pub fn pages(&self) -> &[PageRecord] {
        &self.pages
    }

    /// Number of pages that will be written.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Run the composition pass.
    pub fn run<D, E>(&self, decoder: &D, encoder: &E) -> std::result::Result<ComposeResult, CompositionError>
    where
        D: Decoder + Sync,
        D::Document: Send,
        E: Encoder<PageOf<D>>,
    {
        CompositionEngine::new(decoder, encoder, &self.options).compose(&self.pages, &self.sources)
    }
}

/// Outcome of [`Workspace::finish_export`].
#[derive(Debug)]
pub struct ExportReport {
    /// The composed document, or why the pass failed
    pub result: std::result::Result<ComposeResult, CompositionError>,

    /// Deferred edits that could not be applied
    pub deferred_failures: Vec<CollectionError>,
}

/// One editing session.
pub struct Workspace<D: Decoder = LopdfDecoder, E = LopdfEncoder> {
    decoder: D,
    encoder: E,
    renderer: Option<Box<dyn Renderer<PageOf<D>>>>,
    registry: SourceRegistry,
    pages: PageCollection,
    import_options: ImportOptions,
    compose_options: ComposeOptions,
    exporting: bool,
    pending: VecDeque<Mutation>,
}

impl Workspace {
    /// Create a workspace backed by `lopdf`.
    pub fn new() -> Self {
        Self::with_backends(LopdfDecoder, LopdfEncoder)
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

impl<D, E> Workspace<D, E>
where
    D: Decoder + Sync,
    D::Document: Send,
    E: Encoder<PageOf<D>>,
{
    /// Create a workspace over custom backends.
    pub fn with_backends(decoder: D, encoder: E) -> Self {
        Self {
            decoder,
            encoder,
            renderer: None,
            registry: SourceRegistry::new(),
            pages: PageCollection::new(),
            import_options: ImportOptions::default(),
            compose_options: ComposeOptions::default(),
            exporting: false,
            pending: VecDeque::new(),
        }
    }

    /// Set the preview renderer.
    pub fn with_renderer(mut self, renderer: impl Renderer<PageOf<D>> + 'static) -> Self {
        self.renderer = Some(Box::new(renderer));
        self
    }

    /// Set import options.
    pub fn with_import_options(mut self, options: ImportOptions) -> Self {
        self.import_options = options;
        self
    }

    /// Set compose options.
    pub fn with_compose_options(mut self, options: ComposeOptions) -> Self {
        self.compose_options = options;
        self
    }

    /// The current page order.
    pub fn pages(&self) -> &PageCollection {
        &self.pages
    }

    /// Registered sources.
    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Check whether an export pass is in flight.
    pub fn is_exporting(&self) -> bool {
        self.exporting
    }

    /// Number of edits waiting for the running export.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Import one file from memory.
    ///
    /// Every call registers a new source, even for bytes seen before.
    pub fn import_bytes(
        &mut self,
        name: Option<&str>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Result<ImportReport> {
        let bytes: Arc<[u8]> = bytes.into();
        let label = name.unwrap_or("<memory>");

        if self.import_options.check_header {
            let format = detect_format_from_bytes(&bytes)?;
            log::debug!("Importing {} ({})", label, format);
        }

        let document = self.decoder.decode(&bytes)?;
        let page_count = document.page_count();
        if page_count == 0 {
            return Err(ImportError::Corrupt(format!("{} has no pages", label)).into());
        }

        let source_id = self
            .registry
            .register(bytes, page_count, name.map(str::to_string));
        let records = match self.build_records(source_id, &document) {
            Ok(records) => records,
            Err(e) => {
                self.registry.release(source_id);
                return Err(e.into());
            }
        };
        let page_ids: Vec<PageId> = records.iter().map(|r| r.id).collect();

        let outcome = match self.apply(Mutation::Append(records)) {
            Ok(outcome) => outcome,
            Err(e) => {
                self.registry.release(source_id);
                return Err(e.into());
            }
        };

        log::info!("Imported {}: {} pages", label, page_count);
        Ok(ImportReport {
            source_id,
            name: name.map(str::to_string),
            page_ids,
            outcome,
        })
    }

    /// Import one file from disk.
    pub fn import_file<P: AsRef<Path>>(&mut self, path: P) -> Result<ImportReport> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(ImportError::IoFailure)?;
        let name = path.file_name().map(|n| n.to_string_lossy().to_string());
        self.import_bytes(name.as_deref(), bytes)
    }

    /// Import several files; a failing file does not stop the others.
    pub fn import_batch<I, N>(&mut self, files: I) -> BatchImport
    where
        I: IntoIterator<Item = (N, Vec<u8>)>,
        N: Into<String>,
    {
        let mut batch = BatchImport::default();
        for (name, bytes) in files {
            let name = name.into();
            match self.import_bytes(Some(&name), bytes) {
                Ok(report) => batch.imported.push(report),
                Err(e) => {
                    log::warn!("Failed to import {}: {}", name, e);
                    batch.failures.push((name, e));
                }
            }
        }
        batch
    }

    /// Apply an edit, or queue it while an export is in flight.
    ///
    /// A queued edit is checked first: a bad rotation or an id that is
    /// neither in the collection nor in a queued append fails right away.
    pub fn apply(&mut self, mutation: Mutation) -> std::result::Result<MutationOutcome, CollectionError> {
        if self.exporting {
            self.check_deferred(&mutation)?;
            log::debug!("Deferring {:?} until export finishes", MutationKind(&mutation));
            self.pending.push_back(mutation);
            return Ok(MutationOutcome::Deferred);
        }
        apply_to(&mut self.pages, mutation)?;
        Ok(MutationOutcome::Applied)
    }

    /// Delete a page.
    pub fn remove(&mut self, id: PageId) -> Result<MutationOutcome> {
        Ok(self.apply(Mutation::Remove(id))?)
    }

    /// Move a page to `to_index`.
    pub fn move_page(&mut self, id: PageId, to_index: usize) -> Result<MutationOutcome> {
        Ok(self.apply(Mutation::Move { id, to_index })?)
    }

    /// Set a page's rotation.
    pub fn set_rotation(&mut self, id: PageId, degrees: i32) -> Result<MutationOutcome> {
        Ok(self.apply(Mutation::SetRotation { id, degrees })?)
    }

    /// Rotate a page a quarter turn clockwise.
    pub fn rotate_clockwise(&mut self, id: PageId) -> Result<MutationOutcome> {
        Ok(self.apply(Mutation::RotateClockwise(id))?)
    }

    /// Remove every page. Sources stay registered.
    pub fn clear(&mut self) -> Result<MutationOutcome> {
        Ok(self.apply(Mutation::Clear)?)
    }

    /// Release sources no page refers to. Does nothing during an export,
    /// since queued imports may still need their sources.
    pub fn prune_sources(&mut self) -> usize {
        if self.exporting {
            return 0;
        }
        self.registry.retain_referenced(&self.pages)
    }

    /// Freeze the current page order for an export pass.
    pub fn begin_export(&mut self) -> std::result::Result<ExportJob, CompositionError> {
        if self.exporting {
            return Err(CompositionError::ExportInProgress);
        }
        if self.pages.is_empty() {
            return Err(CompositionError::EmptyCollection);
        }

        let pages = self.pages.to_ordered_list();
        let sources = collect_source_bytes(&pages, &self.registry);
        self.exporting = true;
        log::debug!("Export started with {} pages", pages.len());

        Ok(ExportJob {
            pages,
            sources,
            options: self.compose_options.clone(),
        })
    }

    /// End the export pass and apply the edits queued during it.
    pub fn finish_export(
        &mut self,
        result: std::result::Result<ComposeResult, CompositionError>,
    ) -> ExportReport {
        if let Err(e) = &result {
            log::warn!("Export failed: {}", e);
        }
        ExportReport {
            result,
            deferred_failures: self.end_export(),
        }
    }

    /// Give up on a pass started with [`begin_export`](Self::begin_export)
    /// whose job was dropped or will never report back.
    ///
    /// Queued edits are applied as in [`finish_export`](Self::finish_export);
    /// the ones that failed are returned. Does nothing if no export is in
    /// flight.
    pub fn abort_export(&mut self) -> Vec<CollectionError> {
        if !self.exporting {
            return Vec::new();
        }
        log::info!("Export aborted with {} queued edit(s)", self.pending.len());
        self.end_export()
    }

    fn end_export(&mut self) -> Vec<CollectionError> {
        self.exporting = false;

        let mut failures = Vec::new();
        while let Some(mutation) = self.pending.pop_front() {
            if let Err(e) = apply_to(&mut self.pages, mutation) {
                log::warn!("Deferred edit failed: {}", e);
                failures.push(e);
            }
        }
        failures
    }

    fn check_deferred(&self, mutation: &Mutation) -> std::result::Result<(), CollectionError> {
        let id = match mutation {
            Mutation::Append(_) | Mutation::Clear => return Ok(()),
            Mutation::SetRotation { id, degrees } => {
                Rotation::from_degrees(*degrees)?;
                *id
            }
            Mutation::Remove(id) | Mutation::RotateClockwise(id) | Mutation::Move { id, .. } => *id,
        };

        let queued = self.pending.iter().any(|m| match m {
            Mutation::Append(records) => records.iter().any(|r| r.id == id),
            _ => false,
        });
        if self.pages.get(id).is_none() && !queued {
            return Err(CollectionError::NotFound(id));
        }
        Ok(())
    }

    /// Run a whole export pass with the workspace's own backends.
    pub fn export(&mut self) -> Result<ComposeResult> {
        let job = self.begin_export()?;
        let result = job.run(&self.decoder, &self.encoder);
        self.finish_export(result).result.map_err(Error::from)
    }

    fn build_records(
        &self,
        source_id: SourceId,
        document: &D::Document,
    ) -> std::result::Result<Vec<PageRecord>, CollectionError> {
        let source = self.registry.get(source_id)?;
        let renderer = self
            .renderer
            .as_deref()
            .filter(|_| self.import_options.render_previews);

        (0..source.page_count)
            .map(|index| -> std::result::Result<PageRecord, CollectionError> {
                let record = PageRecord::new(source, index)?;
                Ok(match renderer {
                    Some(renderer) => self.render_preview(renderer, document, record),
                    None => record,
                })
            })
            .collect()
    }

    fn render_preview(
        &self,
        renderer: &dyn Renderer<PageOf<D>>,
        document: &D::Document,
        record: PageRecord,
    ) -> PageRecord {
        let index = record.source_page_index;
        let rendered = document
            .page(index)
            .map_err(|e| e.to_string())
            .and_then(|page| {
                renderer
                    .render(&page, self.import_options.preview_scale)
                    .map_err(|e| e.to_string())
            });

        match rendered {
            Ok(image) => record.with_preview(image),
            Err(e) => {
                log::warn!("Preview for page {} failed: {}", index, e);
                record
            }
        }
    }
}

fn apply_to(pages: &mut PageCollection, mutation: Mutation) -> std::result::Result<(), CollectionError> {
    match mutation {
        Mutation::Append(records) => pages.append(records),
        Mutation::Remove(id) => pages.remove(id).map(|_| ()),
        Mutation::Move { id, to_index } => pages.move_to(id, to_index).map(|_| ()),
        Mutation::SetRotation { id, degrees } => pages.set_rotation(id, degrees).map(|_| ()),
        Mutation::RotateClockwise(id) => pages.rotate_clockwise(id).map(|_| ()),
        Mutation::Clear => {
            pages.clear();
            Ok(())
        }
    }
}

/// Short log form of a mutation (an append can carry hundreds of records).
struct MutationKind<'a>(&'a Mutation);

impl std::fmt::Debug for MutationKind<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Mutation::Append(records) => write!(f, "Append({} pages)", records.len()),
            other => write!(f, "{:?}", other),
        }
    }
}
