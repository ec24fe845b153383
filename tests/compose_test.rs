//! End-to-end composition through the lopdf backend.

mod common;

use lopdf::Object;

use common::{build_pdf, output_pages, page_text, DotRenderer};
use pdfworker::{
    ComposeOptions, CompositionError, Error, ImportError, ImportOptions, OutputMetadata, Rotation,
    Workspace,
};

#[test]
fn test_multi_source_fan_in() {
    let mut workspace = Workspace::new();
    let a = workspace
        .import_bytes(Some("a.pdf"), build_pdf("A", 3, &[]))
        .unwrap();
    let b = workspace
        .import_bytes(Some("b.pdf"), build_pdf("B", 3, &[]))
        .unwrap();
    assert_eq!(workspace.pages().len(), 6);

    // Keep A2, B1, A0 in that order.
    for id in [a.page_ids[1], b.page_ids[0], b.page_ids[2]] {
        workspace.remove(id).unwrap();
    }
    workspace.move_page(a.page_ids[2], 0).unwrap();
    workspace.move_page(b.page_ids[1], 1).unwrap();

    let result = workspace.export().unwrap();
    assert_eq!(result.page_count, 3);
    assert_eq!(result.sources_decoded, 2);

    let contents: Vec<Vec<u8>> = output_pages(&result.bytes)
        .into_iter()
        .map(|p| p.content)
        .collect();
    assert_eq!(
        contents,
        vec![page_text("A", 2), page_text("B", 1), page_text("A", 0)]
    );
}

#[test]
fn test_rotation_composes_with_intrinsic() {
    for r0 in Rotation::ALL {
        let mut workspace = Workspace::new();
        let report = workspace
            .import_bytes(None, build_pdf("R", 1, &[i64::from(r0.degrees())]))
            .unwrap();
        let id = report.page_ids[0];

        for r1 in Rotation::ALL {
            workspace.set_rotation(id, r1.degrees()).unwrap();
            let result = workspace.export().unwrap();
            let pages = output_pages(&result.bytes);
            assert_eq!(
                pages[0].rotate,
                i64::from((r0.degrees() + r1.degrees()) % 360),
                "intrinsic {} + record {}",
                r0,
                r1
            );
        }
    }
}

#[test]
fn test_duplicate_page_exported_twice() {
    let mut workspace = Workspace::new();
    let first = workspace
        .import_bytes(Some("doc.pdf"), build_pdf("D", 2, &[]))
        .unwrap();
    let again = workspace
        .import_bytes(Some("doc.pdf"), build_pdf("D", 2, &[]))
        .unwrap();
    assert_ne!(first.source_id, again.source_id);
    assert_eq!(workspace.registry().len(), 2);

    workspace.remove(first.page_ids[1]).unwrap();
    workspace.remove(again.page_ids[1]).unwrap();

    let pages = output_pages(&workspace.export().unwrap().bytes);
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].content, page_text("D", 0));
    assert_eq!(pages[1].content, page_text("D", 0));
}

#[test]
fn test_export_is_repeatable() {
    let mut workspace = Workspace::new().with_compose_options(
        ComposeOptions::new().with_metadata(OutputMetadata::new().with_timestamps(false)),
    );
    workspace
        .import_bytes(None, build_pdf("S", 4, &[]))
        .unwrap();

    let first = workspace.export().unwrap();
    let second = workspace.export().unwrap();
    assert_eq!(first.bytes, second.bytes);
}

#[test]
fn test_sequential_and_parallel_agree() {
    let sources: Vec<Vec<u8>> = ["P", "Q", "R", "S"]
        .iter()
        .map(|label| build_pdf(label, 2, &[90]))
        .collect();

    let run = |options: ComposeOptions| {
        let mut workspace = Workspace::new().with_compose_options(options);
        let reports: Vec<_> = sources
            .iter()
            .map(|bytes| workspace.import_bytes(None, bytes.clone()).unwrap())
            .collect();
        // Interleave: second page of each source first, newest source first.
        for (i, report) in reports.iter().rev().enumerate() {
            workspace.move_page(report.page_ids[1], i).unwrap();
        }
        output_pages(&workspace.export().unwrap().bytes)
    };

    let sequential = run(ComposeOptions::new().sequential());
    let parallel = run(ComposeOptions::new().with_parallel(true));
    assert_eq!(sequential, parallel);
    assert_eq!(sequential[0].content, page_text("S", 1));
    assert_eq!(sequential[0].rotate, 0);
    assert_eq!(sequential[4].content, page_text("P", 0));
    assert_eq!(sequential[4].rotate, 90);
}

#[test]
fn test_compressed_output_still_loads() {
    let mut workspace =
        Workspace::new().with_compose_options(ComposeOptions::new().with_compression(true));
    workspace
        .import_bytes(None, build_pdf("Z", 2, &[]))
        .unwrap();

    let bytes = workspace.export().unwrap().bytes;
    let doc = lopdf::Document::load_mem(&bytes).unwrap();
    assert_eq!(doc.get_pages().len(), 2);
}

#[test]
fn test_output_metadata_written() {
    let mut workspace = Workspace::new().with_compose_options(ComposeOptions::new().with_metadata(
        OutputMetadata::new().with_title("Quarterly").with_author("Ops"),
    ));
    workspace
        .import_bytes(None, build_pdf("M", 1, &[]))
        .unwrap();

    let bytes = workspace.export().unwrap().bytes;
    let doc = lopdf::Document::load_mem(&bytes).unwrap();
    let info_id = doc.trailer.get(b"Info").unwrap().as_reference().unwrap();
    let info = doc.get_dictionary(info_id).unwrap();
    assert!(matches!(info.get(b"Title").unwrap(), Object::String(s, _) if s == b"Quarterly"));
    assert!(matches!(info.get(b"Author").unwrap(), Object::String(s, _) if s == b"Ops"));
    assert!(info.has(b"Producer"));
    assert!(info.has(b"CreationDate"));
}

#[test]
fn test_previews_rendered_at_import() {
    let mut workspace = Workspace::new().with_renderer(DotRenderer);
    let report = workspace
        .import_bytes(None, build_pdf("V", 2, &[0, 270]))
        .unwrap();

    let second = workspace.pages().get(report.page_ids[1]).unwrap();
    let preview = second.preview.as_ref().unwrap();
    assert_eq!((preview.width, preview.height), (1, 1));
    assert_eq!(preview.pixels[0], 3);

    let mut quiet = Workspace::new()
        .with_renderer(DotRenderer)
        .with_import_options(ImportOptions::new().with_previews(false));
    let report = quiet.import_bytes(None, build_pdf("V", 1, &[])).unwrap();
    assert!(!quiet.pages().get(report.page_ids[0]).unwrap().has_preview());
}

#[test]
fn test_corrupt_pdf_rejected_at_import() {
    let mut workspace = Workspace::new();
    let mut bytes = build_pdf("C", 2, &[]);
    bytes.truncate(40);

    let err = workspace.import_bytes(Some("broken.pdf"), bytes).unwrap_err();
    assert!(matches!(err, Error::Import(ImportError::Corrupt(_))));
    assert!(workspace.registry().is_empty());
    assert!(workspace.pages().is_empty());
}

#[test]
fn test_prune_after_clear() {
    let mut workspace = Workspace::new();
    let kept = workspace
        .import_bytes(None, build_pdf("K", 1, &[]))
        .unwrap();
    let dropped = workspace
        .import_bytes(None, build_pdf("G", 1, &[]))
        .unwrap();

    // Sources outlive their pages until pruned.
    workspace.remove(dropped.page_ids[0]).unwrap();
    assert_eq!(workspace.registry().len(), 2);
    assert_eq!(workspace.prune_sources(), 1);
    assert!(workspace.registry().contains(kept.source_id));
    assert!(!workspace.registry().contains(dropped.source_id));

    workspace.clear().unwrap();
    assert_eq!(workspace.prune_sources(), 1);
    let err = workspace.export().unwrap_err();
    assert!(matches!(
        err,
        Error::Composition(CompositionError::EmptyCollection)
    ));
}

#[test]
fn test_merge_convenience() {
    let a = build_pdf("A", 2, &[]);
    let b = build_pdf("B", 1, &[180]);

    let pages = output_pages(&pdfworker::merge(&[&a, &b]).unwrap());
    let contents: Vec<_> = pages.iter().map(|p| p.content.clone()).collect();
    assert_eq!(
        contents,
        vec![page_text("A", 0), page_text("A", 1), page_text("B", 0)]
    );
    assert_eq!(pages[2].rotate, 180);
}
