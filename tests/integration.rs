//! Integration tests for the PDF seal library

use lopdf::{dictionary, Document, Object, Stream, StringFormat};
use pdf_seal::config::StampConfig;
use pdf_seal::pdf::{count_pages, extract_metadata, Outcome, Stamper};
use pdf_seal::replace::temp_path_for;
use pdf_seal::walk::{discover_documents, process_tree, process_tree_with};
use pdf_seal::{Error, FailureKind};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Write a PDF with one page per entry in `sizes`
fn write_pdf(path: &Path, sizes: &[(f32, f32)], version: &str) {
    let mut doc = Document::with_version(version);
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids = Vec::new();
    for (i, &(width, height)) in sizes.iter().enumerate() {
        let text = format!("BT /F1 24 Tf 72 72 Td (Page {}) Tj ET", i + 1);
        let content_id = doc.add_object(Stream::new(lopdf::Dictionary::new(), text.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(width),
                Object::Real(height),
            ],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as i64,
            "Kids" => kids,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create fixture directory");
    }
    doc.save(path).expect("Failed to write fixture PDF");
}

/// Write a structurally valid PDF whose page tree has no pages
fn write_zero_page_pdf(path: &Path) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.add_object(dictionary! {
        "Type" => "Pages",
        "Kids" => Vec::<Object>::new(),
        "Count" => 0,
    });
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).expect("Failed to write fixture PDF");
}

/// Write a one-page PDF carrying a standard security handler we cannot open
fn write_encrypted_pdf(path: &Path) {
    write_pdf(path, &[(612.0, 792.0)], "1.5");
    let mut doc = Document::load(path).expect("Failed to reload fixture PDF");
    let encrypt_id = doc.add_object(dictionary! {
        "Filter" => "Standard",
        "V" => 1,
        "R" => 2,
        "Length" => 40,
        "P" => -4,
        "O" => Object::String(vec![0x4f; 32], StringFormat::Hexadecimal),
        "U" => Object::String(vec![0x55; 32], StringFormat::Hexadecimal),
    });
    doc.trailer.set("Encrypt", encrypt_id);
    doc.save(path).expect("Failed to write encrypted fixture");
}

/// Stamp `pdf` expecting a failure of `expected`, with the file left as it was
fn assert_rejected_untouched(stamper: &Stamper, pdf: &Path, expected: FailureKind) {
    let before = fs::read(pdf).expect("read before");

    match stamper.stamp_document(pdf) {
        Outcome::Failed { kind, .. } => assert_eq!(kind, expected),
        other => panic!("expected {} failure, got {:?}", expected, other),
    }

    assert_eq!(fs::read(pdf).expect("read after"), before);
    assert!(!temp_path_for(pdf).exists());
}

/// Write a small half-transparent PNG seal
fn write_seal(path: &Path) {
    let image = image::RgbaImage::from_fn(16, 16, |x, y| {
        if (x + y) % 2 == 0 {
            image::Rgba([200, 30, 30, 255])
        } else {
            image::Rgba([200, 30, 30, 0])
        }
    });
    image.save(path).expect("Failed to write seal image");
}

fn stamper_in(dir: &Path) -> Stamper {
    let seal = dir.join("signature_ent.png");
    write_seal(&seal);
    Stamper::new(StampConfig::new(seal)).expect("Failed to build stamper")
}

/// BBox of every seal Form XObject drawn on each page, in page order
fn seal_boxes(path: &Path) -> Vec<Vec<[f32; 4]>> {
    let doc = Document::load(path).expect("Failed to load stamped PDF");
    doc.get_pages()
        .values()
        .map(|&page_id| {
            let page = doc.get_dictionary(page_id).expect("page");
            let xobjects = match page
                .get(b"Resources")
                .and_then(Object::as_dict)
                .and_then(|res| res.get(b"XObject"))
                .and_then(Object::as_dict)
            {
                Ok(xobjects) => xobjects,
                Err(_) => return Vec::new(),
            };

            xobjects
                .iter()
                .filter(|(name, _)| name.starts_with(b"PdfSeal"))
                .map(|(_, value)| {
                    let id = value.as_reference().expect("seal reference");
                    let form = match doc.get_object(id).expect("seal form") {
                        Object::Stream(stream) => stream,
                        other => panic!("seal is not a stream: {:?}", other),
                    };
                    let bbox = form.dict.get(b"BBox").and_then(Object::as_array).expect("BBox");
                    let mut rect = [0.0f32; 4];
                    for (slot, v) in rect.iter_mut().zip(bbox) {
                        *slot = v.as_float().expect("number");
                    }
                    rect
                })
                .collect()
        })
        .collect()
}

#[test]
fn test_stamp_preserves_page_count_even_twice() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let stamper = stamper_in(temp_dir.path());
    let pdf = temp_dir.path().join("docs").join("handout.pdf");
    write_pdf(&pdf, &[(612.0, 792.0); 3], "1.5");

    for round in 1..=2 {
        let outcome = stamper.stamp_document(&pdf);
        assert_eq!(outcome, Outcome::Stamped { pages: 3 }, "round {}", round);
        assert_eq!(count_pages(&pdf).expect("Failed to count pages"), 3);
    }

    // Both stamping rounds remain on every page
    for seals in seal_boxes(&pdf) {
        assert_eq!(seals.len(), 2);
    }
    assert!(!temp_path_for(&pdf).exists());
}

#[test]
fn test_overlay_matches_each_page_size() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let stamper = stamper_in(temp_dir.path());
    let pdf = temp_dir.path().join("mixed.pdf");
    write_pdf(&pdf, &[(612.0, 792.0), (1000.0, 500.0), (612.0, 792.0)], "1.5");

    assert!(stamper.stamp_document(&pdf).is_success());

    let boxes = seal_boxes(&pdf);
    assert_eq!(boxes.len(), 3);
    assert_eq!(boxes[0], vec![[0.0, 0.0, 612.0, 792.0]]);
    assert_eq!(boxes[1], vec![[0.0, 0.0, 1000.0, 500.0]]);
    assert_eq!(boxes[2], vec![[0.0, 0.0, 612.0, 792.0]]);

    let metadata = extract_metadata(&pdf).expect("Failed to read metadata");
    assert_eq!(metadata.page_count, 3);
    assert_eq!(metadata.pages[1].width, 1000.0);
    assert_eq!(metadata.pages[1].height, 500.0);
}

#[test]
fn test_corrupt_document_is_isolated() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let stamper = stamper_in(temp_dir.path());
    let root = temp_dir.path().join("pdfs");

    write_pdf(&root.join("1.pdf"), &[(612.0, 792.0)], "1.5");
    fs::write(root.join("2.pdf"), b"%PDF-1.4\nthis is not really a pdf").expect("write corrupt");
    write_pdf(&root.join("3.pdf"), &[(595.0, 842.0), (595.0, 842.0)], "1.5");
    let corrupt_before = fs::read(root.join("2.pdf")).expect("read corrupt");

    let mut failures = Vec::new();
    let summary = process_tree_with(&root, &stamper, |path, outcome| {
        if let Outcome::Failed { kind, .. } = outcome {
            failures.push((path.to_path_buf(), *kind));
        }
    })
    .expect("Batch run failed");

    assert_eq!(summary.total, 3);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(failures, vec![(root.join("2.pdf"), FailureKind::UnreadableDocument)]);

    assert_eq!(seal_boxes(&root.join("1.pdf")), vec![vec![[0.0, 0.0, 612.0, 792.0]]]);
    assert_eq!(seal_boxes(&root.join("3.pdf")).len(), 2);
    assert_eq!(fs::read(root.join("2.pdf")).expect("read corrupt"), corrupt_before);
    assert!(!temp_path_for(&root.join("2.pdf")).exists());
}

#[test]
fn test_files_processed_in_natural_order() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let stamper = stamper_in(temp_dir.path());
    let root = temp_dir.path().join("pdfs");

    for name in ["a10.pdf", "a2.pdf", "a1.pdf"] {
        write_pdf(&root.join(name), &[(612.0, 792.0)], "1.5");
    }

    let mut order = Vec::new();
    process_tree_with(&root, &stamper, |path, _| {
        order.push(path.file_name().expect("name").to_string_lossy().into_owned());
    })
    .expect("Batch run failed");

    assert_eq!(order, vec!["a1.pdf", "a2.pdf", "a10.pdf"]);
}

#[test]
fn test_discovery_is_recursive_and_filtered() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let root = temp_dir.path().join("pdfs");

    write_pdf(&root.join("Invoice 10.pdf"), &[(612.0, 792.0)], "1.5");
    write_pdf(&root.join("Invoice 2.pdf"), &[(612.0, 792.0)], "1.5");
    write_pdf(&root.join("nested").join("deeper").join("SCAN.PDF"), &[(612.0, 792.0)], "1.5");
    write_pdf(&root.join("___temp_signature.pdf"), &[(612.0, 792.0)], "1.5");
    fs::write(root.join("Invoice 2.pdf.tmp"), b"leftover").expect("write leftover");
    fs::write(root.join("notes.txt"), b"not a pdf").expect("write notes");

    let found: Vec<PathBuf> = discover_documents(&root).expect("Discovery failed");

    assert_eq!(
        found,
        vec![
            root.join("Invoice 2.pdf"),
            root.join("Invoice 10.pdf"),
            root.join("nested").join("deeper").join("SCAN.PDF"),
        ]
    );
}

#[test]
fn test_empty_tree_reports_nothing_found() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let stamper = stamper_in(temp_dir.path());
    let root = temp_dir.path().join("pdfs");
    fs::create_dir_all(root.join("empty-subdir")).expect("create dirs");
    fs::write(root.join("readme.txt"), b"nothing to sign").expect("write readme");

    let listing = |dir: &Path| -> Vec<PathBuf> {
        let mut entries: Vec<PathBuf> = fs::read_dir(dir)
            .expect("read dir")
            .map(|e| e.expect("entry").path())
            .collect();
        entries.sort();
        entries
    };
    let before = listing(&root);

    let summary = process_tree(&root, &stamper).expect("Batch run failed");

    assert!(summary.is_empty());
    assert_eq!(summary.succeeded, 0);
    assert_eq!(summary.failed, 0);
    assert_eq!(listing(&root), before);
    assert_eq!(fs::read(root.join("readme.txt")).expect("read readme"), b"nothing to sign");
}

#[test]
fn test_missing_root_is_fatal() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let stamper = stamper_in(temp_dir.path());

    let result = process_tree(&temp_dir.path().join("does-not-exist"), &stamper);
    assert!(matches!(result, Err(Error::FileNotFound(_))));
}

#[test]
fn test_missing_seal_touches_nothing() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let pdf = temp_dir.path().join("pdfs").join("1.pdf");
    write_pdf(&pdf, &[(612.0, 792.0)], "1.5");
    let before = fs::read(&pdf).expect("read");

    let result = Stamper::new(StampConfig::new(temp_dir.path().join("signature_man.png")));

    assert!(matches!(result, Err(Error::AssetNotFound { .. })));
    assert_eq!(fs::read(&pdf).expect("read"), before);
}

#[test]
fn test_old_pdf_version_stamped_without_alpha() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let stamper = stamper_in(temp_dir.path());
    let pdf = temp_dir.path().join("legacy.pdf");
    write_pdf(&pdf, &[(612.0, 792.0)], "1.3");

    assert!(stamper.stamp_document(&pdf).is_success());

    let doc = Document::load(&pdf).expect("load");
    let has_gstate = doc.objects.values().any(|object| {
        object
            .as_dict()
            .ok()
            .and_then(|dict| dict.get(b"Type").ok())
            .map(|ty| matches!(ty, Object::Name(name) if name == b"ExtGState"))
            .unwrap_or(false)
    });
    assert!(!has_gstate, "legacy documents should be stamped fully opaque");
    assert_eq!(seal_boxes(&pdf), vec![vec![[0.0, 0.0, 612.0, 792.0]]]);
}

#[test]
fn test_degenerate_page_size_left_untouched() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let stamper = stamper_in(temp_dir.path());
    let pdf = temp_dir.path().join("flat.pdf");
    write_pdf(&pdf, &[(612.0, 792.0), (0.0, 792.0)], "1.5");

    assert_rejected_untouched(&stamper, &pdf, FailureKind::UnsupportedGeometry);
}

#[test]
fn test_encrypted_document_left_untouched() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let stamper = stamper_in(temp_dir.path());
    let pdf = temp_dir.path().join("locked.pdf");
    write_encrypted_pdf(&pdf);

    assert_rejected_untouched(&stamper, &pdf, FailureKind::UnreadableDocument);
}

#[test]
fn test_zero_page_document_left_untouched() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let stamper = stamper_in(temp_dir.path());
    let pdf = temp_dir.path().join("empty.pdf");
    write_zero_page_pdf(&pdf);

    assert_rejected_untouched(&stamper, &pdf, FailureKind::UnreadableDocument);
}
