use lopdf::content::Content;
use lopdf::{dictionary, Document, Object, Stream};
use std::path::Path;

use arxiv_trends::figures::first_jpeg_in_pdf;

/// Build a one-page PDF whose resources carry a single image XObject with
/// the given payload and filter.
fn write_pdf_with_image(path: &Path, image_bytes: &[u8], filter: &str) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => 32,
            "Height" => 32,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => filter,
        },
        image_bytes.to_vec(),
    ));

    let content = Content { operations: vec![] };
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        content.encode().expect("empty content encodes"),
    ));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! { "Im0" => image_id },
        },
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    });

    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    doc.save(path).expect("test PDF saves");
}

#[test]
fn finds_the_embedded_jpeg() {
    let dir = tempfile::tempdir().unwrap();
    let pdf_path = dir.path().join("with_figure.pdf");
    let payload = vec![0xABu8; 2048];

    write_pdf_with_image(&pdf_path, &payload, "DCTDecode");

    let found = first_jpeg_in_pdf(&pdf_path).unwrap();
    assert_eq!(found, Some(payload));
}

#[test]
fn tiny_images_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let pdf_path = dir.path().join("tiny.pdf");

    // Below the minimum size: a rule or logo, not a figure.
    write_pdf_with_image(&pdf_path, &[0xABu8; 256], "DCTDecode");

    assert_eq!(first_jpeg_in_pdf(&pdf_path).unwrap(), None);
}

#[test]
fn non_jpeg_images_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let pdf_path = dir.path().join("flate.pdf");

    write_pdf_with_image(&pdf_path, &[0xABu8; 2048], "FlateDecode");

    assert_eq!(first_jpeg_in_pdf(&pdf_path).unwrap(), None);
}

#[test]
fn missing_pdf_is_an_error_not_a_panic() {
    assert!(first_jpeg_in_pdf(Path::new("/nonexistent/paper.pdf")).is_err());
}
