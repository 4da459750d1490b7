//! PDF layout extraction and coordinate patching
//!
//! This crate works on PDF documents held in memory using lopdf:
//! - `extract_layout`: every text span with its box, font, size and colour
//! - `apply_patches`: cover rectangles in white and draw replacement text
//! - page operations (split, remove, reorder, rotate, crop, merge),
//!   metadata editing and plain-text export
//! - `compress_document` and `watermark_pages` for whole-document output

pub mod color;
pub mod encoding;
pub mod error;
pub mod fonts;
pub mod geometry;
pub mod layout;
pub mod metadata;
pub mod pages;
pub mod patch;
pub mod text;
pub mod watermark;

mod resources;
#[cfg(test)]
mod testing;

use lopdf::Document;

pub use color::Rgb;
pub use error::PdfEditError;
pub use fonts::StandardFont;
pub use geometry::PageBox;
pub use layout::{document_layout, extract_layout, DocumentLayout, PageLayout, TextSpan};
pub use metadata::{edit_metadata, read_metadata, Metadata, MetadataUpdate};
pub use pages::{
    crop_pages, merge_documents, parse_page_ranges, remove_pages, reorder_pages, rotate_pages,
    split_document, Margins,
};
pub use patch::{apply_patches, decode_color, Patch, PatchReport};
pub use text::extract_text;
pub use watermark::watermark_pages;

/// Parse PDF bytes and return the page count
pub fn page_count(bytes: &[u8]) -> Result<usize, PdfEditError> {
    Ok(load_document(bytes)?.get_pages().len())
}

/// Rewrite the document with unreferenced objects dropped and every stream
/// Flate-compressed.
pub fn compress_document(bytes: &[u8]) -> Result<Vec<u8>, PdfEditError> {
    save_document(load_document(bytes)?)
}

pub(crate) fn load_document(bytes: &[u8]) -> Result<Document, PdfEditError> {
    Document::load_mem(bytes).map_err(PdfEditError::parse)
}

/// Prune, compress and serialize.
pub(crate) fn save_document(mut doc: Document) -> Result<Vec<u8>, PdfEditError> {
    doc.prune_objects();
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| PdfEditError::Operation(format!("Save failed: {}", e)))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::pdf_with_pages;
    use proptest::prelude::*;

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(&pdf_with_pages(&["a", "b", "c"])).unwrap(), 3);
    }

    #[test]
    fn test_page_count_rejects_garbage() {
        assert!(matches!(
            page_count(b"not a pdf"),
            Err(PdfEditError::DocumentParse(_))
        ));
    }

    #[test]
    fn test_compress_shrinks_repetitive_content() {
        let line = "BT /F1 12 Tf 72 720 Td (compressible text) Tj ET\n";
        let pdf = testing::pdf_with_content(line.repeat(200).as_bytes());
        let out = compress_document(&pdf).unwrap();

        assert!(out.len() < pdf.len());
        assert_eq!(page_count(&out).unwrap(), 1);
        assert_eq!(testing::page_texts(&out)[0].len(), 200);
    }

    #[test]
    fn test_compress_drops_unreferenced_objects() {
        let mut doc = Document::load_mem(&pdf_with_pages(&["keep"])).unwrap();
        doc.add_object(lopdf::Object::string_literal("orphan"));
        let mut pdf = Vec::new();
        doc.save_to(&mut pdf).unwrap();

        let out = compress_document(&pdf).unwrap();
        let compressed = Document::load_mem(&out).unwrap();
        assert_eq!(compressed.objects.len(), doc.objects.len() - 1);
        assert_eq!(testing::page_texts(&out), vec![vec!["keep".to_string()]]);
    }

    #[test]
    fn test_compress_rejects_garbage() {
        assert!(matches!(
            compress_document(b"%PDF-nope"),
            Err(PdfEditError::DocumentParse(_))
        ));
    }

    #[test]
    fn test_layout_reports_every_page() {
        let layout = extract_layout(&pdf_with_pages(&["one", "two"])).unwrap();
        assert_eq!(layout.total_pages, 2);
        let nums: Vec<usize> = layout.pages.iter().map(|p| p.page_num).collect();
        assert_eq!(nums, vec![0, 1]);
        assert_eq!(layout.pages[1].width, 612.0);
        assert_eq!(layout.pages[1].height, 792.0);
    }

    #[test]
    fn test_layout_serializes_with_wire_field_names() {
        let layout = extract_layout(&pdf_with_pages(&["x"])).unwrap();
        let json = serde_json::to_value(&layout).unwrap();
        let span = &json["pages"][0]["text_blocks"][0];
        for key in ["text", "x", "y", "width", "height", "font", "size", "color"] {
            assert!(span.get(key).is_some(), "missing {key}");
        }
        assert_eq!(json["pages"][0]["page_num"], 0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_spans_lie_within_page(
            x in -200i64..800,
            y in -200i64..1000,
            size in 1i64..60,
            text in "[a-zA-Z ]{1,20}",
        ) {
            let content = format!("BT /F1 {size} Tf {x} {y} Td ({text}) Tj ET");
            let pdf = testing::pdf_with_content(content.as_bytes());
            let layout = extract_layout(&pdf).unwrap();
            let page = &layout.pages[0];
            for span in &page.text_blocks {
                prop_assert!(span.x >= 0.0 && span.y >= 0.0);
                prop_assert!(span.x + span.width <= page.width + 1e-9);
                prop_assert!(span.y + span.height <= page.height + 1e-9);
            }
        }

        #[test]
        fn prop_empty_patch_list_is_identity(texts in proptest::collection::vec("[a-z]{1,8}", 1..4)) {
            let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
            let pdf = pdf_with_pages(&refs);
            let report = apply_patches(&pdf, &[]).unwrap();
            prop_assert_eq!(report.bytes, pdf);
        }
    }
}
