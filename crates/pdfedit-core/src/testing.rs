//! Fixture documents for unit tests

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

/// One Letter-sized page per entry, each showing its text in 12pt
/// Helvetica with the baseline at (72, 720).
pub(crate) fn pdf_with_pages(texts: &[&str]) -> Vec<u8> {
    let contents = texts
        .iter()
        .map(|text| {
            Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            }
            .encode()
            .unwrap()
        })
        .collect();
    build(contents)
}

/// A single Letter-sized page with raw content; `/F1` is Helvetica.
pub(crate) fn pdf_with_content(content: &[u8]) -> Vec<u8> {
    build(vec![content.to_vec()])
}

fn build(contents: Vec<Vec<u8>>) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });

    let mut kids = Vec::new();
    for content in contents {
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
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

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// Text of every span, per page.
pub(crate) fn page_texts(bytes: &[u8]) -> Vec<Vec<String>> {
    crate::extract_layout(bytes)
        .unwrap()
        .pages
        .into_iter()
        .map(|page| page.text_blocks.into_iter().map(|span| span.text).collect())
        .collect()
}
