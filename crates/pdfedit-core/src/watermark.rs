//! Diagonal text watermark
//!
//! Every page gets the same overlay: translucent gray Helvetica, turned 45
//! degrees about the page origin. The page's own content is wrapped in
//! `q ... Q` exactly as for patches.

use std::f64::consts::FRAC_PI_4;

use lopdf::content::Operation;
use lopdf::{dictionary, Document, Object, ObjectId, StringFormat};

use crate::color::Rgb;
use crate::encoding;
use crate::error::PdfEditError;
use crate::fonts::StandardFont;
use crate::geometry::{page_box, PageBox};
use crate::patch::{
    append_overlay, real, register_font, register_resource, rgb_operands, FontRegistry,
};
use crate::{load_document, save_document};

const WATERMARK_FONT: StandardFont = StandardFont::Helvetica;
const WATERMARK_SIZE: f64 = 50.0;
const WATERMARK_GRAY: f64 = 0.5;
const WATERMARK_ALPHA: f64 = 0.3;
/// Text origin in the rotated space.
const WATERMARK_ORIGIN: (f64, f64) = (200.0, 100.0);

const STATE_KEY: &str = "PEWatermark";

/// Stamp `text` across every page of the document.
pub fn watermark_pages(bytes: &[u8], text: &str) -> Result<Vec<u8>, PdfEditError> {
    if text.trim().is_empty() {
        return Err(PdfEditError::InvalidArgument(
            "Watermark text must not be empty".to_string(),
        ));
    }

    let mut doc = load_document(bytes)?;
    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
    if page_ids.is_empty() {
        return Err(PdfEditError::Operation("Document has no pages".to_string()));
    }

    let mut fonts = FontRegistry::default();
    let font_id = fonts.object_for(&mut doc, WATERMARK_FONT);
    let state_id = doc.add_object(dictionary! {
        "Type" => "ExtGState",
        "ca" => real(WATERMARK_ALPHA),
        "CA" => real(WATERMARK_ALPHA),
    });

    for page_id in page_ids {
        let bbox = page_box(&doc, page_id);
        register_font(&mut doc, page_id, WATERMARK_FONT, font_id)?;
        register_resource(
            &mut doc,
            page_id,
            "ExtGState",
            STATE_KEY.to_string(),
            state_id,
        )?;
        append_overlay(&mut doc, page_id, watermark_operations(&bbox, text))?;
    }

    save_document(doc)
}

fn watermark_operations(bbox: &PageBox, text: &str) -> Vec<Operation> {
    let (sin, cos) = FRAC_PI_4.sin_cos();
    let (tx, ty) = WATERMARK_ORIGIN;

    vec![
        Operation::new("q", vec![]),
        Operation::new("gs", vec![Object::Name(STATE_KEY.as_bytes().to_vec())]),
        Operation::new("rg", rgb_operands(Rgb::gray(WATERMARK_GRAY))),
        Operation::new(
            "cm",
            vec![real(cos), real(sin), real(-sin), real(cos), real(bbox.x0), real(bbox.y0)],
        ),
        Operation::new("BT", vec![]),
        Operation::new(
            "Tf",
            vec![
                Object::Name(WATERMARK_FONT.resource_key().into_bytes()),
                real(WATERMARK_SIZE),
            ],
        ),
        Operation::new("Td", vec![real(tx), real(ty)]),
        Operation::new(
            "Tj",
            vec![Object::String(encoding::encode(text), StringFormat::Literal)],
        ),
        Operation::new("ET", vec![]),
        Operation::new("Q", vec![]),
    ]
}
