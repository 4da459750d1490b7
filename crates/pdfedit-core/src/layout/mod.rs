//! Text layout extraction
//!
//! Reports every shown string of every page with its bounding box in
//! top-left page coordinates, the font it was drawn with, the effective
//! size and the fill colour. One span is produced per text-showing
//! operator, in content stream order.

mod cmap;
mod font;
mod interpreter;

use lopdf::{Document, ObjectId};
use serde::{Deserialize, Serialize};

use crate::error::PdfEditError;
use crate::geometry::{page_box, PageBox};
use crate::resources::{page_content, page_resources};
use interpreter::{Interpreter, RawSpan};

/// A run of text sharing one font, size and colour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSpan {
    pub text: String,
    /// Left edge, points from the left of the page.
    pub x: f64,
    /// Top edge, points from the top of the page.
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub font: String,
    pub size: f64,
    /// Fill colour packed as `0xRRGGBB`.
    pub color: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    /// 0-based page index.
    pub page_num: usize,
    pub width: f64,
    pub height: f64,
    pub text_blocks: Vec<TextSpan>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentLayout {
    pub total_pages: usize,
    pub pages: Vec<PageLayout>,
}

/// Parse `bytes` and extract the layout of every page.
pub fn extract_layout(bytes: &[u8]) -> Result<DocumentLayout, PdfEditError> {
    let doc = Document::load_mem(bytes).map_err(PdfEditError::parse)?;
    Ok(document_layout(&doc))
}

/// Layout of an already parsed document.
pub fn document_layout(doc: &Document) -> DocumentLayout {
    let pages: Vec<PageLayout> = doc
        .get_pages()
        .values()
        .enumerate()
        .map(|(index, &page_id)| page_layout(doc, index, page_id))
        .collect();

    DocumentLayout {
        total_pages: pages.len(),
        pages,
    }
}

fn page_layout(doc: &Document, page_num: usize, page_id: ObjectId) -> PageLayout {
    let bbox = page_box(doc, page_id);
    let content = page_content(doc, page_id);
    let raw = Interpreter::new(doc).run_page(&content, page_resources(doc, page_id));

    PageLayout {
        page_num,
        width: bbox.width(),
        height: bbox.height(),
        text_blocks: raw
            .into_iter()
            .filter_map(|span| clip_to_page(span, &bbox))
            .collect(),
    }
}

/// Convert to top-left coordinates and clip to the page; `None` when the
/// span has no text or lies entirely off the page.
fn clip_to_page(span: RawSpan, bbox: &PageBox) -> Option<TextSpan> {
    if span.text.is_empty() {
        return None;
    }
    let (left, top) = bbox.to_top_left(span.x0, span.y1);
    let (right, bottom) = bbox.to_top_left(span.x1, span.y0);

    let x0 = left.max(0.0);
    let y0 = top.max(0.0);
    let x1 = right.min(bbox.width());
    let y1 = bottom.min(bbox.height());
    if !(x0 <= x1 && y0 <= y1) {
        return None;
    }

    Some(TextSpan {
        text: span.text,
        x: x0,
        y: y0,
        width: x1 - x0,
        height: y1 - y0,
        font: span.font,
        size: span.size,
        color: span.color,
    })
}
