//! Page-level document operations
//!
//! Every operation that changes the set or order of pages rebuilds the page
//! tree as a single flat `/Pages` node. Attributes the pages used to inherit
//! are copied onto them first, then unreachable objects are pruned.

use std::collections::HashSet;

use lopdf::{Document, Object, ObjectId};

use crate::error::PdfEditError;
use crate::geometry::PageBox;
use crate::resources::{inherited_attribute, materialize_inherited, number};
use crate::{load_document, save_document};

/// Margins, in points, removed from each side of a page by [`crop_pages`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Margins {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

/// Upper bound on the number of entries a page selection may expand to.
const MAX_SELECTION: usize = 100_000;

/// Parse `"1-3, 5"` into `[1, 2, 3, 5]`.
///
/// Numbers are 1-based. Order and duplicates are kept so the result can
/// drive both extraction and reordering. Ranges stop at `page_count`, so
/// `"2-999"` on a 3-page document yields `[2, 3]`; single numbers past the
/// end are passed through for the caller to drop.
pub fn parse_page_ranges(input: &str, page_count: usize) -> Result<Vec<u32>, PdfEditError> {
    let last_page = u32::try_from(page_count).unwrap_or(u32::MAX);
    let mut pages = Vec::new();

    for part in input.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        if let Some((start, end)) = part.split_once('-') {
            let start: u32 = start
                .trim()
                .parse()
                .map_err(|_| PdfEditError::InvalidRange(format!("Invalid start: {}", start)))?;
            let end: u32 = end
                .trim()
                .parse()
                .map_err(|_| PdfEditError::InvalidRange(format!("Invalid end: {}", end)))?;

            if start > end {
                return Err(PdfEditError::InvalidRange(format!(
                    "Start {} > end {}",
                    start, end
                )));
            }
            let end = end.min(last_page);
            if start <= end {
                pages.extend(start..=end);
            }
        } else {
            let page: u32 = part
                .parse()
                .map_err(|_| PdfEditError::InvalidRange(format!("Invalid page: {}", part)))?;
            pages.push(page);
        }

        if pages.len() > MAX_SELECTION {
            return Err(PdfEditError::InvalidRange(format!(
                "Selection names more than {} pages",
                MAX_SELECTION
            )));
        }
    }

    Ok(pages)
}

/// Keep the pages listed in `ranges`, in listed order.
///
/// An empty `ranges` keeps every page; numbers past the end are ignored.
pub fn split_document(bytes: &[u8], ranges: &str) -> Result<Vec<u8>, PdfEditError> {
    let doc = load_document(bytes)?;
    let page_count = doc.get_pages().len();
    let requested = parse_page_ranges(ranges, page_count)?;

    let selection: Vec<usize> = if requested.is_empty() {
        (0..page_count).collect()
    } else {
        requested
            .into_iter()
            .filter_map(|page| zero_based(page, page_count))
            .collect()
    };

    if selection.is_empty() {
        return Err(PdfEditError::InvalidRange(
            "No requested page exists in the document".into(),
        ));
    }
    select_pages(doc, &selection)
}

/// Drop the pages listed in `ranges`.
pub fn remove_pages(bytes: &[u8], ranges: &str) -> Result<Vec<u8>, PdfEditError> {
    if ranges.split(',').all(|part| part.trim().is_empty()) {
        return Err(PdfEditError::InvalidRange("No pages specified".into()));
    }

    let doc = load_document(bytes)?;
    let page_count = doc.get_pages().len();
    let requested = parse_page_ranges(ranges, page_count)?;
    let removed: HashSet<usize> = requested
        .into_iter()
        .filter_map(|page| zero_based(page, page_count))
        .collect();

    let selection: Vec<usize> = (0..page_count).filter(|i| !removed.contains(i)).collect();
    if selection.is_empty() {
        return Err(PdfEditError::InvalidRange(
            "Cannot remove every page of the document".into(),
        ));
    }
    select_pages(doc, &selection)
}

/// Rearrange pages by a comma separated list of 1-based page numbers.
///
/// Tokens that are not plain numbers are ignored, as are numbers past the
/// end of the document. Pages may be repeated or left out.
pub fn reorder_pages(bytes: &[u8], order: &str) -> Result<Vec<u8>, PdfEditError> {
    if order.trim().is_empty() {
        return Err(PdfEditError::InvalidArgument("No order provided".into()));
    }

    let doc = load_document(bytes)?;
    let page_count = doc.get_pages().len();
    let selection: Vec<usize> = order
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()))
        .filter_map(|token| token.parse::<u32>().ok())
        .filter_map(|page| zero_based(page, page_count))
        .collect();

    if selection.is_empty() {
        return Err(PdfEditError::InvalidRange(
            "Order does not name any page of the document".into(),
        ));
    }
    select_pages(doc, &selection)
}

/// Turn every page by `degrees` clockwise; must be a multiple of 90.
pub fn rotate_pages(bytes: &[u8], degrees: i64) -> Result<Vec<u8>, PdfEditError> {
    if degrees % 90 != 0 {
        return Err(PdfEditError::InvalidArgument(format!(
            "Rotation must be a multiple of 90, got {}",
            degrees
        )));
    }

    let mut doc = load_document(bytes)?;
    for page_id in doc.get_pages().into_values() {
        let current = inherited_attribute(&doc, page_id, b"Rotate")
            .and_then(number)
            .unwrap_or(0.0) as i64;
        let rotation = (current + degrees).rem_euclid(360);
        doc.get_dictionary_mut(page_id)
            .map_err(PdfEditError::operation)?
            .set("Rotate", Object::Integer(rotation));
    }
    save_document(doc)
}

/// Shrink each page's MediaBox, and CropBox when present, by `margins`.
pub fn crop_pages(bytes: &[u8], margins: Margins) -> Result<Vec<u8>, PdfEditError> {
    let Margins {
        top,
        bottom,
        left,
        right,
    } = margins;
    if [top, bottom, left, right]
        .iter()
        .any(|m| !m.is_finite() || *m < 0.0)
    {
        return Err(PdfEditError::InvalidArgument(
            "Crop margins must be non-negative numbers".into(),
        ));
    }

    let mut doc = load_document(bytes)?;
    for (page_num, page_id) in doc.get_pages() {
        let mut updates = Vec::new();
        for key in [b"MediaBox".as_slice(), b"CropBox".as_slice()] {
            let Some(bbox) = inherited_attribute(&doc, page_id, key).and_then(PageBox::from_object)
            else {
                continue;
            };
            let cropped = PageBox {
                x0: bbox.x0 + left,
                y0: bbox.y0 + bottom,
                x1: bbox.x1 - right,
                y1: bbox.y1 - top,
            };
            if cropped.width() <= 0.0 || cropped.height() <= 0.0 {
                return Err(PdfEditError::InvalidArgument(format!(
                    "Margins leave nothing of page {}",
                    page_num
                )));
            }
            updates.push((key, cropped.to_object()));
        }

        let page = doc
            .get_dictionary_mut(page_id)
            .map_err(PdfEditError::operation)?;
        for (key, value) in updates {
            page.set(key.to_vec(), value);
        }
    }
    save_document(doc)
}

/// Concatenate the pages of two or more documents, in order.
pub fn merge_documents(documents: &[Vec<u8>]) -> Result<Vec<u8>, PdfEditError> {
    if documents.len() < 2 {
        return Err(PdfEditError::InvalidArgument(
            "Please upload at least 2 PDF files".into(),
        ));
    }

    let mut loaded = Vec::with_capacity(documents.len());
    for (i, bytes) in documents.iter().enumerate() {
        let doc = Document::load_mem(bytes).map_err(|e| {
            PdfEditError::DocumentParse(format!("Failed to load document {}: {}", i + 1, e))
        })?;
        loaded.push(doc);
    }

    let mut sources = loaded.into_iter();
    let Some(mut merged) = sources.next() else {
        return Err(PdfEditError::InvalidArgument("No documents to merge".into()));
    };
    let mut page_ids: Vec<ObjectId> = merged.get_pages().into_values().collect();

    for mut source in sources {
        // Move the source into an id range above everything merged so far.
        source.renumber_objects_with(merged.max_id + 1);
        page_ids.extend(source.get_pages().into_values());
        merged.max_id = merged.max_id.max(source.max_id);
        merged.objects.extend(source.objects);
    }

    flatten_page_tree(&mut merged, &page_ids)?;
    save_document(merged)
}

fn zero_based(page: u32, page_count: usize) -> Option<usize> {
    let index = usize::try_from(page).ok()?.checked_sub(1)?;
    (index < page_count).then_some(index)
}

/// Rebuild `doc` with only the pages at `selection` (0-based), in order.
fn select_pages(mut doc: Document, selection: &[usize]) -> Result<Vec<u8>, PdfEditError> {
    let all: Vec<ObjectId> = doc.get_pages().into_values().collect();
    let page_ids: Vec<ObjectId> = selection.iter().map(|&i| all[i]).collect();
    flatten_page_tree(&mut doc, &page_ids)?;
    save_document(doc)
}

/// Make `page_ids` the only kids of the root `/Pages` node.
///
/// A page listed more than once is copied so every tree node keeps a
/// single parent.
fn flatten_page_tree(doc: &mut Document, page_ids: &[ObjectId]) -> Result<(), PdfEditError> {
    let root = pages_root(doc)?;

    for &page_id in page_ids {
        materialize_inherited(doc, page_id);
    }

    let mut seen = HashSet::new();
    let mut kids = Vec::with_capacity(page_ids.len());
    for &page_id in page_ids {
        let id = if seen.insert(page_id) {
            page_id
        } else {
            let copy = doc
                .get_object(page_id)
                .map_err(PdfEditError::operation)?
                .clone();
            doc.add_object(copy)
        };
        doc.get_dictionary_mut(id)
            .map_err(PdfEditError::operation)?
            .set("Parent", Object::Reference(root));
        kids.push(Object::Reference(id));
    }

    let root_dict = doc
        .get_dictionary_mut(root)
        .map_err(PdfEditError::operation)?;
    root_dict.set("Count", Object::Integer(kids.len() as i64));
    root_dict.set("Kids", Object::Array(kids));

    doc.prune_objects();
    Ok(())
}

fn pages_root(doc: &Document) -> Result<ObjectId, PdfEditError> {
    doc.catalog()
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(|e| PdfEditError::Operation(format!("Document has no page tree: {}", e)))
}
