//! Coordinate patches: cover a rectangle in white and draw new text
//!
//! Patches are written as an extra content stream per page so that the
//! replacement text is part of the page itself and shows up in later
//! layout extraction. The original content is wrapped in `q ... Q` first,
//! which puts the overlay back in default user space even when the original
//! leaves the graphics state unbalanced.

use std::collections::{BTreeMap, HashMap};

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::color::Rgb;
use crate::encoding;
use crate::error::PdfEditError;
use crate::fonts::StandardFont;
use crate::geometry::{page_box, PageBox};
use crate::load_document;
use crate::resources::{materialize_inherited, resolve};

/// Line advance for multi-line replacement text, as a multiple of the size.
const LINE_HEIGHT: f64 = 1.2;
/// Stroke width of the white cover, matching the fill.
const COVER_BORDER: f64 = 1.0;

/// One rectangle-and-replacement-text instruction, in top-left page space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    /// 0-based page index.
    pub page: i64,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub new_text: String,
    pub size: f64,
    /// Packed `0xRRGGBB` integer; anything else draws black.
    #[serde(default)]
    pub color: Option<Value>,
    #[serde(default)]
    pub font: Option<String>,
}

impl Patch {
    pub fn text_color(&self) -> Rgb {
        decode_color(self.color.as_ref())
    }

    pub fn standard_font(&self) -> StandardFont {
        self.font
            .as_deref()
            .map(StandardFont::from_name)
            .unwrap_or(StandardFont::Helvetica)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatchReport {
    pub bytes: Vec<u8>,
    /// Number of patches drawn.
    pub applied: usize,
    /// Indices of patches whose page does not exist.
    pub skipped: Vec<usize>,
}

/// Integer colours are packed RGB; every other JSON value is black.
pub fn decode_color(color: Option<&Value>) -> Rgb {
    let packed = match color {
        Some(Value::Number(n)) => n
            .as_i64()
            .map(|v| (v & 0xFF_FFFF) as u32)
            .or_else(|| n.as_u64().map(|v| (v & 0xFF_FFFF) as u32)),
        _ => None,
    };
    packed.map(Rgb::from_packed).unwrap_or(Rgb::BLACK)
}

/// Apply `patches` to the document in `bytes`.
///
/// Patches for the same page are drawn in submission order, so a later
/// patch paints over an earlier overlapping one. When nothing is drawn the
/// input is returned unchanged.
pub fn apply_patches(bytes: &[u8], patches: &[Patch]) -> Result<PatchReport, PdfEditError> {
    if patches.is_empty() {
        return Ok(PatchReport {
            bytes: bytes.to_vec(),
            applied: 0,
            skipped: Vec::new(),
        });
    }

    for (index, patch) in patches.iter().enumerate() {
        if !(patch.size.is_finite() && patch.size > 0.0) {
            return Err(PdfEditError::InvalidArgument(format!(
                "edit {index}: size must be a positive number"
            )));
        }
    }

    let mut doc = load_document(bytes)?;
    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();

    let mut by_page: BTreeMap<usize, Vec<&Patch>> = BTreeMap::new();
    let mut skipped = Vec::new();
    for (index, patch) in patches.iter().enumerate() {
        match usize::try_from(patch.page) {
            Ok(page) if page < page_ids.len() => by_page.entry(page).or_default().push(patch),
            _ => skipped.push(index),
        }
    }

    if by_page.is_empty() {
        return Ok(PatchReport {
            bytes: bytes.to_vec(),
            applied: 0,
            skipped,
        });
    }

    let mut fonts = FontRegistry::default();
    let mut applied = 0;
    for (page, page_patches) in &by_page {
        let page_id = page_ids[*page];
        let bbox = page_box(&doc, page_id);
        let overlay = overlay_operations(&bbox, page_patches);

        for patch in page_patches {
            let font = patch.standard_font();
            let font_id = fonts.object_for(&mut doc, font);
            register_font(&mut doc, page_id, font, font_id)?;
        }
        append_overlay(&mut doc, page_id, overlay)?;
        applied += page_patches.len();
    }

    let mut output = Vec::new();
    doc.save_to(&mut output).map_err(PdfEditError::operation)?;

    Ok(PatchReport {
        bytes: output,
        applied,
        skipped,
    })
}

/// One font object per standard font, shared by all patched pages.
#[derive(Default)]
pub(crate) struct FontRegistry {
    ids: HashMap<StandardFont, ObjectId>,
}

impl FontRegistry {
    pub(crate) fn object_for(&mut self, doc: &mut Document, font: StandardFont) -> ObjectId {
        *self.ids.entry(font).or_insert_with(|| {
            let mut dict = dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => font.base_name(),
            };
            if !matches!(font, StandardFont::Symbol | StandardFont::ZapfDingbats) {
                dict.set("Encoding", "WinAnsiEncoding");
            }
            doc.add_object(dict)
        })
    }
}

pub(crate) fn real(value: f64) -> Object {
    Object::Real(value as f32)
}

pub(crate) fn rgb_operands(color: Rgb) -> Vec<Object> {
    vec![real(color.r), real(color.g), real(color.b)]
}

fn overlay_operations(bbox: &PageBox, patches: &[&Patch]) -> Vec<Operation> {
    let mut ops = vec![Operation::new("q", vec![])];

    for patch in patches {
        // `re` takes the lower-left corner in user space.
        let (left, bottom) = bbox.from_top_left(patch.x, patch.y + patch.height);
        ops.push(Operation::new("rg", rgb_operands(Rgb::WHITE)));
        ops.push(Operation::new("RG", rgb_operands(Rgb::WHITE)));
        ops.push(Operation::new("w", vec![real(COVER_BORDER)]));
        ops.push(Operation::new(
            "re",
            vec![real(left), real(bottom), real(patch.width), real(patch.height)],
        ));
        ops.push(Operation::new("B", vec![]));

        let font = patch.standard_font();
        let (tx, ty) = bbox.from_top_left(patch.x, patch.y + patch.size);
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new(
            "Tf",
            vec![Object::Name(font.resource_key().into_bytes()), real(patch.size)],
        ));
        ops.push(Operation::new("rg", rgb_operands(patch.text_color())));
        ops.push(Operation::new("Td", vec![real(tx), real(ty)]));
        for (n, line) in patch.new_text.split('\n').enumerate() {
            if n > 0 {
                ops.push(Operation::new(
                    "Td",
                    vec![real(0.0), real(-patch.size * LINE_HEIGHT)],
                ));
            }
            let line = line.strip_suffix('\r').unwrap_or(line);
            ops.push(Operation::new(
                "Tj",
                vec![Object::String(encoding::encode(line), StringFormat::Literal)],
            ));
        }
        ops.push(Operation::new("ET", vec![]));
    }

    ops.push(Operation::new("Q", vec![]));
    ops
}

/// Make `font` available as `/PE<name>` in the page's own font resources.
pub(crate) fn register_font(
    doc: &mut Document,
    page_id: ObjectId,
    font: StandardFont,
    font_id: ObjectId,
) -> Result<(), PdfEditError> {
    register_resource(doc, page_id, "Font", font.resource_key(), font_id)
}

/// Set `category/key` in the page's own resources to `object_id`.
///
/// Resources are copied onto the page first so that shared or inherited
/// dictionaries are left untouched.
pub(crate) fn register_resource(
    doc: &mut Document,
    page_id: ObjectId,
    category: &str,
    key: String,
    object_id: ObjectId,
) -> Result<(), PdfEditError> {
    materialize_inherited(doc, page_id);

    let mut resources = page_dictionary(doc, page_id)?
        .get(b"Resources")
        .ok()
        .and_then(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_dict().ok())
        .cloned()
        .unwrap_or_default();
    let mut entries = resources
        .get(category.as_bytes())
        .ok()
        .and_then(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_dict().ok())
        .cloned()
        .unwrap_or_default();

    entries.set(key, Object::Reference(object_id));
    resources.set(category, Object::Dictionary(entries));

    doc.get_dictionary_mut(page_id)
        .map_err(PdfEditError::operation)?
        .set("Resources", Object::Dictionary(resources));
    Ok(())
}

fn page_dictionary(doc: &Document, page_id: ObjectId) -> Result<&Dictionary, PdfEditError> {
    doc.get_dictionary(page_id).map_err(PdfEditError::operation)
}

/// Wrap the existing content in `q ... Q` and append the overlay after it.
pub(crate) fn append_overlay(
    doc: &mut Document,
    page_id: ObjectId,
    overlay: Vec<Operation>,
) -> Result<(), PdfEditError> {
    let existing: Vec<Object> = match page_dictionary(doc, page_id)?.get(b"Contents") {
        Ok(Object::Array(items)) => items.clone(),
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        _ => Vec::new(),
    };

    let overlay = Content { operations: overlay }
        .encode()
        .map_err(PdfEditError::operation)?;
    let save_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let restore_id = doc.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));
    let overlay_id = doc.add_object(Stream::new(Dictionary::new(), overlay));

    let mut contents = Vec::with_capacity(existing.len() + 3);
    contents.push(Object::Reference(save_id));
    contents.extend(existing);
    contents.push(Object::Reference(restore_id));
    contents.push(Object::Reference(overlay_id));

    doc.get_dictionary_mut(page_id)
        .map_err(PdfEditError::operation)?
        .set("Contents", Object::Array(contents));
    Ok(())
}
