//! Font dictionaries as seen by the layout interpreter

use std::collections::HashMap;

use lopdf::{Dictionary, Document, Object};

use super::cmap::ToUnicodeMap;
use crate::encoding;
use crate::fonts::{StandardFont, DEFAULT_GLYPH_WIDTH};
use crate::resources::{get_dict, get_resolved, number, resolve, stream_bytes};

const DEFAULT_ASCENT: f64 = 0.8;
const DEFAULT_DESCENT: f64 = -0.2;
/// `/DW` default for composite fonts.
const DEFAULT_CID_WIDTH: f64 = 1000.0;

/// One decoded character code.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Glyph {
    pub text: String,
    /// Advance in 1/1000 text-space units.
    pub width: f64,
    /// Single-byte code 32, the only code word spacing applies to.
    pub is_space: bool,
}

#[derive(Debug, Clone)]
enum Widths {
    Simple { first_char: u32, widths: Vec<f64>, missing: f64 },
    Composite { map: HashMap<u32, f64>, default: f64 },
    Standard(StandardFont),
    Fixed(f64),
}

#[derive(Debug, Clone)]
pub(crate) struct FontInfo {
    pub name: String,
    pub ascent: f64,
    pub descent: f64,
    two_byte: bool,
    widths: Widths,
    width_scale: f64,
    to_unicode: Option<ToUnicodeMap>,
}

impl FontInfo {
    /// Used when `Tf` names a font missing from the resources.
    pub fn fallback() -> FontInfo {
        FontInfo {
            name: StandardFont::Helvetica.base_name().to_string(),
            ascent: DEFAULT_ASCENT,
            descent: DEFAULT_DESCENT,
            two_byte: false,
            widths: Widths::Standard(StandardFont::Helvetica),
            width_scale: 1.0,
            to_unicode: None,
        }
    }

    pub fn load(doc: &Document, font: &Dictionary) -> FontInfo {
        let subtype = name_of(get_resolved(doc, font, b"Subtype")).unwrap_or_default();
        let base = name_of(get_resolved(doc, font, b"BaseFont"))
            .or_else(|| name_of(get_resolved(doc, font, b"Name")))
            .unwrap_or_else(|| StandardFont::Helvetica.base_name().to_string());
        let name = strip_subset_tag(&base).to_string();

        let to_unicode = match get_resolved(doc, font, b"ToUnicode") {
            Some(Object::Stream(stream)) => stream_bytes(stream)
                .map(|data| ToUnicodeMap::parse(&data))
                .filter(|cmap| !cmap.is_empty()),
            _ => None,
        };

        let composite = subtype == "Type0";
        let descendant = composite
            .then(|| descendant_font(doc, font))
            .flatten();
        let metrics_dict = descendant.unwrap_or(font);

        let widths = if composite {
            composite_widths(doc, metrics_dict)
        } else {
            simple_widths(doc, font, &name)
        };

        let width_scale = if subtype == "Type3" {
            font_matrix_scale(doc, font)
        } else {
            1.0
        };

        let (ascent, descent) = descriptor_metrics(doc, metrics_dict);

        let two_byte = match to_unicode.as_ref().and_then(ToUnicodeMap::code_len) {
            Some(len) if composite => len >= 2,
            _ => composite,
        };

        FontInfo {
            name,
            ascent,
            descent,
            two_byte,
            widths,
            width_scale,
            to_unicode,
        }
    }

    /// Split a shown string into glyphs with text and advance.
    pub fn decode(&self, bytes: &[u8]) -> Vec<Glyph> {
        if self.two_byte {
            bytes
                .chunks(2)
                .map(|pair| {
                    let code = pair
                        .iter()
                        .fold(0u32, |acc, &b| (acc << 8) | u32::from(b));
                    let text = self
                        .to_unicode
                        .as_ref()
                        .and_then(|cmap| cmap.lookup(code))
                        .map(str::to_string)
                        .unwrap_or_default();
                    Glyph {
                        text,
                        width: self.width_of(code),
                        is_space: false,
                    }
                })
                .collect()
        } else {
            bytes
                .iter()
                .map(|&b| {
                    let code = u32::from(b);
                    let text = match self.to_unicode.as_ref().and_then(|cmap| cmap.lookup(code)) {
                        Some(mapped) => mapped.to_string(),
                        None => encoding::decode_byte(b).map(String::from).unwrap_or_default(),
                    };
                    Glyph {
                        text,
                        width: self.width_of(code),
                        is_space: b == b' ',
                    }
                })
                .collect()
        }
    }

    fn width_of(&self, code: u32) -> f64 {
        let raw = match &self.widths {
            Widths::Simple {
                first_char,
                widths,
                missing,
            } => code
                .checked_sub(*first_char)
                .and_then(|idx| widths.get(idx as usize))
                .copied()
                .unwrap_or(*missing),
            Widths::Composite { map, default } => map.get(&code).copied().unwrap_or(*default),
            Widths::Standard(font) => u8::try_from(code)
                .map(|b| font.glyph_width(b))
                .unwrap_or(DEFAULT_GLYPH_WIDTH),
            Widths::Fixed(w) => *w,
        };
        raw * self.width_scale
    }
}

fn name_of(obj: Option<&Object>) -> Option<String> {
    match obj? {
        Object::Name(n) => Some(String::from_utf8_lossy(n).into_owned()),
        _ => None,
    }
}

/// `ABCDEF+Arial` -> `Arial`.
pub(crate) fn strip_subset_tag(name: &str) -> &str {
    match name.split_once('+') {
        Some((tag, rest)) if tag.len() == 6 && tag.bytes().all(|b| b.is_ascii_uppercase()) => rest,
        _ => name,
    }
}

fn descendant_font<'a>(doc: &'a Document, font: &'a Dictionary) -> Option<&'a Dictionary> {
    let arr = get_resolved(doc, font, b"DescendantFonts")?.as_array().ok()?;
    resolve(doc, arr.first()?)?.as_dict().ok()
}

fn numbers(doc: &Document, obj: &Object) -> Vec<f64> {
    match resolve(doc, obj) {
        Some(Object::Array(items)) => items
            .iter()
            .map(|item| resolve(doc, item).and_then(number).unwrap_or(0.0))
            .collect(),
        _ => Vec::new(),
    }
}

fn simple_widths(doc: &Document, font: &Dictionary, name: &str) -> Widths {
    let missing = get_dict(doc, font, b"FontDescriptor")
        .and_then(|fd| get_resolved(doc, fd, b"MissingWidth"))
        .and_then(number);

    if let Ok(widths_obj) = font.get(b"Widths") {
        let widths = numbers(doc, widths_obj);
        if !widths.is_empty() {
            let first_char = get_resolved(doc, font, b"FirstChar")
                .and_then(number)
                .unwrap_or(0.0)
                .max(0.0) as u32;
            return Widths::Simple {
                first_char,
                widths,
                missing: missing.unwrap_or(DEFAULT_GLYPH_WIDTH),
            };
        }
    }

    match StandardFont::from_base_name(name) {
        Some(standard) => Widths::Standard(standard),
        None if is_standard_alias(name) => Widths::Standard(StandardFont::from_name(name)),
        None => Widths::Fixed(missing.unwrap_or(DEFAULT_GLYPH_WIDTH)),
    }
}

/// Common non-embedded aliases of the standard fonts.
fn is_standard_alias(name: &str) -> bool {
    let base = name.split([',', '-']).next().unwrap_or(name);
    matches!(
        base,
        "Arial" | "ArialMT" | "TimesNewRoman" | "TimesNewRomanPSMT" | "CourierNew" | "CourierNewPSMT"
    )
}

/// Parse a CID font `/W` array: `c [w1 w2 ...]` and `c_first c_last w` forms.
fn composite_widths(doc: &Document, cid_font: &Dictionary) -> Widths {
    let default = get_resolved(doc, cid_font, b"DW")
        .and_then(number)
        .unwrap_or(DEFAULT_CID_WIDTH);
    let mut map = HashMap::new();

    let items = match get_resolved(doc, cid_font, b"W") {
        Some(Object::Array(items)) => items.as_slice(),
        _ => &[],
    };

    let mut i = 0;
    while i < items.len() {
        let Some(first) = resolve(doc, &items[i]).and_then(number) else {
            break;
        };
        let first = first.max(0.0) as u32;
        match items.get(i + 1).and_then(|o| resolve(doc, o)) {
            Some(Object::Array(run)) => {
                for (offset, w) in run.iter().enumerate() {
                    let Some(code) = u32::try_from(offset).ok().and_then(|o| first.checked_add(o))
                    else {
                        break;
                    };
                    if let Some(w) = resolve(doc, w).and_then(number) {
                        map.insert(code, w);
                    }
                }
                i += 2;
            }
            Some(last) => {
                let last = number(last).unwrap_or(0.0).max(0.0) as u32;
                let w = items
                    .get(i + 2)
                    .and_then(|o| resolve(doc, o))
                    .and_then(number)
                    .unwrap_or(default);
                for code in first..=last.min(first.saturating_add(0xFFFF)) {
                    map.insert(code, w);
                }
                i += 3;
            }
            None => break,
        }
    }

    Widths::Composite { map, default }
}

fn descriptor_metrics(doc: &Document, font: &Dictionary) -> (f64, f64) {
    let Some(descriptor) = get_dict(doc, font, b"FontDescriptor") else {
        return (DEFAULT_ASCENT, DEFAULT_DESCENT);
    };
    let ascent = get_resolved(doc, descriptor, b"Ascent")
        .and_then(number)
        .map(|a| a / 1000.0)
        .filter(|a| *a > 0.0)
        .unwrap_or(DEFAULT_ASCENT);
    let descent = get_resolved(doc, descriptor, b"Descent")
        .and_then(number)
        .map(|d| -(d / 1000.0).abs())
        .unwrap_or(DEFAULT_DESCENT);
    (ascent, descent)
}

/// Type3 glyph widths are in glyph space; convert to 1/1000 em.
fn font_matrix_scale(doc: &Document, font: &Dictionary) -> f64 {
    get_resolved(doc, font, b"FontMatrix")
        .map(|m| numbers(doc, m))
        .and_then(|m| m.first().copied())
        .map(|a| a * 1000.0)
        .unwrap_or(1.0)
}
