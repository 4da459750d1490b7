//! Content stream interpreter
//!
//! Walks page and form XObject content tracking the graphics and text state
//! needed to place each text-showing operator on the page. Only the
//! operators that affect text position, font or fill colour are honoured;
//! everything else is skipped.

use std::collections::HashMap;
use std::rc::Rc;

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object};

use super::font::FontInfo;
use crate::color::Rgb;
use crate::geometry::Matrix;
use crate::resources::{get_dict, get_resolved, number, resolve, stream_bytes};

/// Nesting limit for form XObjects drawn through `Do`.
const MAX_FORM_DEPTH: usize = 8;

/// Operators interpreted per page, form content included.
const MAX_OPERATIONS: usize = 1_000_000;

/// `TJ` adjustments below this (1/1000 em) read as a word gap.
const KERN_SPACE_THRESHOLD: f64 = -100.0;

/// A shown string, positioned in default user space.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawSpan {
    pub text: String,
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    pub font: String,
    pub size: f64,
    pub color: u32,
}

#[derive(Debug, Clone)]
struct TextState {
    font: Option<Rc<FontInfo>>,
    size: f64,
    char_spacing: f64,
    word_spacing: f64,
    horiz_scale: f64,
    leading: f64,
    rise: f64,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font: None,
            size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horiz_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct GraphicsState {
    ctm: Matrix,
    fill: u32,
    text: TextState,
}

/// Text object matrices; reset by `BT`.
#[derive(Debug, Clone, Copy, Default)]
struct TextMatrices {
    tm: Matrix,
    tlm: Matrix,
}

impl TextMatrices {
    fn translate_line(&mut self, tx: f64, ty: f64) {
        self.tlm = Matrix::translate(tx, ty).concat(&self.tlm);
        self.tm = self.tlm;
    }

    fn advance(&mut self, tx: f64) {
        self.tm = Matrix::translate(tx, 0.0).concat(&self.tm);
    }
}

pub(crate) struct Interpreter<'a> {
    doc: &'a Document,
    spans: Vec<RawSpan>,
    remaining: usize,
}

impl<'a> Interpreter<'a> {
    pub fn new(doc: &'a Document) -> Self {
        Self {
            doc,
            spans: Vec::new(),
            remaining: MAX_OPERATIONS,
        }
    }

    /// Interpret a page's content and return its text runs in stream order.
    pub fn run_page(mut self, content: &[u8], resources: Option<&'a Dictionary>) -> Vec<RawSpan> {
        self.run(content, resources, GraphicsState::default(), 0);
        self.spans
    }

    fn run(
        &mut self,
        content: &[u8],
        resources: Option<&'a Dictionary>,
        initial: GraphicsState,
        depth: usize,
    ) {
        if self.remaining == 0 {
            return;
        }
        let Ok(content) = Content::decode(content) else {
            return;
        };
        let fonts = self.load_fonts(resources);

        let mut gs = initial;
        let mut saved: Vec<GraphicsState> = Vec::new();
        let mut text = TextMatrices::default();

        for op in &content.operations {
            if self.remaining == 0 {
                break;
            }
            self.remaining -= 1;

            let operands = op.operands.as_slice();
            match op.operator.as_str() {
                "q" => saved.push(gs.clone()),
                "Q" => {
                    if let Some(prev) = saved.pop() {
                        gs = prev;
                    }
                }
                "cm" => {
                    if let Some(m) = Matrix::from_objects(operands) {
                        gs.ctm = m.concat(&gs.ctm);
                    }
                }

                "BT" => text = TextMatrices::default(),
                "Tf" => {
                    if let [Object::Name(key), size, ..] = operands {
                        gs.text.font = Some(
                            fonts
                                .get(key)
                                .cloned()
                                .unwrap_or_else(|| Rc::new(FontInfo::fallback())),
                        );
                        gs.text.size = number(size).unwrap_or(0.0);
                    }
                }
                "Tm" => {
                    if let Some(m) = Matrix::from_objects(operands) {
                        text.tm = m;
                        text.tlm = m;
                    }
                }
                "Td" => {
                    if let Some((tx, ty)) = pair(operands) {
                        text.translate_line(tx, ty);
                    }
                }
                "TD" => {
                    if let Some((tx, ty)) = pair(operands) {
                        gs.text.leading = -ty;
                        text.translate_line(tx, ty);
                    }
                }
                "T*" => text.translate_line(0.0, -gs.text.leading),
                "TL" => set_from(operands, &mut gs.text.leading),
                "Tc" => set_from(operands, &mut gs.text.char_spacing),
                "Tw" => set_from(operands, &mut gs.text.word_spacing),
                "Ts" => set_from(operands, &mut gs.text.rise),
                "Tz" => {
                    if let Some(scale) = operands.first().and_then(number) {
                        gs.text.horiz_scale = scale / 100.0;
                    }
                }

                "Tj" => {
                    if let Some(s) = operands.first() {
                        self.show(&gs, &mut text, std::slice::from_ref(s));
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(items)) = operands.first() {
                        self.show(&gs, &mut text, items);
                    }
                }
                "'" => {
                    text.translate_line(0.0, -gs.text.leading);
                    if let Some(s) = operands.first() {
                        self.show(&gs, &mut text, std::slice::from_ref(s));
                    }
                }
                "\"" => {
                    if let [aw, ac, s, ..] = operands {
                        gs.text.word_spacing = number(aw).unwrap_or(gs.text.word_spacing);
                        gs.text.char_spacing = number(ac).unwrap_or(gs.text.char_spacing);
                        text.translate_line(0.0, -gs.text.leading);
                        self.show(&gs, &mut text, std::slice::from_ref(s));
                    }
                }

                "g" | "rg" | "k" | "sc" | "scn" => {
                    if let Some(rgb) = fill_color(operands) {
                        gs.fill = rgb.to_packed();
                    }
                }
                // A new colour space starts at its initial colour, black for
                // every space we map.
                "cs" => gs.fill = 0,

                "Do" => {
                    if depth < MAX_FORM_DEPTH {
                        if let Some(Object::Name(name)) = operands.first() {
                            self.draw_form(name, resources, &gs, depth);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn load_fonts(&self, resources: Option<&'a Dictionary>) -> HashMap<Vec<u8>, Rc<FontInfo>> {
        let Some(font_dict) = resources.and_then(|r| get_dict(self.doc, r, b"Font")) else {
            return HashMap::new();
        };
        font_dict
            .iter()
            .filter_map(|(key, obj)| {
                let dict = match resolve(self.doc, obj)? {
                    Object::Dictionary(d) => d,
                    Object::Stream(s) => &s.dict,
                    _ => return None,
                };
                Some((key.clone(), Rc::new(FontInfo::load(self.doc, dict))))
            })
            .collect()
    }

    fn draw_form(
        &mut self,
        name: &[u8],
        resources: Option<&'a Dictionary>,
        gs: &GraphicsState,
        depth: usize,
    ) {
        let doc = self.doc;
        let Some(xobjects) = resources.and_then(|r| get_dict(doc, r, b"XObject")) else {
            return;
        };
        let Some(Object::Stream(form)) = get_resolved(doc, xobjects, name) else {
            return;
        };
        let is_form = matches!(
            get_resolved(doc, &form.dict, b"Subtype"),
            Some(Object::Name(n)) if n.as_slice() == b"Form"
        );
        if !is_form {
            return;
        }
        let Some(bytes) = stream_bytes(form) else {
            return;
        };

        let matrix = get_resolved(doc, &form.dict, b"Matrix")
            .and_then(|m| m.as_array().ok())
            .and_then(|items| Matrix::from_objects(items))
            .unwrap_or_default();
        let form_resources = get_dict(doc, &form.dict, b"Resources").or(resources);

        let mut inner = gs.clone();
        inner.ctm = matrix.concat(&gs.ctm);
        self.run(&bytes, form_resources, inner, depth + 1);
    }

    /// Show strings (with optional `TJ` adjustments) and record one span.
    fn show(&mut self, gs: &GraphicsState, text: &mut TextMatrices, elements: &[Object]) {
        let params = &gs.text;
        let font = params
            .font
            .clone()
            .unwrap_or_else(|| Rc::new(FontInfo::fallback()));
        let start = text.tm;
        let mut shown = String::new();

        for element in elements {
            match element {
                Object::String(bytes, _) => {
                    for glyph in font.decode(bytes) {
                        shown.push_str(&glyph.text);
                        let mut tx = glyph.width / 1000.0 * params.size + params.char_spacing;
                        if glyph.is_space {
                            tx += params.word_spacing;
                        }
                        text.advance(tx * params.horiz_scale);
                    }
                }
                other => {
                    if let Some(adjust) = number(other) {
                        text.advance(-adjust / 1000.0 * params.size * params.horiz_scale);
                        if adjust < KERN_SPACE_THRESHOLD && !shown.is_empty() && !shown.ends_with(' ') {
                            shown.push(' ');
                        }
                    }
                }
            }
        }

        if shown.is_empty() {
            return;
        }

        let begin = start.concat(&gs.ctm);
        let end = text.tm.concat(&gs.ctm);
        let bottom = params.rise + font.descent * params.size;
        let top = params.rise + font.ascent * params.size;
        let corners = [
            begin.apply(0.0, bottom),
            begin.apply(0.0, top),
            end.apply(0.0, bottom),
            end.apply(0.0, top),
        ];

        let (mut x0, mut y0) = (f64::INFINITY, f64::INFINITY);
        let (mut x1, mut y1) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for (x, y) in corners {
            x0 = x0.min(x);
            y0 = y0.min(y);
            x1 = x1.max(x);
            y1 = y1.max(y);
        }

        self.spans.push(RawSpan {
            text: shown,
            x0,
            y0,
            x1,
            y1,
            font: font.name.clone(),
            size: (params.size * begin.vertical_scale()).abs(),
            color: gs.fill,
        });
    }
}

fn pair(operands: &[Object]) -> Option<(f64, f64)> {
    match operands {
        [a, b, ..] => Some((number(a)?, number(b)?)),
        _ => None,
    }
}

fn set_from(operands: &[Object], slot: &mut f64) {
    if let Some(v) = operands.first().and_then(number) {
        *slot = v;
    }
}

/// Fill colour from `g`/`rg`/`k`/`sc`/`scn` operands; pattern fills are ignored.
fn fill_color(operands: &[Object]) -> Option<Rgb> {
    let components: Option<Vec<f64>> = operands.iter().map(number).collect();
    Rgb::from_components(&components?)
}
