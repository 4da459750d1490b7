//! Standard 14 font selection and metrics
//!
//! Replacement text is always drawn with one of the PDF standard fonts so
//! that nothing has to be embedded. Callers usually pass back whatever font
//! name the layout reported (`BCDEEE+ArialMT`, `TimesNewRomanPSMT`, ...), a
//! CSS generic family, or a short code such as `helv`; all of these are
//! folded onto the closest standard font.

/// Fallback advance width (1/1000 em) for glyphs without metrics.
pub const DEFAULT_GLYPH_WIDTH: f64 = 500.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
    TimesRoman,
    TimesBold,
    TimesItalic,
    TimesBoldItalic,
    Courier,
    CourierBold,
    CourierOblique,
    CourierBoldOblique,
    Symbol,
    ZapfDingbats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Helvetica,
    Times,
    Courier,
}

impl StandardFont {
    /// PostScript name used as `/BaseFont`.
    pub fn base_name(&self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
            StandardFont::HelveticaOblique => "Helvetica-Oblique",
            StandardFont::HelveticaBoldOblique => "Helvetica-BoldOblique",
            StandardFont::TimesRoman => "Times-Roman",
            StandardFont::TimesBold => "Times-Bold",
            StandardFont::TimesItalic => "Times-Italic",
            StandardFont::TimesBoldItalic => "Times-BoldItalic",
            StandardFont::Courier => "Courier",
            StandardFont::CourierBold => "Courier-Bold",
            StandardFont::CourierOblique => "Courier-Oblique",
            StandardFont::CourierBoldOblique => "Courier-BoldOblique",
            StandardFont::Symbol => "Symbol",
            StandardFont::ZapfDingbats => "ZapfDingbats",
        }
    }

    /// Key under which the font is registered in a page's `/Font` resources.
    pub fn resource_key(&self) -> String {
        format!("PE{}", self.base_name().replace('-', ""))
    }

    /// Exact match on a standard PostScript name.
    pub fn from_base_name(name: &str) -> Option<StandardFont> {
        ALL.iter().copied().find(|f| f.base_name() == name)
    }

    /// Pick the closest standard font for a caller-supplied name.
    ///
    /// Unknown names fall back to Helvetica.
    pub fn from_name(name: &str) -> StandardFont {
        let lower = name.trim().to_lowercase();

        if let Some(font) = short_code(&lower) {
            return font;
        }
        if let Some(font) = StandardFont::from_base_name(name.trim()) {
            return font;
        }
        if lower.contains("symbol") {
            return StandardFont::Symbol;
        }
        if lower.contains("zapf") || lower.contains("dingbat") {
            return StandardFont::ZapfDingbats;
        }

        let bold = lower.contains("bold") || lower.contains("black") || lower.contains("heavy");
        let italic = lower.contains("italic") || lower.contains("oblique");
        StandardFont::styled(family_of(&lower), bold, italic)
    }

    fn styled(family: Family, bold: bool, italic: bool) -> StandardFont {
        match (family, bold, italic) {
            (Family::Helvetica, false, false) => StandardFont::Helvetica,
            (Family::Helvetica, true, false) => StandardFont::HelveticaBold,
            (Family::Helvetica, false, true) => StandardFont::HelveticaOblique,
            (Family::Helvetica, true, true) => StandardFont::HelveticaBoldOblique,
            (Family::Times, false, false) => StandardFont::TimesRoman,
            (Family::Times, true, false) => StandardFont::TimesBold,
            (Family::Times, false, true) => StandardFont::TimesItalic,
            (Family::Times, true, true) => StandardFont::TimesBoldItalic,
            (Family::Courier, false, false) => StandardFont::Courier,
            (Family::Courier, true, false) => StandardFont::CourierBold,
            (Family::Courier, false, true) => StandardFont::CourierOblique,
            (Family::Courier, true, true) => StandardFont::CourierBoldOblique,
        }
    }

    /// Advance width of a WinAnsi byte in 1/1000 em.
    ///
    /// Bold and oblique variants reuse the regular metrics.
    pub fn glyph_width(&self, code: u8) -> f64 {
        let table = match self {
            StandardFont::Courier
            | StandardFont::CourierBold
            | StandardFont::CourierOblique
            | StandardFont::CourierBoldOblique => return 600.0,
            StandardFont::Helvetica
            | StandardFont::HelveticaBold
            | StandardFont::HelveticaOblique
            | StandardFont::HelveticaBoldOblique => &HELVETICA_WIDTHS,
            StandardFont::TimesRoman
            | StandardFont::TimesBold
            | StandardFont::TimesItalic
            | StandardFont::TimesBoldItalic => &TIMES_WIDTHS,
            StandardFont::Symbol | StandardFont::ZapfDingbats => return DEFAULT_GLYPH_WIDTH,
        };
        match code {
            32..=126 => f64::from(table[usize::from(code - 32)]),
            _ => DEFAULT_GLYPH_WIDTH,
        }
    }
}

const ALL: [StandardFont; 14] = [
    StandardFont::Helvetica,
    StandardFont::HelveticaBold,
    StandardFont::HelveticaOblique,
    StandardFont::HelveticaBoldOblique,
    StandardFont::TimesRoman,
    StandardFont::TimesBold,
    StandardFont::TimesItalic,
    StandardFont::TimesBoldItalic,
    StandardFont::Courier,
    StandardFont::CourierBold,
    StandardFont::CourierOblique,
    StandardFont::CourierBoldOblique,
    StandardFont::Symbol,
    StandardFont::ZapfDingbats,
];

/// Four-letter Base-14 codes used by MuPDF-style clients.
fn short_code(lower: &str) -> Option<StandardFont> {
    Some(match lower {
        "helv" => StandardFont::Helvetica,
        "hebo" => StandardFont::HelveticaBold,
        "heit" => StandardFont::HelveticaOblique,
        "hebi" => StandardFont::HelveticaBoldOblique,
        "tiro" => StandardFont::TimesRoman,
        "tibo" => StandardFont::TimesBold,
        "tiit" => StandardFont::TimesItalic,
        "tibi" => StandardFont::TimesBoldItalic,
        "cour" => StandardFont::Courier,
        "cobo" => StandardFont::CourierBold,
        "coit" => StandardFont::CourierOblique,
        "cobi" => StandardFont::CourierBoldOblique,
        "symb" => StandardFont::Symbol,
        "zadb" => StandardFont::ZapfDingbats,
        _ => return None,
    })
}

fn family_of(lower: &str) -> Family {
    match lower {
        "serif" => return Family::Times,
        "monospace" => return Family::Courier,
        "sans-serif" | "cursive" | "fantasy" => return Family::Helvetica,
        _ => {}
    }

    if lower.contains("times")
        || lower.contains("georgia")
        || lower.contains("garamond")
        || lower.contains("cambria")
        || lower.contains("minion")
        || (lower.contains("serif") && !lower.contains("sans"))
    {
        return Family::Times;
    }

    if lower.contains("courier")
        || lower.contains("mono")
        || lower.contains("consolas")
        || lower.contains("monaco")
    {
        return Family::Courier;
    }

    Family::Helvetica
}

/// Helvetica advance widths for codes 32..=126.
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Times-Roman advance widths for codes 32..=126.
#[rustfmt::skip]
const TIMES_WIDTHS: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 278, 278, 564, 564, 564, 444,
    921, 722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722,
    556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611, 333, 278, 333, 469, 500,
    333, 444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, 500, 500,
    500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444, 480, 200, 480, 541,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_codes() {
        assert_eq!(StandardFont::from_name("helv"), StandardFont::Helvetica);
        assert_eq!(StandardFont::from_name("tiro"), StandardFont::TimesRoman);
        assert_eq!(StandardFont::from_name("cobo"), StandardFont::CourierBold);
        assert_eq!(StandardFont::from_name("HEBI"), StandardFont::HelveticaBoldOblique);
    }

    #[test]
    fn test_css_generic_families() {
        assert_eq!(StandardFont::from_name("serif"), StandardFont::TimesRoman);
        assert_eq!(StandardFont::from_name("sans-serif"), StandardFont::Helvetica);
        assert_eq!(StandardFont::from_name("monospace"), StandardFont::Courier);
        assert_eq!(StandardFont::from_name("cursive"), StandardFont::Helvetica);
    }

    #[test]
    fn test_embedded_font_names() {
        assert_eq!(StandardFont::from_name("BCDEEE+ArialMT"), StandardFont::Helvetica);
        assert_eq!(StandardFont::from_name("Arial-BoldMT"), StandardFont::HelveticaBold);
        assert_eq!(
            StandardFont::from_name("BCDEEE+TimesNewRomanPSMT"),
            StandardFont::TimesRoman
        );
        assert_eq!(
            StandardFont::from_name("TimesNewRoman,BoldItalic"),
            StandardFont::TimesBoldItalic
        );
        assert_eq!(StandardFont::from_name("Consolas"), StandardFont::Courier);
        assert_eq!(StandardFont::from_name("DejaVuSans-Oblique"), StandardFont::HelveticaOblique);
    }

    #[test]
    fn test_exact_standard_names() {
        assert_eq!(StandardFont::from_name("Times-Bold"), StandardFont::TimesBold);
        assert_eq!(StandardFont::from_name("Symbol"), StandardFont::Symbol);
        assert_eq!(StandardFont::from_name("ZapfDingbats"), StandardFont::ZapfDingbats);
    }

    #[test]
    fn test_unknown_defaults_to_helvetica() {
        assert_eq!(StandardFont::from_name("g_d0_f1"), StandardFont::Helvetica);
        assert_eq!(StandardFont::from_name(""), StandardFont::Helvetica);
    }

    #[test]
    fn test_resource_keys_are_valid_names() {
        for font in ALL {
            let key = font.resource_key();
            assert!(key.chars().all(|c| c.is_ascii_alphanumeric()), "{key}");
        }
    }

    #[test]
    fn test_widths() {
        assert_eq!(StandardFont::Helvetica.glyph_width(b' '), 278.0);
        assert_eq!(StandardFont::Helvetica.glyph_width(b'W'), 944.0);
        assert_eq!(StandardFont::TimesRoman.glyph_width(b'a'), 444.0);
        assert_eq!(StandardFont::CourierBold.glyph_width(b'i'), 600.0);
        assert_eq!(StandardFont::Helvetica.glyph_width(0xE9), DEFAULT_GLYPH_WIDTH);
    }
}
