//! WinAnsiEncoding (Windows-1252) conversion
//!
//! Simple fonts without a `ToUnicode` map are decoded as WinAnsi, and
//! replacement text is written as WinAnsi for the standard fonts.

/// Unicode code points for bytes 0x80..=0x9F; `None` where undefined.
const HIGH_CONTROL_RANGE: [Option<char>; 32] = [
    Some('\u{20AC}'),
    None,
    Some('\u{201A}'),
    Some('\u{0192}'),
    Some('\u{201E}'),
    Some('\u{2026}'),
    Some('\u{2020}'),
    Some('\u{2021}'),
    Some('\u{02C6}'),
    Some('\u{2030}'),
    Some('\u{0160}'),
    Some('\u{2039}'),
    Some('\u{0152}'),
    None,
    Some('\u{017D}'),
    None,
    None,
    Some('\u{2018}'),
    Some('\u{2019}'),
    Some('\u{201C}'),
    Some('\u{201D}'),
    Some('\u{2022}'),
    Some('\u{2013}'),
    Some('\u{2014}'),
    Some('\u{02DC}'),
    Some('\u{2122}'),
    Some('\u{0161}'),
    Some('\u{203A}'),
    Some('\u{0153}'),
    None,
    Some('\u{017E}'),
    Some('\u{0178}'),
];

/// Replacement byte for characters WinAnsi cannot represent.
pub const UNMAPPED: u8 = b'?';

pub fn decode_byte(byte: u8) -> Option<char> {
    match byte {
        0x80..=0x9F => HIGH_CONTROL_RANGE[usize::from(byte - 0x80)],
        _ => Some(char::from(byte)),
    }
}

pub fn decode(bytes: &[u8]) -> String {
    bytes.iter().filter_map(|&b| decode_byte(b)).collect()
}

pub fn encode_char(ch: char) -> Option<u8> {
    let code = u32::from(ch);
    if code < 0x80 || (0xA0..=0xFF).contains(&code) {
        return u8::try_from(code).ok();
    }
    HIGH_CONTROL_RANGE
        .iter()
        .position(|&c| c == Some(ch))
        .and_then(|idx| u8::try_from(idx + 0x80).ok())
}

/// Encode text, substituting [`UNMAPPED`] for unsupported characters.
pub fn encode(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| encode_char(ch).unwrap_or(UNMAPPED))
        .collect()
}
