//! Minimal `ToUnicode` CMap reader
//!
//! Understands `codespacerange`, `bfchar` and `bfrange` sections, which is
//! all that producers put in ToUnicode streams in practice.

use std::collections::HashMap;

/// Upper bound on codes expanded from a single `bfrange` entry.
const MAX_RANGE_SPAN: u32 = 0xFFFF;

#[derive(Debug, Clone, Default)]
pub(crate) struct ToUnicodeMap {
    map: HashMap<u32, String>,
    code_len: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Hex(Vec<u8>),
    Word(String),
    ArrayStart,
    ArrayEnd,
}

impl ToUnicodeMap {
    pub fn parse(data: &[u8]) -> ToUnicodeMap {
        let tokens = tokenize(data);
        let mut cmap = ToUnicodeMap::default();
        let mut i = 0;

        while i < tokens.len() {
            match &tokens[i] {
                Token::Word(w) if w == "begincodespacerange" => {
                    i += 1;
                    while let Some(Token::Hex(lo)) = tokens.get(i) {
                        cmap.code_len.get_or_insert(lo.len().max(1));
                        i += 2;
                    }
                }
                Token::Word(w) if w == "beginbfchar" => {
                    i += 1;
                    while let (Some(Token::Hex(src)), Some(Token::Hex(dst))) =
                        (tokens.get(i), tokens.get(i + 1))
                    {
                        cmap.map.insert(code_of(src), utf16_text(dst));
                        i += 2;
                    }
                }
                Token::Word(w) if w == "beginbfrange" => {
                    i += 1;
                    i = cmap.read_ranges(&tokens, i);
                }
                _ => i += 1,
            }
        }

        cmap
    }

    fn read_ranges(&mut self, tokens: &[Token], mut i: usize) -> usize {
        while let (Some(Token::Hex(lo)), Some(Token::Hex(hi))) = (tokens.get(i), tokens.get(i + 1)) {
            let (lo, hi) = (code_of(lo), code_of(hi));
            let hi = hi.min(lo.saturating_add(MAX_RANGE_SPAN));
            match tokens.get(i + 2) {
                Some(Token::Hex(dst)) => {
                    let base = utf16_units(dst);
                    for (offset, code) in (lo..=hi).enumerate() {
                        let mut units = base.clone();
                        if let Some(last) = units.last_mut() {
                            *last = last.wrapping_add(offset as u16);
                        }
                        self.map.insert(code, String::from_utf16_lossy(&units));
                    }
                    i += 3;
                }
                Some(Token::ArrayStart) => {
                    i += 3;
                    let mut code = lo;
                    while let Some(Token::Hex(dst)) = tokens.get(i) {
                        if code <= hi {
                            self.map.insert(code, utf16_text(dst));
                        }
                        code = code.saturating_add(1);
                        i += 1;
                    }
                    if let Some(Token::ArrayEnd) = tokens.get(i) {
                        i += 1;
                    }
                }
                _ => break,
            }
        }
        i
    }

    pub fn lookup(&self, code: u32) -> Option<&str> {
        self.map.get(&code).map(String::as_str)
    }

    /// Byte width of codes, when the CMap declares a codespace.
    pub fn code_len(&self) -> Option<usize> {
        self.code_len
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

fn code_of(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .take(4)
        .fold(0u32, |acc, &b| (acc << 8) | u32::from(b))
}

fn utf16_units(bytes: &[u8]) -> Vec<u16> {
    if bytes.len() == 1 {
        return vec![u16::from(bytes[0])];
    }
    bytes
        .chunks(2)
        .filter(|c| c.len() == 2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .collect()
}

fn utf16_text(bytes: &[u8]) -> String {
    String::from_utf16_lossy(&utf16_units(bytes))
}

fn tokenize(data: &[u8]) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < data.len() {
        let b = data[i];
        match b {
            b'%' => {
                while i < data.len() && data[i] != b'\n' && data[i] != b'\r' {
                    i += 1;
                }
            }
            b'<' if data.get(i + 1) == Some(&b'<') => i += 2,
            b'>' if data.get(i + 1) == Some(&b'>') => i += 2,
            b'<' => {
                i += 1;
                let mut digits = Vec::new();
                while i < data.len() && data[i] != b'>' {
                    if data[i].is_ascii_hexdigit() {
                        digits.push(data[i]);
                    }
                    i += 1;
                }
                i += 1;
                tokens.push(Token::Hex(hex_bytes(&digits)));
            }
            b'[' => {
                tokens.push(Token::ArrayStart);
                i += 1;
            }
            b']' => {
                tokens.push(Token::ArrayEnd);
                i += 1;
            }
            b'(' => {
                // Literal strings only occur in the CMap header; skip them.
                let mut depth = 0usize;
                while i < data.len() {
                    match data[i] {
                        b'\\' => i += 1,
                        b'(' => depth += 1,
                        b')' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    i += 1;
                }
                i += 1;
            }
            _ if b.is_ascii_whitespace() => i += 1,
            _ => {
                let start = i;
                while i < data.len()
                    && !data[i].is_ascii_whitespace()
                    && !matches!(data[i], b'<' | b'>' | b'[' | b']' | b'(' | b'/' | b'%')
                {
                    i += 1;
                }
                if i == start {
                    i += 1;
                } else {
                    tokens.push(Token::Word(
                        String::from_utf8_lossy(&data[start..i]).into_owned(),
                    ));
                }
            }
        }
    }

    tokens
}

fn hex_bytes(digits: &[u8]) -> Vec<u8> {
    let nibble = |d: u8| (d as char).to_digit(16).unwrap_or(0) as u8;
    digits
        .chunks(2)
        .map(|pair| {
            let hi = nibble(pair[0]);
            let lo = pair.get(1).map(|&d| nibble(d)).unwrap_or(0);
            (hi << 4) | lo
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &[u8] = br#"
/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CMapName /Adobe-Identity-UCS def
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
2 beginbfchar
<0003> <0020>
<0024> <0041>
endbfchar
2 beginbfrange
<0044> <0046> <0061>
<0050> <0051> [<00660069> <0066006C>]
endbfrange
endcmap
"#;

    #[test]
    fn test_codespace_sets_code_length() {
        let cmap = ToUnicodeMap::parse(SAMPLE);
        assert_eq!(cmap.code_len(), Some(2));
    }

    #[test]
    fn test_bfchar_entries() {
        let cmap = ToUnicodeMap::parse(SAMPLE);
        assert_eq!(cmap.lookup(0x0003), Some(" "));
        assert_eq!(cmap.lookup(0x0024), Some("A"));
    }

    #[test]
    fn test_bfrange_increments_destination() {
        let cmap = ToUnicodeMap::parse(SAMPLE);
        assert_eq!(cmap.lookup(0x0044), Some("a"));
        assert_eq!(cmap.lookup(0x0045), Some("b"));
        assert_eq!(cmap.lookup(0x0046), Some("c"));
        assert_eq!(cmap.lookup(0x0047), None);
    }

    #[test]
    fn test_bfrange_array_form_maps_ligatures() {
        let cmap = ToUnicodeMap::parse(SAMPLE);
        assert_eq!(cmap.lookup(0x0050), Some("fi"));
        assert_eq!(cmap.lookup(0x0051), Some("fl"));
    }

    #[test]
    fn test_garbage_input_yields_empty_map() {
        let cmap = ToUnicodeMap::parse(b"not a cmap at all ((( <<");
        assert!(cmap.is_empty());
        assert_eq!(cmap.code_len(), None);
    }
}
