//! Document information dictionary

use lopdf::{Dictionary, Object, StringFormat};
use serde::{Deserialize, Serialize};

use crate::encoding;
use crate::error::PdfEditError;
use crate::resources::resolve;
use crate::{load_document, save_document};

/// New values for the Title, Author and Producer entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataUpdate {
    pub title: String,
    pub author: String,
    pub producer: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub producer: Option<String>,
}

pub fn edit_metadata(bytes: &[u8], update: &MetadataUpdate) -> Result<Vec<u8>, PdfEditError> {
    let mut doc = load_document(bytes)?;

    let mut info = doc
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|obj| resolve(&doc, obj))
        .and_then(|obj| obj.as_dict().ok())
        .cloned()
        .unwrap_or_default();

    info.set("Title", text_string(&update.title));
    info.set("Author", text_string(&update.author));
    info.set("Producer", text_string(&update.producer));

    let existing = doc.trailer.get(b"Info").and_then(Object::as_reference).ok();
    match existing {
        Some(id) => {
            doc.objects.insert(id, Object::Dictionary(info));
        }
        None => {
            let id = doc.add_object(info);
            doc.trailer.set("Info", Object::Reference(id));
        }
    }

    save_document(doc)
}

pub fn read_metadata(bytes: &[u8]) -> Result<Metadata, PdfEditError> {
    let doc = load_document(bytes)?;
    let Some(info) = doc
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|obj| resolve(&doc, obj))
        .and_then(|obj| obj.as_dict().ok())
    else {
        return Ok(Metadata::default());
    };

    Ok(Metadata {
        title: read_text(info, b"Title"),
        author: read_text(info, b"Author"),
        producer: read_text(info, b"Producer"),
    })
}

/// PDF text string: literal for printable ASCII, UTF-16BE otherwise.
fn text_string(value: &str) -> Object {
    if value.chars().all(|c| c.is_ascii() && !c.is_ascii_control()) {
        Object::string_literal(value)
    } else {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in value.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        Object::String(bytes, StringFormat::Hexadecimal)
    }
}

fn read_text(info: &Dictionary, key: &[u8]) -> Option<String> {
    match info.get(key).ok()? {
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        _ => None,
    }
}

fn decode_text_string(bytes: &[u8]) -> String {
    match bytes {
        [0xFE, 0xFF, rest @ ..] => {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        _ => encoding::decode(bytes),
    }
}
