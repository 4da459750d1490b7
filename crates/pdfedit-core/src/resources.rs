//! Object-graph helpers shared by extraction and editing
//!
//! Page attributes such as `Resources` and `MediaBox` may live on any
//! ancestor in the page tree, and most values may be stored inline or
//! behind an indirect reference. These helpers hide both.

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

/// Attributes a page may inherit from its ancestors in the page tree.
pub(crate) const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

const MAX_TREE_DEPTH: usize = 32;
const MAX_REFERENCE_CHAIN: usize = 8;

/// Follow indirect references until a direct object is reached.
pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    let mut current = obj;
    for _ in 0..MAX_REFERENCE_CHAIN {
        match current {
            Object::Reference(id) => current = doc.get_object(*id).ok()?,
            other => return Some(other),
        }
    }
    None
}

/// Resolve `dict[key]` to a direct object.
pub(crate) fn get_resolved<'a>(
    doc: &'a Document,
    dict: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Object> {
    dict.get(key).ok().and_then(|obj| resolve(doc, obj))
}

/// Resolve `dict[key]` to a dictionary (inline or a stream's dictionary).
pub(crate) fn get_dict<'a>(
    doc: &'a Document,
    dict: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Dictionary> {
    match get_resolved(doc, dict, key)? {
        Object::Dictionary(d) => Some(d),
        Object::Stream(s) => Some(&s.dict),
        _ => None,
    }
}

/// Numeric value of an Integer or Real object.
pub(crate) fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

/// Look up a page attribute, walking up through `/Parent` links.
pub(crate) fn inherited_attribute<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Some(value) = get_resolved(doc, node, key) {
            return Some(value);
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

/// The effective resource dictionary of a page.
pub(crate) fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    inherited_attribute(doc, page_id, b"Resources").and_then(|obj| obj.as_dict().ok())
}

/// Decoded bytes of a stream, decompressing when a filter is declared.
pub(crate) fn stream_bytes(stream: &Stream) -> Option<Vec<u8>> {
    if stream.dict.get(b"Filter").is_ok() {
        stream.decompressed_content().ok()
    } else {
        Some(stream.content.clone())
    }
}

/// Concatenated content streams of a page, decoded.
///
/// `/Contents` may be a single stream or an array of streams; both may sit
/// behind references. Unreadable streams contribute nothing.
pub(crate) fn page_content(doc: &Document, page_id: ObjectId) -> Vec<u8> {
    let Some(contents) = doc
        .get_dictionary(page_id)
        .ok()
        .and_then(|page| get_resolved(doc, page, b"Contents"))
    else {
        return Vec::new();
    };

    let parts: Vec<&Object> = match contents {
        Object::Array(items) => items.iter().filter_map(|o| resolve(doc, o)).collect(),
        other => vec![other],
    };

    let mut content = Vec::new();
    for part in parts {
        if let Object::Stream(stream) = part {
            if let Some(bytes) = stream_bytes(stream) {
                content.extend_from_slice(&bytes);
                content.push(b'\n');
            }
        }
    }
    content
}

/// Copy inherited attributes onto the page dictionary itself.
///
/// Needed before a page is re-parented, since its new ancestors will not
/// carry the attributes it used to inherit.
pub(crate) fn materialize_inherited(doc: &mut Document, page_id: ObjectId) {
    let inherited: Vec<(&[u8], Object)> = INHERITABLE_KEYS
        .iter()
        .filter_map(|key| {
            let own = doc
                .get_dictionary(page_id)
                .map(|d| d.has(key))
                .unwrap_or(false);
            if own {
                return None;
            }
            inherited_attribute(doc, page_id, key).map(|value| (*key, value.clone()))
        })
        .collect();

    if let Ok(page) = doc.get_dictionary_mut(page_id) {
        for (key, value) in inherited {
            page.set(key.to_vec(), value);
        }
    }
}
