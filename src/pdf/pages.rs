use crate::error::{Result, SigningError};
use lopdf::{Dictionary, Document, Object, ObjectId};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

/// Parses `bytes` as a PDF with at least one page.
pub fn load(bytes: &[u8]) -> Result<Document> {
    let doc = Document::load_mem(bytes)
        .map_err(|e| SigningError::CorruptSource(e.to_string()))?;
    if doc.get_pages().is_empty() {
        return Err(SigningError::CorruptSource("document has no pages".into()));
    }
    Ok(doc)
}

pub fn page_count(bytes: &[u8]) -> Result<u32> {
    let doc = load(bytes)?;
    Ok(doc.get_pages().len() as u32)
}

pub fn page_dimensions(bytes: &[u8], page_number: u32) -> Result<PageSize> {
    let doc = load(bytes)?;
    let page_id = resolve_page(&doc, page_number)?;
    page_size(&doc, page_id)
}

/// Maps a 1-based page number to its object id.
pub(crate) fn resolve_page(doc: &Document, page_number: u32) -> Result<ObjectId> {
    let pages = doc.get_pages();
    pages
        .get(&page_number)
        .copied()
        .ok_or(SigningError::PageOutOfRange {
            page: page_number,
            page_count: pages.len() as u32,
        })
}

/// MediaBox size of a page, following `Parent` links for inherited boxes.
pub(crate) fn page_size(doc: &Document, page_id: ObjectId) -> Result<PageSize> {
    let mut current = Some(page_id);
    while let Some(id) = current {
        let dict = page_dict(doc, id)?;
        if let Some(size) = media_box(doc, dict) {
            return Ok(size);
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }
    Err(SigningError::CorruptSource(format!(
        "page object {} {} has no MediaBox",
        page_id.0, page_id.1
    )))
}

pub(crate) fn page_dict(doc: &Document, id: ObjectId) -> Result<&Dictionary> {
    doc.get_object(id)
        .and_then(Object::as_dict)
        .map_err(|_| SigningError::CorruptSource(format!("object {} {} is not a dictionary", id.0, id.1)))
}

fn media_box(doc: &Document, dict: &Dictionary) -> Option<PageSize> {
    let raw = dict.get(b"MediaBox").ok()?;
    let resolved = match raw {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    let arr = resolved.as_array().ok()?;
    if arr.len() != 4 {
        return None;
    }
    let llx = obj_to_f64(&arr[0])?;
    let lly = obj_to_f64(&arr[1])?;
    let urx = obj_to_f64(&arr[2])?;
    let ury = obj_to_f64(&arr[3])?;
    Some(PageSize {
        width: (urx - llx).abs(),
        height: (ury - lly).abs(),
    })
}

fn obj_to_f64(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(f) => Some(f64::from(*f)),
        _ => None,
    }
}
