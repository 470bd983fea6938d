use crate::domain::{to_page_space, PageRect, Placement};
use crate::error::{Result, SigningError};
use crate::pdf::pages::{self, PageSize};
use crate::pdf::signature_image::{decode_signature, RasterImage};
use chrono::{DateTime, Utc};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, warn};

pub const CAPTION_FONT_SIZE: f64 = 8.0;
/// Distance from the bottom edge of the signature to the caption baseline.
pub const CAPTION_OFFSET: f64 = 15.0;
const CAPTION_GRAY: f64 = 0.5;

const IMAGE_RESOURCE: &str = "SigImg";
const FONT_RESOURCE: &str = "SigCaption";

/// Draws `signature_png` into the placement rectangle on the target page and
/// returns the serialized result. The input slice is only read.
pub fn embed(
    original_pdf: &[u8],
    signature_png: &[u8],
    placement: &Placement,
    signed_at: DateTime<Utc>,
) -> Result<Vec<u8>> {
    let mut doc = pages::load(original_pdf)?;
    let page_id = pages::resolve_page(&doc, placement.page_number)?;
    let image = decode_signature(signature_png)?;

    // The page's own height wins over the one recorded at capture time.
    let size = pages::page_size(&doc, page_id)?;
    if placement.captured_size_differs(size.width, size.height) {
        warn!(
            page = placement.page_number,
            captured_width = placement.pdf_width,
            captured_height = placement.pdf_height,
            actual_width = size.width,
            actual_height = size.height,
            "page size differs from capture-time size"
        );
    }
    let rect = to_page_space(placement.rect(), size.height)?;

    let image_id = add_image(&mut doc, &image)?;
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });

    let mut resources = page_resources(&doc, page_id)?;
    let image_name = register(&doc, &mut resources, b"XObject", IMAGE_RESOURCE, image_id)?;
    let font_name = register(&doc, &mut resources, b"Font", FONT_RESOURCE, font_id)?;
    page_dict_mut(&mut doc, page_id)?.set("Resources", resources);

    let caption = format!("Digitally Signed: {}", signed_at.format("%Y-%m-%d"));
    let content = overlay_content(&rect, size, &image_name, &font_name, &caption)?;
    append_isolated_contents(&mut doc, page_id, content)?;

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| SigningError::CorruptSource(format!("failed to serialize output: {e}")))?;
    debug!(
        page = placement.page_number,
        x = rect.x,
        y = rect.y,
        bytes = out.len(),
        "signature embedded"
    );
    Ok(out)
}

fn real(value: f64) -> Object {
    Object::Real(value as _)
}

fn add_image(doc: &mut Document, image: &RasterImage) -> Result<ObjectId> {
    let mut image_dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => i64::from(image.width),
        "Height" => i64::from(image.height),
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
    };

    if let Some(alpha) = &image.alpha {
        let mut smask = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(image.width),
                "Height" => i64::from(image.height),
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            alpha.clone(),
        );
        smask.compress().map_err(compression_error)?;
        let smask_id = doc.add_object(smask);
        image_dict.set("SMask", smask_id);
    }

    let mut stream = Stream::new(image_dict, image.rgb.clone());
    stream.compress().map_err(compression_error)?;
    Ok(doc.add_object(stream))
}

fn compression_error(err: lopdf::Error) -> SigningError {
    SigningError::Internal(format!("failed to compress signature image: {err}"))
}

/// Owned copy of the resources that apply to a page, resolving references and
/// inheritance so edits never leak into pages that share the dictionary.
fn page_resources(doc: &Document, page_id: ObjectId) -> Result<Dictionary> {
    let mut current = Some(page_id);
    while let Some(id) = current {
        let dict = pages::page_dict(doc, id)?;
        if let Ok(resources) = dict.get(b"Resources") {
            return resolve_dict(doc, resources);
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }
    Ok(Dictionary::new())
}

fn resolve_dict(doc: &Document, obj: &Object) -> Result<Dictionary> {
    match obj {
        Object::Dictionary(dict) => Ok(dict.clone()),
        Object::Reference(id) => doc
            .get_object(*id)
            .and_then(Object::as_dict)
            .cloned()
            .map_err(|_| SigningError::CorruptSource("dangling resource reference".into())),
        _ => Err(SigningError::CorruptSource(
            "resources entry is not a dictionary".into(),
        )),
    }
}

/// Adds `id` to the `category` sub-dictionary under a name not already in use.
fn register(
    doc: &Document,
    resources: &mut Dictionary,
    category: &[u8],
    base: &str,
    id: ObjectId,
) -> Result<String> {
    let mut entries = match resources.get(category) {
        Ok(obj) => resolve_dict(doc, obj)?,
        Err(_) => Dictionary::new(),
    };

    let mut name = base.to_string();
    let mut suffix = 1;
    while entries.has(name.as_bytes()) {
        name = format!("{base}{suffix}");
        suffix += 1;
    }
    entries.set(name.as_bytes(), id);
    resources.set(category, entries);
    Ok(name)
}

fn page_dict_mut(doc: &mut Document, page_id: ObjectId) -> Result<&mut Dictionary> {
    doc.get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|_| SigningError::CorruptSource("page object is not a dictionary".into()))
}

fn overlay_content(
    rect: &PageRect,
    page: PageSize,
    image_name: &str,
    font_name: &str,
    caption: &str,
) -> Result<Vec<u8>> {
    let caption_y = (rect.y - CAPTION_OFFSET).clamp(0.0, page.height);
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    real(rect.width),
                    Object::Integer(0),
                    Object::Integer(0),
                    real(rect.height),
                    real(rect.x),
                    real(rect.y),
                ],
            ),
            Operation::new("Do", vec![Object::Name(image_name.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
            Operation::new("q", vec![]),
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![
                    Object::Name(font_name.as_bytes().to_vec()),
                    real(CAPTION_FONT_SIZE),
                ],
            ),
            Operation::new(
                "rg",
                vec![real(CAPTION_GRAY), real(CAPTION_GRAY), real(CAPTION_GRAY)],
            ),
            Operation::new("Td", vec![real(rect.x), real(caption_y)]),
            Operation::new("Tj", vec![Object::string_literal(caption)]),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
        ],
    };
    content
        .encode()
        .map_err(|e| SigningError::CorruptSource(format!("failed to encode overlay: {e}")))
}

/// Brackets the existing content in `q`/`Q` so any state it leaves behind
/// cannot shift the overlay, then appends the overlay stream.
fn append_isolated_contents(doc: &mut Document, page_id: ObjectId, content: Vec<u8>) -> Result<()> {
    let mut streams = match pages::page_dict(doc, page_id)?.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            Ok(Object::Stream(_)) => vec![Object::Reference(*id)],
            _ => {
                return Err(SigningError::CorruptSource(
                    "page contents reference is invalid".into(),
                ))
            }
        },
        Ok(Object::Array(items)) => items.clone(),
        Ok(_) => {
            return Err(SigningError::CorruptSource(
                "page contents entry is invalid".into(),
            ))
        }
        Err(_) => Vec::new(),
    };

    let open_id = doc.add_object(Stream::new(dictionary! {}, b"q\n".to_vec()));
    // Leading newline keeps `Q` a separate token when the last original
    // stream has no trailing whitespace.
    let mut overlay = b"\nQ\n".to_vec();
    overlay.extend_from_slice(&content);
    let overlay_id = doc.add_object(Stream::new(dictionary! {}, overlay));

    streams.insert(0, Object::Reference(open_id));
    streams.push(Object::Reference(overlay_id));
    page_dict_mut(doc, page_id)?.set("Contents", streams);
    Ok(())
}
