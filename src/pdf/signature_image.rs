use crate::error::{Result, SigningError};
use image::ImageFormat;

/// Decoded signature split into the planes a PDF image XObject needs.
#[derive(Debug, Clone)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    /// 8-bit interleaved RGB.
    pub rgb: Vec<u8>,
    /// 8-bit gray soft mask; `None` when every pixel is opaque.
    pub alpha: Option<Vec<u8>>,
}

/// Accepts PNG bytes only. Anything else, including truncated PNGs, is
/// rejected as a whole.
pub fn decode_signature(bytes: &[u8]) -> Result<RasterImage> {
    if bytes.is_empty() {
        return Err(SigningError::UnsupportedImageFormat("empty image".into()));
    }
    match image::guess_format(bytes) {
        Ok(ImageFormat::Png) => {}
        Ok(other) => {
            return Err(SigningError::UnsupportedImageFormat(format!(
                "expected PNG, got {other:?}"
            )))
        }
        Err(_) => {
            return Err(SigningError::UnsupportedImageFormat(
                "unrecognized image encoding".into(),
            ))
        }
    }

    let img = image::load_from_memory_with_format(bytes, ImageFormat::Png)
        .map_err(|e| SigningError::UnsupportedImageFormat(e.to_string()))?
        .to_rgba8();
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(SigningError::UnsupportedImageFormat("image has no pixels".into()));
    }

    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    let mut alpha = Vec::with_capacity((width * height) as usize);
    for pixel in img.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel.0[3]);
    }
    let alpha = if alpha.iter().all(|a| *a == u8::MAX) {
        None
    } else {
        Some(alpha)
    };

    Ok(RasterImage {
        width,
        height,
        rgb,
        alpha,
    })
}
