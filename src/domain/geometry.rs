//! Conversion between capture space (origin top-left, Y down, as drawn over a
//! rendered page) and page space (origin bottom-left, Y up, as PDF content
//! streams expect).

use crate::error::{Result, SigningError};
use serde::{Deserialize, Serialize};

/// Rectangle with its origin at the page's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CaptureRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Rectangle with its origin at the page's bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

fn check_height(page_height: f64) -> Result<()> {
    if page_height.is_finite() && page_height > 0.0 {
        Ok(())
    } else {
        Err(SigningError::InvalidPageGeometry(page_height))
    }
}

/// `page_y = page_height - y - height`; x and size carry over unchanged.
pub fn to_page_space(rect: CaptureRect, page_height: f64) -> Result<PageRect> {
    check_height(page_height)?;
    Ok(PageRect {
        x: rect.x,
        y: page_height - rect.y - rect.height,
        width: rect.width,
        height: rect.height,
    })
}

pub fn to_capture_space(rect: PageRect, page_height: f64) -> Result<CaptureRect> {
    check_height(page_height)?;
    Ok(CaptureRect {
        x: rect.x,
        y: page_height - rect.y - rect.height,
        width: rect.width,
        height: rect.height,
    })
}
