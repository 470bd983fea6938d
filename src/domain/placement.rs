use crate::domain::geometry::CaptureRect;
use crate::error::{Result, SigningError};
use serde::{Deserialize, Serialize};

/// Smallest legible signature footprint, in capture-space units.
pub const MIN_SIGNATURE_WIDTH: f64 = 50.0;
pub const MIN_SIGNATURE_HEIGHT: f64 = 30.0;

/// Where the signature goes, as drawn over the rendered page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// 1-based.
    pub page_number: u32,
    /// Page size the rectangle was captured against.
    pub pdf_width: f64,
    pub pdf_height: f64,
}

impl Placement {
    pub fn rect(&self) -> CaptureRect {
        CaptureRect {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
        }
    }

    /// Checks the creation-time minimums. Page range is checked separately
    /// against the loaded document.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            self.x,
            self.y,
            self.width,
            self.height,
            self.pdf_width,
            self.pdf_height,
        ];
        if fields.iter().any(|v| !v.is_finite()) {
            return Err(SigningError::InvalidPlacement(
                "coordinates must be finite numbers".into(),
            ));
        }
        if self.x < 0.0 || self.y < 0.0 {
            return Err(SigningError::InvalidPlacement(
                "coordinates must not be negative".into(),
            ));
        }
        if self.width < MIN_SIGNATURE_WIDTH || self.height < MIN_SIGNATURE_HEIGHT {
            return Err(SigningError::InvalidPlacement(format!(
                "signature area {}x{} is below the {}x{} minimum",
                self.width, self.height, MIN_SIGNATURE_WIDTH, MIN_SIGNATURE_HEIGHT
            )));
        }
        if self.page_number == 0 {
            return Err(SigningError::InvalidPlacement(
                "page numbers start at 1".into(),
            ));
        }
        Ok(())
    }

    /// True when `(width, height)` differs from the capture-time page size by
    /// more than one unit in either direction.
    pub fn captured_size_differs(&self, width: f64, height: f64) -> bool {
        (self.pdf_width - width).abs() > 1.0 || (self.pdf_height - height).abs() > 1.0
    }
}
