pub mod document;
pub mod geometry;
pub mod lifecycle;
pub mod placement;

pub use document::{sha256_hex, Document, DocumentDraft, SignatureRecord};
pub use geometry::{to_capture_space, to_page_space, CaptureRect, PageRect};
pub use lifecycle::{effective_status, gate, DocumentStatus, Gate};
pub use placement::{Placement, MIN_SIGNATURE_HEIGHT, MIN_SIGNATURE_WIDTH};
