//! PDF side of signing: page lookup, signature decoding and compositing.

pub mod overlay;
pub mod pages;
pub mod signature_image;

pub use overlay::embed;
pub use pages::{page_count, page_dimensions, PageSize};
pub use signature_image::{decode_signature, RasterImage};
