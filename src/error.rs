use thiserror::Error;

/// Every condition a caller of the signing engine can observe.
///
/// Each variant maps to a distinct remedial action, so none of them is
/// folded into a generic failure.
#[derive(Error, Debug)]
pub enum SigningError {
    #[error("Document not found")]
    NotFound,

    #[error("Document has already been signed")]
    AlreadySigned,

    #[error("Document link has expired")]
    Expired,

    #[error("Document has been cancelled")]
    Cancelled,

    #[error("Document is no longer pending; another request changed it first")]
    InvalidState,

    #[error("Document has not been signed yet")]
    NotSigned,

    #[error("Source PDF could not be parsed: {0}")]
    CorruptSource(String),

    #[error("Page {page} is out of range (document has {page_count} pages)")]
    PageOutOfRange { page: u32, page_count: u32 },

    #[error("Unsupported signature image: {0}")]
    UnsupportedImageFormat(String),

    #[error("Invalid page geometry: height {0} must be positive")]
    InvalidPageGeometry(f64),

    #[error("Invalid signature placement: {0}")]
    InvalidPlacement(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Missing administrator identity")]
    Unauthorized,

    #[error("Payload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SigningError {
    /// Stable machine-readable code for transport layers.
    pub fn code(&self) -> &'static str {
        match self {
            SigningError::NotFound => "not_found",
            SigningError::AlreadySigned => "already_signed",
            SigningError::Expired => "expired",
            SigningError::Cancelled => "cancelled",
            SigningError::InvalidState => "invalid_state",
            SigningError::NotSigned => "not_signed",
            SigningError::CorruptSource(_) => "corrupt_source",
            SigningError::PageOutOfRange { .. } => "page_out_of_range",
            SigningError::UnsupportedImageFormat(_) => "unsupported_image_format",
            SigningError::InvalidPageGeometry(_) => "invalid_page_geometry",
            SigningError::InvalidPlacement(_) => "invalid_placement",
            SigningError::InvalidRequest(_) => "invalid_request",
            SigningError::Unauthorized => "unauthorized",
            SigningError::PayloadTooLarge { .. } => "payload_too_large",
            SigningError::Database(_) => "database_error",
            SigningError::Storage(_) => "storage_error",
            SigningError::Internal(_) => "internal_error",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            SigningError::NotFound => 404,
            SigningError::AlreadySigned | SigningError::InvalidState | SigningError::NotSigned => {
                409
            }
            SigningError::Expired | SigningError::Cancelled => 410,
            SigningError::Unauthorized => 401,
            SigningError::PayloadTooLarge { .. } => 413,
            SigningError::CorruptSource(_)
            | SigningError::PageOutOfRange { .. }
            | SigningError::UnsupportedImageFormat(_)
            | SigningError::InvalidPageGeometry(_) => 422,
            SigningError::InvalidPlacement(_) | SigningError::InvalidRequest(_) => 400,
            SigningError::Database(_) | SigningError::Storage(_) | SigningError::Internal(_) => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, SigningError>;
