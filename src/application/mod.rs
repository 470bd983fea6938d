mod content;
mod create;
mod lifecycle;
mod sign;
pub mod types;

pub use content::DocumentContentUseCase;
pub use create::{CreateDocumentUseCase, NewDocument};
pub use lifecycle::LifecycleService;
pub use sign::SignDocumentUseCase;
pub use types::{
    decode_base64, decode_signature_payload, AdminDocumentSummary, CreateDocumentRequest,
    CreatedDocument, DocumentView, SignRequest, SignedDocumentView,
};
