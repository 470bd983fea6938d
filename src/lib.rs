pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod infrastructure;
pub mod pdf;

// Re-export commonly used types
pub use application::{
    CreateDocumentUseCase, DocumentContentUseCase, LifecycleService, NewDocument,
    SignDocumentUseCase,
};
pub use config::{EngineConfig, ServiceConfig};
pub use domain::{Document, DocumentStatus, Placement};
pub use error::SigningError;
pub use infrastructure::{ContentStore, DocumentRepository, FsContentStore, SqliteRepository};
