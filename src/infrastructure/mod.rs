pub mod database;
pub mod storage;

pub use database::{DatabaseError, DocumentRepository, SqliteRepository};
pub use storage::{sanitize_filename, ContentStore, FsContentStore, StorageError};
