use crate::error::SigningError;
use lazy_static::lazy_static;
use regex::Regex;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

const ORIGINALS_DIR: &str = "pdfs";
const SIGNED_DIR: &str = "signed";
const MAX_FILENAME_LEN: usize = 255;

lazy_static! {
    static ref UNSAFE_CHARS: Regex = Regex::new(r"[^a-zA-Z0-9.-]").unwrap();
    static ref UNDERSCORE_RUNS: Regex = Regex::new(r"_{2,}").unwrap();
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Content reference escapes the storage root: {0}")]
    InvalidRef(String),
}

impl From<StorageError> for SigningError {
    fn from(err: StorageError) -> Self {
        SigningError::Storage(err.to_string())
    }
}

/// Byte storage for original and signed PDFs. The engine only ever sees the
/// opaque refs this hands back.
pub trait ContentStore: Send + Sync {
    fn put_original(&self, document_id: &str, bytes: &[u8]) -> Result<String, StorageError>;
    fn put_signed(&self, document_id: &str, bytes: &[u8]) -> Result<String, StorageError>;
    fn read(&self, content_ref: &str) -> Result<Vec<u8>, StorageError>;
    fn remove(&self, content_ref: &str) -> Result<(), StorageError>;
}

/// Keeps only `[A-Za-z0-9.-]`, collapses underscore runs, caps the length.
pub fn sanitize_filename(name: &str) -> String {
    let replaced = UNSAFE_CHARS.replace_all(name, "_");
    let collapsed = UNDERSCORE_RUNS.replace_all(&replaced, "_");
    collapsed.chars().take(MAX_FILENAME_LEN).collect()
}

/// Stores content as files under `root/pdfs` and `root/signed`.
pub struct FsContentStore {
    root: PathBuf,
}

impl FsContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(root.join(ORIGINALS_DIR))?;
        fs::create_dir_all(root.join(SIGNED_DIR))?;
        Ok(Self { root })
    }

    fn write(&self, dir: &str, file_name: String, bytes: &[u8]) -> Result<String, StorageError> {
        let content_ref = format!("{dir}/{file_name}");
        let final_path = self.root.join(&content_ref);
        // Write then rename so a reader never sees a half-written file.
        let tmp_path = self.root.join(format!("{dir}/.{file_name}.tmp"));
        fs::write(&tmp_path, bytes)?;
        fs::rename(&tmp_path, &final_path)?;
        Ok(content_ref)
    }

    fn resolve(&self, content_ref: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(content_ref);
        let safe = !content_ref.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(StorageError::InvalidRef(content_ref.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

fn unique_suffix() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let nonce = uuid::Uuid::new_v4().simple().to_string();
    format!("{millis}-{}", &nonce[..8])
}

impl ContentStore for FsContentStore {
    fn put_original(&self, document_id: &str, bytes: &[u8]) -> Result<String, StorageError> {
        let name = sanitize_filename(&format!("{document_id}-{}.pdf", unique_suffix()));
        self.write(ORIGINALS_DIR, name, bytes)
    }

    fn put_signed(&self, document_id: &str, bytes: &[u8]) -> Result<String, StorageError> {
        let name = sanitize_filename(&format!("signed-{document_id}-{}.pdf", unique_suffix()));
        self.write(SIGNED_DIR, name, bytes)
    }

    fn read(&self, content_ref: &str) -> Result<Vec<u8>, StorageError> {
        Ok(fs::read(self.resolve(content_ref)?)?)
    }

    fn remove(&self, content_ref: &str) -> Result<(), StorageError> {
        fs::remove_file(self.resolve(content_ref)?)?;
        Ok(())
    }
}
