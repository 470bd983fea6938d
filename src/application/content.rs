use crate::application::lifecycle::LifecycleService;
use crate::domain::Document;
use crate::error::{Result, SigningError};
use crate::infrastructure::database::DocumentRepository;
use crate::infrastructure::storage::ContentStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

/// Hands out stored PDF bytes: the original to a signer holding a live link,
/// the signed output to the administrator who issued it.
pub struct DocumentContentUseCase {
    lifecycle: LifecycleService,
    repository: Arc<dyn DocumentRepository>,
    store: Arc<dyn ContentStore>,
}

impl DocumentContentUseCase {
    pub fn new(
        lifecycle: LifecycleService,
        repository: Arc<dyn DocumentRepository>,
        store: Arc<dyn ContentStore>,
    ) -> Self {
        Self {
            lifecycle,
            repository,
            store,
        }
    }

    /// Same access guards as viewing the link.
    pub fn original_for_signer(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<(Document, Vec<u8>)> {
        let document = self.lifecycle.resolve_for_viewing(token, now)?;
        let bytes = self.store.read(&document.original_ref)?;
        Ok((document, bytes))
    }

    pub fn signed_for_admin(&self, id: &str, admin_id: &str) -> Result<(Document, Vec<u8>)> {
        let document = self.repository.find_by_id(id)?;
        if document.admin_id != admin_id {
            return Err(SigningError::NotFound);
        }
        let bytes = match document.signed_content_ref() {
            Some(content_ref) => self.store.read(content_ref)?,
            None => return Err(SigningError::NotSigned),
        };
        debug!(document_id = %id, admin_id = %admin_id, bytes = bytes.len(), "signed content served");
        Ok((document, bytes))
    }
}
