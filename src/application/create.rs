use crate::application::types::CreatedDocument;
use crate::config::{EngineConfig, MAX_TOKEN_TTL_DAYS};
use crate::domain::{Document, DocumentDraft};
use crate::error::{Result, SigningError};
use crate::infrastructure::database::DocumentRepository;
use crate::infrastructure::storage::{sanitize_filename, ContentStore};
use crate::pdf;
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;
use tracing::{info, warn};

const NIL_ADMIN_ID: &str = "00000000-0000-0000-0000-000000000000";
const DEFAULT_FILE_NAME: &str = "document.pdf";

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@ \t\r\n]+@[^@ \t\r\n]+\.[^@ \t\r\n]+$").unwrap();
}

/// Everything needed to register a document, as supplied by an authenticated
/// administrator.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub draft: DocumentDraft,
    pub pdf: Vec<u8>,
    /// Overrides the configured TTL when set.
    pub ttl_days: Option<u32>,
}

pub struct CreateDocumentUseCase {
    repository: Arc<dyn DocumentRepository>,
    store: Arc<dyn ContentStore>,
    config: EngineConfig,
}

impl CreateDocumentUseCase {
    pub fn new(
        repository: Arc<dyn DocumentRepository>,
        store: Arc<dyn ContentStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            repository,
            store,
            config,
        }
    }

    pub fn execute(&self, new: NewDocument, now: DateTime<Utc>) -> Result<CreatedDocument> {
        let NewDocument {
            mut draft,
            pdf,
            ttl_days,
        } = new;

        draft.admin_id = draft.admin_id.trim().to_string();
        if draft.admin_id.is_empty() || draft.admin_id == NIL_ADMIN_ID {
            return Err(SigningError::Unauthorized);
        }

        draft.title = draft.title.trim().to_string();
        if draft.title.is_empty() {
            return Err(SigningError::InvalidRequest("title is required".into()));
        }

        if pdf.is_empty() {
            return Err(SigningError::InvalidRequest("PDF content is required".into()));
        }
        if pdf.len() > self.config.max_pdf_bytes {
            return Err(SigningError::PayloadTooLarge {
                size: pdf.len(),
                limit: self.config.max_pdf_bytes,
            });
        }

        draft.recipient_name = non_blank(draft.recipient_name);
        draft.recipient_email = non_blank(draft.recipient_email);
        if let Some(email) = &draft.recipient_email {
            if !EMAIL_RE.is_match(email) {
                return Err(SigningError::InvalidRequest(format!(
                    "invalid recipient email: {email}"
                )));
            }
        }

        // The configured default is checked at start-up; only overrides here.
        let ttl_days = match ttl_days {
            Some(days) if days == 0 || days > MAX_TOKEN_TTL_DAYS => {
                return Err(SigningError::InvalidRequest(format!(
                    "ttl must be between 1 and {MAX_TOKEN_TTL_DAYS} days"
                )));
            }
            Some(days) => days,
            None => self.config.token_ttl_days,
        };

        draft.placement.validate()?;
        let page_count = pdf::page_count(&pdf)?;
        if draft.placement.page_number > page_count {
            return Err(SigningError::PageOutOfRange {
                page: draft.placement.page_number,
                page_count,
            });
        }

        draft.file_name = match non_blank(Some(draft.file_name)) {
            Some(name) => sanitize_filename(&name),
            None => DEFAULT_FILE_NAME.to_string(),
        };

        let mut document = Document::new(draft, &pdf, page_count, ttl_days, now);
        document.original_ref = self.store.put_original(&document.id, &pdf)?;

        if let Err(e) = self.repository.insert(&document) {
            if let Err(cleanup) = self.store.remove(&document.original_ref) {
                warn!(content_ref = %document.original_ref, error = %cleanup, "failed to remove orphaned original");
            }
            return Err(e.into());
        }

        info!(
            document_id = %document.id,
            token = %document.token,
            admin_id = %document.admin_id,
            pages = page_count,
            expires_at = %document.expires_at,
            "document registered for signing"
        );

        Ok(CreatedDocument {
            signing_link: self.config.signing_link(&document.token),
            id: document.id,
            token: document.token,
            expires_at: document.expires_at,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
