use crate::application::types::AdminDocumentSummary;
use crate::domain::{effective_status, gate, Document, DocumentStatus, Gate, SignatureRecord};
use crate::error::{Result, SigningError};
use crate::infrastructure::database::DocumentRepository;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

/// Owns every status change a document goes through after creation.
///
/// Expiry is discovered on access: the first read past `expires_at` records
/// `EXPIRED` and fails, later reads fail on the stored status. All writes go
/// through status-guarded updates so concurrent callers on one token cannot
/// both commit.
#[derive(Clone)]
pub struct LifecycleService {
    repository: Arc<dyn DocumentRepository>,
}

impl LifecycleService {
    pub fn new(repository: Arc<dyn DocumentRepository>) -> Self {
        Self { repository }
    }

    pub fn resolve_for_viewing(&self, token: &str, now: DateTime<Utc>) -> Result<Document> {
        self.resolve(token, now)
    }

    /// Same guards as viewing, evaluated again at submit time.
    pub fn resolve_for_signing(&self, token: &str, now: DateTime<Utc>) -> Result<Document> {
        self.resolve(token, now)
    }

    fn resolve(&self, token: &str, now: DateTime<Utc>) -> Result<Document> {
        let doc = self.repository.find_by_token(token)?;
        match gate(doc.status, doc.expires_at, now)? {
            Gate::Open => Ok(doc),
            Gate::ExpireNow => {
                self.expire(&doc)?;
                Err(SigningError::Expired)
            }
        }
    }

    /// Records `PENDING -> EXPIRED`. If another request changed the status
    /// first, its outcome is reported instead.
    fn expire(&self, doc: &Document) -> Result<()> {
        let moved = self.repository.transition_status(
            &doc.token,
            DocumentStatus::Pending,
            DocumentStatus::Expired,
        )?;
        if moved {
            info!(token = %doc.token, expires_at = %doc.expires_at, "document expired on access");
            return Ok(());
        }
        let current = self.repository.find_by_token(&doc.token)?;
        match current.status.blocking_error() {
            Some(SigningError::Expired) | None => Ok(()),
            Some(other) => Err(other),
        }
    }

    /// `PENDING -> SIGNED`. At most one caller per token succeeds; the others
    /// get `InvalidState`.
    pub fn commit_signature(
        &self,
        token: &str,
        signed_content_ref: &str,
        signed_content_hash: &str,
        signer_ip: &str,
        now: DateTime<Utc>,
    ) -> Result<Document> {
        let record = SignatureRecord {
            signed_at: now,
            signer_ip: signer_ip.to_string(),
            signed_content_ref: signed_content_ref.to_string(),
            signed_content_hash: signed_content_hash.to_string(),
        };

        if self.repository.commit_signature(token, &record)? {
            info!(token = %token, signer_ip = %signer_ip, "document signed");
            return Ok(self.repository.find_by_token(token)?);
        }

        let current = self.repository.find_by_token(token)?;
        warn!(token = %token, status = %current.status, "signature commit lost: document no longer pending");
        Err(SigningError::InvalidState)
    }

    /// Administrative `PENDING -> CANCELLED`.
    pub fn cancel(&self, token: &str, admin_id: &str, now: DateTime<Utc>) -> Result<Document> {
        let owner = self.repository.find_by_token(token)?.admin_id;
        if owner != admin_id {
            // Other administrators' documents are invisible, not forbidden.
            return Err(SigningError::NotFound);
        }
        self.resolve(token, now)?;
        if !self.repository.transition_status(
            token,
            DocumentStatus::Pending,
            DocumentStatus::Cancelled,
        )? {
            let current = self.repository.find_by_token(token)?;
            return Err(current
                .status
                .blocking_error()
                .unwrap_or(SigningError::InvalidState));
        }
        info!(token = %token, admin_id = %admin_id, "document cancelled");
        Ok(self.repository.find_by_token(token)?)
    }

    /// Documents issued by `admin_id`, newest first. Expiry is reflected in
    /// the returned status but not written back.
    pub fn list_for_admin(
        &self,
        admin_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<AdminDocumentSummary>> {
        let docs = self.repository.list_by_admin(admin_id)?;
        Ok(docs
            .into_iter()
            .map(|doc| AdminDocumentSummary {
                status: effective_status(doc.status, doc.expires_at, now),
                signed_at: doc.signature.as_ref().map(|s| s.signed_at),
                signer_ip: doc.signature.as_ref().map(|s| s.signer_ip.clone()),
                signed_content_ref: doc.signature.map(|s| s.signed_content_ref),
                id: doc.id,
                token: doc.token,
                title: doc.title,
                file_name: doc.file_name,
                recipient_name: doc.recipient_name,
                recipient_email: doc.recipient_email,
                created_at: doc.created_at,
                expires_at: doc.expires_at,
            })
            .collect())
    }
}
