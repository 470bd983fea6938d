use crate::domain::lifecycle::DocumentStatus;
use crate::domain::placement::Placement;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of `content`.
pub fn sha256_hex(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// Fields the administrator supplies when issuing a signing link.
#[derive(Debug, Clone)]
pub struct DocumentDraft {
    pub title: String,
    pub file_name: String,
    pub placement: Placement,
    pub recipient_name: Option<String>,
    pub recipient_email: Option<String>,
    pub admin_id: String,
}

/// Populated together, and only, on the transition to `SIGNED`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureRecord {
    pub signed_at: DateTime<Utc>,
    pub signer_ip: String,
    pub signed_content_ref: String,
    pub signed_content_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub token: String,
    pub title: String,
    pub file_name: String,
    pub original_ref: String,
    pub original_hash: String,
    pub page_count: u32,
    pub placement: Placement,
    pub recipient_name: Option<String>,
    pub recipient_email: Option<String>,
    pub admin_id: String,
    pub status: DocumentStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub signature: Option<SignatureRecord>,
}

impl Document {
    /// Builds a fresh `PENDING` document. `original_ref` is left empty until
    /// the content store has accepted the bytes.
    pub fn new(
        draft: DocumentDraft,
        content: &[u8],
        page_count: u32,
        ttl_days: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            token: uuid::Uuid::new_v4().to_string(),
            title: draft.title,
            file_name: draft.file_name,
            original_ref: String::new(),
            original_hash: sha256_hex(content),
            page_count,
            placement: draft.placement,
            recipient_name: draft.recipient_name,
            recipient_email: draft.recipient_email,
            admin_id: draft.admin_id,
            status: DocumentStatus::Pending,
            created_at: now,
            expires_at: now + Duration::days(i64::from(ttl_days)),
            signature: None,
        }
    }

    /// Where the signed output lives, once the document is `SIGNED`.
    pub fn signed_content_ref(&self) -> Option<&str> {
        match (self.status, &self.signature) {
            (DocumentStatus::Signed, Some(signature)) => Some(&signature.signed_content_ref),
            _ => None,
        }
    }
}
