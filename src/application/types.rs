use crate::domain::{Document, DocumentStatus, Placement};
use crate::error::{Result, SigningError};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Request to issue a signing link for a PDF
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDocumentRequest {
    pub title: String,
    #[serde(default)]
    pub file_name: Option<String>,
    /// Base64-encoded PDF
    pub content: String,
    pub placement: Placement,
    #[serde(default)]
    pub recipient_name: Option<String>,
    #[serde(default)]
    pub recipient_email: Option<String>,
    #[serde(default)]
    pub ttl_days: Option<u32>,
}

/// Returned to the administrator once a document is registered
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedDocument {
    pub id: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub signing_link: String,
}

/// Signature captured on the signing page
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SignRequest {
    /// `data:image/png;base64,...` or bare base64 PNG
    pub signature: String,
}

/// What the signing page may show about a pending document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentView {
    pub id: String,
    pub title: String,
    pub file_name: String,
    pub recipient_name: Option<String>,
    pub status: DocumentStatus,
    pub expires_at: DateTime<Utc>,
    pub page_number: u32,
}

impl From<&Document> for DocumentView {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            title: doc.title.clone(),
            file_name: doc.file_name.clone(),
            recipient_name: doc.recipient_name.clone(),
            status: doc.status,
            expires_at: doc.expires_at,
            page_number: doc.placement.page_number,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedDocumentView {
    pub id: String,
    pub title: String,
    pub status: DocumentStatus,
    pub signed_at: Option<DateTime<Utc>>,
}

impl From<&Document> for SignedDocumentView {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            title: doc.title.clone(),
            status: doc.status,
            signed_at: doc.signature.as_ref().map(|s| s.signed_at),
        }
    }
}

/// Row of the administrator's document list
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDocumentSummary {
    pub id: String,
    pub token: String,
    pub title: String,
    pub file_name: String,
    pub recipient_name: Option<String>,
    pub recipient_email: Option<String>,
    /// Status after the lazy expiry check
    pub status: DocumentStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub signed_at: Option<DateTime<Utc>>,
    pub signer_ip: Option<String>,
    pub signed_content_ref: Option<String>,
}

/// Decodes base64 content, mapping failures to `InvalidRequest`.
pub fn decode_base64(field: &str, value: &str) -> Result<Vec<u8>> {
    B64.decode(value.trim().as_bytes())
        .map_err(|e| SigningError::InvalidRequest(format!("{field} is not valid base64: {e}")))
}

/// Accepts a PNG data URL or bare base64. Data URLs of any other media type
/// are rejected before decoding.
pub fn decode_signature_payload(payload: &str) -> Result<Vec<u8>> {
    let payload = payload.trim();
    let encoded = if let Some(rest) = payload.strip_prefix(PNG_DATA_URL_PREFIX) {
        rest
    } else if payload.starts_with("data:") {
        let media = payload
            .split([';', ','])
            .next()
            .unwrap_or(payload)
            .trim_start_matches("data:");
        return Err(SigningError::UnsupportedImageFormat(format!(
            "expected image/png, got {media}"
        )));
    } else {
        payload
    };
    decode_base64("signature", encoded)
}
