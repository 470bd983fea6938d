use crate::application::lifecycle::LifecycleService;
use crate::config::EngineConfig;
use crate::domain::{sha256_hex, Document};
use crate::error::{Result, SigningError};
use crate::infrastructure::storage::ContentStore;
use crate::pdf;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

/// Load, validate, embed, persist, then commit. The status only changes once
/// the signed bytes are safely stored; any earlier failure leaves the
/// document `PENDING`.
pub struct SignDocumentUseCase {
    lifecycle: LifecycleService,
    store: Arc<dyn ContentStore>,
    config: EngineConfig,
}

impl SignDocumentUseCase {
    pub fn new(lifecycle: LifecycleService, store: Arc<dyn ContentStore>, config: EngineConfig) -> Self {
        Self {
            lifecycle,
            store,
            config,
        }
    }

    pub fn execute(
        &self,
        token: &str,
        signature_png: &[u8],
        signer_ip: &str,
        now: DateTime<Utc>,
    ) -> Result<Document> {
        if signature_png.len() > self.config.max_signature_bytes {
            return Err(SigningError::PayloadTooLarge {
                size: signature_png.len(),
                limit: self.config.max_signature_bytes,
            });
        }

        let document = self.lifecycle.resolve_for_signing(token, now)?;
        let original = self.store.read(&document.original_ref)?;
        let signed = pdf::embed(&original, signature_png, &document.placement, now)?;
        let signed_hash = sha256_hex(&signed);
        let signed_ref = self.store.put_signed(&document.id, &signed)?;
        debug!(token = %token, content_ref = %signed_ref, "signed content stored");

        match self
            .lifecycle
            .commit_signature(token, &signed_ref, &signed_hash, signer_ip, now)
        {
            Ok(document) => Ok(document),
            Err(e) => {
                // The losing side of a race must not leave its output behind.
                if let Err(cleanup) = self.store.remove(&signed_ref) {
                    warn!(content_ref = %signed_ref, error = %cleanup, "failed to remove uncommitted signed content");
                }
                Err(e)
            }
        }
    }
}
