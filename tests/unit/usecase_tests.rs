use chrono::Duration;
use signlink::domain::{sha256_hex, DocumentStatus};
use signlink::infrastructure::{ContentStore, DocumentRepository, FsContentStore, StorageError};
use signlink::{CreateDocumentUseCase, EngineConfig, SignDocumentUseCase};
use std::io;
use std::sync::Arc;
use signlink::pdf::page_count;
use signlink::SigningError;

use super::fixtures::{
    fixed_now, new_document, placement, signature_png, three_page_pdf, Engine, ADMIN_ID,
};

#[cfg(test)]
mod create_document_tests {
    use super::*;

    #[test]
    fn test_create_returns_signing_link() {
        let engine = Engine::new();
        let created = engine
            .create
            .execute(
                new_document(three_page_pdf(), placement(100.0, 700.0, 200.0, 60.0, 2)),
                fixed_now(),
            )
            .unwrap();

        assert_eq!(created.signing_link, engine.config.signing_link(&created.token));
        assert!(created.signing_link.ends_with(&format!("/sign/{}", created.token)));
        assert_eq!(created.expires_at, fixed_now() + Duration::days(30));

        let stored = engine.repository.find_by_token(&created.token).unwrap();
        assert_eq!(stored.id, created.id);
        assert_eq!(stored.page_count, 3);
        assert_eq!(stored.file_name, "consulting_agreement.pdf");
        assert_eq!(engine.store.read(&stored.original_ref).unwrap(), three_page_pdf());
        assert_eq!(stored.original_hash, sha256_hex(&three_page_pdf()));
    }

    #[test]
    fn test_recipient_email_is_validated_and_stored() {
        let engine = Engine::new();
        for _ in 0..2 {
            let created = engine
                .create
                .execute(
                    new_document(three_page_pdf(), placement(100.0, 700.0, 200.0, 60.0, 1)),
                    fixed_now(),
                )
                .unwrap();
            let stored = engine.repository.find_by_token(&created.token).unwrap();
            assert_eq!(stored.recipient_email.as_deref(), Some("jo@example.com"));
        }

        let mut spaced = new_document(three_page_pdf(), placement(100.0, 700.0, 200.0, 60.0, 1));
        spaced.draft.recipient_email = Some("jo rivera@example.com".to_string());
        assert!(matches!(
            engine.create.execute(spaced, fixed_now()),
            Err(SigningError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_configured_ttl_is_applied() {
        let engine = Engine::new();
        let config = EngineConfig {
            token_ttl_days: 90,
            ..engine.config.clone()
        };
        let create = CreateDocumentUseCase::new(engine.repository.clone(), engine.store.clone(), config);

        let created = create
            .execute(
                new_document(three_page_pdf(), placement(100.0, 700.0, 200.0, 60.0, 1)),
                fixed_now(),
            )
            .unwrap();
        assert_eq!(created.expires_at, fixed_now() + Duration::days(90));

        let mut too_long = new_document(three_page_pdf(), placement(100.0, 700.0, 200.0, 60.0, 1));
        too_long.ttl_days = Some(400);
        assert!(matches!(
            create.execute(too_long, fixed_now()),
            Err(SigningError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_ttl_override() {
        let engine = Engine::new();
        let mut new = new_document(three_page_pdf(), placement(100.0, 700.0, 200.0, 60.0, 1));
        new.ttl_days = Some(7);
        let created = engine.create.execute(new, fixed_now()).unwrap();
        assert_eq!(created.expires_at, fixed_now() + Duration::days(7));

        let mut zero = new_document(three_page_pdf(), placement(100.0, 700.0, 200.0, 60.0, 1));
        zero.ttl_days = Some(0);
        assert!(matches!(
            engine.create.execute(zero, fixed_now()),
            Err(SigningError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_rejects_undersized_placement() {
        let engine = Engine::new();
        let result = engine.create.execute(
            new_document(three_page_pdf(), placement(100.0, 700.0, 40.0, 30.0, 1)),
            fixed_now(),
        );
        assert!(matches!(result, Err(SigningError::InvalidPlacement(_))));
        assert_eq!(engine.repository.count_documents().unwrap(), 0);
    }

    #[test]
    fn test_rejects_page_past_end() {
        let engine = Engine::new();
        let result = engine.create.execute(
            new_document(three_page_pdf(), placement(100.0, 700.0, 200.0, 60.0, 4)),
            fixed_now(),
        );
        assert!(matches!(
            result,
            Err(SigningError::PageOutOfRange {
                page: 4,
                page_count: 3
            })
        ));
    }

    #[test]
    fn test_rejects_bad_email_and_blank_title() {
        let engine = Engine::new();

        let mut bad_email = new_document(three_page_pdf(), placement(100.0, 700.0, 200.0, 60.0, 1));
        bad_email.draft.recipient_email = Some("not-an-address".to_string());
        assert!(matches!(
            engine.create.execute(bad_email, fixed_now()),
            Err(SigningError::InvalidRequest(_))
        ));

        let mut blank_title = new_document(three_page_pdf(), placement(100.0, 700.0, 200.0, 60.0, 1));
        blank_title.draft.title = "   ".to_string();
        assert!(matches!(
            engine.create.execute(blank_title, fixed_now()),
            Err(SigningError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_requires_admin_identity() {
        let engine = Engine::new();
        for admin_id in ["", "  ", "00000000-0000-0000-0000-000000000000"] {
            let mut new = new_document(three_page_pdf(), placement(100.0, 700.0, 200.0, 60.0, 1));
            new.draft.admin_id = admin_id.to_string();
            assert!(matches!(
                engine.create.execute(new, fixed_now()),
                Err(SigningError::Unauthorized)
            ));
        }
    }

    #[test]
    fn test_rejects_corrupt_pdf() {
        let engine = Engine::new();
        let result = engine.create.execute(
            new_document(b"%PDF-1.4 garbage".to_vec(), placement(100.0, 700.0, 200.0, 60.0, 1)),
            fixed_now(),
        );
        assert!(matches!(result, Err(SigningError::CorruptSource(_))));
    }
}

#[cfg(test)]
mod sign_document_tests {
    use super::*;

    #[test]
    fn test_sign_end_to_end() {
        let engine = Engine::new();
        let token = engine.issue(placement(100.0, 700.0, 200.0, 60.0, 1));
        let signed_at = fixed_now() + Duration::hours(2);

        let doc = engine
            .sign
            .execute(&token, &signature_png(), "203.0.113.7", signed_at)
            .unwrap();
        assert_eq!(doc.status, DocumentStatus::Signed);

        let signature = doc.signature.unwrap();
        assert_eq!(signature.signer_ip, "203.0.113.7");
        assert_eq!(signature.signed_at, signed_at);

        let bytes = engine.store.read(&signature.signed_content_ref).unwrap();
        assert_eq!(sha256_hex(&bytes), signature.signed_content_hash);
        assert_eq!(page_count(&bytes).unwrap(), 3);
        assert_eq!(engine.signed_files(), 1);

        // The original stays as uploaded.
        assert_eq!(engine.store.read(&doc.original_ref).unwrap(), three_page_pdf());
    }

    #[test]
    fn test_sign_twice_is_already_signed() {
        let engine = Engine::new();
        let token = engine.issue(placement(100.0, 700.0, 200.0, 60.0, 1));
        engine
            .sign
            .execute(&token, &signature_png(), "203.0.113.7", fixed_now())
            .unwrap();

        assert!(matches!(
            engine
                .sign
                .execute(&token, &signature_png(), "203.0.113.8", fixed_now()),
            Err(SigningError::AlreadySigned)
        ));
        assert_eq!(engine.signed_files(), 1);
    }

    #[test]
    fn test_sign_after_cancel() {
        let engine = Engine::new();
        let token = engine.issue(placement(100.0, 700.0, 200.0, 60.0, 1));
        engine
            .lifecycle
            .cancel(&token, ADMIN_ID, fixed_now())
            .unwrap();

        assert!(matches!(
            engine
                .sign
                .execute(&token, &signature_png(), "203.0.113.7", fixed_now()),
            Err(SigningError::Cancelled)
        ));
        assert_eq!(engine.signed_files(), 0);
    }

    #[test]
    fn test_sign_after_deadline() {
        let engine = Engine::new();
        let token = engine.issue(placement(100.0, 700.0, 200.0, 60.0, 1));
        assert!(matches!(
            engine.sign.execute(
                &token,
                &signature_png(),
                "203.0.113.7",
                fixed_now() + Duration::days(31)
            ),
            Err(SigningError::Expired)
        ));
        assert_eq!(
            engine.repository.find_by_token(&token).unwrap().status,
            DocumentStatus::Expired
        );
    }

    #[test]
    fn test_bad_image_leaves_document_pending() {
        let engine = Engine::new();
        let token = engine.issue(placement(100.0, 700.0, 200.0, 60.0, 1));

        assert!(matches!(
            engine
                .sign
                .execute(&token, b"GIF89a....", "203.0.113.7", fixed_now()),
            Err(SigningError::UnsupportedImageFormat(_))
        ));
        assert_eq!(
            engine.repository.find_by_token(&token).unwrap().status,
            DocumentStatus::Pending
        );
        assert_eq!(engine.signed_files(), 0);

        // A later valid attempt still works.
        assert!(engine
            .sign
            .execute(&token, &signature_png(), "203.0.113.7", fixed_now())
            .is_ok());
    }

    /// Stores originals normally but refuses every signed output.
    struct ReadOnlySignedStore(FsContentStore);

    impl ContentStore for ReadOnlySignedStore {
        fn put_original(&self, document_id: &str, bytes: &[u8]) -> Result<String, StorageError> {
            self.0.put_original(document_id, bytes)
        }

        fn put_signed(&self, _document_id: &str, _bytes: &[u8]) -> Result<String, StorageError> {
            Err(StorageError::Io(io::Error::new(io::ErrorKind::Other, "disk full")))
        }

        fn read(&self, content_ref: &str) -> Result<Vec<u8>, StorageError> {
            self.0.read(content_ref)
        }

        fn remove(&self, content_ref: &str) -> Result<(), StorageError> {
            self.0.remove(content_ref)
        }
    }

    #[test]
    fn test_storage_failure_leaves_document_pending() {
        let engine = Engine::new();
        let token = engine.issue(placement(100.0, 700.0, 200.0, 60.0, 1));
        let store = ReadOnlySignedStore(FsContentStore::new(engine.dir.path().join("uploads")).unwrap());
        let sign = SignDocumentUseCase::new(engine.lifecycle.clone(), Arc::new(store), engine.config.clone());

        assert!(matches!(
            sign.execute(&token, &signature_png(), "203.0.113.7", fixed_now()),
            Err(SigningError::Storage(_))
        ));

        let stored = engine.repository.find_by_token(&token).unwrap();
        assert_eq!(stored.status, DocumentStatus::Pending);
        assert!(stored.signature.is_none());
        assert_eq!(engine.signed_files(), 0);
    }

    #[test]
    fn test_oversized_signature_rejected() {
        let mut engine = Engine::new();
        engine.config.max_signature_bytes = 16;
        let sign = SignDocumentUseCase::new(
            engine.lifecycle.clone(),
            engine.store.clone(),
            engine.config.clone(),
        );
        let token = engine.issue(placement(100.0, 700.0, 200.0, 60.0, 1));
        assert!(matches!(
            sign.execute(&token, &signature_png(), "203.0.113.7", fixed_now()),
            Err(SigningError::PayloadTooLarge { limit: 16, .. })
        ));
    }
}
