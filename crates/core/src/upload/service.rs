//! Multipart session coordinator.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, error, info};

use super::error::UploadError;
use super::key::{
    generate_object_key, parse_part_numbers, sort_completed_parts, validate_key,
    validate_part_number, validate_upload_id,
};
use super::types::{CreateSessionInput, SignedPartBatch};
use crate::access::SlotConfig;
use crate::storage::{
    CompletedPart, CompletedUpload, MultipartSigner, SignerError, UploadSession, UploadedPart,
};

/// Turns routed multipart requests into signer calls.
///
/// Holds no session state: every call validates its inputs against the slot
/// and forwards to the signer. Authorization happens before any method here.
#[derive(Clone)]
pub struct UploadCoordinator {
    signer: Arc<dyn MultipartSigner>,
}

impl std::fmt::Debug for UploadCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadCoordinator").finish_non_exhaustive()
    }
}

fn log_backend_failure<T>(result: Result<T, SignerError>, key: &str) -> Result<T, UploadError> {
    result.map_err(|e| {
        error!(key = %key, error = %e, "multipart backend call failed");
        UploadError::from(e)
    })
}

impl UploadCoordinator {
    /// Create a coordinator over a signer.
    #[must_use]
    pub fn new(signer: Arc<dyn MultipartSigner>) -> Self {
        Self { signer }
    }

    /// Start a multipart upload into `slot`.
    ///
    /// # Errors
    ///
    /// `Validation` for a missing file name or an upload the slot restricts;
    /// `Backend` if storage refuses the session.
    pub async fn create_session(
        &self,
        slot: &SlotConfig,
        input: &CreateSessionInput,
    ) -> Result<UploadSession, UploadError> {
        if input.filename.trim().is_empty() {
            return Err(UploadError::validation("filename is required"));
        }
        let content_type = input.effective_content_type();
        if !slot.accepts_mime_type(content_type) {
            return Err(UploadError::validation(format!(
                "content type '{content_type}' is not allowed for field '{}'",
                slot.name
            )));
        }
        if let (Some(max), Some(size)) = (slot.max_file_size, input.size)
            && size > max
        {
            return Err(UploadError::validation(format!(
                "file size {size} exceeds maximum {max} bytes"
            )));
        }

        let key = generate_object_key(&input.filename, slot);
        let session = log_backend_failure(
            self.signer
                .create_multipart_upload(&key, content_type, &input.metadata)
                .await,
            &key,
        )?;

        info!(
            key = %session.key,
            upload_id = %session.upload_id,
            slot = %slot.name,
            "multipart session created"
        );
        Ok(session)
    }

    /// Presign one part URL.
    ///
    /// # Errors
    ///
    /// `Validation` for a key outside the slot or a bad part number.
    pub async fn sign_part(
        &self,
        slot: &SlotConfig,
        key: &str,
        upload_id: &str,
        part_number: u32,
    ) -> Result<String, UploadError> {
        validate_key(key, slot)?;
        validate_upload_id(upload_id)?;
        validate_part_number(part_number)?;

        let presigned = log_backend_failure(
            self.signer.sign_upload_part(key, upload_id, part_number).await,
            key,
        )?;
        debug!(key = %key, upload_id = %upload_id, part_number, "part signed");
        Ok(presigned.url)
    }

    /// Presign several parts from a comma-separated list.
    ///
    /// The map is only returned once every URL is signed.
    ///
    /// # Errors
    ///
    /// `Validation` for a malformed list; the first backend failure otherwise.
    pub async fn sign_parts_batch(
        &self,
        slot: &SlotConfig,
        key: &str,
        upload_id: &str,
        part_numbers: &str,
    ) -> Result<SignedPartBatch, UploadError> {
        validate_key(key, slot)?;
        validate_upload_id(upload_id)?;
        let numbers = parse_part_numbers(part_numbers)?;

        let mut presigned_urls = BTreeMap::new();
        for part_number in numbers {
            let presigned = log_backend_failure(
                self.signer.sign_upload_part(key, upload_id, part_number).await,
                key,
            )?;
            presigned_urls.insert(part_number.to_string(), presigned.url);
        }

        info!(key = %key, upload_id = %upload_id, count = presigned_urls.len(), "part batch signed");
        Ok(SignedPartBatch { presigned_urls })
    }

    /// Parts already received by storage.
    ///
    /// # Errors
    ///
    /// `Validation` for a key outside the slot; `Backend` otherwise.
    pub async fn list_parts(
        &self,
        slot: &SlotConfig,
        key: &str,
        upload_id: &str,
    ) -> Result<Vec<UploadedPart>, UploadError> {
        validate_key(key, slot)?;
        validate_upload_id(upload_id)?;
        log_backend_failure(self.signer.list_parts(key, upload_id).await, key)
    }

    /// Combine uploaded parts into the final object.
    ///
    /// Parts may arrive in any order; storage receives them sorted.
    ///
    /// # Errors
    ///
    /// `Validation` for empty, duplicate, or malformed parts.
    pub async fn complete(
        &self,
        slot: &SlotConfig,
        key: &str,
        upload_id: &str,
        parts: Vec<CompletedPart>,
    ) -> Result<CompletedUpload, UploadError> {
        validate_key(key, slot)?;
        validate_upload_id(upload_id)?;
        let parts = sort_completed_parts(parts)?;

        let completed = log_backend_failure(
            self.signer
                .complete_multipart_upload(key, upload_id, &parts)
                .await,
            key,
        )?;

        info!(
            key = %key,
            upload_id = %upload_id,
            parts = parts.len(),
            location = %completed.location,
            "multipart upload completed"
        );
        Ok(completed)
    }

    /// Discard an upload. Repeating the call succeeds.
    ///
    /// # Errors
    ///
    /// `Validation` for a key outside the slot; `Backend` otherwise.
    pub async fn abort(
        &self,
        slot: &SlotConfig,
        key: &str,
        upload_id: &str,
    ) -> Result<(), UploadError> {
        validate_key(key, slot)?;
        validate_upload_id(upload_id)?;
        log_backend_failure(self.signer.abort_multipart_upload(key, upload_id).await, key)?;

        info!(key = %key, upload_id = %upload_id, "multipart upload aborted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeSigner;

    fn coordinator() -> (UploadCoordinator, Arc<FakeSigner>) {
        let signer = Arc::new(FakeSigner::new());
        (UploadCoordinator::new(signer.clone()), signer)
    }

    fn docs_slot() -> SlotConfig {
        SlotConfig::new("scan").with_prefix("docs").preserving_filename()
    }

    #[tokio::test]
    async fn test_create_session_forwards_key_and_metadata() {
        let (coordinator, signer) = coordinator();
        let mut input = CreateSessionInput::new("report.pdf", "application/pdf");
        input.metadata.insert("owner".to_string(), "42".to_string());

        let session = coordinator.create_session(&docs_slot(), &input).await.unwrap();

        assert_eq!(session.key, "docs/report.pdf");
        assert!(!session.upload_id.is_empty());
        let created = signer.created();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].content_type, "application/pdf");
        assert_eq!(created[0].metadata["owner"], "42");
    }

    #[tokio::test]
    async fn test_create_session_enforces_slot_restrictions() {
        let (coordinator, signer) = coordinator();
        let mut slot = docs_slot();
        slot.max_file_size = Some(1024);
        slot.allowed_mime_types = vec!["application/pdf".to_string()];

        let mut too_big = CreateSessionInput::new("a.pdf", "application/pdf");
        too_big.size = Some(2048);
        assert!(matches!(
            coordinator.create_session(&slot, &too_big).await,
            Err(UploadError::Validation(_))
        ));

        let wrong_type = CreateSessionInput::new("a.png", "image/png");
        assert!(matches!(
            coordinator.create_session(&slot, &wrong_type).await,
            Err(UploadError::Validation(_))
        ));

        assert!(matches!(
            coordinator.create_session(&slot, &CreateSessionInput::new(" ", "")).await,
            Err(UploadError::Validation(_))
        ));
        assert_eq!(signer.calls().create, 0);
    }

    #[tokio::test]
    async fn test_complete_sends_parts_sorted() {
        let (coordinator, signer) = coordinator();
        coordinator
            .complete(
                &docs_slot(),
                "docs/report.pdf",
                "u-1",
                vec![CompletedPart::new(2, "etagB"), CompletedPart::new(1, "etagA")],
            )
            .await
            .unwrap();

        assert_eq!(
            signer.completed_parts(),
            vec![vec![CompletedPart::new(1, "etagA"), CompletedPart::new(2, "etagB")]]
        );
    }

    #[tokio::test]
    async fn test_duplicate_parts_rejected_before_backend() {
        let (coordinator, signer) = coordinator();
        let err = coordinator
            .complete(
                &docs_slot(),
                "docs/report.pdf",
                "u-1",
                vec![CompletedPart::new(1, "a"), CompletedPart::new(1, "b")],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Validation(_)));
        assert_eq!(signer.calls().complete, 0);
    }

    #[tokio::test]
    async fn test_abort_twice_succeeds() {
        let (coordinator, signer) = coordinator();
        let slot = docs_slot();
        coordinator.abort(&slot, "docs/report.pdf", "u-1").await.unwrap();
        coordinator.abort(&slot, "docs/report.pdf", "u-1").await.unwrap();
        assert_eq!(signer.calls().abort, 2);
    }

    #[tokio::test]
    async fn test_key_outside_slot_never_reaches_backend() {
        let (coordinator, signer) = coordinator();
        let slot = docs_slot();

        assert!(coordinator.sign_part(&slot, "other/x.pdf", "u-1", 1).await.is_err());
        assert!(coordinator.list_parts(&slot, "other/x.pdf", "u-1").await.is_err());
        assert!(coordinator.abort(&slot, "other/x.pdf", "u-1").await.is_err());
        assert_eq!(signer.calls().total(), 0);
    }

    #[tokio::test]
    async fn test_batch_signs_every_part() {
        let (coordinator, signer) = coordinator();
        let batch = coordinator
            .sign_parts_batch(&docs_slot(), "docs/report.pdf", "u-1", "3,1,2")
            .await
            .unwrap();

        assert_eq!(batch.presigned_urls.len(), 3);
        assert!(batch.presigned_urls["2"].contains("partNumber=2"));
        assert_eq!(signer.calls().sign_part, 3);
    }

    #[tokio::test]
    async fn test_backend_failure_propagates_message() {
        let (coordinator, signer) = coordinator();
        signer.fail_with("NoSuchUpload: upload expired");

        let err = coordinator
            .list_parts(&docs_slot(), "docs/report.pdf", "u-1")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("upload expired"));
        assert!(matches!(err, UploadError::Backend(_)));
    }
}
