//! S3 implementation of the multipart primitives.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::operation::abort_multipart_upload::AbortMultipartUploadError;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart as S3CompletedPart};
use tracing::debug;

use super::config::{StorageConfig, StorageProvider};
use super::error::SignerError;
use super::service::PresignedUrl;
use super::signer::{CompletedPart, CompletedUpload, MultipartSigner, UploadSession, UploadedPart};

/// Multipart signer backed by `aws-sdk-s3`.
///
/// Part URLs are presigned locally; the other primitives are single backend
/// calls.
pub struct S3Signer {
    client: Client,
    bucket: String,
    part_url_ttl_secs: u64,
}

impl std::fmt::Debug for S3Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Signer")
            .field("bucket", &self.bucket)
            .field("part_url_ttl_secs", &self.part_url_ttl_secs)
            .finish_non_exhaustive()
    }
}

impl S3Signer {
    /// Build a signer for the configured S3 provider.
    ///
    /// Static credentials from the config take precedence over the ambient
    /// AWS credential chain.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider is not S3-compatible.
    pub async fn connect(config: &StorageConfig) -> Result<Self, SignerError> {
        let StorageProvider::S3 {
            endpoint,
            bucket,
            access_key_id,
            secret_access_key,
            region,
        } = &config.provider
        else {
            return Err(SignerError::Configuration(format!(
                "multipart uploads require an S3 provider, got '{}'",
                config.provider.name()
            )));
        };

        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region.clone()));
        if !endpoint.is_empty() {
            loader = loader.endpoint_url(endpoint);
        }
        if let (Some(id), Some(secret)) = (access_key_id, secret_access_key) {
            loader = loader.credentials_provider(Credentials::new(
                id.clone(),
                secret.clone(),
                None,
                None,
                "upvault-config",
            ));
        }
        let sdk_config = loader.load().await;

        // Custom endpoints (MinIO, R2) generally need path-style addressing.
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(!endpoint.is_empty())
            .build();

        Ok(Self {
            client: Client::from_conf(s3_config),
            bucket: bucket.clone(),
            part_url_ttl_secs: config.part_url_ttl_secs,
        })
    }
}

fn backend_error(operation: &'static str, err: impl std::error::Error) -> SignerError {
    SignerError::backend(operation, DisplayErrorContext(&err).to_string())
}

fn to_s3_part_number(operation: &'static str, part_number: u32) -> Result<i32, SignerError> {
    i32::try_from(part_number)
        .map_err(|_| SignerError::backend(operation, format!("part number {part_number} out of range")))
}

#[async_trait]
impl MultipartSigner for S3Signer {
    async fn create_multipart_upload(
        &self,
        key: &str,
        content_type: &str,
        metadata: &HashMap<String, String>,
    ) -> Result<UploadSession, SignerError> {
        const OP: &str = "CreateMultipartUpload";

        let output = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .set_metadata(Some(metadata.clone()))
            .send()
            .await
            .map_err(|e| backend_error(OP, e))?;

        let upload_id = output
            .upload_id()
            .ok_or_else(|| SignerError::backend(OP, "backend returned no upload id"))?;

        Ok(UploadSession {
            key: output.key().unwrap_or(key).to_string(),
            upload_id: upload_id.to_string(),
        })
    }

    async fn sign_upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: u32,
    ) -> Result<PresignedUrl, SignerError> {
        const OP: &str = "UploadPart";

        let presigning = PresigningConfig::expires_in(Duration::from_secs(self.part_url_ttl_secs))
            .map_err(|e| backend_error(OP, e))?;

        let presigned = self
            .client
            .upload_part()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(to_s3_part_number(OP, part_number)?)
            .presigned(presigning)
            .await
            .map_err(|e| backend_error(OP, e))?;

        debug!(key = %key, upload_id = %upload_id, part_number, "part url presigned");

        Ok(PresignedUrl {
            url: presigned.uri().to_string(),
            method: presigned.method().to_string(),
            expires_at: PresignedUrl::expiry_from_now(self.part_url_ttl_secs),
            headers: presigned
                .headers()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
        })
    }

    async fn list_parts(
        &self,
        key: &str,
        upload_id: &str,
    ) -> Result<Vec<UploadedPart>, SignerError> {
        const OP: &str = "ListParts";

        let output = self
            .client
            .list_parts()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number_marker("0")
            .send()
            .await
            .map_err(|e| backend_error(OP, e))?;

        Ok(output
            .parts()
            .iter()
            .filter_map(|part| {
                let part_number = u32::try_from(part.part_number()?).ok()?;
                Some(UploadedPart {
                    part_number,
                    e_tag: part.e_tag().unwrap_or_default().to_string(),
                    size: part.size().and_then(|s| u64::try_from(s).ok()),
                })
            })
            .collect())
    }

    async fn complete_multipart_upload(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> Result<CompletedUpload, SignerError> {
        const OP: &str = "CompleteMultipartUpload";

        let s3_parts = parts
            .iter()
            .map(|part| {
                Ok(S3CompletedPart::builder()
                    .part_number(to_s3_part_number(OP, part.part_number)?)
                    .e_tag(&part.e_tag)
                    .build())
            })
            .collect::<Result<Vec<_>, SignerError>>()?;

        let output = self
            .client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(s3_parts))
                    .build(),
            )
            .send()
            .await
            .map_err(|e| backend_error(OP, e))?;

        Ok(CompletedUpload {
            location: output.location().unwrap_or(key).to_string(),
        })
    }

    async fn abort_multipart_upload(&self, key: &str, upload_id: &str) -> Result<(), SignerError> {
        const OP: &str = "AbortMultipartUpload";

        match self
            .client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(AbortMultipartUploadError::is_no_such_upload) =>
            {
                debug!(key = %key, upload_id = %upload_id, "upload already gone, abort is a no-op");
                Ok(())
            }
            Err(err) => Err(backend_error(OP, err)),
        }
    }
}
