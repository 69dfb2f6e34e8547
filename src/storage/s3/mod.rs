pub mod client_builder;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::delete_objects::DeleteObjectsOutput;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Delete, ObjectCannedAcl, ObjectIdentifier};
use aws_smithy_types::error::metadata::ProvideErrorMetadata;
use leaky_bucket::RateLimiter;
use tracing::{debug, trace, warn};

use crate::storage::{Storage, StorageTrait};
use crate::types::{
    BucketSummary, CopyResult, DeleteBatch, DeleteResult, DeletedKey, FailedKey, ObjectsPage,
    ObjectsPageRequest, Page, PageRequest, UploadResult, object_url,
};

/// Maximum identifiers per DeleteObjects API call (S3 limit).
pub const MAX_DELETE_OBJECTS_BATCH_SIZE: usize = 1000;

/// Extracts the S3 error code and message from an AWS SDK error.
///
/// For service errors (S3 API responses), returns the S3 error code
/// (e.g. "AccessDenied", "NoSuchBucket") and the human-readable error
/// message from the response. For other error types (network, timeout,
/// construction failure), returns "N/A" as the code and the full error
/// description as the message.
fn extract_sdk_error_details<E: std::fmt::Display + ProvideErrorMetadata>(
    e: &SdkError<E>,
) -> (String, String) {
    if let Some(service_err) = e.as_service_error() {
        (
            service_err.code().unwrap_or("unknown").to_string(),
            service_err.message().unwrap_or("no message").to_string(),
        )
    } else {
        ("N/A".to_string(), e.to_string())
    }
}

/// [`StorageTrait`] over the AWS SDK S3 client.
#[derive(Clone)]
pub struct S3Storage {
    client: Arc<Client>,
    rate_limit_requests_per_sec: Option<Arc<RateLimiter>>,
}

impl S3Storage {
    pub fn new(client: Client, rate_limit_requests_per_sec: Option<Arc<RateLimiter>>) -> Self {
        Self {
            client: Arc::new(client),
            rate_limit_requests_per_sec,
        }
    }

    pub fn boxed(client: Client, rate_limit_requests_per_sec: Option<Arc<RateLimiter>>) -> Storage {
        Box::new(Self::new(client, rate_limit_requests_per_sec))
    }

    async fn exec_rate_limit_requests_per_sec(&self) {
        if let Some(ref rate_limiter) = self.rate_limit_requests_per_sec {
            rate_limiter.acquire_one().await;
        }
    }

    async fn delete_identifiers(
        &self,
        bucket: &str,
        identifiers: Vec<ObjectIdentifier>,
    ) -> Result<DeleteResult> {
        let mut result = DeleteResult::default();

        for chunk in identifiers.chunks(MAX_DELETE_OBJECTS_BATCH_SIZE) {
            debug!(
                bucket = bucket,
                batch_size = chunk.len(),
                "sending DeleteObjects batch request."
            );

            let output = self.delete_objects_chunk(bucket, chunk.to_vec()).await?;
            merge_delete_objects_output(bucket, &output, &mut result);

            debug!(
                deleted = result.deleted.len(),
                failed = result.errors.len(),
                "DeleteObjects batch completed."
            );
        }

        Ok(result)
    }

    async fn delete_objects_chunk(
        &self,
        bucket: &str,
        objects: Vec<ObjectIdentifier>,
    ) -> Result<DeleteObjectsOutput> {
        self.exec_rate_limit_requests_per_sec().await;

        let object_count = objects.len();
        let delete = Delete::builder()
            .set_objects(Some(objects))
            .build()
            .context("Failed to build Delete request")?;

        self.client
            .delete_objects()
            .bucket(bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|e| {
                let (s3_error_code, s3_error_message) = extract_sdk_error_details(&e);
                tracing::error!(
                    bucket = bucket,
                    object_count = object_count,
                    s3_error_code = s3_error_code,
                    s3_error_message = s3_error_message,
                    "S3 DeleteObjects API call failed for {} objects in s3://{}: {} ({}).",
                    object_count,
                    bucket,
                    s3_error_code,
                    s3_error_message,
                );
                anyhow::anyhow!(e).context("aws_sdk_s3::client::delete_objects() failed.")
            })
    }
}

/// Append the deleted keys and per-key failures of one response, in response order.
fn merge_delete_objects_output(bucket: &str, output: &DeleteObjectsOutput, result: &mut DeleteResult) {
    for deleted in output.deleted() {
        result.deleted.push(DeletedKey {
            key: deleted.key().unwrap_or_default().to_string(),
            version_id: deleted.version_id().map(|v| v.to_string()),
        });
    }

    for err in output.errors() {
        let key = err.key().unwrap_or("unknown").to_string();
        let version_id = err.version_id().map(|v| v.to_string());
        let code = err.code().unwrap_or("unknown").to_string();
        let message = err.message().unwrap_or("no message").to_string();

        warn!(
            bucket = bucket,
            key = key,
            version_id = ?version_id,
            code = code,
            message = message,
            "S3 DeleteObjects partial failure for key '{}': {} ({}).",
            key,
            code,
            message,
        );

        result.errors.push(FailedKey {
            key,
            version_id,
            error_code: code,
            error_message: message,
        });
    }
}

#[async_trait]
impl StorageTrait for S3Storage {
    async fn list_object_versions_page(&self, request: &PageRequest) -> Result<Page> {
        self.exec_rate_limit_requests_per_sec().await;

        let output = self
            .client
            .list_object_versions()
            .bucket(&request.bucket)
            .set_prefix(request.prefix.clone())
            .set_max_keys(request.max_keys)
            .set_key_marker(request.key_marker().map(String::from))
            .set_version_id_marker(request.version_id_marker().map(String::from))
            .send()
            .await
            .map_err(|e| {
                let (s3_error_code, s3_error_message) = extract_sdk_error_details(&e);
                tracing::error!(
                    bucket = request.bucket,
                    prefix = ?request.prefix,
                    s3_error_code = s3_error_code,
                    s3_error_message = s3_error_message,
                    "S3 ListObjectVersions API call failed for s3://{}/{}: {} ({}).",
                    request.bucket,
                    request.prefix.as_deref().unwrap_or_default(),
                    s3_error_code,
                    s3_error_message,
                );
                anyhow::anyhow!(e).context("aws_sdk_s3::client::list_object_versions() failed.")
            })?;

        trace!(
            bucket = request.bucket,
            versions = output.versions().len(),
            delete_markers = output.delete_markers().len(),
            is_truncated = output.is_truncated(),
            "ListObjectVersions page received."
        );

        Ok(Page {
            versions: output.versions().to_vec(),
            delete_markers: output.delete_markers().to_vec(),
            is_truncated: output.is_truncated().unwrap_or(false),
            next_key_marker: output.next_key_marker().map(String::from),
            next_version_id_marker: output.next_version_id_marker().map(String::from),
        })
    }

    async fn list_objects_page(&self, request: &ObjectsPageRequest) -> Result<ObjectsPage> {
        self.exec_rate_limit_requests_per_sec().await;

        let output = self
            .client
            .list_objects_v2()
            .bucket(&request.bucket)
            .set_prefix(request.prefix.clone())
            .set_max_keys(request.max_keys)
            .set_continuation_token(request.continuation_token.clone())
            .send()
            .await
            .map_err(|e| {
                let (s3_error_code, s3_error_message) = extract_sdk_error_details(&e);
                tracing::error!(
                    bucket = request.bucket,
                    prefix = ?request.prefix,
                    s3_error_code = s3_error_code,
                    s3_error_message = s3_error_message,
                    "S3 ListObjectsV2 API call failed for s3://{}/{}: {} ({}).",
                    request.bucket,
                    request.prefix.as_deref().unwrap_or_default(),
                    s3_error_code,
                    s3_error_message,
                );
                anyhow::anyhow!(e).context("aws_sdk_s3::client::list_objects_v2() failed.")
            })?;

        Ok(ObjectsPage {
            contents: output.contents().to_vec(),
            is_truncated: output.is_truncated().unwrap_or(false),
            next_continuation_token: output.next_continuation_token().map(String::from),
        })
    }

    async fn delete_objects(&self, bucket: &str, batch: DeleteBatch) -> Result<DeleteResult> {
        let identifiers = batch
            .files
            .iter()
            .map(|entry| {
                ObjectIdentifier::builder()
                    .key(&entry.key)
                    .version_id(&entry.version_id)
                    .build()
                    .context("Failed to build ObjectIdentifier")
            })
            .collect::<Result<Vec<_>>>()?;

        self.delete_identifiers(bucket, identifiers).await
    }

    async fn delete_keys(&self, bucket: &str, keys: Vec<String>) -> Result<DeleteResult> {
        let identifiers = keys
            .into_iter()
            .map(|key| {
                ObjectIdentifier::builder()
                    .key(key)
                    .build()
                    .context("Failed to build ObjectIdentifier")
            })
            .collect::<Result<Vec<_>>>()?;

        self.delete_identifiers(bucket, identifiers).await
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        file_path: &Path,
        content_length: i64,
        acl: &str,
    ) -> Result<UploadResult> {
        let body = ByteStream::from_path(file_path)
            .await
            .with_context(|| format!("Failed to open {} for upload.", file_path.display()))?;

        self.exec_rate_limit_requests_per_sec().await;

        let output = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .acl(ObjectCannedAcl::from(acl))
            .content_length(content_length)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                let (s3_error_code, s3_error_message) = extract_sdk_error_details(&e);
                tracing::error!(
                    bucket = bucket,
                    key = key,
                    s3_error_code = s3_error_code,
                    s3_error_message = s3_error_message,
                    "S3 PutObject API call failed for s3://{}/{}: {} ({}).",
                    bucket,
                    key,
                    s3_error_code,
                    s3_error_message,
                );
                anyhow::anyhow!(e).context("aws_sdk_s3::client::put_object() failed.")
            })?;

        Ok(UploadResult {
            key: key.to_string(),
            e_tag: output.e_tag().map(String::from),
            version_id: output.version_id().map(String::from),
            url: object_url(bucket, key),
        })
    }

    async fn copy_object(
        &self,
        bucket: &str,
        copy_source: &str,
        key: &str,
        acl: &str,
    ) -> Result<CopyResult> {
        self.exec_rate_limit_requests_per_sec().await;

        let output = self
            .client
            .copy_object()
            .bucket(bucket)
            .copy_source(copy_source)
            .key(key)
            .acl(ObjectCannedAcl::from(acl))
            .send()
            .await
            .map_err(|e| {
                let (s3_error_code, s3_error_message) = extract_sdk_error_details(&e);
                tracing::error!(
                    bucket = bucket,
                    copy_source = copy_source,
                    key = key,
                    s3_error_code = s3_error_code,
                    s3_error_message = s3_error_message,
                    "S3 CopyObject API call failed for {} -> s3://{}/{}: {} ({}).",
                    copy_source,
                    bucket,
                    key,
                    s3_error_code,
                    s3_error_message,
                );
                anyhow::anyhow!(e).context("aws_sdk_s3::client::copy_object() failed.")
            })?;

        Ok(CopyResult {
            key: key.to_string(),
            e_tag: output
                .copy_object_result()
                .and_then(|r| r.e_tag())
                .map(String::from),
            copy_source_version_id: output.copy_source_version_id().map(String::from),
            version_id: output.version_id().map(String::from),
            url: object_url(bucket, key),
        })
    }

    async fn presign_put_object(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        acl: &str,
        expires_in: Duration,
    ) -> Result<String> {
        let presigning_config =
            PresigningConfig::expires_in(expires_in).context("Invalid presigned URL expiry.")?;

        let request = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .acl(ObjectCannedAcl::from(acl))
            .presigned(presigning_config)
            .await
            .map_err(|e| {
                let (s3_error_code, s3_error_message) = extract_sdk_error_details(&e);
                tracing::error!(
                    bucket = bucket,
                    key = key,
                    s3_error_code = s3_error_code,
                    s3_error_message = s3_error_message,
                    "Presigning PutObject failed for s3://{}/{}: {} ({}).",
                    bucket,
                    key,
                    s3_error_code,
                    s3_error_message,
                );
                anyhow::anyhow!(e).context("aws_sdk_s3::client::put_object().presigned() failed.")
            })?;

        Ok(request.uri().to_string())
    }

    async fn list_buckets(&self) -> Result<Vec<BucketSummary>> {
        self.exec_rate_limit_requests_per_sec().await;

        let output = self.client.list_buckets().send().await.map_err(|e| {
            let (s3_error_code, s3_error_message) = extract_sdk_error_details(&e);
            tracing::error!(
                s3_error_code = s3_error_code,
                s3_error_message = s3_error_message,
                "S3 ListBuckets API call failed: {} ({}).",
                s3_error_code,
                s3_error_message,
            );
            anyhow::anyhow!(e).context("aws_sdk_s3::client::list_buckets() failed.")
        })?;

        Ok(output
            .buckets()
            .iter()
            .map(|bucket| BucketSummary {
                name: bucket.name().unwrap_or_default().to_string(),
                creation_date: bucket.creation_date().cloned(),
            })
            .collect())
    }
}
