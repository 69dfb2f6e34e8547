use anyhow::{Context, Result, anyhow};
use tracing::{debug, info};

use crate::storage::Storage;
use crate::types::error::S3BucketError;
use crate::types::token::ListingCancellationToken;
use crate::types::{UploadFile, UploadResult};

/// Uploads local files into one bucket, one at a time.
pub struct FileUploader {
    target: Storage,
    bucket: String,
    default_acl: String,
    cancellation_token: Option<ListingCancellationToken>,
}

impl FileUploader {
    pub fn new(target: Storage, bucket: &str, default_acl: &str) -> Self {
        Self {
            target,
            bucket: bucket.to_string(),
            default_acl: default_acl.to_string(),
            cancellation_token: None,
        }
    }

    /// Stop a multi-file upload before the next file once `token` is cancelled.
    pub fn with_cancellation_token(mut self, token: ListingCancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Upload one file. `acl` falls back to the bucket ACL.
    pub async fn upload_file(&self, file: &UploadFile, acl: Option<&str>) -> Result<UploadResult> {
        validate_entry(file)?;

        let metadata = tokio::fs::metadata(&file.file_path)
            .await
            .with_context(|| format!("failed to read file: {}", file.file_path.display()))?;
        let content_length = i64::try_from(metadata.len())?;
        let acl = acl.unwrap_or(&self.default_acl);

        debug!(
            bucket = self.bucket,
            key = file.key,
            file_path = %file.file_path.display(),
            content_length = content_length,
            acl = acl,
            "uploading file."
        );

        self.target
            .put_object(&self.bucket, &file.key, &file.file_path, content_length, acl)
            .await
    }

    /// Upload `files` sequentially in input order.
    ///
    /// Every entry is checked before the first upload starts. The first failed
    /// upload or a cancellation stops the sequence; files uploaded before it
    /// stay in the bucket.
    pub async fn upload_multiple_files(&self, files: &[UploadFile]) -> Result<Vec<UploadResult>> {
        if files.is_empty() {
            return Err(anyhow!(S3BucketError::EmptyFileList));
        }
        files.iter().try_for_each(validate_entry)?;

        let mut results = Vec::with_capacity(files.len());
        for file in files {
            if self
                .cancellation_token
                .as_ref()
                .is_some_and(|token| token.is_cancelled())
            {
                debug!(
                    uploaded = results.len(),
                    remaining = files.len() - results.len(),
                    "upload sequence has been cancelled."
                );
                return Err(anyhow!(S3BucketError::Cancelled));
            }
            results.push(self.upload_file(file, None).await?);
        }

        info!(
            bucket = self.bucket,
            files = results.len(),
            "files have been uploaded."
        );

        Ok(results)
    }
}

fn validate_entry(file: &UploadFile) -> Result<()> {
    if file.key.is_empty() {
        return Err(anyhow!(S3BucketError::InvalidFileEntry(
            "file key should be a non-empty string".to_string()
        )));
    }
    if file.file_path.as_os_str().is_empty() {
        return Err(anyhow!(S3BucketError::InvalidFileEntry(format!(
            "file '{}' should provide a file path",
            file.key
        ))));
    }
    Ok(())
}
