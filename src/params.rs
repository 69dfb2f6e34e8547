//! Caller-facing parameter sets and the normalization applied to them before
//! any request is issued.
//!
//! Every operation of [`Bucket`](crate::Bucket) takes one of the structs below.
//! Required fields are `Option`s so that a missing value is reported as
//! [`S3BucketError::MissingParameter`] naming the operation, rather than being
//! impossible to express.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, anyhow};

use crate::config::{ClientConfig, Config};
use crate::types::error::S3BucketError;
use crate::types::{AccessKeys, S3Credentials, VersionMarker};

pub const DEFAULT_BUCKET_ACL: &str = "public-read";
pub const DEFAULT_PAGING_DELAY_MILLISECONDS: u64 = 500;
pub const DEFAULT_UPLOAD_URL_EXPIRES_SECONDS: u64 = 60;

/// Report which required fields of a parameter set are absent.
pub trait RequiredParameters {
    fn missing_parameters(&self) -> Vec<&'static str>;
}

/// Fail with [`S3BucketError::MissingParameter`] for the first absent required field.
///
/// Presence is all that is checked: an empty string counts as supplied.
pub fn check_params<P: RequiredParameters>(operation: &'static str, params: &P) -> Result<()> {
    match params.missing_parameters().first() {
        Some(&field) => Err(anyhow!(S3BucketError::MissingParameter {
            operation,
            field,
        })),
        None => Ok(()),
    }
}

/// `limit` becomes the service's `max_keys`. It must be at least 1.
pub fn normalize_limit(limit: Option<i32>) -> Result<Option<i32>> {
    match limit {
        Some(limit) if limit < 1 => Err(anyhow!(S3BucketError::InvalidParameterType {
            parameter: "limit",
            expected: "positive integer",
        })),
        limit => Ok(limit),
    }
}

/// `delay` (milliseconds) becomes the inter-page wait, falling back to `default`.
pub fn normalize_delay(delay: Option<u64>, default: Duration) -> Duration {
    merge(default, delay.map(Duration::from_millis))
}

/// A key filter becomes the service's `prefix`. It must not be empty.
pub fn normalize_key_filter(key: Option<&str>) -> Result<Option<String>> {
    match key {
        Some("") => Err(anyhow!(S3BucketError::InvalidParameterType {
            parameter: "key",
            expected: "non-empty string",
        })),
        key => Ok(key.map(str::to_string)),
    }
}

/// Caller value wins over the default.
pub fn merge<T>(default: T, custom: Option<T>) -> T {
    custom.unwrap_or(default)
}

/// Construction parameters of a [`Bucket`](crate::Bucket).
#[derive(Debug, Clone, Default)]
pub struct BucketParams {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    pub region: Option<String>,
    pub bucket_name: Option<String>,
    pub bucket_acl: Option<String>,
    pub paging_delay: Option<u64>,
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
}

impl RequiredParameters for BucketParams {
    fn missing_parameters(&self) -> Vec<&'static str> {
        let mut missing = vec![];
        if self.access_key_id.is_none() {
            missing.push("access_key_id");
        }
        if self.secret_access_key.is_none() {
            missing.push("secret_access_key");
        }
        if self.region.is_none() {
            missing.push("region");
        }
        if self.bucket_name.is_none() {
            missing.push("bucket_name");
        }
        missing
    }
}

impl TryFrom<BucketParams> for Config {
    type Error = anyhow::Error;

    fn try_from(params: BucketParams) -> Result<Self> {
        check_params("create bucket instance", &params)?;

        let BucketParams {
            access_key_id,
            secret_access_key,
            session_token,
            region,
            bucket_name,
            bucket_acl,
            paging_delay,
            endpoint_url,
            force_path_style,
        } = params;

        let access_keys = AccessKeys {
            access_key: access_key_id.unwrap_or_default(),
            secret_access_key: secret_access_key.unwrap_or_default(),
            session_token,
        };
        let client_config = ClientConfig {
            credential: S3Credentials::Credentials { access_keys },
            region,
            endpoint_url,
            force_path_style,
            ..ClientConfig::default()
        };

        let mut config = Config::for_bucket(&bucket_name.unwrap_or_default());
        config.bucket_acl = merge(config.bucket_acl, bucket_acl);
        config.paging_delay = normalize_delay(paging_delay, config.paging_delay);
        config.client_config = Some(client_config);
        Ok(config)
    }
}

/// Parameters of a presigned `PutObject` URL.
#[derive(Debug, Clone, Default)]
pub struct UploadUrlParams {
    pub key: Option<String>,
    pub content_type: Option<String>,
    /// Seconds, defaults to 60.
    pub expires: Option<u64>,
    pub acl: Option<String>,
}

impl RequiredParameters for UploadUrlParams {
    fn missing_parameters(&self) -> Vec<&'static str> {
        let mut missing = vec![];
        if self.content_type.is_none() {
            missing.push("content_type");
        }
        if self.key.is_none() {
            missing.push("key");
        }
        missing
    }
}

#[derive(Debug, Clone, Default)]
pub struct UploadFileParams {
    pub file_path: Option<PathBuf>,
    pub key: Option<String>,
    pub acl: Option<String>,
}

impl RequiredParameters for UploadFileParams {
    fn missing_parameters(&self) -> Vec<&'static str> {
        let mut missing = vec![];
        if self.file_path.is_none() {
            missing.push("file_path");
        }
        if self.key.is_none() {
            missing.push("key");
        }
        missing
    }
}

/// `copy_source` is `source-bucket/source-key`, optionally with `?versionId=`.
#[derive(Debug, Clone, Default)]
pub struct CopyFileParams {
    pub copy_source: Option<String>,
    pub key: Option<String>,
    pub acl: Option<String>,
}

impl RequiredParameters for CopyFileParams {
    fn missing_parameters(&self) -> Vec<&'static str> {
        let mut missing = vec![];
        if self.copy_source.is_none() {
            missing.push("copy_source");
        }
        if self.key.is_none() {
            missing.push("key");
        }
        missing
    }
}

/// Versioned listing options. `key` is used as the listing prefix.
#[derive(Debug, Clone, Default)]
pub struct ListVersionsParams {
    pub key: Option<String>,
    pub limit: Option<i32>,
    /// Milliseconds between pages.
    pub delay: Option<u64>,
    /// Where a single-page listing resumes.
    pub marker: Option<VersionMarker>,
}

impl ListVersionsParams {
    pub fn for_key(key: &str) -> Self {
        Self {
            key: Some(key.to_string()),
            ..Self::default()
        }
    }
}

/// Plain listing options.
#[derive(Debug, Clone, Default)]
pub struct ListFilesParams {
    pub prefix: Option<String>,
    pub limit: Option<i32>,
    /// Milliseconds between pages.
    pub delay: Option<u64>,
    /// Lists another bucket than the one the client was created for.
    pub bucket_name: Option<String>,
    pub continuation_token: Option<String>,
}
