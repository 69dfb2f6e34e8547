use std::time::Duration;

use anyhow::{Result, anyhow};
use aws_sdk_s3::types::Object;
use chrono::Utc;
use tracing::debug;

use crate::config::Config;
use crate::deleter::{DeleteTarget, KeyDeleter, VersionDeleter};
use crate::lister::{ObjectLister, VersionLister};
use crate::params::{
    BucketParams, CopyFileParams, DEFAULT_UPLOAD_URL_EXPIRES_SECONDS, ListFilesParams,
    ListVersionsParams, UploadFileParams, UploadUrlParams, check_params, merge, normalize_delay,
    normalize_key_filter, normalize_limit,
};
use crate::storage::{Storage, create_storage};
use crate::types::error::S3BucketError;
use crate::types::token::ListingCancellationToken;
use crate::types::{
    AccessKeys, BucketSummary, CopyResult, DeleteBatch, DeleteResult, EnumerationResult,
    ObjectsPage, ObjectsPageRequest, Page, PageRequest, S3Credentials, SignedUploadUrl,
    UploadFile, UploadResult,
};

/// A client bound to one bucket.
///
/// Configuration is fixed at construction. The `with_*` methods return a new
/// `Bucket` and leave `self` untouched.
///
/// ```no_run
/// use s3bucket_rs::{Bucket, BucketParams};
///
/// # async fn run() -> anyhow::Result<()> {
/// let bucket = Bucket::connect(BucketParams {
///     access_key_id: Some("AKIA...".to_string()),
///     secret_access_key: Some("secret".to_string()),
///     region: Some("us-east-1".to_string()),
///     bucket_name: Some("my-bucket".to_string()),
///     ..Default::default()
/// })
/// .await?;
///
/// let removed = bucket.delete_all_versions_and_markers("reports/2024.csv").await?;
/// println!("{} entries removed", removed.deleted.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Bucket {
    config: Config,
    storage: Storage,
    cancellation_token: Option<ListingCancellationToken>,
}

impl Bucket {
    /// Build a bucket client on top of an existing storage.
    pub fn new(params: BucketParams, storage: Storage) -> Result<Self> {
        let config = Config::try_from(params)?;
        Ok(Self::with_storage(config, storage))
    }

    /// Validate `params` and create the S3 client they describe.
    pub async fn connect(params: BucketParams) -> Result<Self> {
        let config = Config::try_from(params)?;
        Ok(Self::from_config(config).await)
    }

    pub async fn from_config(config: Config) -> Self {
        let storage = create_storage(&config).await;
        Self::with_storage(config, storage)
    }

    pub fn with_storage(config: Config, storage: Storage) -> Self {
        Self {
            config,
            storage,
            cancellation_token: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn bucket_name(&self) -> &str {
        &self.config.bucket_name
    }

    /// Cancel paginated listings (and the deletions built on them) through `token`.
    pub fn with_cancellation_token(mut self, token: ListingCancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// A new client with explicit credentials.
    pub async fn with_credentials(&self, access_keys: AccessKeys) -> Self {
        let mut config = self.config.clone();
        let mut client_config = config.client_config.take().unwrap_or_default();
        client_config.credential = S3Credentials::Credentials { access_keys };
        config.client_config = Some(client_config);

        self.rebuild(config).await
    }

    /// A new client for another region.
    pub async fn with_region(&self, region: &str) -> Self {
        let mut config = self.config.clone();
        let mut client_config = config.client_config.take().unwrap_or_default();
        client_config.region = Some(region.to_string());
        config.client_config = Some(client_config);

        self.rebuild(config).await
    }

    /// A new client for another bucket, sharing this client's connection.
    pub fn with_bucket_name(&self, bucket_name: &str) -> Self {
        let mut bucket = self.clone();
        bucket.config.bucket_name = bucket_name.to_string();
        bucket
    }

    async fn rebuild(&self, config: Config) -> Self {
        let storage = create_storage(&config).await;
        Self {
            config,
            storage,
            cancellation_token: self.cancellation_token.clone(),
        }
    }

    pub async fn get_all_buckets(&self) -> Result<Vec<BucketSummary>> {
        self.storage.list_buckets().await
    }

    /// Presign a `PutObject` for `params.key`.
    pub async fn get_upload_url(&self, params: UploadUrlParams) -> Result<SignedUploadUrl> {
        check_params("get upload url", &params)?;
        let UploadUrlParams {
            key,
            content_type,
            expires,
            acl,
        } = params;
        let key = key.unwrap_or_default();
        let content_type = content_type.unwrap_or_default();
        let expires = merge(DEFAULT_UPLOAD_URL_EXPIRES_SECONDS, expires);
        let acl = merge(self.config.bucket_acl.clone(), acl);

        let expires_in = chrono::Duration::try_seconds(i64::try_from(expires)?).ok_or_else(|| {
            anyhow!(S3BucketError::InvalidParameterType {
                parameter: "expires",
                expected: "number of seconds",
            })
        })?;

        let signed_url = self
            .storage
            .presign_put_object(
                self.bucket_name(),
                &key,
                &content_type,
                &acl,
                Duration::from_secs(expires),
            )
            .await?;

        Ok(SignedUploadUrl {
            signed_url,
            expires_at: Utc::now() + expires_in,
        })
    }

    pub async fn upload_file(&self, params: UploadFileParams) -> Result<UploadResult> {
        check_params("upload file", &params)?;
        let UploadFileParams {
            file_path,
            key,
            acl,
        } = params;
        let file = UploadFile {
            file_path: file_path.unwrap_or_default(),
            key: key.unwrap_or_default(),
        };

        self.uploader().upload_file(&file, acl.as_deref()).await
    }

    pub async fn copy_file(&self, params: CopyFileParams) -> Result<CopyResult> {
        check_params("copy file", &params)?;
        let CopyFileParams {
            copy_source,
            key,
            acl,
        } = params;
        let acl = merge(self.config.bucket_acl.clone(), acl);

        self.storage
            .copy_object(
                self.bucket_name(),
                &copy_source.unwrap_or_default(),
                &key.unwrap_or_default(),
                &acl,
            )
            .await
    }

    /// Upload files one after another; results follow the input order.
    pub async fn upload_multiple_files(&self, files: &[UploadFile]) -> Result<Vec<UploadResult>> {
        self.uploader().upload_multiple_files(files).await
    }

    /// One page of the versioned listing, resuming at `params.marker`.
    pub async fn list_paged_file_versions(&self, params: ListVersionsParams) -> Result<Page> {
        let mut request = self.version_request(&params)?;
        request.marker = params.marker;

        self.version_lister().list_page(&request).await
    }

    /// Every version and delete marker under `params.key`.
    pub async fn list_file_versions(&self, params: ListVersionsParams) -> Result<EnumerationResult> {
        let request = self.version_request(&params)?;
        let delay = normalize_delay(params.delay, self.config.paging_delay);

        self.version_lister().list_all(request, delay).await
    }

    pub async fn delete_all_versions(&self, key: &str) -> Result<DeleteResult> {
        self.delete_versions(key, DeleteTarget::VERSIONS).await
    }

    pub async fn delete_all_markers(&self, key: &str) -> Result<DeleteResult> {
        self.delete_versions(key, DeleteTarget::MARKERS).await
    }

    pub async fn delete_all_versions_and_markers(&self, key: &str) -> Result<DeleteResult> {
        self.delete_versions(key, DeleteTarget::VERSIONS_AND_MARKERS)
            .await
    }

    pub async fn list_paged_files(&self, params: ListFilesParams) -> Result<ObjectsPage> {
        let request = self.objects_request(&params)?;

        self.object_lister().list_page(&request).await
    }

    /// Every current object under `params.prefix`.
    pub async fn list_files(&self, params: ListFilesParams) -> Result<Vec<Object>> {
        let request = self.objects_request(&params)?;
        let delay = normalize_delay(params.delay, self.config.paging_delay);

        self.object_lister().list_all(request, delay).await
    }

    pub async fn delete_files(&self, keys: Vec<String>) -> Result<DeleteResult> {
        KeyDeleter::new(self.storage.clone(), self.bucket_name())
            .delete_files(keys)
            .await
    }

    pub async fn delete_files_versioned(&self, batch: DeleteBatch) -> Result<DeleteResult> {
        KeyDeleter::new(self.storage.clone(), self.bucket_name())
            .delete_files_versioned(batch)
            .await
    }

    async fn delete_versions(&self, key: &str, target: DeleteTarget) -> Result<DeleteResult> {
        let mut deleter =
            VersionDeleter::new(self.storage.clone(), self.bucket_name(), self.config.paging_delay);
        if let Some(token) = &self.cancellation_token {
            deleter = deleter.with_cancellation_token(token.clone());
        }

        deleter.delete_all(key, target).await
    }

    fn version_request(&self, params: &ListVersionsParams) -> Result<PageRequest> {
        let mut request = PageRequest::new(self.bucket_name());
        request.max_keys = normalize_limit(params.limit)?;
        request.prefix = normalize_key_filter(params.key.as_deref())?;

        debug!(
            bucket = %request.bucket,
            prefix = ?request.prefix,
            max_keys = ?request.max_keys,
            "versioned listing request."
        );
        Ok(request)
    }

    fn objects_request(&self, params: &ListFilesParams) -> Result<ObjectsPageRequest> {
        let bucket = match params.bucket_name.as_deref() {
            Some(bucket_name) if !bucket_name.is_empty() => bucket_name,
            _ => self.bucket_name(),
        };
        let mut request = ObjectsPageRequest::new(bucket);
        request.max_keys = normalize_limit(params.limit)?;
        request.prefix = params.prefix.clone();
        request.continuation_token = params.continuation_token.clone();
        Ok(request)
    }

    fn version_lister(&self) -> VersionLister {
        let lister = VersionLister::new(self.storage.clone());
        match &self.cancellation_token {
            Some(token) => lister.with_cancellation_token(token.clone()),
            None => lister,
        }
    }

    fn object_lister(&self) -> ObjectLister {
        let lister = ObjectLister::new(self.storage.clone());
        match &self.cancellation_token {
            Some(token) => lister.with_cancellation_token(token.clone()),
            None => lister,
        }
    }

    fn uploader(&self) -> crate::uploader::FileUploader {
        let uploader = crate::uploader::FileUploader::new(
            self.storage.clone(),
            self.bucket_name(),
            &self.config.bucket_acl,
        );
        match &self.cancellation_token {
            Some(token) => uploader.with_cancellation_token(token.clone()),
            None => uploader,
        }
    }
}
