use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use dyn_clone::DynClone;
use leaky_bucket::RateLimiter;

use crate::config::Config;
use crate::types::{
    BucketSummary, CopyResult, DeleteBatch, DeleteResult, ObjectsPage, ObjectsPageRequest, Page,
    PageRequest, UploadResult,
};

pub mod s3;

/// Type alias for a boxed Storage trait object.
pub type Storage = Box<dyn StorageTrait + Send + Sync>;

/// The narrow S3 surface the listing, deletion and upload workflows call.
///
/// Every method issues exactly one logical S3 operation and returns its
/// outcome unchanged. Implementations never retry on their own and never
/// turn a failed call into a partial success. The bucket is passed per call
/// so that one storage can serve several [`Bucket`](crate::Bucket)s.
#[async_trait]
pub trait StorageTrait: DynClone {
    /// Fetch one page of `ListObjectVersions`.
    async fn list_object_versions_page(&self, request: &PageRequest) -> Result<Page>;

    /// Fetch one page of `ListObjectsV2`.
    async fn list_objects_page(&self, request: &ObjectsPageRequest) -> Result<ObjectsPage>;

    /// Delete the given (key, version-id) pairs.
    ///
    /// Keys S3 refuses to delete are reported in [`DeleteResult::errors`];
    /// only a failure of the request itself is an `Err`.
    async fn delete_objects(&self, bucket: &str, batch: DeleteBatch) -> Result<DeleteResult>;

    /// Delete the given keys without version ids.
    async fn delete_keys(&self, bucket: &str, keys: Vec<String>) -> Result<DeleteResult>;

    /// Upload a local file.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        file_path: &Path,
        content_length: i64,
        acl: &str,
    ) -> Result<UploadResult>;

    /// Server-side copy of `copy_source` (`bucket/key`) into `bucket`/`key`.
    async fn copy_object(
        &self,
        bucket: &str,
        copy_source: &str,
        key: &str,
        acl: &str,
    ) -> Result<CopyResult>;

    /// Presign a `PutObject` request.
    async fn presign_put_object(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        acl: &str,
        expires_in: Duration,
    ) -> Result<String>;

    async fn list_buckets(&self) -> Result<Vec<BucketSummary>>;
}

dyn_clone::clone_trait_object!(StorageTrait);

// Default refill interval 100ms
const REFILL_PER_INTERVAL_DIVIDER: usize = 10;

/// Create the S3 storage described by `config`.
///
/// Without a `client_config`, credentials and region come from the default
/// AWS provider chain.
pub async fn create_storage(config: &Config) -> Storage {
    let rate_limit_requests_per_sec = config.rate_limit_requests.map(build_rate_limiter);
    let client_config = config.client_config.clone().unwrap_or_default();

    s3::S3Storage::boxed(client_config.create_client().await, rate_limit_requests_per_sec)
}

fn build_rate_limiter(rate_limit_value: u32) -> Arc<RateLimiter> {
    let refill = if (rate_limit_value as usize) <= REFILL_PER_INTERVAL_DIVIDER {
        1
    } else {
        rate_limit_value as usize / REFILL_PER_INTERVAL_DIVIDER
    };
    Arc::new(
        RateLimiter::builder()
            .max(rate_limit_value as usize)
            .initial(rate_limit_value as usize)
            .refill(refill)
            .fair(true)
            .build(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::test_utils::init_dummy_tracing_subscriber;
    use crate::types::{AccessKeys, S3Credentials};

    fn make_test_config(bucket: &str) -> Config {
        let mut config = Config::for_bucket(bucket);
        config.client_config = Some(ClientConfig {
            credential: S3Credentials::Credentials {
                access_keys: AccessKeys {
                    access_key: "test_key".to_string(),
                    secret_access_key: "test_secret".to_string(),
                    session_token: None,
                },
            },
            region: Some("us-east-1".to_string()),
            endpoint_url: Some("https://localhost:9000".to_string()),
            force_path_style: true,
            ..ClientConfig::default()
        });
        config
    }

    #[tokio::test]
    async fn create_s3_storage_with_credentials() {
        init_dummy_tracing_subscriber();

        let storage = create_storage(&make_test_config("test-bucket")).await;
        let cloned = storage.clone();
        drop(cloned);
    }

    #[tokio::test]
    async fn create_s3_storage_with_rate_limiting() {
        init_dummy_tracing_subscriber();

        let mut config = make_test_config("test-bucket");
        config.rate_limit_requests = Some(100);
        let _storage = create_storage(&config).await;
    }

    #[tokio::test]
    async fn rate_limiter_allows_initial_burst() {
        let rate_limiter = build_rate_limiter(5);
        assert_eq!(rate_limiter.max(), 5);
        assert_eq!(rate_limiter.balance(), 5);
        rate_limiter.acquire_one().await;
        assert_eq!(rate_limiter.balance(), 4);
    }

    #[test]
    fn rate_limiter_refill_scales_with_limit() {
        assert_eq!(build_rate_limiter(5).refill(), 1);
        assert_eq!(build_rate_limiter(10).refill(), 1);
        assert_eq!(build_rate_limiter(100).refill(), 10);
    }
}
