pub mod args;

use std::time::Duration;

use aws_smithy_types::checksum_config::RequestChecksumCalculation;

use crate::params::{DEFAULT_BUCKET_ACL, DEFAULT_PAGING_DELAY_MILLISECONDS};
use crate::types::{ClientConfigLocation, S3Credentials};

pub const DEFAULT_AWS_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_INITIAL_BACKOFF_MILLISECONDS: u64 = 100;

/// Configuration of one [`Bucket`](crate::Bucket).
///
/// Each `Bucket` owns its `Config`. Updating credentials, region or bucket name
/// produces a new `Bucket` with a new `Config`; nothing is shared process-wide.
///
/// # Quick Start
///
/// ```
/// use s3bucket_rs::Config;
/// use std::time::Duration;
///
/// let config = Config::for_bucket("my-bucket");
/// assert_eq!(config.bucket_acl, "public-read");
/// assert_eq!(config.paging_delay, Duration::from_millis(500));
/// ```
///
/// Library users that already hold explicit keys usually go through
/// [`BucketParams`](crate::BucketParams) instead, which validates the required
/// fields and builds this struct.
#[derive(Debug, Clone)]
pub struct Config {
    pub bucket_name: String,
    /// Canned ACL applied to uploads, copies and signed URLs unless overridden.
    pub bucket_acl: String,
    /// Wait between two page requests of a paginated listing.
    pub paging_delay: Duration,
    pub client_config: Option<ClientConfig>,
    pub tracing_config: Option<TracingConfig>,
    /// Maximum S3 requests per second issued by this client.
    pub rate_limit_requests: Option<u32>,
}

impl Config {
    /// Create a `Config` with defaults for the given bucket.
    ///
    /// Credentials and region are loaded from the environment
    /// (`client_config: None`).
    pub fn for_bucket(bucket_name: &str) -> Self {
        Config {
            bucket_name: bucket_name.to_string(),
            ..Config::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bucket_name: String::new(),
            bucket_acl: DEFAULT_BUCKET_ACL.to_string(),
            paging_delay: Duration::from_millis(DEFAULT_PAGING_DELAY_MILLISECONDS),
            client_config: None,
            tracing_config: None,
            rate_limit_requests: None,
        }
    }
}

/// AWS S3 client configuration.
///
/// Credential loading, region, endpoint, retry and timeout settings handed to
/// the SDK when the client is built.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub client_config_location: ClientConfigLocation,
    pub credential: S3Credentials,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
    pub accelerate: bool,
    pub retry_config: RetryConfig,
    pub cli_timeout_config: CLITimeoutConfig,
    pub disable_stalled_stream_protection: bool,
    pub request_checksum_calculation: RequestChecksumCalculation,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            client_config_location: ClientConfigLocation::default(),
            credential: S3Credentials::FromEnvironment,
            region: None,
            endpoint_url: None,
            force_path_style: false,
            accelerate: false,
            retry_config: RetryConfig::default(),
            cli_timeout_config: CLITimeoutConfig::default(),
            disable_stalled_stream_protection: false,
            request_checksum_calculation: RequestChecksumCalculation::WhenRequired,
        }
    }
}

/// Retry configuration for AWS SDK operations.
///
/// This crate never retries on its own; these values only tune the SDK's
/// standard retry policy.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub aws_max_attempts: u32,
    pub initial_backoff_milliseconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            aws_max_attempts: DEFAULT_AWS_MAX_ATTEMPTS,
            initial_backoff_milliseconds: DEFAULT_INITIAL_BACKOFF_MILLISECONDS,
        }
    }
}

/// Timeout configuration for AWS SDK operations.
#[derive(Debug, Clone, Default)]
pub struct CLITimeoutConfig {
    pub operation_timeout_milliseconds: Option<u64>,
    pub operation_attempt_timeout_milliseconds: Option<u64>,
    pub connect_timeout_milliseconds: Option<u64>,
    pub read_timeout_milliseconds: Option<u64>,
}

/// Tracing (logging) configuration used by the binary.
#[derive(Debug, Clone, Copy)]
pub struct TracingConfig {
    pub tracing_level: log::Level,
    pub json_tracing: bool,
    pub aws_sdk_tracing: bool,
    pub span_events_tracing: bool,
    pub disable_color_tracing: bool,
}
