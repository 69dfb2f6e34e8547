use crate::config::{CLITimeoutConfig, ClientConfig, Config, RetryConfig, TracingConfig};
use crate::params::{DEFAULT_BUCKET_ACL, DEFAULT_PAGING_DELAY_MILLISECONDS};
use crate::types::{AccessKeys, ClientConfigLocation, S3Credentials, UploadFile};
use aws_smithy_types::checksum_config::RequestChecksumCalculation;
use clap::builder::NonEmptyStringValueParser;
use clap::{Parser, Subcommand};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

pub mod value_parser;


// ---------------------------------------------------------------------------
// Default constants
// ---------------------------------------------------------------------------

const DEFAULT_AWS_MAX_ATTEMPTS: u32 = crate::config::DEFAULT_AWS_MAX_ATTEMPTS;
const DEFAULT_INITIAL_BACKOFF_MILLISECONDS: u64 = crate::config::DEFAULT_INITIAL_BACKOFF_MILLISECONDS;
const DEFAULT_JSON_TRACING: bool = false;
const DEFAULT_AWS_SDK_TRACING: bool = false;
const DEFAULT_SPAN_EVENTS_TRACING: bool = false;
const DEFAULT_DISABLE_COLOR_TRACING: bool = false;
const DEFAULT_FORCE_PATH_STYLE: bool = false;
const DEFAULT_ACCELERATE: bool = false;
const DEFAULT_DISABLE_STALLED_STREAM_PROTECTION: bool = false;
const DEFAULT_UPLOAD_URL_EXPIRES_SECONDS: u64 = crate::params::DEFAULT_UPLOAD_URL_EXPIRES_SECONDS;

// ---------------------------------------------------------------------------
// Error messages
// ---------------------------------------------------------------------------

const ERROR_MESSAGE_BUCKET_REQUIRED: &str = "--bucket is required for this command.";
const ERROR_MESSAGE_RATE_LIMIT_ZERO: &str = "Rate limit must be at least 1 request per second.";
const ERROR_MESSAGE_SECRET_KEY_REQUIRED: &str =
    "--secret-key is required when --access-key is specified.";

// ---------------------------------------------------------------------------
// CLIArgs (clap-derived argument struct)
// ---------------------------------------------------------------------------

/// s3bucket - Amazon S3 bucket convenience client.
///
/// List versions, wipe every version or delete marker of a key, and upload
/// files one after another.
///
/// Example:
///   s3bucket --bucket my-bucket list-versions reports/2024.csv
///   s3bucket --bucket my-bucket delete-all-versions-and-markers reports/2024.csv
///   s3bucket --bucket my-bucket upload ./a.txt=dir/a.txt ./b.txt=dir/b.txt -v
#[derive(Parser, Clone, Debug)]
#[command(name = "s3bucket", version, about, long_about = None)]
pub struct CLIArgs {
    #[command(subcommand)]
    pub command: Command,

    // -----------------------------------------------------------------------
    // General options
    // -----------------------------------------------------------------------
    /// Bucket the commands operate on.
    #[arg(long, env, global = true, value_parser = NonEmptyStringValueParser::new(), help_heading = "General")]
    pub bucket: Option<String>,

    /// Canned ACL applied to uploads, copies and upload URLs.
    #[arg(long, env, global = true, default_value = DEFAULT_BUCKET_ACL, help_heading = "General")]
    pub bucket_acl: String,

    /// Wait between two listing pages in milliseconds.
    #[arg(long, env, global = true, default_value_t = DEFAULT_PAGING_DELAY_MILLISECONDS, help_heading = "General")]
    pub paging_delay_milliseconds: u64,

    /// Maximum S3 requests per second.
    #[arg(long, env, global = true, help_heading = "General")]
    pub rate_limit_requests: Option<u32>,

    // -----------------------------------------------------------------------
    // Logging options
    // -----------------------------------------------------------------------
    /// Verbosity level. -q (quiet), default (normal), -v, -vv, -vvv.
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Output logs in JSON format.
    #[arg(long, env, global = true, default_value_t = DEFAULT_JSON_TRACING, help_heading = "Logging")]
    pub json_tracing: bool,

    /// Enable AWS SDK tracing.
    #[arg(long, env, global = true, default_value_t = DEFAULT_AWS_SDK_TRACING, help_heading = "Logging")]
    pub aws_sdk_tracing: bool,

    /// Enable tracing span events.
    #[arg(long, env, global = true, default_value_t = DEFAULT_SPAN_EVENTS_TRACING, help_heading = "Logging")]
    pub span_events_tracing: bool,

    /// Disable colored output in logs.
    #[arg(long, env, global = true, default_value_t = DEFAULT_DISABLE_COLOR_TRACING, help_heading = "Logging")]
    pub disable_color_tracing: bool,

    // -----------------------------------------------------------------------
    // Retry options
    // -----------------------------------------------------------------------
    /// Maximum attempts of the AWS SDK retry policy.
    #[arg(long, env, global = true, default_value_t = DEFAULT_AWS_MAX_ATTEMPTS, help_heading = "Retry")]
    pub aws_max_attempts: u32,

    /// Initial backoff in milliseconds of the AWS SDK retry policy.
    #[arg(long, env, global = true, default_value_t = DEFAULT_INITIAL_BACKOFF_MILLISECONDS, help_heading = "Retry")]
    pub initial_backoff_milliseconds: u64,

    // -----------------------------------------------------------------------
    // Timeout options
    // -----------------------------------------------------------------------
    /// Overall operation timeout in milliseconds.
    #[arg(long, env, global = true, help_heading = "Timeout")]
    pub operation_timeout_milliseconds: Option<u64>,

    /// Per-attempt operation timeout in milliseconds.
    #[arg(long, env, global = true, help_heading = "Timeout")]
    pub operation_attempt_timeout_milliseconds: Option<u64>,

    /// Connection timeout in milliseconds.
    #[arg(long, env, global = true, help_heading = "Timeout")]
    pub connect_timeout_milliseconds: Option<u64>,

    /// Read timeout in milliseconds.
    #[arg(long, env, global = true, help_heading = "Timeout")]
    pub read_timeout_milliseconds: Option<u64>,

    // -----------------------------------------------------------------------
    // AWS configuration
    // -----------------------------------------------------------------------
    /// AWS config file path.
    #[arg(long, env, global = true, help_heading = "AWS")]
    pub aws_config_file: Option<PathBuf>,

    /// AWS shared credentials file path.
    #[arg(long, env, global = true, help_heading = "AWS")]
    pub aws_shared_credentials_file: Option<PathBuf>,

    /// AWS profile. If not set, uses the default credential chain.
    #[arg(long, env, global = true, conflicts_with = "access_key", value_parser = NonEmptyStringValueParser::new(), help_heading = "AWS")]
    pub profile: Option<String>,

    /// AWS access key ID.
    #[arg(long, env, global = true, value_parser = NonEmptyStringValueParser::new(), help_heading = "AWS")]
    pub access_key: Option<String>,

    /// AWS secret access key.
    #[arg(long, env, global = true, value_parser = NonEmptyStringValueParser::new(), help_heading = "AWS")]
    pub secret_key: Option<String>,

    /// AWS session token.
    #[arg(long, env, global = true, value_parser = NonEmptyStringValueParser::new(), help_heading = "AWS")]
    pub session_token: Option<String>,

    /// AWS region.
    #[arg(long, env, global = true, value_parser = NonEmptyStringValueParser::new(), help_heading = "AWS")]
    pub region: Option<String>,

    /// Custom S3-compatible endpoint URL (e.g. MinIO, Wasabi).
    #[arg(long, env, global = true, value_parser = value_parser::url::check_scheme, help_heading = "AWS")]
    pub endpoint_url: Option<String>,

    /// Force path-style access (required for some S3-compatible services).
    #[arg(long, env, global = true, default_value_t = DEFAULT_FORCE_PATH_STYLE, help_heading = "AWS")]
    pub force_path_style: bool,

    /// Enable S3 Transfer Acceleration.
    #[arg(long, env, global = true, default_value_t = DEFAULT_ACCELERATE, help_heading = "AWS")]
    pub accelerate: bool,

    /// Disable stalled stream protection.
    #[arg(long, env, global = true, default_value_t = DEFAULT_DISABLE_STALLED_STREAM_PROTECTION, help_heading = "AWS")]
    pub disable_stalled_stream_protection: bool,
}

/// Operations exposed by the `s3bucket` binary.
#[derive(Subcommand, Clone, Debug, PartialEq)]
pub enum Command {
    /// List the buckets of the account.
    ListBuckets,

    /// List every version and delete marker of a key (or key prefix).
    ListVersions {
        key: String,
        /// Page size of each listing request.
        #[arg(long)]
        limit: Option<i32>,
        /// Wait between pages in milliseconds (defaults to --paging-delay-milliseconds).
        #[arg(long)]
        delay: Option<u64>,
    },

    /// List every object under a prefix.
    ListFiles {
        #[arg(long, value_parser = NonEmptyStringValueParser::new())]
        prefix: Option<String>,
        #[arg(long)]
        limit: Option<i32>,
        #[arg(long)]
        delay: Option<u64>,
    },

    /// Delete every version of a key. Delete markers are kept.
    DeleteAllVersions { key: String },

    /// Delete every delete marker of a key. Versions are kept.
    DeleteAllMarkers { key: String },

    /// Delete every version and every delete marker of a key.
    DeleteAllVersionsAndMarkers { key: String },

    /// Delete the given keys (no version ids).
    DeleteFiles {
        #[arg(required = true, value_parser = NonEmptyStringValueParser::new())]
        keys: Vec<String>,
    },

    /// Upload files one after another, in the given order.
    Upload {
        /// PATH=KEY entries.
        #[arg(required = true, value_parser = value_parser::upload_file::parse_upload_file)]
        files: Vec<UploadFile>,
    },

    /// Server-side copy of an object into the bucket.
    Copy {
        /// source-bucket/source-key
        source: String,
        key: String,
    },

    /// Create a presigned PutObject URL.
    UploadUrl {
        key: String,
        #[arg(long)]
        content_type: String,
        /// Expiry in seconds.
        #[arg(long, default_value_t = DEFAULT_UPLOAD_URL_EXPIRES_SECONDS)]
        expires: u64,
    },
}

impl Command {
    fn requires_bucket(&self) -> bool {
        !matches!(self, Command::ListBuckets)
    }
}

// ---------------------------------------------------------------------------
// parse_from_args (public API)
// ---------------------------------------------------------------------------

/// Parse command-line arguments into a `CLIArgs` struct.
///
/// # Example
///
/// ```
/// use s3bucket_rs::config::args::{parse_from_args, Command};
///
/// let args = vec!["s3bucket", "--bucket", "my-bucket", "delete-all-markers", "a.txt"];
/// let cli_args = parse_from_args(args).unwrap();
/// assert_eq!(
///     cli_args.command,
///     Command::DeleteAllMarkers { key: "a.txt".to_string() }
/// );
/// ```
pub fn parse_from_args<I, T>(args: I) -> Result<CLIArgs, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    CLIArgs::try_parse_from(args)
}

/// Parse arguments and build a Config in one step.
pub fn build_config_from_args<I, T>(args: I) -> Result<Config, String>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli_args = CLIArgs::try_parse_from(args).map_err(|e| e.to_string())?;
    Config::try_from(cli_args)
}

// ---------------------------------------------------------------------------
// Validation and Config conversion
// ---------------------------------------------------------------------------

impl CLIArgs {
    fn validate(&self) -> Result<(), String> {
        if self.command.requires_bucket() && self.bucket.is_none() {
            return Err(ERROR_MESSAGE_BUCKET_REQUIRED.to_string());
        }
        if self.rate_limit_requests == Some(0) {
            return Err(ERROR_MESSAGE_RATE_LIMIT_ZERO.to_string());
        }
        if self.access_key.is_some() && self.secret_key.is_none() {
            return Err(ERROR_MESSAGE_SECRET_KEY_REQUIRED.to_string());
        }
        Ok(())
    }

    fn build_client_config(&self) -> ClientConfig {
        let credential = if let Some(ref profile) = self.profile {
            S3Credentials::Profile(profile.clone())
        } else if let Some(ref access_key) = self.access_key {
            S3Credentials::Credentials {
                access_keys: AccessKeys {
                    access_key: access_key.clone(),
                    secret_access_key: self.secret_key.clone().unwrap_or_default(),
                    session_token: self.session_token.clone(),
                },
            }
        } else {
            S3Credentials::FromEnvironment
        };

        ClientConfig {
            client_config_location: ClientConfigLocation {
                aws_config_file: self.aws_config_file.clone(),
                aws_shared_credentials_file: self.aws_shared_credentials_file.clone(),
            },
            credential,
            region: self.region.clone(),
            endpoint_url: self.endpoint_url.clone(),
            force_path_style: self.force_path_style,
            accelerate: self.accelerate,
            retry_config: RetryConfig {
                aws_max_attempts: self.aws_max_attempts,
                initial_backoff_milliseconds: self.initial_backoff_milliseconds,
            },
            cli_timeout_config: CLITimeoutConfig {
                operation_timeout_milliseconds: self.operation_timeout_milliseconds,
                operation_attempt_timeout_milliseconds: self.operation_attempt_timeout_milliseconds,
                connect_timeout_milliseconds: self.connect_timeout_milliseconds,
                read_timeout_milliseconds: self.read_timeout_milliseconds,
            },
            disable_stalled_stream_protection: self.disable_stalled_stream_protection,
            request_checksum_calculation: RequestChecksumCalculation::WhenRequired,
        }
    }

    fn build_tracing_config(&self) -> Option<TracingConfig> {
        let log_level = self.verbosity.log_level()?;

        Some(TracingConfig {
            tracing_level: log_level,
            json_tracing: self.json_tracing,
            aws_sdk_tracing: self.aws_sdk_tracing,
            span_events_tracing: self.span_events_tracing,
            disable_color_tracing: self.disable_color_tracing,
        })
    }
}

impl TryFrom<CLIArgs> for Config {
    type Error = String;

    fn try_from(args: CLIArgs) -> Result<Self, Self::Error> {
        args.validate()?;

        Ok(Config {
            bucket_name: args.bucket.clone().unwrap_or_default(),
            bucket_acl: args.bucket_acl.clone(),
            paging_delay: Duration::from_millis(args.paging_delay_milliseconds),
            client_config: Some(args.build_client_config()),
            tracing_config: args.build_tracing_config(),
            rate_limit_requests: args.rate_limit_requests,
        })
    }
}
