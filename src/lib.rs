/*!
# Overview
s3bucket-rs is a convenience client for a single Amazon S3 bucket.
It wraps the handful of bucket operations that are tedious to get right by hand,
most of all on versioned buckets.

## Features
- **Versioned listing**: Walks every page of `ListObjectVersions` with a configurable pause between pages
- **Version cleanup**: Removes every version and/or delete marker of a key in one call
- **Sequential uploads**: Uploads a list of files one at a time, results in input order
- **Signed URLs**: Presigned `PutObject` URLs for browser uploads
- **Cancellation**: Long listings stop cleanly at a page boundary

## As a Library
The s3bucket CLI is a thin wrapper over the s3bucket-rs library.

Example usage
=============

```toml
[dependencies]
s3bucket-rs = "0.1"
tokio = { version = "1", features = ["full"] }
```

```no_run
use s3bucket_rs::{Bucket, BucketParams, ListVersionsParams};

#[tokio::main]
async fn main() {
    let bucket = Bucket::connect(BucketParams {
        access_key_id: Some("AKIA...".to_string()),
        secret_access_key: Some("secret".to_string()),
        region: Some("us-east-1".to_string()),
        bucket_name: Some("my-bucket".to_string()),
        ..Default::default()
    })
    .await
    .unwrap();

    let listing = bucket
        .list_file_versions(ListVersionsParams::for_key("reports/"))
        .await
        .unwrap();
    println!(
        "{} versions, {} delete markers",
        listing.versions.len(),
        listing.delete_markers.len()
    );
}
```
*/

#![allow(clippy::collapsible_if)]

pub mod bucket;
pub mod config;
pub mod deleter;
pub mod lister;
pub mod params;
pub mod storage;
pub mod types;
pub mod uploader;

#[cfg(test)]
pub(crate) mod test_utils;

pub use bucket::Bucket;
pub use config::Config;
pub use config::args::CLIArgs;
pub use deleter::DeleteTarget;
pub use params::{
    BucketParams, CopyFileParams, ListFilesParams, ListVersionsParams, UploadFileParams,
    UploadUrlParams,
};
pub use types::error::{
    S3BucketError, exit_code_from_error, is_cancelled_error, is_validation_error,
};
pub use types::token::{ListingCancellationToken, create_listing_cancellation_token};
pub use types::{
    AccessKeys, DeleteBatch, DeleteResult, EnumerationResult, Page, UploadFile, UploadResult,
    VersionEntry,
};
