use std::fmt;
use std::fmt::{Debug, Formatter};
use std::path::PathBuf;

use anyhow::{Result, anyhow};
use aws_sdk_s3::primitives::DateTime;
use aws_sdk_s3::types::{DeleteMarkerEntry, Object, ObjectVersion};
use chrono::Utc;
use zeroize_derive::{Zeroize, ZeroizeOnDrop};

use crate::types::error::S3BucketError;

pub mod error;
pub mod token;

/// Continuation marker for a versioned listing.
///
/// S3 rejects a version-id marker sent without its key marker, so the two
/// travel together: a request either carries a complete `VersionMarker` or
/// no marker at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionMarker {
    pub key_marker: String,
    pub version_id_marker: String,
}

impl VersionMarker {
    /// Pair the `NextKeyMarker` / `NextVersionIdMarker` of a page.
    ///
    /// Returns `None` unless both halves are present.
    pub fn from_parts(key_marker: Option<&str>, version_id_marker: Option<&str>) -> Option<Self> {
        match (key_marker, version_id_marker) {
            (Some(key_marker), Some(version_id_marker)) => Some(Self {
                key_marker: key_marker.to_string(),
                version_id_marker: version_id_marker.to_string(),
            }),
            _ => None,
        }
    }
}

/// One `ListObjectVersions` request.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub bucket: String,
    pub prefix: Option<String>,
    pub max_keys: Option<i32>,
    pub marker: Option<VersionMarker>,
}

impl PageRequest {
    pub fn new(bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            prefix: None,
            max_keys: None,
            marker: None,
        }
    }

    /// Carry the continuation marker of a truncated page into this request.
    pub fn advance(&mut self, marker: VersionMarker) {
        self.marker = Some(marker);
    }

    pub fn key_marker(&self) -> Option<&str> {
        self.marker.as_ref().map(|m| m.key_marker.as_str())
    }

    pub fn version_id_marker(&self) -> Option<&str> {
        self.marker.as_ref().map(|m| m.version_id_marker.as_str())
    }
}

/// One page of a `ListObjectVersions` response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub versions: Vec<ObjectVersion>,
    pub delete_markers: Vec<DeleteMarkerEntry>,
    pub is_truncated: bool,
    pub next_key_marker: Option<String>,
    pub next_version_id_marker: Option<String>,
}

impl Page {
    pub fn next_marker(&self) -> Option<VersionMarker> {
        VersionMarker::from_parts(
            self.next_key_marker.as_deref(),
            self.next_version_id_marker.as_deref(),
        )
    }
}

/// Versions and delete markers accumulated over every page of one listing.
///
/// Order follows page arrival, then in-page order. Entries are not
/// de-duplicated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnumerationResult {
    pub versions: Vec<ObjectVersion>,
    pub delete_markers: Vec<DeleteMarkerEntry>,
}

impl EnumerationResult {
    pub fn append_page(&mut self, page: Page) {
        self.versions.extend(page.versions);
        self.delete_markers.extend(page.delete_markers);
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty() && self.delete_markers.is_empty()
    }
}

/// A deletable (key, version-id) pair.
///
/// `version_id` may be the literal `"null"`, which S3 uses for objects
/// written while versioning was suspended. It is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionEntry {
    pub key: String,
    pub version_id: String,
}

impl VersionEntry {
    pub fn new(key: &str, version_id: &str) -> Self {
        Self {
            key: key.to_string(),
            version_id: version_id.to_string(),
        }
    }

    fn from_listing(kind: &str, key: Option<&str>, version_id: Option<&str>) -> Result<Self> {
        let key = match key {
            Some(key) if !key.is_empty() => key,
            _ => {
                return Err(anyhow!(S3BucketError::MalformedVersionEntry(format!(
                    "{kind} without a key"
                ))));
            }
        };
        let version_id = match version_id {
            Some(version_id) if !version_id.is_empty() => version_id,
            _ => {
                return Err(anyhow!(S3BucketError::MalformedVersionEntry(format!(
                    "{kind} '{key}' without a version id"
                ))));
            }
        };
        Ok(Self::new(key, version_id))
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.key.is_empty() {
            return Err(anyhow!(S3BucketError::InvalidFileEntry(
                "file key should be a non-empty string".to_string()
            )));
        }
        if self.version_id.is_empty() {
            return Err(anyhow!(S3BucketError::InvalidFileEntry(format!(
                "file '{}' should provide a version id",
                self.key
            ))));
        }
        Ok(())
    }
}

impl TryFrom<&ObjectVersion> for VersionEntry {
    type Error = anyhow::Error;

    fn try_from(version: &ObjectVersion) -> Result<Self> {
        Self::from_listing("object version", version.key(), version.version_id())
    }
}

impl TryFrom<&DeleteMarkerEntry> for VersionEntry {
    type Error = anyhow::Error;

    fn try_from(marker: &DeleteMarkerEntry) -> Result<Self> {
        Self::from_listing("delete marker", marker.key(), marker.version_id())
    }
}

/// Input of one batched versioned delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteBatch {
    pub files: Vec<VersionEntry>,
}

impl DeleteBatch {
    pub fn new(files: Vec<VersionEntry>) -> Self {
        Self { files }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Reject an empty batch or any entry without a key or version id.
    pub fn validate(&self) -> Result<()> {
        if self.files.is_empty() {
            return Err(anyhow!(S3BucketError::EmptyFileList));
        }
        self.files.iter().try_for_each(VersionEntry::validate)
    }
}

/// Result of a delete request, reporting which keys succeeded and which failed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteResult {
    pub deleted: Vec<DeletedKey>,
    pub errors: Vec<FailedKey>,
}

/// A successfully deleted key.
#[derive(Debug, Clone, PartialEq)]
pub struct DeletedKey {
    pub key: String,
    pub version_id: Option<String>,
}

/// A key that S3 refused to delete.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedKey {
    pub key: String,
    pub version_id: Option<String>,
    pub error_code: String,
    pub error_message: String,
}

/// One `ListObjectsV2` request.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectsPageRequest {
    pub bucket: String,
    pub prefix: Option<String>,
    pub max_keys: Option<i32>,
    pub continuation_token: Option<String>,
}

impl ObjectsPageRequest {
    pub fn new(bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            prefix: None,
            max_keys: None,
            continuation_token: None,
        }
    }
}

/// One page of a `ListObjectsV2` response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectsPage {
    pub contents: Vec<Object>,
    pub is_truncated: bool,
    pub next_continuation_token: Option<String>,
}

/// A local file and the key it is uploaded to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_path: PathBuf,
    pub key: String,
}

impl UploadFile {
    pub fn new(file_path: impl Into<PathBuf>, key: &str) -> Self {
        Self {
            file_path: file_path.into(),
            key: key.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadResult {
    pub key: String,
    pub e_tag: Option<String>,
    pub version_id: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CopyResult {
    pub key: String,
    pub e_tag: Option<String>,
    pub copy_source_version_id: Option<String>,
    pub version_id: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignedUploadUrl {
    pub signed_url: String,
    pub expires_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BucketSummary {
    pub name: String,
    pub creation_date: Option<DateTime>,
}

/// Public URL of an object in the virtual-hosted style.
pub fn object_url(bucket: &str, key: &str) -> String {
    format!("https://{bucket}.s3.amazonaws.com/{key}")
}

/// AWS configuration file locations.
#[derive(Debug, Clone, Default)]
pub struct ClientConfigLocation {
    pub aws_config_file: Option<PathBuf>,
    pub aws_shared_credentials_file: Option<PathBuf>,
}

/// AWS credential sources.
#[derive(Debug, Clone)]
pub enum S3Credentials {
    Profile(String),
    Credentials { access_keys: AccessKeys },
    FromEnvironment,
}

/// AWS access key pair with secure zeroization.
///
/// The secret_access_key and session_token are securely cleared from memory
/// when this struct is dropped, using the zeroize crate.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct AccessKeys {
    pub access_key: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl Debug for AccessKeys {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut keys = f.debug_struct("AccessKeys");
        let session_token = self
            .session_token
            .as_ref()
            .map_or("None", |_| "** redacted **");
        keys.field("access_key", &self.access_key)
            .field("secret_access_key", &"** redacted **")
            .field("session_token", &session_token);
        keys.finish()
    }
}
