//! Deletion workflows.
//!
//! [`VersionDeleter`] removes every version and/or delete marker stored under
//! one key: it enumerates the key, projects the listing into (key, version id)
//! pairs and hands them to the storage in a single `delete_objects` call.
//! [`KeyDeleter`] deletes caller-supplied keys or (key, version id) pairs
//! directly.

use std::time::Duration;

use anyhow::{Result, anyhow};
use tracing::{debug, info};

use crate::lister::VersionLister;
use crate::params::normalize_key_filter;
use crate::storage::Storage;
use crate::types::error::S3BucketError;
use crate::types::token::ListingCancellationToken;
use crate::types::{DeleteBatch, DeleteResult, EnumerationResult, PageRequest, VersionEntry};


/// Which entries of a listing a delete applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteTarget {
    pub versions: bool,
    pub markers: bool,
}

impl DeleteTarget {
    pub const VERSIONS: DeleteTarget = DeleteTarget {
        versions: true,
        markers: false,
    };
    pub const MARKERS: DeleteTarget = DeleteTarget {
        versions: false,
        markers: true,
    };
    pub const VERSIONS_AND_MARKERS: DeleteTarget = DeleteTarget {
        versions: true,
        markers: true,
    };
}

impl Default for DeleteTarget {
    fn default() -> Self {
        Self::VERSIONS
    }
}

/// Turn a listing into deletable entries.
///
/// Versions come first, then delete markers, each in listing order. An entry
/// without a key or version id fails the whole projection.
pub fn project_entries(
    listing: &EnumerationResult,
    target: DeleteTarget,
) -> Result<Vec<VersionEntry>> {
    let mut entries = vec![];

    if target.versions {
        for version in &listing.versions {
            entries.push(VersionEntry::try_from(version)?);
        }
    }
    if target.markers {
        for marker in &listing.delete_markers {
            entries.push(VersionEntry::try_from(marker)?);
        }
    }

    Ok(entries)
}

/// Deletes the versions and/or delete markers of one key.
pub struct VersionDeleter {
    target: Storage,
    bucket: String,
    paging_delay: Duration,
    cancellation_token: Option<ListingCancellationToken>,
}

impl VersionDeleter {
    pub fn new(target: Storage, bucket: &str, paging_delay: Duration) -> Self {
        Self {
            target,
            bucket: bucket.to_string(),
            paging_delay,
            cancellation_token: None,
        }
    }

    pub fn with_cancellation_token(mut self, token: ListingCancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Enumerate `key` and delete what `delete_target` selects.
    ///
    /// Nothing to delete returns an empty result without calling the storage.
    /// Running this twice on the same key is harmless.
    pub async fn delete_all(&self, key: &str, delete_target: DeleteTarget) -> Result<DeleteResult> {
        let prefix = normalize_key_filter(Some(key))?;

        let mut lister = VersionLister::new(self.target.clone());
        if let Some(token) = &self.cancellation_token {
            lister = lister.with_cancellation_token(token.clone());
        }

        let mut request = PageRequest::new(&self.bucket);
        request.prefix = prefix;
        let listing = lister.list_all(request, self.paging_delay).await?;

        let entries = project_entries(&listing, delete_target)?;
        if entries.is_empty() {
            debug!(
                key = key,
                versions = delete_target.versions,
                markers = delete_target.markers,
                "nothing to delete."
            );
            return Ok(DeleteResult::default());
        }

        debug!(
            key = key,
            entries = entries.len(),
            versions = delete_target.versions,
            markers = delete_target.markers,
            "deleting versions."
        );

        let result = self
            .target
            .delete_objects(&self.bucket, DeleteBatch::new(entries))
            .await?;

        info!(
            key = key,
            deleted = result.deleted.len(),
            errors = result.errors.len(),
            "versions have been deleted."
        );

        Ok(result)
    }
}

/// Deletes caller-supplied keys.
pub struct KeyDeleter {
    target: Storage,
    bucket: String,
}

impl KeyDeleter {
    pub fn new(target: Storage, bucket: &str) -> Self {
        Self {
            target,
            bucket: bucket.to_string(),
        }
    }

    /// Delete keys without version ids.
    ///
    /// On a versioned bucket this leaves a delete marker per key.
    pub async fn delete_files(&self, keys: Vec<String>) -> Result<DeleteResult> {
        if keys.is_empty() {
            return Err(anyhow!(S3BucketError::EmptyFileList));
        }
        if keys.iter().any(|key| key.is_empty()) {
            return Err(anyhow!(S3BucketError::InvalidFileEntry(
                "file key should be a non-empty string".to_string()
            )));
        }

        debug!(keys = keys.len(), "deleting files.");
        self.target.delete_keys(&self.bucket, keys).await
    }

    /// Delete exact (key, version id) pairs.
    pub async fn delete_files_versioned(&self, batch: DeleteBatch) -> Result<DeleteResult> {
        batch.validate()?;

        debug!(entries = batch.len(), "deleting file versions.");
        self.target.delete_objects(&self.bucket, batch).await
    }
}
