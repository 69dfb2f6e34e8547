//! Shared test utilities for the s3bucket library crate.
//!
//! `MockStorage` is an in-memory versioned bucket implementing
//! [`StorageTrait`]. It orders entries the way S3 does (keys ascending, newest
//! version first), paginates with key/version-id markers and records every call
//! so tests can assert on the exact requests issued.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use aws_sdk_s3::primitives::DateTime;
use aws_sdk_s3::types::{DeleteMarkerEntry, Object, ObjectVersion};

use crate::storage::{Storage, StorageTrait};
use crate::types::token::ListingCancellationToken;
use crate::types::{
    BucketSummary, CopyResult, DeleteBatch, DeleteResult, DeletedKey, ObjectsPage,
    ObjectsPageRequest, Page, PageRequest, UploadResult, object_url,
};

pub(crate) const TEST_BUCKET: &str = "test-bucket";

/// Initialise a dummy tracing subscriber for tests.
///
/// Uses `try_init` so that only the first call in a process actually
/// installs the subscriber; subsequent calls are silently ignored.
pub(crate) fn init_dummy_tracing_subscriber() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("dummy=trace")
        .try_init();
}

pub(crate) fn make_version(key: &str, version_id: &str) -> ObjectVersion {
    ObjectVersion::builder()
        .key(key)
        .version_id(version_id)
        .size(1)
        .last_modified(DateTime::from_secs(1000))
        .build()
}

pub(crate) fn make_delete_marker(key: &str, version_id: &str) -> DeleteMarkerEntry {
    DeleteMarkerEntry::builder()
        .key(key)
        .version_id(version_id)
        .last_modified(DateTime::from_secs(1000))
        .build()
}

/// A call received by [`MockStorage`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    ListVersions(PageRequest),
    ListObjects(ObjectsPageRequest),
    DeleteObjects {
        bucket: String,
        batch: DeleteBatch,
    },
    DeleteKeys {
        bucket: String,
        keys: Vec<String>,
    },
    PutObject {
        bucket: String,
        key: String,
        file_path: PathBuf,
        content_length: i64,
        acl: String,
    },
    CopyObject {
        bucket: String,
        copy_source: String,
        key: String,
        acl: String,
    },
    PresignPutObject {
        bucket: String,
        key: String,
        content_type: String,
        acl: String,
        expires_in: Duration,
    },
    ListBuckets,
}

#[derive(Debug, Clone, PartialEq)]
struct MockEntry {
    key: String,
    version_id: String,
    delete_marker: bool,
}

#[derive(Default)]
struct MockState {
    entries: Vec<MockEntry>,
    calls: Vec<Call>,
    next_version: u64,
    scripted_pages: Option<VecDeque<Page>>,
    fail_list_versions_at: Option<usize>,
    fail_put_key: Option<String>,
    stall_listings: bool,
    cancel_after_put: Option<(String, ListingCancellationToken)>,
}

impl MockState {
    fn list_versions_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, Call::ListVersions(_)))
            .count()
    }

    fn insert(&mut self, key: &str, delete_marker: bool) -> String {
        self.next_version += 1;
        let version_id = format!("v{}", self.next_version);
        // Newest version first within a key.
        let position = self
            .entries
            .iter()
            .position(|e| e.key.as_str() >= key)
            .unwrap_or(self.entries.len());
        self.entries.insert(
            position,
            MockEntry {
                key: key.to_string(),
                version_id: version_id.clone(),
                delete_marker,
            },
        );
        version_id
    }

    fn paginate(&self, request: &PageRequest) -> Page {
        let filtered: Vec<&MockEntry> = self
            .entries
            .iter()
            .filter(|e| match &request.prefix {
                Some(prefix) => e.key.starts_with(prefix.as_str()),
                None => true,
            })
            .collect();

        let start = match &request.marker {
            Some(marker) => filtered
                .iter()
                .position(|e| {
                    e.key == marker.key_marker && e.version_id == marker.version_id_marker
                })
                .map(|i| i + 1)
                .unwrap_or_else(|| {
                    filtered
                        .iter()
                        .position(|e| e.key > marker.key_marker)
                        .unwrap_or(filtered.len())
                }),
            None => 0,
        };
        let max_keys = request.max_keys.unwrap_or(1000) as usize;
        let end = (start + max_keys).min(filtered.len());
        let taken = &filtered[start..end];
        let is_truncated = end < filtered.len();

        let mut page = Page {
            is_truncated,
            ..Default::default()
        };
        for (i, entry) in taken.iter().enumerate() {
            let is_latest = filtered
                .iter()
                .position(|e| e.key == entry.key)
                .is_some_and(|first| first == start + i);
            if entry.delete_marker {
                page.delete_markers.push(
                    DeleteMarkerEntry::builder()
                        .key(&entry.key)
                        .version_id(&entry.version_id)
                        .is_latest(is_latest)
                        .build(),
                );
            } else {
                page.versions.push(
                    ObjectVersion::builder()
                        .key(&entry.key)
                        .version_id(&entry.version_id)
                        .is_latest(is_latest)
                        .build(),
                );
            }
        }
        if is_truncated {
            if let Some(last) = taken.last() {
                page.next_key_marker = Some(last.key.clone());
                page.next_version_id_marker = Some(last.version_id.clone());
            }
        }
        page
    }
}

/// In-memory versioned bucket. Clones share state.
#[derive(Clone, Default)]
pub(crate) struct MockStorage {
    state: Arc<Mutex<MockState>>,
}

impl MockStorage {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Serve these pages, in order, instead of paginating the in-memory bucket.
    pub(crate) fn with_pages(pages: Vec<Page>) -> Self {
        let storage = Self::new();
        storage.state.lock().unwrap().scripted_pages = Some(pages.into());
        storage
    }

    pub(crate) fn boxed(&self) -> Storage {
        Box::new(self.clone())
    }

    pub(crate) fn add_version(&self, key: &str) -> String {
        self.state.lock().unwrap().insert(key, false)
    }

    pub(crate) fn add_delete_marker(&self, key: &str) -> String {
        self.state.lock().unwrap().insert(key, true)
    }

    /// Fail the `n`-th (0-based) versioned listing request.
    pub(crate) fn fail_list_versions_at(&self, n: usize) {
        self.state.lock().unwrap().fail_list_versions_at = Some(n);
    }

    /// Make every listing request hang forever once it has been recorded.
    pub(crate) fn stall_listings(&self) {
        self.state.lock().unwrap().stall_listings = true;
    }

    /// Cancel `token` right after `key` has been stored.
    pub(crate) fn cancel_after_put(&self, key: &str, token: ListingCancellationToken) {
        self.state.lock().unwrap().cancel_after_put = Some((key.to_string(), token));
    }

    pub(crate) fn fail_put_object_for(&self, key: &str) {
        self.state.lock().unwrap().fail_put_key = Some(key.to_string());
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub(crate) fn list_version_requests(&self) -> Vec<PageRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::ListVersions(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn delete_calls(&self) -> Vec<DeleteBatch> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::DeleteObjects { batch, .. } => Some(batch),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn put_keys(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::PutObject { key, .. } => Some(key),
                _ => None,
            })
            .collect()
    }

    /// (key, version id, is delete marker) in listing order.
    pub(crate) fn entries(&self) -> Vec<(String, String, bool)> {
        self.state
            .lock()
            .unwrap()
            .entries
            .iter()
            .map(|e| (e.key.clone(), e.version_id.clone(), e.delete_marker))
            .collect()
    }
}

#[async_trait]
impl StorageTrait for MockStorage {
    async fn list_object_versions_page(&self, request: &PageRequest) -> Result<Page> {
        let (call_index, stalled) = {
            let mut state = self.state.lock().unwrap();
            let call_index = state.list_versions_count();
            state.calls.push(Call::ListVersions(request.clone()));
            (call_index, state.stall_listings)
        };
        if stalled {
            std::future::pending::<()>().await;
        }

        let mut state = self.state.lock().unwrap();
        if state.fail_list_versions_at == Some(call_index) {
            return Err(anyhow!("InternalError: injected ListObjectVersions failure"));
        }

        if let Some(pages) = state.scripted_pages.as_mut() {
            return pages
                .pop_front()
                .ok_or_else(|| anyhow!("no scripted page left"));
        }

        Ok(state.paginate(request))
    }

    async fn list_objects_page(&self, request: &ObjectsPageRequest) -> Result<ObjectsPage> {
        let stalled = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(Call::ListObjects(request.clone()));
            state.stall_listings
        };
        if stalled {
            std::future::pending::<()>().await;
        }

        let state = self.state.lock().unwrap();

        let mut current: Vec<&MockEntry> = vec![];
        for entry in &state.entries {
            if current.last().is_some_and(|e| e.key == entry.key) {
                continue;
            }
            current.push(entry);
        }
        let objects: Vec<Object> = current
            .into_iter()
            .filter(|e| !e.delete_marker)
            .filter(|e| match &request.prefix {
                Some(prefix) => e.key.starts_with(prefix.as_str()),
                None => true,
            })
            .map(|e| Object::builder().key(&e.key).size(1).build())
            .collect();

        let start = match &request.continuation_token {
            Some(token) => token.parse::<usize>()?,
            None => 0,
        };
        let max_keys = request.max_keys.unwrap_or(1000) as usize;
        let end = (start + max_keys).min(objects.len());
        let is_truncated = end < objects.len();

        Ok(ObjectsPage {
            contents: objects[start..end].to_vec(),
            is_truncated,
            next_continuation_token: is_truncated.then(|| end.to_string()),
        })
    }

    async fn delete_objects(&self, bucket: &str, batch: DeleteBatch) -> Result<DeleteResult> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::DeleteObjects {
            bucket: bucket.to_string(),
            batch: batch.clone(),
        });

        let mut result = DeleteResult::default();
        for entry in batch.files {
            state
                .entries
                .retain(|e| !(e.key == entry.key && e.version_id == entry.version_id));
            result.deleted.push(DeletedKey {
                key: entry.key,
                version_id: Some(entry.version_id),
            });
        }
        Ok(result)
    }

    async fn delete_keys(&self, bucket: &str, keys: Vec<String>) -> Result<DeleteResult> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::DeleteKeys {
            bucket: bucket.to_string(),
            keys: keys.clone(),
        });

        let mut result = DeleteResult::default();
        for key in keys {
            state.insert(&key, true);
            result.deleted.push(DeletedKey {
                key,
                version_id: None,
            });
        }
        Ok(result)
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        file_path: &Path,
        content_length: i64,
        acl: &str,
    ) -> Result<UploadResult> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::PutObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
            file_path: file_path.to_path_buf(),
            content_length,
            acl: acl.to_string(),
        });

        if state.fail_put_key.as_deref() == Some(key) {
            return Err(anyhow!("AccessDenied: injected PutObject failure"));
        }

        let version_id = state.insert(key, false);
        if let Some((cancel_key, token)) = &state.cancel_after_put {
            if cancel_key == key {
                token.cancel();
            }
        }
        Ok(UploadResult {
            key: key.to_string(),
            e_tag: Some(format!("\"etag-{version_id}\"")),
            version_id: Some(version_id),
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
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::CopyObject {
            bucket: bucket.to_string(),
            copy_source: copy_source.to_string(),
            key: key.to_string(),
            acl: acl.to_string(),
        });

        let version_id = state.insert(key, false);
        Ok(CopyResult {
            key: key.to_string(),
            e_tag: Some(format!("\"etag-{version_id}\"")),
            copy_source_version_id: None,
            version_id: Some(version_id),
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
        self.state
            .lock()
            .unwrap()
            .calls
            .push(Call::PresignPutObject {
                bucket: bucket.to_string(),
                key: key.to_string(),
                content_type: content_type.to_string(),
                acl: acl.to_string(),
                expires_in,
            });

        Ok(format!(
            "{}?X-Amz-Expires={}",
            object_url(bucket, key),
            expires_in.as_secs()
        ))
    }

    async fn list_buckets(&self) -> Result<Vec<BucketSummary>> {
        self.state.lock().unwrap().calls.push(Call::ListBuckets);

        Ok(vec![BucketSummary {
            name: TEST_BUCKET.to_string(),
            creation_date: Some(DateTime::from_secs(1000)),
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VersionMarker;

    #[tokio::test]
    async fn mock_orders_newest_version_first() {
        let storage = MockStorage::new();
        storage.add_version("b");
        storage.add_version("a");
        storage.add_delete_marker("a");

        let entries = storage.entries();
        assert_eq!(
            entries,
            vec![
                ("a".to_string(), "v3".to_string(), true),
                ("a".to_string(), "v2".to_string(), false),
                ("b".to_string(), "v1".to_string(), false),
            ]
        );
    }

    #[tokio::test]
    async fn mock_paginates_with_markers() {
        let storage = MockStorage::new();
        storage.add_version("a");
        storage.add_version("a");

        let mut request = PageRequest::new(TEST_BUCKET);
        request.max_keys = Some(1);
        let page = storage.list_object_versions_page(&request).await.unwrap();
        assert!(page.is_truncated);
        assert_eq!(page.versions[0].version_id(), Some("v2"));

        request.advance(VersionMarker::from_parts(
            page.next_key_marker.as_deref(),
            page.next_version_id_marker.as_deref(),
        )
        .unwrap());
        let page = storage.list_object_versions_page(&request).await.unwrap();
        assert!(!page.is_truncated);
        assert_eq!(page.versions[0].version_id(), Some("v1"));
        assert!(page.next_key_marker.is_none());
    }
}
