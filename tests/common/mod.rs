//! In-memory versioned bucket for integration tests.
//!
//! Implements the public `StorageTrait` so that `Bucket` can be driven end to
//! end without AWS.

#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use aws_sdk_s3::types::{DeleteMarkerEntry, Object, ObjectVersion};

use s3bucket_rs::storage::{Storage, StorageTrait};
use s3bucket_rs::types::{
    BucketSummary, CopyResult, DeleteBatch, DeleteResult, DeletedKey, ObjectsPage,
    ObjectsPageRequest, Page, PageRequest, UploadResult, object_url,
};
use s3bucket_rs::{Bucket, BucketParams};

pub const BUCKET: &str = "workflow-bucket";

#[derive(Debug, Clone)]
struct Entry {
    key: String,
    version_id: String,
    delete_marker: bool,
}

#[derive(Default)]
struct State {
    entries: Vec<Entry>,
    version_pages: Vec<PageRequest>,
    delete_batches: usize,
    uploads: Vec<String>,
    next_version: u64,
    fail_after_pages: Option<usize>,
}

impl State {
    fn insert(&mut self, key: &str, delete_marker: bool) -> String {
        self.next_version += 1;
        let version_id = format!("{:08}", self.next_version);
        let position = self
            .entries
            .iter()
            .position(|e| e.key.as_str() >= key)
            .unwrap_or(self.entries.len());
        self.entries.insert(
            position,
            Entry {
                key: key.to_string(),
                version_id: version_id.clone(),
                delete_marker,
            },
        );
        version_id
    }
}

#[derive(Clone, Default)]
pub struct MemoryStorage {
    state: Arc<Mutex<State>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_version(&self, key: &str) -> String {
        self.state.lock().unwrap().insert(key, false)
    }

    pub fn put_delete_marker(&self, key: &str) -> String {
        self.state.lock().unwrap().insert(key, true)
    }

    /// Fail every versioned listing request after the first `pages`.
    pub fn fail_after_pages(&self, pages: usize) {
        self.state.lock().unwrap().fail_after_pages = Some(pages);
    }

    pub fn version_page_requests(&self) -> Vec<PageRequest> {
        self.state.lock().unwrap().version_pages.clone()
    }

    pub fn delete_batches(&self) -> usize {
        self.state.lock().unwrap().delete_batches
    }

    pub fn uploads(&self) -> Vec<String> {
        self.state.lock().unwrap().uploads.clone()
    }

    pub fn boxed(&self) -> Storage {
        Box::new(self.clone())
    }

    pub fn bucket(&self) -> Bucket {
        Bucket::new(
            BucketParams {
                access_key_id: Some("test_access_key".to_string()),
                secret_access_key: Some("test_secret_key".to_string()),
                region: Some("us-east-1".to_string()),
                bucket_name: Some(BUCKET.to_string()),
                paging_delay: Some(0),
                ..Default::default()
            },
            self.boxed(),
        )
        .unwrap()
    }
}

#[async_trait]
impl StorageTrait for MemoryStorage {
    async fn list_object_versions_page(&self, request: &PageRequest) -> Result<Page> {
        let mut state = self.state.lock().unwrap();
        state.version_pages.push(request.clone());
        if let Some(limit) = state.fail_after_pages {
            if state.version_pages.len() > limit {
                return Err(anyhow!("SlowDown: please reduce your request rate"));
            }
        }

        let matching: Vec<&Entry> = state
            .entries
            .iter()
            .filter(|e| {
                request
                    .prefix
                    .as_deref()
                    .is_none_or(|prefix| e.key.starts_with(prefix))
            })
            .collect();
        let start = match &request.marker {
            Some(marker) => matching
                .iter()
                .position(|e| {
                    e.key == marker.key_marker && e.version_id == marker.version_id_marker
                })
                .map_or(matching.len(), |i| i + 1),
            None => 0,
        };
        let end = (start + request.max_keys.unwrap_or(1000) as usize).min(matching.len());

        let mut page = Page {
            is_truncated: end < matching.len(),
            ..Default::default()
        };
        for entry in &matching[start..end] {
            if entry.delete_marker {
                page.delete_markers.push(
                    DeleteMarkerEntry::builder()
                        .key(&entry.key)
                        .version_id(&entry.version_id)
                        .build(),
                );
            } else {
                page.versions.push(
                    ObjectVersion::builder()
                        .key(&entry.key)
                        .version_id(&entry.version_id)
                        .build(),
                );
            }
        }
        if page.is_truncated {
            let last = matching[end - 1];
            page.next_key_marker = Some(last.key.clone());
            page.next_version_id_marker = Some(last.version_id.clone());
        }
        Ok(page)
    }

    async fn list_objects_page(&self, request: &ObjectsPageRequest) -> Result<ObjectsPage> {
        let state = self.state.lock().unwrap();
        let mut contents: Vec<Object> = vec![];
        let mut seen: Option<&str> = None;
        for entry in &state.entries {
            if seen == Some(entry.key.as_str()) {
                continue;
            }
            seen = Some(entry.key.as_str());
            let in_prefix = request
                .prefix
                .as_deref()
                .is_none_or(|prefix| entry.key.starts_with(prefix));
            if !entry.delete_marker && in_prefix {
                contents.push(Object::builder().key(&entry.key).build());
            }
        }
        Ok(ObjectsPage {
            contents,
            is_truncated: false,
            next_continuation_token: None,
        })
    }

    async fn delete_objects(&self, _bucket: &str, batch: DeleteBatch) -> Result<DeleteResult> {
        let mut state = self.state.lock().unwrap();
        state.delete_batches += 1;
        let mut result = DeleteResult::default();
        for file in batch.files {
            state
                .entries
                .retain(|e| !(e.key == file.key && e.version_id == file.version_id));
            result.deleted.push(DeletedKey {
                key: file.key,
                version_id: Some(file.version_id),
            });
        }
        Ok(result)
    }

    async fn delete_keys(&self, _bucket: &str, keys: Vec<String>) -> Result<DeleteResult> {
        let mut state = self.state.lock().unwrap();
        let mut result = DeleteResult::default();
        for key in keys {
            let version_id = state.insert(&key, true);
            result.deleted.push(DeletedKey {
                key,
                version_id: Some(version_id),
            });
        }
        Ok(result)
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        _file_path: &Path,
        _content_length: i64,
        _acl: &str,
    ) -> Result<UploadResult> {
        let mut state = self.state.lock().unwrap();
        state.uploads.push(key.to_string());
        let version_id = state.insert(key, false);
        Ok(UploadResult {
            key: key.to_string(),
            e_tag: None,
            version_id: Some(version_id),
            url: object_url(bucket, key),
        })
    }

    async fn copy_object(
        &self,
        bucket: &str,
        _copy_source: &str,
        key: &str,
        _acl: &str,
    ) -> Result<CopyResult> {
        let version_id = self.state.lock().unwrap().insert(key, false);
        Ok(CopyResult {
            key: key.to_string(),
            e_tag: None,
            copy_source_version_id: None,
            version_id: Some(version_id),
            url: object_url(bucket, key),
        })
    }

    async fn presign_put_object(
        &self,
        bucket: &str,
        key: &str,
        _content_type: &str,
        _acl: &str,
        expires_in: Duration,
    ) -> Result<String> {
        Ok(format!(
            "{}?X-Amz-Expires={}",
            object_url(bucket, key),
            expires_in.as_secs()
        ))
    }

    async fn list_buckets(&self) -> Result<Vec<BucketSummary>> {
        Ok(vec![BucketSummary {
            name: BUCKET.to_string(),
            creation_date: None,
        }])
    }
}
