use std::future::Future;
use std::time::Duration;

use anyhow::{Result, anyhow};
use aws_sdk_s3::types::Object;
use tracing::{debug, trace};

use crate::storage::Storage;
use crate::types::error::S3BucketError;
use crate::types::token::ListingCancellationToken;
use crate::types::{EnumerationResult, ObjectsPage, ObjectsPageRequest, Page, PageRequest};

/// Enumerates every version and delete marker under a prefix.
///
/// Pages are fetched one after another with a fixed wait between them. The
/// listing either completes with every page accumulated, or fails with the
/// first error encountered; a partial result is never returned.
///
/// ```text
/// request(no marker) -> append -> truncated? -> wait -> request(marker) -> ...
///                                 \-> no: done
/// ```
pub struct VersionLister {
    target: Storage,
    cancellation_token: Option<ListingCancellationToken>,
}

impl VersionLister {
    pub fn new(target: Storage) -> Self {
        Self {
            target,
            cancellation_token: None,
        }
    }

    /// Abort the listing once `token` is cancelled, including a page request
    /// that is still in flight.
    pub fn with_cancellation_token(mut self, token: ListingCancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Fetch a single page.
    pub async fn list_page(&self, request: &PageRequest) -> Result<Page> {
        self.target.list_object_versions_page(request).await
    }

    /// Fetch every page starting from `request`, waiting `delay` between pages.
    ///
    /// A service that never reports a final page keeps this looping; only the
    /// cancellation token stops it.
    pub async fn list_all(
        &self,
        mut request: PageRequest,
        delay: Duration,
    ) -> Result<EnumerationResult> {
        debug!(
            bucket = %request.bucket,
            prefix = ?request.prefix,
            max_keys = ?request.max_keys,
            delay_ms = delay.as_millis() as u64,
            "versioned listing has started."
        );

        let mut result = EnumerationResult::default();
        let mut page_number: u64 = 0;

        loop {
            check_cancelled(self.cancellation_token.as_ref())?;

            page_number += 1;
            let page = until_cancelled(
                self.cancellation_token.as_ref(),
                self.target.list_object_versions_page(&request),
            )
            .await?;

            trace!(
                page_number = page_number,
                versions = page.versions.len(),
                delete_markers = page.delete_markers.len(),
                is_truncated = page.is_truncated,
                next_key_marker = ?page.next_key_marker,
                next_version_id_marker = ?page.next_version_id_marker,
                "version page received."
            );

            let is_truncated = page.is_truncated;
            let next_marker = page.next_marker();
            result.append_page(page);

            if !is_truncated {
                debug!(
                    pages = page_number,
                    versions = result.versions.len(),
                    delete_markers = result.delete_markers.len(),
                    "versioned listing has been completed."
                );
                return Ok(result);
            }

            let Some(marker) = next_marker else {
                return Err(anyhow!(S3BucketError::IncompletePageMarker));
            };

            wait_between_pages(self.cancellation_token.as_ref(), delay).await?;
            request.advance(marker);
        }
    }
}

/// Enumerates the current objects under a prefix with continuation tokens.
pub struct ObjectLister {
    target: Storage,
    cancellation_token: Option<ListingCancellationToken>,
}

impl ObjectLister {
    pub fn new(target: Storage) -> Self {
        Self {
            target,
            cancellation_token: None,
        }
    }

    pub fn with_cancellation_token(mut self, token: ListingCancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    pub async fn list_page(&self, request: &ObjectsPageRequest) -> Result<ObjectsPage> {
        self.target.list_objects_page(request).await
    }

    pub async fn list_all(
        &self,
        mut request: ObjectsPageRequest,
        delay: Duration,
    ) -> Result<Vec<Object>> {
        debug!(
            bucket = %request.bucket,
            prefix = ?request.prefix,
            max_keys = ?request.max_keys,
            "object listing has started."
        );

        let mut contents = vec![];
        let mut page_number: u64 = 0;

        loop {
            check_cancelled(self.cancellation_token.as_ref())?;

            page_number += 1;
            let page = until_cancelled(
                self.cancellation_token.as_ref(),
                self.target.list_objects_page(&request),
            )
            .await?;

            trace!(
                page_number = page_number,
                objects = page.contents.len(),
                is_truncated = page.is_truncated,
                "object page received."
            );

            contents.extend(page.contents);

            if !page.is_truncated {
                debug!(
                    pages = page_number,
                    objects = contents.len(),
                    "object listing has been completed."
                );
                return Ok(contents);
            }

            let Some(token) = page.next_continuation_token else {
                return Err(anyhow!(S3BucketError::IncompletePageMarker));
            };

            wait_between_pages(self.cancellation_token.as_ref(), delay).await?;
            request.continuation_token = Some(token);
        }
    }
}

fn check_cancelled(token: Option<&ListingCancellationToken>) -> Result<()> {
    if token.is_some_and(|token| token.is_cancelled()) {
        debug!("listing has been cancelled.");
        return Err(anyhow!(S3BucketError::Cancelled));
    }
    Ok(())
}

async fn until_cancelled<T>(
    token: Option<&ListingCancellationToken>,
    request: impl Future<Output = Result<T>>,
) -> Result<T> {
    match token {
        Some(token) => {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("listing has been cancelled while a page request was in flight.");
                    Err(anyhow!(S3BucketError::Cancelled))
                }
                result = request => result,
            }
        }
        None => request.await,
    }
}

async fn wait_between_pages(
    token: Option<&ListingCancellationToken>,
    delay: Duration,
) -> Result<()> {
    match token {
        Some(token) => {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("listing has been cancelled while waiting for the next page.");
                    Err(anyhow!(S3BucketError::Cancelled))
                }
                _ = tokio::time::sleep(delay) => Ok(()),
            }
        }
        None => {
            tokio::time::sleep(delay).await;
            Ok(())
        }
    }
}
