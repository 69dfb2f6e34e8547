/// A cancellation token used to stop a paginated listing between pages.
///
/// This is a type alias for [`tokio_util::sync::CancellationToken`]. Attach it
/// with [`Bucket::with_cancellation_token`](crate::Bucket::with_cancellation_token)
/// and call [`cancel()`](tokio_util::sync::CancellationToken::cancel) on it
/// (e.g., in a Ctrl+C handler) to abort a running enumeration.
pub type ListingCancellationToken = tokio_util::sync::CancellationToken;

/// Create a new [`ListingCancellationToken`].
///
/// # Example
///
/// ```
/// use s3bucket_rs::create_listing_cancellation_token;
///
/// let token = create_listing_cancellation_token();
/// assert!(!token.is_cancelled());
///
/// token.cancel();
/// assert!(token.is_cancelled());
/// ```
pub fn create_listing_cancellation_token() -> ListingCancellationToken {
    tokio_util::sync::CancellationToken::new()
}
