/// A cancellation token scoped to one browsing request.
///
/// This is a type alias for [`tokio_util::sync::CancellationToken`]. Cancelling
/// it aborts in-flight metadata lookups of the current page; objects whose
/// lookup had not finished keep `content_type = None`.
pub type RequestCancellationToken = tokio_util::sync::CancellationToken;

/// Create a new [`RequestCancellationToken`].
///
/// # Example
///
/// ```
/// use s3browse_rs::create_request_cancellation_token;
///
/// let token = create_request_cancellation_token();
/// assert!(!token.is_cancelled());
///
/// token.cancel();
/// assert!(token.is_cancelled());
/// ```
pub fn create_request_cancellation_token() -> RequestCancellationToken {
    tokio_util::sync::CancellationToken::new()
}
