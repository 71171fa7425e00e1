use std::future::Future;

use crate::error::TransportError;

/// Fetches filter list bytes for a URL.
///
/// Timeouts and retries are the implementation's concern; the profile only
/// looks at the final result.
pub trait Transport: Send + Sync + Clone + 'static {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, TransportError>> + Send;
}
