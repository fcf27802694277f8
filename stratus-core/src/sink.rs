//! Side-channel for background revalidation failures.

use crate::error::CacheError;

/// Receives errors from failed background revalidations.
///
/// A stale read never fails: when the refresh running behind it rejects,
/// there is no caller for the error to land on, so it is reported here
/// instead. The stale entry stays in place and is retried on the next
/// stale read.
///
/// Implementations are called from detached tasks and must not panic.
pub trait RevalidationErrorSink: Send + Sync + 'static {
    /// Called once per failed background revalidation.
    fn revalidation_failed(&self, key: &str, error: &CacheError);
}
