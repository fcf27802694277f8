//! Error types for cache operations.

use thiserror::Error;

/// Boxed error type accepted from fetchers.
///
/// The cache is agnostic to how a fetcher fails; whatever it returns is
/// stringified into [`CacheError::FetchFailed`] before being fanned out.
pub type FetchError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by cache reads.
///
/// Errors are `Clone` because one fetch settlement is broadcast to every
/// caller that joined the in-flight request; the reason is carried as a
/// `String` rather than a source error for the same reason.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    /// The fetcher for a cold key rejected. Nothing was written to the
    /// store; a pre-existing aged-out entry, if any, is left untouched.
    #[error("fetch for key `{key}` failed: {reason}")]
    FetchFailed { key: String, reason: String },

    /// The detached fetch task settled without producing a result, which
    /// means the fetcher panicked. Waiters receive this instead of hanging.
    #[error("fetch task for key `{key}` aborted before settling")]
    FetchAborted { key: String },
}

impl CacheError {
    /// Build a [`CacheError::FetchFailed`] from any displayable source.
    pub fn fetch_failed(key: impl Into<String>, source: impl std::fmt::Display) -> Self {
        Self::FetchFailed {
            key: key.into(),
            reason: source.to_string(),
        }
    }

    /// The key the failed fetch was for.
    pub fn key(&self) -> &str {
        match self {
            Self::FetchFailed { key, .. } => key,
            Self::FetchAborted { key } => key,
        }
    }
}

/// Result type alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;
