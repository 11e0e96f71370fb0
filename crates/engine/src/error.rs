use cuido_core::error::CoreError;

use crate::store::StoreError;

/// Error type for engine operations.
///
/// Wraps [`CoreError`] for domain errors and [`StoreError`] for collaborator
/// failures, which are propagated as-is without retries.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A domain-level error from `cuido_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The durable store, profile collaborator or local storage failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Guest sync stopped part-way. The local buffer was left intact, so the
    /// sync can be re-run in full.
    #[error("Guest sync failed after {synced} of {total} answers: {source}")]
    Sync {
        synced: usize,
        total: usize,
        source: Box<EngineError>,
    },
}

/// Convenience type alias for engine return values.
pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// The domain error behind this error, looking through sync failures.
    pub fn core(&self) -> Option<&CoreError> {
        match self {
            Self::Core(core) => Some(core),
            Self::Sync { source, .. } => source.core(),
            Self::Store(_) => None,
        }
    }

    /// Whether the caller can reasonably retry the same call later.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store(StoreError::Unavailable(_)) => true,
            Self::Store(StoreError::Database(err)) => matches!(
                err,
                sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::PoolClosed
            ),
            Self::Sync { .. } => true,
            _ => false,
        }
    }
}
