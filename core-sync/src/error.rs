use core_library::LibraryError;
use remote_traits::RemoteError;
use std::sync::Arc;
use thiserror::Error;

/// A sync error shared between a single-flight leader and its followers.
pub type SharedError = Arc<SyncError>;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Local store error: {0}")]
    Library(#[from] LibraryError),

    #[error("Conflict on collection {collection_id}: {reason}")]
    Conflict {
        collection_id: String,
        reason: String,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("{0}")]
    Shared(SharedError),
}

impl SyncError {
    /// Cancellation is not a failure; rollback logic distinguishes it.
    pub fn is_cancelled(&self) -> bool {
        match self {
            SyncError::Cancelled => true,
            SyncError::Shared(inner) => inner.is_cancelled(),
            _ => false,
        }
    }
}

impl From<SharedError> for SyncError {
    fn from(err: SharedError) -> Self {
        SyncError::Shared(err)
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
