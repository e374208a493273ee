//! # Job Handles
//!
//! Every long-running engine operation (refresh, saved-toggle push,
//! reorder run) returns a [`Job`]: a spawned task paired with a
//! cancellation token. Callers may await the outcome, cancel, or drop the
//! handle to let the work run to completion unobserved.
//!
//! Cancellation is cooperative: the token is threaded into the work
//! closure, which checks it at its suspension points. Cancelling never
//! aborts the task mid-statement, so rollback paths inside the work run
//! to completion.
//!
//! ## Usage
//!
//! ```rust
//! use core_sync::job::Job;
//! use core_sync::{Result, SyncError};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let job = Job::spawn(|token| async move {
//!     tokio::select! {
//!         _ = token.cancelled() => Err(SyncError::Cancelled),
//!         _ = std::future::ready(()) => Ok(()),
//!     }
//! });
//! assert!(job.join().await.is_ok());
//! # }
//! ```

use crate::{Result, SyncError};
use std::fmt;
use std::future::Future;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Unique identifier for a spawned job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle to a spawned engine operation.
#[derive(Debug)]
pub struct Job {
    id: JobId,
    handle: JoinHandle<Result<()>>,
    token: CancellationToken,
}

impl Job {
    /// Spawn `work` with a fresh cancellation token.
    pub fn spawn<F, Fut>(work: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let token = CancellationToken::new();
        let handle = tokio::spawn(work(token.clone()));
        Self {
            id: JobId::new(),
            handle,
            token,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    /// Request cooperative cancellation. The work observes the token at
    /// its next suspension point.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Await the outcome.
    ///
    /// Panics inside the work are resumed here; an externally aborted
    /// task reports [`SyncError::Cancelled`].
    pub async fn join(self) -> Result<()> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(SyncError::Cancelled),
        }
    }

    /// Cancel and await; a clean cancellation maps to `Ok(())`.
    pub async fn cancel_and_join(self) -> Result<()> {
        self.cancel();
        match self.join().await {
            Err(e) if e.is_cancelled() => Ok(()),
            other => other,
        }
    }

    /// Let the work run to completion unobserved.
    pub fn detach(self) {
        // Dropping the JoinHandle detaches the task.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn join_returns_the_work_outcome() {
        let job = Job::spawn(|_| async { Ok(()) });
        assert!(job.join().await.is_ok());
    }

    #[tokio::test]
    async fn cancel_wakes_work_waiting_on_the_token() {
        let job = Job::spawn(|token| async move {
            token.cancelled().await;
            Err(SyncError::Cancelled)
        });
        job.cancel();
        let err = job.join().await.unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn cancel_and_join_treats_clean_cancellation_as_ok() {
        let job = Job::spawn(|token| async move {
            token.cancelled().await;
            Err(SyncError::Cancelled)
        });
        assert!(job.cancel_and_join().await.is_ok());
    }

    #[tokio::test]
    async fn detached_work_still_runs() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        let job = Job::spawn(move |_| async move {
            flag.store(true, Ordering::SeqCst);
            Ok(())
        });
        job.detach();

        tokio::time::timeout(Duration::from_secs(1), async {
            while !ran.load(Ordering::SeqCst) {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("detached job should complete");
    }
}
