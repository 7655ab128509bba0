//! Deadline enforcement for spawned work.
//!
//! The future runs on its own Tokio task and races a timer. When the timer
//! wins, or the caller stops waiting, the task is aborted, so a future that
//! never settles cannot hold up the caller or outlive it.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::task::{JoinError, JoinHandle};

#[derive(Debug, Error)]
pub enum DeadlineError {
    /// The deadline fired before the task settled.
    #[error("timed out after {}ms", .0.as_millis())]
    Elapsed(Duration),

    /// The task panicked or was cancelled.
    #[error("task failed: {0}")]
    Join(#[from] JoinError),
}

/// Run `fut` on a new task, giving up after `limit`.
pub async fn run_with_deadline<F>(limit: Duration, fut: F) -> Result<F::Output, DeadlineError>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let mut task = AbortOnDrop(tokio::spawn(fut));

    match tokio::time::timeout(limit, &mut task.0).await {
        Ok(joined) => Ok(joined?),
        Err(_) => Err(DeadlineError::Elapsed(limit)),
    }
}

/// Aborts the task when dropped, including when the caller is cancelled
/// mid-await.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}
