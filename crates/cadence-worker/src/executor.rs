//! Executor contract for the external collaborator that performs a job.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use cadence_core::error::AppError;
use cadence_entity::job::Job;

/// Performs the work for a job handed over by a worker.
///
/// On success the executor must have called [`Job::complete`] before
/// returning `Ok`. On failure it returns an error and leaves the counters
/// alone; the pool marks the job failed and applies the retry policy.
///
/// `cancel` fires when the pool stops or the job exceeds its timeout.
/// Executors performing blocking I/O are expected to observe it.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Execute one attempt of `job`.
    async fn execute(&self, cancel: CancellationToken, job: &mut Job) -> Result<(), JobExecutionError>;
}

/// Error from a job attempt.
#[derive(Debug, thiserror::Error)]
pub enum JobExecutionError {
    /// Transient failure; may retry
    #[error("Transient job failure: {0}")]
    Transient(String),

    /// Permanent failure; do not retry
    #[error("Permanent job failure: {0}")]
    Permanent(String),

    /// The attempt observed cancellation and gave up.
    #[error("Job cancelled")]
    Cancelled,

    /// The attempt exceeded the pool's job timeout.
    #[error("Job timed out after {0:?}")]
    TimedOut(Duration),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] AppError),
}

impl JobExecutionError {
    /// Whether the retry policy may schedule another attempt.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Permanent(_))
    }
}
