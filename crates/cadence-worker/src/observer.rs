//! Optional lifecycle hooks.
//!
//! The pool always holds an observer; when nothing is registered it holds
//! [`NoopObserver`], so call sites never check for absence.

use std::time::Duration;

use async_trait::async_trait;

use cadence_entity::job::Job;

/// Receives job lifecycle notifications from a [`crate::WorkerPool`].
///
/// Every method has an empty default body. Implementations must not block
/// for long: they run on the worker that processed the job.
#[async_trait]
pub trait JobObserver: Send + Sync {
    /// A job was accepted into the queue.
    async fn on_job_submitted(&self, _job: &Job) {}

    /// An attempt finished; `job` holds its final state for the attempt.
    async fn on_job_finished(&self, _job: &Job) {}

    /// A failed job was parked for another attempt after `delay`.
    async fn on_retry_scheduled(&self, _job: &Job, _delay: Duration) {}
}

/// Observer that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl JobObserver for NoopObserver {}
