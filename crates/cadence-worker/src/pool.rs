//! Worker pool: a fixed set of workers draining a bounded job queue.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use cadence_core::config::worker::WorkerConfig;
use cadence_core::types::TenantId;
use cadence_entity::integration::IntegrationCode;
use cadence_entity::job::{Job, JobStatus, RetryPolicy, SyncWindow};

use crate::error::SchedulerError;
use crate::executor::{Executor, JobExecutionError};
use crate::history::JobHistory;
use crate::observer::{JobObserver, NoopObserver};
use crate::queue::JobQueue;

/// Point-in-time view of a pool.
#[derive(Debug, Clone, Serialize)]
pub struct PoolStats {
    /// Pool name from configuration
    pub name: String,
    /// Whether the pool accepts submissions
    pub running: bool,
    /// Configured worker count
    pub workers: usize,
    /// Jobs waiting in the ready queue
    pub queued: usize,
    /// Jobs parked until a retry becomes due
    pub delayed: usize,
    /// Jobs currently executing
    pub in_flight: usize,
    /// Jobs accepted since construction
    pub submitted: u64,
    /// Attempts that ended `Success` or `Partial`
    pub completed: u64,
    /// Attempts that ended `Failed`
    pub failed: u64,
    /// Retries scheduled
    pub retried: u64,
}

#[derive(Debug, Default)]
struct PoolCounters {
    in_flight: AtomicUsize,
    submitted: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    retried: AtomicU64,
}

/// Counts one executing job; decrements on drop, including unwinding.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// State shared by the pool handle and its workers.
struct Shared {
    config: WorkerConfig,
    retry_policy: RetryPolicy,
    executor: Arc<dyn Executor>,
    observer: Arc<dyn JobObserver>,
    history: JobHistory,
    counters: PoolCounters,
}

#[derive(Default)]
struct PoolState {
    running: bool,
    queue: Option<Arc<JobQueue>>,
    cancel: Option<CancellationToken>,
    handles: Vec<JoinHandle<()>>,
}

/// Bounded worker pool with retry scheduling and an in-memory history.
///
/// Submissions never block: a full queue is reported as
/// [`SchedulerError::QueueFull`]. Failed attempts are retried with
/// exponential backoff without occupying queue capacity while they wait.
pub struct WorkerPool {
    shared: Arc<Shared>,
    state: Mutex<PoolState>,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("name", &self.shared.config.name)
            .field("running", &self.is_running())
            .finish()
    }
}

impl WorkerPool {
    /// Create a stopped pool.
    pub fn new(config: WorkerConfig, executor: Arc<dyn Executor>) -> Result<Self, SchedulerError> {
        config.validate()?;

        let retry_policy =
            RetryPolicy::new(config.retry_delay()).with_max_delay(config.max_retry_delay());
        let history = JobHistory::new(config.history_capacity);

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                retry_policy,
                executor,
                observer: Arc::new(NoopObserver),
                history,
                counters: PoolCounters::default(),
            }),
            state: Mutex::new(PoolState::default()),
        })
    }

    /// Register lifecycle hooks. Must be called before the pool is shared.
    pub fn with_observer(mut self, observer: Arc<dyn JobObserver>) -> Self {
        match Arc::get_mut(&mut self.shared) {
            Some(shared) => shared.observer = observer,
            None => tracing::warn!(
                "Pool '{}' already shared; observer not registered",
                self.shared.config.name
            ),
        }
        self
    }

    /// Pool configuration.
    pub fn config(&self) -> &WorkerConfig {
        &self.shared.config
    }

    /// Retry budget granted to jobs this pool creates.
    pub fn retry_attempts(&self) -> u32 {
        self.shared.config.retry_attempts
    }

    /// Whether the pool currently accepts submissions.
    pub fn is_running(&self) -> bool {
        let state = self.lock_state();
        state.running && state.cancel.as_ref().is_some_and(|c| !c.is_cancelled())
    }

    /// Spawn the workers. Idempotent while running.
    ///
    /// The pool also stops when `shutdown` is cancelled.
    pub fn start(&self, shutdown: &CancellationToken) {
        let mut state = self.lock_state();
        if state.running {
            tracing::debug!("Pool '{}' already running", self.shared.config.name);
            return;
        }

        let config = &self.shared.config;
        let cancel = shutdown.child_token();
        let queue = Arc::new(JobQueue::new(config.queue_capacity));

        let mut handles = Vec::with_capacity(config.max_concurrent_jobs + 1);
        handles.push(tokio::spawn(queue.clone().run_promoter(cancel.clone())));
        for worker_id in 0..config.max_concurrent_jobs {
            handles.push(tokio::spawn(run_worker(
                self.shared.clone(),
                queue.clone(),
                cancel.clone(),
                worker_id,
            )));
        }

        state.running = true;
        state.queue = Some(queue);
        state.cancel = Some(cancel);
        state.handles = handles;

        tracing::info!(
            "Pool '{}' started with workers={}, queue_capacity={}, job_timeout={}s, retry_attempts={}",
            config.name,
            config.max_concurrent_jobs,
            config.queue_capacity,
            config.job_timeout_seconds,
            config.retry_attempts
        );
    }

    /// Signal all workers and wait up to `deadline` for them to exit.
    ///
    /// Jobs still queued or parked are discarded. Idempotent.
    pub async fn stop(&self, deadline: Duration) -> Result<(), SchedulerError> {
        let (cancel, handles, queue) = {
            let mut state = self.lock_state();
            if !state.running {
                return Ok(());
            }
            state.running = false;
            (
                state.cancel.take(),
                std::mem::take(&mut state.handles),
                state.queue.take(),
            )
        };

        let name = &self.shared.config.name;
        tracing::info!("Pool '{}' stopping...", name);

        if let Some(queue) = &queue {
            let discarded = queue.ready_len();
            if discarded > 0 {
                tracing::warn!("Pool '{}' discarding {} queued jobs", name, discarded);
            }
        }
        if let Some(cancel) = cancel {
            cancel.cancel();
        }

        let drain = async {
            for handle in handles {
                if let Err(e) = handle.await {
                    if e.is_panic() {
                        tracing::error!("Pool '{}' worker panicked: {}", name, e);
                    }
                }
            }
        };

        match tokio::time::timeout(deadline, drain).await {
            Ok(()) => {
                tracing::info!("Pool '{}' stopped", name);
                Ok(())
            }
            Err(_) => {
                tracing::warn!(
                    "Pool '{}' stop exceeded {:?}; workers may still be draining",
                    name,
                    deadline
                );
                Err(SchedulerError::StopTimeout(deadline))
            }
        }
    }

    /// Enqueue a job without blocking.
    pub async fn submit_job(&self, job: Job) -> Result<(), SchedulerError> {
        let queue = {
            let state = self.lock_state();
            match (&state.queue, &state.cancel) {
                (Some(queue), Some(cancel)) if state.running && !cancel.is_cancelled() => {
                    queue.clone()
                }
                _ => return Err(SchedulerError::NotRunning),
            }
        };

        let submitted = job.clone();
        if let Err(e) = queue.try_enqueue(job) {
            tracing::warn!(
                "Pool '{}' rejected job {}: {}",
                self.shared.config.name,
                submitted.id,
                e
            );
            return Err(e);
        }

        self.shared.counters.submitted.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            job_id = %submitted.id,
            tenant_id = ?submitted.tenant(),
            scope = ?submitted.scope_key(),
            "Job submitted to pool '{}'",
            self.shared.config.name
        );
        self.shared.observer.on_job_submitted(&submitted).await;
        Ok(())
    }

    /// Build and submit a sync job for `[start, end)`.
    pub async fn schedule_sync(
        &self,
        tenant: TenantId,
        integration: &IntegrationCode,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Job, SchedulerError> {
        let job = Job::sync(
            tenant,
            integration,
            SyncWindow::new(start, end),
            self.retry_attempts(),
        );
        self.submit_job(job.clone()).await?;
        Ok(job)
    }

    /// Submit a sync job covering the configured lookback ending now.
    pub async fn schedule_sync_with_defaults(
        &self,
        tenant: TenantId,
        integration: &IntegrationCode,
    ) -> Result<Job, SchedulerError> {
        let window = SyncWindow::ending_at(Utc::now(), self.shared.config.sync_lookback());
        self.schedule_sync(tenant, integration, window.start, window.end)
            .await
    }

    /// Finished-job history.
    pub fn history(&self) -> &JobHistory {
        &self.shared.history
    }

    /// Most recent jobs, newest first. `0` returns the whole history.
    pub fn job_history(&self, limit: usize) -> Vec<Job> {
        self.shared.history.recent(limit)
    }

    /// Most recent jobs for one tenant.
    pub fn job_history_for_tenant(&self, tenant: TenantId, limit: usize) -> Vec<Job> {
        self.shared.history.recent_for_tenant(tenant, limit)
    }

    /// Most recent jobs for one tenant and integration.
    pub fn job_history_for_integration(
        &self,
        tenant: TenantId,
        integration: &IntegrationCode,
        limit: usize,
    ) -> Vec<Job> {
        self.shared
            .history
            .recent_for_scope(tenant, integration.as_str(), limit)
    }

    /// Current counters and queue depths.
    pub fn stats(&self) -> PoolStats {
        let (running, queued, delayed) = {
            let state = self.lock_state();
            let running = state.running && state.cancel.as_ref().is_some_and(|c| !c.is_cancelled());
            match &state.queue {
                Some(queue) => (running, queue.ready_len(), queue.delayed_len()),
                None => (running, 0, 0),
            }
        };
        let counters = &self.shared.counters;

        PoolStats {
            name: self.shared.config.name.clone(),
            running,
            workers: self.shared.config.max_concurrent_jobs,
            queued,
            delayed,
            in_flight: counters.in_flight.load(Ordering::Relaxed),
            submitted: counters.submitted.load(Ordering::Relaxed),
            completed: counters.completed.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
            retried: counters.retried.load(Ordering::Relaxed),
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Worker loop: take one job at a time until cancelled.
async fn run_worker(
    shared: Arc<Shared>,
    queue: Arc<JobQueue>,
    cancel: CancellationToken,
    worker_id: usize,
) {
    tracing::debug!("Pool '{}' worker {} started", shared.config.name, worker_id);

    loop {
        let job = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            job = queue.dequeue() => job,
        };
        let Some(job) = job else {
            break;
        };
        shared.process(&queue, job, worker_id, &cancel).await;
    }

    tracing::debug!("Pool '{}' worker {} exited", shared.config.name, worker_id);
}

impl Shared {
    async fn process(
        &self,
        queue: &JobQueue,
        mut job: Job,
        worker_id: usize,
        cancel: &CancellationToken,
    ) {
        if !job.start() {
            tracing::warn!(
                "Worker {} skipping job {} in status {}",
                worker_id,
                job.id,
                job.status()
            );
            return;
        }

        tracing::info!(
            job_id = %job.id,
            tenant_id = ?job.tenant(),
            scope = ?job.scope_key(),
            "Worker {} processing job, attempt={}/{}",
            worker_id,
            job.retry_count() + 1,
            job.max_retries() + 1
        );

        let timeout = self.config.job_timeout();
        let job_cancel = cancel.child_token();
        let in_flight = InFlight::enter(&self.counters.in_flight);
        let result = match tokio::time::timeout(
            timeout,
            self.executor.execute(job_cancel.clone(), &mut job),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                job_cancel.cancel();
                Err(JobExecutionError::TimedOut(timeout))
            }
        };
        drop(in_flight);

        let retryable = match result {
            Ok(()) => {
                if job.status() == JobStatus::Running {
                    tracing::warn!(
                        "Executor returned without completing job {}; recording empty success",
                        job.id
                    );
                    job.complete(0, 0, 0, 0);
                }
                let counters = job.counters();
                tracing::info!(
                    job_id = %job.id,
                    total = counters.total,
                    success = counters.success,
                    failed = counters.failed,
                    skipped = counters.skipped,
                    "Job finished with status {}",
                    job.status()
                );
                true
            }
            Err(e) => {
                tracing::error!(job_id = %job.id, "Job attempt failed: {}", e);
                job.fail(e.to_string());
                e.is_retryable()
            }
        };

        if job.status() == JobStatus::Failed {
            self.counters.failed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.counters.completed.fetch_add(1, Ordering::Relaxed);
        }

        self.observer.on_job_finished(&job).await;
        self.history.record(job.clone());

        if job.status() != JobStatus::Failed {
            return;
        }
        if !retryable {
            tracing::warn!("Job {} failed permanently; not retrying", job.id);
            return;
        }
        if !job.should_retry() {
            tracing::warn!(
                "Job {} exhausted its {} retries",
                job.id,
                job.max_retries()
            );
            return;
        }
        if cancel.is_cancelled() {
            tracing::warn!("Pool shutting down; retry of job {} lost", job.id);
            return;
        }

        if let Some(delay) = job.schedule_retry(&self.retry_policy) {
            self.counters.retried.fetch_add(1, Ordering::Relaxed);
            tracing::info!(
                "Job {} scheduled for retry {}/{} in {:?}",
                job.id,
                job.retry_count(),
                job.max_retries(),
                delay
            );
            self.observer.on_retry_scheduled(&job, delay).await;
            queue.park(job, delay);
        }
    }
}
