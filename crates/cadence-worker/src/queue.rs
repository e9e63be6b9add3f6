//! Job queue: a bounded ready channel plus a holding area for retries.
//!
//! Workers only ever see jobs that are due. Retries (and submissions that
//! carry a future `next_retry_at`) are parked in a min-heap ordered by due
//! time and promoted into the ready channel by a single promoter task.
//! Parking does not consume ready-queue capacity, so a burst of fresh
//! submissions can never crowd out a scheduled retry.

use std::cmp::{Ordering as CmpOrdering, Reverse};
use std::collections::BinaryHeap;
use std::sync::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Notify, mpsc};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use cadence_entity::job::Job;

use crate::error::SchedulerError;

/// Pause before retrying promotion into a full ready queue.
const PROMOTION_BACKOFF: Duration = Duration::from_millis(250);

/// Promoter wake-up when nothing is parked.
const IDLE_WAKE: Duration = Duration::from_secs(3600);

/// A parked job and the instant it becomes due.
#[derive(Debug)]
struct DelayedJob {
    due: Instant,
    seq: u64,
    job: Job,
}

impl PartialEq for DelayedJob {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for DelayedJob {}

impl PartialOrd for DelayedJob {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for DelayedJob {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.due
            .cmp(&other.due)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

/// Queue shared by the submitters, the promoter and all workers of a pool.
#[derive(Debug)]
pub struct JobQueue {
    /// Producer side of the bounded ready channel
    sender: mpsc::Sender<Job>,
    /// Consumer side; each job is delivered to exactly one worker
    receiver: tokio::sync::Mutex<mpsc::Receiver<Job>>,
    /// Parked jobs, earliest due first
    delayed: Mutex<BinaryHeap<Reverse<DelayedJob>>>,
    /// Wakes the promoter when a job is parked
    parked: Notify,
    /// Tie-breaker preserving FIFO order among equal due times
    seq: AtomicU64,
    capacity: usize,
}

impl JobQueue {
    /// Create a queue whose ready channel holds `capacity` jobs.
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity);
        Self {
            sender,
            receiver: tokio::sync::Mutex::new(receiver),
            delayed: Mutex::new(BinaryHeap::new()),
            parked: Notify::new(),
            seq: AtomicU64::new(0),
            capacity,
        }
    }

    /// Non-blocking enqueue.
    ///
    /// A job whose `next_retry_at` lies in the future is parked instead of
    /// being placed in the ready channel.
    pub fn try_enqueue(&self, job: Job) -> Result<(), SchedulerError> {
        let now = Utc::now();
        if !job.is_due(now) {
            let wait = job
                .next_retry_at()
                .and_then(|at| (at - now).to_std().ok())
                .unwrap_or_default();
            self.park(job, wait);
            return Ok(());
        }

        self.sender.try_send(job).map_err(|e| match e {
            TrySendError::Full(_) => SchedulerError::QueueFull,
            TrySendError::Closed(_) => SchedulerError::NotRunning,
        })
    }

    /// Wait for the next ready job.
    pub async fn dequeue(&self) -> Option<Job> {
        self.receiver.lock().await.recv().await
    }

    /// Hold `job` back for `delay` before it becomes visible to workers.
    pub fn park(&self, job: Job, delay: Duration) {
        self.insert_delayed(job, Instant::now() + delay);
        self.parked.notify_one();
    }

    /// Jobs waiting in the ready channel.
    pub fn ready_len(&self) -> usize {
        self.capacity - self.sender.capacity()
    }

    /// Jobs parked for a later retry.
    pub fn delayed_len(&self) -> usize {
        self.delayed.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Move due jobs into the ready channel until `cancel` fires.
    ///
    /// Jobs still parked when the loop exits are dropped and reported.
    pub async fn run_promoter(self: Arc<Self>, cancel: CancellationToken) {
        loop {
            let now = Instant::now();
            while let Some(job) = self.pop_due(now) {
                match self.sender.try_send(job) {
                    Ok(()) => {}
                    Err(TrySendError::Full(job)) => {
                        tracing::debug!(
                            job_id = %job.id,
                            "Ready queue full, holding retry back"
                        );
                        self.insert_delayed(job, now + PROMOTION_BACKOFF);
                        break;
                    }
                    Err(TrySendError::Closed(job)) => {
                        tracing::warn!(job_id = %job.id, "Ready queue closed, retry lost");
                    }
                }
            }

            let wake_at = self.next_due().unwrap_or(now + IDLE_WAKE);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep_until(wake_at) => {}
                _ = self.parked.notified() => {}
            }
        }

        let lost = self.drain_delayed();
        if lost > 0 {
            tracing::warn!(lost, "Queue shutting down with parked retries; retries lost");
        }
    }

    fn insert_delayed(&self, job: Job, due: Instant) {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        self.delayed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Reverse(DelayedJob { due, seq, job }));
    }

    fn pop_due(&self, now: Instant) -> Option<Job> {
        let mut delayed = self.delayed.lock().unwrap_or_else(|e| e.into_inner());
        match delayed.peek() {
            Some(Reverse(entry)) if entry.due <= now => delayed.pop().map(|Reverse(e)| e.job),
            _ => None,
        }
    }

    fn next_due(&self) -> Option<Instant> {
        self.delayed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .peek()
            .map(|Reverse(entry)| entry.due)
    }

    fn drain_delayed(&self) -> usize {
        let mut delayed = self.delayed.lock().unwrap_or_else(|e| e.into_inner());
        let lost = delayed.len();
        delayed.clear();
        lost
    }
}
