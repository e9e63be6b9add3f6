//! Bounded, newest-first record of finished jobs.
//!
//! Purely an in-process debugging aid: it is lost on restart and nothing
//! in the scheduler reads it for correctness.

use std::collections::VecDeque;
use std::sync::Mutex;

use cadence_core::types::TenantId;
use cadence_entity::job::Job;

/// Fixed-capacity job history.
#[derive(Debug)]
pub struct JobHistory {
    capacity: usize,
    entries: Mutex<VecDeque<Job>>,
}

impl JobHistory {
    /// Create an empty history holding at most `capacity` jobs.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Prepend a snapshot, dropping the oldest entry when full.
    pub fn record(&self, job: Job) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.push_front(job);
        entries.truncate(self.capacity);
    }

    /// Up to `limit` most recent jobs; `0` or an oversized limit returns all.
    pub fn recent(&self, limit: usize) -> Vec<Job> {
        self.collect(limit, |_| true)
    }

    /// Up to `limit` most recent jobs for one tenant.
    pub fn recent_for_tenant(&self, tenant: TenantId, limit: usize) -> Vec<Job> {
        self.collect(limit, |job| job.tenant() == Some(tenant))
    }

    /// Up to `limit` most recent jobs for one tenant and secondary key.
    pub fn recent_for_scope(&self, tenant: TenantId, key: &str, limit: usize) -> Vec<Job> {
        self.collect(limit, |job| job.scope.matches(Some(tenant), Some(key)))
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn collect(&self, limit: usize, keep: impl Fn(&Job) -> bool) -> Vec<Job> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let limit = if limit == 0 { entries.len() } else { limit };
        entries
            .iter()
            .filter(|job| keep(job))
            .take(limit)
            .cloned()
            .collect()
    }
}
