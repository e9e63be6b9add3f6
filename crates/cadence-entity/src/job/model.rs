//! Job entity model.
//!
//! A job is created `Pending` by a submitter and then owned by exactly one
//! worker at a time. Its lifecycle is:
//!
//! ```text
//! Pending --start()--> Running
//! Running --complete()--> Success | Partial | Failed
//! Running --fail()--> Failed
//! Failed  --schedule_retry()--> Pending   (while retry_count < max_retries)
//! Pending --cancel()--> Cancelled
//! ```
//!
//! Transitions requested from any other status are ignored, so a terminal
//! job never mutates again.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cadence_core::types::{JobId, TenantId};

use super::retry::RetryPolicy;
use super::status::JobStatus;
use super::window::SyncWindow;
use crate::integration::IntegrationCode;
use crate::report::ReportKind;

/// Grouping keys used for dedup and filtered history queries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobScope {
    /// Tenant the job works for, if any.
    pub tenant: Option<TenantId>,
    /// Secondary key: integration code or report kind.
    pub key: Option<String>,
}

impl JobScope {
    /// Scope for a tenant and a secondary key.
    pub fn new(tenant: TenantId, key: impl Into<String>) -> Self {
        Self {
            tenant: Some(tenant),
            key: Some(key.into()),
        }
    }

    /// Whether this scope matches the given filters (`None` matches all).
    pub fn matches(&self, tenant: Option<TenantId>, key: Option<&str>) -> bool {
        let tenant_ok = tenant.is_none() || self.tenant == tenant;
        let key_ok = key.is_none() || self.key.as_deref() == key;
        tenant_ok && key_ok
    }
}

/// Item counters reported by sync-style executors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCounters {
    /// Items seen.
    pub total: u32,
    /// Items processed successfully.
    pub success: u32,
    /// Items that failed.
    pub failed: u32,
    /// Items skipped (e.g. already imported).
    pub skipped: u32,
}

/// One unit of asynchronous work with retry bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique job identifier.
    pub id: JobId,
    /// Tenant and secondary key.
    pub scope: JobScope,
    /// Source data range, for sync-style jobs.
    pub window: Option<SyncWindow>,
    status: JobStatus,
    error: Option<String>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    retry_count: u32,
    max_retries: u32,
    next_retry_at: Option<DateTime<Utc>>,
    counters: JobCounters,
    failed_items: Vec<String>,
}

impl Job {
    /// Create a pending job.
    pub fn new(scope: JobScope, window: Option<SyncWindow>, max_retries: u32) -> Self {
        Self {
            id: JobId::new(),
            scope,
            window,
            status: JobStatus::Pending,
            error: None,
            started_at: None,
            completed_at: None,
            retry_count: 0,
            max_retries,
            next_retry_at: None,
            counters: JobCounters::default(),
            failed_items: Vec::new(),
        }
    }

    /// Report aggregation job for one tenant and report kind.
    pub fn report(tenant: TenantId, kind: ReportKind, window: SyncWindow, max_retries: u32) -> Self {
        Self::new(JobScope::new(tenant, kind.as_str()), Some(window), max_retries)
    }

    /// Integration sync job for one tenant and integration.
    pub fn sync(
        tenant: TenantId,
        integration: &IntegrationCode,
        window: SyncWindow,
        max_retries: u32,
    ) -> Self {
        Self::new(
            JobScope::new(tenant, integration.as_str()),
            Some(window),
            max_retries,
        )
    }

    /// Current status.
    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Last failure message; cleared when a new attempt starts.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// When the latest attempt started.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// When the latest attempt finished.
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Retries scheduled so far.
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Retry budget.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// When a pending retry becomes due.
    pub fn next_retry_at(&self) -> Option<DateTime<Utc>> {
        self.next_retry_at
    }

    /// Result counters from the last completion.
    pub fn counters(&self) -> JobCounters {
        self.counters
    }

    /// Identifiers of items that failed during the current attempt.
    pub fn failed_items(&self) -> &[String] {
        &self.failed_items
    }

    /// Tenant shortcut.
    pub fn tenant(&self) -> Option<TenantId> {
        self.scope.tenant
    }

    /// Secondary key shortcut.
    pub fn scope_key(&self) -> Option<&str> {
        self.scope.key.as_deref()
    }

    /// Whether the job is waiting on a retry delay at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_retry_at.is_none_or(|at| at <= now)
    }

    /// `Pending -> Running`. Returns `false` if the job was not pending.
    pub fn start(&mut self) -> bool {
        if self.status != JobStatus::Pending {
            return false;
        }
        self.status = JobStatus::Running;
        self.started_at = Some(Utc::now());
        self.completed_at = None;
        self.next_retry_at = None;
        self.error = None;
        self.failed_items.clear();
        true
    }

    /// Record final counters and classify the outcome.
    ///
    /// No failures is `Success`; failures alongside successes is `Partial`;
    /// failures only is `Failed`.
    pub fn complete(&mut self, total: u32, success: u32, failed: u32, skipped: u32) {
        if self.status != JobStatus::Running {
            return;
        }
        self.counters = JobCounters {
            total,
            success,
            failed,
            skipped,
        };
        self.completed_at = Some(Utc::now());
        self.status = if failed == 0 {
            JobStatus::Success
        } else if success > 0 {
            JobStatus::Partial
        } else {
            JobStatus::Failed
        };
    }

    /// Mark the running attempt as failed.
    pub fn fail(&mut self, error: impl Into<String>) {
        if self.status != JobStatus::Running {
            return;
        }
        self.status = JobStatus::Failed;
        self.completed_at = Some(Utc::now());
        self.error = Some(error.into());
    }

    /// Withdraw a job that has not started.
    pub fn cancel(&mut self) -> bool {
        if self.status != JobStatus::Pending {
            return false;
        }
        self.status = JobStatus::Cancelled;
        self.next_retry_at = None;
        self.completed_at = Some(Utc::now());
        true
    }

    /// Note an item that failed during this attempt.
    pub fn record_failed_item(&mut self, item_id: impl Into<String>) {
        if self.status == JobStatus::Running {
            self.failed_items.push(item_id.into());
        }
    }

    /// Whether a failed job still has retry budget.
    pub fn should_retry(&self) -> bool {
        self.status == JobStatus::Failed && self.retry_count < self.max_retries
    }

    /// `Failed -> Pending` with exponential backoff.
    ///
    /// Returns the delay until the retry is due, or `None` when the job is
    /// not eligible for another attempt.
    pub fn schedule_retry(&mut self, policy: &RetryPolicy) -> Option<Duration> {
        if !self.should_retry() {
            return None;
        }
        self.retry_count += 1;
        let delay = policy.backoff(self.retry_count);
        let offset = chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::zero());
        self.status = JobStatus::Pending;
        self.next_retry_at = Some(Utc::now() + offset);
        self.error = None;
        Some(delay)
    }
}
