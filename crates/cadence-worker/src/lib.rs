//! Bounded job execution and recurring triggers for Cadence.
//!
//! This crate provides:
//! - A worker pool that drains a bounded queue with a fixed number of workers
//! - Exponential retry scheduling through a delayed-retry holding area
//! - A bounded, newest-first history of finished jobs
//! - A fixed-time daily trigger and a per-tenant interval sync trigger
//! - Executors for report aggregation and marketplace order sync

pub mod error;
pub mod executor;
pub mod history;
pub mod jobs;
pub mod observer;
pub mod pool;
pub mod provider;
pub mod queue;
pub mod trigger;

pub use error::SchedulerError;
pub use executor::{Executor, JobExecutionError};
pub use history::JobHistory;
pub use observer::{JobObserver, NoopObserver};
pub use pool::{PoolStats, WorkerPool};
pub use provider::{ConfigProvider, TenantDirectory};
pub use trigger::{ReportCronTrigger, SyncCronTrigger};
