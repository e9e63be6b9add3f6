//! Recurring triggers that produce jobs into a [`crate::WorkerPool`].

pub mod daily;
pub mod sync;

pub use daily::{CronStatus, DailyGate, ReportCronTrigger};
pub use sync::{LastSyncRecorder, SyncCronTrigger, SyncTriggerStats};
