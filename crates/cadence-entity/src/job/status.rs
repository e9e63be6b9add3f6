//! Job status enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a scheduled job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Waiting in the queue, possibly for a retry to become due.
    Pending,
    /// Owned by a worker and executing.
    Running,
    /// Finished with no failed items.
    Success,
    /// Finished with some items failed and some succeeded.
    Partial,
    /// Failed; may return to `Pending` while retries remain.
    Failed,
    /// Withdrawn before it ran.
    Cancelled,
}

impl JobStatus {
    /// Return the status as an upper-case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Success => "SUCCESS",
            Self::Partial => "PARTIAL",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
