//! Half-open data windows processed by sync-style jobs.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a window was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    /// The window ends before it starts.
    #[error("window start {start} is after end {end}")]
    Inverted {
        /// Requested start.
        start: DateTime<Utc>,
        /// Requested end.
        end: DateTime<Utc>,
    },
    /// The window is longer than allowed.
    #[error("window spans {span_secs}s, exceeding the {max_secs}s limit")]
    TooWide {
        /// Requested span in seconds.
        span_secs: i64,
        /// Allowed span in seconds.
        max_secs: u64,
    },
}

/// The `[start, end)` range of source data a job should process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncWindow {
    /// Inclusive start.
    pub start: DateTime<Utc>,
    /// Exclusive end.
    pub end: DateTime<Utc>,
}

impl SyncWindow {
    /// Build a window without validation.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Window of `span` ending at `end`.
    pub fn ending_at(end: DateTime<Utc>, span: Duration) -> Self {
        let span = chrono::Duration::from_std(span).unwrap_or(chrono::Duration::zero());
        Self {
            start: end - span,
            end,
        }
    }

    /// Length of the window.
    pub fn span(&self) -> chrono::Duration {
        self.end - self.start
    }

    /// Check `start < end` and `end - start <= max_span`.
    pub fn validate(&self, max_span: Duration) -> Result<(), WindowError> {
        if self.start >= self.end {
            return Err(WindowError::Inverted {
                start: self.start,
                end: self.end,
            });
        }
        let span = self.span();
        let too_wide = span
            .to_std()
            .map(|s| s > max_span)
            .unwrap_or(true);
        if too_wide {
            return Err(WindowError::TooWide {
                span_secs: span.num_seconds(),
                max_secs: max_span.as_secs(),
            });
        }
        Ok(())
    }
}
