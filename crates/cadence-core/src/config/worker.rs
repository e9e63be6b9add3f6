//! Worker pool configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Name given to a pool section that does not set one.
pub const DEFAULT_POOL_NAME: &str = "default";

/// Upper bound for `sync_lookback_hours` (one year).
pub const MAX_SYNC_LOOKBACK_HOURS: u64 = 366 * 24;

/// Configuration for one bounded worker pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Pool name used in log output.
    #[serde(default = "default_name")]
    pub name: String,
    /// Whether the pool is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Number of concurrent workers draining the queue.
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,
    /// Upper bound on a single job execution, in seconds.
    #[serde(default = "default_job_timeout")]
    pub job_timeout_seconds: u64,
    /// Retry attempts granted to every job the pool creates.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    /// Base delay of the exponential retry backoff, in seconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_seconds: u64,
    /// Ceiling of the retry backoff, in seconds.
    #[serde(default = "default_max_retry_delay")]
    pub max_retry_delay_seconds: u64,
    /// Capacity of the bounded ready queue.
    #[serde(default = "default_capacity")]
    pub queue_capacity: usize,
    /// Number of finished jobs kept in the in-memory history.
    #[serde(default = "default_capacity")]
    pub history_capacity: usize,
    /// How long a graceful stop waits for workers, in seconds.
    #[serde(default = "default_stop_timeout")]
    pub stop_timeout_seconds: u64,
    /// Window used by `schedule_sync_with_defaults`, in hours.
    #[serde(default = "default_sync_lookback")]
    pub sync_lookback_hours: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            enabled: true,
            max_concurrent_jobs: default_max_concurrent_jobs(),
            job_timeout_seconds: default_job_timeout(),
            retry_attempts: default_retry_attempts(),
            retry_delay_seconds: default_retry_delay(),
            max_retry_delay_seconds: default_max_retry_delay(),
            queue_capacity: default_capacity(),
            history_capacity: default_capacity(),
            stop_timeout_seconds: default_stop_timeout(),
            sync_lookback_hours: default_sync_lookback(),
        }
    }
}

impl WorkerConfig {
    /// Defaults for the daily report aggregation pool.
    pub fn report_defaults() -> Self {
        Self {
            name: "report".to_string(),
            max_concurrent_jobs: 3,
            job_timeout_seconds: 30 * 60,
            retry_delay_seconds: 5 * 60,
            ..Self::default()
        }
    }

    /// Per-job execution timeout.
    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_seconds)
    }

    /// Base retry delay.
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_seconds)
    }

    /// Retry delay ceiling.
    pub fn max_retry_delay(&self) -> Duration {
        Duration::from_secs(self.max_retry_delay_seconds)
    }

    /// Graceful stop deadline.
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_seconds)
    }

    /// Default lookback for sync jobs without an explicit window.
    pub fn sync_lookback(&self) -> Duration {
        Duration::from_secs(self.sync_lookback_hours.saturating_mul(3600))
    }

    /// Reject values that would produce a pool that cannot make progress.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.max_concurrent_jobs == 0 {
            return Err(AppError::configuration(format!(
                "worker pool '{}': max_concurrent_jobs must be positive",
                self.name
            )));
        }
        if self.job_timeout_seconds == 0 {
            return Err(AppError::configuration(format!(
                "worker pool '{}': job_timeout_seconds must be positive",
                self.name
            )));
        }
        if self.queue_capacity == 0 || self.history_capacity == 0 {
            return Err(AppError::configuration(format!(
                "worker pool '{}': queue and history capacity must be positive",
                self.name
            )));
        }
        if self.sync_lookback_hours > MAX_SYNC_LOOKBACK_HOURS {
            return Err(AppError::configuration(format!(
                "worker pool '{}': sync_lookback_hours must be at most {}",
                self.name, MAX_SYNC_LOOKBACK_HOURS
            )));
        }
        if self.max_retry_delay_seconds < self.retry_delay_seconds {
            return Err(AppError::configuration(format!(
                "worker pool '{}': max_retry_delay_seconds is below retry_delay_seconds",
                self.name
            )));
        }
        Ok(())
    }
}

fn default_name() -> String {
    DEFAULT_POOL_NAME.to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_concurrent_jobs() -> usize {
    5
}

fn default_job_timeout() -> u64 {
    15 * 60
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    60
}

fn default_max_retry_delay() -> u64 {
    30 * 60
}

fn default_capacity() -> usize {
    100
}

fn default_stop_timeout() -> u64 {
    30
}

fn default_sync_lookback() -> u64 {
    24
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(WorkerConfig::default().validate().is_ok());
        assert!(WorkerConfig::report_defaults().validate().is_ok());
    }

    #[test]
    fn test_zero_workers_rejected() {
        let config = WorkerConfig {
            max_concurrent_jobs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = WorkerConfig {
            job_timeout_seconds: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_retry_delays_rejected() {
        let config = WorkerConfig {
            retry_delay_seconds: 600,
            max_retry_delay_seconds: 60,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_oversized_lookback_rejected() {
        let config = WorkerConfig {
            sync_lookback_hours: u64::MAX,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert_eq!(config.sync_lookback(), Duration::from_secs(u64::MAX));
    }
}
