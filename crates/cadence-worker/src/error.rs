//! Errors returned synchronously by pools and triggers.

use std::time::Duration;

use thiserror::Error;

use cadence_core::error::{AppError, ErrorKind};
use cadence_core::types::TenantId;
use cadence_entity::job::WindowError;

/// Lifecycle, capacity, validation and configuration failures.
///
/// Job execution failures are never surfaced here; they are captured on
/// the job and visible through the history.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Configuration rejected at construction time.
    #[error("invalid scheduler configuration: {0}")]
    InvalidConfig(String),

    /// The pool or trigger has not been started, or has been stopped.
    #[error("scheduler is not running")]
    NotRunning,

    /// The bounded queue is saturated; the submission was dropped.
    #[error("job queue is full")]
    QueueFull,

    /// A manual sync window is inverted or too wide.
    #[error("invalid time range: {0}")]
    InvalidTimeRange(#[from] WindowError),

    /// Fan-out found no enabled integration for the tenant.
    #[error("no enabled platforms for tenant {0}")]
    NoEnabledPlatforms(TenantId),

    /// Workers did not drain before the stop deadline.
    #[error("stop timed out after {0:?}; workers may still be draining")]
    StopTimeout(Duration),

    /// The configuration provider or tenant directory failed.
    #[error("provider error: {0}")]
    Provider(String),

    /// The cron tick source could not be created or started.
    #[error("cron scheduler error: {0}")]
    Cron(String),
}

impl From<AppError> for SchedulerError {
    fn from(err: AppError) -> Self {
        match err.kind {
            ErrorKind::Configuration => Self::InvalidConfig(err.message),
            _ => Self::Provider(err.to_string()),
        }
    }
}

impl From<SchedulerError> for AppError {
    fn from(err: SchedulerError) -> Self {
        let kind = match &err {
            SchedulerError::InvalidConfig(_) | SchedulerError::Cron(_) => ErrorKind::Configuration,
            SchedulerError::NotRunning => ErrorKind::Lifecycle,
            SchedulerError::QueueFull => ErrorKind::Capacity,
            SchedulerError::InvalidTimeRange(_) | SchedulerError::NoEnabledPlatforms(_) => {
                ErrorKind::Validation
            }
            SchedulerError::StopTimeout(_) => ErrorKind::Timeout,
            SchedulerError::Provider(_) => ErrorKind::ExternalService,
        };
        AppError::with_source(kind, err.to_string(), err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maps_into_app_error_kinds() {
        assert_eq!(AppError::from(SchedulerError::QueueFull).kind, ErrorKind::Capacity);
        assert_eq!(AppError::from(SchedulerError::NotRunning).kind, ErrorKind::Lifecycle);
        assert_eq!(
            AppError::from(SchedulerError::NoEnabledPlatforms(TenantId::new())).kind,
            ErrorKind::Validation
        );
    }

    #[test]
    fn test_configuration_app_error_becomes_invalid_config() {
        let err = SchedulerError::from(AppError::configuration("bad pool"));
        assert!(matches!(err, SchedulerError::InvalidConfig(msg) if msg == "bad pool"));
    }
}
