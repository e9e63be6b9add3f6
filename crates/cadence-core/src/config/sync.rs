//! Interval-based integration sync trigger configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Upper bound for interval and lookback settings (one day).
const MAX_MINUTES: u64 = 24 * 60;

/// Upper bound for first-sync and manual windows (one year).
const MAX_WINDOW_DAYS: u64 = 366;

/// Configuration of the per-tenant, per-integration sync trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncTriggerConfig {
    /// Whether the trigger is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// How often enabled configs are re-examined, in seconds.
    #[serde(default = "default_check_interval")]
    pub check_interval_seconds: u64,
    /// Sync interval for integrations without an override, in minutes.
    #[serde(default = "default_sync_interval")]
    pub default_sync_interval_minutes: u64,
    /// Lower clamp for per-integration overrides, in minutes.
    #[serde(default = "default_min_interval")]
    pub min_sync_interval_minutes: u64,
    /// Upper clamp for per-integration overrides, in minutes.
    #[serde(default = "default_max_interval")]
    pub max_sync_interval_minutes: u64,
    /// Overlap subtracted from the last successful sync, in minutes.
    #[serde(default = "default_lookback")]
    pub lookback_minutes: u64,
    /// Window length when no successful sync is known, in hours.
    #[serde(default = "default_first_sync_lookback")]
    pub first_sync_lookback_hours: u64,
    /// Longest window accepted for an operator-triggered sync, in days.
    #[serde(default = "default_max_manual_window")]
    pub max_manual_window_days: u64,
}

impl Default for SyncTriggerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            check_interval_seconds: default_check_interval(),
            default_sync_interval_minutes: default_sync_interval(),
            min_sync_interval_minutes: default_min_interval(),
            max_sync_interval_minutes: default_max_interval(),
            lookback_minutes: default_lookback(),
            first_sync_lookback_hours: default_first_sync_lookback(),
            max_manual_window_days: default_max_manual_window(),
        }
    }
}

impl SyncTriggerConfig {
    /// Tick period.
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_seconds)
    }

    /// Resolve the effective interval for an optional override, clamped
    /// into `[min, max]`. Non-positive overrides mean "use the default".
    pub fn sync_interval(&self, override_minutes: Option<i64>) -> Duration {
        let minutes = match override_minutes {
            Some(m) if m > 0 => (m as u64)
                .clamp(self.min_sync_interval_minutes, self.max_sync_interval_minutes),
            _ => self.default_sync_interval_minutes,
        };
        Duration::from_secs(minutes.saturating_mul(60))
    }

    /// Overlap buffer applied to the last known sync time.
    pub fn lookback(&self) -> Duration {
        Duration::from_secs(self.lookback_minutes.saturating_mul(60))
    }

    /// Window used for a first sync.
    pub fn first_sync_lookback(&self) -> Duration {
        Duration::from_secs(self.first_sync_lookback_hours.saturating_mul(3600))
    }

    /// Maximum span of a manual sync window.
    pub fn max_manual_window(&self) -> Duration {
        Duration::from_secs(self.max_manual_window_days.saturating_mul(24 * 3600))
    }

    /// Validate interval bounds.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.check_interval_seconds == 0 {
            return Err(AppError::configuration(
                "order_sync: check_interval_seconds must be positive",
            ));
        }
        if self.min_sync_interval_minutes == 0 {
            return Err(AppError::configuration(
                "order_sync: min_sync_interval_minutes must be positive",
            ));
        }
        if self.max_sync_interval_minutes < self.min_sync_interval_minutes {
            return Err(AppError::configuration(
                "order_sync: max_sync_interval_minutes is below min_sync_interval_minutes",
            ));
        }
        if self.default_sync_interval_minutes < self.min_sync_interval_minutes
            || self.default_sync_interval_minutes > self.max_sync_interval_minutes
        {
            return Err(AppError::configuration(
                "order_sync: default_sync_interval_minutes outside [min, max]",
            ));
        }
        if self.max_manual_window_days == 0 {
            return Err(AppError::configuration(
                "order_sync: max_manual_window_days must be positive",
            ));
        }
        if self.max_sync_interval_minutes > MAX_MINUTES || self.lookback_minutes > MAX_MINUTES {
            return Err(AppError::configuration(format!(
                "order_sync: intervals and lookback must be at most {MAX_MINUTES} minutes"
            )));
        }
        if self.first_sync_lookback_hours > MAX_WINDOW_DAYS * 24
            || self.max_manual_window_days > MAX_WINDOW_DAYS
        {
            return Err(AppError::configuration(format!(
                "order_sync: sync windows must be at most {MAX_WINDOW_DAYS} days"
            )));
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_check_interval() -> u64 {
    60
}

fn default_sync_interval() -> u64 {
    15
}

fn default_min_interval() -> u64 {
    5
}

fn default_max_interval() -> u64 {
    60
}

fn default_lookback() -> u64 {
    5
}

fn default_first_sync_lookback() -> u64 {
    24
}

fn default_max_manual_window() -> u64 {
    7
}
