//! Daily report aggregation trigger configuration.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Hour used when the schedule omits or garbles the hour field.
pub const DEFAULT_CRON_HOUR: u32 = 2;
/// Minute used when the schedule omits or garbles the minute field.
pub const DEFAULT_CRON_MINUTE: u32 = 0;

/// Configuration of the fixed-time daily trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportCronConfig {
    /// Whether the daily run is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Five-field cron expression; only `minute hour` are honoured.
    #[serde(default = "default_schedule")]
    pub daily_cron_schedule: String,
}

impl Default for ReportCronConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            daily_cron_schedule: default_schedule(),
        }
    }
}

impl ReportCronConfig {
    /// Resolve the configured `(hour, minute)` pair.
    pub fn hour_minute(&self) -> Result<(u32, u32), AppError> {
        parse_daily_schedule(&self.daily_cron_schedule)
    }
}

/// Parse `"M H * * *"` into `(hour, minute)`.
///
/// An empty expression, or one with fewer than two fields, yields the
/// 02:00 default. A `*` or non-numeric field keeps that field's default.
/// Numeric values outside `0-23` / `0-59` are rejected.
pub fn parse_daily_schedule(expr: &str) -> Result<(u32, u32), AppError> {
    let parts: Vec<&str> = expr.split_whitespace().collect();
    if parts.len() < 2 {
        return Ok((DEFAULT_CRON_HOUR, DEFAULT_CRON_MINUTE));
    }

    let minute = parse_field(parts[0]).unwrap_or(DEFAULT_CRON_MINUTE);
    let hour = parse_field(parts[1]).unwrap_or(DEFAULT_CRON_HOUR);

    if minute > 59 {
        return Err(AppError::configuration(format!(
            "cron minute must be 0-59, got {minute}"
        )));
    }
    if hour > 23 {
        return Err(AppError::configuration(format!(
            "cron hour must be 0-23, got {hour}"
        )));
    }

    Ok((hour, minute))
}

fn parse_field(field: &str) -> Option<u32> {
    if field == "*" || !field.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

fn default_true() -> bool {
    true
}

fn default_schedule() -> String {
    "0 2 * * *".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_standard_expression() {
        assert_eq!(parse_daily_schedule("30 2 * * *").unwrap(), (2, 30));
        assert_eq!(parse_daily_schedule("0 23 * * *").unwrap(), (23, 0));
    }

    #[test]
    fn test_parse_empty_uses_default() {
        assert_eq!(parse_daily_schedule("").unwrap(), (2, 0));
        assert_eq!(parse_daily_schedule("15").unwrap(), (2, 0));
    }

    #[test]
    fn test_parse_wildcards_and_garbage_fall_back_per_field() {
        assert_eq!(parse_daily_schedule("* 4 * * *").unwrap(), (4, 0));
        assert_eq!(parse_daily_schedule("45 */2 * * *").unwrap(), (2, 45));
    }

    #[test]
    fn test_parse_out_of_range_rejected() {
        assert!(parse_daily_schedule("60 2 * * *").is_err());
        assert!(parse_daily_schedule("0 24 * * *").is_err());
    }

    #[test]
    fn test_default_config_resolves_to_two_am() {
        assert_eq!(ReportCronConfig::default().hour_minute().unwrap(), (2, 0));
    }
}
