//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod directory;
pub mod logging;
pub mod report;
pub mod sync;
pub mod worker;

use serde::{Deserialize, Serialize};

use self::directory::DirectoryConfig;
use self::logging::LoggingConfig;
use self::report::ReportCronConfig;
use self::sync::SyncTriggerConfig;
use self::worker::{DEFAULT_POOL_NAME, WorkerConfig};

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Pool executing daily report aggregation jobs.
    #[serde(default = "WorkerConfig::report_defaults")]
    pub report_pool: WorkerConfig,
    /// Pool executing integration sync jobs.
    #[serde(default = "default_sync_pool")]
    pub sync_pool: WorkerConfig,
    /// Fixed-time daily trigger settings.
    #[serde(default)]
    pub report_cron: ReportCronConfig,
    /// Interval sync trigger settings.
    #[serde(default)]
    pub order_sync: SyncTriggerConfig,
    /// Tenants and integrations seeded at startup.
    #[serde(default)]
    pub directory: DirectoryConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            report_pool: WorkerConfig::report_defaults(),
            sync_pool: default_sync_pool(),
            report_cron: ReportCronConfig::default(),
            order_sync: SyncTriggerConfig::default(),
            directory: DirectoryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `CADENCE__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("CADENCE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        Self::from_config(config)
    }

    /// Deserialize merged sources, name unnamed pools after their section,
    /// and validate.
    pub fn from_config(config: config::Config) -> Result<Self, AppError> {
        let mut app: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;
        if app.report_pool.name == DEFAULT_POOL_NAME {
            app.report_pool.name = "report".to_string();
        }
        if app.sync_pool.name == DEFAULT_POOL_NAME {
            app.sync_pool.name = "sync".to_string();
        }
        app.validate()?;
        Ok(app)
    }

    /// Validate every section, failing on the first invalid one.
    pub fn validate(&self) -> Result<(), AppError> {
        self.report_pool.validate()?;
        self.sync_pool.validate()?;
        self.report_cron.hour_minute()?;
        self.order_sync.validate()?;
        Ok(())
    }
}

fn default_sync_pool() -> WorkerConfig {
    WorkerConfig {
        name: "sync".to_string(),
        ..WorkerConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.report_pool.max_concurrent_jobs, 3);
        assert_eq!(config.sync_pool.max_concurrent_jobs, 5);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let raw = r#"
            [sync_pool]
            max_concurrent_jobs = 2

            [report_cron]
            daily_cron_schedule = "30 4 * * *"
        "#;
        let config = AppConfig::from_config(
            config::Config::builder()
                .add_source(config::File::from_str(raw, config::FileFormat::Toml))
                .build()
                .unwrap(),
        )
        .unwrap();

        assert_eq!(config.sync_pool.max_concurrent_jobs, 2);
        assert_eq!(config.sync_pool.name, "sync");
        assert_eq!(config.sync_pool.queue_capacity, 100);
        assert_eq!(config.report_cron.hour_minute().unwrap(), (4, 30));
        assert_eq!(config.report_pool.name, "report");
    }

    #[test]
    fn test_invalid_section_fails_validation() {
        let mut config = AppConfig::default();
        config.order_sync.min_sync_interval_minutes = 0;
        assert!(config.validate().is_err());
    }
}
