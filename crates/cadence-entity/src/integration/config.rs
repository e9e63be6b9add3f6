//! Per-tenant integration sync configuration, as supplied by the
//! configuration store.

use serde::{Deserialize, Serialize};

use cadence_core::config::directory::IntegrationEntry;
use cadence_core::types::TenantId;

use super::code::IntegrationCode;

/// Sync settings for one `(tenant, integration)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Marketplace to pull from.
    pub integration: IntegrationCode,
    /// Whether scheduled sync is enabled.
    pub enabled: bool,
    /// Interval override in minutes; `<= 0` means "use the trigger default".
    pub sync_interval_minutes: i64,
}

impl SyncConfig {
    /// Enabled config using the trigger's default interval.
    pub fn new(tenant_id: TenantId, integration: IntegrationCode) -> Self {
        Self {
            tenant_id,
            integration,
            enabled: true,
            sync_interval_minutes: 0,
        }
    }

    /// Set an interval override.
    pub fn with_interval_minutes(mut self, minutes: i64) -> Self {
        self.sync_interval_minutes = minutes;
        self
    }

    /// The override, if one is set.
    pub fn interval_override(&self) -> Option<i64> {
        (self.sync_interval_minutes > 0).then_some(self.sync_interval_minutes)
    }

    /// Dedup key shared by every job scheduled for this pair.
    pub fn key(&self) -> String {
        format!("{}:{}", self.tenant_id, self.integration)
    }
}

impl From<&IntegrationEntry> for SyncConfig {
    fn from(entry: &IntegrationEntry) -> Self {
        Self {
            tenant_id: entry.tenant_id,
            integration: IntegrationCode::new(&entry.integration),
            enabled: entry.enabled,
            sync_interval_minutes: entry.sync_interval_minutes,
        }
    }
}
