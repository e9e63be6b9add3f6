//! Static tenant and integration directory.
//!
//! Used by the server binary to seed the in-memory providers when no
//! persistent configuration store is wired in.

use serde::{Deserialize, Serialize};

use crate::types::TenantId;

/// Tenants and integration sync settings known at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Active tenants for the daily report run.
    #[serde(default)]
    pub tenants: Vec<TenantId>,
    /// Integration sync entries.
    #[serde(default)]
    pub integrations: Vec<IntegrationEntry>,
}

/// One `(tenant, integration)` sync entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationEntry {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Integration code, e.g. `"TAOBAO"`.
    pub integration: String,
    /// Whether sync is enabled for this entry.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Per-entry interval override in minutes (`0` = trigger default).
    #[serde(default)]
    pub sync_interval_minutes: i64,
}

fn default_true() -> bool {
    true
}
