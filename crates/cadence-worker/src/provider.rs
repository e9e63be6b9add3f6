//! External collaborators consulted by the triggers.
//!
//! Both traits are implemented by the host application against its own
//! storage. In-memory implementations seeded from configuration are
//! provided for the standalone binary and for tests.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use cadence_core::config::directory::DirectoryConfig;
use cadence_core::result::AppResult;
use cadence_core::types::TenantId;
use cadence_entity::integration::{IntegrationCode, SyncConfig};

/// Source of per-tenant sync configuration and last-sync bookkeeping.
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    /// Every enabled `(tenant, integration)` pair.
    async fn get_enabled_configs(&self) -> AppResult<Vec<SyncConfig>>;

    /// Configuration for one pair, if it exists.
    async fn get_config(
        &self,
        tenant: TenantId,
        integration: &IntegrationCode,
    ) -> AppResult<Option<SyncConfig>>;

    /// End of the last successfully synced window, if any.
    async fn get_last_sync_time(
        &self,
        tenant: TenantId,
        integration: &IntegrationCode,
    ) -> AppResult<Option<DateTime<Utc>>>;

    /// Record the end of a successfully synced window.
    async fn update_last_sync_time(
        &self,
        tenant: TenantId,
        integration: &IntegrationCode,
        at: DateTime<Utc>,
    ) -> AppResult<()>;
}

/// Source of the tenants the daily trigger fans out over.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    /// Tenants that should receive daily aggregation.
    async fn active_tenants(&self) -> AppResult<Vec<TenantId>>;
}

/// [`ConfigProvider`] backed by process memory.
#[derive(Debug, Default)]
pub struct InMemoryConfigProvider {
    configs: RwLock<Vec<SyncConfig>>,
    last_sync: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl InMemoryConfigProvider {
    /// Provider holding `configs`.
    pub fn new(configs: Vec<SyncConfig>) -> Self {
        Self {
            configs: RwLock::new(configs),
            last_sync: RwLock::new(HashMap::new()),
        }
    }

    /// Provider seeded from the `[directory]` configuration section.
    pub fn from_directory(directory: &DirectoryConfig) -> Self {
        Self::new(directory.integrations.iter().map(SyncConfig::from).collect())
    }

    /// Insert or replace the configuration for a pair.
    pub fn upsert(&self, config: SyncConfig) {
        let mut configs = self.configs.write().unwrap_or_else(|e| e.into_inner());
        match configs
            .iter_mut()
            .find(|c| c.tenant_id == config.tenant_id && c.integration == config.integration)
        {
            Some(existing) => *existing = config,
            None => configs.push(config),
        }
    }

    fn last_sync_key(tenant: TenantId, integration: &IntegrationCode) -> String {
        format!("{tenant}:{integration}")
    }
}

#[async_trait]
impl ConfigProvider for InMemoryConfigProvider {
    async fn get_enabled_configs(&self) -> AppResult<Vec<SyncConfig>> {
        let configs = self.configs.read().unwrap_or_else(|e| e.into_inner());
        Ok(configs.iter().filter(|c| c.enabled).cloned().collect())
    }

    async fn get_config(
        &self,
        tenant: TenantId,
        integration: &IntegrationCode,
    ) -> AppResult<Option<SyncConfig>> {
        let configs = self.configs.read().unwrap_or_else(|e| e.into_inner());
        Ok(configs
            .iter()
            .find(|c| c.tenant_id == tenant && &c.integration == integration)
            .cloned())
    }

    async fn get_last_sync_time(
        &self,
        tenant: TenantId,
        integration: &IntegrationCode,
    ) -> AppResult<Option<DateTime<Utc>>> {
        let last_sync = self.last_sync.read().unwrap_or_else(|e| e.into_inner());
        Ok(last_sync
            .get(&Self::last_sync_key(tenant, integration))
            .copied())
    }

    async fn update_last_sync_time(
        &self,
        tenant: TenantId,
        integration: &IntegrationCode,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut last_sync = self.last_sync.write().unwrap_or_else(|e| e.into_inner());
        last_sync.insert(Self::last_sync_key(tenant, integration), at);
        Ok(())
    }
}

/// [`TenantDirectory`] over a fixed tenant list.
#[derive(Debug, Clone, Default)]
pub struct StaticTenantDirectory {
    tenants: Vec<TenantId>,
}

impl StaticTenantDirectory {
    /// Directory listing exactly `tenants`.
    pub fn new(tenants: Vec<TenantId>) -> Self {
        Self { tenants }
    }

    /// Directory seeded from configuration.
    ///
    /// Tenants that only appear on an integration entry are included too.
    pub fn from_directory(directory: &DirectoryConfig) -> Self {
        let mut tenants = directory.tenants.clone();
        for entry in &directory.integrations {
            if !tenants.contains(&entry.tenant_id) {
                tenants.push(entry.tenant_id);
            }
        }
        Self { tenants }
    }
}

#[async_trait]
impl TenantDirectory for StaticTenantDirectory {
    async fn active_tenants(&self) -> AppResult<Vec<TenantId>> {
        Ok(self.tenants.clone())
    }
}
