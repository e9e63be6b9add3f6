//! Shared fixtures for scheduler integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use cadence_core::config::worker::WorkerConfig;
use cadence_core::result::AppResult;
use cadence_core::types::TenantId;
use cadence_entity::integration::{IntegrationCode, SyncConfig};
use cadence_entity::job::{Job, SyncWindow};
use cadence_worker::provider::InMemoryConfigProvider;
use cadence_worker::{ConfigProvider, WorkerPool};
use cadence_worker::executor::{Executor, JobExecutionError};
use cadence_worker::jobs::{MarketplaceAdapter, MarketplaceOrder};

/// Pool config with short delays, suitable for paused-time tests.
pub fn fast_pool_config(name: &str) -> WorkerConfig {
    WorkerConfig {
        name: name.to_string(),
        max_concurrent_jobs: 2,
        retry_delay_seconds: 1,
        job_timeout_seconds: 30,
        ..WorkerConfig::default()
    }
}

/// Wait until the pool has recorded at least `entries` finished attempts.
pub async fn wait_for_history(pool: &WorkerPool, entries: usize) {
    tokio::time::timeout(Duration::from_secs(3600), async {
        while pool.history().len() < entries {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("history did not fill in time");
}

/// Stop a pool, asserting a clean shutdown.
pub async fn stop_pool(pool: &WorkerPool) {
    pool.stop(Duration::from_secs(5))
        .await
        .expect("pool did not stop cleanly");
}

/// Fresh shutdown token.
pub fn shutdown() -> CancellationToken {
    CancellationToken::new()
}

/// Executor failing the first `failures` attempts, then succeeding.
pub struct FlakyExecutor {
    failures: u32,
    calls: AtomicU32,
}

impl FlakyExecutor {
    pub fn new(failures: u32) -> Self {
        Self {
            failures,
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Executor for FlakyExecutor {
    async fn execute(
        &self,
        _cancel: CancellationToken,
        job: &mut Job,
    ) -> Result<(), JobExecutionError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(JobExecutionError::Transient(format!(
                "upstream unavailable on attempt {}",
                call + 1
            )));
        }
        job.complete(1, 1, 0, 0);
        Ok(())
    }
}

/// Adapter returning a fixed number of synthetic orders per pull.
pub struct SyntheticMarketplace {
    code: IntegrationCode,
    orders_per_pull: usize,
    pulls: AtomicU32,
}

impl SyntheticMarketplace {
    pub fn new(code: &str, orders_per_pull: usize) -> Self {
        Self {
            code: IntegrationCode::new(code),
            orders_per_pull,
            pulls: AtomicU32::new(0),
        }
    }

    pub fn pulls(&self) -> u32 {
        self.pulls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketplaceAdapter for SyntheticMarketplace {
    fn code(&self) -> IntegrationCode {
        self.code.clone()
    }

    async fn pull_orders(
        &self,
        tenant: TenantId,
        window: SyncWindow,
    ) -> AppResult<Vec<MarketplaceOrder>> {
        self.pulls.fetch_add(1, Ordering::SeqCst);
        Ok((0..self.orders_per_pull)
            .map(|i| MarketplaceOrder {
                order_id: format!("{}-{}-{}", self.code, window.end.timestamp(), i),
                updated_at: Utc::now(),
                payload: serde_json::json!({ "tenant": tenant.to_string(), "line": i }),
            })
            .collect())
    }
}

/// Shorthand for a pool wrapped in an `Arc`.
pub fn pool(config: WorkerConfig, executor: Arc<dyn Executor>) -> Arc<WorkerPool> {
    Arc::new(WorkerPool::new(config, executor).expect("valid pool config"))
}

/// In-memory provider that yields on every last-sync lookup, so concurrent
/// checks interleave at the provider call.
pub struct YieldingProvider {
    inner: InMemoryConfigProvider,
}

impl YieldingProvider {
    pub fn new(configs: Vec<SyncConfig>) -> Self {
        Self {
            inner: InMemoryConfigProvider::new(configs),
        }
    }
}

#[async_trait]
impl ConfigProvider for YieldingProvider {
    async fn get_enabled_configs(&self) -> AppResult<Vec<SyncConfig>> {
        self.inner.get_enabled_configs().await
    }

    async fn get_config(
        &self,
        tenant: TenantId,
        integration: &IntegrationCode,
    ) -> AppResult<Option<SyncConfig>> {
        self.inner.get_config(tenant, integration).await
    }

    async fn get_last_sync_time(
        &self,
        tenant: TenantId,
        integration: &IntegrationCode,
    ) -> AppResult<Option<DateTime<Utc>>> {
        tokio::task::yield_now().await;
        self.inner.get_last_sync_time(tenant, integration).await
    }

    async fn update_last_sync_time(
        &self,
        tenant: TenantId,
        integration: &IntegrationCode,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        self.inner.update_last_sync_time(tenant, integration, at).await
    }
}
