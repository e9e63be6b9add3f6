//! Cadence Server: recurring job scheduler
//!
//! Main entry point that wires the worker pools and triggers together and
//! runs them until a shutdown signal arrives.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, fmt};

use cadence_core::config::AppConfig;
use cadence_core::error::AppError;
use cadence_core::result::AppResult;
use cadence_core::types::TenantId;
use cadence_entity::integration::IntegrationCode;
use cadence_entity::job::SyncWindow;
use cadence_worker::jobs::{
    LoggingReportAggregator, MarketplaceAdapter, MarketplaceOrder, NoopOrderSink,
    OrderSyncExecutor, ReportAggregationExecutor,
};
use cadence_worker::provider::{InMemoryConfigProvider, StaticTenantDirectory};
use cadence_worker::trigger::LastSyncRecorder;
use cadence_worker::{ReportCronTrigger, SyncCronTrigger, WorkerPool};

/// Deadline for stopping the sync trigger's check loop.
const TRIGGER_STOP_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    let env = std::env::var("CADENCE_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!("Configuration loaded (env: {})", env);

    if let Err(e) = run(config).await {
        tracing::error!("Scheduler error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Build pools and triggers, run until shutdown, then drain.
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Cadence v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Collaborators seeded from configuration ──────────
    let tenants = Arc::new(StaticTenantDirectory::from_directory(&config.directory));
    let provider = Arc::new(InMemoryConfigProvider::from_directory(&config.directory));
    tracing::info!(
        "Directory: {} tenants, {} integration entries",
        config.directory.tenants.len(),
        config.directory.integrations.len()
    );

    // ── Step 2: Worker pools ─────────────────────────────────────
    let report_executor = ReportAggregationExecutor::new(Arc::new(LoggingReportAggregator));
    let report_pool = Arc::new(WorkerPool::new(
        config.report_pool.clone(),
        Arc::new(report_executor),
    )?);

    let mut sync_executor = OrderSyncExecutor::new(Arc::new(NoopOrderSink));
    let codes: BTreeSet<IntegrationCode> = config
        .directory
        .integrations
        .iter()
        .map(|entry| IntegrationCode::new(&entry.integration))
        .collect();
    for code in codes {
        sync_executor.register(Arc::new(DryRunMarketplace { code }));
    }
    let sync_pool = Arc::new(
        WorkerPool::new(config.sync_pool.clone(), Arc::new(sync_executor))?
            .with_observer(Arc::new(LastSyncRecorder::new(provider.clone()))),
    );

    // ── Step 3: Triggers ─────────────────────────────────────────
    let report_trigger = ReportCronTrigger::new(&config.report_cron, report_pool.clone(), tenants)?;
    let sync_trigger = SyncCronTrigger::new(config.order_sync.clone(), sync_pool.clone(), provider)?;

    // ── Step 4: Start ────────────────────────────────────────────
    let shutdown = CancellationToken::new();

    if config.report_pool.enabled {
        report_pool.start(&shutdown);
        report_trigger.start().await?;
    } else {
        tracing::info!("Report pool disabled");
    }

    if config.sync_pool.enabled {
        sync_pool.start(&shutdown);
        sync_trigger.start(&shutdown);
    } else {
        tracing::info!("Sync pool disabled");
    }

    tracing::info!("Cadence running; press Ctrl+C to stop");

    // ── Step 5: Graceful shutdown ────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received, stopping triggers...");

    if let Err(e) = sync_trigger.stop(TRIGGER_STOP_TIMEOUT).await {
        tracing::warn!("Sync trigger stop: {}", e);
    }
    if let Err(e) = report_trigger.stop().await {
        tracing::warn!("Report trigger stop: {}", e);
    }

    tracing::info!("Waiting for worker pools to drain...");
    for pool in [&report_pool, &sync_pool] {
        let stats = pool.stats();
        tracing::info!(
            "Pool '{}': submitted={}, completed={}, failed={}, retried={}",
            stats.name,
            stats.submitted,
            stats.completed,
            stats.failed,
            stats.retried
        );
        if let Err(e) = pool.stop(pool.config().stop_timeout()).await {
            tracing::warn!("Pool '{}' stop: {}", stats.name, e);
        }
    }

    shutdown.cancel();
    tracing::info!("Cadence shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Adapter used until a real marketplace client is configured; logs the
/// window it would pull and returns no orders.
struct DryRunMarketplace {
    code: IntegrationCode,
}

#[async_trait]
impl MarketplaceAdapter for DryRunMarketplace {
    fn code(&self) -> IntegrationCode {
        self.code.clone()
    }

    async fn pull_orders(
        &self,
        tenant: TenantId,
        window: SyncWindow,
    ) -> AppResult<Vec<MarketplaceOrder>> {
        tracing::info!(
            tenant_id = %tenant,
            "Dry run: would pull {} orders for {} .. {}",
            self.code,
            window.start,
            window.end
        );
        Ok(Vec::new())
    }
}
