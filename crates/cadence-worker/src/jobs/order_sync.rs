//! Marketplace order sync executor.
//!
//! Pulls the orders of one `(tenant, integration)` window from the
//! registered [`MarketplaceAdapter`] and hands each order to an
//! [`OrderSink`]. Per-order failures are counted, not fatal: the job ends
//! `Partial` when some orders made it through.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use cadence_core::result::AppResult;
use cadence_core::types::TenantId;
use cadence_entity::integration::IntegrationCode;
use cadence_entity::job::{Job, SyncWindow};

use crate::executor::{Executor, JobExecutionError};

/// One order as returned by a marketplace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketplaceOrder {
    /// Marketplace-side order identifier.
    pub order_id: String,
    /// When the marketplace last modified the order.
    pub updated_at: DateTime<Utc>,
    /// Raw marketplace payload.
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Result of handing one order to the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderOutcome {
    /// The order was created or updated.
    Imported,
    /// The order was already up to date.
    Skipped,
}

/// Client for one marketplace.
#[async_trait]
pub trait MarketplaceAdapter: Send + Sync {
    /// Integration this adapter serves.
    fn code(&self) -> IntegrationCode;

    /// Orders modified inside `window`.
    async fn pull_orders(
        &self,
        tenant: TenantId,
        window: SyncWindow,
    ) -> AppResult<Vec<MarketplaceOrder>>;
}

/// Receives every pulled order for further processing.
#[async_trait]
pub trait OrderSink: Send + Sync {
    /// Process one order.
    async fn handle_order(
        &self,
        tenant: TenantId,
        integration: &IntegrationCode,
        order: &MarketplaceOrder,
    ) -> AppResult<OrderOutcome>;
}

/// Sink that accepts every order without doing anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopOrderSink;

#[async_trait]
impl OrderSink for NoopOrderSink {
    async fn handle_order(
        &self,
        _tenant: TenantId,
        _integration: &IntegrationCode,
        _order: &MarketplaceOrder,
    ) -> AppResult<OrderOutcome> {
        Ok(OrderOutcome::Imported)
    }
}

/// Executes sync jobs by dispatching on the job's integration code.
pub struct OrderSyncExecutor {
    adapters: HashMap<IntegrationCode, Arc<dyn MarketplaceAdapter>>,
    sink: Arc<dyn OrderSink>,
}

impl OrderSyncExecutor {
    /// Executor with no adapters, forwarding orders to `sink`.
    pub fn new(sink: Arc<dyn OrderSink>) -> Self {
        Self {
            adapters: HashMap::new(),
            sink,
        }
    }

    /// Register an adapter, replacing any previous one for the same code.
    pub fn register(&mut self, adapter: Arc<dyn MarketplaceAdapter>) {
        let code = adapter.code();
        tracing::info!("Registered marketplace adapter for '{}'", code);
        self.adapters.insert(code, adapter);
    }

    /// Builder form of [`Self::register`].
    pub fn with_adapter(mut self, adapter: Arc<dyn MarketplaceAdapter>) -> Self {
        self.register(adapter);
        self
    }

    /// Codes with a registered adapter.
    pub fn registered(&self) -> Vec<IntegrationCode> {
        let mut codes: Vec<IntegrationCode> = self.adapters.keys().cloned().collect();
        codes.sort();
        codes
    }
}

#[async_trait]
impl Executor for OrderSyncExecutor {
    async fn execute(
        &self,
        cancel: CancellationToken,
        job: &mut Job,
    ) -> Result<(), JobExecutionError> {
        let (Some(tenant), Some(key), Some(window)) = (job.tenant(), job.scope_key(), job.window)
        else {
            return Err(JobExecutionError::Permanent(
                "sync job needs a tenant, an integration and a window".into(),
            ));
        };
        let integration = IntegrationCode::new(key);
        let adapter = self.adapters.get(&integration).ok_or_else(|| {
            JobExecutionError::Permanent(format!("no adapter registered for '{}'", integration))
        })?;

        let orders = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(JobExecutionError::Cancelled),
            pulled = adapter.pull_orders(tenant, window) => pulled.map_err(|e| {
                JobExecutionError::Transient(format!("Failed to pull {} orders: {}", integration, e))
            })?,
        };

        tracing::info!(
            job_id = %job.id,
            tenant_id = %tenant,
            "Pulled {} {} orders for {} .. {}",
            orders.len(),
            integration,
            window.start,
            window.end
        );

        let mut success = 0u32;
        let mut failed = 0u32;
        let mut skipped = 0u32;
        for order in &orders {
            if cancel.is_cancelled() {
                return Err(JobExecutionError::Cancelled);
            }
            match self.sink.handle_order(tenant, &integration, order).await {
                Ok(OrderOutcome::Imported) => success += 1,
                Ok(OrderOutcome::Skipped) => skipped += 1,
                Err(e) => {
                    tracing::warn!(
                        job_id = %job.id,
                        "Order {} failed: {}",
                        order.order_id,
                        e
                    );
                    job.record_failed_item(order.order_id.clone());
                    failed += 1;
                }
            }
        }

        let total = u32::try_from(orders.len()).unwrap_or(u32::MAX);
        job.complete(total, success, failed, skipped);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use cadence_core::error::AppError;
    use cadence_entity::job::JobStatus;

    struct FixedAdapter {
        code: &'static str,
        orders: Vec<MarketplaceOrder>,
        fail: bool,
    }

    #[async_trait]
    impl MarketplaceAdapter for FixedAdapter {
        fn code(&self) -> IntegrationCode {
            IntegrationCode::new(self.code)
        }

        async fn pull_orders(
            &self,
            _tenant: TenantId,
            _window: SyncWindow,
        ) -> AppResult<Vec<MarketplaceOrder>> {
            if self.fail {
                return Err(AppError::external("gateway timeout"));
            }
            Ok(self.orders.clone())
        }
    }

    /// Rejects orders whose id starts with `bad`, skips ids starting with `dup`.
    #[derive(Default)]
    struct PickySink {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl OrderSink for PickySink {
        async fn handle_order(
            &self,
            _tenant: TenantId,
            _integration: &IntegrationCode,
            order: &MarketplaceOrder,
        ) -> AppResult<OrderOutcome> {
            self.seen.lock().unwrap().push(order.order_id.clone());
            if order.order_id.starts_with("bad") {
                Err(AppError::validation("malformed order"))
            } else if order.order_id.starts_with("dup") {
                Ok(OrderOutcome::Skipped)
            } else {
                Ok(OrderOutcome::Imported)
            }
        }
    }

    fn order(id: &str) -> MarketplaceOrder {
        MarketplaceOrder {
            order_id: id.into(),
            updated_at: Utc::now(),
            payload: serde_json::json!({"id": id}),
        }
    }

    fn running_job(code: &str) -> Job {
        let end = Utc::now();
        let mut job = Job::sync(
            TenantId::new(),
            &IntegrationCode::new(code),
            SyncWindow::new(end - chrono::Duration::hours(1), end),
            3,
        );
        job.start();
        job
    }

    fn executor(orders: Vec<MarketplaceOrder>, sink: Arc<dyn OrderSink>) -> OrderSyncExecutor {
        OrderSyncExecutor::new(sink).with_adapter(Arc::new(FixedAdapter {
            code: "taobao",
            orders,
            fail: false,
        }))
    }

    #[tokio::test]
    async fn test_counts_each_outcome() {
        let sink = Arc::new(PickySink::default());
        let executor = executor(
            vec![order("o-1"), order("dup-2"), order("bad-3"), order("o-4")],
            sink.clone(),
        );
        let mut job = running_job("TAOBAO");

        executor
            .execute(CancellationToken::new(), &mut job)
            .await
            .unwrap();

        assert_eq!(job.status(), JobStatus::Partial);
        let counters = job.counters();
        assert_eq!(
            (counters.total, counters.success, counters.failed, counters.skipped),
            (4, 2, 1, 1)
        );
        assert_eq!(job.failed_items(), ["bad-3"]);
        assert_eq!(sink.seen.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_all_orders_failing_is_failed() {
        let executor = executor(
            vec![order("bad-1"), order("bad-2")],
            Arc::new(PickySink::default()),
        );
        let mut job = running_job("TAOBAO");

        executor
            .execute(CancellationToken::new(), &mut job)
            .await
            .unwrap();
        assert_eq!(job.status(), JobStatus::Failed);
        assert!(job.should_retry());
    }

    #[tokio::test]
    async fn test_empty_window_is_success() {
        let executor = executor(Vec::new(), Arc::new(NoopOrderSink));
        let mut job = running_job("TAOBAO");

        executor
            .execute(CancellationToken::new(), &mut job)
            .await
            .unwrap();
        assert_eq!(job.status(), JobStatus::Success);
        assert_eq!(job.counters().total, 0);
    }

    #[tokio::test]
    async fn test_pull_failure_is_transient() {
        let executor = OrderSyncExecutor::new(Arc::new(NoopOrderSink)).with_adapter(Arc::new(
            FixedAdapter {
                code: "DOUYIN",
                orders: Vec::new(),
                fail: true,
            },
        ));
        let mut job = running_job("DOUYIN");

        let err = executor
            .execute(CancellationToken::new(), &mut job)
            .await
            .unwrap_err();
        assert!(matches!(err, JobExecutionError::Transient(_)));
    }

    #[tokio::test]
    async fn test_missing_adapter_is_permanent() {
        let executor = executor(Vec::new(), Arc::new(NoopOrderSink));
        assert_eq!(executor.registered(), vec![IntegrationCode::new("TAOBAO")]);

        let mut job = running_job("JD");
        let err = executor
            .execute(CancellationToken::new(), &mut job)
            .await
            .unwrap_err();
        assert!(matches!(err, JobExecutionError::Permanent(_)));
        assert!(!err.is_retryable());
    }
}
