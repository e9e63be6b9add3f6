//! Daily report aggregation executor.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use cadence_core::error::{AppError, ErrorKind};
use cadence_core::result::AppResult;
use cadence_core::types::TenantId;
use cadence_entity::job::{Job, SyncWindow};
use cadence_entity::report::ReportKind;

use crate::executor::{Executor, JobExecutionError};

/// Computes one pre-aggregated report for a tenant and window.
#[async_trait]
pub trait ReportAggregator: Send + Sync {
    /// Rebuild `kind` for `tenant` over `window`.
    async fn aggregate(&self, tenant: TenantId, kind: ReportKind, window: SyncWindow)
    -> AppResult<()>;
}

/// Executes report jobs created by the daily trigger.
pub struct ReportAggregationExecutor {
    aggregator: Arc<dyn ReportAggregator>,
}

impl ReportAggregationExecutor {
    /// Executor delegating to `aggregator`.
    pub fn new(aggregator: Arc<dyn ReportAggregator>) -> Self {
        Self { aggregator }
    }
}

#[async_trait]
impl Executor for ReportAggregationExecutor {
    async fn execute(
        &self,
        cancel: CancellationToken,
        job: &mut Job,
    ) -> Result<(), JobExecutionError> {
        let tenant = job
            .tenant()
            .ok_or_else(|| JobExecutionError::Permanent("report job has no tenant".into()))?;
        let kind = job
            .scope_key()
            .and_then(ReportKind::parse)
            .ok_or_else(|| {
                JobExecutionError::Permanent(format!(
                    "unknown report kind {:?}",
                    job.scope_key()
                ))
            })?;
        let window = job
            .window
            .ok_or_else(|| JobExecutionError::Permanent("report job has no window".into()))?;

        tracing::info!(
            job_id = %job.id,
            tenant_id = %tenant,
            "Aggregating {} for {} .. {}",
            kind,
            window.start,
            window.end
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(JobExecutionError::Cancelled),
            result = self.aggregator.aggregate(tenant, kind, window) => {
                result.map_err(classify)?;
            }
        }

        job.complete(1, 1, 0, 0);
        Ok(())
    }
}

/// Validation failures will not improve on retry.
fn classify(err: AppError) -> JobExecutionError {
    match err.kind {
        ErrorKind::Validation => JobExecutionError::Permanent(err.message),
        _ => JobExecutionError::Transient(err.to_string()),
    }
}

/// Aggregator that only logs; used when no reporting backend is wired in.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingReportAggregator;

#[async_trait]
impl ReportAggregator for LoggingReportAggregator {
    async fn aggregate(
        &self,
        tenant: TenantId,
        kind: ReportKind,
        window: SyncWindow,
    ) -> AppResult<()> {
        tracing::info!(
            tenant_id = %tenant,
            "Dry run: would aggregate {} over {} .. {}",
            kind,
            window.start,
            window.end
        );
        Ok(())
    }
}
