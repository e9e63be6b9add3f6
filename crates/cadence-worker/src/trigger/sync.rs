//! Per-tenant interval trigger for marketplace order sync.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use cadence_core::config::sync::SyncTriggerConfig;
use cadence_core::types::TenantId;
use cadence_entity::integration::{IntegrationCode, SyncConfig};
use cadence_entity::job::{Job, JobStatus, SyncWindow};

use crate::error::SchedulerError;
use crate::observer::JobObserver;
use crate::pool::{PoolStats, WorkerPool};
use crate::provider::ConfigProvider;

/// Snapshot returned by [`SyncCronTrigger::stats`].
#[derive(Debug, Clone, Serialize)]
pub struct SyncTriggerStats {
    /// Whether the trigger is enabled in configuration
    pub enabled: bool,
    /// Whether the check loop is running
    pub running: bool,
    /// Seconds between configuration checks
    pub check_interval_seconds: u64,
    /// Pairs with a recorded scheduling time
    pub tracked_configs: usize,
    /// Last scheduling time per `tenant:INTEGRATION` key
    pub last_scheduled: BTreeMap<String, DateTime<Utc>>,
    /// Pool the trigger submits into
    pub pool: PoolStats,
}

struct SyncInner {
    config: SyncTriggerConfig,
    pool: Arc<WorkerPool>,
    provider: Arc<dyn ConfigProvider>,
    /// When a job was last submitted per pair; read on every check
    last_scheduled: RwLock<HashMap<String, DateTime<Utc>>>,
}

/// Interval trigger driven by per-tenant configuration.
///
/// Every check fetches the enabled `(tenant, integration)` pairs and
/// submits a sync job for each pair whose interval has elapsed since its
/// last submission.
pub struct SyncCronTrigger {
    inner: Arc<SyncInner>,
    task: Mutex<Option<(CancellationToken, JoinHandle<()>)>>,
}

impl std::fmt::Debug for SyncCronTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncCronTrigger")
            .field("check_interval_seconds", &self.inner.config.check_interval_seconds)
            .field("running", &self.is_running())
            .finish()
    }
}

impl SyncCronTrigger {
    /// Build a stopped trigger. Fails on inconsistent interval bounds.
    pub fn new(
        config: SyncTriggerConfig,
        pool: Arc<WorkerPool>,
        provider: Arc<dyn ConfigProvider>,
    ) -> Result<Self, SchedulerError> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(SyncInner {
                config,
                pool,
                provider,
                last_scheduled: RwLock::new(HashMap::new()),
            }),
            task: Mutex::new(None),
        })
    }

    /// Start the check loop; the first check runs immediately.
    ///
    /// Idempotent. A disabled trigger stays stopped.
    pub fn start(&self, shutdown: &CancellationToken) {
        if !self.inner.config.enabled {
            tracing::info!("Order sync trigger disabled; not starting");
            return;
        }

        let mut task = self.lock_task();
        if task.is_some() {
            return;
        }

        let cancel = shutdown.child_token();
        let handle = tokio::spawn(Arc::clone(&self.inner).run(cancel.clone()));
        *task = Some((cancel, handle));

        tracing::info!(
            "Order sync trigger started: check every {}s, default interval {}m (bounds {}m..{}m)",
            self.inner.config.check_interval_seconds,
            self.inner.config.default_sync_interval_minutes,
            self.inner.config.min_sync_interval_minutes,
            self.inner.config.max_sync_interval_minutes
        );
    }

    /// Stop the check loop and wait up to `deadline` for it. Idempotent.
    pub async fn stop(&self, deadline: Duration) -> Result<(), SchedulerError> {
        let task = self.lock_task().take();
        let Some((cancel, handle)) = task else {
            return Ok(());
        };
        cancel.cancel();

        match tokio::time::timeout(deadline, handle).await {
            Ok(_) => {
                tracing::info!("Order sync trigger stopped");
                Ok(())
            }
            Err(_) => Err(SchedulerError::StopTimeout(deadline)),
        }
    }

    /// Whether the check loop is running.
    pub fn is_running(&self) -> bool {
        self.lock_task()
            .as_ref()
            .is_some_and(|(cancel, _)| !cancel.is_cancelled())
    }

    /// Run one check over every enabled pair. Returns the jobs submitted.
    pub async fn check_and_schedule(&self, now: DateTime<Utc>) -> usize {
        self.inner.check_and_schedule(now).await
    }

    /// Dedup-and-submit step for one pair.
    ///
    /// Returns `Ok(None)` when the pair is disabled or its interval has not
    /// elapsed since the last submission.
    pub async fn schedule_sync(
        &self,
        config: &SyncConfig,
        now: DateTime<Utc>,
    ) -> Result<Option<Job>, SchedulerError> {
        self.inner.schedule_sync(config, now).await
    }

    /// Submit a sync job for an explicit window, bypassing dedup.
    pub async fn trigger_manual_sync(
        &self,
        tenant: TenantId,
        integration: &IntegrationCode,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Job, SchedulerError> {
        let window = SyncWindow::new(start, end);
        window.validate(self.inner.config.max_manual_window())?;

        let job = Job::sync(tenant, integration, window, self.inner.pool.retry_attempts());
        self.inner.pool.submit_job(job.clone()).await?;

        tracing::info!(
            job_id = %job.id,
            tenant_id = %tenant,
            "Manual {} sync submitted for {} .. {}",
            integration,
            start,
            end
        );
        Ok(job)
    }

    /// Manual sync across every enabled integration of `tenant`.
    ///
    /// A failing integration is logged and skipped; the call only fails
    /// when nothing could be submitted.
    pub async fn trigger_manual_sync_for_all_platforms(
        &self,
        tenant: TenantId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Job>, SchedulerError> {
        SyncWindow::new(start, end).validate(self.inner.config.max_manual_window())?;

        let configs: Vec<SyncConfig> = self
            .inner
            .provider
            .get_enabled_configs()
            .await?
            .into_iter()
            .filter(|c| c.tenant_id == tenant)
            .collect();
        if configs.is_empty() {
            return Err(SchedulerError::NoEnabledPlatforms(tenant));
        }

        let mut jobs = Vec::with_capacity(configs.len());
        let mut first_error = None;
        for config in &configs {
            match self
                .trigger_manual_sync(tenant, &config.integration, start, end)
                .await
            {
                Ok(job) => jobs.push(job),
                Err(e) => {
                    tracing::error!(
                        tenant_id = %tenant,
                        "Manual {} sync failed: {}",
                        config.integration,
                        e
                    );
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) if jobs.is_empty() => Err(e),
            _ => Ok(jobs),
        }
    }

    /// Trigger and pool statistics.
    pub fn stats(&self) -> SyncTriggerStats {
        let last_scheduled: BTreeMap<String, DateTime<Utc>> = self
            .inner
            .read_last_scheduled()
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();

        SyncTriggerStats {
            enabled: self.inner.config.enabled,
            running: self.is_running(),
            check_interval_seconds: self.inner.config.check_interval_seconds,
            tracked_configs: last_scheduled.len(),
            last_scheduled,
            pool: self.inner.pool.stats(),
        }
    }

    /// Most recent sync jobs, newest first.
    pub fn job_history(&self, limit: usize) -> Vec<Job> {
        self.inner.pool.job_history(limit)
    }

    /// Most recent sync jobs for one tenant.
    pub fn job_history_for_tenant(&self, tenant: TenantId, limit: usize) -> Vec<Job> {
        self.inner.pool.job_history_for_tenant(tenant, limit)
    }

    /// Most recent sync jobs for one tenant and integration.
    pub fn job_history_for_integration(
        &self,
        tenant: TenantId,
        integration: &IntegrationCode,
        limit: usize,
    ) -> Vec<Job> {
        self.inner
            .pool
            .job_history_for_integration(tenant, integration, limit)
    }

    fn lock_task(&self) -> std::sync::MutexGuard<'_, Option<(CancellationToken, JoinHandle<()>)>> {
        self.task.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SyncInner {
    async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.check_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.check_and_schedule(Utc::now()).await;
                }
            }
        }
    }

    #[tracing::instrument(name = "sync_check", skip_all, fields(now = %now))]
    async fn check_and_schedule(&self, now: DateTime<Utc>) -> usize {
        let configs = match self.provider.get_enabled_configs().await {
            Ok(configs) => configs,
            Err(e) => {
                tracing::error!("Failed to load sync configs: {}", e);
                return 0;
            }
        };

        let mut submitted = 0;
        for config in &configs {
            match self.schedule_sync(config, now).await {
                Ok(Some(_)) => submitted += 1,
                Ok(None) => {}
                Err(e) => tracing::error!(
                    tenant_id = %config.tenant_id,
                    "Failed to schedule {} sync: {}",
                    config.integration,
                    e
                ),
            }
        }

        if submitted > 0 {
            tracing::info!(
                "Sync check submitted {} of {} configs",
                submitted,
                configs.len()
            );
        } else {
            tracing::debug!("Sync check found nothing due among {} configs", configs.len());
        }
        submitted
    }

    async fn schedule_sync(
        &self,
        config: &SyncConfig,
        now: DateTime<Utc>,
    ) -> Result<Option<Job>, SchedulerError> {
        if !config.enabled {
            return Ok(None);
        }

        let key = config.key();
        let interval = self.config.sync_interval(config.interval_override());

        // Check and reserve in one critical section so overlapping checks
        // for the same pair cannot both pass.
        let previous = {
            let mut scheduled = self.write_last_scheduled();
            if let Some(last) = scheduled.get(&key).copied() {
                let due = (now - last).to_std().is_ok_and(|elapsed| elapsed >= interval);
                if !due {
                    tracing::trace!("Sync for {} not due yet", key);
                    return Ok(None);
                }
            }
            scheduled.insert(key.clone(), now)
        };

        let window = self.sync_window(config, now).await;
        let job = Job::sync(
            config.tenant_id,
            &config.integration,
            window,
            self.pool.retry_attempts(),
        );
        if let Err(e) = self.pool.submit_job(job.clone()).await {
            self.release_reservation(&key, now, previous);
            return Err(e);
        }

        tracing::debug!(
            job_id = %job.id,
            tenant_id = %config.tenant_id,
            "Scheduled {} sync for {} .. {}",
            config.integration,
            window.start,
            window.end
        );
        Ok(Some(job))
    }

    /// `[last - lookback, now]` after a known sync, else the first-sync window.
    async fn sync_window(&self, config: &SyncConfig, now: DateTime<Utc>) -> SyncWindow {
        let last = match self
            .provider
            .get_last_sync_time(config.tenant_id, &config.integration)
            .await
        {
            Ok(last) => last,
            Err(e) => {
                tracing::warn!(
                    tenant_id = %config.tenant_id,
                    "Failed to read last {} sync time, using first-sync window: {}",
                    config.integration,
                    e
                );
                None
            }
        };

        match last {
            Some(last) => {
                let lookback = chrono::Duration::from_std(self.config.lookback())
                    .unwrap_or(chrono::Duration::zero());
                let start = (last - lookback).min(now - lookback);
                SyncWindow::new(start, now)
            }
            None => SyncWindow::ending_at(now, self.config.first_sync_lookback()),
        }
    }

    /// Undo a reservation made at `reserved_at`, unless a later check
    /// has replaced it.
    fn release_reservation(
        &self,
        key: &str,
        reserved_at: DateTime<Utc>,
        previous: Option<DateTime<Utc>>,
    ) {
        let mut scheduled = self.write_last_scheduled();
        if scheduled.get(key) != Some(&reserved_at) {
            return;
        }
        match previous {
            Some(at) => scheduled.insert(key.to_string(), at),
            None => scheduled.remove(key),
        };
    }

    fn write_last_scheduled(
        &self,
    ) -> std::sync::RwLockWriteGuard<'_, HashMap<String, DateTime<Utc>>> {
        self.last_scheduled.write().unwrap_or_else(|e| e.into_inner())
    }

    fn read_last_scheduled(
        &self,
    ) -> std::sync::RwLockReadGuard<'_, HashMap<String, DateTime<Utc>>> {
        self.last_scheduled.read().unwrap_or_else(|e| e.into_inner())
    }
}

/// Observer reporting successful sync windows back to the provider.
///
/// Register it on the sync pool so the next scheduled window starts from
/// the end of the last one that succeeded.
pub struct LastSyncRecorder {
    provider: Arc<dyn ConfigProvider>,
}

impl LastSyncRecorder {
    /// Recorder writing through `provider`.
    pub fn new(provider: Arc<dyn ConfigProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl JobObserver for LastSyncRecorder {
    async fn on_job_finished(&self, job: &Job) {
        if !matches!(job.status(), JobStatus::Success | JobStatus::Partial) {
            return;
        }
        let (Some(tenant), Some(key), Some(window)) = (job.tenant(), job.scope_key(), job.window)
        else {
            return;
        };

        let integration = IntegrationCode::new(key);
        if let Err(e) = self
            .provider
            .update_last_sync_time(tenant, &integration, window.end)
            .await
        {
            tracing::warn!(
                job_id = %job.id,
                "Failed to record last {} sync time: {}",
                integration,
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use cadence_core::config::worker::WorkerConfig;
    use cadence_core::result::AppResult;

    use crate::executor::{Executor, JobExecutionError};
    use crate::provider::InMemoryConfigProvider;

    /// Holds every job until cancelled so the queue contents stay visible.
    struct Parked {
        calls: AtomicU32,
    }

    #[async_trait]
    impl Executor for Parked {
        async fn execute(
            &self,
            cancel: CancellationToken,
            _job: &mut Job,
        ) -> Result<(), JobExecutionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            cancel.cancelled().await;
            Err(JobExecutionError::Cancelled)
        }
    }

    struct Fixture {
        trigger: SyncCronTrigger,
        pool: Arc<WorkerPool>,
        provider: Arc<InMemoryConfigProvider>,
        shutdown: CancellationToken,
    }

    fn fixture(configs: Vec<SyncConfig>) -> Fixture {
        let pool = Arc::new(
            WorkerPool::new(
                WorkerConfig {
                    name: "sync".into(),
                    retry_attempts: 0,
                    ..WorkerConfig::default()
                },
                Arc::new(Parked {
                    calls: AtomicU32::new(0),
                }),
            )
            .unwrap(),
        );
        let provider = Arc::new(InMemoryConfigProvider::new(configs));
        let trigger = SyncCronTrigger::new(
            SyncTriggerConfig::default(),
            pool.clone(),
            provider.clone(),
        )
        .unwrap();
        let shutdown = CancellationToken::new();
        pool.start(&shutdown);
        Fixture {
            trigger,
            pool,
            provider,
            shutdown,
        }
    }

    impl Fixture {
        async fn stop(self) {
            self.trigger.stop(Duration::from_secs(1)).await.unwrap();
            self.pool.stop(Duration::from_secs(1)).await.unwrap();
            self.shutdown.cancel();
        }
    }

    #[tokio::test]
    async fn test_dedup_within_interval() {
        let config = SyncConfig::new(TenantId::new(), IntegrationCode::new("TAOBAO"));
        let fx = fixture(vec![config.clone()]);
        let now = Utc::now();

        assert!(fx.trigger.schedule_sync(&config, now).await.unwrap().is_some());
        assert!(fx
            .trigger
            .schedule_sync(&config, now + chrono::Duration::minutes(5))
            .await
            .unwrap()
            .is_none());
        assert_eq!(fx.pool.stats().submitted, 1);

        assert!(fx
            .trigger
            .schedule_sync(&config, now + chrono::Duration::minutes(15))
            .await
            .unwrap()
            .is_some());
        assert_eq!(fx.pool.stats().submitted, 2);

        fx.stop().await;
    }

    #[tokio::test]
    async fn test_interval_override_is_clamped() {
        let config = SyncConfig::new(TenantId::new(), IntegrationCode::new("DOUYIN"))
            .with_interval_minutes(1);
        let fx = fixture(vec![config.clone()]);
        let now = Utc::now();

        fx.trigger.schedule_sync(&config, now).await.unwrap();
        let early = fx
            .trigger
            .schedule_sync(&config, now + chrono::Duration::minutes(2))
            .await
            .unwrap();
        assert!(early.is_none());
        let due = fx
            .trigger
            .schedule_sync(&config, now + chrono::Duration::minutes(5))
            .await
            .unwrap();
        assert!(due.is_some());

        fx.stop().await;
    }

    #[tokio::test]
    async fn test_disabled_config_is_skipped() {
        let mut config = SyncConfig::new(TenantId::new(), IntegrationCode::new("TAOBAO"));
        config.enabled = false;
        let fx = fixture(vec![]);

        assert!(fx.trigger.schedule_sync(&config, Utc::now()).await.unwrap().is_none());
        assert_eq!(fx.pool.stats().submitted, 0);

        fx.stop().await;
    }

    #[tokio::test]
    async fn test_first_sync_covers_default_window() {
        let config = SyncConfig::new(TenantId::new(), IntegrationCode::new("TAOBAO"));
        let fx = fixture(vec![config.clone()]);
        let now = Utc::now();

        let job = fx.trigger.schedule_sync(&config, now).await.unwrap().unwrap();
        let window = job.window.unwrap();
        assert_eq!(window.end, now);
        assert_eq!(window.span(), chrono::Duration::hours(24));

        fx.stop().await;
    }

    #[tokio::test]
    async fn test_window_starts_at_last_sync_minus_lookback() {
        let config = SyncConfig::new(TenantId::new(), IntegrationCode::new("TAOBAO"));
        let fx = fixture(vec![config.clone()]);
        let now = Utc::now();
        let last = now - chrono::Duration::hours(2);
        fx.provider
            .update_last_sync_time(config.tenant_id, &config.integration, last)
            .await
            .unwrap();

        let job = fx.trigger.schedule_sync(&config, now).await.unwrap().unwrap();
        let window = job.window.unwrap();
        assert_eq!(window.start, last - chrono::Duration::minutes(5));
        assert_eq!(window.end, now);

        fx.stop().await;
    }

    #[tokio::test]
    async fn test_check_schedules_every_enabled_pair() {
        let tenant = TenantId::new();
        let mut disabled = SyncConfig::new(tenant, IntegrationCode::new("JD"));
        disabled.enabled = false;
        let fx = fixture(vec![
            SyncConfig::new(tenant, IntegrationCode::new("TAOBAO")),
            SyncConfig::new(tenant, IntegrationCode::new("DOUYIN")),
            disabled,
        ]);
        let now = Utc::now();

        assert_eq!(fx.trigger.check_and_schedule(now).await, 2);
        assert_eq!(fx.trigger.check_and_schedule(now).await, 0);

        let stats = fx.trigger.stats();
        assert_eq!(stats.tracked_configs, 2);
        assert!(stats.last_scheduled.contains_key(&format!("{tenant}:TAOBAO")));
        assert_eq!(stats.pool.submitted, 2);

        fx.stop().await;
    }

    #[tokio::test]
    async fn test_manual_sync_rejects_inverted_window() {
        let fx = fixture(vec![]);
        let now = Utc::now();

        let result = fx
            .trigger
            .trigger_manual_sync(
                TenantId::new(),
                &IntegrationCode::new("TAOBAO"),
                now,
                now - chrono::Duration::hours(1),
            )
            .await;
        assert!(matches!(result, Err(SchedulerError::InvalidTimeRange(_))));
        assert_eq!(fx.pool.stats().submitted, 0);

        fx.stop().await;
    }

    #[tokio::test]
    async fn test_manual_sync_rejects_window_over_seven_days() {
        let fx = fixture(vec![]);
        let now = Utc::now();

        let result = fx
            .trigger
            .trigger_manual_sync(
                TenantId::new(),
                &IntegrationCode::new("TAOBAO"),
                now - chrono::Duration::days(8),
                now,
            )
            .await;
        assert!(matches!(result, Err(SchedulerError::InvalidTimeRange(_))));
        assert_eq!(fx.pool.stats().submitted, 0);

        fx.stop().await;
    }

    #[tokio::test]
    async fn test_manual_sync_bypasses_dedup() {
        let config = SyncConfig::new(TenantId::new(), IntegrationCode::new("TAOBAO"));
        let fx = fixture(vec![config.clone()]);
        let now = Utc::now();

        fx.trigger.schedule_sync(&config, now).await.unwrap();
        fx.trigger
            .trigger_manual_sync(
                config.tenant_id,
                &config.integration,
                now - chrono::Duration::days(7),
                now,
            )
            .await
            .unwrap();
        assert_eq!(fx.pool.stats().submitted, 2);

        fx.stop().await;
    }

    #[tokio::test]
    async fn test_manual_sync_for_all_platforms() {
        let tenant = TenantId::new();
        let fx = fixture(vec![
            SyncConfig::new(tenant, IntegrationCode::new("TAOBAO")),
            SyncConfig::new(tenant, IntegrationCode::new("DOUYIN")),
            SyncConfig::new(TenantId::new(), IntegrationCode::new("JD")),
        ]);
        let now = Utc::now();

        let jobs = fx
            .trigger
            .trigger_manual_sync_for_all_platforms(tenant, now - chrono::Duration::days(1), now)
            .await
            .unwrap();
        assert_eq!(jobs.len(), 2);
        assert!(jobs.iter().all(|j| j.tenant() == Some(tenant)));

        let none = fx
            .trigger
            .trigger_manual_sync_for_all_platforms(
                TenantId::new(),
                now - chrono::Duration::days(1),
                now,
            )
            .await;
        assert!(matches!(none, Err(SchedulerError::NoEnabledPlatforms(_))));

        fx.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_checks_immediately_and_on_interval() {
        let config = SyncConfig::new(TenantId::new(), IntegrationCode::new("TAOBAO"));
        let fx = fixture(vec![config]);

        fx.trigger.start(&fx.shutdown);
        fx.trigger.start(&fx.shutdown);
        assert!(fx.trigger.is_running());

        while fx.pool.stats().submitted == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(fx.trigger.stats().tracked_configs, 1);

        fx.stop().await;
    }

    #[tokio::test]
    async fn test_recorder_updates_last_sync_on_success_only() {
        let provider = Arc::new(InMemoryConfigProvider::default());
        let recorder = LastSyncRecorder::new(provider.clone());
        let tenant = TenantId::new();
        let code = IntegrationCode::new("TAOBAO");
        let now = Utc::now();
        let window = SyncWindow::new(now - chrono::Duration::hours(1), now);

        let mut failed = Job::sync(tenant, &code, window, 0);
        failed.start();
        failed.fail("timeout");
        recorder.on_job_finished(&failed).await;
        assert!(provider.get_last_sync_time(tenant, &code).await.unwrap().is_none());

        let mut partial = Job::sync(tenant, &code, window, 0);
        partial.start();
        partial.complete(3, 2, 1, 0);
        recorder.on_job_finished(&partial).await;
        assert_eq!(
            provider.get_last_sync_time(tenant, &code).await.unwrap(),
            Some(now)
        );
    }

    /// Yields inside every last-sync lookup so overlapping checks interleave.
    struct YieldingProvider {
        inner: InMemoryConfigProvider,
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

    #[tokio::test]
    async fn test_overlapping_checks_submit_one_job_per_pair() {
        let config = SyncConfig::new(TenantId::new(), IntegrationCode::new("TAOBAO"));
        let fx = fixture(vec![]);
        let trigger = SyncCronTrigger::new(
            SyncTriggerConfig::default(),
            fx.pool.clone(),
            Arc::new(YieldingProvider {
                inner: InMemoryConfigProvider::new(vec![config.clone()]),
            }),
        )
        .unwrap();
        let now = Utc::now();

        let (a, b) = tokio::join!(
            trigger.schedule_sync(&config, now),
            trigger.schedule_sync(&config, now)
        );
        let scheduled = [a.unwrap(), b.unwrap()]
            .iter()
            .filter(|job| job.is_some())
            .count();

        assert_eq!(scheduled, 1);
        assert_eq!(fx.pool.stats().submitted, 1);

        fx.stop().await;
    }

    #[tokio::test]
    async fn test_failed_submission_releases_dedup_slot() {
        let config = SyncConfig::new(TenantId::new(), IntegrationCode::new("TAOBAO"));
        let fx = fixture(vec![config.clone()]);
        let now = Utc::now();

        fx.pool.stop(Duration::from_secs(1)).await.unwrap();
        let rejected = fx.trigger.schedule_sync(&config, now).await;
        assert!(matches!(rejected, Err(SchedulerError::NotRunning)));
        assert_eq!(fx.trigger.stats().tracked_configs, 0);

        fx.pool.start(&fx.shutdown);
        let retried = fx.trigger.schedule_sync(&config, now).await.unwrap();
        assert!(retried.is_some());
        assert_eq!(fx.trigger.stats().tracked_configs, 1);

        fx.stop().await;
    }
}
