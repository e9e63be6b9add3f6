//! Fixed-time daily trigger for report aggregation.
//!
//! A one-minute tick from `tokio-cron-scheduler` drives a [`DailyGate`],
//! which fires once per local calendar day as soon as the wall clock has
//! reached the configured time. A missed or delayed tick therefore only
//! postpones the run until the next tick instead of skipping the day.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Days, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use tokio_cron_scheduler::{Job as CronJob, JobScheduler};

use cadence_core::config::report::ReportCronConfig;
use cadence_core::types::TenantId;
use cadence_entity::job::{Job, SyncWindow, WindowError};
use cadence_entity::report::ReportKind;

use crate::error::SchedulerError;
use crate::pool::WorkerPool;
use crate::provider::TenantDirectory;

/// Six-field cron expression firing at second 0 of every minute.
const TICK_SCHEDULE: &str = "0 * * * * *";

/// Once-per-day gate at a fixed local `hour:minute`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyGate {
    at: NaiveTime,
    last_run_date: Option<NaiveDate>,
}

impl DailyGate {
    /// Gate for `hour:minute`. Out-of-range values fall back to midnight.
    pub fn new(hour: u32, minute: u32) -> Self {
        Self {
            at: NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN),
            last_run_date: None,
        }
    }

    /// Skip today's run when starting after the scheduled time.
    ///
    /// A process started at 10:00 with a 02:30 schedule first fires
    /// tomorrow; a tick delayed past HH:MM while running still catches up.
    pub fn arm(&mut self, now: NaiveDateTime) {
        if now.time() >= self.at {
            self.last_run_date = Some(now.date());
        }
    }

    /// Fire if today's run is due and has not happened; records the run.
    pub fn should_fire(&mut self, now: NaiveDateTime) -> bool {
        let today = now.date();
        if self.pending_date(today) != today || now.time() < self.at {
            return false;
        }
        self.last_run_date = Some(today);
        true
    }

    /// Next run [`Self::should_fire`] will accept at or after `now`.
    ///
    /// An overdue run reports today's time; it fires on the next tick.
    pub fn next_run(&self, now: NaiveDateTime) -> NaiveDateTime {
        self.pending_date(now.date()).and_time(self.at)
    }

    /// Date of the next run: today unless it already ran today.
    fn pending_date(&self, today: NaiveDate) -> NaiveDate {
        if self.last_run_date == Some(today) {
            today.checked_add_days(Days::new(1)).unwrap_or(today)
        } else {
            today
        }
    }

    /// Local date of the most recent gated run.
    pub fn last_run_date(&self) -> Option<NaiveDate> {
        self.last_run_date
    }
}

/// Snapshot returned by [`ReportCronTrigger::status`].
#[derive(Debug, Clone, Serialize)]
pub struct CronStatus {
    /// Whether the trigger is enabled in configuration
    pub enabled: bool,
    /// Whether the tick source is running
    pub running: bool,
    /// Configured local hour
    pub hour: u32,
    /// Configured local minute
    pub minute: u32,
    /// When the action last ran, scheduled or manual
    pub last_run_at: Option<DateTime<Utc>>,
    /// Next scheduled run, while running
    pub next_run_at: Option<DateTime<Utc>>,
    /// Report kinds submitted per tenant
    pub report_kinds: Vec<ReportKind>,
}

#[derive(Debug)]
struct DailyState {
    running: bool,
    gate: DailyGate,
    last_run_at: Option<DateTime<Utc>>,
}

struct DailyInner {
    enabled: bool,
    hour: u32,
    minute: u32,
    pool: Arc<WorkerPool>,
    tenants: Arc<dyn TenantDirectory>,
    state: Mutex<DailyState>,
}

/// Daily trigger submitting one aggregation job per tenant and report kind.
///
/// The trigger only produces jobs; the pool's lifecycle belongs to the
/// caller.
pub struct ReportCronTrigger {
    inner: Arc<DailyInner>,
    scheduler: tokio::sync::Mutex<Option<JobScheduler>>,
}

impl std::fmt::Debug for ReportCronTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportCronTrigger")
            .field("hour", &self.inner.hour)
            .field("minute", &self.inner.minute)
            .finish()
    }
}

impl ReportCronTrigger {
    /// Build a stopped trigger. Fails on an out-of-range schedule.
    pub fn new(
        config: &ReportCronConfig,
        pool: Arc<WorkerPool>,
        tenants: Arc<dyn TenantDirectory>,
    ) -> Result<Self, SchedulerError> {
        let (hour, minute) = config.hour_minute()?;
        Ok(Self {
            inner: Arc::new(DailyInner {
                enabled: config.enabled,
                hour,
                minute,
                pool,
                tenants,
                state: Mutex::new(DailyState {
                    running: false,
                    gate: DailyGate::new(hour, minute),
                    last_run_at: None,
                }),
            }),
            scheduler: tokio::sync::Mutex::new(None),
        })
    }

    /// Start the minute tick. A disabled trigger stays stopped.
    pub async fn start(&self) -> Result<(), SchedulerError> {
        if !self.inner.enabled {
            tracing::info!("Report cron trigger disabled; not starting");
            return Ok(());
        }

        let mut slot = self.scheduler.lock().await;
        if slot.is_some() {
            return Ok(());
        }

        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| SchedulerError::Cron(format!("Failed to create scheduler: {}", e)))?;

        let inner = Arc::clone(&self.inner);
        let tick = CronJob::new_async(TICK_SCHEDULE, move |_uuid, _lock| {
            let inner = Arc::clone(&inner);
            Box::pin(async move {
                inner.run_tick(Local::now()).await;
            })
        })
        .map_err(|e| SchedulerError::Cron(format!("Failed to create report tick: {}", e)))?;

        scheduler
            .add(tick)
            .await
            .map_err(|e| SchedulerError::Cron(format!("Failed to add report tick: {}", e)))?;
        scheduler
            .start()
            .await
            .map_err(|e| SchedulerError::Cron(format!("Failed to start scheduler: {}", e)))?;

        {
            let mut state = self.inner.lock_state();
            state.gate.arm(Local::now().naive_local());
            state.running = true;
        }
        *slot = Some(scheduler);

        tracing::info!(
            "Report cron trigger started: daily at {:02}:{:02}, next run {:?}",
            self.inner.hour,
            self.inner.minute,
            self.next_run_at()
        );
        Ok(())
    }

    /// Stop the minute tick. Idempotent.
    pub async fn stop(&self) -> Result<(), SchedulerError> {
        let Some(mut scheduler) = self.scheduler.lock().await.take() else {
            return Ok(());
        };
        self.inner.lock_state().running = false;

        scheduler
            .shutdown()
            .await
            .map_err(|e| SchedulerError::Cron(format!("Failed to shutdown scheduler: {}", e)))?;

        tracing::info!("Report cron trigger stopped");
        Ok(())
    }

    /// Whether the tick source is running.
    pub fn is_running(&self) -> bool {
        self.inner.lock_state().running
    }

    /// Evaluate one tick at `now`. Returns whether the action fired.
    pub async fn run_tick(&self, now: DateTime<Local>) -> bool {
        self.inner.run_tick(now).await
    }

    /// Run the daily action now in the background, bypassing the gate.
    pub fn trigger_manual_run(&self) -> Result<(), SchedulerError> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }
        tracing::info!("Manual report aggregation run requested");

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            inner.run_action(Local::now()).await;
        });
        Ok(())
    }

    /// Submit one job per report kind for a single tenant and window.
    ///
    /// Stops at the first submission error.
    pub async fn trigger_tenant_aggregation(
        &self,
        tenant: TenantId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Job>, SchedulerError> {
        if start >= end {
            return Err(WindowError::Inverted { start, end }.into());
        }

        let window = SyncWindow::new(start, end);
        let mut jobs = Vec::with_capacity(ReportKind::ALL.len());
        for kind in ReportKind::ALL {
            let job = Job::report(tenant, kind, window, self.inner.pool.retry_attempts());
            self.inner.pool.submit_job(job.clone()).await?;
            jobs.push(job);
        }

        tracing::info!(
            tenant_id = %tenant,
            "Submitted {} report jobs for window {} .. {}",
            jobs.len(),
            start,
            end
        );
        Ok(jobs)
    }

    /// Status snapshot.
    pub fn status(&self) -> CronStatus {
        let (running, last_run_at) = {
            let state = self.inner.lock_state();
            (state.running, state.last_run_at)
        };
        CronStatus {
            enabled: self.inner.enabled,
            running,
            hour: self.inner.hour,
            minute: self.inner.minute,
            last_run_at,
            next_run_at: self.next_run_at(),
            report_kinds: ReportKind::ALL.to_vec(),
        }
    }

    /// Next scheduled run, or `None` while stopped.
    pub fn next_run_at(&self) -> Option<DateTime<Utc>> {
        let state = self.inner.lock_state();
        if !state.running {
            return None;
        }
        let next = state.gate.next_run(Local::now().naive_local());
        Some(local_to_utc(next))
    }

    /// When the action last ran.
    pub fn last_run_at(&self) -> Option<DateTime<Utc>> {
        self.inner.lock_state().last_run_at
    }
}

impl DailyInner {
    fn lock_state(&self) -> std::sync::MutexGuard<'_, DailyState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn run_tick(&self, now: DateTime<Local>) -> bool {
        let fire = self.lock_state().gate.should_fire(now.naive_local());
        if fire {
            tracing::info!("Daily report run due at {}", now);
            self.run_action(now).await;
        }
        fire
    }

    /// Submit jobs for every active tenant over yesterday's local day.
    #[tracing::instrument(name = "daily_report_run", skip_all, fields(now = %now))]
    async fn run_action(&self, now: DateTime<Local>) -> usize {
        self.lock_state().last_run_at = Some(now.with_timezone(&Utc));

        let tenants = match self.tenants.active_tenants().await {
            Ok(tenants) => tenants,
            Err(e) => {
                tracing::error!("Failed to list active tenants: {}", e);
                return 0;
            }
        };

        let today = now.date_naive();
        let yesterday = today.checked_sub_days(Days::new(1)).unwrap_or(today);
        let window = SyncWindow::new(
            local_to_utc(yesterday.and_time(NaiveTime::MIN)),
            local_to_utc(today.and_time(NaiveTime::MIN)),
        );

        let mut submitted = 0;
        for tenant in &tenants {
            for kind in ReportKind::ALL {
                let job = Job::report(*tenant, kind, window, self.pool.retry_attempts());
                match self.pool.submit_job(job).await {
                    Ok(()) => submitted += 1,
                    Err(e) => tracing::error!(
                        tenant_id = %tenant,
                        "Failed to submit {} aggregation: {}",
                        kind,
                        e
                    ),
                }
            }
        }

        tracing::info!(
            "Daily report run submitted {} jobs for {} tenants",
            submitted,
            tenants.len()
        );
        submitted
    }
}

/// Resolve a local wall-clock time, taking the earlier instant across a
/// DST overlap and treating a DST gap as UTC.
fn local_to_utc(naive: NaiveDateTime) -> DateTime<Utc> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}
