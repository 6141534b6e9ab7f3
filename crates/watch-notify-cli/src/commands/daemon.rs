use super::AppContext;
use crate::output::Output;
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};
use watch_notify_config::{default_scheduler_config, SchedulerConfig};
use watch_notify_core::{Orchestrator, StateStore};

/// Cron-driven checks. A tick that fires while the previous check is still
/// running is skipped, never queued.
pub struct Scheduler {
    scheduler: JobScheduler,
    orchestrator: Arc<Orchestrator>,
    in_flight: Arc<AtomicBool>,
    config: SchedulerConfig,
}

impl Scheduler {
    pub async fn new(orchestrator: Orchestrator, config: SchedulerConfig) -> Result<Self> {
        let scheduler = JobScheduler::new().await.wrap_err("Failed to create scheduler")?;

        Ok(Self {
            scheduler,
            orchestrator: Arc::new(orchestrator),
            in_flight: Arc::new(AtomicBool::new(false)),
            config,
        })
    }

    /// Runs until Ctrl-C
    pub async fn start(&mut self) -> Result<()> {
        if self.config.run_on_startup {
            info!(operation = "scheduler_startup", "Running initial check on startup");
            run_tick(&self.orchestrator, &self.in_flight).await;
        }

        let orchestrator = Arc::clone(&self.orchestrator);
        let in_flight = Arc::clone(&self.in_flight);
        let job = Job::new_async(self.config.schedule.as_str(), move |_uuid, _l| {
            let orchestrator = Arc::clone(&orchestrator);
            let in_flight = Arc::clone(&in_flight);
            Box::pin(async move {
                run_tick(&orchestrator, &in_flight).await;
            })
        })
        .wrap_err_with(|| format!("Invalid cron schedule '{}'", self.config.schedule))?;

        self.scheduler.add(job).await.wrap_err("Failed to add scheduled job")?;
        self.scheduler.start().await.wrap_err("Failed to start scheduler")?;

        info!(
            operation = "scheduler_started",
            schedule = %self.config.schedule,
            "Scheduler started"
        );

        tokio::signal::ctrl_c().await.wrap_err("Failed to listen for Ctrl-C")?;

        info!(operation = "scheduler_shutdown", "Shutting down scheduler");
        self.scheduler.shutdown().await.wrap_err("Failed to shut down scheduler")?;
        Ok(())
    }
}

async fn run_tick(orchestrator: &Orchestrator, in_flight: &AtomicBool) {
    if in_flight.swap(true, Ordering::SeqCst) {
        warn!(
            operation = "scheduled_check_skipped",
            "Previous check still running, skipping this tick"
        );
        return;
    }

    info!(operation = "scheduled_check_start", "Starting scheduled check");
    match orchestrator.run().await {
        Ok(report) => {
            info!(
                operation = "scheduled_check_complete",
                notified = report.notified,
                failed = report.failures.len(),
                duration_ms = report.duration.as_millis() as u64,
                "Scheduled check completed"
            );
        }
        Err(e) => {
            // The next tick retries
            error!(
                operation = "scheduled_check_error",
                error = %e,
                "Scheduled check failed"
            );
        }
    }

    in_flight.store(false, Ordering::SeqCst);
}

pub async fn run_daemon(
    config_path: Option<PathBuf>,
    schedule_override: Option<String>,
    no_startup_run: bool,
    output: &Output,
) -> Result<()> {
    let context = AppContext::load(config_path)?;
    context
        .paths
        .ensure_directories()
        .map_err(|e| eyre!("Failed to create data directories: {}", e))?;

    let file_config = context.config.scheduler.clone().unwrap_or_else(default_scheduler_config);
    let scheduler_config = SchedulerConfig {
        schedule: schedule_override.unwrap_or(file_config.schedule),
        run_on_startup: file_config.run_on_startup && !no_startup_run,
    };

    let store: Arc<dyn StateStore> = context.file_store();
    let orchestrator = context
        .orchestrator(store)
        .with_run_lock(context.lock_file(), context.lock_stale_after());

    output.info(format!(
        "Checking on schedule '{}' (Ctrl-C to stop)",
        scheduler_config.schedule
    ));

    let mut scheduler = Scheduler::new(orchestrator, scheduler_config).await?;
    scheduler.start().await?;

    output.success("Daemon stopped");
    Ok(())
}
