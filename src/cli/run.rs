use crate::config::{load_config, resolve_config, Config, ConfigOverrides, ReplayConfig};
use crate::replay::{MonotonicClock, ReplayScheduler, ReplayTotals, TickOutcome};
use crate::tracking::{DryRunSink, HttpSink, TrackingSink, TrackingTarget};
use chrono::Utc;
use clap::Args;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("log source error: {0}")]
    Source(#[from] crate::source::SourceError),

    #[error("replay error: {0}")]
    Replay(#[from] crate::replay::ReplayError),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Default, Args)]
pub struct RunArgs {
    /// Matomo site id to track into
    #[arg(long)]
    pub idsite: Option<u32>,

    /// Access log to replay; lines must be in time order
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Exit after this many seconds (0 = run until the log is exhausted)
    #[arg(long)]
    pub stop_after: Option<u64>,

    /// Day of month to replay, 0 for every day [default: today]
    #[arg(long)]
    pub day_of_month: Option<u32>,

    /// Second of the UTC day to start replaying from [default: now]
    #[arg(long)]
    pub time_of_day: Option<u32>,

    /// Matomo base URL to send hits to
    #[arg(long, alias = "custom-matomo-url")]
    pub tracker_url: Option<String>,

    /// Base URL of the tracked site, used to build page URLs
    #[arg(long)]
    pub site_url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Token used to authenticate tracking requests
    #[arg(long)]
    pub token_auth: Option<String>,

    /// Log the hits that would be sent instead of sending them
    #[arg(long)]
    pub dry_run: bool,
}

impl RunArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            site_id: self.idsite,
            site_url: self.site_url.clone(),
            log_file: self.log_file.clone(),
            day_of_month: self.day_of_month,
            time_of_day: self.time_of_day,
            tracker_url: self.tracker_url.clone(),
            timeout_secs: self.timeout,
            token_auth: self.token_auth.clone(),
            stop_after_secs: self.stop_after,
        }
    }
}

/// Why a replay run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    NoMatchingLogs,
    Exhausted,
    StopAfterReached,
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub reason: StopReason,
    pub totals: ReplayTotals,
}

/// Enforces the optional `stop_after` limit around each sleep
#[derive(Debug, Clone, Copy, Default)]
pub struct StopPolicy {
    stop_after: Option<Duration>,
}

impl StopPolicy {
    pub fn new(stop_after: Option<Duration>) -> Self {
        Self { stop_after }
    }

    /// Checked before sleeping: a single wait can overrun the remaining budget
    pub fn would_exceed(&self, elapsed: Duration, next_wait: Duration) -> bool {
        self.stop_after
            .is_some_and(|limit| elapsed.saturating_add(next_wait) > limit)
    }

    /// Checked after sleeping
    pub fn exceeded(&self, elapsed: Duration) -> bool {
        self.stop_after.is_some_and(|limit| elapsed > limit)
    }
}

pub async fn run(
    config_path: Option<PathBuf>,
    args: RunArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let shutdown = async {
        if tokio::signal::ctrl_c().await.is_err() {
            warn!("Could not listen for Ctrl+C; stop the replay with --stop-after instead");
            std::future::pending::<()>().await;
        }
    };

    run_replay(config_path, &args, shutdown)
        .await
        .map(|_| ())
        .map_err(|e| e.into())
}

async fn run_replay<F>(
    config_path: Option<PathBuf>,
    args: &RunArgs,
    shutdown: F,
) -> Result<RunSummary, RunError>
where
    F: Future<Output = ()>,
{
    let file_config = match &config_path {
        Some(path) => {
            info!(config_path = %path.display(), "Loading configuration");
            load_config(path)?
        }
        None => Config::default(),
    };

    let config = resolve_config(&file_config, &args.overrides(), Utc::now())?;
    let mut scheduler = build_scheduler(&config, args.dry_run)?;

    info!(
        log_file = %config.log_file.display(),
        site_id = config.site_id,
        day_of_month = config.window.day_of_month,
        time_of_day = config.window.second_of_day,
        window_secs = config.window.duration_secs,
        "Generating visits from log"
    );

    let summary = drive(&mut scheduler, StopPolicy::new(config.stop_after), shutdown).await?;

    info!(
        reason = ?summary.reason,
        ticks = summary.totals.ticks,
        sent = summary.totals.sent,
        failed = summary.totals.failed,
        "Replay finished"
    );

    Ok(summary)
}

/// Opens the log and wires the configured sink into a scheduler
pub fn build_scheduler(config: &ReplayConfig, dry_run: bool) -> Result<ReplayScheduler, RunError> {
    let sink: Box<dyn TrackingSink> = if dry_run {
        info!("Dry run: hits will be logged, not sent");
        Box::new(DryRunSink)
    } else {
        let sink = HttpSink::new(&config.tracker_url, config.timeout)?;
        info!(endpoint = sink.endpoint(), timeout = ?config.timeout, "Tracking to Matomo");
        Box::new(sink)
    };

    if config.token_auth.is_none() && !dry_run {
        warn!("No token_auth configured; the tracker will ignore visitor IP overrides");
    }

    let target = TrackingTarget {
        site_id: config.site_id,
        site_url: config.site_url.clone(),
        token_auth: config.token_auth.clone(),
    };

    let scheduler = ReplayScheduler::open(
        &config.log_file,
        config.window,
        target,
        sink,
        Box::new(MonotonicClock::new()),
    )?;

    Ok(scheduler)
}

/// Tick the scheduler and sleep between ticks until the replay ends, the
/// `stop_after` budget runs out, or `shutdown` resolves.
pub async fn drive<F>(
    scheduler: &mut ReplayScheduler,
    policy: StopPolicy,
    shutdown: F,
) -> Result<RunSummary, RunError>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let started = Instant::now();

    let reason = loop {
        let (sent, failed, next_wait) = match scheduler.tick().await? {
            TickOutcome::NoMatchingLogs => {
                info!("Found no logs to track for day of month / time of day, exiting");
                break StopReason::NoMatchingLogs;
            }
            TickOutcome::Exhausted { sent, failed } => {
                info!(sent, failed, "Tracked actions");
                info!("Out of logs, exiting");
                break StopReason::Exhausted;
            }
            TickOutcome::Continue {
                sent,
                failed,
                next_wait,
            } => (sent, failed, next_wait),
        };

        info!(sent, failed, "Tracked actions");

        if policy.would_exceed(started.elapsed(), next_wait) {
            info!("Stop-after limit reached, exiting");
            break StopReason::StopAfterReached;
        }

        info!(seconds = next_wait.as_secs_f64(), "Sleeping");
        tokio::select! {
            _ = tokio::time::sleep(next_wait) => {}
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break StopReason::Shutdown;
            }
        }

        if policy.exceeded(started.elapsed()) {
            info!("Stop-after limit reached, exiting");
            break StopReason::StopAfterReached;
        }
    };

    Ok(RunSummary {
        reason,
        totals: scheduler.totals(),
    })
}
