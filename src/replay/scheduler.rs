use crate::replay::clock::Clock;
use crate::source::cursor::{CursorStats, LogCursor, SourceError};
use crate::source::record::VisitRecord;
use crate::source::window::ReplayWindow;
use crate::tracking::request::{TrackingRequest, TrackingTarget};
use crate::tracking::sink::TrackingSink;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    #[error("replay has already finished")]
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayState {
    NotStarted,
    Running,
    Exhausted,
    NoMatchingLogs,
    /// The log could not be read further
    Failed,
}

impl ReplayState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ReplayState::Exhausted | ReplayState::NoMatchingLogs | ReplayState::Failed
        )
    }
}

/// Result of one [`ReplayScheduler::tick`].
///
/// `sent` counts every send attempted during the tick, `failed` how many of
/// those the sink rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The window matched nothing in the log; nothing was sent
    NoMatchingLogs,
    /// More records are pending; call again after `next_wait`
    Continue {
        sent: usize,
        failed: usize,
        next_wait: Duration,
    },
    /// The log ran out during this tick
    Exhausted { sent: usize, failed: usize },
}

impl TickOutcome {
    pub fn sent(&self) -> Option<usize> {
        match self {
            TickOutcome::NoMatchingLogs => None,
            TickOutcome::Continue { sent, .. } | TickOutcome::Exhausted { sent, .. } => Some(*sent),
        }
    }

    pub fn next_wait(&self) -> Option<Duration> {
        match self {
            TickOutcome::Continue { next_wait, .. } => Some(*next_wait),
            _ => None,
        }
    }
}

/// Running totals across all ticks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayTotals {
    pub ticks: u64,
    pub sent: u64,
    pub failed: u64,
}

/// Anchors log time to wall time at the first accepted record
#[derive(Debug, Clone, Copy)]
struct ReplayClock {
    origin_virtual: DateTime<Utc>,
    origin_wall: DateTime<Utc>,
    last_emitted_virtual: DateTime<Utc>,
}

impl ReplayClock {
    fn start(origin_virtual: DateTime<Utc>, origin_wall: DateTime<Utc>) -> Self {
        Self {
            origin_virtual,
            origin_wall,
            last_emitted_virtual: origin_virtual,
        }
    }

    fn virtual_at(&self, wall: DateTime<Utc>) -> DateTime<Utc> {
        self.origin_virtual + (wall - self.origin_wall)
    }

    fn record_emitted(&mut self, at: DateTime<Utc>) {
        if at > self.last_emitted_virtual {
            self.last_emitted_virtual = at;
        }
    }
}

/// Replays access log records against a tracker, paced by the log's own timing.
///
/// The scheduler never sleeps. Each [`tick`](Self::tick) sends everything that
/// is due and returns how long the caller should wait before ticking again.
pub struct ReplayScheduler {
    cursor: LogCursor,
    window: ReplayWindow,
    target: TrackingTarget,
    sink: Box<dyn TrackingSink>,
    clock: Box<dyn Clock>,

    state: ReplayState,
    replay_clock: Option<ReplayClock>,
    pending: Option<VisitRecord>,
    totals: ReplayTotals,
}

impl ReplayScheduler {
    pub fn new(
        cursor: LogCursor,
        window: ReplayWindow,
        target: TrackingTarget,
        sink: Box<dyn TrackingSink>,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            cursor,
            window,
            target,
            sink,
            clock,
            state: ReplayState::NotStarted,
            replay_clock: None,
            pending: None,
            totals: ReplayTotals::default(),
        }
    }

    /// Open the log at `path` and build a scheduler over it
    pub fn open(
        path: impl AsRef<Path>,
        window: ReplayWindow,
        target: TrackingTarget,
        sink: Box<dyn TrackingSink>,
        clock: Box<dyn Clock>,
    ) -> Result<Self, SourceError> {
        let cursor = LogCursor::open(path)?;
        Ok(Self::new(cursor, window, target, sink, clock))
    }

    /// Send every record due at the current wall time.
    ///
    /// Returns [`ReplayError::Finished`] if called again after a terminal
    /// outcome was reported.
    pub async fn tick(&mut self) -> Result<TickOutcome, ReplayError> {
        match self.state {
            ReplayState::Exhausted | ReplayState::NoMatchingLogs | ReplayState::Failed => {
                return Err(ReplayError::Finished);
            }
            ReplayState::NotStarted => {
                if !self.start()? {
                    return Ok(TickOutcome::NoMatchingLogs);
                }
            }
            ReplayState::Running => {}
        }

        let Some(replay_clock) = self.replay_clock else {
            return Err(ReplayError::Finished);
        };

        let now = self.clock.now();
        let current_virtual = replay_clock.virtual_at(now);
        self.totals.ticks += 1;

        let mut sent = 0;
        let mut failed = 0;

        while self
            .pending
            .as_ref()
            .is_some_and(|record| record.recorded_at <= current_virtual)
        {
            let Some(record) = self.pending.take() else {
                break;
            };

            sent += 1;
            self.totals.sent += 1;
            if !self.dispatch(&record).await {
                failed += 1;
                self.totals.failed += 1;
            }
            if let Some(clock) = self.replay_clock.as_mut() {
                clock.record_emitted(record.recorded_at);
            }

            self.pending = self.read_next()?;
        }

        let Some(next) = &self.pending else {
            self.state = ReplayState::Exhausted;
            let stats = self.cursor.stats();
            info!(
                total_sent = self.totals.sent,
                total_failed = self.totals.failed,
                lines_read = stats.lines_read,
                "Replay exhausted the log"
            );
            return Ok(TickOutcome::Exhausted { sent, failed });
        };

        let next_wait = (next.recorded_at - current_virtual)
            .to_std()
            .unwrap_or(Duration::ZERO);

        debug!(
            sent,
            failed,
            next_wait_ms = next_wait.as_millis() as u64,
            virtual_time = %current_virtual,
            "Tick complete"
        );

        Ok(TickOutcome::Continue {
            sent,
            failed,
            next_wait,
        })
    }

    /// Pull the first record in the window and anchor the replay clock.
    /// Returns false if the window matches nothing.
    fn start(&mut self) -> Result<bool, ReplayError> {
        match self.read_next()? {
            Some(first) => {
                let origin_wall = self.clock.now();
                info!(
                    origin = %first.recorded_at,
                    line = first.line_number,
                    "Replay anchored at first record in window"
                );
                self.replay_clock = Some(ReplayClock::start(first.recorded_at, origin_wall));
                self.pending = Some(first);
                self.state = ReplayState::Running;
                Ok(true)
            }
            None => {
                self.state = ReplayState::NoMatchingLogs;
                info!(
                    day_of_month = self.window.day_of_month,
                    second_of_day = self.window.second_of_day,
                    duration_secs = self.window.duration_secs,
                    "No log records in replay window"
                );
                Ok(false)
            }
        }
    }

    /// Next record in the window. A read error ends the replay for good.
    fn read_next(&mut self) -> Result<Option<VisitRecord>, ReplayError> {
        match self.cursor.next_matching(&self.window) {
            Ok(next) => Ok(next),
            Err(e) => {
                self.state = ReplayState::Failed;
                error!(
                    path = %self.cursor.path().display(),
                    total_sent = self.totals.sent,
                    error = %e,
                    "Replay stopped: log could not be read"
                );
                Err(ReplayError::Source(e))
            }
        }
    }

    /// Send one record; failures are logged and reported as `false`
    async fn dispatch(&self, record: &VisitRecord) -> bool {
        let request = TrackingRequest::from_visit(record, &self.target);
        match self.sink.send(&request).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    line = record.line_number,
                    recorded_at = %record.recorded_at,
                    error = %e,
                    "Failed to track visit"
                );
                false
            }
        }
    }

    pub fn state(&self) -> ReplayState {
        self.state
    }

    pub fn totals(&self) -> ReplayTotals {
        self.totals
    }

    pub fn cursor_stats(&self) -> CursorStats {
        self.cursor.stats()
    }

    pub fn window(&self) -> &ReplayWindow {
        &self.window
    }

    /// Log timestamp the replay was anchored to, once started
    pub fn origin(&self) -> Option<DateTime<Utc>> {
        self.replay_clock.map(|c| c.origin_virtual)
    }

    /// Latest log timestamp sent so far
    pub fn last_emitted(&self) -> Option<DateTime<Utc>> {
        self.replay_clock.map(|c| c.last_emitted_virtual)
    }
}
