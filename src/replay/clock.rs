//! Wall clock abstraction so replay pacing can be driven by tests.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Real time, measured monotonically from the moment the clock was created.
///
/// Adjustments to the system clock after creation do not affect pacing.
/// Uses tokio's clock, so a paused test runtime controls it too.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    wall_origin: DateTime<Utc>,
    instant_origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            wall_origin: Utc::now(),
            instant_origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.instant_origin.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.wall_origin + elapsed
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        if let Ok(mut guard) = self.current.lock() {
            *guard += by;
        }
    }

    pub fn advance_secs(&self, secs: i64) {
        self.advance(chrono::Duration::seconds(secs));
    }

    pub fn set(&self, to: DateTime<Utc>) {
        if let Ok(mut guard) = self.current.lock() {
            *guard = to;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        match self.current.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}
