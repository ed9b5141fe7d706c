pub mod clock;
pub mod scheduler;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use scheduler::{ReplayError, ReplayScheduler, ReplayState, ReplayTotals, TickOutcome};
