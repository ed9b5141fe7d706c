pub mod cursor;
pub mod record;
pub mod window;

pub use cursor::{CursorStats, LogCursor, SourceError};
pub use record::{AccessLogParser, VisitRecord};
pub use window::{ReplayWindow, SECONDS_IN_DAY};
