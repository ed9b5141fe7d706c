pub mod memory;
pub mod request;
pub mod sink;

pub use memory::MemorySink;
pub use request::{TrackingRequest, TrackingTarget};
pub use sink::{DryRunSink, HttpSink, SendFailure, TrackingSink};
