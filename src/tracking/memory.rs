use crate::tracking::request::TrackingRequest;
use crate::tracking::sink::{SendFailure, TrackingSink};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Sink that keeps every request in memory instead of sending it.
///
/// Clones share the same buffer. Hits for line numbers registered with
/// [`MemorySink::fail_line`] are recorded and then reported as failed.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    sent: Arc<Mutex<Vec<TrackingRequest>>>,
    failing_lines: Arc<Mutex<HashSet<u64>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_line(&self, line_number: u64) {
        if let Ok(mut guard) = self.failing_lines.lock() {
            guard.insert(line_number);
        }
    }

    pub fn requests(&self) -> Vec<TrackingRequest> {
        self.sent.lock().map(|guard| guard.clone()).unwrap_or_default()
    }

    pub fn line_numbers(&self) -> Vec<u64> {
        self.requests().iter().map(|r| r.line_number).collect()
    }
}

#[async_trait]
impl TrackingSink for MemorySink {
    async fn send(&self, request: &TrackingRequest) -> Result<(), SendFailure> {
        if let Ok(mut guard) = self.sent.lock() {
            guard.push(request.clone());
        }

        let fails = self
            .failing_lines
            .lock()
            .map(|guard| guard.contains(&request.line_number))
            .unwrap_or(false);
        if fails {
            return Err(SendFailure::Status { status: 503 });
        }

        Ok(())
    }
}
