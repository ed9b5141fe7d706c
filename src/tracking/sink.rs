use crate::tracking::request::TrackingRequest;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Why a single tracker hit was not delivered
#[derive(Debug, Error)]
pub enum SendFailure {
    #[error("tracker request timed out")]
    Timeout,

    #[error("tracker returned error status {status}")]
    Status { status: u16 },

    #[error("HTTP request failed: {0}")]
    Transport(#[source] reqwest::Error),
}

impl From<reqwest::Error> for SendFailure {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SendFailure::Timeout
        } else {
            SendFailure::Transport(e)
        }
    }
}

/// Destination for replayed visits
#[async_trait]
pub trait TrackingSink: Send + Sync {
    async fn send(&self, request: &TrackingRequest) -> Result<(), SendFailure>;
}

/// Matomo tracker over HTTP
#[derive(Debug)]
pub struct HttpSink {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpSink {
    pub fn new(tracker_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            endpoint: tracker_endpoint(tracker_url),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl TrackingSink for HttpSink {
    async fn send(&self, request: &TrackingRequest) -> Result<(), SendFailure> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(request.params())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SendFailure::Status {
                status: response.status().as_u16(),
            });
        }

        Ok(())
    }
}

/// Sink used by `--dry-run`: logs each hit and reports success
#[derive(Debug, Default)]
pub struct DryRunSink;

#[async_trait]
impl TrackingSink for DryRunSink {
    async fn send(&self, request: &TrackingRequest) -> Result<(), SendFailure> {
        info!(
            line = request.line_number,
            url = request.param("url").unwrap_or("-"),
            action = request.param("action_name").unwrap_or("-"),
            "Would track visit"
        );
        Ok(())
    }
}

/// Tracker script URL under a Matomo base URL
pub fn tracker_endpoint(tracker_url: &str) -> String {
    format!("{}/matomo.php", tracker_url.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_appends_tracker_script() {
        assert_eq!(
            tracker_endpoint("https://analytics.example"),
            "https://analytics.example/matomo.php"
        );
        assert_eq!(
            tracker_endpoint("https://analytics.example/matomo/"),
            "https://analytics.example/matomo/matomo.php"
        );
    }

    #[test]
    fn test_sink_constructs_with_timeout() {
        let sink = HttpSink::new("http://localhost:8080", Duration::from_secs(10)).unwrap();
        assert_eq!(sink.endpoint(), "http://localhost:8080/matomo.php");
    }

    #[tokio::test]
    async fn test_unreachable_tracker_is_send_failure() {
        // Port 9 (discard) on localhost is closed in test environments
        let sink = HttpSink::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        let visit = crate::source::AccessLogParser::new()
            .parse(
                r#"192.0.2.1 - - [04/Dec/2025:10:00:00 +0000] "GET / HTTP/1.1" 200 1"#,
                1,
            )
            .unwrap();
        let target = crate::tracking::TrackingTarget {
            site_id: 1,
            site_url: "http://site.example".to_string(),
            token_auth: None,
        };
        let request = TrackingRequest::from_visit(&visit, &target);

        let result = sink.send(&request).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_dry_run_sink_always_succeeds() {
        let visit = crate::source::AccessLogParser::new()
            .parse(
                r#"192.0.2.1 - - [04/Dec/2025:10:00:00 +0000] "GET /about HTTP/1.1" 200 1"#,
                7,
            )
            .unwrap();
        let target = crate::tracking::TrackingTarget {
            site_id: 1,
            site_url: "http://site.example".to_string(),
            token_auth: None,
        };

        assert!(DryRunSink
            .send(&TrackingRequest::from_visit(&visit, &target))
            .await
            .is_ok());
    }
}
