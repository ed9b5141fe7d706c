use chrono::{DateTime, Datelike, Timelike, Utc};
use regex::Regex;
use thiserror::Error;

/// strftime layout of the bracketed timestamp in common/combined logs
const CLF_TIMESTAMP_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";

const ACCESS_LOG_PATTERN: &str = r#"^(?P<ip>\S+) \S+ \S+ \[(?P<ts>[^\]]+)\] "(?P<method>[A-Z]+) (?P<target>\S+)(?: [^"]*)?" (?P<status>\d{3}) (?P<size>\d+|-)(?: "(?P<referrer>[^"]*)" "(?P<ua>[^"]*)")?"#;

#[derive(Debug, Error)]
pub enum LineError {
    #[error("line does not look like an access log entry")]
    NoMatch,

    #[error("failed to parse timestamp '{value}': {source}")]
    Timestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// One replayable hit from the access log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitRecord {
    pub recorded_at: DateTime<Utc>,
    pub line_number: u64,
    pub client_ip: String,
    pub method: String,
    /// Request target as logged: path plus optional query string
    pub target: String,
    pub status: u16,
    pub response_size: Option<u64>,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
}

impl VisitRecord {
    /// Seconds since UTC midnight of `recorded_at`
    pub fn second_of_day(&self) -> u32 {
        self.recorded_at.num_seconds_from_midnight()
    }

    /// UTC calendar day (1-31) of `recorded_at`
    pub fn day_of_month(&self) -> u32 {
        self.recorded_at.day()
    }
}

/// Parses Apache/nginx "common" and "combined" access log lines.
#[derive(Debug)]
pub struct AccessLogParser {
    pattern: Regex,
}

impl AccessLogParser {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(ACCESS_LOG_PATTERN).expect("access log pattern is valid"),
        }
    }

    pub fn parse(&self, line: &str, line_number: u64) -> Result<VisitRecord, LineError> {
        let Some(captures) = self.pattern.captures(line) else {
            return Err(LineError::NoMatch);
        };

        let ts_value = &captures["ts"];
        let recorded_at = DateTime::parse_from_str(ts_value, CLF_TIMESTAMP_FORMAT)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|source| LineError::Timestamp {
                value: ts_value.to_string(),
                source,
            })?;

        // \d{3} always fits
        let status = captures["status"].parse().unwrap_or(0);

        Ok(VisitRecord {
            recorded_at,
            line_number,
            client_ip: captures["ip"].to_string(),
            method: captures["method"].to_string(),
            target: captures["target"].to_string(),
            status,
            response_size: captures["size"].parse().ok(),
            referrer: optional_field(captures.name("referrer").map(|m| m.as_str())),
            user_agent: optional_field(captures.name("ua").map(|m| m.as_str())),
        })
    }
}

impl Default for AccessLogParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Access logs write "-" for absent values
fn optional_field(value: Option<&str>) -> Option<String> {
    match value {
        None | Some("") | Some("-") => None,
        Some(v) => Some(v.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMBINED: &str = r#"203.0.113.9 - - [04/Dec/2025:12:00:05 +0000] "GET /blog/post?id=4 HTTP/1.1" 200 5120 "https://example.org/" "Mozilla/5.0 (X11; Linux x86_64)""#;

    #[test]
    fn test_combined_line() {
        let parser = AccessLogParser::new();
        let record = parser.parse(COMBINED, 7).unwrap();

        assert_eq!(record.recorded_at.to_rfc3339(), "2025-12-04T12:00:05+00:00");
        assert_eq!(record.line_number, 7);
        assert_eq!(record.client_ip, "203.0.113.9");
        assert_eq!(record.method, "GET");
        assert_eq!(record.target, "/blog/post?id=4");
        assert_eq!(record.status, 200);
        assert_eq!(record.response_size, Some(5120));
        assert_eq!(record.referrer.as_deref(), Some("https://example.org/"));
        assert_eq!(
            record.user_agent.as_deref(),
            Some("Mozilla/5.0 (X11; Linux x86_64)")
        );
        assert_eq!(record.second_of_day(), 43_205);
        assert_eq!(record.day_of_month(), 4);
    }

    #[test]
    fn test_common_line_without_referrer_or_agent() {
        let parser = AccessLogParser::new();
        let record = parser
            .parse(
                r#"10.0.0.1 - frank [10/Oct/2025:13:55:36 +0000] "POST /login HTTP/1.0" 302 -"#,
                1,
            )
            .unwrap();

        assert_eq!(record.method, "POST");
        assert_eq!(record.status, 302);
        assert_eq!(record.response_size, None);
        assert_eq!(record.referrer, None);
        assert_eq!(record.user_agent, None);
    }

    #[test]
    fn test_offset_normalised_to_utc() {
        let parser = AccessLogParser::new();
        let record = parser
            .parse(
                r#"10.0.0.1 - - [01/Mar/2025:01:30:00 +0200] "GET / HTTP/1.1" 200 10 "-" "-""#,
                1,
            )
            .unwrap();

        // 01:30 at +02:00 is 23:30 UTC on the previous day
        assert_eq!(record.day_of_month(), 28);
        assert_eq!(record.second_of_day(), 23 * 3600 + 30 * 60);
        assert_eq!(record.referrer, None);
        assert_eq!(record.user_agent, None);
    }

    #[test]
    fn test_garbage_line_rejected() {
        let parser = AccessLogParser::new();
        assert!(matches!(
            parser.parse("not an access log line", 1),
            Err(LineError::NoMatch)
        ));
        assert!(matches!(parser.parse("", 2), Err(LineError::NoMatch)));
    }

    #[test]
    fn test_bad_timestamp_rejected() {
        let parser = AccessLogParser::new();
        let result = parser.parse(
            r#"10.0.0.1 - - [31/Foo/2025:99:00:00 +0000] "GET / HTTP/1.1" 200 10"#,
            1,
        );
        assert!(matches!(result, Err(LineError::Timestamp { .. })));
    }
}
