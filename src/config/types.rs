use crate::source::window::ReplayWindow;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_TRACKER_URL: &str = "http://localhost";
pub const DEFAULT_SITE_URL: &str = "http://localhost";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// On-disk configuration. Every field is optional; CLI flags fill the gaps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub run: RunConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    pub id: Option<u32>,
    /// Base URL logged paths are resolved against when building page URLs
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WindowConfig {
    /// 0 replays every day
    pub day_of_month: Option<u32>,
    /// Seconds since UTC midnight
    pub time_of_day: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrackerConfig {
    pub url: Option<String>,
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
    pub token_auth: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    #[serde(default, with = "humantime_serde")]
    pub stop_after: Option<Duration>,
}

/// Values given on the command line; they take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub site_id: Option<u32>,
    pub site_url: Option<String>,
    pub log_file: Option<PathBuf>,
    pub day_of_month: Option<u32>,
    pub time_of_day: Option<u32>,
    pub tracker_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub token_auth: Option<String>,
    pub stop_after_secs: Option<u64>,
}

/// Fully validated settings for one replay run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayConfig {
    pub site_id: u32,
    pub site_url: String,
    pub log_file: PathBuf,
    pub window: ReplayWindow,
    pub tracker_url: String,
    pub timeout: Duration,
    pub token_auth: Option<String>,
    /// `None` runs until the log is exhausted
    pub stop_after: Option<Duration>,
}
