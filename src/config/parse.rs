use super::types::*;
use crate::config::{expand_env_vars, expand_tilde};
use crate::source::window::{ReplayWindow, SECONDS_IN_DAY};
use chrono::{DateTime, Datelike, Timelike, Utc};
use regex::Regex;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation failed:\n{}", .0.join("\n"))]
    ValidationList(Vec<String>),

    #[error("validation failed: {0}")]
    Validation(String),
}

/// Read a YAML config file, expanding `$env{VAR}` references and `~` paths
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let yaml_string = std::fs::read_to_string(path).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read config file '{}': {}", path.display(), e),
        ))
    })?;

    parse_config(&yaml_string)
}

/// Parse config from a YAML string
pub fn parse_config(yaml: &str) -> Result<Config, ConfigError> {
    let yaml = expand_env_vars(yaml);
    check_unexpanded_vars(&yaml)?;

    let mut config: Config = serde_yaml::from_str(&yaml)?;

    if let Some(log_file) = config.source.log_file.take() {
        config.source.log_file = Some(expand_tilde(&log_file));
    }

    Ok(config)
}

fn check_unexpanded_vars(yaml: &str) -> Result<(), ConfigError> {
    let re = Regex::new(r"\$env\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("env var pattern is valid");
    // Commented-out references are never deserialized
    let mut missing: Vec<&str> = yaml
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .flat_map(|line| re.captures_iter(line))
        .filter_map(|cap| cap.get(1).map(|m| m.as_str()))
        .collect();

    if missing.is_empty() {
        return Ok(());
    }

    missing.sort_unstable();
    missing.dedup();

    Err(ConfigError::Validation(format!(
        "environment variable(s) not set: {}",
        missing.join(", ")
    )))
}

/// Merge file config with CLI overrides and validate the result.
///
/// `now` supplies the defaults for day of month and time of day. Every problem
/// found is reported together.
pub fn resolve_config(
    file: &Config,
    overrides: &ConfigOverrides,
    now: DateTime<Utc>,
) -> Result<ReplayConfig, ConfigError> {
    let mut errors = Vec::new();

    let site_id = overrides.site_id.or(file.site.id);
    match site_id {
        None => errors.push("the site id is required (--idsite or site.id)".to_string()),
        Some(0) => errors.push("site id must be a positive integer".to_string()),
        Some(_) => {}
    }

    let log_file = overrides
        .log_file
        .clone()
        .or_else(|| file.source.log_file.clone());
    if log_file.is_none() {
        errors.push("the log file is required (--log-file or source.log_file)".to_string());
    }

    let day_of_month = overrides
        .day_of_month
        .or(file.window.day_of_month)
        .unwrap_or_else(|| now.day());
    if day_of_month > 31 {
        errors.push(format!(
            "day of month must be between 0 and 31, got {day_of_month}"
        ));
    }

    let time_of_day = overrides
        .time_of_day
        .or(file.window.time_of_day)
        .unwrap_or_else(|| now.num_seconds_from_midnight());
    if time_of_day >= SECONDS_IN_DAY {
        errors.push(format!(
            "time of day must be below {SECONDS_IN_DAY} seconds, got {time_of_day}"
        ));
    }

    let timeout = overrides
        .timeout_secs
        .map(Duration::from_secs)
        .or(file.tracker.timeout)
        .unwrap_or(DEFAULT_TIMEOUT);
    if timeout.is_zero() {
        errors.push("timeout must be a positive number of seconds".to_string());
    }

    // 0 means "no limit"
    let stop_after = overrides
        .stop_after_secs
        .map(Duration::from_secs)
        .or(file.run.stop_after)
        .filter(|d| !d.is_zero());

    let tracker_url = overrides
        .tracker_url
        .clone()
        .or_else(|| file.tracker.url.clone())
        .unwrap_or_else(|| DEFAULT_TRACKER_URL.to_string());
    validate_http_url("tracker url", &tracker_url, &mut errors);

    let site_url = overrides
        .site_url
        .clone()
        .or_else(|| file.site.url.clone())
        .unwrap_or_else(|| DEFAULT_SITE_URL.to_string());
    validate_http_url("site url", &site_url, &mut errors);

    let token_auth = overrides
        .token_auth
        .clone()
        .or_else(|| file.tracker.token_auth.clone())
        .filter(|t| !t.trim().is_empty());

    if !errors.is_empty() {
        return Err(ConfigError::ValidationList(errors));
    }

    // A stop-after limit also bounds how far into the log the window reaches.
    // Partial seconds round up so a sub-second limit still matches something.
    let duration_secs = stop_after
        .map(|d| {
            let secs = d.as_secs() + u64::from(d.subsec_nanos() > 0);
            secs.min(SECONDS_IN_DAY as u64) as u32
        })
        .unwrap_or(SECONDS_IN_DAY);

    let (Some(site_id), Some(log_file)) = (site_id, log_file) else {
        return Err(ConfigError::Validation(
            "site id and log file are required".to_string(),
        ));
    };

    Ok(ReplayConfig {
        site_id,
        site_url,
        log_file,
        window: ReplayWindow::new(day_of_month, time_of_day, duration_secs),
        tracker_url,
        timeout,
        token_auth,
        stop_after,
    })
}

fn validate_http_url(label: &str, value: &str, errors: &mut Vec<String>) {
    match reqwest::Url::parse(value) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(format!(
            "{label} must use http or https, got scheme '{}'",
            url.scheme()
        )),
        Err(e) => errors.push(format!("{label} '{value}' is invalid: {e}")),
    }
}
