pub fn generate_starter_config() -> String {
    r#"# =============================================================================
# LOGREPLAY CONFIGURATION
# =============================================================================
# Replays an access log against a Matomo tracker so the site looks live.
# Every value here can be overridden on the command line.
#
# Config file locations (in order of precedence):
#   1. Path specified via --config argument
#   2. ~/.config/logreplay/config.yml
#   3. /etc/logreplay/config.yml
#
# Values may reference environment variables with the $env{...} syntax,
# wrapping the variable name in the braces.

# =============================================================================
# SITE
# =============================================================================

site:
  # Matomo site id to track into (--idsite)
  id: 1
  # Logged request paths are appended to this to build page URLs
  url: https://www.example.com

# =============================================================================
# SOURCE
# =============================================================================
# Access log in common or combined format. Lines MUST be in time order.

source:
  log_file: ~/logs/access.log

# =============================================================================
# REPLAY WINDOW
# =============================================================================
# Which slice of the log to replay. Both default to the current UTC time.

window:
  # 1-31, or 0 to replay records from any day of the month
  day_of_month: 0
  # Seconds since UTC midnight to start from (43200 = noon)
  # time_of_day: 43200

# =============================================================================
# TRACKER
# =============================================================================

tracker:
  # Matomo base URL; hits go to <url>/matomo.php
  url: http://localhost
  # Per-request timeout
  timeout: 10s
  # Needed to override visitor IPs. Prefer reading it from an environment
  # variable such as MATOMO_TOKEN_AUTH over a literal token.
  # token_auth: your-token

# =============================================================================
# RUN
# =============================================================================

run:
  # Exit after this long (e.g. 1h). Also limits how far past time_of_day the
  # window reaches. 0s runs until the log is exhausted.
  stop_after: 0s
"#
    .to_string()
}
