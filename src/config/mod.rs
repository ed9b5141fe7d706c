pub mod generate;
pub mod parse;
pub mod types;

use regex::Regex;
use std::path::{Path, PathBuf};

pub use parse::{load_config, parse_config, resolve_config, ConfigError};
pub use types::{Config, ConfigOverrides, ReplayConfig};

/// Expands `$env{VAR_NAME}` references. Unset variables are left as-is.
pub fn expand_env_vars(text: &str) -> String {
    let re = Regex::new(r"\$env\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("env var pattern is valid");

    re.replace_all(text, |caps: &regex::Captures| {
        std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
    })
    .into_owned()
}

/// Expands a leading `~` to the user's home directory
pub fn expand_tilde(path: &Path) -> PathBuf {
    let Some(home_dir) = dirs::home_dir() else {
        return path.to_path_buf();
    };

    match path.strip_prefix("~") {
        Ok(rest) => home_dir.join(rest),
        Err(_) => path.to_path_buf(),
    }
}

/// Default location written by `config init`
pub fn user_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config/logreplay/config.yml"))
}

/// Returns the first config file that exists from:
/// 1. the explicit path, if given
/// 2. ~/.config/logreplay/config.yml
/// 3. /etc/logreplay/config.yml
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(expand_tilde(path));
    }

    if let Some(user_config) = user_config_path() {
        if user_config.exists() {
            return Some(user_config);
        }
    }

    let system_config = PathBuf::from("/etc/logreplay/config.yml");
    if system_config.exists() {
        return Some(system_config);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_env_vars_replaces_set_variables() {
        std::env::set_var("LOGREPLAY_TEST_TOKEN", "s3cret");
        let expanded = expand_env_vars("token_auth: $env{LOGREPLAY_TEST_TOKEN}");
        assert_eq!(expanded, "token_auth: s3cret");
        std::env::remove_var("LOGREPLAY_TEST_TOKEN");
    }

    #[test]
    fn test_expand_env_vars_leaves_unset_variables() {
        let text = "token_auth: $env{LOGREPLAY_NEVER_SET_ANYWHERE}";
        assert_eq!(expand_env_vars(text), text);
    }

    #[test]
    fn test_expand_tilde() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        assert_eq!(
            expand_tilde(Path::new("~/logs/access.log")),
            home.join("logs/access.log")
        );
        assert_eq!(
            expand_tilde(Path::new("/var/log/access.log")),
            PathBuf::from("/var/log/access.log")
        );
    }

    #[test]
    fn test_explicit_config_path_wins() {
        assert_eq!(
            resolve_config_path(Some(Path::new("/srv/replay.yml"))),
            Some(PathBuf::from("/srv/replay.yml"))
        );
    }
}
