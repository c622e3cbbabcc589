//! Runtime configuration, loaded from environment variables with defaults.

use std::env;
use std::path::PathBuf;

/// Where to reach the backend and how the process should behave.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the document backend
    pub api_url: String,
    /// Bearer token override; when set, the stored session token is ignored
    pub token: Option<String>,
    /// Session file override; defaults to the platform data directory
    pub session_path: Option<PathBuf>,
    /// Log filter (trace, debug, info, warn, error)
    pub log_filter: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let api_url =
            get("TEAMDIARY_API_URL").unwrap_or_else(|| "http://localhost:8787".to_string());
        let token = get("TEAMDIARY_TOKEN").filter(|t| !t.is_empty());
        let session_path = get("TEAMDIARY_SESSION_PATH").map(PathBuf::from);
        let log_filter = get("TEAMDIARY_LOG").unwrap_or_else(|| "warn".to_string());

        Self {
            api_url,
            token,
            session_path,
            log_filter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = Config::from_lookup(|_| None);

        assert_eq!(config.api_url, "http://localhost:8787");
        assert!(config.token.is_none());
        assert!(config.session_path.is_none());
        assert_eq!(config.log_filter, "warn");
    }

    #[test]
    fn env_values_win_over_defaults() {
        let config = Config::from_lookup(|key| match key {
            "TEAMDIARY_API_URL" => Some("https://diary.example.com/".to_string()),
            "TEAMDIARY_TOKEN" => Some("tok-123".to_string()),
            "TEAMDIARY_SESSION_PATH" => Some("/tmp/session.json".to_string()),
            "TEAMDIARY_LOG" => Some("debug".to_string()),
            _ => None,
        });

        assert_eq!(config.api_url, "https://diary.example.com/");
        assert_eq!(config.token.as_deref(), Some("tok-123"));
        assert_eq!(config.session_path, Some(PathBuf::from("/tmp/session.json")));
        assert_eq!(config.log_filter, "debug");
    }

    #[test]
    fn empty_token_counts_as_unset() {
        let config = Config::from_lookup(|key| match key {
            "TEAMDIARY_TOKEN" => Some(String::new()),
            _ => None,
        });
        assert!(config.token.is_none());
    }
}
