//! Configuration module
//!
//! Everything tunable comes from the environment with production
//! defaults; constants live in utils/constants.rs.

use std::time::Duration;

use crate::utils::constants::{
    DEFAULT_API_BASE, DEFAULT_BATCH_SIZE, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_MAX_RETRIES,
    DEFAULT_WEB_BASE,
};

/// Client configuration
#[derive(Debug, Clone)]
pub struct CorosConfig {
    /// API base URL (no trailing slash)
    pub api_base: String,

    /// Web frontend base URL, used to print activity links
    pub web_base: String,

    /// Timeout for API calls
    pub http_timeout: Duration,

    /// Page size for activity listings
    pub batch_size: u32,

    /// Maximum retry attempts for transient failures
    pub max_retries: u32,
}

impl Default for CorosConfig {
    fn default() -> Self {
        Self {
            api_base: std::env::var("COROS_API_BASE")
                .unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
            web_base: std::env::var("COROS_WEB_BASE")
                .unwrap_or_else(|_| DEFAULT_WEB_BASE.to_string()),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            batch_size: DEFAULT_BATCH_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl CorosConfig {
    /// URL of an activity in the web frontend
    pub fn activity_url(&self, label_id: &str) -> String {
        format!("{}/activity-detail?labelId={}&sportType=100", self.web_base, label_id)
    }
}

/// How to authenticate a new session.
///
/// `Token` is the single-session workaround: COROS invalidates the
/// previous session on every login, so a fresh password login would kick
/// an open browser session out. Reusing the browser's token avoids the
/// login entirely.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// Log in with username and password
    Password { username: String, password: String },
    /// Reuse an existing session token (CPL-coros-token cookie value)
    Token { access_token: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CorosConfig::default();
        assert!(config.api_base.starts_with("https://"));
        assert!(!config.api_base.ends_with('/'));
        assert_eq!(config.batch_size, 100);
        assert!(config.max_retries >= 1);
    }

    #[test]
    fn test_activity_url() {
        let config = CorosConfig {
            web_base: "https://t.coros.com".to_string(),
            ..CorosConfig::default()
        };
        assert_eq!(
            config.activity_url("42"),
            "https://t.coros.com/activity-detail?labelId=42&sportType=100"
        );
    }
}
