//! Application configuration
//!
//! Read from the environment once at startup; settle pauses and wait
//! bounds live here so tests can shrink them.

use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_APP_BASE: &str = "http://localhost:5000";
const DEFAULT_EMAIL_ROUTE: &str = "/admin/emails";
const DEFAULT_LOGIN_URL: &str = "https://accountsdev.actingoffice.com/login";

/// Top-level application configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the web application (no trailing slash)
    pub base_url: String,

    /// Route of the email module, appended to `base_url`
    pub email_route: String,

    /// Login entry point used as the navigation fallback
    pub login_url: String,

    /// Run the browser without a visible window
    pub headless: bool,

    /// Optional upstream proxy server address
    pub proxy: Option<String>,

    /// Wait bounds and settle pauses
    #[serde(default)]
    pub timeouts: Timeouts,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_APP_BASE.to_string(),
            email_route: DEFAULT_EMAIL_ROUTE.to_string(),
            login_url: DEFAULT_LOGIN_URL.to_string(),
            headless: true,
            proxy: None,
            timeouts: Timeouts::default(),
        }
    }
}

impl AppConfig {
    /// Build configuration from the process environment.
    ///
    /// `APP_BASE`, `EMAIL_ROUTE`, `LOGIN_URL`, `HEADLESS` and
    /// `PROXY_SERVER` are honored; everything else takes defaults.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(base) = std::env::var("APP_BASE") {
            cfg.base_url = base;
        }
        if let Ok(route) = std::env::var("EMAIL_ROUTE") {
            cfg.email_route = route;
        }
        if let Ok(login) = std::env::var("LOGIN_URL") {
            cfg.login_url = login;
        }
        if let Ok(headless) = std::env::var("HEADLESS") {
            cfg.headless = headless != "false";
        }
        if let Ok(proxy) = std::env::var("PROXY_SERVER") {
            if !proxy.trim().is_empty() {
                cfg.proxy = Some(proxy);
            }
        }
        cfg.base_url = cfg.base_url.trim_end_matches('/').to_string();
        cfg
    }

    /// Canonical post-login target: the email module URL.
    pub fn target_after_login(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.email_route)
    }
}

/// Wait bounds and settle pauses.
///
/// Settle pauses absorb asynchronous rendering after a UI mutation;
/// they are latency buffers, not correctness-critical sleeps.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Timeouts {
    /// Per-attempt navigation bound
    pub navigation: Duration,
    /// Pause between navigation retries
    pub navigation_retry_pause: Duration,
    /// Default bound for waiting on the post-login URL
    pub login_url_wait: Duration,
    /// Bound for the compose scope's To/Send controls to become visible
    pub compose_open: Duration,
    /// Probe window for a structural suggestion container
    pub suggestion_container: Duration,
    /// Polling window for the geometric suggestion fallback
    pub suggestion_poll: Duration,
    /// Bound for inbox row markers to appear
    pub inbox_load: Duration,
    /// Bound for detail-view action buttons to appear
    pub detail_open: Duration,
    /// Bound for the file chooser to open after clicking Attach
    pub file_chooser: Duration,

    /// Settle after opening Compose
    pub settle_compose: Duration,
    /// Settle after a generic click
    pub settle_click: Duration,
    /// Settle after typing the suggestion filter prefix
    pub settle_filter: Duration,
    /// Settle after committing a recipient chip
    pub settle_chip: Duration,
    /// Settle after clicking an inbox row
    pub settle_row: Duration,
    /// Settle after the inbox list renders
    pub settle_inbox: Duration,
    /// Settle after clicking Send
    pub settle_send: Duration,
    /// Settle after supplying attachment files
    pub settle_attach: Duration,
    /// Interval between visibility polls
    pub poll_interval: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            navigation: Duration::from_secs(60),
            navigation_retry_pause: Duration::from_secs(1),
            login_url_wait: Duration::from_secs(180),
            compose_open: Duration::from_secs(15),
            suggestion_container: Duration::from_millis(1200),
            suggestion_poll: Duration::from_secs(12),
            inbox_load: Duration::from_secs(20),
            detail_open: Duration::from_secs(15),
            file_chooser: Duration::from_secs(8),

            settle_compose: Duration::from_millis(900),
            settle_click: Duration::from_millis(200),
            settle_filter: Duration::from_millis(250),
            settle_chip: Duration::from_millis(150),
            settle_row: Duration::from_millis(700),
            settle_inbox: Duration::from_millis(800),
            settle_send: Duration::from_millis(1200),
            settle_attach: Duration::from_millis(1500),
            poll_interval: Duration::from_millis(150),
        }
    }
}

impl Timeouts {
    /// A configuration with every bound and pause cut down, for tests.
    pub fn shrunk() -> Self {
        Self {
            navigation: Duration::from_millis(50),
            navigation_retry_pause: Duration::from_millis(1),
            login_url_wait: Duration::from_millis(50),
            compose_open: Duration::from_millis(50),
            suggestion_container: Duration::from_millis(10),
            suggestion_poll: Duration::from_millis(50),
            inbox_load: Duration::from_millis(50),
            detail_open: Duration::from_millis(50),
            file_chooser: Duration::from_millis(50),
            settle_compose: Duration::from_millis(1),
            settle_click: Duration::from_millis(1),
            settle_filter: Duration::from_millis(1),
            settle_chip: Duration::from_millis(1),
            settle_row: Duration::from_millis(1),
            settle_inbox: Duration::from_millis(1),
            settle_send: Duration::from_millis(1),
            settle_attach: Duration::from_millis(1),
            poll_interval: Duration::from_millis(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_after_login_joins_base_and_route() {
        let cfg = AppConfig {
            base_url: "http://localhost:5000".into(),
            email_route: "/admin/emails".into(),
            ..AppConfig::default()
        };
        assert_eq!(cfg.target_after_login(), "http://localhost:5000/admin/emails");
    }

    #[test]
    fn target_after_login_trims_trailing_slash() {
        let cfg = AppConfig {
            base_url: "http://localhost:5000/".into(),
            ..AppConfig::default()
        };
        assert_eq!(cfg.target_after_login(), "http://localhost:5000/admin/emails");
    }

    #[test]
    fn shrunk_timeouts_are_small() {
        let t = Timeouts::shrunk();
        assert!(t.navigation < Duration::from_secs(1));
        assert!(t.suggestion_poll < Duration::from_secs(1));
        assert!(t.settle_send <= Duration::from_millis(5));
    }

    #[test]
    fn defaults_are_headless_without_proxy() {
        let cfg = AppConfig::default();
        assert!(cfg.headless);
        assert!(cfg.proxy.is_none());
        assert_eq!(cfg.timeouts.navigation, Duration::from_secs(60));
    }
}
