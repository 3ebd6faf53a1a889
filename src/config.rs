//! Overlay configuration.
//!
//! Defaults reproduce the stock deployment; every knob can be overridden
//! from an `OVERLAY_*` environment variable.

use crate::csrf::CsrfPolicy;
use chrono::Duration;
use std::env;
use std::time::Duration as StdDuration;

pub const DEFAULT_API_BASE: &str = "/admin/entries/";
pub const DEFAULT_NOTIFICATION_SECS: i64 = 5;
pub const DEFAULT_DELETE_REDIRECT: &str = "/countries/";
pub const DEFAULT_FLAG_TYPE: &str = "needs-review";
pub const DELETE_REDIRECT_DELAY_MS: i64 = 2000;
pub const DELETE_FADE_MS: i64 = 300;

/// What happens after a save or add-relation succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshStrategy {
    /// Reload the whole page.
    #[default]
    Reload,
    /// Re-fetch the entry and patch the nodes that render it.
    Refetch,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a positive number of seconds, got {value:?}")]
    InvalidSeconds { var: &'static str, value: String },
    #[error("OVERLAY_REFRESH must be `reload` or `refetch`, got {0:?}")]
    InvalidRefresh(String),
}

#[derive(Debug, Clone)]
pub struct OverlayConfig {
    pub api_base: String,
    pub notification_duration: Duration,
    pub delete_redirect: String,
    pub delete_redirect_delay: Duration,
    pub delete_fade: Duration,
    pub flag_type: String,
    pub csrf: CsrfPolicy,
    pub refresh: RefreshStrategy,
    pub request_timeout: Option<StdDuration>,
    pub session_cookie: Option<String>,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            notification_duration: Duration::seconds(DEFAULT_NOTIFICATION_SECS),
            delete_redirect: DEFAULT_DELETE_REDIRECT.to_string(),
            delete_redirect_delay: Duration::milliseconds(DELETE_REDIRECT_DELAY_MS),
            delete_fade: Duration::milliseconds(DELETE_FADE_MS),
            flag_type: DEFAULT_FLAG_TYPE.to_string(),
            csrf: CsrfPolicy::Disabled,
            refresh: RefreshStrategy::Reload,
            request_timeout: None,
            session_cookie: None,
        }
    }
}

impl OverlayConfig {
    /// Defaults overlaid with whatever `OVERLAY_*` variables are set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`OverlayConfig::from_env`] with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(base) = get("OVERLAY_API_BASE") {
            config.api_base = base;
        }
        if let Some(secs) = get("OVERLAY_NOTIFICATION_SECS") {
            config.notification_duration =
                Duration::seconds(parse_seconds("OVERLAY_NOTIFICATION_SECS", &secs)?);
        }
        if let Some(target) = get("OVERLAY_DELETE_REDIRECT") {
            config.delete_redirect = target;
        }
        if let Some(flag) = get("OVERLAY_FLAG_TYPE") {
            config.flag_type = flag;
        }
        if let Some(csrf) = get("OVERLAY_CSRF") {
            config.csrf = CsrfPolicy::parse(&csrf);
        }
        if let Some(refresh) = get("OVERLAY_REFRESH") {
            config.refresh = match refresh.trim() {
                "reload" => RefreshStrategy::Reload,
                "refetch" => RefreshStrategy::Refetch,
                other => return Err(ConfigError::InvalidRefresh(other.to_string())),
            };
        }
        if let Some(secs) = get("OVERLAY_TIMEOUT_SECS") {
            let secs = parse_seconds("OVERLAY_TIMEOUT_SECS", &secs)?;
            config.request_timeout = Some(StdDuration::from_secs(secs as u64));
        }
        config.session_cookie = get("OVERLAY_SESSION_COOKIE");

        Ok(config)
    }
}

fn parse_seconds(var: &'static str, value: &str) -> Result<i64, ConfigError> {
    value
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| ConfigError::InvalidSeconds {
            var,
            value: value.to_string(),
        })
}
