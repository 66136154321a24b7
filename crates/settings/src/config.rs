//! Client configuration and account-level settings types.

use crate::error::{ApiError, ApiResult};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const FALLBACK_TIMEZONE: &str = "UTC";

/// Settings API client configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// API base URL, without a trailing slash
    pub base_url: String,
    /// Dashboard login whose settings are edited
    pub login: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            login: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    /// Create config from environment variables.
    /// Uses SPIKE_API_URL, SPIKE_LOGIN and SPIKE_HTTP_TIMEOUT_SECS.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("SPIKE_API_URL") {
            if !url.trim().is_empty() {
                config = config.with_base_url(url);
            }
        }

        if let Ok(login) = std::env::var("SPIKE_LOGIN") {
            config = config.with_login(login);
        }

        if let Ok(secs) = std::env::var("SPIKE_HTTP_TIMEOUT_SECS") {
            match secs.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.timeout = Duration::from_secs(secs),
                _ => warn!(value = %secs, "Invalid SPIKE_HTTP_TIMEOUT_SECS, using default"),
            }
        }

        config
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.base_url = url.trim().trim_end_matches('/').to_string();
        self
    }

    /// Blank logins are treated as unset.
    pub fn with_login(mut self, login: impl Into<String>) -> Self {
        let login = login.into();
        let login = login.trim();
        self.login = (!login.is_empty()).then(|| login.to_string());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Login for network commands.
    pub fn require_login(&self) -> ApiResult<&str> {
        self.login.as_deref().ok_or(ApiError::MissingLogin)
    }

    /// `{base_url}/api/users/{login}{suffix}`
    pub fn user_url(&self, login: &str, suffix: &str) -> String {
        format!("{}/api/users/{}{}", self.base_url, login, suffix)
    }
}

/// Telegram delivery credentials for the account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelegramSettings {
    /// Bot token
    pub tg_token: String,
    /// Default chat for alerts
    pub chat_id: String,
    /// Credentials were saved successfully at least once
    #[serde(skip)]
    pub configured: bool,
    /// The credentials form is open for editing
    #[serde(skip)]
    pub editing: bool,
}

impl TelegramSettings {
    pub fn new(tg_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        let mut settings = Self {
            tg_token: tg_token.into(),
            chat_id: chat_id.into(),
            ..Default::default()
        };
        settings.configured = settings.has_credentials();
        settings.editing = !settings.configured;
        settings
    }

    pub fn has_credentials(&self) -> bool {
        !self.tg_token.trim().is_empty() && !self.chat_id.trim().is_empty()
    }

    /// Credentials accepted by the server; the form closes.
    pub fn mark_configured(&mut self) {
        self.configured = true;
        self.editing = false;
    }
}

fn parse_timezone(name: &str) -> Option<Tz> {
    name.trim().parse::<Tz>().ok()
}

/// Pick the account time zone: the stored value if it names an IANA zone,
/// else the local `TZ` setting, else UTC.
pub fn resolve_timezone(stored: Option<&str>) -> String {
    let local = std::env::var("TZ").ok();
    resolve_timezone_with(stored, local.as_deref())
}

pub fn resolve_timezone_with(stored: Option<&str>, local: Option<&str>) -> String {
    if let Some(stored) = stored {
        if let Some(tz) = parse_timezone(stored) {
            return tz.name().to_string();
        }
        warn!(timezone = %stored, "Stored timezone is not a known zone");
    }
    match local.and_then(parse_timezone) {
        Some(tz) => {
            debug!(timezone = %tz.name(), "Using local timezone");
            tz.name().to_string()
        }
        None => FALLBACK_TIMEZONE.to_string(),
    }
}

/// Whether a symbol is excluded from alerts. The blacklist holds upper-case
/// base symbols; a pair such as `BTCUSDT` or `btc-usdt` matches `BTC`.
pub fn is_blacklisted(blacklist: &[String], symbol: &str) -> bool {
    let symbol = symbol.trim();
    blacklist.iter().any(|entry| {
        if symbol.eq_ignore_ascii_case(entry) {
            return true;
        }
        match (symbol.get(..entry.len()), symbol.get(entry.len()..)) {
            (Some(base), Some(quote)) => {
                base.eq_ignore_ascii_case(entry)
                    && quote
                        .trim_start_matches(['-', '_', '/'])
                        .eq_ignore_ascii_case("USDT")
            }
            _ => false,
        }
    })
}
