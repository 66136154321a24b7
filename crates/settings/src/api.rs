//! User settings HTTP API.
//!
//! - `GET  /api/users/{login}` returns the stored record, 404 for new users
//! - `POST /api/users/{login}/settings` replaces the record
//! - `POST /api/users/{login}/test` sends a test message to the chat
//!
//! Failures carry a JSON body with a human-readable `detail`.

use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use spike_serialization::lenient;
use tracing::{debug, info};

/// Stored user record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub tg_token: String,
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub chat_id: String,
    /// Serialized options blob.
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub options_json: String,
}

/// Backend holding user settings.
#[async_trait]
pub trait SettingsApi: Send + Sync {
    /// `Ok(None)` when the user has no settings yet.
    async fn fetch_user(&self, login: &str) -> ApiResult<Option<UserRecord>>;

    async fn save_settings(&self, login: &str, record: &UserRecord) -> ApiResult<()>;

    /// Ask the backend to send a test message with the saved credentials.
    async fn test_connection(&self, login: &str) -> ApiResult<()>;
}

/// Human-readable text from an error body.
///
/// `detail` may be a string or a list of `{msg}` objects.
pub fn detail_from_body(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    let detail = json.get("detail")?;
    let text = match detail {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                other => other.get("msg").and_then(Value::as_str).map(str::to_string),
            })
            .collect::<Vec<_>>()
            .join("; "),
        Value::Null => return None,
        other => other.to_string(),
    };
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn server_error(status: StatusCode, body: &str) -> ApiError {
    let message = detail_from_body(body)
        .unwrap_or_else(|| format!("Ошибка сервера (HTTP {})", status.as_u16()));
    ApiError::Server {
        status: status.as_u16(),
        message,
    }
}

/// reqwest-backed [`SettingsApi`].
pub struct HttpSettingsApi {
    config: ClientConfig,
    http_client: reqwest::Client,
}

impl HttpSettingsApi {
    pub fn new(config: ClientConfig) -> ApiResult<Self> {
        let http_client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn post_json<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> ApiResult<()> {
        let response = self.http_client.post(url).json(body).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(server_error(status, &body))
    }
}

#[async_trait]
impl SettingsApi for HttpSettingsApi {
    async fn fetch_user(&self, login: &str) -> ApiResult<Option<UserRecord>> {
        let url = self.config.user_url(login, "");
        debug!(url = %url, "Fetching user settings");

        let response = self.http_client.get(&url).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            info!(login = %login, "No stored settings, starting from defaults");
            return Ok(None);
        }

        let body = response.text().await?;
        if !status.is_success() {
            return Err(server_error(status, &body));
        }

        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn save_settings(&self, login: &str, record: &UserRecord) -> ApiResult<()> {
        let url = self.config.user_url(login, "/settings");
        debug!(url = %url, bytes = record.options_json.len(), "Saving user settings");
        self.post_json(&url, record).await
    }

    async fn test_connection(&self, login: &str) -> ApiResult<()> {
        let url = self.config.user_url(login, "/test");
        debug!(url = %url, "Testing Telegram connection");
        self.post_json(&url, &serde_json::json!({})).await
    }
}
