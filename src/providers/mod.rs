pub mod aws;
pub mod azure;
pub mod gcp;

use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("{code}: {message}")]
    Api { code: String, message: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("{0}")]
    Other(String),
}

impl ProviderError {
    pub fn api(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api { code: code.into(), message: message.into() }
    }

    /// Provider-specific error code, when the service returned one.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => Some(code),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::blocking::Client, ProviderError> {
    reqwest::blocking::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("storage-audit/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(ProviderError::from)
}

/// Sends `request` and decodes a JSON body, turning error bodies into
/// [`ProviderError::Api`]. A success body that is not JSON is an error, never
/// an empty document.
pub(crate) fn send_json(request: reqwest::blocking::RequestBuilder) -> Result<Value, ProviderError> {
    let response = request.send()?;
    let status = response.status();
    let url = response.url().path().to_string();
    let text = response.text()?;
    debug!(%status, path = %url, "provider response");
    if status.is_success() {
        return serde_json::from_str(&text)
            .map_err(|e| ProviderError::Other(format!("undecodable response body: {}", e)));
    }
    let body = serde_json::from_str(&text).unwrap_or(Value::Null);
    Err(api_error(status.as_u16(), &body))
}

/// Azure returns `{"error": {"code", "message"}}`, Google returns
/// `{"error": {"code": 404, "status": "NOT_FOUND", "message"}}`, and the
/// token endpoints return `{"error": "...", "error_description": "..."}`.
pub(crate) fn api_error(http_status: u16, body: &Value) -> ProviderError {
    let error = &body["error"];
    let code = error["code"]
        .as_str()
        .or_else(|| error["status"].as_str())
        .or_else(|| error.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP{}", http_status));
    let message = error["message"]
        .as_str()
        .or_else(|| body["error_description"].as_str())
        .unwrap_or("request failed")
        .to_string();
    ProviderError::api(code, message)
}
