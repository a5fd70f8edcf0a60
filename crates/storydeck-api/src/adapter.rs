use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

/// Transport failure as the API layer sees it: a human-readable message
/// plus the server error code when the body carried one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct AdapterError {
    pub message: String,
    pub code: Option<String>,
}

impl AdapterError {
    pub fn new(message: impl Into<String>, code: Option<String>) -> Self {
        Self {
            message: message.into(),
            code,
        }
    }
}

/// Plain-body response. Call sites parse JSON where a call expects it;
/// preview fetches consume the body as-is. Header names are lowercased.
#[derive(Debug, Clone, Default)]
pub struct AdapterResponse {
    pub body: String,
    pub headers: BTreeMap<String, String>,
}

/// Seam between the API layer and the wire. The real implementation is
/// [`HttpAdapter`]; tests substitute a recording mock.
#[async_trait]
pub trait DataAdapter: Send + Sync {
    async fn get(&self, path: &str) -> Result<AdapterResponse, AdapterError>;

    async fn post(
        &self,
        path: &str,
        data: &serde_json::Value,
    ) -> Result<AdapterResponse, AdapterError>;

    async fn delete_request(
        &self,
        path: &str,
        data: &serde_json::Value,
    ) -> Result<AdapterResponse, AdapterError>;
}

/// WordPress REST error body, e.g. `{"code":"rest_forbidden","message":"..."}`.
#[derive(Debug, Deserialize)]
struct WpErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

pub(crate) fn error_from_response(status: u16, body: &str) -> AdapterError {
    if let Ok(parsed) = serde_json::from_str::<WpErrorBody>(body) {
        if parsed.code.is_some() || parsed.message.is_some() {
            return AdapterError {
                message: parsed
                    .message
                    .unwrap_or_else(|| format!("request failed with status {status}")),
                code: parsed.code,
            };
        }
    }
    AdapterError {
        message: format!("request failed with status {status}"),
        code: None,
    }
}

pub struct HttpAdapter {
    client: reqwest::Client,
    username: Option<String>,
    application_password: Option<String>,
}

impl HttpAdapter {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            username: None,
            application_password: None,
        }
    }

    /// WordPress application-password auth; `context=edit` requests need it.
    pub fn with_basic_auth(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            username: Some(username.into()),
            application_password: Some(password.into()),
        }
    }

    async fn execute(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<AdapterResponse, AdapterError> {
        let request = match (&self.username, &self.application_password) {
            (Some(user), Some(password)) => request.basic_auth(user, Some(password)),
            _ => request,
        };

        let response = request
            .send()
            .await
            .map_err(|err| AdapterError::new(err.to_string(), None))?;

        let status = response.status();
        let mut headers = BTreeMap::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                headers.insert(name.as_str().to_ascii_lowercase(), value.to_string());
            }
        }

        let body = response
            .text()
            .await
            .map_err(|err| AdapterError::new(err.to_string(), None))?;

        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), "request rejected by server");
            return Err(error_from_response(status.as_u16(), &body));
        }

        Ok(AdapterResponse { body, headers })
    }
}

impl Default for HttpAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DataAdapter for HttpAdapter {
    async fn get(&self, path: &str) -> Result<AdapterResponse, AdapterError> {
        self.execute(self.client.get(path)).await
    }

    async fn post(
        &self,
        path: &str,
        data: &serde_json::Value,
    ) -> Result<AdapterResponse, AdapterError> {
        self.execute(self.client.post(path).json(data)).await
    }

    async fn delete_request(
        &self,
        path: &str,
        data: &serde_json::Value,
    ) -> Result<AdapterResponse, AdapterError> {
        self.execute(self.client.delete(path).json(data)).await
    }
}
