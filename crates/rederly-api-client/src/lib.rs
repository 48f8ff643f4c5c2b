//! HTTP client for the Rederly backend.
//!
//! Provides a minimal client with configurable auth (Bearer token or session
//! cookie), generic GET/POST/PUT/DELETE helpers over the backend's `data`
//! envelope, and domain methods (attachments, regrade status). Errors are
//! constructed here as [`ApiError`] so callers branch on kind: transport
//! failures become `Network`, recognizable backend envelopes become `Backend`.

pub mod api;

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use rederly_core::{ApiError, ApiResult, Auth, SessionConfig};

/// API path prefix (e.g. "/backend-api"). Set REDERLY_API_PREFIX to match
/// the server's mount point.
pub fn api_prefix() -> String {
    std::env::var("REDERLY_API_PREFIX").unwrap_or_else(|_| "/backend-api".to_string())
}

/// JSON envelope carried by every application-backend response.
#[derive(Debug, Deserialize)]
struct BackendEnvelope<T> {
    data: T,
}

/// Error body shape the backend uses for structured failures.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

/// HTTP client for the Rederly backend with configurable auth.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    auth: Auth,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, auth: Auth) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| ApiError::Protocol(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
        })
    }

    /// Create a client from an established session.
    pub fn from_session(config: &SessionConfig) -> ApiResult<Self> {
        Self::new(config.base_url.clone(), config.auth.clone())
    }

    /// Create a client from environment: REDERLY_API_URL and
    /// REDERLY_SESSION_TOKEN. Uses cookie auth, matching the browser client.
    pub fn from_env() -> anyhow::Result<Self> {
        let config = SessionConfig::from_env()?;
        Ok(Self::from_session(&config)?)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            Auth::Bearer(token) => request.header("Authorization", format!("Bearer {}", token)),
            Auth::Cookie(token) => request.header("Cookie", format!("sessionToken={}", token)),
        }
    }

    fn transport_error(err: reqwest::Error) -> ApiError {
        ApiError::Network {
            message: format!("Failed to send request: {}", err),
        }
    }

    fn decode_error(err: reqwest::Error) -> ApiError {
        ApiError::Network {
            message: format!("Failed to parse response as JSON: {}", err),
        }
    }

    /// Map a non-2xx response into a typed error. A parseable message
    /// envelope becomes `Backend`; anything else is `Network`.
    async fn error_from_response(response: reqwest::Response) -> ApiError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        if let Ok(parsed) = serde_json::from_str::<ErrorBody>(&body) {
            if let Some(message) = parsed.message.or(parsed.error) {
                return ApiError::Backend { status, message };
            }
        }

        ApiError::Network {
            message: format!("Request failed with status {}: {}", status, body),
        }
    }

    async fn parse_envelope<T: DeserializeOwned>(response: reqwest::Response) -> ApiResult<T> {
        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        let envelope: BackendEnvelope<T> = response.json().await.map_err(Self::decode_error)?;
        Ok(envelope.data)
    }

    /// GET request with optional query parameters. Unwraps the `data` envelope.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> ApiResult<T> {
        let url = self.build_url(path);
        let mut request = self.apply_auth(self.client.get(&url));
        if !query.is_empty() {
            request = request.query(query);
        }

        let response = request.send().await.map_err(Self::transport_error)?;
        Self::parse_envelope(response).await
    }

    /// POST a JSON body. Unwraps the `data` envelope.
    pub async fn post_json<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        let url = self.build_url(path);
        let request = self.apply_auth(self.client.post(&url).json(body));

        let response = request.send().await.map_err(Self::transport_error)?;
        Self::parse_envelope(response).await
    }

    /// PUT with optional query parameters, discarding the response body.
    pub async fn put_unit(&self, path: &str, query: &[(&str, String)]) -> ApiResult<()> {
        let url = self.build_url(path);
        let mut request = self.apply_auth(self.client.put(&url));
        if !query.is_empty() {
            request = request.query(query);
        }

        let response = request.send().await.map_err(Self::transport_error)?;
        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        Ok(())
    }

    /// DELETE request. Returns Ok(()) on success.
    pub async fn delete(&self, path: &str) -> ApiResult<()> {
        let url = self.build_url(path);
        let request = self.apply_auth(self.client.delete(&url));

        let response = request.send().await.map_err(Self::transport_error)?;
        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        Ok(())
    }

    /// Raw client for requests outside the application backend (presigned
    /// storage URLs). Caller is responsible for headers.
    pub fn client(&self) -> &Client {
        &self.client
    }
}
