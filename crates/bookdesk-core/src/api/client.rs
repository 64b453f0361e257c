//! API client for the booking portal REST API.
//!
//! `ApiClient` issues requests relative to a fixed base address and
//! authorizes each one from the `TokenStore` at the moment it is built, so a
//! login or logout elsewhere takes effect on the next request.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::{header, Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::TokenStore;
use crate::config::Config;

use super::ApiError;

/// Current-user endpoint, relative to the base address
const CURRENT_USER_PATH: &str = "/users/me";

/// Payload of `GET /users/me`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    #[serde(rename = "IsAdmin")]
    pub is_admin: bool,
    #[serde(flatten)]
    pub other: BTreeMap<String, serde_json::Value>,
}

/// API client for the portal backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    tokens: TokenStore,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration, tokens: TokenStore) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    pub fn from_config(config: &Config, tokens: TokenStore) -> Result<Self, ApiError> {
        Self::new(
            &config.api_base_url,
            Duration::from_secs(config.request_timeout_secs),
            tokens,
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Request hook: attach the stored token as a bearer credential.
    /// Without a stored token the request goes out with no Authorization header.
    pub fn authorize(&self, builder: RequestBuilder) -> Result<RequestBuilder, ApiError> {
        match self.tokens.get_token() {
            Some(token) => {
                let mut value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(|_| ApiError::InvalidToken)?;
                value.set_sensitive(true);
                Ok(builder.header(header::AUTHORIZATION, value))
            }
            None => Ok(builder),
        }
    }

    /// Start a request to `path` with the bearer hook applied
    pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let url = self.url(path);
        self.authorize(self.client.request(method, url))
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn send_json<T: DeserializeOwned>(builder: RequestBuilder, url: &str) -> Result<T, ApiError> {
        let response = builder.send().await?;
        let response = Self::check_response(response).await?;
        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse JSON from {}: {}", url, e)))
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path);
        debug!(url = %url, "GET");
        Self::send_json(self.request(Method::GET, path)?, &url).await
    }

    /// Fetch the user the stored token belongs to
    pub async fn fetch_current_user(&self) -> Result<CurrentUser, ApiError> {
        self.get_json(CURRENT_USER_PATH).await
    }
}
