//! Quicksurf HTTP client
//!
//! Every request carries the stored access token as a bearer credential.
//! A 401 triggers one token refresh and one retry of the original request;
//! if the refresh fails the stored credentials are cleared and the 401 is
//! handed back to the caller.

pub mod auth;
pub mod credentials;
pub mod error;
pub mod request;
pub mod services;
pub mod storage;
pub mod wallet;

pub use credentials::{CredentialStore, Credentials, Scope};
pub use error::ClientError;
pub use request::{ApiRequest, RequestBody};
pub use storage::{FileStore, KeyValueStore, MemoryStore};

use crate::types::{RefreshRequest, RefreshResponse};
use quicksurf_core::ClientConfig;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, ClientBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use url::Url;

/// Token refresh endpoint, relative to the API root
pub const REFRESH_PATH: &str = "/token/refresh/";

/// Quicksurf API client
#[derive(Clone)]
pub struct QuicksurfClient {
    client: Client,
    api_root: String,
    credentials: CredentialStore,
    refresh_lock: Arc<Mutex<()>>,
}

impl QuicksurfClient {
    /// Create a new client with in-memory credential storage
    pub fn new(api_root: impl Into<String>) -> Result<Self, ClientError> {
        Self::builder().api_root(api_root).build()
    }

    /// Create a new client builder
    pub fn builder() -> QuicksurfClientBuilder {
        QuicksurfClientBuilder::default()
    }

    /// API root with trailing slashes stripped
    pub fn api_root(&self) -> &str {
        &self.api_root
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Whether an access token is currently stored
    pub fn is_authenticated(&self) -> bool {
        self.credentials.access_token().is_some()
    }

    /// Persist credentials; see [`CredentialStore::save`]
    pub fn save_credentials(&self, access: &str, refresh: Option<&str>, remember: bool) {
        self.credentials.save(access, refresh, remember);
    }

    /// Remove stored credentials from both scopes
    pub fn clear_credentials(&self) {
        self.credentials.clear();
    }

    /// Authorization headers for callers issuing requests themselves
    pub fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(value) = self
            .credentials
            .access_token()
            .and_then(|token| bearer(&token))
        {
            headers.insert(header::AUTHORIZATION, value);
        }
        headers
    }

    /// Issue a request with the stored bearer token
    ///
    /// The response is returned whatever its status. On a 401 the token is
    /// refreshed once and the request retried once; the retry's response is
    /// returned. If the refresh fails, credentials are cleared and the
    /// original 401 is returned.
    ///
    /// # Errors
    ///
    /// Fails only when the target is not a valid URL or the transport fails
    pub async fn request(&self, request: impl Into<ApiRequest>) -> Result<Response, ClientError> {
        let request = request.into();
        let url = request::resolve_target(&self.api_root, &request.target)?;
        let token = self.credentials.access_token();

        let response = self.send(&request, &url, token.as_deref()).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        // The body is read now so the refresh cannot outlive the request deadline
        let response = buffered(response).await?;
        debug!(method = %request.method, url = %url, "Received 401, refreshing access token");
        match self.refresh_rejected(token.as_deref()).await {
            Ok(fresh) => self.send(&request, &url, Some(fresh.as_str())).await,
            Err(e) => {
                warn!(error = %e, "Token refresh failed, clearing stored credentials");
                self.credentials.clear();
                Ok(response)
            }
        }
    }

    /// Issue a request and decode the JSON body
    ///
    /// Returns `None` for 204 responses and empty bodies.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Status`] when the final response is not
    /// successful, in addition to the errors of [`Self::request`]
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        request: impl Into<ApiRequest>,
    ) -> Result<Option<T>, ClientError> {
        let response = self.request(request).await?;
        read_json(response).await
    }

    /// Exchange the stored refresh token for a new access token
    ///
    /// The new token is written to the preferred scope and returned. Stored
    /// credentials are left untouched on failure.
    ///
    /// # Errors
    ///
    /// [`ClientError::NoRefreshToken`], [`ClientError::RefreshRejected`],
    /// [`ClientError::MalformedRefreshResponse`], or a transport error
    pub async fn refresh(&self) -> Result<String, ClientError> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    /// Refresh after `rejected` was turned down by the server
    ///
    /// Concurrent callers queue on the refresh lock. A caller that finds a
    /// different token stored once it gets the lock takes that token
    /// instead of refreshing again.
    async fn refresh_rejected(&self, rejected: Option<&str>) -> Result<String, ClientError> {
        let _guard = self.refresh_lock.lock().await;

        if let Some(current) = self.credentials.access_token() {
            if rejected != Some(current.as_str()) {
                debug!("Access token already replaced, skipping refresh");
                return Ok(current);
            }
        }

        self.refresh_locked().await
    }

    async fn refresh_locked(&self) -> Result<String, ClientError> {
        let refresh = self
            .credentials
            .refresh_token()
            .ok_or(ClientError::NoRefreshToken)?;
        let url = request::resolve_target(&self.api_root, REFRESH_PATH)?;

        let response = self
            .client
            .post(url)
            .header(header::ACCEPT, application_json())
            .json(&RefreshRequest { refresh: &refresh })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::RefreshRejected { status });
        }

        let body: RefreshResponse = response
            .json()
            .await
            .map_err(|_| ClientError::MalformedRefreshResponse)?;
        let access = body
            .access
            .filter(|token| !token.is_empty())
            .ok_or(ClientError::MalformedRefreshResponse)?;

        let remember = self.credentials.preferred_scope() == Scope::Durable;
        self.credentials.save(&access, None, remember);
        info!("Access token refreshed");

        Ok(access)
    }

    /// Issue a request without a bearer token and without refresh handling
    pub(crate) async fn request_public<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<Option<T>, ClientError> {
        let url = request::resolve_target(&self.api_root, &request.target)?;
        let response = self.send(&request, &url, None).await?;
        read_json(response).await
    }

    async fn send(
        &self,
        request: &ApiRequest,
        url: &Url,
        token: Option<&str>,
    ) -> Result<Response, ClientError> {
        let mut headers = request.headers.clone();

        if let Some(token) = token {
            match bearer(token) {
                Some(value) => {
                    headers.insert(header::AUTHORIZATION, value);
                }
                None => warn!("Stored access token is not a valid header value, sending without it"),
            }
        }
        if !headers.contains_key(header::ACCEPT) {
            headers.insert(header::ACCEPT, application_json());
        }

        let mut builder = self.client.request(request.method.clone(), url.clone());
        if let Some(body) = &request.body {
            if !body.is_binary() && !headers.contains_key(header::CONTENT_TYPE) {
                headers.insert(header::CONTENT_TYPE, application_json());
            }
            builder = builder.body(body.to_bytes());
        }

        debug!(method = %request.method, url = %url, authenticated = token.is_some(), "Sending request");
        Ok(builder.headers(headers).send().await?)
    }
}

fn application_json() -> HeaderValue {
    HeaderValue::from_static("application/json")
}

fn bearer(token: &str) -> Option<HeaderValue> {
    let mut value = HeaderValue::from_str(&format!("Bearer {token}")).ok()?;
    value.set_sensitive(true);
    Some(value)
}

/// Copy of `response` with its body read into memory
///
/// Status, version, headers and extensions are kept.
async fn buffered(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    let version = response.version();
    let headers = response.headers().clone();
    let extensions = response.extensions().clone();
    let body = response.bytes().await?;

    let mut copy = http::Response::new(body);
    *copy.status_mut() = status;
    *copy.version_mut() = version;
    *copy.headers_mut() = headers;
    *copy.extensions_mut() = extensions;
    Ok(Response::from(copy))
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<Option<T>, ClientError> {
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ClientError::from_status(status, body));
    }
    if status == StatusCode::NO_CONTENT {
        return Ok(None);
    }

    let bytes = response.bytes().await?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    Ok(Some(serde_json::from_slice(&bytes)?))
}

/// Builder for QuicksurfClient
#[derive(Default)]
pub struct QuicksurfClientBuilder {
    api_root: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    credentials: Option<CredentialStore>,
}

impl QuicksurfClientBuilder {
    /// Start from loaded configuration
    pub fn from_config(config: &ClientConfig) -> Self {
        let mut builder = Self::default()
            .api_root(config.api_root())
            .user_agent(config.user_agent.clone());
        if config.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_secs));
        }
        builder
    }

    /// Set the API root
    pub fn api_root(mut self, url: impl Into<String>) -> Self {
        self.api_root = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Set the credential store (defaults to in-memory scopes)
    pub fn credentials(mut self, credentials: CredentialStore) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<QuicksurfClient, ClientError> {
        let api_root = self
            .api_root
            .ok_or_else(|| ClientError::Configuration("api_root is required".into()))?;

        let api_root = api_root.trim_end_matches('/').to_string();
        Url::parse(&api_root)
            .map_err(|e| ClientError::Configuration(format!("api_root '{api_root}': {e}")))?;

        let mut client_builder = ClientBuilder::new();

        #[cfg(not(target_arch = "wasm32"))]
        if let Some(timeout) = self.timeout {
            client_builder = client_builder.timeout(timeout);
        }

        if let Some(user_agent) = self.user_agent {
            client_builder = client_builder.user_agent(user_agent);
        } else {
            client_builder = client_builder.user_agent("quicksurf-client/0.1.0");
        }

        let client = client_builder.build()?;

        Ok(QuicksurfClient {
            client,
            api_root,
            credentials: self.credentials.unwrap_or_default(),
            refresh_lock: Arc::new(Mutex::new(())),
        })
    }
}
