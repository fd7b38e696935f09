//! Request pipeline.
//!
//! [`ApiClient`] is the single outbound gateway to the library service. Every
//! resource client builds an [`ApiRequest`] and hands it to
//! [`ApiClient::send`] or [`ApiClient::send_empty`].
//!
//! # Behavior
//!
//! - The bearer credential is attached whenever the session holds one.
//! - Requests are sent once. There is no retry, queuing or deduplication.
//! - Non-2xx responses become an [`ApiError`] carrying the status and the
//!   server's `message`/`errors` body.
//! - A 401 on a request not marked [`anonymous`](ApiRequest::anonymous)
//!   expires the session.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::session::SessionStore;

/// A single API call, before it is sent.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<serde_json::Value>,
    anonymous: bool,
}

impl ApiRequest {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            anonymous: false,
        }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    #[must_use]
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append a query parameter.
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Set a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Parse`] if `body` cannot be encoded as JSON.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::Parse(format!("could not encode request body: {e}")))?;
        self.body = Some(value);
        Ok(self)
    }

    /// Mark the request as not part of the current session.
    ///
    /// A 401 answer to an anonymous request (a failed login, for instance)
    /// leaves the session untouched.
    #[must_use]
    pub const fn anonymous(mut self) -> Self {
        self.anonymous = true;
        self
    }

    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }
}

/// HTTP gateway to the library service.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: String,
    session: Arc<SessionStore>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client for `base_url` with a per-request `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        timeout: Duration,
        session: Arc<SessionStore>,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("library-ai/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client, base_url, session))
    }

    /// Create a client around an existing `reqwest::Client`.
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: &str, session: Arc<SessionStore>) -> Self {
        Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: base_url.trim_end_matches('/').to_string(),
                session,
            }),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    #[must_use]
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.inner.session
    }

    /// Send a request and decode the JSON response body.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on network failure, a non-2xx status, or an
    /// undecodable body.
    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let response = self.execute(request).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Parse(e.to_string()))
    }

    /// Send a request whose response body is not needed.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on network failure or a non-2xx status.
    pub async fn send_empty(&self, request: ApiRequest) -> Result<(), ApiError> {
        self.execute(request).await.map(drop)
    }

    async fn execute(&self, request: ApiRequest) -> Result<reqwest::Response, ApiError> {
        let url = format!("{}{}", self.inner.base_url, request.path);
        let credential = self.inner.session.credential().await;

        let mut builder = self.inner.client.request(request.method.clone(), &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(credential) = &credential {
            builder = builder.header(reqwest::header::AUTHORIZATION, credential.bearer_header());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(method = %request.method, path = %request.path, error = %e, "Request failed");
                return Err(ApiError::Network(e.to_string()));
            }
        };

        let status = response.status();
        debug!(
            method = %request.method,
            path = %request.path,
            status = status.as_u16(),
            "API request"
        );

        if status.is_success() {
            return Ok(response);
        }

        let body = response.bytes().await.unwrap_or_default();
        let error = ApiError::from_status(status.as_u16(), &body);

        if error.is_unauthorized()
            && !request.anonymous
            && let Some(credential) = &credential
        {
            self.inner.session.expire(credential).await;
        }

        Err(error)
    }
}
