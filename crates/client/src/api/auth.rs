//! Authentication endpoints (`/auth/*`).

use library_ai_core::{Credential, Identity, LoginCredentials, Registration};
use serde::Deserialize;
use tracing::instrument;

use crate::error::ApiError;
use crate::http::{ApiClient, ApiRequest};

/// Successful `POST /auth/login` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "RawLoginResponse")]
pub struct LoginResponse {
    pub access_token: Credential,
    pub user: Identity,
}

#[derive(Deserialize)]
struct RawLoginResponse {
    access_token: String,
    user: Identity,
}

impl From<RawLoginResponse> for LoginResponse {
    fn from(raw: RawLoginResponse) -> Self {
        Self {
            access_token: Credential::new(raw.access_token),
            user: raw.user,
        }
    }
}

/// Client for `/auth`.
#[derive(Debug, Clone)]
pub struct AuthApi {
    http: ApiClient,
}

impl AuthApi {
    #[must_use]
    pub const fn new(http: ApiClient) -> Self {
        Self { http }
    }

    /// `POST /auth/register`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] with field errors when the service
    /// rejects the registration, for example because the email is taken.
    #[instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(&self, registration: &Registration) -> Result<(), ApiError> {
        let request = ApiRequest::post("/auth/register")
            .json(registration)?
            .anonymous();
        self.http.send_empty(request).await
    }

    /// `POST /auth/login`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] for wrong credentials. The current
    /// session is left as it was.
    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<LoginResponse, ApiError> {
        let request = ApiRequest::post("/auth/login")
            .json(credentials)?
            .anonymous();
        self.http.send(request).await
    }

    /// `GET /auth/me`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] if the credential is missing or
    /// rejected.
    #[instrument(skip(self))]
    pub async fn me(&self) -> Result<Identity, ApiError> {
        self.http.send(ApiRequest::get("/auth/me")).await
    }
}
