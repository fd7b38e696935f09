//! AI endpoints (`/ai/*`).

use library_ai_core::{AiAnswer, Insights, Recommendations};
use serde::Serialize;
use tracing::instrument;

use crate::error::ApiError;
use crate::http::{ApiClient, ApiRequest};

#[derive(Serialize)]
struct Question<'a> {
    question: &'a str,
}

/// Client for `/ai`.
#[derive(Debug, Clone)]
pub struct AiApi {
    http: ApiClient,
}

impl AiApi {
    #[must_use]
    pub const fn new(http: ApiClient) -> Self {
        Self { http }
    }

    /// `POST /ai/query`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] for a blank or unanswerable question.
    #[instrument(skip(self))]
    pub async fn ask(&self, question: &str) -> Result<AiAnswer, ApiError> {
        self.http
            .send(ApiRequest::post("/ai/query").json(&Question { question })?)
            .await
    }

    /// `GET /ai/recommendations`
    ///
    /// # Errors
    ///
    /// Returns the pipeline's [`ApiError`].
    #[instrument(skip(self))]
    pub async fn recommendations(&self) -> Result<Recommendations, ApiError> {
        self.http.send(ApiRequest::get("/ai/recommendations")).await
    }

    /// `GET /ai/insights`
    ///
    /// # Errors
    ///
    /// Returns the pipeline's [`ApiError`].
    #[instrument(skip(self))]
    pub async fn insights(&self) -> Result<Insights, ApiError> {
        self.http.send(ApiRequest::get("/ai/insights")).await
    }
}
