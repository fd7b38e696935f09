//! Admin endpoints (`/admin/*`).
//!
//! The service answers 403 to non-admin sessions; the route guard keeps
//! ordinary users from reaching these calls in the first place.

use library_ai_core::{Book, BookFilter, BookId, NewUser, Role, User, UserId};
use serde::Serialize;
use tracing::instrument;

use crate::error::ApiError;
use crate::http::{ApiClient, ApiRequest};

#[derive(Serialize)]
struct RoleUpdate {
    role: Role,
}

/// Client for `/admin`.
#[derive(Debug, Clone)]
pub struct AdminApi {
    http: ApiClient,
}

impl AdminApi {
    #[must_use]
    pub const fn new(http: ApiClient) -> Self {
        Self { http }
    }

    /// `GET /admin/users`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Forbidden`] for non-admin sessions.
    #[instrument(skip(self))]
    pub async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        self.http.send(ApiRequest::get("/admin/users")).await
    }

    /// `POST /admin/users`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] when the service rejects the account.
    #[instrument(skip(self, user), fields(email = %user.email, role = %user.role))]
    pub async fn create_user(&self, user: &NewUser) -> Result<User, ApiError> {
        self.http
            .send(ApiRequest::post("/admin/users").json(user)?)
            .await
    }

    /// `PATCH /admin/users/:id`
    ///
    /// # Errors
    ///
    /// Returns the pipeline's [`ApiError`].
    #[instrument(skip(self))]
    pub async fn set_user_role(&self, id: UserId, role: Role) -> Result<User, ApiError> {
        let request = ApiRequest::patch(format!("/admin/users/{id}")).json(&RoleUpdate { role })?;
        self.http.send(request).await
    }

    /// `DELETE /admin/users/:id`
    ///
    /// # Errors
    ///
    /// Returns the pipeline's [`ApiError`].
    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: UserId) -> Result<(), ApiError> {
        self.http
            .send_empty(ApiRequest::delete(format!("/admin/users/{id}")))
            .await
    }

    /// `GET /admin/books?genre=&status=`
    ///
    /// # Errors
    ///
    /// Returns the pipeline's [`ApiError`].
    #[instrument(skip(self), fields(genre = ?filter.genre(), status = ?filter.status()))]
    pub async fn list_books(&self, filter: &BookFilter) -> Result<Vec<Book>, ApiError> {
        let request = filter
            .query_pairs()
            .into_iter()
            .fold(ApiRequest::get("/admin/books"), |req, (key, value)| {
                req.query(key, value)
            });
        self.http.send(request).await
    }

    /// `DELETE /admin/books/:id`
    ///
    /// # Errors
    ///
    /// Returns the pipeline's [`ApiError`].
    #[instrument(skip(self))]
    pub async fn delete_book(&self, id: BookId) -> Result<(), ApiError> {
        self.http
            .send_empty(ApiRequest::delete(format!("/admin/books/{id}")))
            .await
    }
}
