//! The caller's own books (`/books/*`).

use library_ai_core::{Book, BookFilter, BookId, NewBook};
use tracing::instrument;

use crate::error::ApiError;
use crate::http::{ApiClient, ApiRequest};

/// Client for `/books`.
#[derive(Debug, Clone)]
pub struct BooksApi {
    http: ApiClient,
}

impl BooksApi {
    #[must_use]
    pub const fn new(http: ApiClient) -> Self {
        Self { http }
    }

    /// `GET /books/?genre=&status=`
    ///
    /// Filtering happens on the server; only set filters are sent.
    ///
    /// # Errors
    ///
    /// Returns the pipeline's [`ApiError`].
    #[instrument(skip(self), fields(genre = ?filter.genre(), status = ?filter.status()))]
    pub async fn list_mine(&self, filter: &BookFilter) -> Result<Vec<Book>, ApiError> {
        let request = filter
            .query_pairs()
            .into_iter()
            .fold(ApiRequest::get("/books/"), |req, (key, value)| {
                req.query(key, value)
            });
        self.http.send(request).await
    }

    /// `POST /books/`
    ///
    /// # Errors
    ///
    /// Returns the pipeline's [`ApiError`].
    #[instrument(skip(self, book), fields(title = %book.title))]
    pub async fn create(&self, book: &NewBook) -> Result<Book, ApiError> {
        self.http
            .send(ApiRequest::post("/books/").json(book)?)
            .await
    }

    /// `PUT /books/:id`
    ///
    /// # Errors
    ///
    /// Returns the pipeline's [`ApiError`].
    #[instrument(skip(self, book))]
    pub async fn update(&self, id: BookId, book: &NewBook) -> Result<Book, ApiError> {
        self.http
            .send(ApiRequest::put(format!("/books/{id}")).json(book)?)
            .await
    }

    /// `DELETE /books/:id`
    ///
    /// # Errors
    ///
    /// Returns the pipeline's [`ApiError`].
    #[instrument(skip(self))]
    pub async fn delete(&self, id: BookId) -> Result<(), ApiError> {
        self.http
            .send_empty(ApiRequest::delete(format!("/books/{id}")))
            .await
    }
}
