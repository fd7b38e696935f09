//! The [`LibraryClient`] facade.
//!
//! Wires the session store, request pipeline, resource clients and query
//! cache together, and owns two rules the parts cannot enforce alone:
//!
//! - every successful mutation invalidates the families listed by
//!   [`Mutation::invalidates`];
//! - the cache is emptied whenever the session changes hands (login, logout,
//!   or a 401 that expired the session, including one met by a background
//!   refetch).

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use library_ai_core::{
    AiAnswer, Book, BookFilter, BookId, FormError, Identity, Insights, LoginCredentials,
    LoginForm, NewBook, NewUser, Recommendations, RegisterForm, Role, User, UserId,
};
use tracing::{debug, info, instrument};

use crate::api::{AdminApi, AiApi, AuthApi, BooksApi};
use crate::config::ClientConfig;
use crate::error::{ApiError, Error, Result};
use crate::guard::{GuardDecision, Route, guard};
use crate::http::ApiClient;
use crate::query::cache::fetcher;
use crate::query::{CacheValue, Fetcher, Mutation, QueryCache, QueryKey, QueryObserver};
use crate::session::{CredentialStore, FileCredentialStore, SessionState, SessionStore};

/// Entry point for views.
#[derive(Debug, Clone)]
pub struct LibraryClient {
    session: Arc<SessionStore>,
    auth: AuthApi,
    books: BooksApi,
    admin: AdminApi,
    ai: AiApi,
    cache: QueryCache,
}

impl LibraryClient {
    /// Build a client from configuration, persisting the credential under
    /// `config.credential_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the HTTP client cannot be built.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let storage = Arc::new(FileCredentialStore::new(&config.credential_dir));
        Ok(Self::new(&config.base_url(), config.timeout, storage)?)
    }

    /// Build a client for `base_url` with the given credential storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        timeout: Duration,
        storage: Arc<dyn CredentialStore>,
    ) -> std::result::Result<Self, reqwest::Error> {
        let session = Arc::new(SessionStore::new(storage));
        let http = ApiClient::new(base_url, timeout, Arc::clone(&session))?;
        Ok(Self::with_api(http))
    }

    /// Build a client around an existing pipeline.
    #[must_use]
    pub fn with_api(http: ApiClient) -> Self {
        Self {
            session: Arc::clone(http.session()),
            auth: AuthApi::new(http.clone()),
            books: BooksApi::new(http.clone()),
            admin: AdminApi::new(http.clone()),
            ai: AiApi::new(http),
            cache: QueryCache::new(),
        }
    }

    #[must_use]
    pub const fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    #[must_use]
    pub const fn cache(&self) -> &QueryCache {
        &self.cache
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.session.identity()
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Restore a persisted session. Call once at startup.
    pub async fn restore(&self) {
        self.session.restore_session(&self.auth).await;
    }

    /// Validate the form and log in.
    ///
    /// On failure the current session, its persisted credential and the
    /// cache are left as they were.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Form`] for invalid input and [`Error::Api`] if the
    /// service rejects the credentials.
    #[instrument(skip(self, form))]
    pub async fn login(&self, form: &LoginForm) -> Result<Identity> {
        let credentials = form.validate()?;
        self.login_with(&credentials).await
    }

    async fn login_with(&self, credentials: &LoginCredentials) -> Result<Identity> {
        let response = self.auth.login(credentials).await?;
        self.cache.clear();
        self.session
            .login(response.access_token, response.user.clone())
            .await;
        Ok(response.user)
    }

    /// Validate the form and create an account. Does not log in.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Form`] for invalid input and [`Error::Api`] if the
    /// service rejects the registration.
    #[instrument(skip(self, form))]
    pub async fn register(&self, form: &RegisterForm) -> Result<()> {
        let registration = form.validate()?;
        self.auth.register(&registration).await?;
        info!(email = %registration.email, "Registered");
        Ok(())
    }

    /// Create an account and log straight into it.
    ///
    /// # Errors
    ///
    /// See [`register`](Self::register) and [`login`](Self::login).
    #[instrument(skip(self, form))]
    pub async fn register_and_login(&self, form: &RegisterForm) -> Result<Identity> {
        let registration = form.validate()?;
        self.auth.register(&registration).await?;
        self.login_with(&registration.login_credentials()).await
    }

    /// End the session and drop all cached data.
    pub async fn logout(&self) {
        self.session.logout().await;
        self.cache.clear();
    }

    // =========================================================================
    // Routing
    // =========================================================================

    /// Guard `route` against the current session.
    #[must_use]
    pub fn authorize(&self, route: Route) -> GuardDecision {
        guard(route, &self.session.state())
    }

    /// Guard the route at `path`.
    #[must_use]
    pub fn navigate(&self, path: &str) -> GuardDecision {
        self.authorize(Route::from_path(path))
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// The caller's books, filtered on the server.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] if the fetch fails.
    pub async fn books(&self, filter: BookFilter) -> Result<Vec<Book>> {
        let key = QueryKey::Books(filter);
        self.read(&key).await?.into_books().ok_or_else(|| mismatch(&key))
    }

    /// All users (admin).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] if the fetch fails.
    pub async fn admin_users(&self) -> Result<Vec<User>> {
        let key = QueryKey::AdminUsers;
        self.read(&key).await?.into_users().ok_or_else(|| mismatch(&key))
    }

    /// All books (admin), filtered on the server.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] if the fetch fails.
    pub async fn admin_books(&self, filter: BookFilter) -> Result<Vec<Book>> {
        let key = QueryKey::AdminBooks(filter);
        self.read(&key).await?.into_books().ok_or_else(|| mismatch(&key))
    }

    /// # Errors
    ///
    /// Returns [`Error::Api`] if the fetch fails.
    pub async fn recommendations(&self) -> Result<Recommendations> {
        let key = QueryKey::AiRecommendations;
        self.read(&key)
            .await?
            .into_recommendations()
            .ok_or_else(|| mismatch(&key))
    }

    /// # Errors
    ///
    /// Returns [`Error::Api`] if the fetch fails.
    pub async fn insights(&self) -> Result<Insights> {
        let key = QueryKey::AiInsights;
        self.read(&key)
            .await?
            .into_insights()
            .ok_or_else(|| mismatch(&key))
    }

    /// Follow `key`. The entry is fetched if needed and refetched whenever a
    /// mutation invalidates it, for as long as the observer lives.
    #[must_use]
    pub fn observe(&self, key: QueryKey) -> QueryObserver {
        let fetch = self.fetcher_for(&key);
        self.cache.observe(key, fetch)
    }

    async fn read(&self, key: &QueryKey) -> Result<CacheValue> {
        let result = self.cache.fetch(key.clone(), self.fetcher_for(key)).await;
        result.map_err(|e| self.on_error(e))
    }

    /// The fetcher for `key`. A 401 that ends the session clears the cache
    /// before the result is stored, whoever started the fetch.
    fn fetcher_for(&self, key: &QueryKey) -> Fetcher {
        let request = self.request_for(key);
        let session = Arc::clone(&self.session);
        let cache = self.cache.downgrade();
        Arc::new(move || {
            let pending = request();
            let session = Arc::clone(&session);
            let cache = cache.clone();
            async move {
                let result = pending.await;
                if let Err(error) = &result
                    && ended_session(error, &session)
                    && let Some(cache) = cache.upgrade()
                {
                    debug!("Session ended by 401 during a fetch, clearing cache");
                    cache.clear();
                }
                result
            }
            .boxed()
        })
    }

    fn request_for(&self, key: &QueryKey) -> Fetcher {
        match key.clone() {
            QueryKey::Books(filter) => {
                let api = self.books.clone();
                fetcher(move || {
                    let api = api.clone();
                    let filter = filter.clone();
                    async move { api.list_mine(&filter).await.map(CacheValue::Books) }
                })
            }
            QueryKey::AdminUsers => {
                let api = self.admin.clone();
                fetcher(move || {
                    let api = api.clone();
                    async move { api.list_users().await.map(CacheValue::Users) }
                })
            }
            QueryKey::AdminBooks(filter) => {
                let api = self.admin.clone();
                fetcher(move || {
                    let api = api.clone();
                    let filter = filter.clone();
                    async move { api.list_books(&filter).await.map(CacheValue::Books) }
                })
            }
            QueryKey::AiRecommendations => {
                let api = self.ai.clone();
                fetcher(move || {
                    let api = api.clone();
                    async move {
                        api.recommendations()
                            .await
                            .map(|r| CacheValue::Recommendations(Box::new(r)))
                    }
                })
            }
            QueryKey::AiInsights => {
                let api = self.ai.clone();
                fetcher(move || {
                    let api = api.clone();
                    async move {
                        api.insights()
                            .await
                            .map(|i| CacheValue::Insights(Box::new(i)))
                    }
                })
            }
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// # Errors
    ///
    /// Returns [`Error::Api`] if the service rejects the book.
    pub async fn create_book(&self, book: &NewBook) -> Result<Book> {
        self.mutate(Mutation::CreateBook, self.books.create(book))
            .await
    }

    /// # Errors
    ///
    /// Returns [`Error::Api`] if the service rejects the update.
    pub async fn update_book(&self, id: BookId, book: &NewBook) -> Result<Book> {
        self.mutate(Mutation::UpdateBook, self.books.update(id, book))
            .await
    }

    /// # Errors
    ///
    /// Returns [`Error::Api`] if the book cannot be deleted.
    pub async fn delete_book(&self, id: BookId) -> Result<()> {
        self.mutate(Mutation::DeleteBook, self.books.delete(id))
            .await
    }

    /// # Errors
    ///
    /// Returns [`Error::Api`] if the service rejects the account.
    pub async fn create_user(&self, user: &NewUser) -> Result<User> {
        self.mutate(Mutation::AdminCreateUser, self.admin.create_user(user))
            .await
    }

    /// # Errors
    ///
    /// Returns [`Error::Api`] if the role cannot be changed.
    pub async fn set_user_role(&self, id: UserId, role: Role) -> Result<User> {
        self.mutate(Mutation::AdminSetUserRole, self.admin.set_user_role(id, role))
            .await
    }

    /// # Errors
    ///
    /// Returns [`Error::Api`] if the user cannot be deleted.
    pub async fn delete_user(&self, id: UserId) -> Result<()> {
        self.mutate(Mutation::AdminDeleteUser, self.admin.delete_user(id))
            .await
    }

    /// Delete any user's book (admin).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] if the book cannot be deleted.
    pub async fn admin_delete_book(&self, id: BookId) -> Result<()> {
        self.mutate(Mutation::AdminDeleteBook, self.admin.delete_book(id))
            .await
    }

    async fn mutate<T>(
        &self,
        mutation: Mutation,
        request: impl Future<Output = std::result::Result<T, ApiError>>,
    ) -> Result<T> {
        match request.await {
            Ok(value) => {
                debug!(%mutation, families = ?mutation.invalidates(), "Mutation succeeded, invalidating");
                self.cache.invalidate(mutation.invalidates());
                Ok(value)
            }
            Err(e) => Err(self.on_error(e)),
        }
    }

    // =========================================================================
    // AI
    // =========================================================================

    /// Ask a question. Answers are not cached.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Form`] for a blank question and [`Error::Api`] if the
    /// service cannot answer.
    pub async fn ask(&self, question: &str) -> Result<AiAnswer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(FormError::single("question", "Question is required.").into());
        }
        self.ai.ask(question).await.map_err(|e| self.on_error(e))
    }

    /// Drop cached data if `error` ended the session.
    fn on_error(&self, error: ApiError) -> Error {
        if ended_session(&error, &self.session) {
            debug!("Session ended by 401, clearing cache");
            self.cache.clear();
        }
        Error::Api(error)
    }
}

fn ended_session(error: &ApiError, session: &SessionStore) -> bool {
    error.is_unauthorized() && !session.is_authenticated()
}

fn mismatch(key: &QueryKey) -> Error {
    Error::Api(ApiError::Parse(format!(
        "cached value for {key:?} has the wrong type"
    )))
}
