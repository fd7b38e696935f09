//! Integration tests for Library AI.
//!
//! The tests drive the real [`LibraryClient`] over HTTP against
//! [`MockLibrary`], an in-memory stand-in for the library service served by
//! axum on an ephemeral port.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p library-ai-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `session` - Login, restore, logout and 401 expiry
//! - `books` - Filters, coalescing and invalidation of "my books"
//! - `admin` - Route guard and admin mutations
//! - `ai` - AI answers, recommendations and insights
//! - `errors` - Status mapping and failed reads/mutations

#![cfg_attr(not(test), forbid(unsafe_code))]

mod backend;
mod routes;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use library_ai_client::{CredentialStore, LibraryClient, MemoryCredentialStore};
use library_ai_core::{Book, BookId, NewBook, Role, UserId};
use serde_json::Value;
use tokio::task::JoinHandle;

pub use backend::MockState;

/// Password used for every seeded account.
pub const PASSWORD: &str = "Secret#123";

/// A running mock library service.
pub struct MockLibrary {
    addr: SocketAddr,
    state: MockState,
    handle: JoinHandle<()>,
}

impl MockLibrary {
    /// Start the service on `127.0.0.1` with an ephemeral port.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn start() -> Self {
        let state = MockState::default();
        let app = routes::app(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock listener");
        let addr = listener.local_addr().expect("Failed to read local address");

        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    /// Base URL of the API, including the `/api` prefix.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    #[must_use]
    pub const fn state(&self) -> &MockState {
        &self.state
    }

    /// A client with fresh in-memory credential storage.
    #[must_use]
    pub fn client(&self) -> LibraryClient {
        self.client_with(Arc::new(MemoryCredentialStore::new()))
    }

    /// A client over the given credential storage.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn client_with(&self, storage: Arc<dyn CredentialStore>) -> LibraryClient {
        LibraryClient::new(&self.base_url(), Duration::from_secs(5), storage)
            .expect("Failed to build client")
    }

    // =========================================================================
    // Seeding
    // =========================================================================

    /// Seed an account with [`PASSWORD`].
    pub fn user(&self, name: &str, email: &str, role: Role) -> UserId {
        self.state.add_user(name, email, PASSWORD, role)
    }

    /// Seed a book owned by `owner`.
    pub fn book(&self, owner: UserId, book: NewBook) -> BookId {
        self.state.add_book(owner, book)
    }

    /// Seed a titled book with a genre and status.
    pub fn titled(
        &self,
        owner: UserId,
        title: &str,
        genre: &str,
        status: library_ai_core::ReadingStatus,
    ) -> BookId {
        self.book(
            owner,
            NewBook {
                genre: Some(genre.to_string()),
                reading_status: status,
                ..NewBook::titled(title)
            },
        )
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Number of requests for `route`, written as `"GET /books/"`.
    #[must_use]
    pub fn hits(&self, route: &str) -> usize {
        self.state.hits(route)
    }

    /// Total number of requests served.
    #[must_use]
    pub fn total_hits(&self) -> usize {
        self.state.total_hits()
    }

    /// Query parameters of the last request for `route`.
    #[must_use]
    pub fn last_query(&self, route: &str) -> Option<Vec<(String, String)>> {
        self.state.last_query(route)
    }

    /// Books currently stored, in id order.
    #[must_use]
    pub fn stored_books(&self) -> Vec<Book> {
        self.state.books()
    }

    // =========================================================================
    // Fault injection
    // =========================================================================

    /// Delay every response for `route`.
    pub fn delay(&self, route: &str, delay: Duration) {
        self.state.set_delay(route, delay);
    }

    /// Answer every request for `route` with `status` and `body`.
    pub fn fail(&self, route: &str, status: u16, body: Value) {
        self.state.set_failure(route, status, body);
    }

    /// Stop injecting failures and delays.
    pub fn heal(&self) {
        self.state.clear_faults();
    }

    /// Invalidate every issued token, as if they had all expired.
    pub fn expire_tokens(&self) {
        self.state.revoke_tokens();
    }

    /// Answer `POST /ai/query` with `answer` instead of the computed result.
    pub fn ai_answer(&self, answer: Value) {
        self.state.set_ai_answer(answer);
    }
}

impl Drop for MockLibrary {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
