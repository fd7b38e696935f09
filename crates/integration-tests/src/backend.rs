//! In-memory data and fault-injection state for the mock service.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use library_ai_core::{Book, BookId, Identity, NewBook, Role, User, UserId};
use serde_json::Value;

#[derive(Debug, Clone)]
pub(crate) struct StoredUser {
    pub user: User,
    pub password: String,
}

impl StoredUser {
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.user.id,
            name: self.user.name.clone(),
            email: self.user.email.clone(),
            role: self.user.role,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Backend {
    pub users: BTreeMap<i64, StoredUser>,
    pub books: BTreeMap<i64, Book>,
    pub tokens: HashMap<String, UserId>,
    next_user: i64,
    next_book: i64,
    next_token: u64,

    hits: HashMap<String, usize>,
    queries: HashMap<String, Vec<(String, String)>>,
    delays: HashMap<String, Duration>,
    failures: HashMap<String, (u16, Value)>,
    pub ai_answer: Option<Value>,
}

impl Backend {
    pub fn insert_user(&mut self, name: &str, email: &str, password: &str, role: Role) -> UserId {
        self.next_user += 1;
        let id = UserId::new(self.next_user);
        self.users.insert(
            self.next_user,
            StoredUser {
                user: User {
                    id,
                    name: name.to_string(),
                    email: email.trim().to_lowercase(),
                    role,
                    created_at: None,
                },
                password: password.to_string(),
            },
        );
        id
    }

    pub fn insert_book(&mut self, owner: UserId, book: NewBook) -> Book {
        self.next_book += 1;
        let stored = Book {
            id: BookId::new(self.next_book),
            title: book.title,
            author: book.author,
            genre: book.genre,
            price: book.price,
            pages: book.pages,
            reading_status: book.reading_status,
            user_id: owner,
            created_at: None,
        };
        self.books.insert(self.next_book, stored.clone());
        stored
    }

    pub fn user_by_email(&self, email: &str) -> Option<&StoredUser> {
        let email = email.trim().to_lowercase();
        self.users.values().find(|u| u.user.email == email)
    }

    pub fn issue_token(&mut self, user: UserId) -> String {
        self.next_token += 1;
        let token = format!("token-{}-{}", user, self.next_token);
        self.tokens.insert(token.clone(), user);
        token
    }

    pub fn authenticate(&self, token: &str) -> Option<&StoredUser> {
        let id = self.tokens.get(token)?;
        self.users.get(&id.as_i64())
    }
}

/// Shared handle to the mock service state.
#[derive(Debug, Clone, Default)]
pub struct MockState {
    inner: Arc<Mutex<Backend>>,
}

/// Faults to apply to one request.
pub(crate) struct Faults {
    pub delay: Option<Duration>,
    pub failure: Option<(u16, Value)>,
}

impl MockState {
    pub(crate) fn lock(&self) -> MutexGuard<'_, Backend> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_user(&self, name: &str, email: &str, password: &str, role: Role) -> UserId {
        self.lock().insert_user(name, email, password, role)
    }

    pub fn add_book(&self, owner: UserId, book: NewBook) -> BookId {
        self.lock().insert_book(owner, book).id
    }

    #[must_use]
    pub fn books(&self) -> Vec<Book> {
        self.lock().books.values().cloned().collect()
    }

    /// Count a request and return the faults configured for it.
    pub(crate) fn record(&self, route: &str, query: Vec<(String, String)>) -> Faults {
        let mut backend = self.lock();
        *backend.hits.entry(route.to_string()).or_default() += 1;
        backend.queries.insert(route.to_string(), query);
        Faults {
            delay: backend.delays.get(route).copied(),
            failure: backend.failures.get(route).cloned(),
        }
    }

    #[must_use]
    pub fn hits(&self, route: &str) -> usize {
        self.lock().hits.get(route).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn total_hits(&self) -> usize {
        self.lock().hits.values().sum()
    }

    #[must_use]
    pub fn last_query(&self, route: &str) -> Option<Vec<(String, String)>> {
        self.lock().queries.get(route).cloned()
    }

    pub fn set_delay(&self, route: &str, delay: Duration) {
        self.lock().delays.insert(route.to_string(), delay);
    }

    pub fn set_failure(&self, route: &str, status: u16, body: Value) {
        self.lock()
            .failures
            .insert(route.to_string(), (status, body));
    }

    pub fn clear_faults(&self) {
        let mut backend = self.lock();
        backend.delays.clear();
        backend.failures.clear();
    }

    pub fn revoke_tokens(&self) {
        self.lock().tokens.clear();
    }

    pub fn set_ai_answer(&self, answer: Value) {
        self.lock().ai_answer = Some(answer);
    }
}
