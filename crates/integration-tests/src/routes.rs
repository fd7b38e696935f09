//! HTTP handlers of the mock library service.
//!
//! Status codes and bodies follow the real service: validation failures are
//! 400 with `{errors}` or `{message}`, a missing or unknown token is 401 with
//! `{msg}`, and admin endpoints answer 403 to plain users.

use std::collections::{BTreeMap, HashMap};

use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
};
use library_ai_core::{Book, NewBook, Role, UserId, is_strong_password, top_genre};
use rust_decimal::prelude::ToPrimitive;
use serde_json::{Value, json};

use crate::backend::{MockState, StoredUser};

type Reply = Result<Response, Response>;

/// Build the application router, mounted under `/api`.
pub fn app(state: MockState) -> Router {
    let api = Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
        .route("/books/", get(list_books).post(create_book))
        .route("/books/{id}", put(update_book).delete(delete_book))
        .route("/admin/users", get(list_users).post(create_user))
        .route("/admin/users/{id}", patch(update_user).delete(delete_user))
        .route("/admin/books", get(list_all_books))
        .route("/admin/books/{id}", axum::routing::delete(admin_delete_book))
        .route("/ai/query", post(ai_query))
        .route("/ai/recommendations", get(recommendations))
        .route("/ai/insights", get(insights))
        .layer(middleware::from_fn_with_state(state.clone(), record))
        .with_state(state);

    Router::new().nest("/api", api)
}

/// Count the request, then apply any configured delay or failure.
async fn record(State(state): State<MockState>, request: Request, next: Next) -> Response {
    let route = format!("{} {}", request.method(), request.uri().path());
    let query = request
        .uri()
        .query()
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .into_owned()
                .collect()
        })
        .unwrap_or_default();

    let faults = state.record(&route, query);
    if let Some(delay) = faults.delay {
        tokio::time::sleep(delay).await;
    }
    if let Some((status, body)) = faults.failure {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (status, Json(body)).into_response();
    }
    next.run(request).await
}

// ============================================================================
// Helpers
// ============================================================================

fn message(status: StatusCode, text: &str) -> Response {
    (status, Json(json!({ "message": text }))).into_response()
}

fn field_errors(errors: &BTreeMap<&str, &str>) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "errors": errors }))).into_response()
}

fn text_field<'a>(body: &'a Value, field: &str) -> &'a str {
    body.get(field).and_then(Value::as_str).unwrap_or_default()
}

fn current_user(state: &MockState, headers: &HeaderMap) -> Result<StoredUser, Response> {
    let unauthorized =
        |msg: &str| (StatusCode::UNAUTHORIZED, Json(json!({ "msg": msg }))).into_response();

    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| unauthorized("Missing Authorization Header"))?;

    state
        .lock()
        .authenticate(token)
        .cloned()
        .ok_or_else(|| unauthorized("Token has expired"))
}

fn current_admin(state: &MockState, headers: &HeaderMap) -> Result<StoredUser, Response> {
    let user = current_user(state, headers)?;
    if user.user.role.is_admin() {
        Ok(user)
    } else {
        Err(message(StatusCode::FORBIDDEN, "Not authorized"))
    }
}

fn filtered<'a>(
    books: impl Iterator<Item = &'a Book>,
    params: &HashMap<String, String>,
) -> Vec<Book> {
    let genre = params.get("genre").filter(|g| !g.is_empty());
    let status = params.get("status").filter(|s| !s.is_empty());
    books
        .filter(|b| genre.is_none_or(|g| b.genre.as_deref() == Some(g.as_str())))
        .filter(|b| status.is_none_or(|s| b.reading_status.as_str() == s))
        .cloned()
        .collect()
}

fn parse_book(body: Value) -> Result<NewBook, Response> {
    if text_field(&body, "title").trim().is_empty() {
        return Err(message(StatusCode::BAD_REQUEST, "Title is required."));
    }
    serde_json::from_value(body).map_err(|e| message(StatusCode::BAD_REQUEST, &e.to_string()))
}

// ============================================================================
// Auth
// ============================================================================

async fn register(State(state): State<MockState>, Json(body): Json<Value>) -> Reply {
    let name = text_field(&body, "name").trim();
    let email = text_field(&body, "email").trim();
    let password = text_field(&body, "password");

    let mut errors = BTreeMap::new();
    if name.is_empty() {
        errors.insert("name", "Name is required.");
    }
    if email.is_empty() {
        errors.insert("email", "Email is required.");
    } else if !email.contains('@') {
        errors.insert("email", "Email is not valid.");
    }
    if password.is_empty() {
        errors.insert("password", "Password is required.");
    } else if !is_strong_password(password) {
        errors.insert("password", library_ai_core::PASSWORD_RULE);
    }
    if !errors.is_empty() {
        return Err(field_errors(&errors));
    }

    let mut backend = state.lock();
    if backend.user_by_email(email).is_some() {
        return Err(message(StatusCode::BAD_REQUEST, "Email already registered"));
    }
    backend.insert_user(name, email, password, Role::User);
    Ok((StatusCode::CREATED, Json(json!({ "message": "User created" }))).into_response())
}

async fn login(State(state): State<MockState>, Json(body): Json<Value>) -> Reply {
    let email = text_field(&body, "email");
    let password = text_field(&body, "password");

    let mut backend = state.lock();
    let identity = backend
        .user_by_email(email)
        .filter(|u| u.password == password)
        .map(StoredUser::identity)
        .ok_or_else(|| message(StatusCode::UNAUTHORIZED, "Invalid credentials"))?;
    let token = backend.issue_token(identity.id);

    Ok(Json(json!({ "access_token": token, "user": identity })).into_response())
}

async fn me(State(state): State<MockState>, headers: HeaderMap) -> Reply {
    let user = current_user(&state, &headers)?;
    Ok(Json(user.identity()).into_response())
}

// ============================================================================
// Books
// ============================================================================

async fn list_books(
    State(state): State<MockState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Reply {
    let user = current_user(&state, &headers)?;
    let backend = state.lock();
    let mine = backend
        .books
        .values()
        .filter(|b| b.user_id == user.user.id);
    Ok(Json(filtered(mine, &params)).into_response())
}

async fn create_book(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    let user = current_user(&state, &headers)?;
    let book = parse_book(body)?;
    let created = state.lock().insert_book(user.user.id, book);
    Ok((StatusCode::CREATED, Json(created)).into_response())
}

/// Fields of a book a `PUT` may change.
const EDITABLE: [&str; 6] = ["title", "author", "genre", "price", "pages", "reading_status"];

/// Apply the non-null fields of `patch` to `book`. Nulls leave a field as
/// it was, so a field can never be cleared through an update.
fn apply_patch(book: &Book, patch: &Value) -> Result<Book, Response> {
    let bad_request = |e: serde_json::Error| message(StatusCode::BAD_REQUEST, &e.to_string());

    let mut merged = serde_json::to_value(book).map_err(bad_request)?;
    if let (Value::Object(target), Value::Object(patch)) = (&mut merged, patch) {
        for field in EDITABLE {
            if let Some(value) = patch.get(field).filter(|v| !v.is_null()) {
                target.insert(field.to_string(), value.clone());
            }
        }
    }
    serde_json::from_value(merged).map_err(bad_request)
}

async fn update_book(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Reply {
    let user = current_user(&state, &headers)?;

    let mut backend = state.lock();
    let book = backend
        .books
        .get_mut(&id)
        .ok_or_else(|| message(StatusCode::BAD_REQUEST, "Book not found."))?;
    if book.user_id != user.user.id && !user.user.role.is_admin() {
        return Err(message(
            StatusCode::BAD_REQUEST,
            "Not authorized to edit this book.",
        ));
    }

    *book = apply_patch(book, &body)?;
    Ok(Json(book.clone()).into_response())
}

async fn delete_book(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Reply {
    let user = current_user(&state, &headers)?;

    let mut backend = state.lock();
    let owner = backend
        .books
        .get(&id)
        .map(|b| b.user_id)
        .ok_or_else(|| message(StatusCode::BAD_REQUEST, "Book not found."))?;
    if owner != user.user.id && !user.user.role.is_admin() {
        return Err(message(
            StatusCode::BAD_REQUEST,
            "Not authorized to delete this book.",
        ));
    }
    backend.books.remove(&id);
    Ok(message(StatusCode::OK, "Book deleted"))
}

// ============================================================================
// Admin
// ============================================================================

async fn list_users(State(state): State<MockState>, headers: HeaderMap) -> Reply {
    current_admin(&state, &headers)?;
    let users: Vec<_> = state
        .lock()
        .users
        .values()
        .map(|u| u.user.clone())
        .collect();
    Ok(Json(users).into_response())
}

async fn create_user(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    current_admin(&state, &headers)?;

    let name = text_field(&body, "name").trim();
    let email = text_field(&body, "email").trim();
    let password = text_field(&body, "password");
    if name.is_empty() || email.is_empty() || password.is_empty() {
        return Err(message(
            StatusCode::BAD_REQUEST,
            "Name, email, and password are required",
        ));
    }
    let role: Role = text_field(&body, "role")
        .parse()
        .map_err(|_| message(StatusCode::BAD_REQUEST, "Role must be 'user' or 'admin'"))?;

    let mut backend = state.lock();
    if backend.user_by_email(email).is_some() {
        return Err(message(StatusCode::BAD_REQUEST, "Email already registered"));
    }
    let id = backend.insert_user(name, email, password, role);
    let user = backend.users.get(&id.as_i64()).map(|u| u.user.clone());
    Ok((StatusCode::CREATED, Json(user)).into_response())
}

async fn update_user(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Reply {
    current_admin(&state, &headers)?;
    let role: Role = text_field(&body, "role")
        .parse()
        .map_err(|_| message(StatusCode::BAD_REQUEST, "Invalid role."))?;

    let mut backend = state.lock();
    let stored = backend
        .users
        .get_mut(&id)
        .ok_or_else(|| message(StatusCode::BAD_REQUEST, "User not found."))?;
    stored.user.role = role;
    Ok(Json(stored.user.clone()).into_response())
}

async fn delete_user(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Reply {
    let admin = current_admin(&state, &headers)?;
    if admin.user.id.as_i64() == id {
        return Err(message(
            StatusCode::BAD_REQUEST,
            "You cannot delete your own account.",
        ));
    }

    let mut backend = state.lock();
    if backend.users.remove(&id).is_none() {
        return Err(message(StatusCode::BAD_REQUEST, "User not found."));
    }
    let user_id = UserId::new(id);
    backend.books.retain(|_, b| b.user_id != user_id);
    backend.tokens.retain(|_, owner| *owner != user_id);
    Ok(message(StatusCode::OK, "User deleted"))
}

async fn list_all_books(
    State(state): State<MockState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Reply {
    current_admin(&state, &headers)?;
    let backend = state.lock();
    Ok(Json(filtered(backend.books.values(), &params)).into_response())
}

async fn admin_delete_book(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Reply {
    current_admin(&state, &headers)?;
    if state.lock().books.remove(&id).is_none() {
        return Err(message(StatusCode::BAD_REQUEST, "Book not found."));
    }
    Ok(message(StatusCode::OK, "Book deleted"))
}

// ============================================================================
// AI
// ============================================================================

fn genre_counts<'a>(books: impl Iterator<Item = &'a Book>) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    for genre in books.filter_map(|b| b.genre.as_deref()) {
        *counts.entry(genre.to_string()).or_default() += 1;
    }
    counts
}

async fn ai_query(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    current_user(&state, &headers)?;
    if text_field(&body, "question").trim().is_empty() {
        return Err(message(StatusCode::BAD_REQUEST, "Question is required."));
    }

    let backend = state.lock();
    if let Some(answer) = &backend.ai_answer {
        return Ok(Json(answer.clone()).into_response());
    }

    let mut counts: BTreeMap<UserId, u64> = BTreeMap::new();
    for book in backend.books.values() {
        *counts.entry(book.user_id).or_default() += 1;
    }
    let top = counts
        .iter()
        .max_by_key(|(id, count)| (**count, std::cmp::Reverse(**id)))
        .and_then(|(id, count)| backend.users.get(&id.as_i64()).map(|u| (u, *count)));

    let answer = match top {
        Some((owner, book_count)) => json!({
            "type": "owner_with_most_books",
            "user": { "id": owner.user.id, "name": owner.user.name, "email": owner.user.email },
            "book_count": book_count,
            "scope": "all_users",
        }),
        None => json!({
            "type": "unsupported",
            "message": "There are no books in the library yet.",
        }),
    };
    Ok(Json(answer).into_response())
}

async fn recommendations(State(state): State<MockState>, headers: HeaderMap) -> Reply {
    let user = current_user(&state, &headers)?;
    let backend = state.lock();

    let mine: Vec<&Book> = backend
        .books
        .values()
        .filter(|b| b.user_id == user.user.id)
        .collect();
    let counts = genre_counts(mine.iter().copied());
    let Some((genre, _)) = top_genre(&counts) else {
        return Ok(Json(json!({
            "message": "Add some books with a genre to get recommendations."
        }))
        .into_response());
    };

    let books: Vec<Value> = backend
        .books
        .values()
        .filter(|b| b.user_id != user.user.id && b.genre.as_deref() == Some(genre))
        .filter(|b| !mine.iter().any(|m| m.title == b.title))
        .map(|b| {
            json!({
                "id": b.id,
                "title": b.title,
                "author": b.author,
                "genre": b.genre,
                "price": b.price.and_then(|p| p.to_f64()),
            })
        })
        .collect();

    Ok(Json(json!({
        "based_on_genre": genre,
        "strategy": "genre_match",
        "reason": format!("You read a lot of {genre}."),
        "books": books,
    }))
    .into_response())
}

async fn insights(State(state): State<MockState>, headers: HeaderMap) -> Reply {
    let user = current_user(&state, &headers)?;
    let backend = state.lock();

    let mine: Vec<&Book> = backend
        .books
        .values()
        .filter(|b| b.user_id == user.user.id)
        .collect();
    if mine.is_empty() {
        return Ok(Json(json!({ "total_books": 0 })).into_response());
    }

    let pages: Vec<i64> = mine.iter().filter_map(|b| b.pages).map(i64::from).collect();
    let mut statuses: BTreeMap<String, u64> = BTreeMap::new();
    for book in &mine {
        *statuses
            .entry(book.reading_status.to_string())
            .or_default() += 1;
    }
    let overall = genre_counts(backend.books.values());

    let total_pages: i64 = pages.iter().sum();
    #[allow(clippy::cast_precision_loss)]
    let average_pages = (!pages.is_empty()).then(|| total_pages as f64 / pages.len() as f64);

    Ok(Json(json!({
        "total_books": mine.len(),
        "total_pages": total_pages,
        "average_pages": average_pages,
        "min_pages": pages.iter().min(),
        "max_pages": pages.iter().max(),
        "user_genre_distribution": genre_counts(mine.iter().copied()),
        "status_distribution": statuses,
        "most_popular_genre_overall": top_genre(&overall).map(|(g, _)| g),
    }))
    .into_response())
}
