//! Resource clients.
//!
//! One stateless client per resource family. Each operation builds exactly
//! one [`ApiRequest`](crate::http::ApiRequest) and returns the pipeline's
//! result unchanged.

pub mod admin;
pub mod ai;
pub mod auth;
pub mod books;

pub use admin::AdminApi;
pub use ai::AiApi;
pub use auth::{AuthApi, LoginResponse};
pub use books::BooksApi;
