//! Core types for Library AI.
//!
//! This module provides type-safe wrappers for the library's domain concepts.

pub mod ai;
pub mod book;
pub mod credential;
pub mod email;
pub mod form;
pub mod id;
pub mod status;
pub mod user;

pub use ai::*;
pub use book::{Book, BookFilter, BookForm, NewBook};
pub use credential::{CREDENTIAL_STORAGE_KEY, Credential};
pub use email::{Email, EmailError};
pub use form::{
    FieldErrors, FormError, LoginCredentials, LoginForm, PASSWORD_RULE, RegisterForm, Registration,
    is_strong_password,
};
pub use id::*;
pub use status::*;
pub use user::{Identity, NewUser, User};
