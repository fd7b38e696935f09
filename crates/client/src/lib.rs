//! Library AI client.
//!
//! Data-access and session layer for the Library AI book service:
//!
//! - [`session`] - bearer credential and authenticated identity
//! - [`http`] - the single outbound request pipeline
//! - [`api`] - one stateless client per resource family
//! - [`query`] - keyed result cache with fetch coalescing and invalidation
//! - [`guard`] - route-level authorization gating
//! - [`client`] - the [`LibraryClient`] facade that wires them together
//!
//! # Example
//!
//! ```rust,ignore
//! use library_ai_client::{ClientConfig, LibraryClient};
//! use library_ai_core::{BookFilter, LoginForm};
//!
//! let client = LibraryClient::from_config(&ClientConfig::from_env()?)?;
//! client.restore().await;
//! client.login(&LoginForm { email, password }).await?;
//! let books = client.books(BookFilter::default()).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod guard;
pub mod http;
pub mod query;
pub mod session;

pub use client::LibraryClient;
pub use config::{ClientConfig, ConfigError};
pub use error::{ApiError, Error, ErrorPayload};
pub use guard::{Access, GuardDecision, Route, guard};
pub use http::{ApiClient, ApiRequest};
pub use query::{
    CacheValue, Mutation, QueryCache, QueryFamily, QueryKey, QueryObserver, QuerySnapshot,
    QueryStatus,
};
pub use session::{
    CredentialStore, FileCredentialStore, MemoryCredentialStore, SessionState, SessionStore,
};
