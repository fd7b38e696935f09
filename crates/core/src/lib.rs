//! Library AI Core - Shared domain types.
//!
//! This crate provides the types exchanged between the Library AI client and
//! the library HTTP service:
//! - `library-ai-client` - Request pipeline, session store and query cache
//! - `library-ai-cli` - Command-line front end
//!
//! # Architecture
//!
//! The core crate contains only types, validation and parsing - no I/O, no
//! HTTP clients, no async runtime. This keeps it usable from any front end.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, credentials, books, users, AI results and forms

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
