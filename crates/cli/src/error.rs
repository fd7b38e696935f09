//! CLI error type.

use library_ai_client::{ConfigError, Route};
use thiserror::Error;

/// Errors that end a command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{}", .0.display_message())]
    Client(#[from] library_ai_client::Error),

    /// The route guard refused the command.
    #[error("{}", denied_message(.route, .redirect))]
    Denied { route: Route, redirect: Route },

    #[error("Book {0} is not in your library")]
    UnknownBook(library_ai_core::BookId),
}

impl From<library_ai_client::ApiError> for CliError {
    fn from(err: library_ai_client::ApiError) -> Self {
        Self::Client(err.into())
    }
}

impl From<library_ai_core::FormError> for CliError {
    fn from(err: library_ai_core::FormError) -> Self {
        Self::Client(err.into())
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn denied_message(route: &Route, redirect: &Route) -> String {
    match redirect {
        Route::Login => "Not logged in. Run `library-ai login` first.".to_string(),
        _ => format!("Access to {route} requires an admin account."),
    }
}
