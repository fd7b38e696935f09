//! Command implementations.
//!
//! Each command names the route it belongs to and is checked against the
//! route guard before any request goes out.

pub mod admin;
pub mod ai;
pub mod auth;
pub mod books;

use library_ai_client::{GuardDecision, LibraryClient, Route};

use crate::error::CliError;

/// Fail unless the current session may open `route`.
pub fn require(client: &LibraryClient, route: Route) -> Result<(), CliError> {
    match client.authorize(route) {
        GuardDecision::Render(_) => Ok(()),
        GuardDecision::Redirect(redirect) => Err(CliError::Denied { route, redirect }),
        // Restore has finished before commands run; treat an unknown session as anonymous.
        GuardDecision::Pending => Err(CliError::Denied {
            route,
            redirect: Route::Login,
        }),
    }
}

/// Write command output to stdout.
#[allow(clippy::print_stdout)]
pub fn emit(text: &str) {
    if text.ends_with('\n') {
        print!("{text}");
    } else {
        println!("{text}");
    }
}
