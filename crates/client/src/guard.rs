//! Route-level authorization.
//!
//! [`guard`] decides whether a route may render given the current
//! [`SessionState`]. It is a pure function of its inputs: no I/O, no
//! network calls.

use std::str::FromStr;

use crate::session::SessionState;

/// Who may see a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Access {
    Public,
    Authenticated,
    Admin,
}

/// Application routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// `/`, always redirects to the book list.
    Root,
    Login,
    Register,
    Books,
    Ai,
    Admin,
    AdminBooks,
    AdminUsers,
}

impl Route {
    pub const ALL: [Self; 8] = [
        Self::Root,
        Self::Login,
        Self::Register,
        Self::Books,
        Self::Ai,
        Self::Admin,
        Self::AdminBooks,
        Self::AdminUsers,
    ];

    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Root => "/",
            Self::Login => "/login",
            Self::Register => "/register",
            Self::Books => "/books",
            Self::Ai => "/ai",
            Self::Admin => "/admin",
            Self::AdminBooks => "/admin/books",
            Self::AdminUsers => "/admin/users",
        }
    }

    #[must_use]
    pub const fn access(self) -> Access {
        match self {
            Self::Root | Self::Login | Self::Register => Access::Public,
            Self::Books | Self::Ai => Access::Authenticated,
            Self::Admin | Self::AdminBooks | Self::AdminUsers => Access::Admin,
        }
    }

    /// Parse a path. Unknown paths resolve to [`Route::Books`], where the
    /// guard applies its usual rules.
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');
        let normalized = if trimmed.is_empty() { "/" } else { trimmed };
        Self::ALL
            .into_iter()
            .find(|route| route.path() == normalized)
            .unwrap_or(Self::Books)
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for Route {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_path(s))
    }
}

/// Result of guarding a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session state is not known yet; show a loading state.
    Pending,
    Redirect(Route),
    Render(Route),
}

/// Decide what to show for `route` in `session`.
///
/// - `/` always redirects to `/books`.
/// - Public routes render in every state.
/// - Protected routes wait while the session is restoring, redirect to
///   `/login` when anonymous, and redirect to `/books` when the role is
///   insufficient.
#[must_use]
pub fn guard(route: Route, session: &SessionState) -> GuardDecision {
    if route == Route::Root {
        return GuardDecision::Redirect(Route::Books);
    }

    match (route.access(), session) {
        (Access::Public, _) => GuardDecision::Render(route),
        (_, SessionState::Restoring) => GuardDecision::Pending,
        (_, SessionState::Anonymous) => GuardDecision::Redirect(Route::Login),
        (Access::Admin, SessionState::Authenticated(identity)) if !identity.is_admin() => {
            GuardDecision::Redirect(Route::Books)
        }
        (_, SessionState::Authenticated(_)) => GuardDecision::Render(route),
    }
}
