//! Mutation → invalidation table.
//!
//! A successful mutation marks every cached entry of the listed families
//! stale. A failed mutation invalidates nothing.

use super::key::QueryFamily;

/// A write operation against the library service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mutation {
    CreateBook,
    UpdateBook,
    DeleteBook,
    AdminCreateUser,
    AdminSetUserRole,
    AdminDeleteUser,
    AdminDeleteBook,
}

const BOOK_WRITE: &[QueryFamily] = &[
    QueryFamily::Books,
    QueryFamily::AdminBooks,
    QueryFamily::AiInsights,
    QueryFamily::AiRecommendations,
];

const USER_WRITE: &[QueryFamily] = &[QueryFamily::AdminUsers];

// Deleting a user deletes their books too.
const USER_DELETE: &[QueryFamily] = &[
    QueryFamily::AdminUsers,
    QueryFamily::AdminBooks,
    QueryFamily::Books,
    QueryFamily::AiInsights,
    QueryFamily::AiRecommendations,
];

impl Mutation {
    /// Families whose cached entries become stale after this mutation succeeds.
    #[must_use]
    pub const fn invalidates(self) -> &'static [QueryFamily] {
        match self {
            Self::CreateBook | Self::UpdateBook | Self::DeleteBook | Self::AdminDeleteBook => {
                BOOK_WRITE
            }
            Self::AdminCreateUser | Self::AdminSetUserRole => USER_WRITE,
            Self::AdminDeleteUser => USER_DELETE,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::CreateBook => "create_book",
            Self::UpdateBook => "update_book",
            Self::DeleteBook => "delete_book",
            Self::AdminCreateUser => "admin_create_user",
            Self::AdminSetUserRole => "admin_set_user_role",
            Self::AdminDeleteUser => "admin_delete_user",
            Self::AdminDeleteBook => "admin_delete_book",
        }
    }
}

impl std::fmt::Display for Mutation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
