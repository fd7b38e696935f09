//! Cache keys and cached values.

use library_ai_core::{Book, BookFilter, Insights, Recommendations, User};

/// A resource family, the unit of invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryFamily {
    Books,
    AdminUsers,
    AdminBooks,
    AiRecommendations,
    AiInsights,
}

/// Cache key: a resource family plus its filter parameters.
///
/// Equal keys address the same entry. [`BookFilter`] normalizes its values,
/// so two keys are equal exactly when they would send the same request.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum QueryKey {
    /// The caller's own books.
    Books(BookFilter),
    AdminUsers,
    /// Every book in the library.
    AdminBooks(BookFilter),
    AiRecommendations,
    AiInsights,
}

impl QueryKey {
    #[must_use]
    pub const fn family(&self) -> QueryFamily {
        match self {
            Self::Books(_) => QueryFamily::Books,
            Self::AdminUsers => QueryFamily::AdminUsers,
            Self::AdminBooks(_) => QueryFamily::AdminBooks,
            Self::AiRecommendations => QueryFamily::AiRecommendations,
            Self::AiInsights => QueryFamily::AiInsights,
        }
    }
}

/// Cached value types.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheValue {
    Books(Vec<Book>),
    Users(Vec<User>),
    Recommendations(Box<Recommendations>),
    Insights(Box<Insights>),
}

impl CacheValue {
    #[must_use]
    pub fn into_books(self) -> Option<Vec<Book>> {
        match self {
            Self::Books(books) => Some(books),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_users(self) -> Option<Vec<User>> {
        match self {
            Self::Users(users) => Some(users),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_recommendations(self) -> Option<Recommendations> {
        match self {
            Self::Recommendations(r) => Some(*r),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_insights(self) -> Option<Insights> {
        match self {
            Self::Insights(i) => Some(*i),
            _ => None,
        }
    }

    /// Books in the value, if it holds books.
    #[must_use]
    pub fn books(&self) -> Option<&[Book]> {
        match self {
            Self::Books(books) => Some(books),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use library_ai_core::ReadingStatus;
    use std::collections::HashSet;

    #[test]
    fn test_filters_produce_distinct_keys() {
        let reading = BookFilter::default().with_status(ReadingStatus::Reading);
        let reading_fiction = reading.clone().with_genre("Fiction");

        let keys: HashSet<QueryKey> = [
            QueryKey::Books(BookFilter::default()),
            QueryKey::Books(reading.clone()),
            QueryKey::Books(reading_fiction.clone()),
            QueryKey::AdminBooks(reading),
            QueryKey::AdminBooks(reading_fiction),
        ]
        .into_iter()
        .collect();
        assert_eq!(keys.len(), 5);
    }

    #[test]
    fn test_blank_genre_is_same_key_as_no_genre() {
        assert_eq!(
            QueryKey::Books(BookFilter::new(Some(" "), None)),
            QueryKey::Books(BookFilter::default())
        );
    }

    #[test]
    fn test_family() {
        assert_eq!(
            QueryKey::AdminBooks(BookFilter::default()).family(),
            QueryFamily::AdminBooks
        );
        assert_eq!(QueryKey::AiInsights.family(), QueryFamily::AiInsights);
    }
}
