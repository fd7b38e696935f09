//! Result shapes of the AI endpoints.
//!
//! `POST /ai/query` answers with one of several JSON objects discriminated by
//! a `type` field. Known shapes decode into typed variants of [`AiAnswer`];
//! anything else is kept verbatim in [`AiAnswer::Other`] so newer server
//! answers still reach the caller.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use super::id::{BookId, UserId};

/// Which data an answer was computed over.
///
/// Admins get library-wide answers; users only see their own books.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    AllUsers,
    AllBooks,
    YourBooks,
    #[serde(other)]
    Unknown,
}

/// Account summary inside an `owner_with_most_books` answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerSummary {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

/// Sample metadata for the most popular title.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookExample {
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
}

/// A book in a price ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedBook {
    pub id: BookId,
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub price: Option<Decimal>,
    pub owner_id: UserId,
}

/// Answer to a natural-language question.
#[derive(Debug, Clone, PartialEq)]
pub enum AiAnswer {
    /// `type: "owner_with_most_books"`
    OwnerWithMostBooks {
        user: OwnerSummary,
        book_count: u64,
        scope: Scope,
    },
    /// `type: "most_popular_book"`
    MostPopularBook {
        title: String,
        count: u64,
        example: Option<BookExample>,
        scope: Scope,
    },
    /// `type: "five_most_expensive_books"`
    FiveMostExpensiveBooks { books: Vec<PricedBook>, scope: Scope },
    /// Any other payload, kept as returned.
    Other(serde_json::Value),
}

#[derive(Deserialize)]
struct OwnerWithMostBooksBody {
    user: OwnerSummary,
    book_count: u64,
    scope: Scope,
}

#[derive(Deserialize)]
struct MostPopularBookBody {
    title: String,
    count: u64,
    #[serde(default)]
    example: Option<BookExample>,
    scope: Scope,
}

#[derive(Deserialize)]
struct FiveMostExpensiveBooksBody {
    books: Vec<PricedBook>,
    scope: Scope,
}

impl AiAnswer {
    /// Decode an answer from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error when `type` names a known shape but the body does not
    /// match it. Unknown or missing `type` values never fail.
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        let kind = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default();

        match kind {
            "owner_with_most_books" => {
                let body: OwnerWithMostBooksBody = serde_json::from_value(value)?;
                Ok(Self::OwnerWithMostBooks {
                    user: body.user,
                    book_count: body.book_count,
                    scope: body.scope,
                })
            }
            "most_popular_book" => {
                let body: MostPopularBookBody = serde_json::from_value(value)?;
                Ok(Self::MostPopularBook {
                    title: body.title,
                    count: body.count,
                    example: body.example,
                    scope: body.scope,
                })
            }
            "five_most_expensive_books" => {
                let body: FiveMostExpensiveBooksBody = serde_json::from_value(value)?;
                Ok(Self::FiveMostExpensiveBooks {
                    books: body.books,
                    scope: body.scope,
                })
            }
            _ => Ok(Self::Other(value)),
        }
    }

    /// Scope of a typed answer.
    #[must_use]
    pub const fn scope(&self) -> Option<Scope> {
        match self {
            Self::OwnerWithMostBooks { scope, .. }
            | Self::MostPopularBook { scope, .. }
            | Self::FiveMostExpensiveBooks { scope, .. } => Some(*scope),
            Self::Other(_) => None,
        }
    }
}

impl<'de> Deserialize<'de> for AiAnswer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Recommendations
// =============================================================================

/// A recommended book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendedBook {
    pub id: BookId,
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub price: Option<Decimal>,
}

/// Genre-based suggestions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationSet {
    pub based_on_genre: String,
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub books: Vec<RecommendedBook>,
}

/// Response of `GET /ai/recommendations`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Recommendations {
    Suggested(RecommendationSet),
    /// Not enough library data yet.
    Insufficient { message: String },
}

impl Recommendations {
    /// Recommended books, empty when there is not enough data.
    #[must_use]
    pub fn books(&self) -> &[RecommendedBook] {
        match self {
            Self::Suggested(set) => &set.books,
            Self::Insufficient { .. } => &[],
        }
    }
}

// =============================================================================
// Insights
// =============================================================================

/// Response of `GET /ai/insights`. Every statistic is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Insights {
    #[serde(default)]
    pub total_books: Option<u64>,
    #[serde(default)]
    pub average_pages: Option<f64>,
    #[serde(default)]
    pub total_pages: Option<i64>,
    #[serde(default)]
    pub average_price: Option<f64>,
    #[serde(default)]
    pub favorite_genre: Option<String>,
    #[serde(default)]
    pub user_genre_distribution: Option<BTreeMap<String, u64>>,
    #[serde(default)]
    pub status_distribution: Option<BTreeMap<String, u64>>,
    #[serde(default)]
    pub min_pages: Option<i64>,
    #[serde(default)]
    pub max_pages: Option<i64>,
    #[serde(default)]
    pub most_popular_genre_overall: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

impl Insights {
    /// The favorite genre, falling back to the top of the genre distribution
    /// when the server did not name one.
    #[must_use]
    pub fn favorite_genre_resolved(&self) -> Option<&str> {
        self.favorite_genre.as_deref().or_else(|| {
            self.user_genre_distribution
                .as_ref()
                .and_then(top_genre)
                .map(|(genre, _)| genre)
        })
    }

    /// Page range as `(min, max)` when both ends are known.
    #[must_use]
    pub const fn page_range(&self) -> Option<(i64, i64)> {
        match (self.min_pages, self.max_pages) {
            (Some(min), Some(max)) => Some((min, max)),
            _ => None,
        }
    }
}

/// Genre with the highest count.
///
/// Ties go to the lexicographically smallest genre name, so the answer does
/// not depend on map iteration order.
#[must_use]
pub fn top_genre(distribution: &BTreeMap<String, u64>) -> Option<(&str, u64)> {
    distribution
        .iter()
        .fold(None, |best: Option<(&str, u64)>, (genre, &count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((genre.as_str(), count)),
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_owner_with_most_books() {
        let answer: AiAnswer = serde_json::from_value(json!({
            "type": "owner_with_most_books",
            "user": {"id": 2, "name": "Ada", "email": "ada@example.com"},
            "book_count": 9,
            "scope": "all_users"
        }))
        .unwrap();
        match answer {
            AiAnswer::OwnerWithMostBooks {
                user,
                book_count,
                scope,
            } => {
                assert_eq!(user.name, "Ada");
                assert_eq!(book_count, 9);
                assert_eq!(scope, Scope::AllUsers);
            }
            other => panic!("unexpected answer: {other:?}"),
        }
    }

    #[test]
    fn test_most_popular_book_without_example() {
        let answer: AiAnswer = serde_json::from_value(json!({
            "type": "most_popular_book",
            "title": "Dune",
            "count": 3,
            "scope": "your_books"
        }))
        .unwrap();
        assert_eq!(
            answer,
            AiAnswer::MostPopularBook {
                title: "Dune".to_string(),
                count: 3,
                example: None,
                scope: Scope::YourBooks,
            }
        );
    }

    #[test]
    fn test_five_most_expensive_books() {
        let answer: AiAnswer = serde_json::from_value(json!({
            "type": "five_most_expensive_books",
            "books": [
                {"id": 1, "title": "A", "author": null, "genre": null, "price": 40.0, "owner_id": 1},
                {"id": 2, "title": "B", "price": 12.5, "owner_id": 3}
            ],
            "scope": "all_books"
        }))
        .unwrap();
        let AiAnswer::FiveMostExpensiveBooks { books, scope } = answer else {
            panic!("wrong variant");
        };
        assert_eq!(books.len(), 2);
        assert_eq!(books[1].price, Some(Decimal::new(125, 1)));
        assert_eq!(scope, Scope::AllBooks);
    }

    #[test]
    fn test_unknown_type_is_kept() {
        let payload = json!({"type": "reading_streak", "days": 12});
        let answer: AiAnswer = serde_json::from_value(payload.clone()).unwrap();
        assert_eq!(answer, AiAnswer::Other(payload));
        assert_eq!(answer.scope(), None);
    }

    #[test]
    fn test_untyped_payload_is_kept() {
        let payload = json!({"answer": 42});
        let answer: AiAnswer = serde_json::from_value(payload.clone()).unwrap();
        assert_eq!(answer, AiAnswer::Other(payload));
    }

    #[test]
    fn test_known_type_with_bad_body_fails() {
        let result: Result<AiAnswer, _> =
            serde_json::from_value(json!({"type": "most_popular_book", "count": "many"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_scope_is_tolerated() {
        let answer: AiAnswer = serde_json::from_value(json!({
            "type": "five_most_expensive_books",
            "books": [],
            "scope": "team_books"
        }))
        .unwrap();
        assert_eq!(answer.scope(), Some(Scope::Unknown));
    }

    #[test]
    fn test_recommendations_shapes() {
        let suggested: Recommendations = serde_json::from_value(json!({
            "type": "recommendations",
            "based_on_genre": "Fantasy",
            "strategy": "user_preference",
            "reason": "Based on your preference for Fantasy genre",
            "books": [{"id": 5, "title": "Mistborn", "author": "Sanderson", "genre": "Fantasy", "price": null}]
        }))
        .unwrap();
        assert_eq!(suggested.books().len(), 1);
        assert!(matches!(suggested, Recommendations::Suggested(ref s) if s.based_on_genre == "Fantasy"));

        let insufficient: Recommendations = serde_json::from_value(json!({
            "type": "recommendations",
            "message": "No books in the library yet.",
            "books": []
        }))
        .unwrap();
        assert!(insufficient.books().is_empty());
        assert!(matches!(insufficient, Recommendations::Insufficient { .. }));
    }

    #[test]
    fn test_insights_all_fields_optional() {
        let insights: Insights = serde_json::from_value(json!({"type": "insights"})).unwrap();
        assert_eq!(insights, Insights::default());
        assert!(insights.page_range().is_none());
    }

    #[test]
    fn test_insights_full() {
        let insights: Insights = serde_json::from_value(json!({
            "total_books": 3,
            "average_pages": 305.5,
            "total_pages": 611,
            "average_price": 14.0,
            "favorite_genre": null,
            "user_genre_distribution": {"Sci-Fi": 2, "Fantasy": 2, "Poetry": 1},
            "status_distribution": {"reading": 1, "completed": 2},
            "min_pages": 199,
            "max_pages": 412,
            "most_popular_genre_overall": "Sci-Fi",
            "summary": "You have 3 books in your library."
        }))
        .unwrap();
        assert_eq!(insights.page_range(), Some((199, 412)));
        assert_eq!(insights.favorite_genre_resolved(), Some("Fantasy"));
    }

    #[test]
    fn test_insights_accept_negative_page_counts() {
        let insights: Insights = serde_json::from_value(json!({
            "total_books": 2,
            "total_pages": 295,
            "min_pages": -5,
            "max_pages": 300
        }))
        .unwrap();
        assert_eq!(insights.total_pages, Some(295));
        assert_eq!(insights.page_range(), Some((-5, 300)));
    }

    #[test]
    fn test_top_genre_tie_break_is_lexicographic() {
        let mut dist = BTreeMap::new();
        dist.insert("Sci-Fi".to_string(), 4);
        dist.insert("Drama".to_string(), 4);
        dist.insert("Poetry".to_string(), 1);
        assert_eq!(top_genre(&dist), Some(("Drama", 4)));

        dist.insert("Western".to_string(), 5);
        assert_eq!(top_genre(&dist), Some(("Western", 5)));
        assert_eq!(top_genre(&BTreeMap::new()), None);
    }

    #[test]
    fn test_server_favorite_genre_wins() {
        let mut dist = BTreeMap::new();
        dist.insert("Drama".to_string(), 1);
        let insights = Insights {
            favorite_genre: Some("Poetry".to_string()),
            user_genre_distribution: Some(dist),
            ..Insights::default()
        };
        assert_eq!(insights.favorite_genre_resolved(), Some("Poetry"));
    }
}
