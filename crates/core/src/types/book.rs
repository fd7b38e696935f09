//! Book records, filters and the book form.

use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::form::{FieldErrors, FormError};
use super::id::{BookId, UserId};
use super::status::ReadingStatus;

/// A book as returned by the library service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    /// Price travels as a JSON number.
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub pages: Option<i32>,
    #[serde(default)]
    pub reading_status: ReadingStatus,
    /// Owner of the book.
    pub user_id: UserId,
    /// Only present on admin listings.
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
}

impl Book {
    /// Distinct, sorted genres across `books`, for populating a genre filter.
    #[must_use]
    pub fn distinct_genres(books: &[Self]) -> Vec<String> {
        books
            .iter()
            .filter_map(|b| b.genre.as_deref())
            .filter(|g| !g.trim().is_empty())
            .map(ToString::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Payload for creating or replacing a book (`POST /books/`, `PUT /books/:id`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub author: Option<String>,
    pub genre: Option<String>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub price: Option<Decimal>,
    pub pages: Option<i32>,
    pub reading_status: ReadingStatus,
}

impl NewBook {
    /// A book with only a title, in the `planned` state.
    #[must_use]
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: None,
            genre: None,
            price: None,
            pages: None,
            reading_status: ReadingStatus::Planned,
        }
    }
}

// =============================================================================
// BookFilter
// =============================================================================

/// Server-side filter for book listings (`?genre=&status=`).
///
/// Values are normalized on construction: genres are trimmed and a blank
/// genre means "no filter". Two filters compare equal exactly when they
/// produce the same query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BookFilter {
    genre: Option<String>,
    status: Option<ReadingStatus>,
}

impl BookFilter {
    /// Build a filter from optional genre and status.
    #[must_use]
    pub fn new(genre: Option<&str>, status: Option<ReadingStatus>) -> Self {
        Self {
            genre: genre
                .map(str::trim)
                .filter(|g| !g.is_empty())
                .map(ToString::to_string),
            status,
        }
    }

    /// Filter on genre.
    #[must_use]
    pub fn with_genre(self, genre: &str) -> Self {
        Self::new(Some(genre), self.status)
    }

    /// Filter on reading status.
    #[must_use]
    pub fn with_status(self, status: ReadingStatus) -> Self {
        Self {
            status: Some(status),
            ..self
        }
    }

    #[must_use]
    pub fn genre(&self) -> Option<&str> {
        self.genre.as_deref()
    }

    #[must_use]
    pub const fn status(&self) -> Option<ReadingStatus> {
        self.status
    }

    /// Returns `true` when no filter is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.genre.is_none() && self.status.is_none()
    }

    /// Query parameters to send, omitting unset filters.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(2);
        if let Some(genre) = &self.genre {
            pairs.push(("genre", genre.clone()));
        }
        if let Some(status) = self.status {
            pairs.push(("status", status.to_string()));
        }
        pairs
    }
}

// =============================================================================
// BookForm
// =============================================================================

/// Raw book form input, one string per field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookForm {
    pub title: String,
    pub author: String,
    pub genre: String,
    pub price: String,
    pub pages: String,
    pub reading_status: String,
}

impl BookForm {
    /// Pre-fill the form from an existing book, for editing.
    #[must_use]
    pub fn from_book(book: &Book) -> Self {
        Self {
            title: book.title.clone(),
            author: book.author.clone().unwrap_or_default(),
            genre: book.genre.clone().unwrap_or_default(),
            price: book.price.map(|p| p.to_string()).unwrap_or_default(),
            pages: book.pages.map(|p| p.to_string()).unwrap_or_default(),
            reading_status: book.reading_status.to_string(),
        }
    }

    /// Parse the form into a typed payload.
    ///
    /// Blank optional fields become `None`. A blank reading status defaults
    /// to `planned`.
    ///
    /// # Errors
    ///
    /// Returns a [`FormError`] when the title is blank, the price is not a
    /// number, the page count is not an integer, or the status is unknown.
    pub fn parse(&self) -> Result<NewBook, FormError> {
        let mut fields = FieldErrors::new();

        let title = self.title.trim();
        if title.is_empty() {
            fields.insert("title".to_string(), "Title is required.".to_string());
        }

        let price = match blank_to_none(&self.price).map(Decimal::from_str).transpose() {
            Ok(price) => price,
            Err(_) => {
                fields.insert("price".to_string(), "Price must be a number.".to_string());
                None
            }
        };

        let pages = match blank_to_none(&self.pages).map(str::parse::<i32>).transpose() {
            Ok(Some(pages)) if pages < 0 => {
                fields.insert("pages".to_string(), "Pages cannot be negative.".to_string());
                None
            }
            Ok(pages) => pages,
            Err(_) => {
                fields.insert("pages".to_string(), "Pages must be an integer.".to_string());
                None
            }
        };

        let reading_status = match blank_to_none(&self.reading_status) {
            None => ReadingStatus::Planned,
            Some(s) => s.parse::<ReadingStatus>().unwrap_or_else(|message| {
                fields.insert("reading_status".to_string(), message);
                ReadingStatus::Planned
            }),
        };

        FormError::check(fields)?;
        Ok(NewBook {
            title: title.to_string(),
            author: blank_to_none(&self.author).map(ToString::to_string),
            genre: blank_to_none(&self.genre).map(ToString::to_string),
            price,
            pages,
            reading_status,
        })
    }
}

fn blank_to_none(s: &str) -> Option<&str> {
    let s = s.trim();
    (!s.is_empty()).then_some(s)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dune_form() -> BookForm {
        BookForm {
            title: "Dune".to_string(),
            price: "12.50".to_string(),
            pages: "412".to_string(),
            ..BookForm::default()
        }
    }

    #[test]
    fn test_form_parses_numbers() {
        let book = dune_form().parse().unwrap();
        assert_eq!(book.title, "Dune");
        assert_eq!(book.price, Some(Decimal::new(125, 1)));
        assert_eq!(book.pages, Some(412));
        assert_eq!(book.reading_status, ReadingStatus::Planned);
        assert_eq!(book.author, None);
    }

    #[test]
    fn test_new_book_sends_numbers() {
        let json = serde_json::to_value(dune_form().parse().unwrap()).unwrap();
        assert_eq!(json["price"], serde_json::json!(12.5));
        assert_eq!(json["pages"], serde_json::json!(412));
        assert_eq!(json["reading_status"], serde_json::json!("planned"));
        assert!(json["genre"].is_null());
    }

    #[test]
    fn test_form_reports_each_bad_field() {
        let form = BookForm {
            title: " ".to_string(),
            price: "twelve".to_string(),
            pages: "4.5".to_string(),
            reading_status: "abandoned".to_string(),
            ..BookForm::default()
        };
        let err = form.parse().unwrap_err();
        assert_eq!(err.field("title"), Some("Title is required."));
        assert_eq!(err.field("price"), Some("Price must be a number."));
        assert_eq!(err.field("pages"), Some("Pages must be an integer."));
        assert!(err.field("reading_status").is_some());
    }

    #[test]
    fn test_form_rejects_negative_pages() {
        let form = BookForm {
            pages: "-5".to_string(),
            ..dune_form()
        };
        let err = form.parse().unwrap_err();
        assert_eq!(err.field("pages"), Some("Pages cannot be negative."));

        let zero = BookForm {
            pages: "0".to_string(),
            ..dune_form()
        };
        assert_eq!(zero.parse().unwrap().pages, Some(0));
    }

    #[test]
    fn test_book_deserializes_numeric_price() {
        let book: Book = serde_json::from_value(serde_json::json!({
            "id": 1,
            "title": "Dune",
            "author": null,
            "genre": "Fiction",
            "price": 12.5,
            "pages": 412,
            "reading_status": "reading",
            "user_id": 7
        }))
        .unwrap();
        assert_eq!(book.price, Some(Decimal::new(125, 1)));
        assert_eq!(book.pages, Some(412));
        assert_eq!(book.reading_status, ReadingStatus::Reading);
        assert_eq!(book.user_id, UserId::new(7));
        assert!(book.created_at.is_none());
    }

    #[test]
    fn test_book_accepts_admin_timestamp() {
        let book: Book = serde_json::from_value(serde_json::json!({
            "id": 2,
            "title": "Emma",
            "price": null,
            "reading_status": "planned",
            "user_id": 1,
            "created_at": "2024-03-01T09:30:00.123456"
        }))
        .unwrap();
        assert!(book.price.is_none());
        assert!(book.created_at.is_some());
    }

    #[test]
    fn test_filter_normalizes_blank_genre() {
        assert_eq!(BookFilter::new(Some("  "), None), BookFilter::default());
        assert_eq!(
            BookFilter::new(Some(" Fiction "), None).genre(),
            Some("Fiction")
        );
    }

    #[test]
    fn test_filter_query_pairs() {
        let filter = BookFilter::default()
            .with_status(ReadingStatus::Reading)
            .with_genre("Fiction");
        assert_eq!(
            filter.query_pairs(),
            vec![("genre", "Fiction".to_string()), ("status", "reading".to_string())]
        );
        assert!(BookFilter::default().query_pairs().is_empty());
    }

    #[test]
    fn test_form_from_book_roundtrip() {
        let book = Book {
            id: BookId::new(1),
            title: "Dune".to_string(),
            author: Some("Herbert".to_string()),
            genre: None,
            price: Some(Decimal::new(1250, 2)),
            pages: Some(412),
            reading_status: ReadingStatus::Completed,
            user_id: UserId::new(1),
            created_at: None,
        };
        let parsed = BookForm::from_book(&book).parse().unwrap();
        assert_eq!(parsed.author.as_deref(), Some("Herbert"));
        assert_eq!(parsed.price, book.price);
        assert_eq!(parsed.reading_status, ReadingStatus::Completed);
    }

    #[test]
    fn test_distinct_genres() {
        let mut book = Book {
            id: BookId::new(1),
            title: "A".to_string(),
            author: None,
            genre: Some("Sci-Fi".to_string()),
            price: None,
            pages: None,
            reading_status: ReadingStatus::Planned,
            user_id: UserId::new(1),
            created_at: None,
        };
        let mut books = vec![book.clone()];
        book.genre = Some("Fantasy".to_string());
        books.push(book.clone());
        book.genre = Some("Sci-Fi".to_string());
        books.push(book.clone());
        book.genre = None;
        books.push(book);
        assert_eq!(Book::distinct_genres(&books), vec!["Fantasy", "Sci-Fi"]);
    }
}
