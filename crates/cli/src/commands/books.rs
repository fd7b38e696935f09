//! `books` commands for the caller's own library.

use library_ai_client::{LibraryClient, Route};
use library_ai_core::{BookFilter, BookForm, BookId};

use super::{emit, require};
use crate::error::CliError;
use crate::render;

/// Field overrides for `books add` and `books update`.
#[derive(Debug, Default)]
pub struct BookFields {
    pub title: Option<String>,
    pub author: Option<String>,
    pub genre: Option<String>,
    pub price: Option<String>,
    pub pages: Option<String>,
    pub status: Option<String>,
}

impl BookFields {
    fn apply(self, mut form: BookForm) -> BookForm {
        if let Some(title) = self.title {
            form.title = title;
        }
        if let Some(author) = self.author {
            form.author = author;
        }
        if let Some(genre) = self.genre {
            form.genre = genre;
        }
        if let Some(price) = self.price {
            form.price = price;
        }
        if let Some(pages) = self.pages {
            form.pages = pages;
        }
        if let Some(status) = self.status {
            form.reading_status = status;
        }
        form
    }
}

pub async fn list(client: &LibraryClient, filter: BookFilter) -> Result<(), CliError> {
    require(client, Route::Books)?;
    let books = client.books(filter).await?;
    emit(&render::books(&books, false));
    Ok(())
}

pub async fn add(client: &LibraryClient, fields: BookFields) -> Result<(), CliError> {
    require(client, Route::Books)?;
    let book = fields.apply(BookForm::default()).parse()?;
    let created = client.create_book(&book).await?;
    emit(&format!("Added book {}: {}", created.id, created.title));
    Ok(())
}

/// Replace a book, starting from its current values.
pub async fn update(client: &LibraryClient, id: BookId, fields: BookFields) -> Result<(), CliError> {
    require(client, Route::Books)?;
    let books = client.books(BookFilter::default()).await?;
    let current = books
        .iter()
        .find(|b| b.id == id)
        .ok_or(CliError::UnknownBook(id))?;

    let book = fields.apply(BookForm::from_book(current)).parse()?;
    let updated = client.update_book(id, &book).await?;
    emit(&format!("Updated book {}: {}", updated.id, updated.title));
    Ok(())
}

pub async fn delete(client: &LibraryClient, id: BookId) -> Result<(), CliError> {
    require(client, Route::Books)?;
    client.delete_book(id).await?;
    emit(&format!("Deleted book {id}"));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_override_form() {
        let form = BookForm {
            title: "Dune".to_string(),
            price: "10".to_string(),
            ..BookForm::default()
        };
        let fields = BookFields {
            price: Some("12.50".to_string()),
            status: Some("completed".to_string()),
            ..BookFields::default()
        };
        let form = fields.apply(form);
        assert_eq!(form.title, "Dune");
        assert_eq!(form.price, "12.50");
        assert_eq!(form.reading_status, "completed");
    }
}
