//! Plain-text rendering of API results.

use std::fmt::Write;

use library_ai_core::{
    AiAnswer, Book, Identity, Insights, Recommendations, Scope, User, top_genre,
};
use rust_decimal::Decimal;

const MISSING: &str = "-";

/// Left-aligned table with a header row.
fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_row(&mut out, &widths, headers.iter().copied());
    for row in rows {
        push_row(&mut out, &widths, row.iter().map(String::as_str));
    }
    out
}

fn push_row<'a>(out: &mut String, widths: &[usize], cells: impl Iterator<Item = &'a str>) {
    let line = cells
        .zip(widths.iter().copied())
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ");
    let _ = writeln!(out, "{}", line.trim_end());
}

fn price(value: Option<Decimal>) -> String {
    value.map_or_else(|| MISSING.to_string(), |p| format!("${:.2}", p.round_dp(2)))
}

fn or_missing(value: Option<&str>) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or(MISSING)
        .to_string()
}

#[must_use]
pub fn identity(identity: &Identity) -> String {
    format!(
        "{} <{}> (id {}, {})",
        identity.name, identity.email, identity.id, identity.role
    )
}

#[must_use]
pub fn books(books: &[Book], with_owner: bool) -> String {
    if books.is_empty() {
        return "No books found.\n".to_string();
    }

    let mut headers = vec!["ID", "TITLE", "AUTHOR", "GENRE", "PRICE", "PAGES", "STATUS"];
    if with_owner {
        headers.push("OWNER");
    }

    let rows: Vec<Vec<String>> = books
        .iter()
        .map(|book| {
            let mut row = vec![
                book.id.to_string(),
                book.title.clone(),
                or_missing(book.author.as_deref()),
                or_missing(book.genre.as_deref()),
                price(book.price),
                book.pages
                    .map_or_else(|| MISSING.to_string(), |p| p.to_string()),
                book.reading_status.to_string(),
            ];
            if with_owner {
                row.push(book.user_id.to_string());
            }
            row
        })
        .collect();

    table(&headers, &rows)
}

#[must_use]
pub fn users(users: &[User]) -> String {
    if users.is_empty() {
        return "No users found.\n".to_string();
    }

    let rows: Vec<Vec<String>> = users
        .iter()
        .map(|user| {
            vec![
                user.id.to_string(),
                user.name.clone(),
                user.email.clone(),
                user.role.to_string(),
                user.created_at
                    .map_or_else(|| MISSING.to_string(), |t| t.format("%Y-%m-%d").to_string()),
            ]
        })
        .collect();

    table(&["ID", "NAME", "EMAIL", "ROLE", "CREATED"], &rows)
}

fn scope_label(scope: Scope) -> &'static str {
    match scope {
        Scope::AllUsers => "All users",
        Scope::AllBooks => "All books",
        Scope::YourBooks => "Your books",
        Scope::Unknown => "Unknown scope",
    }
}

#[must_use]
pub fn ai_answer(answer: &AiAnswer) -> String {
    let mut out = String::new();
    match answer {
        AiAnswer::OwnerWithMostBooks {
            user,
            book_count,
            scope,
        } => {
            let plural = if *book_count == 1 { "" } else { "s" };
            let _ = writeln!(out, "Owner with most books");
            let _ = writeln!(
                out,
                "{} ({}) owns {book_count} book{plural}.",
                user.name, user.email
            );
            let _ = writeln!(out, "[{}]", scope_label(*scope));
        }
        AiAnswer::MostPopularBook {
            title,
            count,
            example,
            scope,
        } => {
            let _ = writeln!(out, "Most popular book");
            let _ = writeln!(out, "{title} appears {count} times in the library.");
            if let Some(example) = example {
                let _ = writeln!(
                    out,
                    "Example: {}, {}",
                    example.author.as_deref().unwrap_or("Unknown author"),
                    example.genre.as_deref().unwrap_or("No genre")
                );
            }
            let _ = writeln!(out, "[{}]", scope_label(*scope));
        }
        AiAnswer::FiveMostExpensiveBooks { books, scope } => {
            let _ = writeln!(out, "Five most expensive books [{}]", scope_label(*scope));
            let rows: Vec<Vec<String>> = books
                .iter()
                .map(|b| {
                    vec![
                        b.title.clone(),
                        b.author.clone().unwrap_or_else(|| "Unknown".to_string()),
                        or_missing(b.genre.as_deref()),
                        price(b.price),
                    ]
                })
                .collect();
            out.push_str(&table(&["TITLE", "AUTHOR", "GENRE", "PRICE"], &rows));
        }
        AiAnswer::Other(value) => {
            let message = value.get("message").and_then(serde_json::Value::as_str);
            match message {
                Some(message) => {
                    let _ = writeln!(out, "{message}");
                }
                None => {
                    let _ = writeln!(out, "{value}");
                }
            }
        }
    }
    out
}

#[must_use]
pub fn recommendations(recommendations: &Recommendations) -> String {
    let mut out = String::new();
    match recommendations {
        Recommendations::Insufficient { message } => {
            let _ = writeln!(out, "{message}");
        }
        Recommendations::Suggested(set) => {
            let _ = writeln!(
                out,
                "Based on your preference for {}:",
                set.based_on_genre
            );
            if let Some(reason) = &set.reason {
                let _ = writeln!(out, "{reason}");
            }
            if set.books.is_empty() {
                let _ = writeln!(out, "No books to recommend yet.");
            }
            for book in &set.books {
                let _ = writeln!(
                    out,
                    "  - {} by {} ({})",
                    book.title,
                    book.author.as_deref().unwrap_or("Unknown"),
                    book.genre.as_deref().unwrap_or(MISSING)
                );
            }
        }
    }
    out
}

#[must_use]
pub fn insights(insights: &Insights) -> String {
    let mut out = String::new();

    if let Some(summary) = &insights.summary {
        let _ = writeln!(out, "{summary}\n");
    }
    if let Some(total) = insights.total_books {
        let _ = writeln!(out, "Total books:    {total}");
    }
    if let Some(avg) = insights.average_pages {
        let _ = writeln!(out, "Average pages:  {avg:.0}");
    }
    if let Some(total) = insights.total_pages {
        let _ = writeln!(out, "Total pages:    {total}");
    }
    if let Some(avg) = insights.average_price {
        let _ = writeln!(out, "Average price:  ${avg:.2}");
    }
    if let Some((min, max)) = insights.page_range() {
        let _ = writeln!(out, "Page range:     {min} - {max} pages");
    }
    if let Some(genre) = insights.favorite_genre_resolved() {
        let _ = writeln!(out, "Favorite genre: {genre}");
    }

    if let Some(dist) = insights
        .user_genre_distribution
        .as_ref()
        .filter(|d| !d.is_empty())
    {
        let _ = writeln!(out, "Genres:");
        for (genre, count) in dist {
            let _ = writeln!(out, "  {genre}: {count}");
        }
        if let Some((genre, count)) = top_genre(dist) {
            let _ = writeln!(out, "  (top: {genre} with {count})");
        }
    }
    if let Some(dist) = insights
        .status_distribution
        .as_ref()
        .filter(|d| !d.is_empty())
    {
        let _ = writeln!(out, "Reading status:");
        for (status, count) in dist {
            let _ = writeln!(out, "  {status}: {count}");
        }
    }
    if let Some(genre) = &insights.most_popular_genre_overall {
        let _ = writeln!(out, "Most popular genre (overall): {genre}");
    }

    if out.is_empty() {
        out.push_str("No insights available yet.\n");
    }
    out
}
