//! Integration tests for "my books": filters, caching and invalidation.

use std::time::Duration;

use library_ai_client::{LibraryClient, QueryKey, QueryStatus};
use library_ai_core::{BookFilter, BookForm, LoginForm, ReadingStatus, Role};
use library_ai_integration_tests::{MockLibrary, PASSWORD};
use rust_decimal::Decimal;

async fn signed_in(mock: &MockLibrary, email: &str) -> LibraryClient {
    let client = mock.client();
    client.restore().await;
    client
        .login(&LoginForm {
            email: email.to_string(),
            password: PASSWORD.to_string(),
        })
        .await
        .expect("Login failed");
    client
}

fn pairs(list: &[(&str, &str)]) -> Vec<(String, String)> {
    list.iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

// ============================================================================
// Reads
// ============================================================================

#[tokio::test]
async fn test_lists_only_own_books() {
    let mock = MockLibrary::start().await;
    let ada = mock.user("Ada", "ada@example.com", Role::User);
    let bob = mock.user("Bob", "bob@example.com", Role::User);
    mock.titled(ada, "Dune", "Sci-Fi", ReadingStatus::Reading);
    mock.titled(bob, "Emma", "Classic", ReadingStatus::Planned);
    let client = signed_in(&mock, "ada@example.com").await;

    let books = client
        .books(BookFilter::default())
        .await
        .expect("Failed to list books");

    assert_eq!(books.len(), 1);
    assert_eq!(books.first().map(|b| b.title.as_str()), Some("Dune"));
    assert!(books.iter().all(|b| b.user_id == ada));
}

#[tokio::test]
async fn test_filters_are_sent_to_server_and_keyed_separately() {
    let mock = MockLibrary::start().await;
    let ada = mock.user("Ada", "ada@example.com", Role::User);
    mock.titled(ada, "Dune", "Sci-Fi", ReadingStatus::Reading);
    mock.titled(ada, "Middlemarch", "Fiction", ReadingStatus::Reading);
    mock.titled(ada, "Beloved", "Fiction", ReadingStatus::Completed);
    let client = signed_in(&mock, "ada@example.com").await;

    let both = BookFilter::default()
        .with_status(ReadingStatus::Reading)
        .with_genre("Fiction");
    let status_only = BookFilter::default().with_status(ReadingStatus::Reading);
    assert_ne!(QueryKey::Books(both.clone()), QueryKey::Books(status_only.clone()));

    let fiction = client.books(both).await.expect("Failed to list books");
    assert_eq!(
        mock.last_query("GET /books/"),
        Some(pairs(&[("genre", "Fiction"), ("status", "reading")]))
    );
    assert_eq!(fiction.len(), 1);
    assert_eq!(fiction.first().map(|b| b.title.as_str()), Some("Middlemarch"));

    let reading = client
        .books(status_only)
        .await
        .expect("Failed to list books");
    assert_eq!(
        mock.last_query("GET /books/"),
        Some(pairs(&[("status", "reading")]))
    );
    assert_eq!(reading.len(), 2);
    assert_eq!(mock.hits("GET /books/"), 2);
}

#[tokio::test]
async fn test_unfiltered_read_sends_no_params() {
    let mock = MockLibrary::start().await;
    mock.user("Ada", "ada@example.com", Role::User);
    let client = signed_in(&mock, "ada@example.com").await;

    client
        .books(BookFilter::new(Some("  "), None))
        .await
        .expect("Failed to list books");

    assert_eq!(mock.last_query("GET /books/"), Some(Vec::new()));
}

#[tokio::test]
async fn test_concurrent_reads_share_one_request() {
    let mock = MockLibrary::start().await;
    let ada = mock.user("Ada", "ada@example.com", Role::User);
    mock.titled(ada, "Dune", "Sci-Fi", ReadingStatus::Reading);
    let client = signed_in(&mock, "ada@example.com").await;
    mock.delay("GET /books/", Duration::from_millis(100));

    let (first, second) = tokio::join!(
        client.books(BookFilter::default()),
        client.books(BookFilter::default())
    );

    let first = first.expect("First read failed");
    let second = second.expect("Second read failed");
    assert_eq!(first, second);
    assert_eq!(mock.hits("GET /books/"), 1);
}

#[tokio::test]
async fn test_repeat_read_is_served_from_cache() {
    let mock = MockLibrary::start().await;
    mock.user("Ada", "ada@example.com", Role::User);
    let client = signed_in(&mock, "ada@example.com").await;

    for _ in 0..3 {
        client
            .books(BookFilter::default())
            .await
            .expect("Failed to list books");
    }

    assert_eq!(mock.hits("GET /books/"), 1);
}

// ============================================================================
// Mutations
// ============================================================================

#[tokio::test]
async fn test_create_from_form_round_trips_numbers() {
    let mock = MockLibrary::start().await;
    mock.user("Ada", "ada@example.com", Role::User);
    let client = signed_in(&mock, "ada@example.com").await;

    let form = BookForm {
        title: "Dune".to_string(),
        price: "12.50".to_string(),
        pages: "412".to_string(),
        ..BookForm::default()
    };
    let created = client
        .create_book(&form.parse().expect("Form should be valid"))
        .await
        .expect("Failed to create book");

    let books = client
        .books(BookFilter::default())
        .await
        .expect("Failed to list books");
    let dune = books
        .iter()
        .find(|b| b.id == created.id)
        .expect("Created book missing from list");
    assert_eq!(dune.price, Some(Decimal::new(125, 1)));
    assert_eq!(dune.pages, Some(412));
    assert_eq!(dune.reading_status, ReadingStatus::Planned);
}

#[tokio::test]
async fn test_delete_invalidates_my_books() {
    let mock = MockLibrary::start().await;
    let ada = mock.user("Ada", "ada@example.com", Role::User);
    let dune = mock.titled(ada, "Dune", "Sci-Fi", ReadingStatus::Reading);
    mock.titled(ada, "Emma", "Classic", ReadingStatus::Planned);
    let client = signed_in(&mock, "ada@example.com").await;

    let reading = BookFilter::default().with_status(ReadingStatus::Reading);
    let before = client
        .books(BookFilter::default())
        .await
        .expect("Failed to list books");
    assert!(before.iter().any(|b| b.id == dune));
    client
        .books(reading.clone())
        .await
        .expect("Failed to list books");

    client.delete_book(dune).await.expect("Failed to delete book");

    for filter in [BookFilter::default(), reading] {
        let after = client.books(filter).await.expect("Failed to list books");
        assert!(after.iter().all(|b| b.id != dune));
    }
    assert_eq!(mock.hits("GET /books/"), 4);
}

#[tokio::test]
async fn test_update_keeps_unchanged_fields() {
    let mock = MockLibrary::start().await;
    let ada = mock.user("Ada", "ada@example.com", Role::User);
    let dune = mock.titled(ada, "Dune", "Sci-Fi", ReadingStatus::Reading);
    let client = signed_in(&mock, "ada@example.com").await;

    let books = client
        .books(BookFilter::default())
        .await
        .expect("Failed to list books");
    let original = books.first().expect("Seeded book missing");
    let mut form = BookForm::from_book(original);
    form.reading_status = "completed".to_string();

    let updated = client
        .update_book(dune, &form.parse().expect("Form should be valid"))
        .await
        .expect("Failed to update book");

    assert_eq!(updated.reading_status, ReadingStatus::Completed);
    assert_eq!(updated.genre.as_deref(), Some("Sci-Fi"));
    let refreshed = client
        .books(BookFilter::default())
        .await
        .expect("Failed to list books");
    assert_eq!(refreshed, vec![updated]);
}

#[tokio::test]
async fn test_blank_field_in_update_leaves_value_unchanged() {
    let mock = MockLibrary::start().await;
    let ada = mock.user("Ada", "ada@example.com", Role::User);
    let dune = mock.titled(ada, "Dune", "Sci-Fi", ReadingStatus::Reading);
    let client = signed_in(&mock, "ada@example.com").await;

    let books = client
        .books(BookFilter::default())
        .await
        .expect("Failed to list books");
    let mut form = BookForm::from_book(books.first().expect("Seeded book missing"));
    form.genre = String::new();
    form.pages = "412".to_string();
    let book = form.parse().expect("Form should be valid");
    assert_eq!(book.genre, None);

    let updated = client
        .update_book(dune, &book)
        .await
        .expect("Failed to update book");

    assert_eq!(updated.genre.as_deref(), Some("Sci-Fi"));
    assert_eq!(updated.pages, Some(412));
    let stored = mock.stored_books();
    let stored = stored.iter().find(|b| b.id == dune).expect("Book missing");
    assert_eq!(stored.genre.as_deref(), Some("Sci-Fi"));
}

#[tokio::test]
async fn test_observer_is_refetched_after_mutation() {
    let mock = MockLibrary::start().await;
    let ada = mock.user("Ada", "ada@example.com", Role::User);
    mock.titled(ada, "Dune", "Sci-Fi", ReadingStatus::Reading);
    let client = signed_in(&mock, "ada@example.com").await;

    let mut observer = client.observe(QueryKey::Books(BookFilter::default()));
    let first = observer.settled().await.expect("Observer closed");
    assert_eq!(first.status, QueryStatus::Success);
    assert_eq!(first.data.as_ref().and_then(|d| d.books()).map(<[_]>::len), Some(1));

    client
        .create_book(&library_ai_core::NewBook::titled("Emma"))
        .await
        .expect("Failed to create book");

    // The refetch starts without anyone reading the key
    let refreshed = observer.settled().await.expect("Observer closed");
    assert_eq!(
        refreshed.data.as_ref().and_then(|d| d.books()).map(<[_]>::len),
        Some(2)
    );
    assert!(!refreshed.stale);
    assert_eq!(mock.hits("GET /books/"), 2);
}

#[tokio::test]
async fn test_unobserved_entries_wait_for_next_read() {
    let mock = MockLibrary::start().await;
    mock.user("Ada", "ada@example.com", Role::User);
    let client = signed_in(&mock, "ada@example.com").await;
    client
        .books(BookFilter::default())
        .await
        .expect("Failed to list books");

    client
        .create_book(&library_ai_core::NewBook::titled("Emma"))
        .await
        .expect("Failed to create book");
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(mock.hits("GET /books/"), 1);
    let snapshot = client
        .cache()
        .peek(&QueryKey::Books(BookFilter::default()))
        .expect("Entry missing");
    assert!(snapshot.stale);
}
