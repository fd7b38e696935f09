//! Integration tests for the AI endpoints.

use library_ai_client::{Error, LibraryClient};
use library_ai_core::{AiAnswer, LoginForm, NewBook, ReadingStatus, Recommendations, Role, Scope};
use library_ai_integration_tests::{MockLibrary, PASSWORD};
use serde_json::json;

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

#[tokio::test]
async fn test_ask_owner_with_most_books() {
    let mock = MockLibrary::start().await;
    let ada = mock.user("Ada", "ada@example.com", Role::User);
    let bob = mock.user("Bob", "bob@example.com", Role::User);
    mock.titled(ada, "Dune", "Sci-Fi", ReadingStatus::Reading);
    mock.titled(bob, "Emma", "Classic", ReadingStatus::Planned);
    mock.titled(bob, "Persuasion", "Classic", ReadingStatus::Completed);
    let client = signed_in(&mock, "ada@example.com").await;

    let answer = client
        .ask("Who owns the most books?")
        .await
        .expect("Failed to ask");

    let AiAnswer::OwnerWithMostBooks {
        user, book_count, ..
    } = &answer
    else {
        panic!("unexpected answer {answer:?}");
    };
    assert_eq!(user.id, bob);
    assert_eq!(*book_count, 2);
    assert_eq!(answer.scope(), Some(Scope::AllUsers));
}

#[tokio::test]
async fn test_unknown_answer_type_is_kept_raw() {
    let mock = MockLibrary::start().await;
    mock.user("Ada", "ada@example.com", Role::User);
    let client = signed_in(&mock, "ada@example.com").await;
    let raw = json!({
        "type": "average_rating",
        "value": 4.5,
        "scope": "everywhere"
    });
    mock.ai_answer(raw.clone());

    let answer = client.ask("What is the average rating?").await.expect("Failed to ask");

    assert_eq!(answer, AiAnswer::Other(raw));
    assert_eq!(answer.scope(), None);
}

#[tokio::test]
async fn test_most_expensive_books_answer() {
    let mock = MockLibrary::start().await;
    mock.user("Ada", "ada@example.com", Role::User);
    let client = signed_in(&mock, "ada@example.com").await;
    mock.ai_answer(json!({
        "type": "five_most_expensive_books",
        "scope": "your_books",
        "books": [
            { "id": 3, "title": "Dune", "author": null, "price": 12.5, "owner_id": 1 },
            { "id": 4, "title": "Emma", "genre": "Classic", "price": null, "owner_id": 1 }
        ]
    }));

    let answer = client.ask("Five most expensive?").await.expect("Failed to ask");

    let AiAnswer::FiveMostExpensiveBooks { books, scope } = answer else {
        panic!("unexpected answer {answer:?}");
    };
    assert_eq!(scope, Scope::YourBooks);
    assert_eq!(books.len(), 2);
    assert_eq!(
        books.first().and_then(|b| b.price),
        Some(rust_decimal::Decimal::new(125, 1))
    );
}

#[tokio::test]
async fn test_blank_question_is_rejected_locally() {
    let mock = MockLibrary::start().await;
    mock.user("Ada", "ada@example.com", Role::User);
    let client = signed_in(&mock, "ada@example.com").await;

    let result = client.ask("   ").await;

    let Err(Error::Form(form)) = result else {
        panic!("expected form error, got {result:?}");
    };
    assert_eq!(form.field("question"), Some("Question is required."));
    assert_eq!(mock.hits("POST /ai/query"), 0);
}

#[tokio::test]
async fn test_answers_are_not_cached() {
    let mock = MockLibrary::start().await;
    let ada = mock.user("Ada", "ada@example.com", Role::User);
    mock.titled(ada, "Dune", "Sci-Fi", ReadingStatus::Reading);
    let client = signed_in(&mock, "ada@example.com").await;

    client.ask("Who owns the most books?").await.expect("Failed to ask");
    client.ask("Who owns the most books?").await.expect("Failed to ask");

    assert_eq!(mock.hits("POST /ai/query"), 2);
}

#[tokio::test]
async fn test_recommendations_follow_favorite_genre() {
    let mock = MockLibrary::start().await;
    let ada = mock.user("Ada", "ada@example.com", Role::User);
    let bob = mock.user("Bob", "bob@example.com", Role::User);
    mock.titled(ada, "Dune", "Sci-Fi", ReadingStatus::Reading);
    mock.titled(bob, "Hyperion", "Sci-Fi", ReadingStatus::Planned);
    mock.titled(bob, "Emma", "Classic", ReadingStatus::Planned);
    let client = signed_in(&mock, "ada@example.com").await;

    let recommendations = client
        .recommendations()
        .await
        .expect("Failed to get recommendations");

    let Recommendations::Suggested(set) = &recommendations else {
        panic!("unexpected recommendations {recommendations:?}");
    };
    assert_eq!(set.based_on_genre, "Sci-Fi");
    let titles: Vec<_> = recommendations.books().iter().map(|b| b.title.as_str()).collect();
    assert_eq!(titles, ["Hyperion"]);
}

#[tokio::test]
async fn test_recommendations_without_books() {
    let mock = MockLibrary::start().await;
    mock.user("Ada", "ada@example.com", Role::User);
    let client = signed_in(&mock, "ada@example.com").await;

    let recommendations = client
        .recommendations()
        .await
        .expect("Failed to get recommendations");

    assert!(matches!(recommendations, Recommendations::Insufficient { .. }));
    assert!(recommendations.books().is_empty());
}

#[tokio::test]
async fn test_insights_refresh_after_book_write() {
    let mock = MockLibrary::start().await;
    let ada = mock.user("Ada", "ada@example.com", Role::User);
    mock.book(
        ada,
        NewBook {
            genre: Some("Sci-Fi".to_string()),
            pages: Some(400),
            ..NewBook::titled("Dune")
        },
    );
    mock.book(
        ada,
        NewBook {
            genre: Some("Drama".to_string()),
            pages: Some(200),
            ..NewBook::titled("Hamlet")
        },
    );
    let client = signed_in(&mock, "ada@example.com").await;

    let insights = client.insights().await.expect("Failed to get insights");
    assert_eq!(insights.total_books, Some(2));
    assert_eq!(insights.page_range(), Some((200, 400)));
    assert_eq!(insights.average_pages, Some(300.0));
    // Tie between Drama and Sci-Fi resolves to the smaller name
    assert_eq!(insights.favorite_genre, None);
    assert_eq!(insights.favorite_genre_resolved(), Some("Drama"));

    client
        .create_book(&NewBook {
            genre: Some("Sci-Fi".to_string()),
            ..NewBook::titled("Hyperion")
        })
        .await
        .expect("Failed to create book");

    let insights = client.insights().await.expect("Failed to get insights");
    assert_eq!(insights.total_books, Some(3));
    assert_eq!(insights.favorite_genre_resolved(), Some("Sci-Fi"));
    assert_eq!(mock.hits("GET /ai/insights"), 2);
}

#[tokio::test]
async fn test_insights_tolerate_negative_page_counts() {
    let mock = MockLibrary::start().await;
    let ada = mock.user("Ada", "ada@example.com", Role::User);
    mock.book(
        ada,
        NewBook {
            pages: Some(-5),
            ..NewBook::titled("Misprint")
        },
    );
    mock.book(
        ada,
        NewBook {
            pages: Some(300),
            ..NewBook::titled("Dune")
        },
    );
    let client = signed_in(&mock, "ada@example.com").await;

    let insights = client.insights().await.expect("Failed to get insights");

    assert_eq!(insights.total_pages, Some(295));
    assert_eq!(insights.page_range(), Some((-5, 300)));
}
