//! Integration tests for the route guard and admin operations.

use library_ai_client::{Error, GuardDecision, LibraryClient, Route};
use library_ai_core::{BookFilter, LoginForm, NewUser, ReadingStatus, Role};
use library_ai_integration_tests::{MockLibrary, PASSWORD};

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

// ============================================================================
// Route Guard
// ============================================================================

#[tokio::test]
async fn test_user_is_redirected_from_admin_without_requests() {
    let mock = MockLibrary::start().await;
    mock.user("Ada", "ada@example.com", Role::User);
    let client = signed_in(&mock, "ada@example.com").await;
    let before = mock.total_hits();

    for path in ["/admin", "/admin/books", "/admin/users/"] {
        assert_eq!(
            client.navigate(path),
            GuardDecision::Redirect(Route::Books)
        );
    }
    assert_eq!(client.navigate("/ai"), GuardDecision::Render(Route::Ai));
    assert_eq!(mock.total_hits(), before);
}

#[tokio::test]
async fn test_admin_is_granted_admin_routes() {
    let mock = MockLibrary::start().await;
    mock.user("Root", "root@example.com", Role::Admin);
    let client = signed_in(&mock, "root@example.com").await;

    for route in [Route::Admin, Route::AdminBooks, Route::AdminUsers] {
        assert_eq!(client.authorize(route), GuardDecision::Render(route));
    }
    assert_eq!(client.navigate("/"), GuardDecision::Redirect(Route::Books));
}

#[tokio::test]
async fn test_promotion_applies_after_next_login() {
    let mock = MockLibrary::start().await;
    mock.user("Root", "root@example.com", Role::Admin);
    let ada = mock.user("Ada", "ada@example.com", Role::User);
    let admin = signed_in(&mock, "root@example.com").await;
    let user = signed_in(&mock, "ada@example.com").await;

    let promoted = admin
        .set_user_role(ada, Role::Admin)
        .await
        .expect("Failed to set role");
    assert_eq!(promoted.role, Role::Admin);

    // The identity is a snapshot taken at login
    assert_eq!(
        user.authorize(Route::AdminUsers),
        GuardDecision::Redirect(Route::Books)
    );
    user.logout().await;
    user.login(&LoginForm {
        email: "ada@example.com".to_string(),
        password: PASSWORD.to_string(),
    })
    .await
    .expect("Login failed");
    assert_eq!(
        user.authorize(Route::AdminUsers),
        GuardDecision::Render(Route::AdminUsers)
    );
}

// ============================================================================
// Users
// ============================================================================

#[tokio::test]
async fn test_create_user_refreshes_user_list() {
    let mock = MockLibrary::start().await;
    mock.user("Root", "root@example.com", Role::Admin);
    let client = signed_in(&mock, "root@example.com").await;

    let users = client.admin_users().await.expect("Failed to list users");
    assert_eq!(users.len(), 1);

    let new_user = NewUser::parse("Grace", "grace@example.com", PASSWORD, Role::User)
        .expect("Input should be valid");
    let created = client
        .create_user(&new_user)
        .await
        .expect("Failed to create user");
    assert_eq!(created.email, "grace@example.com");

    let users = client.admin_users().await.expect("Failed to list users");
    assert_eq!(users.len(), 2);
    assert!(users.iter().any(|u| u.id == created.id));
    assert_eq!(mock.hits("GET /admin/users"), 2);
}

#[tokio::test]
async fn test_delete_user_removes_their_books_everywhere() {
    let mock = MockLibrary::start().await;
    let root = mock.user("Root", "root@example.com", Role::Admin);
    let bob = mock.user("Bob", "bob@example.com", Role::User);
    mock.titled(root, "Dune", "Sci-Fi", ReadingStatus::Reading);
    let emma = mock.titled(bob, "Emma", "Classic", ReadingStatus::Planned);
    let client = signed_in(&mock, "root@example.com").await;

    let all = client
        .admin_books(BookFilter::default())
        .await
        .expect("Failed to list books");
    assert!(all.iter().any(|b| b.id == emma));
    client.admin_users().await.expect("Failed to list users");

    client.delete_user(bob).await.expect("Failed to delete user");

    let all = client
        .admin_books(BookFilter::default())
        .await
        .expect("Failed to list books");
    assert!(all.iter().all(|b| b.id != emma));
    let users = client.admin_users().await.expect("Failed to list users");
    assert!(users.iter().all(|u| u.id != bob));
}

#[tokio::test]
async fn test_admin_cannot_delete_self() {
    let mock = MockLibrary::start().await;
    let root = mock.user("Root", "root@example.com", Role::Admin);
    let client = signed_in(&mock, "root@example.com").await;

    let result = client.delete_user(root).await;

    let Err(Error::Api(err)) = result else {
        panic!("expected API error, got {result:?}");
    };
    assert_eq!(err.status(), Some(400));
    assert_eq!(err.display_message(), "You cannot delete your own account.");
    assert!(client.state().is_authenticated());
}

// ============================================================================
// Books
// ============================================================================

#[tokio::test]
async fn test_admin_books_filter_and_delete() {
    let mock = MockLibrary::start().await;
    let root = mock.user("Root", "root@example.com", Role::Admin);
    let bob = mock.user("Bob", "bob@example.com", Role::User);
    mock.titled(root, "Dune", "Sci-Fi", ReadingStatus::Reading);
    let emma = mock.titled(bob, "Emma", "Classic", ReadingStatus::Planned);
    let client = signed_in(&mock, "root@example.com").await;

    let classics = client
        .admin_books(BookFilter::default().with_genre("Classic"))
        .await
        .expect("Failed to list books");
    assert_eq!(classics.len(), 1);
    assert_eq!(
        mock.last_query("GET /admin/books"),
        Some(vec![("genre".to_string(), "Classic".to_string())])
    );
    let mine = client
        .books(BookFilter::default())
        .await
        .expect("Failed to list books");
    assert_eq!(mine.len(), 1);

    client
        .admin_delete_book(emma)
        .await
        .expect("Failed to delete book");

    let classics = client
        .admin_books(BookFilter::default().with_genre("Classic"))
        .await
        .expect("Failed to list books");
    assert!(classics.is_empty());
    assert!(mock.stored_books().iter().all(|b| b.id != emma));
}
