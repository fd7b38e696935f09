//! `admin` commands. All of them require an admin session.

use library_ai_client::{LibraryClient, Route};
use library_ai_core::{BookFilter, BookId, NewUser, Role, UserId};

use super::{emit, require};
use crate::error::CliError;
use crate::render;

pub async fn users(client: &LibraryClient) -> Result<(), CliError> {
    require(client, Route::AdminUsers)?;
    let users = client.admin_users().await?;
    emit(&render::users(&users));
    Ok(())
}

pub async fn create_user(
    client: &LibraryClient,
    name: &str,
    email: &str,
    password: &str,
    role: Role,
) -> Result<(), CliError> {
    require(client, Route::AdminUsers)?;
    let user = NewUser::parse(name, email, password, role)?;
    let created = client.create_user(&user).await?;
    emit(&format!(
        "Created user {} <{}> as {}",
        created.id, created.email, created.role
    ));
    Ok(())
}

pub async fn set_role(client: &LibraryClient, id: UserId, role: Role) -> Result<(), CliError> {
    require(client, Route::AdminUsers)?;
    let user = client.set_user_role(id, role).await?;
    emit(&format!("User {} is now {}", user.id, user.role));
    Ok(())
}

pub async fn delete_user(client: &LibraryClient, id: UserId) -> Result<(), CliError> {
    require(client, Route::AdminUsers)?;
    client.delete_user(id).await?;
    emit(&format!("Deleted user {id} and their books"));
    Ok(())
}

pub async fn books(client: &LibraryClient, filter: BookFilter) -> Result<(), CliError> {
    require(client, Route::AdminBooks)?;
    let books = client.admin_books(filter).await?;
    emit(&render::books(&books, true));
    Ok(())
}

pub async fn delete_book(client: &LibraryClient, id: BookId) -> Result<(), CliError> {
    require(client, Route::AdminBooks)?;
    client.admin_delete_book(id).await?;
    emit(&format!("Deleted book {id}"));
    Ok(())
}
