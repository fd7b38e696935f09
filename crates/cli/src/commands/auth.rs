//! Session commands: `register`, `login`, `logout`, `whoami`.

use library_ai_client::LibraryClient;
use library_ai_core::{LoginForm, RegisterForm};

use super::emit;
use crate::error::CliError;
use crate::render;

/// Create an account, optionally logging straight in.
pub async fn register(
    client: &LibraryClient,
    form: RegisterForm,
    login: bool,
) -> Result<(), CliError> {
    if login {
        let identity = client.register_and_login(&form).await?;
        emit(&format!("Registered and logged in as {}", render::identity(&identity)));
    } else {
        client.register(&form).await?;
        emit("Registered. Run `library-ai login` to sign in.");
    }
    Ok(())
}

pub async fn login(client: &LibraryClient, form: LoginForm) -> Result<(), CliError> {
    let identity = client.login(&form).await?;
    emit(&format!("Logged in as {}", render::identity(&identity)));
    Ok(())
}

pub async fn logout(client: &LibraryClient) {
    client.logout().await;
    emit("Logged out.");
}

pub fn whoami(client: &LibraryClient) {
    match client.identity() {
        Some(identity) => emit(&render::identity(&identity)),
        None => emit("Not logged in."),
    }
}
