//! `ai` commands.

use library_ai_client::{LibraryClient, Route};

use super::{emit, require};
use crate::error::CliError;
use crate::render;

pub async fn ask(client: &LibraryClient, question: &str) -> Result<(), CliError> {
    require(client, Route::Ai)?;
    let answer = client.ask(question).await?;
    emit(&render::ai_answer(&answer));
    Ok(())
}

pub async fn recommend(client: &LibraryClient) -> Result<(), CliError> {
    require(client, Route::Ai)?;
    let recommendations = client.recommendations().await?;
    emit(&render::recommendations(&recommendations));
    Ok(())
}

pub async fn insights(client: &LibraryClient) -> Result<(), CliError> {
    require(client, Route::Ai)?;
    let insights = client.insights().await?;
    emit(&render::insights(&insights));
    Ok(())
}
