use axum::{http::StatusCode, Json};
use catalog_http::{ApiInput, ApiPath, AppError, WriteSession};

use crate::modules::catalog::models::{AuthorPatch, AuthorView, CreateAuthor, StatusBody};
use crate::modules::catalog::store;

pub async fn create_author(
    mut session: WriteSession,
    ApiInput(body): ApiInput<CreateAuthor>,
) -> Result<Json<AuthorView>, AppError> {
    let author_id = store::create_author(session.conn(), &body).await?;
    let author = store::author_view(session.conn(), author_id).await?;
    session.commit().await?;

    tracing::info!(author_id, name = %author.name, "author created");
    Ok(Json(author))
}

pub async fn update_author(
    mut session: WriteSession,
    ApiPath(author_id): ApiPath<i64>,
    ApiInput(patch): ApiInput<AuthorPatch>,
) -> Result<Json<AuthorView>, AppError> {
    store::update_author(session.conn(), author_id, &patch).await?;
    let author = store::author_view(session.conn(), author_id).await?;
    session.commit().await?;

    tracing::info!(author_id, "author updated");
    Ok(Json(author))
}

pub async fn delete_author(
    mut session: WriteSession,
    ApiPath(author_id): ApiPath<i64>,
) -> (StatusCode, Json<StatusBody>) {
    if let Err(err) = store::delete_author(session.conn(), author_id).await {
        tracing::warn!(author_id, error = %err, "author delete failed");
        return (err.status(), Json(StatusBody::bad()));
    }

    match session.commit().await {
        Ok(()) => {
            tracing::info!(author_id, "author deleted");
            (StatusCode::OK, Json(StatusBody::success()))
        }
        Err(err) => {
            tracing::error!(author_id, error = %err, "author delete failed to commit");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(StatusBody::bad()))
        }
    }
}
