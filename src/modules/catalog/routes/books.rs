use axum::{http::StatusCode, Json};
use catalog_http::{ApiInput, ApiPath, AppError, WriteSession};

use crate::modules::catalog::models::{BookPatch, BookView, CreateBook, StatusBody};
use crate::modules::catalog::store;

pub async fn create_book(
    mut session: WriteSession,
    ApiInput(body): ApiInput<CreateBook>,
) -> Result<Json<BookView>, AppError> {
    let book_id = store::create_book(session.conn(), &body).await?;
    let book = store::book_view(session.conn(), book_id).await?;
    session.commit().await?;

    tracing::info!(book_id, name = %book.name, "book created");
    Ok(Json(book))
}

pub async fn update_book(
    mut session: WriteSession,
    ApiPath(book_id): ApiPath<i64>,
    ApiInput(patch): ApiInput<BookPatch>,
) -> Result<Json<BookView>, AppError> {
    store::update_book(session.conn(), book_id, &patch).await?;
    let book = store::book_view(session.conn(), book_id).await?;
    session.commit().await?;

    tracing::info!(book_id, "book updated");
    Ok(Json(book))
}

/// Answers with an opaque status body; the HTTP status tells the failures apart.
pub async fn delete_book(
    mut session: WriteSession,
    ApiPath(book_id): ApiPath<i64>,
) -> (StatusCode, Json<StatusBody>) {
    if let Err(err) = store::delete_book(session.conn(), book_id).await {
        tracing::warn!(book_id, error = %err, "book delete failed");
        return (err.status(), Json(StatusBody::bad()));
    }

    match session.commit().await {
        Ok(()) => {
            tracing::info!(book_id, "book deleted");
            (StatusCode::OK, Json(StatusBody::success()))
        }
        Err(err) => {
            tracing::error!(book_id, error = %err, "book delete failed to commit");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(StatusBody::bad()))
        }
    }
}
