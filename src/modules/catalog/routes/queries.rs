//! Read-only lookups. A filter name that does not resolve to exactly one
//! record yields an empty list; store failures still surface as errors.

use axum::Json;
use catalog_http::{ApiQuery, AppError, DbSession};

use crate::modules::catalog::models::{
    AuthorBooksQuery, AuthorNameQuery, AuthorView, BookNameQuery, BookView, UnreadBooksQuery,
};
use crate::modules::catalog::store::{self, BookFilter, CatalogError, Entity};

/// Turns an unresolved lookup into `None`, passing other errors through.
fn resolved(result: Result<i64, CatalogError>) -> Result<Option<i64>, CatalogError> {
    match result {
        Ok(id) => Ok(Some(id)),
        Err(err) if err.is_unresolved() => {
            tracing::debug!(error = %err, "filter did not resolve");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

pub async fn books_by_author(
    mut session: DbSession,
    ApiQuery(query): ApiQuery<AuthorBooksQuery>,
) -> Result<Json<Vec<BookView>>, AppError> {
    let lookup = store::resolve_name(session.conn(), Entity::Author, &query.author_name).await;
    let Some(author_id) = resolved(lookup)? else {
        return Ok(Json(Vec::new()));
    };

    let language_id = match &query.lang {
        Some(lang) => {
            let lookup = store::resolve_name(session.conn(), Entity::Language, lang).await;
            match resolved(lookup)? {
                Some(id) => Some(id),
                None => return Ok(Json(Vec::new())),
            }
        }
        None => None,
    };

    let filter = BookFilter {
        author_id: Some(author_id),
        language_id,
        is_readied: query.is_readied,
        ..BookFilter::default()
    };
    let books = store::find_books(session.conn(), &filter).await?;
    session.commit().await?;
    Ok(Json(books))
}

pub async fn readied_books(mut session: DbSession) -> Result<Json<Vec<BookView>>, AppError> {
    let filter = BookFilter {
        is_readied: Some(true),
        ..BookFilter::default()
    };
    let books = store::find_books(session.conn(), &filter).await?;
    session.commit().await?;
    Ok(Json(books))
}

pub async fn unread_books(
    mut session: DbSession,
    ApiQuery(query): ApiQuery<UnreadBooksQuery>,
) -> Result<Json<Vec<BookView>>, AppError> {
    let language_id = match &query.lang {
        Some(lang) => {
            let lookup = store::resolve_name(session.conn(), Entity::Language, lang).await;
            match resolved(lookup)? {
                Some(id) => Some(id),
                None => return Ok(Json(Vec::new())),
            }
        }
        None => None,
    };

    let filter = BookFilter {
        language_id,
        is_readied: Some(false),
        ..BookFilter::default()
    };
    let books = store::find_books(session.conn(), &filter).await?;
    session.commit().await?;
    Ok(Json(books))
}

pub async fn books_by_name(
    mut session: DbSession,
    ApiQuery(query): ApiQuery<BookNameQuery>,
) -> Result<Json<Vec<BookView>>, AppError> {
    let filter = BookFilter {
        name: Some(query.book_name),
        ..BookFilter::default()
    };
    let books = store::find_books(session.conn(), &filter).await?;
    session.commit().await?;
    Ok(Json(books))
}

pub async fn authors_by_name(
    mut session: DbSession,
    ApiQuery(query): ApiQuery<AuthorNameQuery>,
) -> Result<Json<Vec<AuthorView>>, AppError> {
    let authors = store::find_authors_by_name(session.conn(), &query.author_name).await?;
    session.commit().await?;
    Ok(Json(authors))
}
