use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use catalog_http::DbSession;

use crate::modules::catalog::models::{BookSummary, CatalogListing, StatusBody};
use crate::modules::catalog::store::{self, BookFilter, CatalogResult};

/// Whole catalog split by read status. An empty catalog gives two empty
/// lists; only a store failure produces the "no data" status.
pub async fn list_catalog(mut session: DbSession) -> Response {
    match load(&mut session).await {
        Ok(listing) => {
            if let Err(err) = session.commit().await {
                tracing::warn!(error = %err, "listing session did not commit");
            }
            Json(listing).into_response()
        }
        Err(err) => {
            tracing::error!(error = %err, "catalog listing failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(StatusBody::no_data())).into_response()
        }
    }
}

async fn load(session: &mut DbSession) -> CatalogResult<CatalogListing> {
    let unread = read_status(session, false).await?;
    let readied = read_status(session, true).await?;
    Ok(CatalogListing { unread, readied })
}

async fn read_status(session: &mut DbSession, is_readied: bool) -> CatalogResult<Vec<BookSummary>> {
    let filter = BookFilter {
        is_readied: Some(is_readied),
        ..BookFilter::default()
    };
    let books = store::find_books(session.conn(), &filter).await?;
    Ok(books.into_iter().map(BookSummary::from).collect())
}
