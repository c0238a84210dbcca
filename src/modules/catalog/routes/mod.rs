mod authors;
mod books;
mod languages;
mod listing;
mod queries;

use axum::{
    routing::{get, post, put, MethodRouter},
    Router,
};
use catalog_kernel::DbPool;

/// Every catalog path with its handlers. Reads get a [`catalog_http::DbSession`],
/// writes a [`catalog_http::WriteSession`].
///
/// `/api/book{id}` and `/api/authors{id}` take the id straight after the
/// collection name, as older clients send it.
pub(crate) fn route_table() -> Vec<(&'static str, MethodRouter<DbPool>)> {
    vec![
        ("/api/", get(listing::list_catalog)),
        ("/api/health", get(health_check)),
        ("/api/language/", post(languages::create_language)),
        (
            "/api/books",
            get(queries::books_by_name).post(books::create_book),
        ),
        (
            "/api/books/{id}",
            put(books::update_book).delete(books::delete_book),
        ),
        ("/api/book{id}", put(books::update_book)),
        ("/api/books/author/", get(queries::books_by_author)),
        ("/api/books/readied", get(queries::readied_books)),
        ("/api/books/unread", get(queries::unread_books)),
        (
            "/api/authors",
            get(queries::authors_by_name).post(authors::create_author),
        ),
        (
            "/api/authors/{id}",
            put(authors::update_author).delete(authors::delete_author),
        ),
        ("/api/authors{id}", put(authors::update_author)),
    ]
}

pub fn router(db: DbPool) -> Router {
    let table = route_table();
    tracing::info!(target: "catalog::routes", routes = table.len(), "catalog routes registered");

    table
        .into_iter()
        .fold(Router::new(), |router, (path, handlers)| router.route(path, handlers))
        .with_state(db)
}

async fn health_check() -> &'static str {
    "catalog module is healthy"
}
