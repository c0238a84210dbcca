//! Catalog queries. Every function runs on the caller's connection, so a
//! handler's whole sequence of lookups and writes shares one transaction.

use std::fmt;

use axum::http::StatusCode;
use catalog_http::AppError;
use serde_json::json;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use thiserror::Error;

use super::models::{
    AuthorPatch, AuthorRecord, AuthorView, BookPatch, BookRecord, BookView, CreateAuthor,
    CreateBook, Language,
};

const BOOK_SELECT: &str = "SELECT b.id, b.name, b.year, b.is_readied, b.language_id, l.name AS language
     FROM books b
     JOIN languages l ON l.id = b.language_id";

const AUTHOR_SELECT: &str = "SELECT id, name, birthday, biography FROM authors";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Language,
    Author,
    Book,
}

impl Entity {
    fn table(self) -> &'static str {
        match self {
            Entity::Language => "languages",
            Entity::Author => "authors",
            Entity::Book => "books",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Entity::Language => "language",
            Entity::Author => "author",
            Entity::Book => "book",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{entity} '{key}' not found")]
    NotFound { entity: Entity, key: String },

    #[error("{entity} '{key}' matches more than one record")]
    Ambiguous { entity: Entity, key: String },

    #[error("{0}")]
    Validation(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl CatalogError {
    /// The lookup did not resolve to exactly one record.
    pub fn is_unresolved(&self) -> bool {
        matches!(
            self,
            CatalogError::NotFound { .. } | CatalogError::Ambiguous { .. }
        )
    }

    pub fn status(&self) -> StatusCode {
        match self {
            CatalogError::NotFound { .. } => StatusCode::NOT_FOUND,
            CatalogError::Ambiguous { .. } => StatusCode::CONFLICT,
            CatalogError::Validation(_) => StatusCode::BAD_REQUEST,
            CatalogError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound { .. } => AppError::not_found(err.to_string()),
            CatalogError::Ambiguous { entity, ref key } => AppError::conflict(
                vec![json!({ "entity": entity.to_string(), "name": key })],
                err.to_string(),
            ),
            CatalogError::Validation(message) => AppError::validation(vec![], message),
            CatalogError::Database(e) => AppError::from(e),
        }
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Resolve `name` to the id of the single row of `entity` carrying it.
pub async fn resolve_name(
    conn: &mut SqliteConnection,
    entity: Entity,
    name: &str,
) -> CatalogResult<i64> {
    let sql = format!(
        "SELECT id FROM {} WHERE name = ? ORDER BY id LIMIT 2",
        entity.table()
    );
    let ids: Vec<(i64,)> = sqlx::query_as(&sql)
        .bind(name)
        .fetch_all(&mut *conn)
        .await?;

    match ids.as_slice() {
        [(id,)] => Ok(*id),
        [] => Err(CatalogError::NotFound {
            entity,
            key: name.to_string(),
        }),
        _ => Err(CatalogError::Ambiguous {
            entity,
            key: name.to_string(),
        }),
    }
}

/// Resolve every name; the first unresolvable one fails the whole call.
pub async fn resolve_names(
    conn: &mut SqliteConnection,
    entity: Entity,
    names: &[String],
) -> CatalogResult<Vec<i64>> {
    let mut ids = Vec::with_capacity(names.len());
    for name in names {
        ids.push(resolve_name(conn, entity, name).await?);
    }
    Ok(ids)
}

// ============================================================================
// Languages
// ============================================================================

pub async fn insert_language(conn: &mut SqliteConnection, name: &str) -> CatalogResult<Language> {
    let language = sqlx::query_as::<_, Language>(
        "INSERT INTO languages (name) VALUES (?) RETURNING id, name",
    )
    .bind(name)
    .fetch_one(&mut *conn)
    .await?;
    Ok(language)
}

// ============================================================================
// Books
// ============================================================================

pub async fn create_book(conn: &mut SqliteConnection, book: &CreateBook) -> CatalogResult<i64> {
    if book.authors.is_empty() {
        return Err(CatalogError::Validation(
            "a book needs at least one author".to_string(),
        ));
    }

    let language_id = resolve_name(conn, Entity::Language, &book.language).await?;
    let author_ids = resolve_names(conn, Entity::Author, &book.authors).await?;

    let result = sqlx::query(
        "INSERT INTO books (name, year, is_readied, language_id) VALUES (?, ?, ?, ?)",
    )
    .bind(&book.name)
    .bind(book.year)
    .bind(book.is_readied)
    .bind(language_id)
    .execute(&mut *conn)
    .await?;

    let book_id = result.last_insert_rowid();
    set_book_authors(conn, book_id, &author_ids).await?;
    Ok(book_id)
}

/// Replace the book's author set with exactly `author_ids`.
pub async fn set_book_authors(
    conn: &mut SqliteConnection,
    book_id: i64,
    author_ids: &[i64],
) -> CatalogResult<()> {
    sqlx::query("DELETE FROM book_authors WHERE book_id = ?")
        .bind(book_id)
        .execute(&mut *conn)
        .await?;

    for (position, &author_id) in author_ids.iter().enumerate() {
        sqlx::query(
            "INSERT OR IGNORE INTO book_authors (book_id, author_id, position) VALUES (?, ?, ?)",
        )
        .bind(book_id)
        .bind(author_id)
        .bind(position as i64)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub async fn update_book(
    conn: &mut SqliteConnection,
    book_id: i64,
    patch: &BookPatch,
) -> CatalogResult<()> {
    let mut book = fetch_book(conn, book_id).await?;

    // Resolve everything before writing so a bad name leaves the book as it was.
    let language_id = match &patch.language {
        Some(name) => Some(resolve_name(conn, Entity::Language, name).await?),
        None => None,
    };
    let author_ids = match &patch.authors {
        Some(names) => Some(resolve_names(conn, Entity::Author, names).await?),
        None => None,
    };

    if let Some(name) = &patch.name {
        book.name = name.clone();
    }
    if let Some(year) = patch.year {
        book.year = year;
    }
    if let Some(is_readied) = patch.is_readied {
        book.is_readied = is_readied;
    }
    if let Some(language_id) = language_id {
        book.language_id = language_id;
    }

    sqlx::query("UPDATE books SET name = ?, year = ?, is_readied = ?, language_id = ? WHERE id = ?")
        .bind(&book.name)
        .bind(book.year)
        .bind(book.is_readied)
        .bind(book.language_id)
        .bind(book_id)
        .execute(&mut *conn)
        .await?;

    if let Some(author_ids) = author_ids {
        set_book_authors(conn, book_id, &author_ids).await?;
    }
    Ok(())
}

/// Delete the book; its author links go with it.
pub async fn delete_book(conn: &mut SqliteConnection, book_id: i64) -> CatalogResult<()> {
    let result = sqlx::query("DELETE FROM books WHERE id = ?")
        .bind(book_id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(CatalogError::NotFound {
            entity: Entity::Book,
            key: book_id.to_string(),
        });
    }
    Ok(())
}

async fn fetch_book(conn: &mut SqliteConnection, book_id: i64) -> CatalogResult<BookRecord> {
    let sql = format!("{} WHERE b.id = ?", BOOK_SELECT);
    sqlx::query_as::<_, BookRecord>(&sql)
        .bind(book_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| CatalogError::NotFound {
            entity: Entity::Book,
            key: book_id.to_string(),
        })
}

pub async fn book_view(conn: &mut SqliteConnection, book_id: i64) -> CatalogResult<BookView> {
    let record = fetch_book(conn, book_id).await?;
    with_authors(conn, record).await
}

async fn with_authors(conn: &mut SqliteConnection, record: BookRecord) -> CatalogResult<BookView> {
    let authors: Vec<(String,)> = sqlx::query_as(
        "SELECT a.name FROM book_authors ba
         JOIN authors a ON a.id = ba.author_id
         WHERE ba.book_id = ?
         ORDER BY ba.position",
    )
    .bind(record.id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(BookView {
        id: record.id,
        name: record.name,
        year: record.year,
        is_readied: record.is_readied,
        language_id: record.language_id,
        language: record.language,
        authors: authors.into_iter().map(|(name,)| name).collect(),
    })
}

/// Conditions a book must meet; unset fields do not narrow the result.
#[derive(Debug, Clone, Default)]
pub struct BookFilter {
    pub name: Option<String>,
    pub author_id: Option<i64>,
    pub language_id: Option<i64>,
    pub is_readied: Option<bool>,
}

/// Books matching every condition of `filter`, ordered by id.
pub async fn find_books(
    conn: &mut SqliteConnection,
    filter: &BookFilter,
) -> CatalogResult<Vec<BookView>> {
    let mut query = QueryBuilder::<Sqlite>::new(BOOK_SELECT);
    query.push(" WHERE 1 = 1");

    if let Some(name) = &filter.name {
        query.push(" AND b.name = ").push_bind(name.clone());
    }
    if let Some(author_id) = filter.author_id {
        query
            .push(" AND EXISTS (SELECT 1 FROM book_authors ba WHERE ba.book_id = b.id AND ba.author_id = ")
            .push_bind(author_id)
            .push(")");
    }
    if let Some(language_id) = filter.language_id {
        query.push(" AND b.language_id = ").push_bind(language_id);
    }
    if let Some(is_readied) = filter.is_readied {
        query.push(" AND b.is_readied = ").push_bind(is_readied);
    }
    query.push(" ORDER BY b.id");

    let records: Vec<BookRecord> = query.build_query_as().fetch_all(&mut *conn).await?;

    let mut books = Vec::with_capacity(records.len());
    for record in records {
        books.push(with_authors(conn, record).await?);
    }
    Ok(books)
}

// ============================================================================
// Authors
// ============================================================================

pub async fn create_author(
    conn: &mut SqliteConnection,
    author: &CreateAuthor,
) -> CatalogResult<i64> {
    if author.languages.is_empty() {
        return Err(CatalogError::Validation(
            "an author needs at least one language".to_string(),
        ));
    }

    let language_ids = resolve_names(conn, Entity::Language, &author.languages).await?;

    let result = sqlx::query("INSERT INTO authors (name, birthday, biography) VALUES (?, ?, ?)")
        .bind(&author.name)
        .bind(author.birthday)
        .bind(&author.biography)
        .execute(&mut *conn)
        .await?;

    let author_id = result.last_insert_rowid();
    set_author_languages(conn, author_id, &language_ids).await?;
    Ok(author_id)
}

/// Replace the author's language set with exactly `language_ids`.
pub async fn set_author_languages(
    conn: &mut SqliteConnection,
    author_id: i64,
    language_ids: &[i64],
) -> CatalogResult<()> {
    sqlx::query("DELETE FROM author_languages WHERE author_id = ?")
        .bind(author_id)
        .execute(&mut *conn)
        .await?;

    for (position, &language_id) in language_ids.iter().enumerate() {
        sqlx::query(
            "INSERT OR IGNORE INTO author_languages (author_id, language_id, position) VALUES (?, ?, ?)",
        )
        .bind(author_id)
        .bind(language_id)
        .bind(position as i64)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub async fn update_author(
    conn: &mut SqliteConnection,
    author_id: i64,
    patch: &AuthorPatch,
) -> CatalogResult<()> {
    let mut author = fetch_author(conn, author_id).await?;

    let language_ids = match &patch.languages {
        Some(names) if names.is_empty() => {
            return Err(CatalogError::Validation(
                "an author needs at least one language".to_string(),
            ));
        }
        Some(names) => Some(resolve_names(conn, Entity::Language, names).await?),
        None => None,
    };

    if let Some(name) = &patch.name {
        author.name = name.clone();
    }
    if let Some(birthday) = patch.birthday {
        author.birthday = birthday;
    }
    if let Some(biography) = &patch.biography {
        author.biography = biography.clone();
    }

    sqlx::query("UPDATE authors SET name = ?, birthday = ?, biography = ? WHERE id = ?")
        .bind(&author.name)
        .bind(author.birthday)
        .bind(&author.biography)
        .bind(author_id)
        .execute(&mut *conn)
        .await?;

    if let Some(language_ids) = language_ids {
        set_author_languages(conn, author_id, &language_ids).await?;
    }
    Ok(())
}

/// Delete the author and its book and language links. Books stay.
pub async fn delete_author(conn: &mut SqliteConnection, author_id: i64) -> CatalogResult<()> {
    let result = sqlx::query("DELETE FROM authors WHERE id = ?")
        .bind(author_id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(CatalogError::NotFound {
            entity: Entity::Author,
            key: author_id.to_string(),
        });
    }
    Ok(())
}

async fn fetch_author(conn: &mut SqliteConnection, author_id: i64) -> CatalogResult<AuthorRecord> {
    let sql = format!("{} WHERE id = ?", AUTHOR_SELECT);
    sqlx::query_as::<_, AuthorRecord>(&sql)
        .bind(author_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| CatalogError::NotFound {
            entity: Entity::Author,
            key: author_id.to_string(),
        })
}

pub async fn author_view(conn: &mut SqliteConnection, author_id: i64) -> CatalogResult<AuthorView> {
    let record = fetch_author(conn, author_id).await?;
    with_links(conn, record).await
}

async fn with_links(conn: &mut SqliteConnection, record: AuthorRecord) -> CatalogResult<AuthorView> {
    let languages: Vec<(String,)> = sqlx::query_as(
        "SELECT l.name FROM author_languages al
         JOIN languages l ON l.id = al.language_id
         WHERE al.author_id = ?
         ORDER BY al.position",
    )
    .bind(record.id)
    .fetch_all(&mut *conn)
    .await?;

    let books: Vec<(String,)> = sqlx::query_as(
        "SELECT b.name FROM book_authors ba
         JOIN books b ON b.id = ba.book_id
         WHERE ba.author_id = ?
         ORDER BY b.id",
    )
    .bind(record.id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(AuthorView {
        id: record.id,
        name: record.name,
        birthday: record.birthday,
        biography: record.biography,
        languages: languages.into_iter().map(|(name,)| name).collect(),
        books: books.into_iter().map(|(name,)| name).collect(),
    })
}

/// Authors whose name is exactly `name`, ordered by id.
pub async fn find_authors_by_name(
    conn: &mut SqliteConnection,
    name: &str,
) -> CatalogResult<Vec<AuthorView>> {
    let sql = format!("{} WHERE name = ? ORDER BY id", AUTHOR_SELECT);
    let records: Vec<AuthorRecord> = sqlx::query_as(&sql)
        .bind(name)
        .fetch_all(&mut *conn)
        .await?;

    let mut authors = Vec::with_capacity(records.len());
    for record in records {
        authors.push(with_links(conn, record).await?);
    }
    Ok(authors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::catalog::test_pool;
    use catalog_kernel::DbPool;
    use chrono::NaiveDate;
    use sqlx::pool::PoolConnection;

    async fn conn(pool: &DbPool) -> PoolConnection<Sqlite> {
        pool.acquire().await.unwrap()
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    async fn author(conn: &mut SqliteConnection, name: &str, languages: &[&str]) -> i64 {
        create_author(
            conn,
            &CreateAuthor {
                name: name.to_string(),
                birthday: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
                biography: "b".to_string(),
                languages: names(languages),
            },
        )
        .await
        .unwrap()
    }

    async fn book(
        conn: &mut SqliteConnection,
        name: &str,
        language: &str,
        is_readied: bool,
        authors: &[&str],
    ) -> CatalogResult<i64> {
        create_book(
            conn,
            &CreateBook {
                name: name.to_string(),
                year: 2020,
                language: language.to_string(),
                is_readied,
                authors: names(authors),
            },
        )
        .await
    }

    async fn book_count(conn: &mut SqliteConnection) -> i64 {
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM books")
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        n
    }

    #[tokio::test]
    async fn book_with_unknown_language_is_not_created() {
        let pool = test_pool().await;
        let mut conn = conn(&pool).await;
        insert_language(&mut conn, "English").await.unwrap();
        author(&mut conn, "A", &["English"]).await;

        let err = book(&mut conn, "B1", "Klingon", false, &["A"]).await.unwrap_err();
        assert!(matches!(
            err,
            CatalogError::NotFound {
                entity: Entity::Language,
                ..
            }
        ));
        assert_eq!(book_count(&mut conn).await, 0);
    }

    #[tokio::test]
    async fn duplicate_language_names_are_ambiguous() {
        let pool = test_pool().await;
        let mut conn = conn(&pool).await;
        insert_language(&mut conn, "English").await.unwrap();
        insert_language(&mut conn, "French").await.unwrap();
        author(&mut conn, "A", &["French"]).await;
        insert_language(&mut conn, "English").await.unwrap();

        let err = book(&mut conn, "B1", "English", false, &["A"]).await.unwrap_err();
        assert!(matches!(err, CatalogError::Ambiguous { .. }));
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(book_count(&mut conn).await, 0);
    }

    #[tokio::test]
    async fn unknown_author_fails_whole_creation() {
        let pool = test_pool().await;
        let mut conn = conn(&pool).await;
        insert_language(&mut conn, "English").await.unwrap();
        author(&mut conn, "A", &["English"]).await;

        let err = book(&mut conn, "B1", "English", false, &["A", "Nobody"])
            .await
            .unwrap_err();
        assert!(err.is_unresolved());
        assert_eq!(book_count(&mut conn).await, 0);
    }

    #[tokio::test]
    async fn book_requires_authors() {
        let pool = test_pool().await;
        let mut conn = conn(&pool).await;
        insert_language(&mut conn, "English").await.unwrap();

        let err = book(&mut conn, "B1", "English", false, &[]).await.unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
    }

    #[tokio::test]
    async fn year_only_update_leaves_everything_else() {
        let pool = test_pool().await;
        let mut conn = conn(&pool).await;
        insert_language(&mut conn, "English").await.unwrap();
        author(&mut conn, "A", &["English"]).await;
        author(&mut conn, "B", &["English"]).await;
        let id = book(&mut conn, "Dune", "English", true, &["A", "B"]).await.unwrap();
        let before = book_view(&mut conn, id).await.unwrap();

        let patch = BookPatch {
            year: Some(1965),
            ..BookPatch::default()
        };
        update_book(&mut conn, id, &patch).await.unwrap();

        let after = book_view(&mut conn, id).await.unwrap();
        assert_eq!(after.year, 1965);
        assert_eq!(
            BookView {
                year: before.year,
                ..after
            },
            before
        );
    }

    #[tokio::test]
    async fn author_list_is_replaced_not_merged() {
        let pool = test_pool().await;
        let mut conn = conn(&pool).await;
        insert_language(&mut conn, "English").await.unwrap();
        for name in ["A", "B", "C"] {
            author(&mut conn, name, &["English"]).await;
        }
        let id = book(&mut conn, "B1", "English", false, &["A", "B"]).await.unwrap();

        let patch = BookPatch {
            authors: Some(names(&["C", "A"])),
            ..BookPatch::default()
        };
        update_book(&mut conn, id, &patch).await.unwrap();
        assert_eq!(book_view(&mut conn, id).await.unwrap().authors, names(&["C", "A"]));

        let clear = BookPatch {
            authors: Some(vec![]),
            ..BookPatch::default()
        };
        update_book(&mut conn, id, &clear).await.unwrap();
        assert!(book_view(&mut conn, id).await.unwrap().authors.is_empty());
    }

    #[tokio::test]
    async fn failed_update_rolls_back_with_the_transaction() {
        let pool = test_pool().await;
        let id = {
            let mut conn = conn(&pool).await;
            insert_language(&mut conn, "English").await.unwrap();
            author(&mut conn, "A", &["English"]).await;
            book(&mut conn, "B1", "English", false, &["A"]).await.unwrap()
        };

        {
            let mut tx = pool.begin().await.unwrap();
            let patch = BookPatch {
                name: Some("Renamed".to_string()),
                authors: Some(names(&["Ghost"])),
                ..BookPatch::default()
            };
            let err = update_book(&mut tx, id, &patch).await.unwrap_err();
            assert!(err.is_unresolved());
        }

        let mut conn = conn(&pool).await;
        let view = book_view(&mut conn, id).await.unwrap();
        assert_eq!(view.name, "B1");
        assert_eq!(view.authors, names(&["A"]));
    }

    #[tokio::test]
    async fn updating_missing_book_is_not_found() {
        let pool = test_pool().await;
        let mut conn = conn(&pool).await;

        let err = update_book(&mut conn, 42, &BookPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CatalogError::NotFound {
                entity: Entity::Book,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn deleting_author_keeps_books_and_other_authors() {
        let pool = test_pool().await;
        let mut conn = conn(&pool).await;
        insert_language(&mut conn, "English").await.unwrap();
        let a = author(&mut conn, "A", &["English"]).await;
        author(&mut conn, "B", &["English"]).await;
        let id = book(&mut conn, "B1", "English", false, &["A", "B"]).await.unwrap();

        delete_author(&mut conn, a).await.unwrap();

        let view = book_view(&mut conn, id).await.unwrap();
        assert_eq!(view.authors, names(&["B"]));
        assert!(find_authors_by_name(&mut conn, "A").await.unwrap().is_empty());

        let err = delete_author(&mut conn, a).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn deleting_book_drops_its_links_only() {
        let pool = test_pool().await;
        let mut conn = conn(&pool).await;
        insert_language(&mut conn, "English").await.unwrap();
        author(&mut conn, "A", &["English"]).await;
        let id = book(&mut conn, "B1", "English", false, &["A"]).await.unwrap();

        delete_book(&mut conn, id).await.unwrap();

        assert_eq!(book_count(&mut conn).await, 0);
        let authors = find_authors_by_name(&mut conn, "A").await.unwrap();
        assert_eq!(authors.len(), 1);
        assert!(authors[0].books.is_empty());
        assert!(delete_book(&mut conn, id).await.is_err());
    }

    #[tokio::test]
    async fn name_lookup_is_exact() {
        let pool = test_pool().await;
        let mut conn = conn(&pool).await;
        insert_language(&mut conn, "English").await.unwrap();
        author(&mut conn, "A", &["English"]).await;
        for name in ["Dune", "Dune Messiah", "dune", "Dune"] {
            book(&mut conn, name, "English", false, &["A"]).await.unwrap();
        }

        let filter = BookFilter {
            name: Some("Dune".to_string()),
            ..BookFilter::default()
        };
        let found = find_books(&mut conn, &filter).await.unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|b| b.name == "Dune"));
    }

    #[tokio::test]
    async fn read_status_partitions_books() {
        let pool = test_pool().await;
        let mut conn = conn(&pool).await;
        insert_language(&mut conn, "English").await.unwrap();
        author(&mut conn, "A", &["English"]).await;
        book(&mut conn, "R1", "English", true, &["A"]).await.unwrap();
        book(&mut conn, "U1", "English", false, &["A"]).await.unwrap();
        book(&mut conn, "U2", "English", false, &["A"]).await.unwrap();

        let all = find_books(&mut conn, &BookFilter::default()).await.unwrap();
        let readied = find_books(
            &mut conn,
            &BookFilter {
                is_readied: Some(true),
                ..BookFilter::default()
            },
        )
        .await
        .unwrap();
        let unread = find_books(
            &mut conn,
            &BookFilter {
                is_readied: Some(false),
                ..BookFilter::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(readied.len() + unread.len(), all.len());
        assert!(readied.iter().all(|b| b.is_readied));
        assert!(unread.iter().all(|b| !b.is_readied));
        assert!(readied.iter().all(|r| unread.iter().all(|u| u.id != r.id)));
    }

    #[tokio::test]
    async fn author_filters_combine() {
        let pool = test_pool().await;
        let mut conn = conn(&pool).await;
        insert_language(&mut conn, "English").await.unwrap();
        insert_language(&mut conn, "French").await.unwrap();
        let a = author(&mut conn, "A", &["English", "French"]).await;
        author(&mut conn, "B", &["English"]).await;
        book(&mut conn, "E-read", "English", true, &["A"]).await.unwrap();
        book(&mut conn, "F-unread", "French", false, &["A"]).await.unwrap();
        book(&mut conn, "F-read", "French", true, &["A"]).await.unwrap();
        book(&mut conn, "Other", "French", true, &["B"]).await.unwrap();
        let french = resolve_name(&mut conn, Entity::Language, "French").await.unwrap();

        let names_of = |books: Vec<BookView>| books.into_iter().map(|b| b.name).collect::<Vec<_>>();
        let by = |language_id, is_readied| BookFilter {
            author_id: Some(a),
            language_id,
            is_readied,
            ..BookFilter::default()
        };

        assert_eq!(
            names_of(find_books(&mut conn, &by(None, None)).await.unwrap()),
            vec!["E-read", "F-unread", "F-read"]
        );
        assert_eq!(
            names_of(find_books(&mut conn, &by(Some(french), None)).await.unwrap()),
            vec!["F-unread", "F-read"]
        );
        assert_eq!(
            names_of(find_books(&mut conn, &by(None, Some(true))).await.unwrap()),
            vec!["E-read", "F-read"]
        );
        assert_eq!(
            names_of(find_books(&mut conn, &by(Some(french), Some(true))).await.unwrap()),
            vec!["F-read"]
        );
    }

    #[tokio::test]
    async fn author_languages_are_replaced_and_never_emptied() {
        let pool = test_pool().await;
        let mut conn = conn(&pool).await;
        insert_language(&mut conn, "English").await.unwrap();
        insert_language(&mut conn, "French").await.unwrap();
        let a = author(&mut conn, "A", &["English"]).await;

        let patch = AuthorPatch {
            languages: Some(names(&["French"])),
            biography: Some("updated".to_string()),
            ..AuthorPatch::default()
        };
        update_author(&mut conn, a, &patch).await.unwrap();
        let view = author_view(&mut conn, a).await.unwrap();
        assert_eq!(view.languages, names(&["French"]));
        assert_eq!(view.biography, "updated");
        assert_eq!(view.name, "A");

        let empty = AuthorPatch {
            languages: Some(vec![]),
            ..AuthorPatch::default()
        };
        let err = update_author(&mut conn, a, &empty).await.unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
    }
}
