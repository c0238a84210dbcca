pub mod models;
pub mod routes;
pub mod store;

use async_trait::async_trait;
use axum::Router;
use catalog_kernel::{DbPool, InitCtx, Migration, Module};
use serde_json::json;

/// Languages, authors and books, served under `/api`.
pub struct CatalogModule;

impl CatalogModule {
    pub const fn new() -> Self {
        Self
    }
}

impl Default for CatalogModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Module for CatalogModule {
    fn name(&self) -> &'static str {
        "catalog"
    }

    /// The catalog owns the `/api` root, so its routes carry full paths.
    fn mount_path(&self) -> Option<String> {
        None
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let (books,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM books")
            .fetch_one(ctx.db)
            .await?;
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            books,
            "catalog module initialized"
        );
        Ok(())
    }

    fn routes(&self, db: &DbPool) -> Router {
        routes::router(db.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(openapi())
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_init",
            up: r#"
                CREATE TABLE languages (
                    id   INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL
                );
                CREATE INDEX languages_name ON languages (name);

                CREATE TABLE authors (
                    id        INTEGER PRIMARY KEY AUTOINCREMENT,
                    name      TEXT NOT NULL,
                    birthday  TEXT NOT NULL,
                    biography TEXT NOT NULL
                );
                CREATE INDEX authors_name ON authors (name);

                CREATE TABLE books (
                    id          INTEGER PRIMARY KEY AUTOINCREMENT,
                    name        TEXT NOT NULL,
                    year        INTEGER NOT NULL,
                    is_readied  BOOLEAN NOT NULL DEFAULT 0,
                    language_id INTEGER NOT NULL REFERENCES languages (id)
                );
                CREATE INDEX books_name ON books (name);
                CREATE INDEX books_language ON books (language_id);

                CREATE TABLE author_languages (
                    author_id   INTEGER NOT NULL REFERENCES authors (id) ON DELETE CASCADE,
                    language_id INTEGER NOT NULL REFERENCES languages (id) ON DELETE CASCADE,
                    position    INTEGER NOT NULL,
                    PRIMARY KEY (author_id, language_id)
                );

                CREATE TABLE book_authors (
                    book_id   INTEGER NOT NULL REFERENCES books (id) ON DELETE CASCADE,
                    author_id INTEGER NOT NULL REFERENCES authors (id) ON DELETE CASCADE,
                    position  INTEGER NOT NULL,
                    PRIMARY KEY (book_id, author_id)
                );
                CREATE INDEX book_authors_author ON book_authors (author_id);
                "#,
        }]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "catalog module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "catalog module stopped");
        Ok(())
    }
}

fn json_response(description: &str, schema: serde_json::Value) -> serde_json::Value {
    json!({
        "description": description,
        "content": { "application/json": { "schema": schema } }
    })
}

fn error_response(description: &str) -> serde_json::Value {
    json_response(description, json!({ "$ref": "#/components/schemas/ErrorResponse" }))
}

fn query_param(name: &str, schema_type: &str, required: bool) -> serde_json::Value {
    json!({
        "name": name,
        "in": "query",
        "required": required,
        "schema": { "type": schema_type }
    })
}

fn id_param() -> serde_json::Value {
    json!({
        "name": "id",
        "in": "path",
        "required": true,
        "schema": { "type": "integer", "format": "int64" }
    })
}

fn request_body(schema: &str) -> serde_json::Value {
    json!({
        "required": true,
        "content": {
            "application/json": {
                "schema": { "$ref": format!("#/components/schemas/{}", schema) }
            }
        }
    })
}

fn book_list() -> serde_json::Value {
    json!({ "type": "array", "items": { "$ref": "#/components/schemas/Book" } })
}

fn status_body() -> serde_json::Value {
    json!({ "$ref": "#/components/schemas/Status" })
}

/// OpenAPI fragment describing the catalog routes.
fn openapi() -> serde_json::Value {
    let mut doc = openapi_paths();
    for (alias, canonical) in [
        ("/api/book{id}", "/api/books/{id}"),
        ("/api/authors{id}", "/api/authors/{id}"),
    ] {
        let update = doc["paths"][canonical]["put"].clone();
        doc["paths"][alias] = json!({ "put": update });
    }
    doc
}

fn openapi_paths() -> serde_json::Value {
    let book = json!({ "$ref": "#/components/schemas/Book" });
    let author = json!({ "$ref": "#/components/schemas/Author" });
    let author_list = json!({ "type": "array", "items": author.clone() });
    let name_list = json!({ "type": "array", "items": { "type": "string" } });

    json!({
        "paths": {
            "/api/": {
                "get": {
                    "summary": "Catalog split into unread and readied books",
                    "tags": ["Catalog"],
                    "responses": {
                        "200": json_response("Catalog listing", json!({ "$ref": "#/components/schemas/CatalogListing" })),
                        "500": json_response("Store failure", status_body())
                    }
                }
            },
            "/api/health": {
                "get": {
                    "summary": "Catalog health check",
                    "tags": ["Catalog"],
                    "responses": {
                        "200": {
                            "description": "OK",
                            "content": { "text/plain": { "schema": { "type": "string" } } }
                        }
                    }
                }
            },
            "/api/language/": {
                "post": {
                    "summary": "Create a language",
                    "tags": ["Languages"],
                    "requestBody": request_body("CreateLanguage"),
                    "responses": {
                        "200": json_response("Created", status_body()),
                        "400": error_response("Malformed body")
                    }
                }
            },
            "/api/books": {
                "get": {
                    "summary": "Books with exactly this name",
                    "tags": ["Books"],
                    "parameters": [query_param("book_name", "string", true)],
                    "responses": { "200": json_response("Matching books", book_list()) }
                },
                "post": {
                    "summary": "Create a book",
                    "tags": ["Books"],
                    "requestBody": request_body("CreateBook"),
                    "responses": {
                        "200": json_response("Created book", book.clone()),
                        "400": error_response("Malformed body or empty author list"),
                        "404": error_response("Language or author not found"),
                        "409": error_response("Language or author name is ambiguous")
                    }
                }
            },
            "/api/books/{id}": {
                "put": {
                    "summary": "Update a book; a supplied author list replaces the current one",
                    "tags": ["Books"],
                    "parameters": [id_param()],
                    "requestBody": request_body("BookPatch"),
                    "responses": {
                        "200": json_response("Updated book", book.clone()),
                        "404": error_response("Book, language or author not found"),
                        "409": error_response("Language or author name is ambiguous")
                    }
                },
                "delete": {
                    "summary": "Delete a book",
                    "tags": ["Books"],
                    "parameters": [id_param()],
                    "responses": {
                        "200": json_response("Deleted", status_body()),
                        "404": json_response("Book not found", status_body())
                    }
                }
            },
            "/api/books/author/": {
                "get": {
                    "summary": "Books by an author, optionally narrowed by language and read status",
                    "tags": ["Books"],
                    "parameters": [
                        query_param("author_name", "string", true),
                        query_param("lang", "string", false),
                        query_param("is_readied", "boolean", false)
                    ],
                    "responses": { "200": json_response("Matching books; empty when a name does not resolve", book_list()) }
                }
            },
            "/api/books/readied": {
                "get": {
                    "summary": "Books already read",
                    "tags": ["Books"],
                    "responses": { "200": json_response("Readied books", book_list()) }
                }
            },
            "/api/books/unread": {
                "get": {
                    "summary": "Books not read yet, optionally in one language",
                    "tags": ["Books"],
                    "parameters": [query_param("lang", "string", false)],
                    "responses": { "200": json_response("Unread books", book_list()) }
                }
            },
            "/api/authors": {
                "get": {
                    "summary": "Authors with exactly this name",
                    "tags": ["Authors"],
                    "parameters": [query_param("author_name", "string", true)],
                    "responses": { "200": json_response("Matching authors", author_list) }
                },
                "post": {
                    "summary": "Create an author",
                    "tags": ["Authors"],
                    "requestBody": request_body("CreateAuthor"),
                    "responses": {
                        "200": json_response("Created author", author.clone()),
                        "400": error_response("Malformed body or empty language list"),
                        "404": error_response("Language not found"),
                        "409": error_response("Language name is ambiguous")
                    }
                }
            },
            "/api/authors/{id}": {
                "put": {
                    "summary": "Update an author; a supplied language list replaces the current one",
                    "tags": ["Authors"],
                    "parameters": [id_param()],
                    "requestBody": request_body("AuthorPatch"),
                    "responses": {
                        "200": json_response("Updated author", author),
                        "404": error_response("Author or language not found")
                    }
                },
                "delete": {
                    "summary": "Delete an author; linked books are kept",
                    "tags": ["Authors"],
                    "parameters": [id_param()],
                    "responses": {
                        "200": json_response("Deleted", status_body()),
                        "404": json_response("Author not found", status_body())
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Status": {
                    "type": "object",
                    "properties": { "status": { "type": "string" } },
                    "required": ["status"]
                },
                "Book": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "integer", "format": "int64" },
                        "name": { "type": "string" },
                        "year": { "type": "integer" },
                        "is_readied": { "type": "boolean" },
                        "language_id": { "type": "integer", "format": "int64" },
                        "language": { "type": "string", "description": "Language name" },
                        "authors": name_list.clone()
                    },
                    "required": ["id", "name", "year", "is_readied", "language_id", "language", "authors"]
                },
                "Author": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "integer", "format": "int64" },
                        "name": { "type": "string" },
                        "birthday": { "type": "string", "format": "date" },
                        "biography": { "type": "string" },
                        "languages": name_list.clone(),
                        "books": name_list.clone()
                    },
                    "required": ["id", "name", "birthday", "biography", "languages", "books"]
                },
                "BookSummary": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "year": { "type": "integer" },
                        "language": { "type": "string" },
                        "authors": name_list.clone()
                    }
                },
                "CatalogListing": {
                    "type": "object",
                    "properties": {
                        "unread books": { "type": "array", "items": { "$ref": "#/components/schemas/BookSummary" } },
                        "readied books": { "type": "array", "items": { "$ref": "#/components/schemas/BookSummary" } }
                    }
                },
                "CreateLanguage": {
                    "type": "object",
                    "properties": { "name": { "type": "string" } },
                    "required": ["name"]
                },
                "CreateBook": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "year": { "type": "integer" },
                        "language": { "type": "string" },
                        "is_readied": { "type": "boolean" },
                        "authors": name_list.clone()
                    },
                    "required": ["name", "year", "language", "is_readied", "authors"]
                },
                "BookPatch": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "language": { "type": "string" },
                        "year": { "type": "integer" },
                        "is_readied": { "type": "boolean" },
                        "authors": name_list.clone()
                    }
                },
                "CreateAuthor": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "birthday": { "type": "string", "format": "date" },
                        "biography": { "type": "string" },
                        "languages": name_list.clone()
                    },
                    "required": ["name", "birthday", "biography", "languages"]
                },
                "AuthorPatch": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "birthday": { "type": "string", "format": "date" },
                        "biography": { "type": "string" },
                        "languages": name_list
                    }
                }
            }
        }
    })
}

/// Create a new instance of the catalog module
pub fn create_module() -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(CatalogModule::new())
}

/// In-memory pool with the catalog schema applied.
#[cfg(test)]
pub(crate) async fn test_pool() -> DbPool {
    let pool = catalog_db::connect_in_memory().await.unwrap();
    let migrations: Vec<(String, Migration)> = CatalogModule::new()
        .migrations()
        .into_iter()
        .map(|m| ("catalog".to_string(), m))
        .collect();
    catalog_db::apply_migrations(&pool, &migrations).await.unwrap();
    pool
}
