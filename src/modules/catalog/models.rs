use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A language books are written in.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Language {
    pub id: i64,
    pub name: String,
}

/// Book row joined with its language name.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BookRecord {
    pub id: i64,
    pub name: String,
    pub year: i32,
    pub is_readied: bool,
    pub language_id: i64,
    pub language: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuthorRecord {
    pub id: i64,
    pub name: String,
    pub birthday: NaiveDate,
    pub biography: String,
}

/// Book as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookView {
    pub id: i64,
    pub name: String,
    pub year: i32,
    pub is_readied: bool,
    pub language_id: i64,
    /// Language name
    pub language: String,
    /// Author names in the order they were linked
    pub authors: Vec<String>,
}

/// Author as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorView {
    pub id: i64,
    pub name: String,
    pub birthday: NaiveDate,
    pub biography: String,
    pub languages: Vec<String>,
    /// Names of the books this author is linked to
    pub books: Vec<String>,
}

/// Short book entry used by the catalog listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSummary {
    pub name: String,
    pub year: i32,
    pub language: String,
    pub authors: Vec<String>,
}

impl From<BookView> for BookSummary {
    fn from(book: BookView) -> Self {
        Self {
            name: book.name,
            year: book.year,
            language: book.language,
            authors: book.authors,
        }
    }
}

/// Whole catalog split by read status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogListing {
    #[serde(rename = "unread books")]
    pub unread: Vec<BookSummary>,
    #[serde(rename = "readied books")]
    pub readied: Vec<BookSummary>,
}

/// Opaque status payload kept for the language, delete and listing endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusBody {
    pub status: String,
}

impl StatusBody {
    pub fn success() -> Self {
        Self {
            status: "success".to_string(),
        }
    }

    pub fn bad() -> Self {
        Self {
            status: "bad".to_string(),
        }
    }

    pub fn no_data() -> Self {
        Self {
            status: "no data to return".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateLanguage {
    #[serde(alias = "lang")]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBook {
    pub name: String,
    pub year: i32,
    #[serde(alias = "lang")]
    pub language: String,
    pub is_readied: bool,
    pub authors: Vec<String>,
}

/// Partial book update. An absent field is left untouched; a present
/// `authors` list replaces the whole association set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookPatch {
    pub name: Option<String>,
    #[serde(alias = "lang")]
    pub language: Option<String>,
    pub year: Option<i32>,
    pub authors: Option<Vec<String>>,
    pub is_readied: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAuthor {
    pub name: String,
    pub birthday: NaiveDate,
    pub biography: String,
    pub languages: Vec<String>,
}

/// Partial author update, same rules as [`BookPatch`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorPatch {
    pub name: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub biography: Option<String>,
    pub languages: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthorBooksQuery {
    pub author_name: String,
    pub lang: Option<String>,
    pub is_readied: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnreadBooksQuery {
    pub lang: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookNameQuery {
    pub book_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthorNameQuery {
    pub author_name: String,
}
