//! Books table sink
//!
//! Uniqueness of (author, title, year) is enforced by the table. Inserts and
//! updates check for an existing row first, and a constraint violation that
//! slips past the check (a concurrent writer) is reported the same way.

use serde_json::Value;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use super::SaveOutcome;
use crate::models::{Book, BookRecord};
use crate::{Error, Result};

const SELECT_BOOK: &str =
    "SELECT id, author, title, pages, year, genre, created_at, updated_at FROM books";

#[derive(Debug, Clone)]
pub struct BookTable {
    pool: SqlitePool,
}

impl BookTable {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Id of the row holding `(author, title, year)`, ignoring `exclude_id`
    pub async fn find_by_key(
        &self,
        author: &str,
        title: &str,
        year: i64,
        exclude_id: Option<i64>,
    ) -> Result<Option<i64>> {
        let id: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT id FROM books
            WHERE author = ? AND title = ? AND year = ? AND (? IS NULL OR id != ?)
            LIMIT 1
            "#,
        )
        .bind(author)
        .bind(title)
        .bind(year)
        .bind(exclude_id)
        .bind(exclude_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(id)
    }

    /// Insert a record unless its natural key is already taken
    pub async fn insert_unique(&self, record: &BookRecord) -> Result<SaveOutcome> {
        let (author, title, year) = record.natural_key();
        if self.find_by_key(author, title, year, None).await?.is_some() {
            return Ok(SaveOutcome::DuplicateSkipped);
        }

        let result = sqlx::query(
            r#"
            INSERT INTO books (author, title, pages, year, genre, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
            "#,
        )
        .bind(author)
        .bind(title)
        .bind(record.pages)
        .bind(year)
        .bind(&record.genre)
        .execute(&self.pool)
        .await
        .map_err(Error::from);

        match result {
            Ok(done) => {
                debug!("Inserted book row {}", done.last_insert_rowid());
                Ok(SaveOutcome::Saved)
            }
            Err(e) if e.is_unique_violation() => {
                warn!("Concurrent insert of ({:?}, {:?}, {}) detected", author, title, year);
                Ok(SaveOutcome::DuplicateSkipped)
            }
            Err(e) => Err(e),
        }
    }

    /// All rows, newest first
    pub async fn list_all(&self) -> Result<Vec<Book>> {
        let rows = sqlx::query(&format!("{} ORDER BY created_at DESC, id DESC", SELECT_BOOK))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(Book::from_row).collect())
    }

    /// Rows whose author, title or genre contains `query`, ignoring case
    ///
    /// Matching happens here rather than in SQL because SQLite's `LIKE` and
    /// `lower()` only fold ASCII. An empty query returns every row.
    pub async fn search(&self, query: &str) -> Result<Vec<Book>> {
        let books = self.list_all().await?;
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(books);
        }

        let contains = |haystack: &str| haystack.to_lowercase().contains(&needle);
        Ok(books
            .into_iter()
            .filter(|b| {
                contains(b.record.author.as_str())
                    || contains(b.record.title.as_str())
                    || b.record.genre.as_deref().is_some_and(contains)
            })
            .collect())
    }

    pub async fn get(&self, id: i64) -> Result<Option<Book>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_BOOK))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(Book::from_row))
    }

    /// Delete a row by id
    pub async fn delete(&self, id: i64) -> Result<()> {
        let done = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if done.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Book {} not found", id)));
        }
        info!("Deleted book {}", id);
        Ok(())
    }

    /// Replace a row's fields, refusing natural-key collisions with other rows
    pub async fn update(&self, id: i64, record: &BookRecord) -> Result<Book> {
        if self.get(id).await?.is_none() {
            return Err(Error::NotFound(format!("Book {} not found", id)));
        }

        let (author, title, year) = record.natural_key();
        if self.find_by_key(author, title, year, Some(id)).await?.is_some() {
            return Err(conflict(record));
        }

        let result = sqlx::query(
            r#"
            UPDATE books
            SET author = ?, title = ?, pages = ?, year = ?, genre = ?,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
        )
        .bind(author)
        .bind(title)
        .bind(record.pages)
        .bind(year)
        .bind(&record.genre)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::from);

        match result {
            Ok(done) if done.rows_affected() == 0 => {
                Err(Error::NotFound(format!("Book {} not found", id)))
            }
            Ok(_) => {
                info!("Updated book {}", id);
                self.get(id)
                    .await?
                    .ok_or_else(|| Error::NotFound(format!("Book {} not found", id)))
            }
            Err(e) if e.is_unique_violation() => Err(conflict(record)),
            Err(e) => Err(e),
        }
    }
}

fn conflict(record: &BookRecord) -> Error {
    Error::Conflict(format!(
        "A book \"{}\" by {} ({}) already exists",
        record.title, record.author, record.year
    ))
}

/// Parse the JSON body of an update request
///
/// `author` and `title` must be non-empty strings; `pages` and `year` must be
/// integers (or strings holding integers) of at least 1. `genre` is optional.
pub fn parse_update_body(body: &Value) -> Result<BookRecord> {
    let text = |key: &str| {
        body.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let (author, title) = match (text("author"), text("title")) {
        (Some(author), Some(title)) => (author, title),
        _ => {
            return Err(Error::InvalidInput(
                "Author and title must not be empty".to_string(),
            ))
        }
    };

    let (pages, year) = match (coerce_int(body.get("pages")), coerce_int(body.get("year"))) {
        (Some(pages), Some(year)) if pages >= 1 && year >= 1 => (pages, year),
        (Some(_), Some(_)) => {
            return Err(Error::InvalidInput(
                "Pages and year must be at least 1".to_string(),
            ))
        }
        _ => {
            return Err(Error::InvalidInput(
                "Pages and year must be integers".to_string(),
            ))
        }
    };

    Ok(BookRecord {
        author,
        title,
        pages,
        year,
        genre: text("genre"),
    })
}

fn coerce_int(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
