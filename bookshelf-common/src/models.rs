//! Book record models

use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

/// A validated book, independent of where it is stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRecord {
    pub author: String,
    pub title: String,
    pub pages: i64,
    pub year: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
}

impl BookRecord {
    /// Natural key enforced unique by the table sink
    pub fn natural_key(&self) -> (&str, &str, i64) {
        (&self.author, &self.title, self.year)
    }
}

/// A table-backed book row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Book {
    pub id: i64,
    #[serde(flatten)]
    pub record: BookRecord,
    pub created_at: String,
    pub updated_at: String,
}

impl Book {
    pub(crate) fn from_row(row: &SqliteRow) -> Self {
        Self {
            id: row.get("id"),
            record: BookRecord {
                author: row.get("author"),
                title: row.get("title"),
                pages: row.get("pages"),
                year: row.get("year"),
                genre: row.get("genre"),
            },
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}
