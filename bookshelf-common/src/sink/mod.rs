//! Persistence gateway
//!
//! Two interchangeable sinks for a validated book record, picked per request:
//! the shared JSON array file and the `books` table. The file sink appends
//! unconditionally; the table sink skips records whose (author, title, year)
//! is already stored.

mod json_file;
mod table;

pub use json_file::JsonFileSink;
pub use table::{parse_update_body, BookTable};

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{error, info, warn};

use crate::models::BookRecord;
use crate::storage::StorageDir;
use crate::Error;

/// Which sink a record goes to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkMode {
    #[default]
    File,
    Db,
}

impl FromStr for SinkMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" | "json" => Ok(SinkMode::File),
            "db" | "table" => Ok(SinkMode::Db),
            other => Err(Error::InvalidInput(format!("Unknown storage mode: {}", other))),
        }
    }
}

/// Result of handing a record to a sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "outcome", content = "detail")]
pub enum SaveOutcome {
    Saved,
    DuplicateSkipped,
    PersistenceError(String),
}

/// Routes records to the file or table sink
#[derive(Debug, Clone)]
pub struct PersistenceGateway {
    file: JsonFileSink,
    table: BookTable,
}

impl PersistenceGateway {
    pub fn new(storage: StorageDir, pool: SqlitePool) -> Self {
        Self {
            file: JsonFileSink::new(storage),
            table: BookTable::new(pool),
        }
    }

    pub fn file(&self) -> &JsonFileSink {
        &self.file
    }

    pub fn table(&self) -> &BookTable {
        &self.table
    }

    /// Persist a record; failures are reported, never propagated
    pub async fn save(&self, mode: SinkMode, record: &BookRecord) -> SaveOutcome {
        let result = match mode {
            SinkMode::File => self.file.append(record).await,
            SinkMode::Db => self.table.insert_unique(record).await,
        };

        match result {
            Ok(SaveOutcome::Saved) => {
                info!(
                    "Saved book {:?} by {:?} ({}) to {:?} sink",
                    record.title, record.author, record.year, mode
                );
                SaveOutcome::Saved
            }
            Ok(SaveOutcome::DuplicateSkipped) => {
                warn!(
                    "Book {:?} by {:?} ({}) already exists, not added",
                    record.title, record.author, record.year
                );
                SaveOutcome::DuplicateSkipped
            }
            Ok(other) => other,
            Err(e) => {
                error!("Failed to save book to {:?} sink: {}", mode, e);
                SaveOutcome::PersistenceError(e.to_string())
            }
        }
    }
}
