//! JSON import pipeline
//!
//! An accepted upload moves through
//! `received -> written -> validated -> accepted`, or
//! `received -> written -> rejected -> deleted` when the stored file does not
//! parse or is not shaped like book data.

use std::fmt;

use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};

use crate::schema::required_names;
use crate::storage::{ArtifactInfo, StorageDir};
use crate::upload::AcceptedUpload;
use crate::Result;

/// True for an object carrying every registry field name as a key
pub fn is_book_object(value: &Value) -> bool {
    match value {
        Value::Object(map) => required_names().all(|name| map.contains_key(name)),
        _ => false,
    }
}

/// True for one book object or an array whose every element is one
///
/// An empty array passes: it holds no element that breaks the shape.
pub fn matches_book_shape(value: &Value) -> bool {
    match value {
        Value::Array(items) => items.iter().all(is_book_object),
        Value::Object(_) => is_book_object(value),
        _ => false,
    }
}

/// Pipeline stage, used in log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportState {
    Received,
    Written,
    Validated,
    Accepted,
    Rejected,
    Deleted,
}

impl fmt::Display for ImportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImportState::Received => "received",
            ImportState::Written => "written",
            ImportState::Validated => "validated",
            ImportState::Accepted => "accepted",
            ImportState::Rejected => "rejected",
            ImportState::Deleted => "deleted",
        };
        f.write_str(name)
    }
}

/// Why a stored upload was thrown away
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Content is not JSON
    Parse(String),
    /// Content is JSON but not book-shaped
    Structure,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::Parse(msg) => write!(f, "invalid JSON: {}", msg),
            RejectReason::Structure => f.write_str("JSON does not match the book structure"),
        }
    }
}

/// Final state of one import
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    Accepted(ArtifactInfo),
    /// The stored file was deleted
    Rejected(RejectReason),
}

#[derive(Debug, Clone)]
pub struct ImportPipeline {
    storage: StorageDir,
}

impl ImportPipeline {
    pub fn new(storage: StorageDir) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &StorageDir {
        &self.storage
    }

    /// Store `content` under a generated name and keep it only if it holds
    /// book data
    ///
    /// Errors are I/O failures while writing; validation failures come back
    /// as `ImportOutcome::Rejected`.
    pub async fn import(&self, upload: &AcceptedUpload, content: &[u8]) -> Result<ImportOutcome> {
        let filename = StorageDir::generate_name();
        debug!(
            "Import of {:?} ({} bytes) {}",
            upload.original_name,
            content.len(),
            ImportState::Received
        );

        self.storage.ensure().await?;
        let path = self.storage.root().join(&filename);

        if let Err(e) = write_file(&path, content).await {
            let _ = tokio::fs::remove_file(&path).await;
            return Err(e.into());
        }
        debug!("Import of {:?} {} as {}", upload.original_name, ImportState::Written, filename);

        let verdict = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<Value>(&bytes) {
                Ok(data) if matches_book_shape(&data) => Ok(()),
                Ok(_) => Err(RejectReason::Structure),
                Err(e) => Err(RejectReason::Parse(e.to_string())),
            },
            Err(e) => Err(RejectReason::Parse(e.to_string())),
        };

        match verdict {
            Ok(()) => {
                let size = tokio::fs::metadata(&path).await?.len();
                info!(
                    "Import of {:?} {} and {} as {} ({} bytes)",
                    upload.display_name,
                    ImportState::Validated,
                    ImportState::Accepted,
                    filename,
                    size
                );
                Ok(ImportOutcome::Accepted(ArtifactInfo { filename, size }))
            }
            Err(reason) => {
                warn!(
                    "Import of {:?} {}: {}",
                    upload.original_name,
                    ImportState::Rejected,
                    reason
                );
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => debug!("{} {}", filename, ImportState::Deleted),
                    Err(e) => error!("Failed to delete rejected upload {}: {}", filename, e),
                }
                Ok(ImportOutcome::Rejected(reason))
            }
        }
    }
}

async fn write_file(path: &std::path::Path, content: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    for chunk in content.chunks(64 * 1024) {
        file.write_all(chunk).await?;
    }
    file.flush().await?;
    Ok(())
}
