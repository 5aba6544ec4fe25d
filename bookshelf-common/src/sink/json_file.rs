//! Shared JSON array file sink
//!
//! The primary file always holds a JSON array. A missing file is created as
//! `[]`; a corrupt or non-array file reads as empty and is replaced on the
//! next append. Writers inside this process are serialized and each write
//! goes through a temp file plus rename. Writers in other processes are not
//! coordinated with.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use super::SaveOutcome;
use crate::models::BookRecord;
use crate::storage::{StorageDir, PRIMARY_FILE};
use crate::Result;

#[derive(Debug, Clone)]
pub struct JsonFileSink {
    storage: StorageDir,
    write_lock: Arc<Mutex<()>>,
}

impl JsonFileSink {
    pub fn new(storage: StorageDir) -> Self {
        Self {
            storage,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Create the primary file as an empty array if it does not exist
    pub async fn ensure_primary_file(&self) -> Result<()> {
        self.storage.ensure().await?;
        let path = self.storage.primary_path();
        if !tokio::fs::try_exists(&path).await? {
            write_array(&self.storage, &[]).await?;
            debug!("Created empty {}", path.display());
        }
        Ok(())
    }

    /// All entries of the primary file; unreadable content counts as empty
    pub async fn read_all(&self) -> Vec<Value> {
        let path = self.storage.primary_path();
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!("Could not read {}: {} (treating as empty)", path.display(), e);
                return Vec::new();
            }
        };

        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Array(items)) => items,
            Ok(_) => {
                warn!("{} is not a JSON array (treating as empty)", path.display());
                Vec::new()
            }
            Err(e) => {
                warn!("{} is not valid JSON: {} (treating as empty)", path.display(), e);
                Vec::new()
            }
        }
    }

    /// Append a record as the last array element; never checks for duplicates
    pub async fn append(&self, record: &BookRecord) -> Result<SaveOutcome> {
        let _guard = self.write_lock.lock().await;

        self.ensure_primary_file().await?;
        let mut items = self.read_all().await;
        items.push(serde_json::to_value(record)?);
        write_array(&self.storage, &items).await?;

        Ok(SaveOutcome::Saved)
    }
}

/// Rewrite the primary file with `items`, 4-space indented
async fn write_array(storage: &StorageDir, items: &[Value]) -> Result<()> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    items.serialize(&mut ser)?;

    let tmp_path = storage
        .root()
        .join(format!(".{}.{}.tmp", PRIMARY_FILE, Uuid::new_v4().simple()));
    tokio::fs::write(&tmp_path, &buf).await?;
    if let Err(e) = tokio::fs::rename(&tmp_path, storage.primary_path()).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(e.into());
    }
    Ok(())
}
