//! Storage directory for the primary JSON file and uploaded artifacts
//!
//! Artifacts are written under generated names only; names coming back from
//! clients are accepted for reading, and only when they are bare file names.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::{Error, Result};

/// Name of the shared JSON array file written by the file sink
pub const PRIMARY_FILE: &str = "books.json";

/// Names that never show up in the artifact listing
pub const RESERVED_FILES: &[&str] = &[PRIMARY_FILE, "file_metadata.json"];

/// Listing entry for one stored artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactInfo {
    pub filename: String,
    pub size: u64,
}

/// Handle on the storage directory
#[derive(Debug, Clone)]
pub struct StorageDir {
    root: PathBuf,
}

impl StorageDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the directory if it does not exist yet
    pub async fn ensure(&self) -> Result<&Path> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(&self.root)
    }

    /// Path of the primary JSON array file
    pub fn primary_path(&self) -> PathBuf {
        self.root.join(PRIMARY_FILE)
    }

    /// Fresh collision-free artifact name
    pub fn generate_name() -> String {
        format!("{}.json", Uuid::new_v4().simple())
    }

    /// Resolve a client-supplied artifact name inside the directory
    ///
    /// Anything but a bare file name is reported as not found.
    pub fn artifact_path(&self, filename: &str) -> Result<PathBuf> {
        let is_bare = !filename.is_empty()
            && filename != "."
            && filename != ".."
            && !filename.contains(['/', '\\', '\0']);
        if !is_bare {
            return Err(Error::NotFound(format!("File not found: {}", filename)));
        }
        Ok(self.root.join(filename))
    }

    /// List uploaded artifacts sorted by file name
    pub async fn list_artifacts(&self) -> Result<Vec<ArtifactInfo>> {
        self.ensure().await?;

        let mut entries = tokio::fs::read_dir(&self.root).await?;
        let mut files = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let filename = entry.file_name().to_string_lossy().into_owned();
            if !filename.to_lowercase().ends_with(".json") {
                continue;
            }
            if RESERVED_FILES.contains(&filename.as_str()) {
                continue;
            }
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            files.push(ArtifactInfo {
                filename,
                size: metadata.len(),
            });
        }

        files.sort_by(|a, b| a.filename.cmp(&b.filename));
        debug!("Listed {} artifacts in {}", files.len(), self.root.display());
        Ok(files)
    }

    /// Read one artifact as a list of items
    ///
    /// A single object is returned as a one-element list. Content that is
    /// neither an object nor an array is `InvalidInput`.
    pub async fn read_artifact(&self, filename: &str) -> Result<Vec<Value>> {
        let path = self.artifact_path(filename)?;

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NotFound(format!("File not found: {}", filename)));
            }
            Err(e) => return Err(e.into()),
        };

        let data: Value = serde_json::from_slice(&bytes)
            .map_err(|e| Error::InvalidInput(format!("Error reading JSON: {}", e)))?;

        match data {
            Value::Object(_) => Ok(vec![data]),
            Value::Array(items) => Ok(items),
            _ => Err(Error::InvalidInput(
                "File has an unrecognized structure.".to_string(),
            )),
        }
    }
}
