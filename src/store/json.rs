// src/store/json.rs
// =============================================================================
// A file-backed document store.
//
// Layout on disk:
//
//   <root>/
//     <database>/            one directory per database
//       <collection>.json    a JSON array of objects
//       <collection>.jsonl   one JSON object per line
//
// Listing databases and collections is the "selection" step; opening a
// collection gives a `JsonCollection`, which implements `DocumentSource`.
// The file is re-read on every call, so both audit passes see the store as
// it is on disk, in file order.
// =============================================================================

use super::{Document, DocumentSource, StoreError};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

// File extensions recognised as collections, in lookup priority order
const COLLECTION_EXTENSIONS: [&str; 2] = ["json", "jsonl"];

/// The root of a directory-of-databases store.
#[derive(Debug, Clone)]
pub struct JsonStore {
    root: PathBuf,
}

impl JsonStore {
    /// Opens a store rooted at `root`. The directory must exist.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(StoreError::MissingRoot(root));
        }
        Ok(Self { root })
    }

    /// Lists database names (sub-directories of the root), sorted.
    pub async fn databases(&self) -> Result<Vec<String>, StoreError> {
        let mut names = Vec::new();
        for entry in read_dir(&self.root).await? {
            if entry.is_dir() {
                if let Some(name) = entry.file_name().and_then(|n| n.to_str()) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Lists collection names inside `database`, sorted.
    pub async fn collections(&self, database: &str) -> Result<Vec<String>, StoreError> {
        let dir = self.database_dir(database)?;
        let mut names = Vec::new();
        for entry in read_dir(&dir).await? {
            let is_collection = entry
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| COLLECTION_EXTENSIONS.contains(&ext));
            if entry.is_file() && is_collection {
                if let Some(stem) = entry.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        names.dedup();
        Ok(names)
    }

    /// Opens one collection of one database.
    pub fn collection(&self, database: &str, name: &str) -> Result<JsonCollection, StoreError> {
        let dir = self.database_dir(database)?;
        let not_found = || StoreError::NotFound {
            kind: "collection",
            name: format!("{}/{}", database, name),
        };
        if !is_plain_name(name) {
            return Err(not_found());
        }

        COLLECTION_EXTENSIONS
            .iter()
            .map(|ext| dir.join(format!("{}.{}", name, ext)))
            .find(|path| path.is_file())
            .map(|path| JsonCollection { path })
            .ok_or_else(not_found)
    }

    fn database_dir(&self, database: &str) -> Result<PathBuf, StoreError> {
        let dir = self.root.join(database);
        if !is_plain_name(database) || !dir.is_dir() {
            return Err(StoreError::NotFound {
                kind: "database",
                name: database.to_string(),
            });
        }
        Ok(dir)
    }
}

// Names select one entry directly under a directory and never leave it
fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

/// One collection file opened from a `JsonStore`.
#[derive(Debug, Clone)]
pub struct JsonCollection {
    path: PathBuf,
}

impl JsonCollection {
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<Document>, StoreError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| StoreError::Io {
                path: self.path.clone(),
                source,
            })?;

        let values = if self.path.extension().and_then(|e| e.to_str()) == Some("jsonl") {
            self.parse_lines(&content)?
        } else {
            self.parse_array(&content)?
        };

        let mut documents = Vec::with_capacity(values.len());
        for (position, value) in values.iter().enumerate() {
            match Document::from_json(value, format!("#{}", position)) {
                Some(doc) => documents.push(doc),
                None => warn!(
                    path = %self.path.display(),
                    position,
                    "skipping entry that is not a JSON object"
                ),
            }
        }

        debug!(path = %self.path.display(), count = documents.len(), "loaded collection");
        Ok(documents)
    }

    fn parse_array(&self, content: &str) -> Result<Vec<Value>, StoreError> {
        let value: Value = serde_json::from_str(content).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;
        match value {
            Value::Array(items) => Ok(items),
            _ => Err(StoreError::NotAnArray(self.path.clone())),
        }
    }

    fn parse_lines(&self, content: &str) -> Result<Vec<Value>, StoreError> {
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line).map_err(|source| StoreError::Json {
                    path: self.path.clone(),
                    source,
                })
            })
            .collect()
    }
}

#[async_trait]
impl DocumentSource for JsonCollection {
    async fn sample_documents(&self, limit: usize) -> Result<Vec<Document>, StoreError> {
        let mut documents = self.load().await?;
        documents.truncate(limit);
        Ok(documents)
    }

    async fn all_documents(&self) -> Result<Vec<Document>, StoreError> {
        self.load().await
    }
}

async fn read_dir(dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    let io_err = |source| StoreError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut entries = tokio::fs::read_dir(dir).await.map_err(io_err)?;
    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
        paths.push(entry.path());
    }
    Ok(paths)
}
