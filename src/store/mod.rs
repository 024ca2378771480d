// src/store/mod.rs
// =============================================================================
// This module is the boundary between the audit and wherever documents live.
//
// The audit only needs two things from a store:
// - a small sample of documents (for field sniffing)
// - the full set of documents, in the same order every time it is asked
//
// That contract is the `DocumentSource` trait. `JsonStore` is the concrete
// store the CLI ships with: a directory of databases, each a directory of
// JSON collection files.
// =============================================================================

mod document;
mod json;

pub use document::{Document, FieldValue};
pub use json::{JsonCollection, JsonStore};

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while listing, opening or reading a document set.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store root '{0}' does not exist or is not a directory")]
    MissingRoot(PathBuf),

    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in '{path}': {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("'{0}' must contain a JSON array of objects")]
    NotAnArray(PathBuf),
}

/// A document set the audit can read from.
///
/// `all_documents` must return documents in the same order on every call:
/// the audit enumerates them twice and compares positions across passes.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Returns at most `limit` documents, used for field sniffing.
    async fn sample_documents(&self, limit: usize) -> Result<Vec<Document>, StoreError>;

    /// Returns every document in the set.
    async fn all_documents(&self) -> Result<Vec<Document>, StoreError>;
}
