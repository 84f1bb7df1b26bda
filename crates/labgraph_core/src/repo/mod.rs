//! Store contracts, SQLite implementations and the dual-store write coordinator.
//!
//! # Responsibility
//! - Define the document-store and graph-store contracts the core consumes.
//! - Provide SQLite-backed implementations of both contracts.
//! - Pair vertex and document writes through one coordinator.
//!
//! # Invariants
//! - Store APIs return semantic errors (`UniqueConflict`, `MissingVertex`) in
//!   addition to transport errors.
//! - Store handles are injected; nothing in the core holds a global client.

use crate::db::{DbError, Schema};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::Arc;

pub mod collection;
pub mod coordinator;
pub mod document_store;
pub mod graph_store;

use document_store::{DocumentStore, SqliteDocumentStore};
use graph_store::{GraphStore, SqliteGraphStore, VertexId};

pub type StoreResult<T> = Result<T, StoreError>;

/// Error raised by either store implementation.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// A unique index rejected the write.
    UniqueConflict { collection: &'static str, key: String },
    /// An edge or property update referenced a vertex that does not exist.
    MissingVertex(VertexId),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        schema: Schema,
        expected_version: u32,
        actual_version: u32,
    },
    /// Persisted data cannot be converted to a valid record.
    InvalidData(String),
    /// Document body could not be (de)serialized.
    Serialization(serde_json::Error),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UniqueConflict { collection, key } => {
                write!(f, "unique conflict in `{collection}` for key {key}")
            }
            Self::MissingVertex(id) => write!(f, "vertex not found: {id}"),
            Self::UninitializedConnection {
                schema,
                expected_version,
                actual_version,
            } => write!(
                f,
                "{} store requires schema version {expected_version}, got {actual_version}",
                schema.as_str()
            ),
            Self::InvalidData(message) => write!(f, "invalid stored data: {message}"),
            Self::Serialization(err) => write!(f, "document serialization failed: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Serialization(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

/// Shared handles to the two stores, cloned into every request-scoped manager.
#[derive(Clone)]
pub struct Stores {
    documents: Arc<dyn DocumentStore>,
    graph: Arc<dyn GraphStore>,
}

impl Stores {
    pub fn new(documents: Arc<dyn DocumentStore>, graph: Arc<dyn GraphStore>) -> Self {
        Self { documents, graph }
    }

    /// Opens both SQLite-backed stores from their database files.
    pub fn open_sqlite(
        documents_path: impl AsRef<Path>,
        graph_path: impl AsRef<Path>,
    ) -> StoreResult<Self> {
        let documents = SqliteDocumentStore::open(documents_path)?;
        let graph = SqliteGraphStore::open(graph_path)?;
        Ok(Self::new(Arc::new(documents), Arc::new(graph)))
    }

    /// Opens both stores in memory; used by tests and the smoke CLI.
    pub fn open_in_memory() -> StoreResult<Self> {
        let documents = SqliteDocumentStore::open_in_memory()?;
        let graph = SqliteGraphStore::open_in_memory()?;
        Ok(Self::new(Arc::new(documents), Arc::new(graph)))
    }

    pub fn documents(&self) -> &dyn DocumentStore {
        self.documents.as_ref()
    }

    pub fn graph(&self) -> &dyn GraphStore {
        self.graph.as_ref()
    }
}
