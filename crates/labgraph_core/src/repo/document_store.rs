//! Document store contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide the document operations the core consumes (`find_one`,
//!   `find_all`, `insert`, `update_fields`, `delete_one`, `exists`,
//!   `get_by_id`).
//! - Enforce each collection's natural-key uniqueness with a unique index.
//!
//! # Invariants
//! - Every stored document carries a string `id` field holding a UUID.
//! - A unique-index violation surfaces as `StoreError::UniqueConflict`, never
//!   as a raw SQLite error.
//! - `find_all` returns documents in insertion order.

use crate::db::migrations::latest_version;
use crate::db::{open_db, open_db_in_memory, Schema};
use crate::repo::collection::Collection;
use crate::repo::{StoreError, StoreResult};
use async_trait::async_trait;
use log::debug;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::Path;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Stable document identifier.
pub type DocumentId = Uuid;

/// Schemaless document body.
pub type Document = Map<String, Value>;

/// Field holding the document id inside every body.
pub const ID_FIELD: &str = "id";

/// Conjunction of field equality clauses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<(String, Value)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter matching one document id.
    pub fn by_id(id: DocumentId) -> Self {
        Self::new().eq_id(ID_FIELD, id)
    }

    /// Adds one `field == value` clause.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push((field.into(), value.into()));
        self
    }

    /// Adds one `field == id` clause using the stored string form of ids.
    pub fn eq_id(self, field: impl Into<String>, id: Uuid) -> Self {
        self.eq(field, id.to_string())
    }

    /// Returns whether every clause matches `document`.
    pub fn matches(&self, document: &Document) -> bool {
        self.clauses
            .iter()
            .all(|(field, expected)| document.get(field) == Some(expected))
    }

    pub fn clauses(&self) -> &[(String, Value)] {
        &self.clauses
    }

    /// Stable textual form, used as memoization key.
    pub fn cache_key(&self) -> String {
        self.clauses
            .iter()
            .map(|(field, value)| format!("{field}={value}"))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Serializes a typed record into a document body.
pub fn to_document<T: Serialize>(record: &T) -> StoreResult<Document> {
    match serde_json::to_value(record)? {
        Value::Object(document) => Ok(document),
        other => Err(StoreError::InvalidData(format!(
            "record serialized to non-object `{other}`"
        ))),
    }
}

/// Deserializes a document body into a typed record.
pub fn from_document<T: DeserializeOwned>(document: Document) -> StoreResult<T> {
    Ok(serde_json::from_value(Value::Object(document))?)
}

/// Outcome of `update_fields`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateResult {
    pub matched: u64,
    pub modified: u64,
}

/// Document store operations consumed by the core.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns the first document matching `filter`.
    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> StoreResult<Option<Document>>;
    /// Returns every document matching `filter`.
    async fn find_all(&self, collection: Collection, filter: &Filter)
        -> StoreResult<Vec<Document>>;
    /// Inserts one document; fails with `UniqueConflict` on natural-key or id collision.
    async fn insert(&self, collection: Collection, document: Document) -> StoreResult<Document>;
    /// Merges `fields` into every matching document.
    async fn update_fields(
        &self,
        collection: Collection,
        filter: &Filter,
        fields: Document,
    ) -> StoreResult<UpdateResult>;
    /// Deletes the first matching document; returns whether one was deleted.
    async fn delete_one(&self, collection: Collection, filter: &Filter) -> StoreResult<bool>;
    /// Returns whether any document matches.
    async fn exists(&self, collection: Collection, filter: &Filter) -> StoreResult<bool>;
    /// Loads one document by id.
    async fn get_by_id(
        &self,
        collection: Collection,
        id: DocumentId,
    ) -> StoreResult<Option<Document>>;
}

/// SQLite-backed document store.
pub struct SqliteDocumentStore {
    conn: Mutex<Connection>,
}

impl SqliteDocumentStore {
    /// Creates a store from a connection migrated to the document schema.
    pub fn try_new(conn: Connection) -> StoreResult<Self> {
        ensure_connection_ready(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::try_new(open_db(path, Schema::Documents)?)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::try_new(open_db_in_memory(Schema::Documents)?)
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> StoreResult<Option<Document>> {
        let conn = self.conn.lock().await;
        Ok(load_matching(&conn, collection, filter)?
            .into_iter()
            .next()
            .map(|(_, document)| document))
    }

    async fn find_all(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> StoreResult<Vec<Document>> {
        let conn = self.conn.lock().await;
        Ok(load_matching(&conn, collection, filter)?
            .into_iter()
            .map(|(_, document)| document)
            .collect())
    }

    async fn insert(&self, collection: Collection, document: Document) -> StoreResult<Document> {
        let id = document_id(&document)?;
        let unique_key = unique_key(collection, &document)?;
        let body = serde_json::to_string(&document)?;

        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO documents (collection, id, unique_key, body)
             VALUES (?1, ?2, ?3, ?4);",
            params![collection.name(), id.to_string(), unique_key, body],
        )
        .map_err(|err| map_write_error(err, collection, &unique_key))?;

        debug!(
            "event=document_insert module=repo status=ok collection={} id={id}",
            collection.name()
        );
        Ok(document)
    }

    async fn update_fields(
        &self,
        collection: Collection,
        filter: &Filter,
        fields: Document,
    ) -> StoreResult<UpdateResult> {
        let mut conn = self.conn.lock().await;
        let matching = load_matching(&conn, collection, filter)?;
        let mut result = UpdateResult {
            matched: matching.len() as u64,
            modified: 0,
        };

        let tx = conn.transaction()?;
        for (id, mut document) in matching {
            let before = document.clone();
            for (field, value) in &fields {
                if field == ID_FIELD {
                    continue;
                }
                document.insert(field.clone(), value.clone());
            }
            if document == before {
                continue;
            }

            let unique_key = unique_key(collection, &document)?;
            tx.execute(
                "UPDATE documents
                 SET
                    unique_key = ?1,
                    body = ?2,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE collection = ?3 AND id = ?4;",
                params![
                    unique_key,
                    serde_json::to_string(&document)?,
                    collection.name(),
                    id
                ],
            )
            .map_err(|err| map_write_error(err, collection, &unique_key))?;
            result.modified += 1;
        }
        tx.commit()?;

        Ok(result)
    }

    async fn delete_one(&self, collection: Collection, filter: &Filter) -> StoreResult<bool> {
        let conn = self.conn.lock().await;
        let Some((id, _)) = load_matching(&conn, collection, filter)?.into_iter().next() else {
            return Ok(false);
        };
        let changed = conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND id = ?2;",
            params![collection.name(), id],
        )?;
        Ok(changed > 0)
    }

    async fn exists(&self, collection: Collection, filter: &Filter) -> StoreResult<bool> {
        Ok(self.find_one(collection, filter).await?.is_some())
    }

    async fn get_by_id(
        &self,
        collection: Collection,
        id: DocumentId,
    ) -> StoreResult<Option<Document>> {
        let conn = self.conn.lock().await;
        let body: Option<String> = conn
            .query_row(
                "SELECT body FROM documents WHERE collection = ?1 AND id = ?2;",
                params![collection.name(), id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        body.map(|text| parse_body(collection, &text)).transpose()
    }
}

fn load_matching(
    conn: &Connection,
    collection: Collection,
    filter: &Filter,
) -> StoreResult<Vec<(String, Document)>> {
    let mut stmt = conn.prepare(
        "SELECT id, body FROM documents
         WHERE collection = ?1
         ORDER BY rowid ASC;",
    )?;
    let mut rows = stmt.query([collection.name()])?;
    let mut matching = Vec::new();

    while let Some(row) = rows.next()? {
        let id: String = row.get(0)?;
        let body: String = row.get(1)?;
        let document = parse_body(collection, &body)?;
        if filter.matches(&document) {
            matching.push((id, document));
        }
    }

    Ok(matching)
}

fn parse_body(collection: Collection, body: &str) -> StoreResult<Document> {
    match serde_json::from_str::<Value>(body)? {
        Value::Object(document) => Ok(document),
        other => Err(StoreError::InvalidData(format!(
            "non-object body `{other}` in collection `{}`",
            collection.name()
        ))),
    }
}

fn document_id(document: &Document) -> StoreResult<DocumentId> {
    let text = document
        .get(ID_FIELD)
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::InvalidData("document is missing string `id`".to_string()))?;
    Uuid::parse_str(text)
        .map_err(|_| StoreError::InvalidData(format!("invalid document id `{text}`")))
}

fn unique_key(collection: Collection, document: &Document) -> StoreResult<String> {
    let parts = collection
        .unique_fields()
        .iter()
        .map(|field| document.get(*field).cloned().unwrap_or(Value::Null))
        .collect::<Vec<_>>();
    Ok(serde_json::to_string(&parts)?)
}

fn map_write_error(err: rusqlite::Error, collection: Collection, key: &str) -> StoreError {
    if let rusqlite::Error::SqliteFailure(failure, _) = &err {
        if failure.code == ErrorCode::ConstraintViolation {
            return StoreError::UniqueConflict {
                collection: collection.name(),
                key: key.to_string(),
            };
        }
    }
    StoreError::from(err)
}

fn ensure_connection_ready(conn: &Connection) -> StoreResult<()> {
    let expected_version = latest_version(Schema::Documents);
    let actual_version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    if actual_version != expected_version {
        return Err(StoreError::UninitializedConnection {
            schema: Schema::Documents,
            expected_version,
            actual_version,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Document, Filter};
    use serde_json::json;
    use uuid::Uuid;

    fn document(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn filter_requires_every_clause() {
        let project = Uuid::new_v4();
        let doc = document(json!({ "name": "r1", "project": project.to_string() }));

        assert!(Filter::new().matches(&doc));
        assert!(Filter::new().eq("name", "r1").eq_id("project", project).matches(&doc));
        assert!(!Filter::new().eq("name", "r1").eq_id("project", Uuid::new_v4()).matches(&doc));
        assert!(!Filter::new().eq("missing", "r1").matches(&doc));
    }

    #[test]
    fn cache_key_is_order_sensitive_and_stable() {
        let a = Filter::new().eq("name", "x").eq("kind", 1);
        let b = Filter::new().eq("name", "x").eq("kind", 1);
        assert_eq!(a.cache_key(), b.cache_key());
        assert_ne!(a.cache_key(), Filter::new().eq("name", "y").cache_key());
    }
}
