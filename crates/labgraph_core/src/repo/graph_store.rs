//! Graph store contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide vertex and labelled-edge operations the core consumes.
//! - Keep relationship data separate from document attributes.
//!
//! # Invariants
//! - `vertex_exists` matches when every queried property equals the stored one;
//!   extra stored properties are ignored.
//! - Edges only connect existing vertices; removing a vertex removes its edges.

use crate::db::migrations::latest_version;
use crate::db::{open_db, open_db_in_memory, Schema};
use crate::repo::{StoreError, StoreResult};
use async_trait::async_trait;
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::{Map, Value};
use std::path::Path;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Stable vertex identifier.
pub type VertexId = Uuid;

/// Stable edge identifier.
pub type EdgeId = Uuid;

/// Vertex or edge property bag.
pub type Properties = Map<String, Value>;

/// Stored vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    pub id: VertexId,
    pub label: String,
    pub properties: Properties,
}

/// Stored directed edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub id: EdgeId,
    pub from: VertexId,
    pub to: VertexId,
    pub label: String,
    pub properties: Properties,
}

/// Graph store operations consumed by the core.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Returns whether a vertex with `label` carries every pair in `properties`.
    async fn vertex_exists(&self, label: &str, properties: &Properties) -> StoreResult<bool>;
    /// Creates one vertex with a freshly minted id.
    async fn add_vertex(&self, label: &str, properties: Properties) -> StoreResult<Vertex>;
    /// Creates one directed edge between existing vertices.
    async fn add_edge(
        &self,
        from: VertexId,
        to: VertexId,
        label: &str,
        properties: Properties,
    ) -> StoreResult<Edge>;
    /// Loads one vertex by id.
    async fn get_vertex(&self, id: VertexId) -> StoreResult<Option<Vertex>>;
    /// Merges `properties` into an existing vertex.
    async fn update_vertex(&self, id: VertexId, properties: Properties) -> StoreResult<()>;
    /// Removes one vertex and its edges; returns whether it existed.
    async fn remove_vertex(&self, id: VertexId) -> StoreResult<bool>;
    /// Removes every edge with `label` touching `vertex`; returns the count.
    async fn remove_edges(&self, vertex: VertexId, label: &str) -> StoreResult<u64>;
    /// Lists outgoing edges of `from`, optionally filtered by label.
    async fn edges_from(&self, from: VertexId, label: Option<&str>) -> StoreResult<Vec<Edge>>;
    /// Lists incoming edges of `to`, optionally filtered by label.
    async fn edges_to(&self, to: VertexId, label: Option<&str>) -> StoreResult<Vec<Edge>>;
}

/// SQLite-backed graph store.
pub struct SqliteGraphStore {
    conn: Mutex<Connection>,
}

impl SqliteGraphStore {
    /// Creates a store from a connection migrated to the graph schema.
    pub fn try_new(conn: Connection) -> StoreResult<Self> {
        ensure_connection_ready(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::try_new(open_db(path, Schema::Graph)?)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::try_new(open_db_in_memory(Schema::Graph)?)
    }
}

#[async_trait]
impl GraphStore for SqliteGraphStore {
    async fn vertex_exists(&self, label: &str, properties: &Properties) -> StoreResult<bool> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("SELECT properties FROM vertices WHERE label = ?1;")?;
        let mut rows = stmt.query([label])?;
        while let Some(row) = rows.next()? {
            let stored = parse_properties(&row.get::<_, String>(0)?)?;
            let matches = properties
                .iter()
                .all(|(key, value)| stored.get(key) == Some(value));
            if matches {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn add_vertex(&self, label: &str, properties: Properties) -> StoreResult<Vertex> {
        let id = Uuid::new_v4();
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO vertices (id, label, properties) VALUES (?1, ?2, ?3);",
            params![
                id.to_string(),
                label,
                serde_json::to_string(&properties)?
            ],
        )?;
        debug!("event=vertex_add module=repo status=ok label={label} id={id}");
        Ok(Vertex {
            id,
            label: label.to_string(),
            properties,
        })
    }

    async fn add_edge(
        &self,
        from: VertexId,
        to: VertexId,
        label: &str,
        properties: Properties,
    ) -> StoreResult<Edge> {
        let conn = self.conn.lock().await;
        for endpoint in [from, to] {
            if !vertex_row_exists(&conn, endpoint)? {
                return Err(StoreError::MissingVertex(endpoint));
            }
        }

        let id = Uuid::new_v4();
        conn.execute(
            "INSERT INTO edges (id, from_id, to_id, label, properties)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                id.to_string(),
                from.to_string(),
                to.to_string(),
                label,
                serde_json::to_string(&properties)?
            ],
        )?;
        debug!("event=edge_add module=repo status=ok label={label} from={from} to={to}");
        Ok(Edge {
            id,
            from,
            to,
            label: label.to_string(),
            properties,
        })
    }

    async fn get_vertex(&self, id: VertexId) -> StoreResult<Option<Vertex>> {
        let conn = self.conn.lock().await;
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT label, properties FROM vertices WHERE id = ?1;",
                [id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        row.map(|(label, properties)| {
            Ok(Vertex {
                id,
                label,
                properties: parse_properties(&properties)?,
            })
        })
        .transpose()
    }

    async fn update_vertex(&self, id: VertexId, properties: Properties) -> StoreResult<()> {
        let conn = self.conn.lock().await;
        let stored: Option<String> = conn
            .query_row(
                "SELECT properties FROM vertices WHERE id = ?1;",
                [id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        let mut merged = match stored {
            Some(text) => parse_properties(&text)?,
            None => return Err(StoreError::MissingVertex(id)),
        };
        merged.extend(properties);
        conn.execute(
            "UPDATE vertices SET properties = ?1 WHERE id = ?2;",
            params![serde_json::to_string(&merged)?, id.to_string()],
        )?;
        Ok(())
    }

    async fn remove_vertex(&self, id: VertexId) -> StoreResult<bool> {
        let conn = self.conn.lock().await;
        let changed = conn.execute("DELETE FROM vertices WHERE id = ?1;", [id.to_string()])?;
        Ok(changed > 0)
    }

    async fn remove_edges(&self, vertex: VertexId, label: &str) -> StoreResult<u64> {
        let conn = self.conn.lock().await;
        let changed = conn.execute(
            "DELETE FROM edges WHERE label = ?1 AND (from_id = ?2 OR to_id = ?2);",
            params![label, vertex.to_string()],
        )?;
        Ok(changed as u64)
    }

    async fn edges_from(&self, from: VertexId, label: Option<&str>) -> StoreResult<Vec<Edge>> {
        let conn = self.conn.lock().await;
        query_edges(&conn, "from_id", from, label)
    }

    async fn edges_to(&self, to: VertexId, label: Option<&str>) -> StoreResult<Vec<Edge>> {
        let conn = self.conn.lock().await;
        query_edges(&conn, "to_id", to, label)
    }
}

fn query_edges(
    conn: &Connection,
    endpoint_column: &str,
    vertex: VertexId,
    label: Option<&str>,
) -> StoreResult<Vec<Edge>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, from_id, to_id, label, properties FROM edges
         WHERE {endpoint_column} = ?1
           AND (?2 IS NULL OR label = ?2)
         ORDER BY rowid ASC;"
    ))?;
    let mut rows = stmt.query(params![vertex.to_string(), label])?;
    let mut edges = Vec::new();
    while let Some(row) = rows.next()? {
        edges.push(parse_edge_row(row)?);
    }
    Ok(edges)
}

fn parse_edge_row(row: &Row<'_>) -> StoreResult<Edge> {
    Ok(Edge {
        id: parse_uuid(&row.get::<_, String>(0)?, "edges.id")?,
        from: parse_uuid(&row.get::<_, String>(1)?, "edges.from_id")?,
        to: parse_uuid(&row.get::<_, String>(2)?, "edges.to_id")?,
        label: row.get(3)?,
        properties: parse_properties(&row.get::<_, String>(4)?)?,
    })
}

fn parse_uuid(text: &str, column: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(text)
        .map_err(|_| StoreError::InvalidData(format!("invalid uuid value `{text}` in {column}")))
}

fn parse_properties(text: &str) -> StoreResult<Properties> {
    match serde_json::from_str::<Value>(text)? {
        Value::Object(properties) => Ok(properties),
        other => Err(StoreError::InvalidData(format!(
            "non-object properties `{other}`"
        ))),
    }
}

fn vertex_row_exists(conn: &Connection, id: VertexId) -> StoreResult<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM vertices WHERE id = ?1;",
            [id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn ensure_connection_ready(conn: &Connection) -> StoreResult<()> {
    let expected_version = latest_version(Schema::Graph);
    let actual_version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    if actual_version != expected_version {
        return Err(StoreError::UninitializedConnection {
            schema: Schema::Graph,
            expected_version,
            actual_version,
        });
    }
    Ok(())
}
