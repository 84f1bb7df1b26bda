//! Dual-store write coordinator.
//!
//! # Responsibility
//! - Pair every entity vertex with its document and link relationship edges.
//! - Translate store-level collisions into the two duplicate outcomes
//!   callers can act on (`VertexExists`, `DocumentExists`).
//!
//! # Invariants
//! - A create writes nothing when the natural key already has a vertex.
//! - The document id is minted before the vertex so the vertex can carry it.
//! - A document-insert failure after the vertex exists leaves an inert orphan
//!   vertex; no compensating delete is attempted.
//! - Every stage transition is logged as `event=dual_write` with a `stage` so
//!   a sweep can reconcile interrupted writes.

use crate::repo::collection::Collection;
use crate::repo::document_store::{to_document, Document, DocumentId, Filter};
use crate::repo::graph_store::{Properties, VertexId};
use crate::repo::{StoreError, Stores};
use log::{error, info, warn};
use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Vertex property carrying the paired document id.
pub const DOCUMENT_ID_PROPERTY: &str = "document_id";

pub type WriteResult<T> = Result<T, WriteError>;

/// Failure of one coordinated write.
#[derive(Debug)]
pub enum WriteError {
    /// Step 1: a vertex with the same natural key exists.
    VertexExists { label: &'static str, name: String },
    /// The document store rejected the natural key.
    DocumentExists { entity: &'static str, name: String },
    /// A vertex still has a document pointing at it.
    VertexInUse { vertex_id: VertexId, document_id: DocumentId },
    /// Any other store failure; fatal for the request.
    Store(StoreError),
}

impl Display for WriteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::VertexExists { label, name } => {
                write!(f, "{label} vertex `{name}` already exists")
            }
            Self::DocumentExists { entity, name } => write!(f, "{entity} `{name}` already exists"),
            Self::VertexInUse {
                vertex_id,
                document_id,
            } => write!(
                f,
                "vertex {vertex_id} is still referenced by document {document_id}"
            ),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for WriteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for WriteError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Stages of one create, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStage {
    Intending,
    VertexCreated,
    DocumentCreated,
    EdgesLinked,
    Committed,
}

impl WriteStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Intending => "intending",
            Self::VertexCreated => "vertex_created",
            Self::DocumentCreated => "document_created",
            Self::EdgesLinked => "edges_linked",
            Self::Committed => "committed",
        }
    }
}

/// One labelled edge relative to the vertex being written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeSpec {
    /// `from -> new vertex`.
    Incoming { from: VertexId, label: &'static str },
    /// `new vertex -> to`.
    Outgoing { to: VertexId, label: &'static str },
}

impl EdgeSpec {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Incoming { label, .. } | Self::Outgoing { label, .. } => label,
        }
    }

    fn endpoints(&self, vertex: VertexId) -> (VertexId, VertexId) {
        match *self {
            Self::Incoming { from, .. } => (from, vertex),
            Self::Outgoing { to, .. } => (vertex, to),
        }
    }
}

/// Ids minted for a new entity before its document is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintedIds {
    pub document_id: DocumentId,
    pub vertex_id: VertexId,
}

/// Everything the coordinator needs to create one entity.
#[derive(Debug, Clone)]
pub struct CreatePlan {
    pub collection: Collection,
    /// Display name used in duplicate errors and log lines.
    pub name: String,
    /// Ancestor ids plus name.
    pub natural_key: Properties,
    pub edges: Vec<EdgeSpec>,
}

/// Everything the coordinator needs to update one entity.
#[derive(Debug, Clone)]
pub struct UpdatePlan {
    pub collection: Collection,
    pub name: String,
    pub document_id: DocumentId,
    pub vertex_id: VertexId,
    /// Fields merged into the stored document.
    pub fields: Document,
    /// Natural-key properties merged into the vertex.
    pub natural_key: Properties,
    /// When set, every edge with one of these labels is replaced.
    pub replace_edges: Option<Vec<EdgeSpec>>,
}

/// Pairs document and graph writes for one request.
pub struct WriteCoordinator<'a> {
    stores: &'a Stores,
}

impl<'a> WriteCoordinator<'a> {
    pub fn new(stores: &'a Stores) -> Self {
        Self { stores }
    }

    /// Creates vertex, document and edges for one entity.
    ///
    /// `build` receives the minted ids and returns the record to persist.
    pub async fn create<T, F>(&self, plan: CreatePlan, build: F) -> WriteResult<T>
    where
        T: Serialize + Send,
        F: FnOnce(MintedIds) -> T + Send,
    {
        let label = vertex_label(plan.collection)?;
        log_stage(WriteStage::Intending, &plan, None);

        if self
            .stores
            .graph()
            .vertex_exists(label, &plan.natural_key)
            .await?
        {
            warn!(
                "event=dual_write module=coordinator status=rejected reason=vertex_exists collection={} name={}",
                plan.collection.name(),
                plan.name
            );
            return Err(WriteError::VertexExists {
                label,
                name: plan.name,
            });
        }

        let document_id = Uuid::new_v4();
        let mut vertex_properties = plan.natural_key.clone();
        vertex_properties.insert(
            DOCUMENT_ID_PROPERTY.to_string(),
            Value::String(document_id.to_string()),
        );
        let vertex = self
            .stores
            .graph()
            .add_vertex(label, vertex_properties)
            .await
            .map_err(|err| fatal(&plan, WriteStage::Intending, err))?;
        log_stage(WriteStage::VertexCreated, &plan, Some(vertex.id));

        let record = build(MintedIds {
            document_id,
            vertex_id: vertex.id,
        });
        let document = to_document(&record)?;
        match self.stores.documents().insert(plan.collection, document).await {
            Ok(_) => {}
            Err(StoreError::UniqueConflict { .. }) => {
                warn!(
                    "event=dual_write module=coordinator status=orphan_vertex collection={} name={} vertex_id={}",
                    plan.collection.name(),
                    plan.name,
                    vertex.id
                );
                return Err(WriteError::DocumentExists {
                    entity: plan.collection.entity_name(),
                    name: plan.name,
                });
            }
            Err(err) => return Err(fatal(&plan, WriteStage::VertexCreated, err)),
        }
        log_stage(WriteStage::DocumentCreated, &plan, Some(vertex.id));

        for edge in &plan.edges {
            self.link(vertex.id, edge)
                .await
                .map_err(|err| fatal(&plan, WriteStage::DocumentCreated, err))?;
        }
        log_stage(WriteStage::EdgesLinked, &plan, Some(vertex.id));
        log_stage(WriteStage::Committed, &plan, Some(vertex.id));

        Ok(record)
    }

    /// Updates document fields, refreshes vertex properties and optionally
    /// replaces relationship edges.
    ///
    /// A natural-key change is rejected with `VertexExists` before anything
    /// is written when another vertex already carries the new key.
    pub async fn update(&self, plan: UpdatePlan) -> WriteResult<()> {
        self.check_rekey(&plan).await?;

        let filter = Filter::by_id(plan.document_id);
        match self
            .stores
            .documents()
            .update_fields(plan.collection, &filter, plan.fields)
            .await
        {
            Ok(_) => {}
            Err(StoreError::UniqueConflict { .. }) => {
                return Err(WriteError::DocumentExists {
                    entity: plan.collection.entity_name(),
                    name: plan.name,
                });
            }
            Err(err) => return Err(err.into()),
        }

        let graph = self.stores.graph();
        graph.update_vertex(plan.vertex_id, plan.natural_key).await?;

        if let Some(edges) = &plan.replace_edges {
            let mut labels: Vec<&'static str> = edges.iter().map(EdgeSpec::label).collect();
            labels.sort_unstable();
            labels.dedup();
            for label in labels {
                graph.remove_edges(plan.vertex_id, label).await?;
            }
            for edge in edges {
                self.link(plan.vertex_id, edge).await?;
            }
        }

        info!(
            "event=dual_update module=coordinator status=ok collection={} id={} edges_replaced={}",
            plan.collection.name(),
            plan.document_id,
            plan.replace_edges.is_some()
        );
        Ok(())
    }

    /// Removes one document; its vertex stays until `purge_vertex`.
    pub async fn delete_document(
        &self,
        collection: Collection,
        document_id: DocumentId,
    ) -> WriteResult<bool> {
        let deleted = self
            .stores
            .documents()
            .delete_one(collection, &Filter::by_id(document_id))
            .await?;
        info!(
            "event=document_delete module=coordinator status={} collection={} id={document_id}",
            if deleted { "ok" } else { "missing" },
            collection.name()
        );
        Ok(deleted)
    }

    /// Removes a vertex and its edges once no document references it.
    pub async fn purge_vertex(&self, vertex_id: VertexId) -> WriteResult<bool> {
        let graph = self.stores.graph();
        let Some(vertex) = graph.get_vertex(vertex_id).await? else {
            return Ok(false);
        };

        let collection = Collection::ALL
            .into_iter()
            .find(|collection| collection.vertex_label() == Some(vertex.label.as_str()));
        if let Some(collection) = collection {
            let filter = Filter::new().eq("vertex_id", vertex_id.to_string());
            if let Some(document) = self.stores.documents().find_one(collection, &filter).await? {
                let document_id = document
                    .get("id")
                    .and_then(Value::as_str)
                    .and_then(|text| Uuid::parse_str(text).ok())
                    .unwrap_or_default();
                return Err(WriteError::VertexInUse {
                    vertex_id,
                    document_id,
                });
            }
        }

        let removed = graph.remove_vertex(vertex_id).await?;
        info!(
            "event=vertex_purge module=coordinator status=ok label={} id={vertex_id}",
            vertex.label
        );
        Ok(removed)
    }

    /// Step-1 check for updates, skipping the record's own vertex.
    async fn check_rekey(&self, plan: &UpdatePlan) -> WriteResult<()> {
        let label = vertex_label(plan.collection)?;
        let graph = self.stores.graph();
        let Some(own) = graph.get_vertex(plan.vertex_id).await? else {
            return Ok(());
        };
        let unchanged = plan
            .natural_key
            .iter()
            .all(|(key, value)| own.properties.get(key) == Some(value));
        if unchanged || !graph.vertex_exists(label, &plan.natural_key).await? {
            return Ok(());
        }
        warn!(
            "event=dual_update module=coordinator status=rejected reason=vertex_exists collection={} name={}",
            plan.collection.name(),
            plan.name
        );
        Err(WriteError::VertexExists {
            label,
            name: plan.name.clone(),
        })
    }

    async fn link(&self, vertex: VertexId, edge: &EdgeSpec) -> Result<(), StoreError> {
        let (from, to) = edge.endpoints(vertex);
        self.stores
            .graph()
            .add_edge(from, to, edge.label(), Properties::new())
            .await?;
        Ok(())
    }
}

fn vertex_label(collection: Collection) -> WriteResult<&'static str> {
    collection.vertex_label().ok_or_else(|| {
        WriteError::Store(StoreError::InvalidData(format!(
            "collection `{}` has no graph vertex",
            collection.name()
        )))
    })
}

fn log_stage(stage: WriteStage, plan: &CreatePlan, vertex_id: Option<VertexId>) {
    match vertex_id {
        Some(vertex_id) => info!(
            "event=dual_write module=coordinator stage={} collection={} name={} vertex_id={vertex_id}",
            stage.as_str(),
            plan.collection.name(),
            plan.name
        ),
        None => info!(
            "event=dual_write module=coordinator stage={} collection={} name={}",
            stage.as_str(),
            plan.collection.name(),
            plan.name
        ),
    }
}

fn fatal(plan: &CreatePlan, last_stage: WriteStage, err: StoreError) -> WriteError {
    error!(
        "event=dual_write module=coordinator status=error last_stage={} collection={} name={} error={}",
        last_stage.as_str(),
        plan.collection.name(),
        plan.name,
        err
    );
    WriteError::Store(err)
}

#[cfg(test)]
mod tests {
    use super::{EdgeSpec, WriteStage};
    use uuid::Uuid;

    #[test]
    fn edge_spec_orients_around_new_vertex() {
        let vertex = Uuid::new_v4();
        let other = Uuid::new_v4();
        let incoming = EdgeSpec::Incoming {
            from: other,
            label: "performs",
        };
        let outgoing = EdgeSpec::Outgoing {
            to: other,
            label: "delivers_to",
        };
        assert_eq!(incoming.endpoints(vertex), (other, vertex));
        assert_eq!(outgoing.endpoints(vertex), (vertex, other));
        assert_eq!(outgoing.label(), "delivers_to");
    }

    #[test]
    fn stage_names_are_stable() {
        let stages = [
            WriteStage::Intending,
            WriteStage::VertexCreated,
            WriteStage::DocumentCreated,
            WriteStage::EdgesLinked,
            WriteStage::Committed,
        ];
        let names: Vec<_> = stages.iter().map(|stage| stage.as_str()).collect();
        assert_eq!(
            names,
            [
                "intending",
                "vertex_created",
                "document_created",
                "edges_linked",
                "committed"
            ]
        );
    }
}
