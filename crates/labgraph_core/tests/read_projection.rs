mod common;

use async_trait::async_trait;
use common::{fields, register, Lab, PROJECT};
use labgraph_core::model::project_run::ProjectRunDocument;
use labgraph_core::repo::collection::Collection;
use labgraph_core::repo::document_store::{
    to_document, Document, DocumentId, DocumentStore, Filter, SqliteDocumentStore, UpdateResult,
};
use labgraph_core::repo::graph_store::SqliteGraphStore;
use labgraph_core::service::projection::Projector;
use labgraph_core::{
    CoreError, ProjectPatch, ProjectPath, ProjectRunPath, StoreResult, Stores,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Document store that counts point lookups.
struct CountingDocuments {
    inner: SqliteDocumentStore,
    point_lookups: Arc<AtomicUsize>,
}

#[async_trait]
impl DocumentStore for CountingDocuments {
    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> StoreResult<Option<Document>> {
        self.inner.find_one(collection, filter).await
    }

    async fn find_all(&self, collection: Collection, filter: &Filter) -> StoreResult<Vec<Document>> {
        self.inner.find_all(collection, filter).await
    }

    async fn insert(&self, collection: Collection, document: Document) -> StoreResult<Document> {
        self.inner.insert(collection, document).await
    }

    async fn update_fields(
        &self,
        collection: Collection,
        filter: &Filter,
        fields: Document,
    ) -> StoreResult<UpdateResult> {
        self.inner.update_fields(collection, filter, fields).await
    }

    async fn delete_one(&self, collection: Collection, filter: &Filter) -> StoreResult<bool> {
        self.inner.delete_one(collection, filter).await
    }

    async fn exists(&self, collection: Collection, filter: &Filter) -> StoreResult<bool> {
        self.inner.exists(collection, filter).await
    }

    async fn get_by_id(
        &self,
        collection: Collection,
        id: DocumentId,
    ) -> StoreResult<Option<Document>> {
        self.point_lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.get_by_id(collection, id).await
    }
}

#[tokio::test]
async fn read_after_create_reproduces_caller_fields_with_ancestor_names() {
    let lab = Lab::new().await.with_models().await;
    let input = fields("mr1", "2024-04-01", "2024-06-30", &["high", "baseline"])
        .with_description("spin-up with observed forcing");

    let created = lab
        .model_runs()
        .create(&lab.run_path().model("m1"), input.clone(), &lab.acting())
        .await
        .unwrap();
    let read = lab
        .model_runs()
        .get(&lab.run_path().model("m1"), "mr1", &lab.acting())
        .await
        .unwrap();

    assert_eq!(read, created);
    assert_eq!(read.fields, input);
    assert_eq!(read.context.project, PROJECT);
    assert_eq!(read.context.model, "m1");
    assert_eq!(read.created_by.username, "owner");
}

#[tokio::test]
async fn listing_siblings_reads_shared_ancestors_once() {
    let point_lookups = Arc::new(AtomicUsize::new(0));
    let stores = Stores::new(
        Arc::new(CountingDocuments {
            inner: SqliteDocumentStore::open_in_memory().unwrap(),
            point_lookups: point_lookups.clone(),
        }),
        Arc::new(SqliteGraphStore::open_in_memory().unwrap()),
    );
    let lab = Lab::on(stores).await;
    let parent = ProjectPath::new(PROJECT);
    for name in ["r1", "r2", "r3"] {
        lab.runs()
            .create(
                &parent,
                fields(name, "2024-02-01", "2024-03-01", &[]),
                &lab.acting(),
            )
            .await
            .unwrap();
    }

    point_lookups.store(0, Ordering::SeqCst);
    let runs = lab.runs().list(&parent, &lab.acting()).await.unwrap();

    assert_eq!(runs.len(), 3);
    assert!(runs.iter().all(|run| run.context == parent));
    // One project name and one creator summary.
    assert_eq!(point_lookups.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn missing_ancestor_id_is_dangling_reference() {
    let lab = Lab::new().await;
    let ghost = Uuid::new_v4();
    let document = to_document(&serde_json::json!({
        "id": Uuid::new_v4().to_string(),
        "vertex_id": Uuid::new_v4().to_string(),
        "project": ghost.to_string(),
        "name": "orphan",
        "scheduled_start": "2024-02-01",
        "scheduled_end": "2024-03-01",
        "created_by": lab.owner.id.to_string(),
        "created_at": 0,
        "updated_at": 0,
    }))
    .unwrap();
    let record: ProjectRunDocument =
        labgraph_core::repo::document_store::from_document(document).unwrap();

    let err = Projector::new(lab.stores.documents())
        .project_run_view(record)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CoreError::DanglingReference { entity: "project", id } if id == ghost
    ));
    assert_eq!(err.kind(), "dangling_reference");
}

#[tokio::test]
async fn project_view_projects_users_to_summaries() {
    let lab = Lab::new().await;
    let lead = register(&lab.stores, "lead").await;
    let view = lab
        .projects()
        .update(
            PROJECT,
            ProjectPatch {
                leads: Some(vec![lead.id]),
                ..ProjectPatch::default()
            },
            &lab.acting(),
        )
        .await
        .unwrap();

    assert_eq!(view.owner.username, "owner");
    assert_eq!(view.leads.len(), 1);
    assert_eq!(view.leads[0].username, "lead");
    assert_eq!(view.leads[0].full_name, "lead user");
    assert!(view.team.is_none());

    let json = serde_json::to_value(&view).unwrap();
    assert_eq!(json["name"], PROJECT);
    assert_eq!(json["scheduled_end"], "2024-12-31");
    assert_eq!(json["owner"]["username"], "owner");
}

#[tokio::test]
async fn handoff_view_names_its_endpoints() {
    let lab = Lab::new().await.with_models().await;
    let path: ProjectRunPath = lab.run_path();
    lab.handoffs()
        .create(
            &path,
            labgraph_core::HandoffDraft::new(
                fields("h1", "2024-05-01", "2024-05-31", &[]),
                "m2",
                "m1",
            ),
            &lab.acting(),
        )
        .await
        .unwrap();

    let view = lab.handoffs().get(&path, "h1", &lab.acting()).await.unwrap();
    assert_eq!(view.from_model, "m2");
    assert_eq!(view.to_model, "m1");
    assert_eq!(view.context, path);
}
