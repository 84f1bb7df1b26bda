use labgraph_core::repo::collection::Collection;
use labgraph_core::repo::document_store::{
    Document, DocumentStore, Filter, SqliteDocumentStore,
};
use labgraph_core::StoreError;
use serde_json::json;
use uuid::Uuid;

fn run_doc(id: Uuid, project: Uuid, name: &str) -> Document {
    json!({
        "id": id.to_string(),
        "project": project.to_string(),
        "name": name,
        "scheduled_start": "2024-02-01",
        "scheduled_end": "2024-11-30",
    })
    .as_object()
    .cloned()
    .unwrap()
}

#[tokio::test]
async fn insert_then_find_by_filter_and_id() {
    let store = SqliteDocumentStore::open_in_memory().unwrap();
    let project = Uuid::new_v4();
    let id = Uuid::new_v4();
    store
        .insert(Collection::ProjectRuns, run_doc(id, project, "r1"))
        .await
        .unwrap();

    let found = store
        .find_one(
            Collection::ProjectRuns,
            &Filter::new().eq_id("project", project).eq("name", "r1"),
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found["id"], id.to_string());

    let by_id = store
        .get_by_id(Collection::ProjectRuns, id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_id, found);

    // Collections are disjoint.
    assert!(store
        .get_by_id(Collection::Models, id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn natural_key_collision_is_unique_conflict() {
    let store = SqliteDocumentStore::open_in_memory().unwrap();
    let project = Uuid::new_v4();
    store
        .insert(Collection::ProjectRuns, run_doc(Uuid::new_v4(), project, "r1"))
        .await
        .unwrap();

    let err = store
        .insert(Collection::ProjectRuns, run_doc(Uuid::new_v4(), project, "r1"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::UniqueConflict {
            collection: "project_runs",
            ..
        }
    ));

    // Same name under another project is a different natural key.
    store
        .insert(
            Collection::ProjectRuns,
            run_doc(Uuid::new_v4(), Uuid::new_v4(), "r1"),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn insert_without_string_id_is_invalid_data() {
    let store = SqliteDocumentStore::open_in_memory().unwrap();
    let document = json!({ "name": "p1" }).as_object().cloned().unwrap();
    let err = store
        .insert(Collection::Projects, document)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidData(_)));
}

#[tokio::test]
async fn update_fields_merges_and_keeps_id() {
    let store = SqliteDocumentStore::open_in_memory().unwrap();
    let project = Uuid::new_v4();
    let id = Uuid::new_v4();
    store
        .insert(Collection::ProjectRuns, run_doc(id, project, "r1"))
        .await
        .unwrap();

    let mut fields = Document::new();
    fields.insert("id".to_string(), json!(Uuid::new_v4().to_string()));
    fields.insert("scheduled_end".to_string(), json!("2024-10-31"));
    let result = store
        .update_fields(Collection::ProjectRuns, &Filter::by_id(id), fields.clone())
        .await
        .unwrap();
    assert_eq!(result.matched, 1);
    assert_eq!(result.modified, 1);

    let stored = store
        .get_by_id(Collection::ProjectRuns, id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored["id"], id.to_string());
    assert_eq!(stored["scheduled_end"], "2024-10-31");
    assert_eq!(stored["name"], "r1");

    let again = store
        .update_fields(Collection::ProjectRuns, &Filter::by_id(id), fields)
        .await
        .unwrap();
    assert_eq!(again.matched, 1);
    assert_eq!(again.modified, 0);
}

#[tokio::test]
async fn rename_onto_sibling_is_unique_conflict() {
    let store = SqliteDocumentStore::open_in_memory().unwrap();
    let project = Uuid::new_v4();
    let second = Uuid::new_v4();
    store
        .insert(Collection::ProjectRuns, run_doc(Uuid::new_v4(), project, "r1"))
        .await
        .unwrap();
    store
        .insert(Collection::ProjectRuns, run_doc(second, project, "r2"))
        .await
        .unwrap();

    let mut fields = Document::new();
    fields.insert("name".to_string(), json!("r1"));
    let err = store
        .update_fields(Collection::ProjectRuns, &Filter::by_id(second), fields)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::UniqueConflict { .. }));

    let stored = store
        .get_by_id(Collection::ProjectRuns, second)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored["name"], "r2");
}

#[tokio::test]
async fn find_all_keeps_insertion_order_and_delete_one_removes_first_match() {
    let store = SqliteDocumentStore::open_in_memory().unwrap();
    let project = Uuid::new_v4();
    for name in ["r3", "r1", "r2"] {
        store
            .insert(Collection::ProjectRuns, run_doc(Uuid::new_v4(), project, name))
            .await
            .unwrap();
    }

    let names = store
        .find_all(Collection::ProjectRuns, &Filter::new().eq_id("project", project))
        .await
        .unwrap()
        .into_iter()
        .map(|document| document["name"].as_str().unwrap().to_string())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["r3", "r1", "r2"]);

    let filter = Filter::new().eq("name", "r1");
    assert!(store.delete_one(Collection::ProjectRuns, &filter).await.unwrap());
    assert!(!store.exists(Collection::ProjectRuns, &filter).await.unwrap());
    assert!(!store.delete_one(Collection::ProjectRuns, &filter).await.unwrap());
}
