use labgraph_core::repo::graph_store::{GraphStore, Properties, SqliteGraphStore};
use labgraph_core::StoreError;
use serde_json::json;
use uuid::Uuid;

fn props(value: serde_json::Value) -> Properties {
    value.as_object().cloned().unwrap()
}

#[tokio::test]
async fn vertex_exists_matches_on_queried_properties_only() {
    let graph = SqliteGraphStore::open_in_memory().unwrap();
    graph
        .add_vertex(
            "Project",
            props(json!({ "name": "p1", "document_id": Uuid::new_v4().to_string() })),
        )
        .await
        .unwrap();

    assert!(graph
        .vertex_exists("Project", &props(json!({ "name": "p1" })))
        .await
        .unwrap());
    assert!(graph
        .vertex_exists("Project", &Properties::new())
        .await
        .unwrap());
    assert!(!graph
        .vertex_exists("Project", &props(json!({ "name": "p2" })))
        .await
        .unwrap());
    assert!(!graph
        .vertex_exists("Model", &props(json!({ "name": "p1" })))
        .await
        .unwrap());
}

#[tokio::test]
async fn edges_are_directed_and_filtered_by_label() {
    let graph = SqliteGraphStore::open_in_memory().unwrap();
    let project = graph.add_vertex("Project", Properties::new()).await.unwrap();
    let run = graph.add_vertex("ProjectRun", Properties::new()).await.unwrap();
    graph
        .add_edge(project.id, run.id, "performs", Properties::new())
        .await
        .unwrap();

    let outgoing = graph.edges_from(project.id, Some("performs")).await.unwrap();
    assert_eq!(outgoing.len(), 1);
    assert_eq!(outgoing[0].to, run.id);
    assert!(graph.edges_from(project.id, Some("runs")).await.unwrap().is_empty());
    assert!(graph.edges_from(run.id, None).await.unwrap().is_empty());
    assert_eq!(graph.edges_to(run.id, None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn edge_to_missing_vertex_is_rejected() {
    let graph = SqliteGraphStore::open_in_memory().unwrap();
    let project = graph.add_vertex("Project", Properties::new()).await.unwrap();
    let ghost = Uuid::new_v4();

    let err = graph
        .add_edge(project.id, ghost, "performs", Properties::new())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::MissingVertex(id) if id == ghost));
}

#[tokio::test]
async fn update_vertex_merges_properties() {
    let graph = SqliteGraphStore::open_in_memory().unwrap();
    let vertex = graph
        .add_vertex("Model", props(json!({ "name": "m1", "project": "a" })))
        .await
        .unwrap();
    graph
        .update_vertex(vertex.id, props(json!({ "name": "m9" })))
        .await
        .unwrap();

    let stored = graph.get_vertex(vertex.id).await.unwrap().unwrap();
    assert_eq!(stored.properties["name"], "m9");
    assert_eq!(stored.properties["project"], "a");

    let err = graph
        .update_vertex(Uuid::new_v4(), Properties::new())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::MissingVertex(_)));
}

#[tokio::test]
async fn removing_a_vertex_drops_its_edges() {
    let graph = SqliteGraphStore::open_in_memory().unwrap();
    let model = graph.add_vertex("Model", Properties::new()).await.unwrap();
    let handoff = graph.add_vertex("Handoff", Properties::new()).await.unwrap();
    let other = graph.add_vertex("Model", Properties::new()).await.unwrap();
    graph
        .add_edge(model.id, handoff.id, "sends", Properties::new())
        .await
        .unwrap();
    graph
        .add_edge(handoff.id, other.id, "delivers_to", Properties::new())
        .await
        .unwrap();

    assert!(graph.remove_vertex(handoff.id).await.unwrap());
    assert!(graph.get_vertex(handoff.id).await.unwrap().is_none());
    assert!(graph.edges_from(model.id, None).await.unwrap().is_empty());
    assert!(graph.edges_to(other.id, None).await.unwrap().is_empty());
    assert!(!graph.remove_vertex(handoff.id).await.unwrap());
}

#[tokio::test]
async fn remove_edges_touches_both_directions_of_one_label() {
    let graph = SqliteGraphStore::open_in_memory().unwrap();
    let a = graph.add_vertex("Model", Properties::new()).await.unwrap();
    let b = graph.add_vertex("Handoff", Properties::new()).await.unwrap();
    let c = graph.add_vertex("Model", Properties::new()).await.unwrap();
    graph.add_edge(a.id, b.id, "sends", Properties::new()).await.unwrap();
    graph.add_edge(b.id, c.id, "delivers_to", Properties::new()).await.unwrap();

    assert_eq!(graph.remove_edges(b.id, "sends").await.unwrap(), 1);
    assert!(graph.edges_to(b.id, None).await.unwrap().is_empty());
    assert_eq!(graph.edges_from(b.id, None).await.unwrap().len(), 1);
}
