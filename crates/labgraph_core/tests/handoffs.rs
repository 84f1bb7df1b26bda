mod common;

use common::{fields, Lab};
use labgraph_core::model::sim_model::ModelDocument;
use labgraph_core::repo::collection::Collection;
use labgraph_core::repo::document_store::from_document;
use labgraph_core::service::context::ContextResolver;
use labgraph_core::service::edges;
use labgraph_core::service::rules::{handoff_rules, model_filter, ValidationPass};
use labgraph_core::{CoreError, EntityFields, HandoffDraft, HandoffPatch};

fn handoff(name: &str, from: &str, to: &str, scenarios: &[&str]) -> HandoffDraft {
    HandoffDraft::new(fields(name, "2024-05-01", "2024-05-31", scenarios), from, to)
}

async fn model(lab: &Lab, name: &str) -> ModelDocument {
    let resolver = ContextResolver::new(lab.stores.documents());
    resolver
        .resolve(&lab.run_path().model(name), &lab.acting())
        .await
        .unwrap()
        .model
}

fn rule_of(err: &CoreError) -> &'static str {
    match err {
        CoreError::DomainValidation { rule, .. } => *rule,
        other => panic!("expected domain validation, got {other}"),
    }
}

#[tokio::test]
async fn same_endpoint_is_rejected_before_any_write() {
    let lab = Lab::new().await.with_models().await;
    let err = lab
        .handoffs()
        .create(
            &lab.run_path(),
            handoff("h1", "m1", " m1 ", &[]),
            &lab.acting(),
        )
        .await
        .unwrap_err();

    assert_eq!(rule_of(&err), "handoff_endpoints_distinct");
    assert!(err.to_string().contains("`m1`"));
    assert_eq!(lab.count(Collection::Handoffs).await, 0);
    assert!(!lab.any_vertex("Handoff").await);
}

#[tokio::test]
async fn create_links_sender_and_receiver() {
    let lab = Lab::new().await.with_models().await;
    let view = lab
        .handoffs()
        .create(
            &lab.run_path(),
            handoff("h1", " m1", "m2 ", &["baseline"]),
            &lab.acting(),
        )
        .await
        .unwrap();
    assert_eq!(view.from_model, "m1");
    assert_eq!(view.to_model, "m2");
    assert_eq!(view.context, lab.run_path());

    let (m1, m2) = (model(&lab, "m1").await, model(&lab, "m2").await);
    let graph = lab.stores.graph();
    let sent = graph.edges_from(m1.vertex_id, Some(edges::SENDS)).await.unwrap();
    assert_eq!(sent.len(), 1);
    let delivered = graph
        .edges_to(m2.vertex_id, Some(edges::DELIVERS_TO))
        .await
        .unwrap();
    assert_eq!(delivered.len(), 1);
    assert_eq!(sent[0].to, delivered[0].from);
}

#[tokio::test]
async fn endpoints_must_be_models_of_the_same_run() {
    let lab = Lab::new().await.with_models().await;
    let err = lab
        .handoffs()
        .create(
            &lab.run_path(),
            handoff("h1", "m1", "m9", &[]),
            &lab.acting(),
        )
        .await
        .unwrap_err();
    assert_eq!(rule_of(&err), "handoff_endpoints_resolve");
    assert!(err.to_string().contains("to_model `m9`"));
}

#[tokio::test]
async fn scenarios_must_exist_on_both_endpoints() {
    let lab = Lab::new().await.with_models().await;
    let err = lab
        .handoffs()
        .create(
            &lab.run_path(),
            handoff("h1", "m1", "m2", &["high"]),
            &lab.acting(),
        )
        .await
        .unwrap_err();
    assert_eq!(rule_of(&err), "handoff_scenarios_within_endpoints");
    let message = err.to_string();
    assert!(message.contains("model `m2`"), "{message}");
    assert!(message.contains("[baseline]"), "{message}");
}

#[tokio::test]
async fn endpoint_lookups_are_shared_within_one_pass() {
    let lab = Lab::new().await.with_models().await;
    let resolver = ContextResolver::new(lab.stores.documents());
    let scope = resolver.resolve(&lab.run_path(), &lab.acting()).await.unwrap();
    let mut pass = ValidationPass::new(&scope, lab.stores.documents(), Collection::Handoffs);

    let draft = handoff_rules()
        .validate(handoff("h1", "m1", "m2", &["baseline"]), &mut pass)
        .await
        .unwrap();
    // One lookup per endpoint plus the sibling-name scan.
    assert_eq!(pass.round_trips(), 3);

    let document = pass
        .find_one(Collection::Models, &model_filter(&scope, &draft.from_model))
        .await
        .unwrap()
        .unwrap();
    let from: EntityFields = from_document(document).unwrap();
    assert_eq!(from.name, "m1");
    assert_eq!(pass.round_trips(), 3);
}

#[tokio::test]
async fn changing_an_endpoint_replaces_its_edge() {
    let lab = Lab::new().await.with_models().await;
    lab.models()
        .create(
            &lab.run_path(),
            fields("m3", "2024-03-01", "2024-10-31", &["baseline"]),
            &lab.acting(),
        )
        .await
        .unwrap();
    lab.handoffs()
        .create(
            &lab.run_path(),
            handoff("h1", "m1", "m2", &[]),
            &lab.acting(),
        )
        .await
        .unwrap();

    let view = lab
        .handoffs()
        .update(
            &lab.run_path(),
            "h1",
            HandoffPatch {
                to_model: Some("m3".to_string()),
                ..HandoffPatch::default()
            },
            &lab.acting(),
        )
        .await
        .unwrap();
    assert_eq!(view.to_model, "m3");

    let graph = lab.stores.graph();
    let (m1, m2, m3) = (
        model(&lab, "m1").await,
        model(&lab, "m2").await,
        model(&lab, "m3").await,
    );
    assert!(graph
        .edges_to(m2.vertex_id, Some(edges::DELIVERS_TO))
        .await
        .unwrap()
        .is_empty());
    assert_eq!(
        graph
            .edges_to(m3.vertex_id, Some(edges::DELIVERS_TO))
            .await
            .unwrap()
            .len(),
        1
    );
    assert_eq!(
        graph
            .edges_from(m1.vertex_id, Some(edges::SENDS))
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn models_with_handoffs_cannot_be_deleted() {
    let lab = Lab::new().await.with_models().await;
    lab.handoffs()
        .create(
            &lab.run_path(),
            handoff("h1", "m1", "m2", &[]),
            &lab.acting(),
        )
        .await
        .unwrap();

    let err = lab
        .models()
        .delete(&lab.run_path(), "m2", &lab.acting())
        .await
        .unwrap_err();
    assert_eq!(rule_of(&err), "no_dependents");
    assert!(err.to_string().contains("to_model"));

    lab.handoffs()
        .delete(&lab.run_path(), "h1", &lab.acting())
        .await
        .unwrap();
    lab.models()
        .delete(&lab.run_path(), "m2", &lab.acting())
        .await
        .unwrap();
    assert!(lab
        .handoffs()
        .list(&lab.run_path(), &lab.acting())
        .await
        .unwrap()
        .is_empty());
}
