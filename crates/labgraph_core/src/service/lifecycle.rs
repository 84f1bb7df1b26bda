//! Update and delete steps shared by every entity manager.

use crate::model::StoredRecord;
use crate::repo::collection::Collection;
use crate::repo::coordinator::{EdgeSpec, UpdatePlan, WriteCoordinator};
use crate::repo::document_store::{to_document, Filter};
use crate::repo::graph_store::Properties;
use crate::repo::Stores;
use crate::service::error::{CoreError, CoreResult};
use serde_json::Value;

/// Documents that block deleting a record: `(collection, field holding its id)`.
pub(crate) type Dependents = &'static [(Collection, &'static str)];

/// Graph natural key of a project: its globally unique name.
pub(crate) fn project_key(name: &str) -> Properties {
    let mut key = Properties::new();
    key.insert("name".to_string(), Value::String(name.to_string()));
    key
}

/// Writes `record` over its stored document and refreshes its vertex key.
pub(crate) async fn persist_update<R: StoredRecord>(
    stores: &Stores,
    record: &R,
    natural_key: Properties,
    replace_edges: Option<Vec<EdgeSpec>>,
) -> CoreResult<()> {
    let plan = UpdatePlan {
        collection: R::COLLECTION,
        name: record.name().to_string(),
        document_id: record.id(),
        vertex_id: record.vertex_id(),
        fields: to_document(record)?,
        natural_key,
        replace_edges,
    };
    WriteCoordinator::new(stores).update(plan).await?;
    Ok(())
}

/// Removes `record` and its vertex unless a dependent document still
/// references it.
pub(crate) async fn remove<R: StoredRecord>(
    stores: &Stores,
    record: &R,
    dependents: Dependents,
) -> CoreResult<()> {
    for (collection, field) in dependents {
        let filter = Filter::new().eq_id(*field, record.id());
        if stores.documents().exists(*collection, &filter).await? {
            return Err(CoreError::rule(
                "no_dependents",
                format!(
                    "{} `{}` is still referenced by a {} through `{field}`",
                    R::COLLECTION.entity_name(),
                    record.name(),
                    collection.entity_name()
                ),
            ));
        }
    }

    let coordinator = WriteCoordinator::new(stores);
    coordinator
        .delete_document(R::COLLECTION, record.id())
        .await?;
    coordinator.purge_vertex(record.vertex_id()).await?;
    Ok(())
}
