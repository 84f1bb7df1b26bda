//! Domain model for tracked research entities.
//!
//! # Responsibility
//! - Define stored documents, caller drafts/patches and read models per
//!   entity level.
//! - Define the three context representations (path, scope, ref).
//!
//! # Invariants
//! - Every stored entity carries both its document id and its vertex id.
//! - Child documents persist ancestors only as ids (`*Ref`).

pub mod context;
pub mod dataset;
pub mod fields;
pub mod handoff;
pub mod model_run;
pub mod project;
pub mod project_run;
pub mod sim_model;
pub mod task;
pub mod user;

/// Current wall-clock time as Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

use crate::repo::collection::Collection;
use crate::repo::document_store::DocumentId;
use crate::repo::graph_store::VertexId;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A stored entity document paired with one graph vertex.
pub trait StoredRecord: Serialize + DeserializeOwned + Send + Sync {
    /// Collection holding this record type.
    const COLLECTION: Collection;

    fn id(&self) -> DocumentId;
    fn vertex_id(&self) -> VertexId;
    fn name(&self) -> &str;
}

macro_rules! stored_record {
    ($record:ty, $collection:expr) => {
        impl StoredRecord for $record {
            const COLLECTION: Collection = $collection;

            fn id(&self) -> DocumentId {
                self.id
            }

            fn vertex_id(&self) -> VertexId {
                self.vertex_id
            }

            fn name(&self) -> &str {
                &self.fields.name
            }
        }
    };
}

stored_record!(project::ProjectDocument, Collection::Projects);
stored_record!(project_run::ProjectRunDocument, Collection::ProjectRuns);
stored_record!(sim_model::ModelDocument, Collection::Models);
stored_record!(model_run::ModelRunDocument, Collection::ModelRuns);
stored_record!(dataset::DatasetDocument, Collection::Datasets);
stored_record!(task::TaskDocument, Collection::Tasks);
stored_record!(handoff::HandoffDocument, Collection::Handoffs);
