//! Model run records: one execution of a model.

use crate::model::context::{ModelPath, ModelRef};
use crate::model::fields::{EntityFields, EntityPatch};
use crate::model::user::{UserId, UserSummary};
use crate::repo::document_store::DocumentId;
use crate::repo::graph_store::VertexId;
use serde::{Deserialize, Serialize};

/// Stored model run document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRunDocument {
    pub id: DocumentId,
    pub vertex_id: VertexId,
    #[serde(flatten)]
    pub context: ModelRef,
    #[serde(flatten)]
    pub fields: EntityFields,
    pub created_by: UserId,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ModelRunDocument {
    pub fn name(&self) -> &str {
        &self.fields.name
    }
}

pub type ModelRunDraft = EntityFields;

pub type ModelRunPatch = EntityPatch;

/// Model run read model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelRunView {
    pub id: DocumentId,
    #[serde(flatten)]
    pub context: ModelPath,
    #[serde(flatten)]
    pub fields: EntityFields,
    pub created_by: UserSummary,
    pub created_at: i64,
    pub updated_at: i64,
}
