//! Model records: a simulation or analysis model executed within a project run.

use crate::model::context::{ProjectRunPath, ProjectRunRef};
use crate::model::fields::{EntityFields, EntityPatch};
use crate::model::user::{UserId, UserSummary};
use crate::repo::document_store::DocumentId;
use crate::repo::graph_store::VertexId;
use serde::{Deserialize, Serialize};

/// Stored model document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDocument {
    pub id: DocumentId,
    pub vertex_id: VertexId,
    #[serde(flatten)]
    pub context: ProjectRunRef,
    #[serde(flatten)]
    pub fields: EntityFields,
    pub created_by: UserId,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ModelDocument {
    pub fn name(&self) -> &str {
        &self.fields.name
    }
}

pub type ModelDraft = EntityFields;

pub type ModelPatch = EntityPatch;

/// Model read model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelView {
    pub id: DocumentId,
    #[serde(flatten)]
    pub context: ProjectRunPath,
    #[serde(flatten)]
    pub fields: EntityFields,
    pub created_by: UserSummary,
    pub created_at: i64,
    pub updated_at: i64,
}
