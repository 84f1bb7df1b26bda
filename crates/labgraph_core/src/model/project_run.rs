//! Project run records: one scheduled execution of a project.

use crate::model::context::{ProjectPath, ProjectRef};
use crate::model::fields::{EntityFields, EntityPatch};
use crate::model::user::{UserId, UserSummary};
use crate::repo::document_store::DocumentId;
use crate::repo::graph_store::VertexId;
use serde::{Deserialize, Serialize};

/// Stored project run document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRunDocument {
    pub id: DocumentId,
    pub vertex_id: VertexId,
    #[serde(flatten)]
    pub context: ProjectRef,
    #[serde(flatten)]
    pub fields: EntityFields,
    pub created_by: UserId,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ProjectRunDocument {
    pub fn name(&self) -> &str {
        &self.fields.name
    }
}

/// Caller input for project run creation.
pub type ProjectRunDraft = EntityFields;

/// Partial project run update.
pub type ProjectRunPatch = EntityPatch;

/// Project run read model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectRunView {
    pub id: DocumentId,
    #[serde(flatten)]
    pub context: ProjectPath,
    #[serde(flatten)]
    pub fields: EntityFields,
    pub created_by: UserSummary,
    pub created_at: i64,
    pub updated_at: i64,
}
