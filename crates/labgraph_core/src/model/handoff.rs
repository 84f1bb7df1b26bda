//! Handoff records: a scheduled transfer between two models of one project run.
//!
//! # Invariants
//! - `from_model` and `to_model` belong to the handoff's project run.
//! - `from_model != to_model`.

use crate::model::context::{ProjectRunPath, ProjectRunRef};
use crate::model::fields::{Candidate, EntityFields, EntityPatch};
use crate::model::user::{UserId, UserSummary};
use crate::repo::document_store::DocumentId;
use crate::repo::graph_store::VertexId;
use serde::{Deserialize, Serialize};

/// Stored handoff document; endpoints are model document ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffDocument {
    pub id: DocumentId,
    pub vertex_id: VertexId,
    #[serde(flatten)]
    pub context: ProjectRunRef,
    #[serde(flatten)]
    pub fields: EntityFields,
    pub from_model: DocumentId,
    pub to_model: DocumentId,
    pub created_by: UserId,
    pub created_at: i64,
    pub updated_at: i64,
}

impl HandoffDocument {
    pub fn name(&self) -> &str {
        &self.fields.name
    }
}

/// Caller input for handoff creation; endpoints are model names in the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffDraft {
    #[serde(flatten)]
    pub fields: EntityFields,
    pub from_model: String,
    pub to_model: String,
}

impl HandoffDraft {
    pub fn new(
        fields: EntityFields,
        from_model: impl Into<String>,
        to_model: impl Into<String>,
    ) -> Self {
        Self {
            fields,
            from_model: from_model.into(),
            to_model: to_model.into(),
        }
    }
}

impl Candidate for HandoffDraft {
    fn fields(&self) -> &EntityFields {
        &self.fields
    }

    fn fields_mut(&mut self) -> &mut EntityFields {
        &mut self.fields
    }
}

/// Partial handoff update; changing an endpoint replaces its graph edge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HandoffPatch {
    #[serde(flatten)]
    pub fields: EntityPatch,
    pub from_model: Option<String>,
    pub to_model: Option<String>,
}

impl HandoffPatch {
    pub fn apply_to(&self, draft: &mut HandoffDraft) {
        self.fields.apply_to(&mut draft.fields);
        if let Some(from_model) = &self.from_model {
            draft.from_model = from_model.clone();
        }
        if let Some(to_model) = &self.to_model {
            draft.to_model = to_model.clone();
        }
    }

    pub fn touches_endpoints(&self) -> bool {
        self.from_model.is_some() || self.to_model.is_some()
    }
}

/// Handoff read model with endpoint ids projected to model names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandoffView {
    pub id: DocumentId,
    #[serde(flatten)]
    pub context: ProjectRunPath,
    #[serde(flatten)]
    pub fields: EntityFields,
    pub from_model: String,
    pub to_model: String,
    pub created_by: UserSummary,
    pub created_at: i64,
    pub updated_at: i64,
}
