//! Task records performed within a model run.

use crate::model::context::{ModelRunPath, ModelRunRef};
use crate::model::fields::{present, Candidate, EntityFields, EntityPatch};
use crate::model::user::{UserId, UserSummary};
use crate::repo::document_store::DocumentId;
use crate::repo::graph_store::VertexId;
use serde::{Deserialize, Serialize};

/// Task lifecycle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created but not started.
    #[default]
    Todo,
    /// Work is in progress.
    InProgress,
    /// Completed successfully.
    Done,
    /// No longer actionable.
    Cancelled,
}

/// Stored task document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDocument {
    pub id: DocumentId,
    pub vertex_id: VertexId,
    #[serde(flatten)]
    pub context: ModelRunRef,
    #[serde(flatten)]
    pub fields: EntityFields,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub assignee: Option<UserId>,
    pub created_by: UserId,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TaskDocument {
    pub fn name(&self) -> &str {
        &self.fields.name
    }

    pub fn to_draft(&self) -> TaskDraft {
        TaskDraft {
            fields: self.fields.clone(),
            status: self.status,
            assignee: self.assignee,
        }
    }
}

/// Caller input for task creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDraft {
    #[serde(flatten)]
    pub fields: EntityFields,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub assignee: Option<UserId>,
}

impl TaskDraft {
    pub fn new(fields: EntityFields) -> Self {
        Self {
            fields,
            status: TaskStatus::Todo,
            assignee: None,
        }
    }
}

impl Candidate for TaskDraft {
    fn fields(&self) -> &EntityFields {
        &self.fields
    }

    fn fields_mut(&mut self) -> &mut EntityFields {
        &mut self.fields
    }
}

/// Partial task update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TaskPatch {
    #[serde(flatten)]
    pub fields: EntityPatch,
    pub status: Option<TaskStatus>,
    #[serde(deserialize_with = "present")]
    pub assignee: Option<Option<UserId>>,
}

impl TaskPatch {
    pub fn apply_to(&self, draft: &mut TaskDraft) {
        self.fields.apply_to(&mut draft.fields);
        if let Some(status) = self.status {
            draft.status = status;
        }
        if let Some(assignee) = self.assignee {
            draft.assignee = assignee;
        }
    }
}

/// Task read model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskView {
    pub id: DocumentId,
    #[serde(flatten)]
    pub context: ModelRunPath,
    #[serde(flatten)]
    pub fields: EntityFields,
    pub status: TaskStatus,
    pub assignee: Option<UserSummary>,
    pub created_by: UserSummary,
    pub created_at: i64,
    pub updated_at: i64,
}
