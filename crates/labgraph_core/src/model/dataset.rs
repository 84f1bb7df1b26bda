//! Dataset records produced by a model run.

use crate::model::context::{ModelRunPath, ModelRunRef};
use crate::model::fields::{present, Candidate, EntityFields, EntityPatch};
use crate::model::user::{UserId, UserSummary};
use crate::repo::document_store::DocumentId;
use crate::repo::graph_store::VertexId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Stored dataset document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetDocument {
    pub id: DocumentId,
    pub vertex_id: VertexId,
    #[serde(flatten)]
    pub context: ModelRunRef,
    #[serde(flatten)]
    pub fields: EntityFields,
    #[serde(default)]
    pub location: Option<String>,
    /// Planned date the dataset is checked into the archive. Not validated.
    #[serde(default)]
    pub scheduled_checkin: Option<NaiveDate>,
    pub created_by: UserId,
    pub created_at: i64,
    pub updated_at: i64,
}

impl DatasetDocument {
    pub fn name(&self) -> &str {
        &self.fields.name
    }

    pub fn to_draft(&self) -> DatasetDraft {
        DatasetDraft {
            fields: self.fields.clone(),
            location: self.location.clone(),
            scheduled_checkin: self.scheduled_checkin,
        }
    }
}

/// Caller input for dataset creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetDraft {
    #[serde(flatten)]
    pub fields: EntityFields,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub scheduled_checkin: Option<NaiveDate>,
}

impl DatasetDraft {
    pub fn new(fields: EntityFields) -> Self {
        Self {
            fields,
            location: None,
            scheduled_checkin: None,
        }
    }
}

impl Candidate for DatasetDraft {
    fn fields(&self) -> &EntityFields {
        &self.fields
    }

    fn fields_mut(&mut self) -> &mut EntityFields {
        &mut self.fields
    }
}

/// Partial dataset update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DatasetPatch {
    #[serde(flatten)]
    pub fields: EntityPatch,
    #[serde(deserialize_with = "present")]
    pub location: Option<Option<String>>,
    #[serde(deserialize_with = "present")]
    pub scheduled_checkin: Option<Option<NaiveDate>>,
}

impl DatasetPatch {
    pub fn apply_to(&self, draft: &mut DatasetDraft) {
        self.fields.apply_to(&mut draft.fields);
        if let Some(location) = &self.location {
            draft.location = location.clone();
        }
        if let Some(checkin) = self.scheduled_checkin {
            draft.scheduled_checkin = checkin;
        }
    }
}

/// Dataset read model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetView {
    pub id: DocumentId,
    #[serde(flatten)]
    pub context: ModelRunPath,
    #[serde(flatten)]
    pub fields: EntityFields,
    pub location: Option<String>,
    pub scheduled_checkin: Option<NaiveDate>,
    pub created_by: UserSummary,
    pub created_at: i64,
    pub updated_at: i64,
}
