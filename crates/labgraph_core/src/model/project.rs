//! Project records: the root of the ownership chain.
//!
//! # Invariants
//! - Project names are globally unique.
//! - `owner`, `leads` and `created_by` reference users in the directory.
//! - `is_demo` opens the project and everything under it to every active user.

use crate::model::fields::{present, Candidate, EntityFields, EntityPatch};
use crate::model::user::{TeamSummary, UserId, UserSummary};
use crate::repo::document_store::DocumentId;
use crate::repo::graph_store::VertexId;
use serde::{Deserialize, Serialize};

/// Stored project document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDocument {
    pub id: DocumentId,
    pub vertex_id: VertexId,
    #[serde(flatten)]
    pub fields: EntityFields,
    pub owner: UserId,
    #[serde(default)]
    pub leads: Vec<UserId>,
    #[serde(default)]
    pub team: Option<DocumentId>,
    #[serde(default)]
    pub is_demo: bool,
    pub created_by: UserId,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ProjectDocument {
    pub fn name(&self) -> &str {
        &self.fields.name
    }

    /// Converts the stored record back into an editable candidate.
    pub fn to_draft(&self) -> ProjectDraft {
        ProjectDraft {
            fields: self.fields.clone(),
            owner: Some(self.owner),
            leads: self.leads.clone(),
            team: self.team,
            is_demo: self.is_demo,
        }
    }
}

/// Caller input for project creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDraft {
    #[serde(flatten)]
    pub fields: EntityFields,
    /// Defaults to the acting user.
    #[serde(default)]
    pub owner: Option<UserId>,
    #[serde(default)]
    pub leads: Vec<UserId>,
    #[serde(default)]
    pub team: Option<DocumentId>,
    #[serde(default)]
    pub is_demo: bool,
}

impl ProjectDraft {
    pub fn new(fields: EntityFields) -> Self {
        Self {
            fields,
            owner: None,
            leads: Vec::new(),
            team: None,
            is_demo: false,
        }
    }
}

impl Candidate for ProjectDraft {
    fn fields(&self) -> &EntityFields {
        &self.fields
    }

    fn fields_mut(&mut self) -> &mut EntityFields {
        &mut self.fields
    }
}

/// Partial project update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProjectPatch {
    #[serde(flatten)]
    pub fields: EntityPatch,
    pub owner: Option<UserId>,
    pub leads: Option<Vec<UserId>>,
    #[serde(deserialize_with = "present")]
    pub team: Option<Option<DocumentId>>,
    pub is_demo: Option<bool>,
}

impl ProjectPatch {
    pub fn apply_to(&self, draft: &mut ProjectDraft) {
        self.fields.apply_to(&mut draft.fields);
        if let Some(owner) = self.owner {
            draft.owner = Some(owner);
        }
        if let Some(leads) = &self.leads {
            draft.leads = leads.clone();
        }
        if let Some(team) = self.team {
            draft.team = team;
        }
        if let Some(is_demo) = self.is_demo {
            draft.is_demo = is_demo;
        }
    }
}

/// Project read model with user and team ids projected to summaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectView {
    pub id: DocumentId,
    #[serde(flatten)]
    pub fields: EntityFields,
    pub owner: UserSummary,
    pub leads: Vec<UserSummary>,
    pub team: Option<TeamSummary>,
    pub is_demo: bool,
    pub created_by: UserSummary,
    pub created_at: i64,
    pub updated_at: i64,
}
