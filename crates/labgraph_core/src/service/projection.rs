//! Read-side projection.
//!
//! # Responsibility
//! - Turn stored ancestor ids back into ancestor names.
//! - Turn user and team ids into summaries.
//! - Assemble the read model of every entity.
//!
//! # Invariants
//! - Every lookup is a point lookup by id; a missing target is a
//!   `DanglingReference`, never silently skipped.
//! - One projector caches its lookups, so listing many siblings reads each
//!   shared ancestor once.

use crate::model::context::{
    ModelPath, ModelRef, ModelRunPath, ModelRunRef, ProjectPath, ProjectRef, ProjectRunPath,
    ProjectRunRef,
};
use crate::model::dataset::{DatasetDocument, DatasetView};
use crate::model::handoff::{HandoffDocument, HandoffView};
use crate::model::model_run::{ModelRunDocument, ModelRunView};
use crate::model::project::{ProjectDocument, ProjectView};
use crate::model::project_run::{ProjectRunDocument, ProjectRunView};
use crate::model::sim_model::{ModelDocument, ModelView};
use crate::model::task::{TaskDocument, TaskView};
use crate::model::user::{TeamRecord, TeamSummary, UserId, UserRecord, UserSummary};
use crate::repo::collection::Collection;
use crate::repo::document_store::{from_document, Document, DocumentId, DocumentStore};
use crate::service::error::{CoreError, CoreResult};
use log::warn;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Deserialize)]
struct Named {
    name: String,
}

/// Id-to-name projector bound to one document store.
pub struct Projector<'a> {
    documents: &'a dyn DocumentStore,
    cache: HashMap<(Collection, DocumentId), Document>,
}

impl<'a> Projector<'a> {
    pub fn new(documents: &'a dyn DocumentStore) -> Self {
        Self {
            documents,
            cache: HashMap::new(),
        }
    }

    async fn fetch(&mut self, collection: Collection, id: DocumentId) -> CoreResult<Document> {
        if let Some(document) = self.cache.get(&(collection, id)) {
            return Ok(document.clone());
        }
        match self.documents.get_by_id(collection, id).await? {
            Some(document) => {
                self.cache.insert((collection, id), document.clone());
                Ok(document)
            }
            None => {
                warn!(
                    "event=projection module=projection status=dangling collection={} id={id}",
                    collection.name()
                );
                Err(CoreError::DanglingReference {
                    entity: collection.entity_name(),
                    id,
                })
            }
        }
    }

    async fn name_of(&mut self, collection: Collection, id: DocumentId) -> CoreResult<String> {
        let named: Named = from_document(self.fetch(collection, id).await?)?;
        Ok(named.name)
    }

    pub async fn project_path(&mut self, refs: &ProjectRef) -> CoreResult<ProjectPath> {
        Ok(ProjectPath::new(
            self.name_of(Collection::Projects, refs.project).await?,
        ))
    }

    pub async fn project_run_path(&mut self, refs: &ProjectRunRef) -> CoreResult<ProjectRunPath> {
        let parent = self
            .project_path(&ProjectRef {
                project: refs.project,
            })
            .await?;
        Ok(parent.project_run(
            self.name_of(Collection::ProjectRuns, refs.project_run)
                .await?,
        ))
    }

    pub async fn model_path(&mut self, refs: &ModelRef) -> CoreResult<ModelPath> {
        let parent = self
            .project_run_path(&ProjectRunRef {
                project: refs.project,
                project_run: refs.project_run,
            })
            .await?;
        Ok(parent.model(self.name_of(Collection::Models, refs.model).await?))
    }

    pub async fn model_run_path(&mut self, refs: &ModelRunRef) -> CoreResult<ModelRunPath> {
        let parent = self
            .model_path(&ModelRef {
                project: refs.project,
                project_run: refs.project_run,
                model: refs.model,
            })
            .await?;
        Ok(parent.model_run(self.name_of(Collection::ModelRuns, refs.model_run).await?))
    }

    pub async fn model_name(&mut self, id: DocumentId) -> CoreResult<String> {
        self.name_of(Collection::Models, id).await
    }

    pub async fn user_summary(&mut self, id: UserId) -> CoreResult<UserSummary> {
        let user: UserRecord = from_document(self.fetch(Collection::Users, id).await?)?;
        Ok(user.summary())
    }

    pub async fn team_summary(&mut self, id: DocumentId) -> CoreResult<TeamSummary> {
        let team: TeamRecord = from_document(self.fetch(Collection::Teams, id).await?)?;
        Ok(team.summary())
    }

    pub async fn project_view(&mut self, record: ProjectDocument) -> CoreResult<ProjectView> {
        let mut leads = Vec::with_capacity(record.leads.len());
        for lead in &record.leads {
            leads.push(self.user_summary(*lead).await?);
        }
        let team = match record.team {
            Some(team) => Some(self.team_summary(team).await?),
            None => None,
        };
        Ok(ProjectView {
            id: record.id,
            owner: self.user_summary(record.owner).await?,
            leads,
            team,
            is_demo: record.is_demo,
            created_by: self.user_summary(record.created_by).await?,
            created_at: record.created_at,
            updated_at: record.updated_at,
            fields: record.fields,
        })
    }

    pub async fn project_run_view(
        &mut self,
        record: ProjectRunDocument,
    ) -> CoreResult<ProjectRunView> {
        Ok(ProjectRunView {
            id: record.id,
            context: self.project_path(&record.context).await?,
            created_by: self.user_summary(record.created_by).await?,
            created_at: record.created_at,
            updated_at: record.updated_at,
            fields: record.fields,
        })
    }

    pub async fn model_view(&mut self, record: ModelDocument) -> CoreResult<ModelView> {
        Ok(ModelView {
            id: record.id,
            context: self.project_run_path(&record.context).await?,
            created_by: self.user_summary(record.created_by).await?,
            created_at: record.created_at,
            updated_at: record.updated_at,
            fields: record.fields,
        })
    }

    pub async fn model_run_view(&mut self, record: ModelRunDocument) -> CoreResult<ModelRunView> {
        Ok(ModelRunView {
            id: record.id,
            context: self.model_path(&record.context).await?,
            created_by: self.user_summary(record.created_by).await?,
            created_at: record.created_at,
            updated_at: record.updated_at,
            fields: record.fields,
        })
    }

    pub async fn dataset_view(&mut self, record: DatasetDocument) -> CoreResult<DatasetView> {
        Ok(DatasetView {
            id: record.id,
            context: self.model_run_path(&record.context).await?,
            location: record.location,
            scheduled_checkin: record.scheduled_checkin,
            created_by: self.user_summary(record.created_by).await?,
            created_at: record.created_at,
            updated_at: record.updated_at,
            fields: record.fields,
        })
    }

    pub async fn task_view(&mut self, record: TaskDocument) -> CoreResult<TaskView> {
        let assignee = match record.assignee {
            Some(user) => Some(self.user_summary(user).await?),
            None => None,
        };
        Ok(TaskView {
            id: record.id,
            context: self.model_run_path(&record.context).await?,
            status: record.status,
            assignee,
            created_by: self.user_summary(record.created_by).await?,
            created_at: record.created_at,
            updated_at: record.updated_at,
            fields: record.fields,
        })
    }

    pub async fn handoff_view(&mut self, record: HandoffDocument) -> CoreResult<HandoffView> {
        Ok(HandoffView {
            id: record.id,
            context: self.project_run_path(&record.context).await?,
            from_model: self.model_name(record.from_model).await?,
            to_model: self.model_name(record.to_model).await?,
            created_by: self.user_summary(record.created_by).await?,
            created_at: record.created_at,
            updated_at: record.updated_at,
            fields: record.fields,
        })
    }
}
