//! Project use-case service.
//!
//! # Responsibility
//! - Create, read, list, update and delete projects.
//! - Default the owner to the acting user.
//!
//! # Invariants
//! - Project names are unique across the whole store.
//! - `list` only returns projects the acting user may access.

use crate::model::context::{ProjectPath, RootScope};
use crate::model::now_epoch_ms;
use crate::model::project::{ProjectDocument, ProjectDraft, ProjectPatch, ProjectView};
use crate::model::user::ActingUser;
use crate::repo::collection::Collection;
use crate::repo::coordinator::{CreatePlan, WriteCoordinator};
use crate::repo::document_store::{from_document, Filter};
use crate::repo::Stores;
use crate::service::context::{authorize, ContextResolver};
use crate::service::error::{CoreError, CoreResult};
use crate::service::lifecycle::{persist_update, project_key, remove, Dependents};
use crate::service::projection::Projector;
use crate::service::rules::{project_rules, RuleSet, ValidationPass};
use log::info;

const DEPENDENTS: Dependents = &[(Collection::ProjectRuns, "project")];

/// Project manager over injected stores.
pub struct ProjectManager {
    stores: Stores,
    rules: RuleSet<ProjectDraft, RootScope>,
}

impl ProjectManager {
    pub fn new(stores: Stores) -> Self {
        Self {
            stores,
            rules: project_rules(),
        }
    }

    /// Creates one project owned by `draft.owner`, or by `user` when unset.
    pub async fn create(&self, draft: ProjectDraft, user: &ActingUser) -> CoreResult<ProjectView> {
        if !user.is_active {
            return Err(CoreError::PermissionDenied {
                user: user.id,
                project: draft.fields.name,
                reason: "user is inactive",
            });
        }
        self.resolver().ensure_registered(user).await?;

        let mut draft = draft;
        if draft.owner.is_none() {
            draft.owner = Some(user.id);
        }
        let mut pass = ValidationPass::new(&RootScope, self.stores.documents(), Collection::Projects);
        let draft = self.rules.validate(draft, &mut pass).await?;

        let plan = CreatePlan {
            collection: Collection::Projects,
            name: draft.fields.name.clone(),
            natural_key: project_key(&draft.fields.name),
            edges: Vec::new(),
        };
        let created_by = user.id;
        let now = now_epoch_ms();
        let record = WriteCoordinator::new(&self.stores)
            .create(plan, move |ids| ProjectDocument {
                id: ids.document_id,
                vertex_id: ids.vertex_id,
                owner: draft.owner.unwrap_or(created_by),
                leads: draft.leads,
                team: draft.team,
                is_demo: draft.is_demo,
                fields: draft.fields,
                created_by,
                created_at: now,
                updated_at: now,
            })
            .await?;

        info!(
            "event=project_create module=service status=ok id={} name={}",
            record.id,
            record.name()
        );
        Projector::new(self.stores.documents())
            .project_view(record)
            .await
    }

    pub async fn get(&self, name: &str, user: &ActingUser) -> CoreResult<ProjectView> {
        let scope = self.resolver().resolve(&ProjectPath::new(name), user).await?;
        Projector::new(self.stores.documents())
            .project_view(scope.project)
            .await
    }

    /// Lists accessible projects in creation order.
    pub async fn list(&self, user: &ActingUser) -> CoreResult<Vec<ProjectView>> {
        let documents = self
            .stores
            .documents()
            .find_all(Collection::Projects, &Filter::new())
            .await?;
        let mut projector = Projector::new(self.stores.documents());
        let mut views = Vec::new();
        for document in documents {
            let record: ProjectDocument = from_document(document)?;
            if authorize(user, &record).is_ok() {
                views.push(projector.project_view(record).await?);
            }
        }
        Ok(views)
    }

    pub async fn update(
        &self,
        name: &str,
        patch: ProjectPatch,
        user: &ActingUser,
    ) -> CoreResult<ProjectView> {
        let current = self
            .resolver()
            .resolve(&ProjectPath::new(name), user)
            .await?
            .project;

        let mut draft = current.to_draft();
        patch.apply_to(&mut draft);
        let mut pass = ValidationPass::new(&RootScope, self.stores.documents(), Collection::Projects)
            .for_update(current.id);
        let draft = self.rules.validate(draft, &mut pass).await?;

        let record = ProjectDocument {
            owner: draft.owner.unwrap_or(current.owner),
            leads: draft.leads,
            team: draft.team,
            is_demo: draft.is_demo,
            fields: draft.fields,
            updated_at: now_epoch_ms(),
            ..current
        };
        persist_update(&self.stores, &record, project_key(record.name()), None).await?;

        info!(
            "event=project_update module=service status=ok id={} bounds_changed={}",
            record.id,
            patch.fields.touches_bounds()
        );
        Projector::new(self.stores.documents())
            .project_view(record)
            .await
    }

    /// Deletes a project without project runs.
    pub async fn delete(&self, name: &str, user: &ActingUser) -> CoreResult<()> {
        let current = self
            .resolver()
            .resolve(&ProjectPath::new(name), user)
            .await?
            .project;
        remove(&self.stores, &current, DEPENDENTS).await?;
        info!(
            "event=project_delete module=service status=ok id={} name={}",
            current.id,
            current.name()
        );
        Ok(())
    }

    fn resolver(&self) -> ContextResolver<'_> {
        ContextResolver::new(self.stores.documents())
    }
}
