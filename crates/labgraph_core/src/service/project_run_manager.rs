//! Project run use-case service.
//!
//! # Invariants
//! - A run's window lies inside its project's window and its scenarios are a
//!   subset of the project's scenarios.
//! - The run vertex hangs off the project vertex by a `performs` edge.

use crate::model::context::{ObjectContext, ProjectPath, ProjectScope, ResolvedScope};
use crate::model::now_epoch_ms;
use crate::model::project_run::{
    ProjectRunDocument, ProjectRunDraft, ProjectRunPatch, ProjectRunView,
};
use crate::model::user::ActingUser;
use crate::repo::collection::Collection;
use crate::repo::coordinator::{CreatePlan, EdgeSpec, WriteCoordinator};
use crate::repo::Stores;
use crate::service::context::ContextResolver;
use crate::service::edges;
use crate::service::error::CoreResult;
use crate::service::lifecycle::{persist_update, remove, Dependents};
use crate::service::projection::Projector;
use crate::service::rules::{child_rules, RuleSet, ValidationPass, PROJECT_RUN_CHILDREN};
use log::info;

const DEPENDENTS: Dependents = &[
    (Collection::Models, "project_run"),
    (Collection::Handoffs, "project_run"),
];

/// Project run manager over injected stores.
pub struct ProjectRunManager {
    stores: Stores,
    rules: RuleSet<ProjectRunDraft, ProjectScope>,
}

impl ProjectRunManager {
    pub fn new(stores: Stores) -> Self {
        Self {
            stores,
            rules: child_rules(PROJECT_RUN_CHILDREN),
        }
    }

    pub async fn create(
        &self,
        parent: &ProjectPath,
        draft: ProjectRunDraft,
        user: &ActingUser,
    ) -> CoreResult<ProjectRunView> {
        let scope = self.resolver().resolve_for_create(parent, user).await?;
        let mut pass = ValidationPass::new(&scope, self.stores.documents(), Collection::ProjectRuns);
        let draft = self.rules.validate(draft, &mut pass).await?;

        let context = scope.refs();
        let plan = CreatePlan {
            collection: Collection::ProjectRuns,
            name: draft.name.clone(),
            natural_key: context.natural_key(&draft.name),
            edges: vec![EdgeSpec::Incoming {
                from: scope.vertex_id(),
                label: edges::PERFORMS,
            }],
        };
        let created_by = user.id;
        let now = now_epoch_ms();
        let record = WriteCoordinator::new(&self.stores)
            .create(plan, move |ids| ProjectRunDocument {
                id: ids.document_id,
                vertex_id: ids.vertex_id,
                context,
                fields: draft,
                created_by,
                created_at: now,
                updated_at: now,
            })
            .await?;

        info!(
            "event=project_run_create module=service status=ok id={} project={} name={}",
            record.id,
            scope.project.name(),
            record.name()
        );
        Projector::new(self.stores.documents())
            .project_run_view(record)
            .await
    }

    pub async fn get(
        &self,
        parent: &ProjectPath,
        name: &str,
        user: &ActingUser,
    ) -> CoreResult<ProjectRunView> {
        let scope = self
            .resolver()
            .resolve(&parent.project_run(name), user)
            .await?;
        Projector::new(self.stores.documents())
            .project_run_view(scope.project_run)
            .await
    }

    pub async fn list(
        &self,
        parent: &ProjectPath,
        user: &ActingUser,
    ) -> CoreResult<Vec<ProjectRunView>> {
        let resolver = self.resolver();
        let scope = resolver.resolve(parent, user).await?;
        let records: Vec<ProjectRunDocument> = resolver
            .list_children(Collection::ProjectRuns, &scope)
            .await?;
        let mut projector = Projector::new(self.stores.documents());
        let mut views = Vec::with_capacity(records.len());
        for record in records {
            views.push(projector.project_run_view(record).await?);
        }
        Ok(views)
    }

    pub async fn update(
        &self,
        parent: &ProjectPath,
        name: &str,
        patch: ProjectRunPatch,
        user: &ActingUser,
    ) -> CoreResult<ProjectRunView> {
        let resolver = self.resolver();
        let scope = resolver.resolve(parent, user).await?;
        let current: ProjectRunDocument = resolver
            .find_named(Collection::ProjectRuns, &scope, name)
            .await?;

        let mut draft = current.fields.clone();
        patch.apply_to(&mut draft);
        let mut pass = ValidationPass::new(&scope, self.stores.documents(), Collection::ProjectRuns)
            .for_update(current.id);
        let draft = self.rules.validate(draft, &mut pass).await?;

        let record = ProjectRunDocument {
            fields: draft,
            updated_at: now_epoch_ms(),
            ..current
        };
        persist_update(
            &self.stores,
            &record,
            record.context.natural_key(record.name()),
            None,
        )
        .await?;

        info!(
            "event=project_run_update module=service status=ok id={} bounds_changed={}",
            record.id,
            patch.touches_bounds()
        );
        Projector::new(self.stores.documents())
            .project_run_view(record)
            .await
    }

    /// Deletes a run without models or handoffs.
    pub async fn delete(&self, parent: &ProjectPath, name: &str, user: &ActingUser) -> CoreResult<()> {
        let resolver = self.resolver();
        let scope = resolver.resolve(parent, user).await?;
        let current: ProjectRunDocument = resolver
            .find_named(Collection::ProjectRuns, &scope, name)
            .await?;
        remove(&self.stores, &current, DEPENDENTS).await?;
        info!(
            "event=project_run_delete module=service status=ok id={} name={}",
            current.id,
            current.name()
        );
        Ok(())
    }

    fn resolver(&self) -> ContextResolver<'_> {
        ContextResolver::new(self.stores.documents())
    }
}
