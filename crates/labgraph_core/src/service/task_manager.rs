//! Task use-case service.
//!
//! # Invariants
//! - A task's window and scenarios stay inside its model run.
//! - The task vertex hangs off the model run vertex by a `performs` edge.
//! - An assignee, when set, is a registered user.

use crate::model::context::{ModelRunPath, ModelRunScope, ObjectContext, ResolvedScope};
use crate::model::now_epoch_ms;
use crate::model::task::{TaskDocument, TaskDraft, TaskPatch, TaskView};
use crate::model::user::ActingUser;
use crate::repo::collection::Collection;
use crate::repo::coordinator::{CreatePlan, EdgeSpec, WriteCoordinator};
use crate::repo::Stores;
use crate::service::context::ContextResolver;
use crate::service::edges;
use crate::service::error::CoreResult;
use crate::service::lifecycle::{persist_update, remove};
use crate::service::projection::Projector;
use crate::service::rules::{task_rules, RuleSet, ValidationPass};
use log::info;

/// Task manager over injected stores.
pub struct TaskManager {
    stores: Stores,
    rules: RuleSet<TaskDraft, ModelRunScope>,
}

impl TaskManager {
    pub fn new(stores: Stores) -> Self {
        Self {
            stores,
            rules: task_rules(),
        }
    }

    pub async fn create(
        &self,
        parent: &ModelRunPath,
        draft: TaskDraft,
        user: &ActingUser,
    ) -> CoreResult<TaskView> {
        let scope = self.resolver().resolve_for_create(parent, user).await?;
        let mut pass = ValidationPass::new(&scope, self.stores.documents(), Collection::Tasks);
        let draft = self.rules.validate(draft, &mut pass).await?;

        let context = scope.refs();
        let plan = CreatePlan {
            collection: Collection::Tasks,
            name: draft.fields.name.clone(),
            natural_key: context.natural_key(&draft.fields.name),
            edges: vec![EdgeSpec::Incoming {
                from: scope.vertex_id(),
                label: edges::PERFORMS,
            }],
        };
        let created_by = user.id;
        let now = now_epoch_ms();
        let record = WriteCoordinator::new(&self.stores)
            .create(plan, move |ids| TaskDocument {
                id: ids.document_id,
                vertex_id: ids.vertex_id,
                context,
                fields: draft.fields,
                status: draft.status,
                assignee: draft.assignee,
                created_by,
                created_at: now,
                updated_at: now,
            })
            .await?;

        info!(
            "event=task_create module=service status=ok id={} model_run={} name={}",
            record.id,
            scope.model_run.name(),
            record.name()
        );
        Projector::new(self.stores.documents())
            .task_view(record)
            .await
    }

    pub async fn get(
        &self,
        parent: &ModelRunPath,
        name: &str,
        user: &ActingUser,
    ) -> CoreResult<TaskView> {
        let resolver = self.resolver();
        let scope = resolver.resolve(parent, user).await?;
        let record: TaskDocument = resolver
            .find_named(Collection::Tasks, &scope, name)
            .await?;
        Projector::new(self.stores.documents())
            .task_view(record)
            .await
    }

    pub async fn list(
        &self,
        parent: &ModelRunPath,
        user: &ActingUser,
    ) -> CoreResult<Vec<TaskView>> {
        let resolver = self.resolver();
        let scope = resolver.resolve(parent, user).await?;
        let records: Vec<TaskDocument> = resolver
            .list_children(Collection::Tasks, &scope)
            .await?;
        let mut projector = Projector::new(self.stores.documents());
        let mut views = Vec::with_capacity(records.len());
        for record in records {
            views.push(projector.task_view(record).await?);
        }
        Ok(views)
    }

    pub async fn update(
        &self,
        parent: &ModelRunPath,
        name: &str,
        patch: TaskPatch,
        user: &ActingUser,
    ) -> CoreResult<TaskView> {
        let resolver = self.resolver();
        let scope = resolver.resolve(parent, user).await?;
        let current: TaskDocument = resolver
            .find_named(Collection::Tasks, &scope, name)
            .await?;

        let mut draft = current.to_draft();
        patch.apply_to(&mut draft);
        let mut pass = ValidationPass::new(&scope, self.stores.documents(), Collection::Tasks)
            .for_update(current.id);
        let draft = self.rules.validate(draft, &mut pass).await?;

        let record = TaskDocument {
            fields: draft.fields,
            status: draft.status,
            assignee: draft.assignee,
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
            "event=task_update module=service status=ok id={} status={:?}",
            record.id, record.status
        );
        Projector::new(self.stores.documents())
            .task_view(record)
            .await
    }

    pub async fn delete(
        &self,
        parent: &ModelRunPath,
        name: &str,
        user: &ActingUser,
    ) -> CoreResult<()> {
        let resolver = self.resolver();
        let scope = resolver.resolve(parent, user).await?;
        let current: TaskDocument = resolver
            .find_named(Collection::Tasks, &scope, name)
            .await?;
        remove(&self.stores, &current, &[]).await?;
        info!(
            "event=task_delete module=service status=ok id={} name={}",
            current.id,
            current.name()
        );
        Ok(())
    }

    fn resolver(&self) -> ContextResolver<'_> {
        ContextResolver::new(self.stores.documents())
    }
}
