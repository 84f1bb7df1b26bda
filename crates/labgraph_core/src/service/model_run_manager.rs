//! Model run use-case service.
//!
//! # Invariants
//! - A model run's window and scenarios stay inside its model.
//! - The model run vertex hangs off the model vertex by a `runs` edge.

use crate::model::context::{ModelPath, ModelScope, ObjectContext, ResolvedScope};
use crate::model::model_run::{ModelRunDocument, ModelRunDraft, ModelRunPatch, ModelRunView};
use crate::model::now_epoch_ms;
use crate::model::user::ActingUser;
use crate::repo::collection::Collection;
use crate::repo::coordinator::{CreatePlan, EdgeSpec, WriteCoordinator};
use crate::repo::Stores;
use crate::service::context::ContextResolver;
use crate::service::edges;
use crate::service::error::CoreResult;
use crate::service::lifecycle::{persist_update, remove, Dependents};
use crate::service::projection::Projector;
use crate::service::rules::{child_rules, RuleSet, ValidationPass, MODEL_RUN_CHILDREN};
use log::info;

const DEPENDENTS: Dependents = &[
    (Collection::Datasets, "model_run"),
    (Collection::Tasks, "model_run"),
];

/// Model run manager over injected stores.
pub struct ModelRunManager {
    stores: Stores,
    rules: RuleSet<ModelRunDraft, ModelScope>,
}

impl ModelRunManager {
    pub fn new(stores: Stores) -> Self {
        Self {
            stores,
            rules: child_rules(MODEL_RUN_CHILDREN),
        }
    }

    pub async fn create(
        &self,
        parent: &ModelPath,
        draft: ModelRunDraft,
        user: &ActingUser,
    ) -> CoreResult<ModelRunView> {
        let scope = self.resolver().resolve_for_create(parent, user).await?;
        let mut pass = ValidationPass::new(&scope, self.stores.documents(), Collection::ModelRuns);
        let draft = self.rules.validate(draft, &mut pass).await?;

        let context = scope.refs();
        let plan = CreatePlan {
            collection: Collection::ModelRuns,
            name: draft.name.clone(),
            natural_key: context.natural_key(&draft.name),
            edges: vec![EdgeSpec::Incoming {
                from: scope.vertex_id(),
                label: edges::RUNS,
            }],
        };
        let created_by = user.id;
        let now = now_epoch_ms();
        let record = WriteCoordinator::new(&self.stores)
            .create(plan, move |ids| ModelRunDocument {
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
            "event=model_run_create module=service status=ok id={} model={} name={}",
            record.id,
            scope.model.name(),
            record.name()
        );
        Projector::new(self.stores.documents())
            .model_run_view(record)
            .await
    }

    pub async fn get(
        &self,
        parent: &ModelPath,
        name: &str,
        user: &ActingUser,
    ) -> CoreResult<ModelRunView> {
        let scope = self
            .resolver()
            .resolve(&parent.model_run(name), user)
            .await?;
        Projector::new(self.stores.documents())
            .model_run_view(scope.model_run)
            .await
    }

    pub async fn list(
        &self,
        parent: &ModelPath,
        user: &ActingUser,
    ) -> CoreResult<Vec<ModelRunView>> {
        let resolver = self.resolver();
        let scope = resolver.resolve(parent, user).await?;
        let records: Vec<ModelRunDocument> = resolver
            .list_children(Collection::ModelRuns, &scope)
            .await?;
        let mut projector = Projector::new(self.stores.documents());
        let mut views = Vec::with_capacity(records.len());
        for record in records {
            views.push(projector.model_run_view(record).await?);
        }
        Ok(views)
    }

    pub async fn update(
        &self,
        parent: &ModelPath,
        name: &str,
        patch: ModelRunPatch,
        user: &ActingUser,
    ) -> CoreResult<ModelRunView> {
        let resolver = self.resolver();
        let scope = resolver.resolve(parent, user).await?;
        let current: ModelRunDocument = resolver
            .find_named(Collection::ModelRuns, &scope, name)
            .await?;

        let mut draft = current.fields.clone();
        patch.apply_to(&mut draft);
        let mut pass = ValidationPass::new(&scope, self.stores.documents(), Collection::ModelRuns)
            .for_update(current.id);
        let draft = self.rules.validate(draft, &mut pass).await?;

        let record = ModelRunDocument {
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
            "event=model_run_update module=service status=ok id={} bounds_changed={}",
            record.id,
            patch.touches_bounds()
        );
        Projector::new(self.stores.documents())
            .model_run_view(record)
            .await
    }

    /// Deletes a model run without datasets or tasks.
    pub async fn delete(&self, parent: &ModelPath, name: &str, user: &ActingUser) -> CoreResult<()> {
        let resolver = self.resolver();
        let scope = resolver.resolve(parent, user).await?;
        let current: ModelRunDocument = resolver
            .find_named(Collection::ModelRuns, &scope, name)
            .await?;
        remove(&self.stores, &current, DEPENDENTS).await?;
        info!(
            "event=model_run_delete module=service status=ok id={} name={}",
            current.id,
            current.name()
        );
        Ok(())
    }

    fn resolver(&self) -> ContextResolver<'_> {
        ContextResolver::new(self.stores.documents())
    }
}
