//! Model use-case service.
//!
//! # Invariants
//! - A model's window and scenarios stay inside its project run.
//! - The model vertex hangs off the run vertex by a `runs` edge.
//! - A model referenced by a handoff cannot be deleted.

use crate::model::context::{ObjectContext, ProjectRunPath, ProjectRunScope, ResolvedScope};
use crate::model::now_epoch_ms;
use crate::model::sim_model::{ModelDocument, ModelDraft, ModelPatch, ModelView};
use crate::model::user::ActingUser;
use crate::repo::collection::Collection;
use crate::repo::coordinator::{CreatePlan, EdgeSpec, WriteCoordinator};
use crate::repo::Stores;
use crate::service::context::ContextResolver;
use crate::service::edges;
use crate::service::error::CoreResult;
use crate::service::lifecycle::{persist_update, remove, Dependents};
use crate::service::projection::Projector;
use crate::service::rules::{child_rules, RuleSet, ValidationPass, MODEL_CHILDREN};
use log::info;

const DEPENDENTS: Dependents = &[
    (Collection::ModelRuns, "model"),
    (Collection::Handoffs, "from_model"),
    (Collection::Handoffs, "to_model"),
];

/// Model manager over injected stores.
pub struct ModelManager {
    stores: Stores,
    rules: RuleSet<ModelDraft, ProjectRunScope>,
}

impl ModelManager {
    pub fn new(stores: Stores) -> Self {
        Self {
            stores,
            rules: child_rules(MODEL_CHILDREN),
        }
    }

    pub async fn create(
        &self,
        parent: &ProjectRunPath,
        draft: ModelDraft,
        user: &ActingUser,
    ) -> CoreResult<ModelView> {
        let scope = self.resolver().resolve_for_create(parent, user).await?;
        let mut pass = ValidationPass::new(&scope, self.stores.documents(), Collection::Models);
        let draft = self.rules.validate(draft, &mut pass).await?;

        let context = scope.refs();
        let plan = CreatePlan {
            collection: Collection::Models,
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
            .create(plan, move |ids| ModelDocument {
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
            "event=model_create module=service status=ok id={} project={} project_run={} name={}",
            record.id,
            scope.project.name(),
            scope.project_run.name(),
            record.name()
        );
        Projector::new(self.stores.documents())
            .model_view(record)
            .await
    }

    pub async fn get(
        &self,
        parent: &ProjectRunPath,
        name: &str,
        user: &ActingUser,
    ) -> CoreResult<ModelView> {
        let scope = self
            .resolver()
            .resolve(&parent.model(name), user)
            .await?;
        Projector::new(self.stores.documents())
            .model_view(scope.model)
            .await
    }

    pub async fn list(
        &self,
        parent: &ProjectRunPath,
        user: &ActingUser,
    ) -> CoreResult<Vec<ModelView>> {
        let resolver = self.resolver();
        let scope = resolver.resolve(parent, user).await?;
        let records: Vec<ModelDocument> = resolver
            .list_children(Collection::Models, &scope)
            .await?;
        let mut projector = Projector::new(self.stores.documents());
        let mut views = Vec::with_capacity(records.len());
        for record in records {
            views.push(projector.model_view(record).await?);
        }
        Ok(views)
    }

    pub async fn update(
        &self,
        parent: &ProjectRunPath,
        name: &str,
        patch: ModelPatch,
        user: &ActingUser,
    ) -> CoreResult<ModelView> {
        let resolver = self.resolver();
        let scope = resolver.resolve(parent, user).await?;
        let current: ModelDocument = resolver
            .find_named(Collection::Models, &scope, name)
            .await?;

        let mut draft = current.fields.clone();
        patch.apply_to(&mut draft);
        let mut pass = ValidationPass::new(&scope, self.stores.documents(), Collection::Models)
            .for_update(current.id);
        let draft = self.rules.validate(draft, &mut pass).await?;

        let record = ModelDocument {
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
            "event=model_update module=service status=ok id={} bounds_changed={}",
            record.id,
            patch.touches_bounds()
        );
        Projector::new(self.stores.documents())
            .model_view(record)
            .await
    }

    /// Deletes a model without model runs or handoffs.
    pub async fn delete(&self, parent: &ProjectRunPath, name: &str, user: &ActingUser) -> CoreResult<()> {
        let resolver = self.resolver();
        let scope = resolver.resolve(parent, user).await?;
        let current: ModelDocument = resolver
            .find_named(Collection::Models, &scope, name)
            .await?;
        remove(&self.stores, &current, DEPENDENTS).await?;
        info!(
            "event=model_delete module=service status=ok id={} name={}",
            current.id,
            current.name()
        );
        Ok(())
    }

    fn resolver(&self) -> ContextResolver<'_> {
        ContextResolver::new(self.stores.documents())
    }
}
