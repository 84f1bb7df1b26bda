//! Dataset use-case service.
//!
//! # Invariants
//! - A dataset's window and scenarios stay inside its model run.
//! - The dataset vertex hangs off the model run vertex by a `produces` edge.
//! - `scheduled_checkin` is stored as given; no rule constrains it.

use crate::model::context::{ModelRunPath, ModelRunScope, ObjectContext, ResolvedScope};
use crate::model::dataset::{DatasetDocument, DatasetDraft, DatasetPatch, DatasetView};
use crate::model::now_epoch_ms;
use crate::model::user::ActingUser;
use crate::repo::collection::Collection;
use crate::repo::coordinator::{CreatePlan, EdgeSpec, WriteCoordinator};
use crate::repo::Stores;
use crate::service::context::ContextResolver;
use crate::service::edges;
use crate::service::error::CoreResult;
use crate::service::lifecycle::{persist_update, remove};
use crate::service::projection::Projector;
use crate::service::rules::{child_rules, RuleSet, ValidationPass};
use log::info;

/// Dataset manager over injected stores.
pub struct DatasetManager {
    stores: Stores,
    rules: RuleSet<DatasetDraft, ModelRunScope>,
}

impl DatasetManager {
    pub fn new(stores: Stores) -> Self {
        Self {
            stores,
            rules: child_rules(&[]),
        }
    }

    pub async fn create(
        &self,
        parent: &ModelRunPath,
        draft: DatasetDraft,
        user: &ActingUser,
    ) -> CoreResult<DatasetView> {
        let scope = self.resolver().resolve_for_create(parent, user).await?;
        let mut pass = ValidationPass::new(&scope, self.stores.documents(), Collection::Datasets);
        let draft = self.rules.validate(draft, &mut pass).await?;

        let context = scope.refs();
        let plan = CreatePlan {
            collection: Collection::Datasets,
            name: draft.fields.name.clone(),
            natural_key: context.natural_key(&draft.fields.name),
            edges: vec![EdgeSpec::Incoming {
                from: scope.vertex_id(),
                label: edges::PRODUCES,
            }],
        };
        let created_by = user.id;
        let now = now_epoch_ms();
        let record = WriteCoordinator::new(&self.stores)
            .create(plan, move |ids| DatasetDocument {
                id: ids.document_id,
                vertex_id: ids.vertex_id,
                context,
                fields: draft.fields,
                location: draft.location,
                scheduled_checkin: draft.scheduled_checkin,
                created_by,
                created_at: now,
                updated_at: now,
            })
            .await?;

        info!(
            "event=dataset_create module=service status=ok id={} model_run={} name={}",
            record.id,
            scope.model_run.name(),
            record.name()
        );
        Projector::new(self.stores.documents())
            .dataset_view(record)
            .await
    }

    pub async fn get(
        &self,
        parent: &ModelRunPath,
        name: &str,
        user: &ActingUser,
    ) -> CoreResult<DatasetView> {
        let resolver = self.resolver();
        let scope = resolver.resolve(parent, user).await?;
        let record: DatasetDocument = resolver
            .find_named(Collection::Datasets, &scope, name)
            .await?;
        Projector::new(self.stores.documents())
            .dataset_view(record)
            .await
    }

    pub async fn list(
        &self,
        parent: &ModelRunPath,
        user: &ActingUser,
    ) -> CoreResult<Vec<DatasetView>> {
        let resolver = self.resolver();
        let scope = resolver.resolve(parent, user).await?;
        let records: Vec<DatasetDocument> = resolver
            .list_children(Collection::Datasets, &scope)
            .await?;
        let mut projector = Projector::new(self.stores.documents());
        let mut views = Vec::with_capacity(records.len());
        for record in records {
            views.push(projector.dataset_view(record).await?);
        }
        Ok(views)
    }

    pub async fn update(
        &self,
        parent: &ModelRunPath,
        name: &str,
        patch: DatasetPatch,
        user: &ActingUser,
    ) -> CoreResult<DatasetView> {
        let resolver = self.resolver();
        let scope = resolver.resolve(parent, user).await?;
        let current: DatasetDocument = resolver
            .find_named(Collection::Datasets, &scope, name)
            .await?;

        let mut draft = current.to_draft();
        patch.apply_to(&mut draft);
        let mut pass = ValidationPass::new(&scope, self.stores.documents(), Collection::Datasets)
            .for_update(current.id);
        let draft = self.rules.validate(draft, &mut pass).await?;

        let record = DatasetDocument {
            fields: draft.fields,
            location: draft.location,
            scheduled_checkin: draft.scheduled_checkin,
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
            "event=dataset_update module=service status=ok id={}",
            record.id
        );
        Projector::new(self.stores.documents())
            .dataset_view(record)
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
        let current: DatasetDocument = resolver
            .find_named(Collection::Datasets, &scope, name)
            .await?;
        remove(&self.stores, &current, &[]).await?;
        info!(
            "event=dataset_delete module=service status=ok id={} name={}",
            current.id,
            current.name()
        );
        Ok(())
    }

    fn resolver(&self) -> ContextResolver<'_> {
        ContextResolver::new(self.stores.documents())
    }
}
