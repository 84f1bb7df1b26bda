//! Handoff use-case service.
//!
//! # Responsibility
//! - Create, read, list, update and delete handoffs between two models of
//!   one project run.
//! - Keep the `sends` and `delivers_to` edges in step with the endpoints.
//!
//! # Invariants
//! - Endpoints are distinct models of the handoff's own project run.
//! - Handoff scenarios are defined on both endpoint models.
//! - Distinct endpoints are checked before any store access.

use crate::model::context::{ObjectContext, ProjectRunPath, ProjectRunScope, ResolvedScope};
use crate::model::handoff::{HandoffDocument, HandoffDraft, HandoffPatch, HandoffView};
use crate::model::now_epoch_ms;
use crate::model::sim_model::ModelDocument;
use crate::model::user::ActingUser;
use crate::repo::collection::Collection;
use crate::repo::coordinator::{CreatePlan, EdgeSpec, WriteCoordinator};
use crate::repo::document_store::from_document;
use crate::repo::Stores;
use crate::service::context::ContextResolver;
use crate::service::edges;
use crate::service::error::{CoreError, CoreResult};
use crate::service::lifecycle::{persist_update, remove};
use crate::service::projection::Projector;
use crate::service::rules::{handoff_rules, model_filter, RuleSet, ValidationPass};
use log::info;

/// Handoff manager over injected stores.
pub struct HandoffManager {
    stores: Stores,
    rules: RuleSet<HandoffDraft, ProjectRunScope>,
}

impl HandoffManager {
    pub fn new(stores: Stores) -> Self {
        Self {
            stores,
            rules: handoff_rules(),
        }
    }

    pub async fn create(
        &self,
        parent: &ProjectRunPath,
        draft: HandoffDraft,
        user: &ActingUser,
    ) -> CoreResult<HandoffView> {
        let scope = self.resolver().resolve_for_create(parent, user).await?;
        let mut pass = ValidationPass::new(&scope, self.stores.documents(), Collection::Handoffs);
        let draft = self.rules.validate(draft, &mut pass).await?;
        let (from_model, to_model) = endpoints(&mut pass, &draft).await?;

        let context = scope.refs();
        let plan = CreatePlan {
            collection: Collection::Handoffs,
            name: draft.fields.name.clone(),
            natural_key: context.natural_key(&draft.fields.name),
            edges: endpoint_edges(&from_model, &to_model),
        };
        let created_by = user.id;
        let now = now_epoch_ms();
        let record = WriteCoordinator::new(&self.stores)
            .create(plan, move |ids| HandoffDocument {
                id: ids.document_id,
                vertex_id: ids.vertex_id,
                context,
                fields: draft.fields,
                from_model: from_model.id,
                to_model: to_model.id,
                created_by,
                created_at: now,
                updated_at: now,
            })
            .await?;

        info!(
            "event=handoff_create module=service status=ok id={} project_run={} name={}",
            record.id,
            scope.project_run.name(),
            record.name()
        );
        Projector::new(self.stores.documents())
            .handoff_view(record)
            .await
    }

    pub async fn get(
        &self,
        parent: &ProjectRunPath,
        name: &str,
        user: &ActingUser,
    ) -> CoreResult<HandoffView> {
        let resolver = self.resolver();
        let scope = resolver.resolve(parent, user).await?;
        let record: HandoffDocument = resolver
            .find_named(Collection::Handoffs, &scope, name)
            .await?;
        Projector::new(self.stores.documents())
            .handoff_view(record)
            .await
    }

    pub async fn list(
        &self,
        parent: &ProjectRunPath,
        user: &ActingUser,
    ) -> CoreResult<Vec<HandoffView>> {
        let resolver = self.resolver();
        let scope = resolver.resolve(parent, user).await?;
        let records: Vec<HandoffDocument> = resolver
            .list_children(Collection::Handoffs, &scope)
            .await?;
        let mut projector = Projector::new(self.stores.documents());
        let mut views = Vec::with_capacity(records.len());
        for record in records {
            views.push(projector.handoff_view(record).await?);
        }
        Ok(views)
    }

    /// Updates a handoff; changed endpoints replace both endpoint edges.
    pub async fn update(
        &self,
        parent: &ProjectRunPath,
        name: &str,
        patch: HandoffPatch,
        user: &ActingUser,
    ) -> CoreResult<HandoffView> {
        let resolver = self.resolver();
        let scope = resolver.resolve(parent, user).await?;
        let current: HandoffDocument = resolver
            .find_named(Collection::Handoffs, &scope, name)
            .await?;

        let mut projector = Projector::new(self.stores.documents());
        let mut draft = HandoffDraft::new(
            current.fields.clone(),
            projector.model_name(current.from_model).await?,
            projector.model_name(current.to_model).await?,
        );
        patch.apply_to(&mut draft);
        let mut pass = ValidationPass::new(&scope, self.stores.documents(), Collection::Handoffs)
            .for_update(current.id);
        let draft = self.rules.validate(draft, &mut pass).await?;
        let (from_model, to_model) = endpoints(&mut pass, &draft).await?;

        let replace_edges = patch
            .touches_endpoints()
            .then(|| endpoint_edges(&from_model, &to_model));
        let record = HandoffDocument {
            fields: draft.fields,
            from_model: from_model.id,
            to_model: to_model.id,
            updated_at: now_epoch_ms(),
            ..current
        };
        persist_update(
            &self.stores,
            &record,
            record.context.natural_key(record.name()),
            replace_edges,
        )
        .await?;

        info!(
            "event=handoff_update module=service status=ok id={} endpoints_changed={}",
            record.id,
            patch.touches_endpoints()
        );
        projector.handoff_view(record).await
    }

    pub async fn delete(
        &self,
        parent: &ProjectRunPath,
        name: &str,
        user: &ActingUser,
    ) -> CoreResult<()> {
        let resolver = self.resolver();
        let scope = resolver.resolve(parent, user).await?;
        let current: HandoffDocument = resolver
            .find_named(Collection::Handoffs, &scope, name)
            .await?;
        remove(&self.stores, &current, &[]).await?;
        info!(
            "event=handoff_delete module=service status=ok id={} name={}",
            current.id,
            current.name()
        );
        Ok(())
    }

    fn resolver(&self) -> ContextResolver<'_> {
        ContextResolver::new(self.stores.documents())
    }
}

/// Loads both endpoint models through the pass memo; the rules already
/// fetched them, so this costs no store round trip.
async fn endpoints(
    pass: &mut ValidationPass<'_, ProjectRunScope>,
    draft: &HandoffDraft,
) -> CoreResult<(ModelDocument, ModelDocument)> {
    let from_model = load_model(pass, &draft.from_model).await?;
    let to_model = load_model(pass, &draft.to_model).await?;
    Ok((from_model, to_model))
}

async fn load_model(
    pass: &mut ValidationPass<'_, ProjectRunScope>,
    name: &str,
) -> CoreResult<ModelDocument> {
    let filter = model_filter(pass.scope(), name);
    match pass.find_one(Collection::Models, &filter).await? {
        Some(document) => Ok(from_document(document)?),
        None => Err(CoreError::not_found(Collection::Models.entity_name(), name)),
    }
}

fn endpoint_edges(from_model: &ModelDocument, to_model: &ModelDocument) -> Vec<EdgeSpec> {
    vec![
        EdgeSpec::Incoming {
            from: from_model.vertex_id,
            label: edges::SENDS,
        },
        EdgeSpec::Outgoing {
            to: to_model.vertex_id,
            label: edges::DELIVERS_TO,
        },
    ]
}
