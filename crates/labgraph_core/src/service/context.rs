//! Context validator chain.
//!
//! # Responsibility
//! - Resolve a name path (`*Path`) into live parent records (`*Scope`).
//! - Authorize the acting user against the resolved project.
//!
//! # Invariants
//! - Each level resolves its parent first, then looks up its own name only
//!   among the parent's children; names are never resolved globally.
//! - A failure at an ancestor level surfaces as that ancestor's error.
//! - Resolution is read-only and never returns a partial chain.

use crate::model::context::{
    ModelPath, ModelRunPath, ModelRunScope, ModelScope, ProjectPath, ProjectRunPath,
    ProjectRunScope, ProjectScope, ResolvedScope, RootScope, ScopeFilter,
};
use crate::model::project::ProjectDocument;
use crate::model::user::ActingUser;
use crate::repo::collection::Collection;
use crate::repo::document_store::{from_document, DocumentStore, Filter};
use crate::service::error::{CoreError, CoreResult};
use crate::service::rules::canonical_name;
use async_trait::async_trait;
use log::{debug, warn};
use serde::de::DeserializeOwned;

/// A name path that can be resolved level by level.
#[async_trait]
pub trait ContextPath: Send + Sync {
    /// Resolved form of this path.
    type Scope: ResolvedScope;

    /// Resolves every level without checking permissions.
    async fn lookup(&self, resolver: &ContextResolver<'_>) -> CoreResult<Self::Scope>;
}

/// Resolves paths against the document store.
pub struct ContextResolver<'a> {
    documents: &'a dyn DocumentStore,
}

impl<'a> ContextResolver<'a> {
    pub fn new(documents: &'a dyn DocumentStore) -> Self {
        Self { documents }
    }

    /// Resolves `path`, then authorizes `user` against its project.
    pub async fn resolve<P: ContextPath>(
        &self,
        path: &P,
        user: &ActingUser,
    ) -> CoreResult<P::Scope> {
        let scope = path.lookup(self).await?;
        authorize(user, scope.project())?;
        debug!(
            "event=context_resolve module=context status=ok project={} user={}",
            scope.project().name(),
            user.id
        );
        Ok(scope)
    }

    /// Like `resolve`, and also requires `user` to be registered in the
    /// directory. Creates store `created_by`, so they go through here.
    pub async fn resolve_for_create<P: ContextPath>(
        &self,
        path: &P,
        user: &ActingUser,
    ) -> CoreResult<P::Scope> {
        let scope = self.resolve(path, user).await?;
        self.ensure_registered(user).await?;
        Ok(scope)
    }

    /// Fails with `acting_user_registered` when `user` has no directory record.
    pub async fn ensure_registered(&self, user: &ActingUser) -> CoreResult<()> {
        if self
            .documents
            .exists(Collection::Users, &Filter::by_id(user.id))
            .await?
        {
            return Ok(());
        }
        warn!(
            "event=permission_check module=context status=denied user={} reason=unregistered",
            user.id
        );
        Err(CoreError::rule(
            "acting_user_registered",
            format!("acting user {} is not registered", user.id),
        ))
    }

    /// Finds the child named `name` under `parent`, or `ContextNotFound`.
    pub async fn find_named<T: DeserializeOwned>(
        &self,
        collection: Collection,
        parent: &(dyn ScopeFilter + Sync),
        name: &str,
    ) -> CoreResult<T> {
        let name = canonical_name(name);
        let filter = parent.child_filter().eq("name", name.as_str());
        match self.documents.find_one(collection, &filter).await? {
            Some(document) => Ok(from_document(document)?),
            None => {
                debug!(
                    "event=context_resolve module=context status=not_found entity={} name={name}",
                    collection.name()
                );
                Err(CoreError::not_found(collection.entity_name(), name))
            }
        }
    }

    /// Lists every child of `parent` in insertion order.
    pub async fn list_children<T: DeserializeOwned>(
        &self,
        collection: Collection,
        parent: &(dyn ScopeFilter + Sync),
    ) -> CoreResult<Vec<T>> {
        self.documents
            .find_all(collection, &parent.child_filter())
            .await?
            .into_iter()
            .map(|document| from_document(document).map_err(CoreError::from))
            .collect()
    }
}

/// Checks `user` against the ownership fields of `project`.
///
/// Passes for superusers, the owner, a lead, the creator, or any active user
/// when the project is a demo. Inactive users never pass.
pub fn authorize(user: &ActingUser, project: &ProjectDocument) -> CoreResult<()> {
    let denial = if !user.is_active {
        Some("user is inactive")
    } else if user.is_superuser
        || project.owner == user.id
        || project.leads.contains(&user.id)
        || project.created_by == user.id
        || project.is_demo
    {
        None
    } else {
        Some("user is not owner, lead or creator")
    };

    match denial {
        None => Ok(()),
        Some(reason) => {
            warn!(
                "event=permission_check module=context status=denied project={} user={} reason=\"{reason}\"",
                project.name(),
                user.id
            );
            Err(CoreError::PermissionDenied {
                user: user.id,
                project: project.name().to_string(),
                reason,
            })
        }
    }
}

#[async_trait]
impl ContextPath for ProjectPath {
    type Scope = ProjectScope;

    async fn lookup(&self, resolver: &ContextResolver<'_>) -> CoreResult<ProjectScope> {
        let project = resolver
            .find_named(Collection::Projects, &RootScope, &self.project)
            .await?;
        Ok(ProjectScope { project })
    }
}

#[async_trait]
impl ContextPath for ProjectRunPath {
    type Scope = ProjectRunScope;

    async fn lookup(&self, resolver: &ContextResolver<'_>) -> CoreResult<ProjectRunScope> {
        let parent = self.parent().lookup(resolver).await?;
        let project_run = resolver
            .find_named(Collection::ProjectRuns, &parent, &self.project_run)
            .await?;
        Ok(ProjectRunScope {
            project: parent.project,
            project_run,
        })
    }
}

#[async_trait]
impl ContextPath for ModelPath {
    type Scope = ModelScope;

    async fn lookup(&self, resolver: &ContextResolver<'_>) -> CoreResult<ModelScope> {
        let parent = self.parent().lookup(resolver).await?;
        let model = resolver
            .find_named(Collection::Models, &parent, &self.model)
            .await?;
        Ok(ModelScope {
            project: parent.project,
            project_run: parent.project_run,
            model,
        })
    }
}

#[async_trait]
impl ContextPath for ModelRunPath {
    type Scope = ModelRunScope;

    async fn lookup(&self, resolver: &ContextResolver<'_>) -> CoreResult<ModelRunScope> {
        let parent = self.parent().lookup(resolver).await?;
        let model_run = resolver
            .find_named(Collection::ModelRuns, &parent, &self.model_run)
            .await?;
        Ok(ModelRunScope {
            project: parent.project,
            project_run: parent.project_run,
            model: parent.model,
            model_run,
        })
    }
}
