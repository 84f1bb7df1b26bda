//! Context models: an entity's position in the project hierarchy.
//!
//! # Responsibility
//! - `*Path` (simple context): ancestor names exactly as callers supply them.
//! - `*Scope` (document context): the same chain with every name replaced by
//!   the live parent record; only produced by the context resolver.
//! - `*Ref` (object context): the chain as document ids; the only form
//!   persisted inside a child document.
//!
//! # Invariants
//! - Each level is its own struct, so a deeper context always carries every
//!   ancestor.
//! - Names are only unique within their parent scope; a `*Path` means nothing
//!   until resolved.

use crate::model::fields::Schedule;
use crate::model::model_run::ModelRunDocument;
use crate::model::project::ProjectDocument;
use crate::model::project_run::ProjectRunDocument;
use crate::model::sim_model::ModelDocument;
use crate::repo::document_store::{DocumentId, Filter};
use crate::repo::graph_store::{Properties, VertexId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Names of a project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectPath {
    pub project: String,
}

/// Names of a project run and its project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectRunPath {
    pub project: String,
    pub project_run: String,
}

/// Names of a model and its ancestors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelPath {
    pub project: String,
    pub project_run: String,
    pub model: String,
}

/// Names of a model run and its ancestors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelRunPath {
    pub project: String,
    pub project_run: String,
    pub model: String,
    pub model_run: String,
}

impl ProjectPath {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
        }
    }

    pub fn project_run(&self, name: impl Into<String>) -> ProjectRunPath {
        ProjectRunPath {
            project: self.project.clone(),
            project_run: name.into(),
        }
    }
}

impl ProjectRunPath {
    pub fn new(project: impl Into<String>, project_run: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            project_run: project_run.into(),
        }
    }

    pub fn parent(&self) -> ProjectPath {
        ProjectPath::new(self.project.clone())
    }

    pub fn model(&self, name: impl Into<String>) -> ModelPath {
        ModelPath {
            project: self.project.clone(),
            project_run: self.project_run.clone(),
            model: name.into(),
        }
    }
}

impl ModelPath {
    pub fn parent(&self) -> ProjectRunPath {
        ProjectRunPath::new(self.project.clone(), self.project_run.clone())
    }

    pub fn model_run(&self, name: impl Into<String>) -> ModelRunPath {
        ModelRunPath {
            project: self.project.clone(),
            project_run: self.project_run.clone(),
            model: self.model.clone(),
            model_run: name.into(),
        }
    }
}

impl ModelRunPath {
    pub fn parent(&self) -> ModelPath {
        ModelPath {
            project: self.project.clone(),
            project_run: self.project_run.clone(),
            model: self.model.clone(),
        }
    }
}

/// Stored ancestor ids of a project run (and of handoffs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectRef {
    pub project: DocumentId,
}

/// Stored ancestor ids of a model or handoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectRunRef {
    pub project: DocumentId,
    pub project_run: DocumentId,
}

/// Stored ancestor ids of a model run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelRef {
    pub project: DocumentId,
    pub project_run: DocumentId,
    pub model: DocumentId,
}

/// Stored ancestor ids of a dataset or task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelRunRef {
    pub project: DocumentId,
    pub project_run: DocumentId,
    pub model: DocumentId,
    pub model_run: DocumentId,
}

/// Common behavior of stored ancestor-id chains.
pub trait ObjectContext {
    /// `(field, id)` pairs from the root down.
    fn ids(&self) -> Vec<(&'static str, DocumentId)>;

    /// Filter matching documents stored under exactly this chain.
    fn filter(&self) -> Filter {
        self.ids()
            .into_iter()
            .fold(Filter::new(), |filter, (field, id)| filter.eq_id(field, id))
    }

    /// Graph natural key: ancestor ids plus the entity's own name.
    fn natural_key(&self, name: &str) -> Properties {
        let mut key = Properties::new();
        for (field, id) in self.ids() {
            key.insert(field.to_string(), Value::String(id.to_string()));
        }
        key.insert("name".to_string(), Value::String(name.to_string()));
        key
    }
}

impl ObjectContext for ProjectRef {
    fn ids(&self) -> Vec<(&'static str, DocumentId)> {
        vec![("project", self.project)]
    }
}

impl ObjectContext for ProjectRunRef {
    fn ids(&self) -> Vec<(&'static str, DocumentId)> {
        vec![("project", self.project), ("project_run", self.project_run)]
    }
}

impl ObjectContext for ModelRef {
    fn ids(&self) -> Vec<(&'static str, DocumentId)> {
        vec![
            ("project", self.project),
            ("project_run", self.project_run),
            ("model", self.model),
        ]
    }
}

impl ObjectContext for ModelRunRef {
    fn ids(&self) -> Vec<(&'static str, DocumentId)> {
        vec![
            ("project", self.project),
            ("project_run", self.project_run),
            ("model", self.model),
            ("model_run", self.model_run),
        ]
    }
}

/// Resolved project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectScope {
    pub project: ProjectDocument,
}

/// Resolved project run and its project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRunScope {
    pub project: ProjectDocument,
    pub project_run: ProjectRunDocument,
}

/// Resolved model and its ancestors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelScope {
    pub project: ProjectDocument,
    pub project_run: ProjectRunDocument,
    pub model: ModelDocument,
}

/// Resolved model run and its ancestors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRunScope {
    pub project: ProjectDocument,
    pub project_run: ProjectRunDocument,
    pub model: ModelDocument,
    pub model_run: ModelRunDocument,
}

/// Window and scenario set a child must stay inside.
#[derive(Debug, Clone, Copy)]
pub struct ParentBounds<'a> {
    pub entity: &'static str,
    pub name: &'a str,
    pub schedule: &'a Schedule,
    pub scenarios: &'a [String],
}

/// Anything new documents can be scoped under for uniqueness checks.
pub trait ScopeFilter {
    /// Filter selecting the direct children of this scope.
    fn child_filter(&self) -> Filter;
}

/// Scope of root-level documents (projects).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RootScope;

impl ScopeFilter for RootScope {
    fn child_filter(&self) -> Filter {
        Filter::new()
    }
}

/// A fully resolved ancestor chain.
pub trait ResolvedScope: Send + Sync {
    /// Simple context of this level.
    type Path;
    /// Object context children of this level persist.
    type Ref: ObjectContext;

    /// Owning project; the only level with ownership semantics.
    fn project(&self) -> &ProjectDocument;
    fn path(&self) -> Self::Path;
    fn refs(&self) -> Self::Ref;
    /// Bounds of the deepest resolved level.
    fn bounds(&self) -> ParentBounds<'_>;
    /// Vertex of the deepest resolved level.
    fn vertex_id(&self) -> VertexId;
}

impl<T: ResolvedScope> ScopeFilter for T {
    fn child_filter(&self) -> Filter {
        self.refs().filter()
    }
}

impl ResolvedScope for ProjectScope {
    type Path = ProjectPath;
    type Ref = ProjectRef;

    fn project(&self) -> &ProjectDocument {
        &self.project
    }

    fn path(&self) -> ProjectPath {
        ProjectPath::new(self.project.name())
    }

    fn refs(&self) -> ProjectRef {
        ProjectRef {
            project: self.project.id,
        }
    }

    fn bounds(&self) -> ParentBounds<'_> {
        ParentBounds {
            entity: "project",
            name: self.project.name(),
            schedule: &self.project.fields.schedule,
            scenarios: &self.project.fields.scenarios,
        }
    }

    fn vertex_id(&self) -> VertexId {
        self.project.vertex_id
    }
}

impl ResolvedScope for ProjectRunScope {
    type Path = ProjectRunPath;
    type Ref = ProjectRunRef;

    fn project(&self) -> &ProjectDocument {
        &self.project
    }

    fn path(&self) -> ProjectRunPath {
        ProjectRunPath::new(self.project.name(), self.project_run.name())
    }

    fn refs(&self) -> ProjectRunRef {
        ProjectRunRef {
            project: self.project.id,
            project_run: self.project_run.id,
        }
    }

    fn bounds(&self) -> ParentBounds<'_> {
        ParentBounds {
            entity: "project run",
            name: self.project_run.name(),
            schedule: &self.project_run.fields.schedule,
            scenarios: &self.project_run.fields.scenarios,
        }
    }

    fn vertex_id(&self) -> VertexId {
        self.project_run.vertex_id
    }
}

impl ResolvedScope for ModelScope {
    type Path = ModelPath;
    type Ref = ModelRef;

    fn project(&self) -> &ProjectDocument {
        &self.project
    }

    fn path(&self) -> ModelPath {
        ModelPath {
            project: self.project.name().to_string(),
            project_run: self.project_run.name().to_string(),
            model: self.model.name().to_string(),
        }
    }

    fn refs(&self) -> ModelRef {
        ModelRef {
            project: self.project.id,
            project_run: self.project_run.id,
            model: self.model.id,
        }
    }

    fn bounds(&self) -> ParentBounds<'_> {
        ParentBounds {
            entity: "model",
            name: self.model.name(),
            schedule: &self.model.fields.schedule,
            scenarios: &self.model.fields.scenarios,
        }
    }

    fn vertex_id(&self) -> VertexId {
        self.model.vertex_id
    }
}

impl ResolvedScope for ModelRunScope {
    type Path = ModelRunPath;
    type Ref = ModelRunRef;

    fn project(&self) -> &ProjectDocument {
        &self.project
    }

    fn path(&self) -> ModelRunPath {
        ModelRunPath {
            project: self.project.name().to_string(),
            project_run: self.project_run.name().to_string(),
            model: self.model.name().to_string(),
            model_run: self.model_run.name().to_string(),
        }
    }

    fn refs(&self) -> ModelRunRef {
        ModelRunRef {
            project: self.project.id,
            project_run: self.project_run.id,
            model: self.model.id,
            model_run: self.model_run.id,
        }
    }

    fn bounds(&self) -> ParentBounds<'_> {
        ParentBounds {
            entity: "model run",
            name: self.model_run.name(),
            schedule: &self.model_run.fields.schedule,
            scenarios: &self.model_run.fields.scenarios,
        }
    }

    fn vertex_id(&self) -> VertexId {
        self.model_run.vertex_id
    }
}
