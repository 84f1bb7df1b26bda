//! Document collections and their unique natural keys.

/// One document collection in the document store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Projects,
    ProjectRuns,
    Models,
    ModelRuns,
    Datasets,
    Tasks,
    Handoffs,
    Users,
    Teams,
}

impl Collection {
    pub const ALL: [Collection; 9] = [
        Self::Projects,
        Self::ProjectRuns,
        Self::Models,
        Self::ModelRuns,
        Self::Datasets,
        Self::Tasks,
        Self::Handoffs,
        Self::Users,
        Self::Teams,
    ];

    /// Stable collection name used as storage key.
    pub fn name(self) -> &'static str {
        match self {
            Self::Projects => "projects",
            Self::ProjectRuns => "project_runs",
            Self::Models => "models",
            Self::ModelRuns => "model_runs",
            Self::Datasets => "datasets",
            Self::Tasks => "tasks",
            Self::Handoffs => "handoffs",
            Self::Users => "users",
            Self::Teams => "teams",
        }
    }

    /// Human-readable singular entity name used in error messages.
    pub fn entity_name(self) -> &'static str {
        match self {
            Self::Projects => "project",
            Self::ProjectRuns => "project run",
            Self::Models => "model",
            Self::ModelRuns => "model run",
            Self::Datasets => "dataset",
            Self::Tasks => "task",
            Self::Handoffs => "handoff",
            Self::Users => "user",
            Self::Teams => "team",
        }
    }

    /// Fields forming the natural key, enforced by the store's unique index.
    ///
    /// Child keys are the ancestor id fields followed by `name`.
    pub fn unique_fields(self) -> &'static [&'static str] {
        match self {
            Self::Projects => &["name"],
            Self::ProjectRuns => &["project", "name"],
            Self::Models => &["project", "project_run", "name"],
            Self::ModelRuns => &["project", "project_run", "model", "name"],
            Self::Datasets | Self::Tasks => {
                &["project", "project_run", "model", "model_run", "name"]
            }
            Self::Handoffs => &["project", "project_run", "name"],
            Self::Users => &["username"],
            Self::Teams => &["name"],
        }
    }

    /// Graph vertex label for entity collections; `None` for referenced-only
    /// collections that have no vertex.
    pub fn vertex_label(self) -> Option<&'static str> {
        match self {
            Self::Projects => Some("Project"),
            Self::ProjectRuns => Some("ProjectRun"),
            Self::Models => Some("Model"),
            Self::ModelRuns => Some("ModelRun"),
            Self::Datasets => Some("Dataset"),
            Self::Tasks => Some("Task"),
            Self::Handoffs => Some("Handoff"),
            Self::Users | Self::Teams => None,
        }
    }
}
