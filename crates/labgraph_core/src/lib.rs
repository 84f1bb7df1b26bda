//! Core domain logic for LabGraph research projects.
//! This crate is the single source of truth for context resolution, domain
//! rules and the coordinated document + graph write.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status};
pub use model::context::{ModelPath, ModelRunPath, ProjectPath, ProjectRunPath};
pub use model::dataset::{DatasetDraft, DatasetPatch, DatasetView};
pub use model::fields::{EntityFields, EntityPatch, Schedule};
pub use model::handoff::{HandoffDraft, HandoffPatch, HandoffView};
pub use model::model_run::ModelRunView;
pub use model::project::{ProjectDraft, ProjectPatch, ProjectView};
pub use model::project_run::ProjectRunView;
pub use model::sim_model::ModelView;
pub use model::task::{TaskDraft, TaskPatch, TaskStatus, TaskView};
pub use model::user::{ActingUser, TeamRecord, UserId, UserRecord};
pub use repo::{StoreError, StoreResult, Stores};
pub use service::dataset_manager::DatasetManager;
pub use service::directory::{TeamDirectory, UserDirectory};
pub use service::error::{CoreError, CoreResult};
pub use service::handoff_manager::HandoffManager;
pub use service::model_manager::ModelManager;
pub use service::model_run_manager::ModelRunManager;
pub use service::project_manager::ProjectManager;
pub use service::project_run_manager::ProjectRunManager;
pub use service::task_manager::TaskManager;

/// Minimal health-check API for host integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
