//! Core use-case services.
//!
//! # Responsibility
//! - Compose context resolution, domain rules and the write coordinator into
//!   one manager per entity type.
//! - Keep callers decoupled from storage details; every manager receives its
//!   store handles at construction.
//!
//! # Invariants
//! - Every manager call resolves and authorizes its parent chain first.
//! - Nothing is written before the rule set accepted the candidate.

pub mod context;
pub mod dataset_manager;
pub mod directory;
pub mod error;
pub mod handoff_manager;
mod lifecycle;
pub mod model_manager;
pub mod model_run_manager;
pub mod project_manager;
pub mod project_run_manager;
pub mod projection;
pub mod rules;
pub mod task_manager;

/// Edge labels connecting entity vertices.
pub mod edges {
    /// project -> project run, model run -> task.
    pub const PERFORMS: &str = "performs";
    /// project run -> model, model -> model run.
    pub const RUNS: &str = "runs";
    /// model run -> dataset.
    pub const PRODUCES: &str = "produces";
    /// source model -> handoff.
    pub const SENDS: &str = "sends";
    /// handoff -> target model.
    pub const DELIVERS_TO: &str = "delivers_to";
}
