#![allow(dead_code)]

use chrono::NaiveDate;
use labgraph_core::repo::collection::Collection;
use labgraph_core::repo::document_store::Filter;
use labgraph_core::repo::graph_store::Properties;
use labgraph_core::{
    ActingUser, EntityFields, HandoffManager, ModelManager, ModelRunManager, ProjectDraft,
    ProjectManager, ProjectPath, ProjectRunManager, ProjectRunPath, Schedule, Stores,
    UserDirectory, UserRecord,
};

pub const PROJECT: &str = "p1";
pub const RUN: &str = "r1";

pub fn date(value: &str) -> NaiveDate {
    value.parse().unwrap()
}

pub fn fields(name: &str, start: &str, end: &str, scenarios: &[&str]) -> EntityFields {
    EntityFields::new(name, Schedule::new(date(start), date(end)))
        .with_scenarios(scenarios.iter().copied())
}

/// Owner, stores and a project `p1` (2024) with scenarios `baseline` and `high`.
pub struct Lab {
    pub stores: Stores,
    pub owner: UserRecord,
}

impl Lab {
    pub async fn new() -> Self {
        Self::on(Stores::open_in_memory().unwrap()).await
    }

    pub async fn on(stores: Stores) -> Self {
        let owner = register(&stores, "owner").await;
        let lab = Self { stores, owner };
        lab.projects()
            .create(
                ProjectDraft::new(fields(
                    PROJECT,
                    "2024-01-01",
                    "2024-12-31",
                    &["baseline", "high"],
                )),
                &lab.acting(),
            )
            .await
            .unwrap();
        lab
    }

    /// Adds run `r1` (Feb..Nov, `baseline` and `high`) and models `m1`, `m2`.
    pub async fn with_models(self) -> Self {
        self.runs()
            .create(
                &ProjectPath::new(PROJECT),
                fields(RUN, "2024-02-01", "2024-11-30", &["baseline", "high"]),
                &self.acting(),
            )
            .await
            .unwrap();
        for (name, scenarios) in [("m1", &["baseline", "high"][..]), ("m2", &["baseline"][..])] {
            self.models()
                .create(
                    &self.run_path(),
                    fields(name, "2024-03-01", "2024-10-31", scenarios),
                    &self.acting(),
                )
                .await
                .unwrap();
        }
        self
    }

    pub fn acting(&self) -> ActingUser {
        self.owner.acting()
    }

    pub fn run_path(&self) -> ProjectRunPath {
        ProjectRunPath::new(PROJECT, RUN)
    }

    pub async fn stranger(&self) -> ActingUser {
        register(&self.stores, "stranger").await.acting()
    }

    pub fn projects(&self) -> ProjectManager {
        ProjectManager::new(self.stores.clone())
    }

    pub fn runs(&self) -> ProjectRunManager {
        ProjectRunManager::new(self.stores.clone())
    }

    pub fn models(&self) -> ModelManager {
        ModelManager::new(self.stores.clone())
    }

    pub fn model_runs(&self) -> ModelRunManager {
        ModelRunManager::new(self.stores.clone())
    }

    pub fn handoffs(&self) -> HandoffManager {
        HandoffManager::new(self.stores.clone())
    }

    pub async fn count(&self, collection: Collection) -> usize {
        self.stores
            .documents()
            .find_all(collection, &Filter::new())
            .await
            .unwrap()
            .len()
    }

    pub async fn any_vertex(&self, label: &str) -> bool {
        self.stores
            .graph()
            .vertex_exists(label, &Properties::new())
            .await
            .unwrap()
    }
}

pub async fn register(stores: &Stores, username: &str) -> UserRecord {
    UserDirectory::new(stores.clone())
        .register(UserRecord::new(username, format!("{username} user")))
        .await
        .unwrap()
}
