//! Domain rule engine.
//!
//! # Responsibility
//! - Run an explicit, ordered list of domain rules against one candidate.
//! - Share store lookups between rules of one pass through a memo.
//!
//! # Invariants
//! - Rules run in registration order; the first failure stops the pass.
//! - Each rule returns the (possibly normalized) candidate for the next one.
//! - Within one pass an identical `find_one` hits the store once.
//! - Containment messages name the offending field or value and restate the
//!   valid bound or set.

use crate::model::context::{ProjectRunScope, ResolvedScope, ScopeFilter};
use crate::model::fields::{Candidate, EntityFields, Schedule};
use crate::model::handoff::HandoffDraft;
use crate::model::project::ProjectDraft;
use crate::model::task::TaskDraft;
use crate::model::user::UserId;
use crate::repo::collection::Collection;
use crate::repo::document_store::{
    from_document, Document, DocumentId, DocumentStore, Filter, ID_FIELD,
};
use crate::service::error::{CoreError, CoreResult};
use async_trait::async_trait;
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Canonical stored form of an entity name: trimmed, inner whitespace
/// collapsed to one space. Lookups by name apply the same form.
pub fn canonical_name(raw: &str) -> String {
    WHITESPACE_RE.replace_all(raw.trim(), " ").into_owned()
}

/// State shared by every rule of one validation pass.
pub struct ValidationPass<'a, C> {
    scope: &'a C,
    documents: &'a dyn DocumentStore,
    collection: Collection,
    current: Option<DocumentId>,
    memo: HashMap<(Collection, String), Option<Document>>,
    round_trips: usize,
}

impl<'a, C> ValidationPass<'a, C> {
    /// Starts a pass for a new document of `collection` under `scope`.
    pub fn new(scope: &'a C, documents: &'a dyn DocumentStore, collection: Collection) -> Self {
        Self {
            scope,
            documents,
            collection,
            current: None,
            memo: HashMap::new(),
            round_trips: 0,
        }
    }

    /// Marks the pass as an update of `id`; the record is excluded from
    /// uniqueness checks.
    pub fn for_update(mut self, id: DocumentId) -> Self {
        self.current = Some(id);
        self
    }

    pub fn scope(&self) -> &'a C {
        self.scope
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    pub fn current(&self) -> Option<DocumentId> {
        self.current
    }

    /// Store round trips issued so far.
    pub fn round_trips(&self) -> usize {
        self.round_trips
    }

    /// Memoized `find_one`.
    pub async fn find_one(
        &mut self,
        collection: Collection,
        filter: &Filter,
    ) -> CoreResult<Option<Document>> {
        let key = (collection, filter.cache_key());
        if let Some(cached) = self.memo.get(&key) {
            return Ok(cached.clone());
        }
        self.round_trips += 1;
        let found = self.documents.find_one(collection, filter).await?;
        self.memo.insert(key, found.clone());
        Ok(found)
    }

    /// Uncached `find_all`.
    pub async fn find_all(
        &mut self,
        collection: Collection,
        filter: &Filter,
    ) -> CoreResult<Vec<Document>> {
        self.round_trips += 1;
        Ok(self.documents.find_all(collection, filter).await?)
    }
}

/// One domain invariant.
#[async_trait]
pub trait Rule<E, C>: Send + Sync {
    /// Stable rule name, reported in `DomainValidation` errors.
    fn name(&self) -> &'static str;

    async fn apply(&self, candidate: E, pass: &mut ValidationPass<'_, C>) -> CoreResult<E>;
}

/// Ordered rule list for one entity type.
pub struct RuleSet<E, C> {
    rules: Vec<Box<dyn Rule<E, C>>>,
}

impl<E, C> Default for RuleSet<E, C> {
    fn default() -> Self {
        Self { rules: Vec::new() }
    }
}

impl<E, C> RuleSet<E, C>
where
    E: Send + 'static,
    C: Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one rule.
    pub fn with(mut self, rule: impl Rule<E, C> + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Rule names in execution order.
    pub fn names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    /// Threads `candidate` through every rule; fails fast.
    pub async fn validate(
        &self,
        mut candidate: E,
        pass: &mut ValidationPass<'_, C>,
    ) -> CoreResult<E> {
        for rule in &self.rules {
            candidate = match rule.apply(candidate, pass).await {
                Ok(next) => next,
                Err(err) => {
                    info!(
                        "event=domain_validation module=rules status=rejected rule={} collection={} kind={}",
                        rule.name(),
                        pass.collection().name(),
                        err.kind()
                    );
                    return Err(err);
                }
            };
        }
        debug!(
            "event=domain_validation module=rules status=ok collection={} rules={} round_trips={}",
            pass.collection().name(),
            self.rules.len(),
            pass.round_trips()
        );
        Ok(candidate)
    }
}

/// Trims the name and collapses inner whitespace.
pub struct NormalizeName;

#[async_trait]
impl<E, C> Rule<E, C> for NormalizeName
where
    E: Candidate + Send + 'static,
    C: Sync + 'static,
{
    fn name(&self) -> &'static str {
        "normalize_name"
    }

    async fn apply(&self, mut candidate: E, _pass: &mut ValidationPass<'_, C>) -> CoreResult<E> {
        let normalized = canonical_name(&candidate.fields().name);
        if normalized.is_empty() {
            return Err(CoreError::rule("normalize_name", "name must not be blank"));
        }
        candidate.fields_mut().name = normalized;
        Ok(candidate)
    }
}

/// Trims scenario names, drops blanks and duplicates, keeps first-seen order.
pub struct NormalizeScenarios;

#[async_trait]
impl<E, C> Rule<E, C> for NormalizeScenarios
where
    E: Candidate + Send + 'static,
    C: Sync + 'static,
{
    fn name(&self) -> &'static str {
        "normalize_scenarios"
    }

    async fn apply(&self, mut candidate: E, _pass: &mut ValidationPass<'_, C>) -> CoreResult<E> {
        let mut seen = HashSet::new();
        let scenarios = std::mem::take(&mut candidate.fields_mut().scenarios)
            .into_iter()
            .map(|scenario| scenario.trim().to_string())
            .filter(|scenario| !scenario.is_empty() && seen.insert(scenario.clone()))
            .collect();
        candidate.fields_mut().scenarios = scenarios;
        Ok(candidate)
    }
}

/// `scheduled_start <= scheduled_end`.
pub struct ScheduleOrdered;

#[async_trait]
impl<E, C> Rule<E, C> for ScheduleOrdered
where
    E: Candidate + Send + 'static,
    C: Sync + 'static,
{
    fn name(&self) -> &'static str {
        "schedule_ordered"
    }

    async fn apply(&self, candidate: E, _pass: &mut ValidationPass<'_, C>) -> CoreResult<E> {
        let schedule = candidate.fields().schedule;
        if schedule.scheduled_start > schedule.scheduled_end {
            return Err(CoreError::rule(
                "schedule_ordered",
                format!(
                    "scheduled_start {} is after scheduled_end {}",
                    schedule.scheduled_start, schedule.scheduled_end
                ),
            ));
        }
        Ok(candidate)
    }
}

/// The candidate's window lies inside the parent's window.
pub struct ScheduleWithinParent;

#[async_trait]
impl<E, C> Rule<E, C> for ScheduleWithinParent
where
    E: Candidate + Send + 'static,
    C: ResolvedScope + 'static,
{
    fn name(&self) -> &'static str {
        "schedule_within_parent"
    }

    async fn apply(&self, candidate: E, pass: &mut ValidationPass<'_, C>) -> CoreResult<E> {
        let bounds = pass.scope().bounds();
        let child = candidate.fields().schedule;
        let parent = bounds.schedule;

        if child.scheduled_start < parent.scheduled_start {
            return Err(CoreError::rule(
                "schedule_within_parent",
                format!(
                    "scheduled_start {} is before {} `{}` scheduled_start {}",
                    child.scheduled_start, bounds.entity, bounds.name, parent.scheduled_start
                ),
            ));
        }
        if child.scheduled_end > parent.scheduled_end {
            return Err(CoreError::rule(
                "schedule_within_parent",
                format!(
                    "scheduled_end {} is after {} `{}` scheduled_end {}",
                    child.scheduled_end, bounds.entity, bounds.name, parent.scheduled_end
                ),
            ));
        }
        Ok(candidate)
    }
}

/// Every candidate scenario is defined on the parent.
pub struct ScenariosWithinParent;

#[async_trait]
impl<E, C> Rule<E, C> for ScenariosWithinParent
where
    E: Candidate + Send + 'static,
    C: ResolvedScope + 'static,
{
    fn name(&self) -> &'static str {
        "scenarios_within_parent"
    }

    async fn apply(&self, candidate: E, pass: &mut ValidationPass<'_, C>) -> CoreResult<E> {
        let bounds = pass.scope().bounds();
        check_scenarios(
            "scenarios_within_parent",
            &candidate.fields().scenarios,
            bounds.scenarios,
            bounds.entity,
            bounds.name,
        )?;
        Ok(candidate)
    }
}

/// No sibling in the same scope carries the candidate's name.
pub struct NameUniqueInScope;

#[async_trait]
impl<E, C> Rule<E, C> for NameUniqueInScope
where
    E: Candidate + Send + 'static,
    C: ScopeFilter + Sync + 'static,
{
    fn name(&self) -> &'static str {
        "name_unique_in_scope"
    }

    async fn apply(&self, candidate: E, pass: &mut ValidationPass<'_, C>) -> CoreResult<E> {
        let name = candidate.fields().name.clone();
        let filter = pass.scope().child_filter().eq("name", name.as_str());
        let current = pass.current().map(|id| Value::String(id.to_string()));
        let collection = pass.collection();
        let taken = pass
            .find_all(collection, &filter)
            .await?
            .iter()
            .any(|document| current.is_none() || document.get(ID_FIELD) != current.as_ref());
        if taken {
            return Err(CoreError::AlreadyExists {
                entity: collection.entity_name(),
                name,
            });
        }
        Ok(candidate)
    }
}

/// User ids a candidate references, paired with the referencing field.
pub trait UserReferences {
    fn user_refs(&self) -> Vec<(&'static str, UserId)>;
}

impl UserReferences for ProjectDraft {
    fn user_refs(&self) -> Vec<(&'static str, UserId)> {
        self.owner
            .map(|owner| ("owner", owner))
            .into_iter()
            .chain(self.leads.iter().map(|lead| ("leads", *lead)))
            .collect()
    }
}

impl UserReferences for TaskDraft {
    fn user_refs(&self) -> Vec<(&'static str, UserId)> {
        self.assignee
            .map(|assignee| ("assignee", assignee))
            .into_iter()
            .collect()
    }
}

/// Every referenced user is registered in the directory.
pub struct ReferencedUsersExist;

#[async_trait]
impl<E, C> Rule<E, C> for ReferencedUsersExist
where
    E: UserReferences + Send + 'static,
    C: Sync + 'static,
{
    fn name(&self) -> &'static str {
        "referenced_users_exist"
    }

    async fn apply(&self, candidate: E, pass: &mut ValidationPass<'_, C>) -> CoreResult<E> {
        for (field, user) in candidate.user_refs() {
            if pass
                .find_one(Collection::Users, &Filter::by_id(user))
                .await?
                .is_none()
            {
                return Err(CoreError::rule(
                    "referenced_users_exist",
                    format!("{field} references unknown user {user}"),
                ));
            }
        }
        Ok(candidate)
    }
}

/// The project's team, when set, is registered.
pub struct TeamExists;

#[async_trait]
impl<C> Rule<ProjectDraft, C> for TeamExists
where
    C: Sync + 'static,
{
    fn name(&self) -> &'static str {
        "team_exists"
    }

    async fn apply(
        &self,
        candidate: ProjectDraft,
        pass: &mut ValidationPass<'_, C>,
    ) -> CoreResult<ProjectDraft> {
        if let Some(team) = candidate.team {
            if pass
                .find_one(Collection::Teams, &Filter::by_id(team))
                .await?
                .is_none()
            {
                return Err(CoreError::rule(
                    "team_exists",
                    format!("team references unknown team {team}"),
                ));
            }
        }
        Ok(candidate)
    }
}

/// On update, existing children stay inside the candidate's new bounds.
pub struct ChildrenWithinBounds {
    /// `(child collection, field holding this record's id)`.
    pub children: &'static [(Collection, &'static str)],
}

#[async_trait]
impl<E, C> Rule<E, C> for ChildrenWithinBounds
where
    E: Candidate + Send + 'static,
    C: Sync + 'static,
{
    fn name(&self) -> &'static str {
        "children_within_bounds"
    }

    async fn apply(&self, candidate: E, pass: &mut ValidationPass<'_, C>) -> CoreResult<E> {
        let Some(current) = pass.current() else {
            return Ok(candidate);
        };
        let parent = candidate.fields().clone();

        for (collection, field) in self.children {
            let filter = Filter::new().eq_id(*field, current);
            for document in pass.find_all(*collection, &filter).await? {
                let child: EntityFields = from_document(document)?;
                if !parent.schedule.contains(&child.schedule) {
                    return Err(CoreError::rule(
                        "children_within_bounds",
                        format!(
                            "{} `{}` ({}) would fall outside the new window {}",
                            collection.entity_name(),
                            child.name,
                            window(&child.schedule),
                            window(&parent.schedule)
                        ),
                    ));
                }
                if let Some(missing) = child
                    .scenarios
                    .iter()
                    .find(|scenario| !parent.scenarios.contains(scenario))
                {
                    return Err(CoreError::rule(
                        "children_within_bounds",
                        format!(
                            "scenario `{missing}` is still used by {} `{}`",
                            collection.entity_name(),
                            child.name
                        ),
                    ));
                }
            }
        }
        Ok(candidate)
    }
}

/// A handoff connects two different models.
pub struct HandoffEndpointsDistinct;

#[async_trait]
impl<C> Rule<HandoffDraft, C> for HandoffEndpointsDistinct
where
    C: Sync + 'static,
{
    fn name(&self) -> &'static str {
        "handoff_endpoints_distinct"
    }

    async fn apply(
        &self,
        candidate: HandoffDraft,
        _pass: &mut ValidationPass<'_, C>,
    ) -> CoreResult<HandoffDraft> {
        let from_model = canonical_name(&candidate.from_model);
        if from_model == canonical_name(&candidate.to_model) {
            return Err(CoreError::rule(
                "handoff_endpoints_distinct",
                format!("from_model and to_model are both `{from_model}`"),
            ));
        }
        Ok(candidate)
    }
}

/// Filter locating a model by name within a resolved project run.
pub fn model_filter(scope: &ProjectRunScope, name: &str) -> Filter {
    scope.child_filter().eq("name", canonical_name(name))
}

/// Both handoff endpoints name models of the handoff's project run.
pub struct HandoffEndpointsResolve;

#[async_trait]
impl Rule<HandoffDraft, ProjectRunScope> for HandoffEndpointsResolve {
    fn name(&self) -> &'static str {
        "handoff_endpoints_resolve"
    }

    async fn apply(
        &self,
        mut candidate: HandoffDraft,
        pass: &mut ValidationPass<'_, ProjectRunScope>,
    ) -> CoreResult<HandoffDraft> {
        let run = pass.scope().project_run.name().to_string();
        for (field, name) in [
            ("from_model", candidate.from_model.trim().to_string()),
            ("to_model", candidate.to_model.trim().to_string()),
        ] {
            let filter = model_filter(pass.scope(), &name);
            if pass.find_one(Collection::Models, &filter).await?.is_none() {
                return Err(CoreError::rule(
                    "handoff_endpoints_resolve",
                    format!("{field} `{name}` is not a model of project run `{run}`"),
                ));
            }
        }
        candidate.from_model = candidate.from_model.trim().to_string();
        candidate.to_model = candidate.to_model.trim().to_string();
        Ok(candidate)
    }
}

/// Handoff scenarios are defined on both endpoint models.
pub struct HandoffScenariosWithinEndpoints;

#[async_trait]
impl Rule<HandoffDraft, ProjectRunScope> for HandoffScenariosWithinEndpoints {
    fn name(&self) -> &'static str {
        "handoff_scenarios_within_endpoints"
    }

    async fn apply(
        &self,
        candidate: HandoffDraft,
        pass: &mut ValidationPass<'_, ProjectRunScope>,
    ) -> CoreResult<HandoffDraft> {
        for name in [&candidate.from_model, &candidate.to_model] {
            let filter = model_filter(pass.scope(), name);
            let Some(document) = pass.find_one(Collection::Models, &filter).await? else {
                return Err(CoreError::rule(
                    "handoff_scenarios_within_endpoints",
                    format!("model `{name}` is not resolvable"),
                ));
            };
            let model: EntityFields = from_document(document)?;
            check_scenarios(
                "handoff_scenarios_within_endpoints",
                &candidate.fields.scenarios,
                &model.scenarios,
                "model",
                &model.name,
            )?;
        }
        Ok(candidate)
    }
}

fn check_scenarios(
    rule: &'static str,
    scenarios: &[String],
    valid: &[String],
    entity: &str,
    name: &str,
) -> CoreResult<()> {
    match scenarios.iter().find(|scenario| !valid.contains(scenario)) {
        None => Ok(()),
        Some(missing) => Err(CoreError::rule(
            rule,
            format!(
                "scenario `{missing}` is not defined on {entity} `{name}`; valid scenarios: [{}]",
                valid.join(", ")
            ),
        )),
    }
}

fn window(schedule: &Schedule) -> String {
    format!("{}..{}", schedule.scheduled_start, schedule.scheduled_end)
}

/// Direct children of a project.
pub const PROJECT_CHILDREN: &[(Collection, &str)] = &[(Collection::ProjectRuns, "project")];
/// Direct children of a project run.
pub const PROJECT_RUN_CHILDREN: &[(Collection, &str)] = &[
    (Collection::Models, "project_run"),
    (Collection::Handoffs, "project_run"),
];
/// Direct children of a model.
pub const MODEL_CHILDREN: &[(Collection, &str)] = &[(Collection::ModelRuns, "model")];
/// Direct children of a model run.
pub const MODEL_RUN_CHILDREN: &[(Collection, &str)] = &[
    (Collection::Datasets, "model_run"),
    (Collection::Tasks, "model_run"),
];

/// Rules for projects; projects are scoped globally.
pub fn project_rules<C>() -> RuleSet<ProjectDraft, C>
where
    C: ScopeFilter + Sync + 'static,
{
    RuleSet::new()
        .with(NormalizeName)
        .with(NormalizeScenarios)
        .with(ScheduleOrdered)
        .with(ReferencedUsersExist)
        .with(TeamExists)
        .with(NameUniqueInScope)
        .with(ChildrenWithinBounds {
            children: PROJECT_CHILDREN,
        })
}

/// Rules shared by every entity nested under a resolved parent.
pub fn child_rules<E, C>(children: &'static [(Collection, &'static str)]) -> RuleSet<E, C>
where
    E: Candidate + Send + 'static,
    C: ResolvedScope + 'static,
{
    RuleSet::new()
        .with(NormalizeName)
        .with(NormalizeScenarios)
        .with(ScheduleOrdered)
        .with(ScheduleWithinParent)
        .with(ScenariosWithinParent)
        .with(NameUniqueInScope)
        .with(ChildrenWithinBounds { children })
}

/// Rules for tasks: child rules plus the assignee check.
pub fn task_rules<C>() -> RuleSet<TaskDraft, C>
where
    C: ResolvedScope + 'static,
{
    child_rules(&[]).with(ReferencedUsersExist)
}

/// Rules for handoffs. Endpoint distinctness runs before any store access.
pub fn handoff_rules() -> RuleSet<HandoffDraft, ProjectRunScope> {
    RuleSet::new()
        .with(HandoffEndpointsDistinct)
        .with(NormalizeName)
        .with(NormalizeScenarios)
        .with(ScheduleOrdered)
        .with(ScheduleWithinParent)
        .with(ScenariosWithinParent)
        .with(HandoffEndpointsResolve)
        .with(HandoffScenariosWithinEndpoints)
        .with(NameUniqueInScope)
}

#[cfg(test)]
mod tests {
    use super::{child_rules, handoff_rules, project_rules, RuleSet, ValidationPass};
    use crate::model::context::{ProjectScope, RootScope};
    use crate::model::fields::{EntityFields, Schedule};
    use crate::model::project::{ProjectDocument, ProjectDraft};
    use crate::repo::collection::Collection;
    use crate::repo::document_store::SqliteDocumentStore;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn date(value: &str) -> NaiveDate {
        value.parse().unwrap()
    }

    fn parent_scope() -> ProjectScope {
        let owner = Uuid::new_v4();
        ProjectScope {
            project: ProjectDocument {
                id: Uuid::new_v4(),
                vertex_id: Uuid::new_v4(),
                fields: EntityFields::new(
                    "p1",
                    Schedule::new(date("2024-01-01"), date("2024-12-31")),
                )
                .with_scenarios(["baseline", "high"]),
                owner,
                leads: Vec::new(),
                team: None,
                is_demo: false,
                created_by: owner,
                created_at: 0,
                updated_at: 0,
            },
        }
    }

    #[test]
    fn rule_order_is_explicit() {
        let rules: RuleSet<EntityFields, ProjectScope> = child_rules(&[]);
        assert_eq!(
            rules.names(),
            [
                "normalize_name",
                "normalize_scenarios",
                "schedule_ordered",
                "schedule_within_parent",
                "scenarios_within_parent",
                "name_unique_in_scope",
                "children_within_bounds"
            ]
        );
        assert_eq!(handoff_rules().names()[0], "handoff_endpoints_distinct");
    }

    #[tokio::test]
    async fn normalizes_name_and_scenarios() {
        let store = SqliteDocumentStore::open_in_memory().unwrap();
        let scope = parent_scope();
        let mut pass = ValidationPass::new(&scope, &store, Collection::ProjectRuns);
        let candidate = EntityFields::new(
            "  run \t one ",
            Schedule::new(date("2024-02-01"), date("2024-11-30")),
        )
        .with_scenarios([" baseline", "", "baseline", "high "]);

        let normalized = child_rules(&[])
            .validate(candidate, &mut pass)
            .await
            .unwrap();

        assert_eq!(normalized.name, "run one");
        assert_eq!(normalized.scenarios, ["baseline", "high"]);
    }

    #[tokio::test]
    async fn end_past_parent_names_field_and_bound() {
        let store = SqliteDocumentStore::open_in_memory().unwrap();
        let scope = parent_scope();
        let mut pass = ValidationPass::new(&scope, &store, Collection::ProjectRuns);
        let candidate = EntityFields::new(
            "r1",
            Schedule::new(date("2024-02-01"), date("2025-01-15")),
        );

        let err = child_rules(&[])
            .validate(candidate, &mut pass)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "domain_validation");
        let message = err.to_string();
        assert!(message.contains("scheduled_end"));
        assert!(message.contains("2024-12-31"));
        assert_eq!(pass.round_trips(), 0);
    }

    #[tokio::test]
    async fn unknown_scenario_lists_valid_set() {
        let store = SqliteDocumentStore::open_in_memory().unwrap();
        let scope = parent_scope();
        let mut pass = ValidationPass::new(&scope, &store, Collection::ProjectRuns);
        let candidate = EntityFields::new(
            "r1",
            Schedule::new(date("2024-02-01"), date("2024-11-30")),
        )
        .with_scenarios(["low"]);

        let err = child_rules(&[])
            .validate(candidate, &mut pass)
            .await
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("`low`"));
        assert!(message.contains("[baseline, high]"));
    }

    #[tokio::test]
    async fn blank_project_name_is_rejected() {
        let store = SqliteDocumentStore::open_in_memory().unwrap();
        let mut pass = ValidationPass::new(&RootScope, &store, Collection::Projects);
        let draft = ProjectDraft::new(EntityFields::new(
            "   ",
            Schedule::new(date("2024-01-01"), date("2024-12-31")),
        ));

        let err = project_rules().validate(draft, &mut pass).await.unwrap_err();
        assert_eq!(err.to_string(), "normalize_name: name must not be blank");
    }
}
