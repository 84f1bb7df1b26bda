//! Fields shared by every tracked entity.
//!
//! # Invariants
//! - `scheduled_start <= scheduled_end` once a record passed validation.
//! - Scenario names are trimmed, non-empty and unique within one record.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Inclusive scheduled window of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub scheduled_start: NaiveDate,
    pub scheduled_end: NaiveDate,
}

impl Schedule {
    pub fn new(scheduled_start: NaiveDate, scheduled_end: NaiveDate) -> Self {
        Self {
            scheduled_start,
            scheduled_end,
        }
    }

    /// Returns whether `other` lies entirely inside this window.
    pub fn contains(&self, other: &Schedule) -> bool {
        self.scheduled_start <= other.scheduled_start && other.scheduled_end <= self.scheduled_end
    }
}

/// Caller-supplied attributes every entity carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityFields {
    /// Unique within the parent scope.
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub schedule: Schedule,
    /// Must be a subset of the parent's scenarios.
    #[serde(default)]
    pub scenarios: Vec<String>,
}

impl EntityFields {
    pub fn new(name: impl Into<String>, schedule: Schedule) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            schedule,
            scenarios: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_scenarios<I, S>(mut self, scenarios: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scenarios = scenarios.into_iter().map(Into::into).collect();
        self
    }
}

/// Partial update of `EntityFields`; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EntityPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub scheduled_start: Option<NaiveDate>,
    pub scheduled_end: Option<NaiveDate>,
    pub scenarios: Option<Vec<String>>,
}

impl EntityPatch {
    /// Applies every present field onto `fields`.
    pub fn apply_to(&self, fields: &mut EntityFields) {
        if let Some(name) = &self.name {
            fields.name = name.clone();
        }
        if let Some(description) = &self.description {
            fields.description = description.clone();
        }
        if let Some(start) = self.scheduled_start {
            fields.schedule.scheduled_start = start;
        }
        if let Some(end) = self.scheduled_end {
            fields.schedule.scheduled_end = end;
        }
        if let Some(scenarios) = &self.scenarios {
            fields.scenarios = scenarios.clone();
        }
    }

    /// Whether applying this patch can move the record's window or scenario set.
    pub fn touches_bounds(&self) -> bool {
        self.scheduled_start.is_some() || self.scheduled_end.is_some() || self.scenarios.is_some()
    }
}

/// A value validated by the domain rule engine before persistence.
pub trait Candidate {
    fn fields(&self) -> &EntityFields;
    fn fields_mut(&mut self) -> &mut EntityFields;
}

impl Candidate for EntityFields {
    fn fields(&self) -> &EntityFields {
        self
    }

    fn fields_mut(&mut self) -> &mut EntityFields {
        self
    }
}

/// Deserializes a present field (including `null`) as `Some(value)`, so patch
/// fields can distinguish "absent" from "clear".
pub(crate) fn present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::{EntityFields, EntityPatch, Schedule};
    use chrono::NaiveDate;

    fn date(value: &str) -> NaiveDate {
        value.parse().unwrap()
    }

    #[test]
    fn contains_is_inclusive_on_both_bounds() {
        let parent = Schedule::new(date("2024-01-01"), date("2024-12-31"));
        assert!(parent.contains(&parent));
        assert!(parent.contains(&Schedule::new(date("2024-02-01"), date("2024-11-30"))));
        assert!(!parent.contains(&Schedule::new(date("2023-12-31"), date("2024-11-30"))));
        assert!(!parent.contains(&Schedule::new(date("2024-02-01"), date("2025-01-15"))));
    }

    #[test]
    fn patch_keeps_absent_fields() {
        let mut fields = EntityFields::new(
            "r1",
            Schedule::new(date("2024-02-01"), date("2024-11-30")),
        )
        .with_scenarios(["baseline"]);
        let patch = EntityPatch {
            scheduled_end: Some(date("2024-10-31")),
            ..EntityPatch::default()
        };

        patch.apply_to(&mut fields);

        assert_eq!(fields.name, "r1");
        assert_eq!(fields.schedule.scheduled_end, date("2024-10-31"));
        assert_eq!(fields.scenarios, vec!["baseline".to_string()]);
        assert!(patch.touches_bounds());
    }

    #[test]
    fn fields_serialize_flat_schedule_columns() {
        let fields = EntityFields::new(
            "p1",
            Schedule::new(date("2024-01-01"), date("2024-12-31")),
        );
        let value = serde_json::to_value(&fields).unwrap();
        assert_eq!(value["scheduled_start"], "2024-01-01");
        assert_eq!(value["scheduled_end"], "2024-12-31");
    }
}
