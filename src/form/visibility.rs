use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::values::FormValues;
use crate::schema::{Condition, FormField};

/// Visibility of a field whose `dependsOn.condition` is not recognized.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionFallback {
    #[default]
    Visible,
    Hidden,
}

/// Visibility with the permissive fallback for unknown conditions.
pub fn is_visible(field: &FormField, values: &FormValues) -> bool {
    is_visible_with(field, values, ConditionFallback::Visible)
}

/// Decides whether `field` is displayed for the current `values`.
///
/// Only the target's current value is consulted; a target that is itself
/// hidden still counts with whatever value it last had.
pub fn is_visible_with(
    field: &FormField,
    values: &FormValues,
    fallback: ConditionFallback,
) -> bool {
    let Some(rule) = field.depends_on.as_ref() else {
        return true;
    };
    match rule.condition {
        Condition::Equals => values.get(&rule.target_field_id) == Some(&rule.expected_value),
        Condition::Other(_) => fallback == ConditionFallback::Visible,
    }
}

/// Maps a target field id to the ids of fields whose visibility depends on it.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DependencyIndex {
    dependents: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyIndex {
    pub fn build(fields: &[FormField]) -> Self {
        let mut dependents = BTreeMap::<String, BTreeSet<String>>::new();
        for field in fields {
            if let Some(rule) = field.depends_on.as_ref() {
                dependents
                    .entry(rule.target_field_id.clone())
                    .or_default()
                    .insert(field.id.clone());
            }
        }
        Self { dependents }
    }

    pub fn dependents_of(&self, target: &str) -> impl Iterator<Item = &str> {
        self.dependents
            .get(target)
            .into_iter()
            .flat_map(|ids| ids.iter().map(String::as_str))
    }
}
