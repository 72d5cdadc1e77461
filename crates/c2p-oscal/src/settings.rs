//! Compliance settings: rule selection and parameter overrides.

use std::collections::{HashMap, HashSet};

use crate::rules::{MemoryStore, RuleSet, StoreError};

/// A compliance selection for one assessment scope.
///
/// Until a selection is attached, every rule known to the store applies.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    included_rules: Option<HashSet<String>>,
    parameters: HashMap<String, String>,
}

impl Settings {
    /// Settings with an explicit rule selection and parameter overrides.
    pub fn new(included_rules: HashSet<String>, parameters: HashMap<String, String>) -> Self {
        Self {
            included_rules: Some(included_rules),
            parameters,
        }
    }

    /// Settings that keep every rule and override nothing.
    pub fn all_rules() -> Self {
        Self::default()
    }

    pub fn is_included(&self, rule_id: &str) -> bool {
        match &self.included_rules {
            Some(included) => included.contains(rule_id),
            None => true,
        }
    }

    pub fn parameter_override(&self, parameter_id: &str) -> Option<&str> {
        self.parameters.get(parameter_id).map(String::as_str)
    }
}

/// Applies settings to the rule sets declared by one component, producing
/// the effective rule sets shipped to that component's provider.
///
/// Rules outside the selection are dropped; parameter overrides replace the
/// selected value on matching parameters.
pub fn apply_to_component(
    title: &str,
    store: &MemoryStore,
    settings: &Settings,
) -> Result<Vec<RuleSet>, StoreError> {
    let rule_sets = store.find_by_component(title)?;

    let mut effective = Vec::with_capacity(rule_sets.len());
    for mut rule_set in rule_sets {
        if !settings.is_included(&rule_set.rule.id) {
            continue;
        }
        for parameter in &mut rule_set.rule.parameters {
            if let Some(value) = settings.parameter_override(&parameter.id) {
                parameter.value = Some(value.to_string());
            }
        }
        effective.push(rule_set);
    }
    Ok(effective)
}
