//! Rule-set extraction and the indexed in-memory rules store.
//!
//! Components declare the rules they implement through grouped props: every
//! prop that belongs to one rule carries the same `remarks` tag. The store
//! indexes the extracted rule sets by check id and by component title and
//! hands out read-only snapshots.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::component::Component;

const RULE_ID: &str = "Rule_Id";
const RULE_DESCRIPTION: &str = "Rule_Description";
const PARAMETER_ID: &str = "Parameter_Id";
const PARAMETER_DESCRIPTION: &str = "Parameter_Description";
const PARAMETER_VALUE: &str = "Parameter_Value";
const CHECK_ID: &str = "Check_Id";
const CHECK_DESCRIPTION: &str = "Check_Description";

/// A single tunable input to a rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub id: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// A verifiable probe executed by a policy engine. Each check belongs to
/// exactly one rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Check {
    pub id: String,
    pub description: String,
}

/// A compliance requirement with parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
}

/// A rule together with the checks that verify it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    pub rule: Rule,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checks: Vec<Check>,
}

/// Rules store lookup and indexing failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No rule owns the requested check.
    #[error("rule not found for check {check_id}")]
    RuleNotFound { check_id: String },

    /// The component has no indexed rule sets.
    #[error("component {title} not found in rules store")]
    ComponentNotFound { title: String },

    /// A rule-set prop group is malformed.
    #[error("component {component}: prop group {group}: {reason}")]
    InvalidRuleGroup {
        component: String,
        group: String,
        reason: String,
    },
}

/// In-memory rules store indexed by check id and component title.
#[derive(Debug, Default)]
pub struct MemoryStore {
    by_check: HashMap<String, RuleSet>,
    by_component: HashMap<String, Vec<RuleSet>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes the rule sets declared by every given component.
    ///
    /// Prop groups without a `Rule_Id` are not rule sets and are skipped.
    pub fn index_all<C: Component>(&mut self, components: &[C]) -> Result<(), StoreError> {
        for component in components {
            let rule_sets = extract_rule_sets(component)?;
            if rule_sets.is_empty() {
                continue;
            }
            for rule_set in &rule_sets {
                for check in &rule_set.checks {
                    self.by_check.insert(check.id.clone(), rule_set.clone());
                }
            }
            self.by_component
                .entry(component.title().to_string())
                .or_default()
                .extend(rule_sets);
        }
        Ok(())
    }

    /// Returns the rule set owning the given check id.
    pub fn get_by_check_id(&self, check_id: &str) -> Result<RuleSet, StoreError> {
        self.by_check
            .get(check_id)
            .cloned()
            .ok_or_else(|| StoreError::RuleNotFound {
                check_id: check_id.to_string(),
            })
    }

    /// Returns all rule sets declared by the component with the given title.
    pub fn find_by_component(&self, title: &str) -> Result<Vec<RuleSet>, StoreError> {
        self.by_component
            .get(title)
            .cloned()
            .ok_or_else(|| StoreError::ComponentNotFound {
                title: title.to_string(),
            })
    }

    /// Ids of every rule known to the store.
    pub fn all_rule_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .by_component
            .values()
            .flatten()
            .map(|rs| rs.rule.id.clone())
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }
}

/// Groups a component's props by remark tag and builds one rule set per
/// group that declares a `Rule_Id`.
fn extract_rule_sets<C: Component>(component: &C) -> Result<Vec<RuleSet>, StoreError> {
    let mut grouped: Vec<(String, Vec<&crate::Property>)> = Vec::new();
    for prop in component.props() {
        let group = prop.remarks.clone().unwrap_or_default();
        match grouped.iter_mut().find(|(g, _)| *g == group) {
            Some((_, props)) => props.push(prop),
            None => grouped.push((group, vec![prop])),
        }
    }

    let mut rule_sets = Vec::new();
    for (group, props) in grouped {
        let Some(rule_id) = props.iter().find(|p| p.name == RULE_ID) else {
            continue;
        };

        let mut rule_set = RuleSet {
            rule: Rule {
                id: rule_id.value.clone(),
                ..Default::default()
            },
            checks: Vec::new(),
        };

        for prop in props {
            match prop.name.as_str() {
                RULE_ID => {}
                RULE_DESCRIPTION => rule_set.rule.description = prop.value.clone(),
                PARAMETER_ID => rule_set.rule.parameters.push(Parameter {
                    id: prop.value.clone(),
                    ..Default::default()
                }),
                PARAMETER_DESCRIPTION => {
                    let parameter = rule_set.rule.parameters.last_mut().ok_or_else(|| {
                        StoreError::InvalidRuleGroup {
                            component: component.title().to_string(),
                            group: group.clone(),
                            reason: format!("{PARAMETER_DESCRIPTION} before {PARAMETER_ID}"),
                        }
                    })?;
                    parameter.description = prop.value.clone();
                }
                PARAMETER_VALUE => {
                    let parameter = rule_set.rule.parameters.last_mut().ok_or_else(|| {
                        StoreError::InvalidRuleGroup {
                            component: component.title().to_string(),
                            group: group.clone(),
                            reason: format!("{PARAMETER_VALUE} before {PARAMETER_ID}"),
                        }
                    })?;
                    parameter.value = Some(prop.value.clone());
                }
                CHECK_ID => rule_set.checks.push(Check {
                    id: prop.value.clone(),
                    ..Default::default()
                }),
                CHECK_DESCRIPTION => {
                    let check = rule_set.checks.last_mut().ok_or_else(|| {
                        StoreError::InvalidRuleGroup {
                            component: component.title().to_string(),
                            group: group.clone(),
                            reason: format!("{CHECK_DESCRIPTION} before {CHECK_ID}"),
                        }
                    })?;
                    check.description = prop.value.clone();
                }
                _ => {}
            }
        }
        rule_sets.push(rule_set);
    }
    Ok(rule_sets)
}
