//! Wire value objects and their conversions to and from the policy types.
//!
//! The wire schema names things the way plugins see them (`name`,
//! `selected_value`, `evidence_refs`); the policy layer keeps the rule-set
//! vocabulary (`id`, `value`, `relevant_evidences`). Conversions are
//! lossless in both directions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use c2p_policy::{CheckResult, ObservationByCheck, Policy, PvpResult, Subject};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireParameter {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireCheck {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireRule {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<WireParameter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checks: Vec<WireCheck>,
}

/// The request payload for Generate and GetResults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRequest {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<WireRule>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireProperty {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireLink {
    #[serde(default)]
    pub description: String,
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireSubject {
    pub title: String,
    #[serde(rename = "type")]
    pub subject_type: String,
    pub resource_id: String,
    pub result: CheckResult,
    pub evaluated_on: DateTime<Utc>,
    #[serde(default)]
    pub reason: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub props: Vec<WireProperty>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireObservation {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub check_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collected_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subjects: Vec<WireSubject>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence_refs: Vec<WireLink>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub props: Vec<WireProperty>,
}

/// The result payload returned by GetResults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WirePvpResult {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub observations: Vec<WireObservation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<WireLink>,
}

/// Converts effective rule sets into the request shipped to a plugin.
pub fn policy_to_request(policy: &Policy) -> PolicyRequest {
    PolicyRequest {
        rules: policy
            .iter()
            .map(|rule_set| WireRule {
                name: rule_set.rule.id.clone(),
                description: rule_set.rule.description.clone(),
                parameters: rule_set
                    .rule
                    .parameters
                    .iter()
                    .map(|p| WireParameter {
                        name: p.id.clone(),
                        description: p.description.clone(),
                        selected_value: p.value.clone(),
                    })
                    .collect(),
                checks: rule_set
                    .checks
                    .iter()
                    .map(|c| WireCheck {
                        name: c.id.clone(),
                        description: c.description.clone(),
                    })
                    .collect(),
            })
            .collect(),
    }
}

/// Rebuilds rule sets from a received request, on the plugin side.
pub fn request_to_policy(request: &PolicyRequest) -> Policy {
    request
        .rules
        .iter()
        .map(|rule| c2p_oscal::RuleSet {
            rule: c2p_oscal::Rule {
                id: rule.name.clone(),
                description: rule.description.clone(),
                parameters: rule
                    .parameters
                    .iter()
                    .map(|p| c2p_oscal::Parameter {
                        id: p.name.clone(),
                        description: p.description.clone(),
                        value: p.selected_value.clone(),
                    })
                    .collect(),
            },
            checks: rule
                .checks
                .iter()
                .map(|c| c2p_oscal::Check {
                    id: c.name.clone(),
                    description: c.description.clone(),
                })
                .collect(),
        })
        .collect()
}

/// Converts a plugin's raw result into the wire shape, on the plugin side.
pub fn result_to_wire(result: &PvpResult) -> WirePvpResult {
    WirePvpResult {
        observations: result
            .observations_by_check
            .iter()
            .map(|obs| WireObservation {
                name: obs.title.clone(),
                description: obs.description.clone(),
                check_id: obs.check_id.clone(),
                methods: obs.methods.clone(),
                collected_at: obs.collected,
                subjects: obs
                    .subjects
                    .iter()
                    .map(|s| WireSubject {
                        title: s.title.clone(),
                        subject_type: s.subject_type.clone(),
                        resource_id: s.resource_id.clone(),
                        result: s.result,
                        evaluated_on: s.evaluated_on,
                        reason: s.reason.clone(),
                        props: s
                            .props
                            .iter()
                            .map(|p| WireProperty {
                                name: p.name.clone(),
                                value: p.value.clone(),
                            })
                            .collect(),
                    })
                    .collect(),
                evidence_refs: obs
                    .relevant_evidences
                    .iter()
                    .map(|l| WireLink {
                        description: l.description.clone(),
                        href: l.href.clone(),
                    })
                    .collect(),
                props: obs
                    .props
                    .iter()
                    .map(|p| WireProperty {
                        name: p.name.clone(),
                        value: p.value.clone(),
                    })
                    .collect(),
            })
            .collect(),
        links: result
            .links
            .iter()
            .map(|l| WireLink {
                description: l.description.clone(),
                href: l.href.clone(),
            })
            .collect(),
    }
}

/// Rebuilds a raw result from the wire shape, on the host side.
pub fn result_from_wire(wire: &WirePvpResult) -> PvpResult {
    PvpResult {
        observations_by_check: wire
            .observations
            .iter()
            .map(|obs| ObservationByCheck {
                title: obs.name.clone(),
                description: obs.description.clone(),
                check_id: obs.check_id.clone(),
                methods: obs.methods.clone(),
                collected: obs.collected_at,
                subjects: obs
                    .subjects
                    .iter()
                    .map(|s| Subject {
                        title: s.title.clone(),
                        subject_type: s.subject_type.clone(),
                        resource_id: s.resource_id.clone(),
                        result: s.result,
                        evaluated_on: s.evaluated_on,
                        reason: s.reason.clone(),
                        props: s
                            .props
                            .iter()
                            .map(|p| c2p_policy::Property {
                                name: p.name.clone(),
                                value: p.value.clone(),
                            })
                            .collect(),
                    })
                    .collect(),
                relevant_evidences: obs
                    .evidence_refs
                    .iter()
                    .map(|l| c2p_policy::Link {
                        description: l.description.clone(),
                        href: l.href.clone(),
                    })
                    .collect(),
                props: obs
                    .props
                    .iter()
                    .map(|p| c2p_policy::Property {
                        name: p.name.clone(),
                        value: p.value.clone(),
                    })
                    .collect(),
            })
            .collect(),
        links: wire
            .links
            .iter()
            .map(|l| c2p_policy::Link {
                description: l.description.clone(),
                href: l.href.clone(),
            })
            .collect(),
    }
}
