//! The Report action: raw PVP results to an assessment-results artifact.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use uuid::Uuid;

use c2p_oscal::{
    assessment_plan_to_results, none_if_empty, AssessmentPlan, AssessmentResults, BackMatter,
    Finding, FindingTarget, InventoryItem, ObjectiveStatus, Observation, Property,
    RelatedObservation, RelevantEvidence, Resource, ResultLocalDefinitions, RuleSet, StoreError,
    SubjectReference, PROPERTY_NAMESPACE,
};
use c2p_policy::{CheckResult, ObservationByCheck, PvpResult};

use crate::context::InputContext;
use crate::error::FrameworkError;

/// Inventory-item prop names carried onto synthesized inventory items;
/// everything else on a subject is dropped from the item.
const INVENTORY_PROP_NAMES: &[&str] = &[
    "fqdn",
    "ipv4-address",
    "ipv6-address",
    "uri",
    "serial-number",
    "model",
    "asset-tag",
    "asset-type",
    "version",
    "vendor-name",
    "asset-id",
    "public",
    "virtual",
];

/// Tuning knobs for report synthesis.
#[derive(Clone)]
pub struct ReportOptions {
    /// Decides whether a subject becomes an inventory item (true) or a
    /// back-matter resource (false).
    pub inventory_predicate: Arc<dyn Fn(&SubjectReference) -> bool + Send + Sync>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            inventory_predicate: Arc::new(|subject| subject.subject_type == "inventory-item"),
        }
    }
}

/// Generates assessment results from an assessment plan and raw PVP
/// results.
///
/// Observations whose check id is unknown to the rules store are skipped
/// with a warning; any other store failure is fatal. Findings are emitted
/// only for observations with at least one non-passing subject, one per
/// target control statement.
pub fn report(
    context: &InputContext,
    plan_href: &str,
    plan: &AssessmentPlan,
    results: &[PvpResult],
    options: &ReportOptions,
) -> Result<AssessmentResults, FrameworkError> {
    tracing::info!(plan = plan_href, "generating assessment results");

    // Control mappings keyed by activity title (the rule id).
    let mut rules_by_controls: HashMap<String, Vec<String>> = HashMap::new();
    if let Some(activities) = plan
        .local_definitions
        .as_ref()
        .and_then(|defs| defs.activities.as_ref())
    {
        for activity in activities {
            let mut control_set = Vec::new();
            if let Some(related) = &activity.related_controls {
                for selection in &related.control_selections {
                    for control in selection.include_controls.iter().flatten() {
                        control_set.push(format!("{}_smt", control.control_id));
                    }
                }
            }
            rules_by_controls.insert(activity.title.clone(), control_set);
        }
    }

    let mut observations: Vec<Observation> = Vec::new();
    let mut findings: Vec<Finding> = Vec::new();
    let mut inventory_items: Vec<InventoryItem> = Vec::new();
    let mut resources: Vec<Resource> = Vec::new();
    // Subject identity to assigned uuid; one inventory item or resource
    // per distinct subject across all observations.
    let mut subject_uuids: HashMap<String, String> = HashMap::new();
    let mut materialized: HashSet<String> = HashSet::new();

    for result in results {
        for observation_by_check in &result.observations_by_check {
            let rule_set = match context.store().get_by_check_id(&observation_by_check.check_id) {
                Ok(rule_set) => rule_set,
                Err(StoreError::RuleNotFound { check_id }) => {
                    tracing::warn!(check = %check_id, "skipping observation: rule not found");
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            let observation =
                to_oscal_observation(observation_by_check, &rule_set, &mut subject_uuids);

            if let Some(subjects) = &observation.subjects {
                for subject in subjects {
                    if materialized.insert(subject.subject_uuid.clone()) {
                        if (options.inventory_predicate)(subject) {
                            inventory_items.push(generate_inventory_item(subject));
                        } else {
                            resources.push(generate_resource(subject));
                        }
                    }
                }
            }

            if observation_has_failure(&observation) {
                if let Some(targets) = rules_by_controls.get(&rule_set.rule.id) {
                    generate_findings(&mut findings, &observation, targets);
                    tracing::info!(
                        rule = %rule_set.rule.id,
                        "generated findings for non-passing observation"
                    );
                }
            }

            observations.push(observation);
        }
    }

    let mut assessment_results = assessment_plan_to_results(plan, plan_href, observations);
    if assessment_results.results.len() != 1 {
        return Err(FrameworkError::InternalInvariant(
            "assessment results should have exactly one result".into(),
        ));
    }
    assessment_results.results[0].findings = none_if_empty(findings);
    if !inventory_items.is_empty() {
        assessment_results.results[0].local_definitions = Some(ResultLocalDefinitions {
            inventory_items: Some(inventory_items),
        });
    }
    if !resources.is_empty() {
        assessment_results.back_matter = Some(BackMatter {
            resources: Some(resources),
        });
    }

    Ok(assessment_results)
}

/// Whether any subject on the observation recorded a non-pass result.
fn observation_has_failure(observation: &Observation) -> bool {
    let Some(subjects) = &observation.subjects else {
        return false;
    };
    subjects.iter().any(|subject| {
        subject.props.iter().flatten().any(|prop| {
            prop.name == "result" && prop.value != CheckResult::Pass.as_str()
        })
    })
}

/// Converts a PVP observation-by-check to an OSCAL observation.
///
/// Subjects with the same identity (resource id, falling back to title)
/// keep one uuid across every observation in the run.
fn to_oscal_observation(
    observation_by_check: &ObservationByCheck,
    rule_set: &RuleSet,
    subject_uuids: &mut HashMap<String, String>,
) -> Observation {
    let mut subjects = Vec::new();
    for subject in &observation_by_check.subjects {
        let key = if subject.resource_id.is_empty() {
            subject.title.clone()
        } else {
            subject.resource_id.clone()
        };
        let subject_uuid = subject_uuids
            .entry(key)
            .or_insert_with(|| Uuid::new_v4().to_string())
            .clone();

        let mut props = vec![
            Property::new("resource-id", subject.resource_id.clone())
                .with_ns(PROPERTY_NAMESPACE),
            Property::new("result", subject.result.as_str()).with_ns(PROPERTY_NAMESPACE),
            Property::new("evaluated-on", subject.evaluated_on.to_rfc3339())
                .with_ns(PROPERTY_NAMESPACE),
            Property::new("reason", subject.reason.clone()).with_ns(PROPERTY_NAMESPACE),
        ];
        props.extend(
            subject
                .props
                .iter()
                .map(|p| Property::new(p.name.clone(), p.value.clone())),
        );

        subjects.push(SubjectReference {
            subject_uuid,
            title: subject.title.clone(),
            subject_type: subject.subject_type.clone(),
            props: Some(props),
        });
    }

    let relevant_evidence: Vec<RelevantEvidence> = observation_by_check
        .relevant_evidences
        .iter()
        .map(|link| RelevantEvidence {
            href: link.href.clone(),
            description: link.description.clone(),
        })
        .collect();

    Observation {
        uuid: Uuid::new_v4().to_string(),
        title: observation_by_check.title.clone(),
        description: observation_by_check.description.clone(),
        methods: observation_by_check.methods.clone(),
        collected: observation_by_check.collected.unwrap_or_else(chrono::Utc::now),
        subjects: none_if_empty(subjects),
        relevant_evidence: none_if_empty(relevant_evidence),
        props: Some(vec![
            Property::new("assessment-rule-id", rule_set.rule.id.clone())
                .with_ns(PROPERTY_NAMESPACE),
        ]),
    }
}

/// Appends the observation to a finding per target control, creating
/// findings for targets seen for the first time.
fn generate_findings(findings: &mut Vec<Finding>, observation: &Observation, targets: &[String]) {
    for target_id in targets {
        let related = RelatedObservation {
            observation_uuid: observation.uuid.clone(),
        };
        match findings
            .iter_mut()
            .find(|finding| &finding.target.target_id == target_id)
        {
            Some(finding) => {
                finding
                    .related_observations
                    .get_or_insert_with(Vec::new)
                    .push(related);
            }
            None => findings.push(Finding {
                uuid: Uuid::new_v4().to_string(),
                target: FindingTarget {
                    target_id: target_id.clone(),
                    target_type: "statement-id".into(),
                    status: ObjectiveStatus {
                        state: "not-satisfied".into(),
                    },
                },
                related_observations: Some(vec![related]),
            }),
        }
    }
}

/// Synthesizes an inventory item for a subject, keeping only the known
/// inventory props.
fn generate_inventory_item(subject: &SubjectReference) -> InventoryItem {
    let props: Vec<Property> = subject
        .props
        .iter()
        .flatten()
        .filter(|prop| INVENTORY_PROP_NAMES.contains(&prop.name.as_str()))
        .cloned()
        .collect();
    InventoryItem {
        uuid: subject.subject_uuid.clone(),
        description: subject.title.clone(),
        props: none_if_empty(props),
    }
}

/// Synthesizes a back-matter resource for a subject.
fn generate_resource(subject: &SubjectReference) -> Resource {
    Resource {
        uuid: subject.subject_uuid.clone(),
        title: subject.title.clone(),
    }
}
