//! Assessment plan to assessment results transformation.

use uuid::Uuid;

use crate::assessment::{
    AssessedControls, AssessmentPlan, AssessmentResult, AssessmentResults, ImportAp,
    ReviewedControls,
};
use crate::component::Metadata;
use crate::{none_if_empty, Observation};

const RESULT_TITLE: &str = "Automated Assessment Result";
const RESULT_DESCRIPTION: &str = "Assessment results automatically generated from PVP results";

/// Transforms an assessment plan into an assessment results skeleton with
/// exactly one result block carrying the given observations.
///
/// The result's reviewed controls are the union of the controls referenced
/// by the plan's activities. Findings, inventory items, and resources are
/// the report synthesis step's business.
pub fn assessment_plan_to_results(
    plan: &AssessmentPlan,
    plan_href: &str,
    observations: Vec<Observation>,
) -> AssessmentResults {
    let mut control_ids: Vec<String> = Vec::new();
    if let Some(activities) = plan
        .local_definitions
        .as_ref()
        .and_then(|defs| defs.activities.as_ref())
    {
        for activity in activities {
            let Some(related) = &activity.related_controls else {
                continue;
            };
            for selection in &related.control_selections {
                for control in selection.include_controls.iter().flatten() {
                    if !control_ids.contains(&control.control_id) {
                        control_ids.push(control.control_id.clone());
                    }
                }
            }
        }
    }

    let reviewed_controls = ReviewedControls {
        control_selections: vec![AssessedControls {
            include_controls: none_if_empty(
                control_ids
                    .into_iter()
                    .map(|control_id| crate::SelectControlById { control_id })
                    .collect(),
            ),
        }],
    };

    let result = AssessmentResult {
        uuid: Uuid::new_v4().to_string(),
        title: RESULT_TITLE.into(),
        description: RESULT_DESCRIPTION.into(),
        start: chrono::Utc::now(),
        reviewed_controls,
        local_definitions: None,
        observations: none_if_empty(observations),
        findings: None,
    };

    AssessmentResults {
        uuid: Uuid::new_v4().to_string(),
        metadata: Metadata::generated(plan.metadata.title.clone()),
        import_ap: ImportAp {
            href: plan_href.to_string(),
        },
        results: vec![result],
        back_matter: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::{Activity, LocalDefinitions, SelectControlById};

    fn plan_with_controls(controls: &[&str]) -> AssessmentPlan {
        AssessmentPlan {
            uuid: Uuid::new_v4().to_string(),
            metadata: Metadata::generated("Test Plan"),
            local_definitions: Some(LocalDefinitions {
                activities: Some(vec![Activity {
                    uuid: Uuid::new_v4().to_string(),
                    title: "etcd_cert_file".into(),
                    related_controls: Some(ReviewedControls {
                        control_selections: vec![AssessedControls {
                            include_controls: Some(
                                controls
                                    .iter()
                                    .map(|c| SelectControlById {
                                        control_id: c.to_string(),
                                    })
                                    .collect(),
                            ),
                        }],
                    }),
                }]),
            }),
            assessment_assets: None,
        }
    }

    #[test]
    fn single_result_block_with_plan_controls() {
        let ar = assessment_plan_to_results(&plan_with_controls(&["cis-2.1"]), "https://plan", vec![]);
        assert_eq!(ar.results.len(), 1);
        assert_eq!(ar.import_ap.href, "https://plan");
        let selections = &ar.results[0].reviewed_controls.control_selections;
        assert_eq!(selections.len(), 1);
        assert_eq!(
            selections[0].include_controls.as_ref().unwrap()[0].control_id,
            "cis-2.1"
        );
        assert!(ar.results[0].observations.is_none());
    }
}
