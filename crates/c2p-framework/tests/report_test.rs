//! Report synthesis: observations, findings, inventory, and resources.

use chrono::Utc;

use c2p_framework::{report, InputContext, ReportOptions};
use c2p_oscal::{
    Activity, AssessedControls, AssessmentPlan, DefinedComponent, LocalDefinitions, Metadata,
    Property, ReviewedControls, SelectControlById,
};
use c2p_policy::{CheckResult, Link, ObservationByCheck, PvpResult, Subject};

fn validator_component() -> DefinedComponent {
    DefinedComponent {
        uuid: uuid::Uuid::new_v4().to_string(),
        title: "MyPVPValidator".into(),
        component_type: "validation".into(),
        description: String::new(),
        props: vec![
            Property::new("Rule_Id", "etcd_cert_file").with_remarks("rs_0"),
            Property::new(
                "Rule_Description",
                "Ensure that the --cert-file argument is set as appropriate",
            )
            .with_remarks("rs_0"),
            Property::new("Check_Id", "etcd_cert_file").with_remarks("rs_0"),
            Property::new(
                "Check_Description",
                "Check that the --cert-file argument is set as appropriate",
            )
            .with_remarks("rs_0"),
        ],
    }
}

fn context() -> InputContext {
    InputContext::new(&[validator_component()]).unwrap()
}

fn plan(activity_title: &str, control_ids: &[&str]) -> AssessmentPlan {
    AssessmentPlan {
        uuid: uuid::Uuid::new_v4().to_string(),
        metadata: Metadata::generated("Test Plan"),
        local_definitions: Some(LocalDefinitions {
            activities: Some(vec![Activity {
                uuid: uuid::Uuid::new_v4().to_string(),
                title: activity_title.into(),
                related_controls: Some(ReviewedControls {
                    control_selections: vec![AssessedControls {
                        include_controls: Some(
                            control_ids
                                .iter()
                                .map(|id| SelectControlById {
                                    control_id: id.to_string(),
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

fn pvp_result(check_id: &str, subject_result: CheckResult, subject_type: &str) -> PvpResult {
    PvpResult {
        observations_by_check: vec![ObservationByCheck {
            title: check_id.into(),
            description: "Ensure that the --cert-file argument is set as appropriate".into(),
            check_id: check_id.into(),
            methods: vec!["test_method_1".into()],
            subjects: vec![Subject {
                title: "test_subject_1".into(),
                subject_type: subject_type.into(),
                resource_id: "test_resource_1".into(),
                result: subject_result,
                reason: "not-satisfied".into(),
                evaluated_on: Utc::now(),
                props: vec![],
            }],
            collected: Some(Utc::now()),
            relevant_evidences: vec![Link {
                description: "test_related_evidence_1".into(),
                href: "https://test-related-evidence-1".into(),
            }],
            props: vec![],
        }],
        links: vec![],
    }
}

#[test]
fn failing_subject_yields_finding_per_control() {
    let plan = plan("etcd_cert_file", &["ctrl-a", "ctrl-b"]);
    let results = vec![pvp_result("etcd_cert_file", CheckResult::Fail, "inventory-item")];

    let ar = report(
        &context(),
        "https://test-plan-href",
        &plan,
        &results,
        &ReportOptions::default(),
    )
    .unwrap();

    assert_eq!(ar.import_ap.href, "https://test-plan-href");
    assert_eq!(ar.results.len(), 1);
    let result = &ar.results[0];

    let observations = result.observations.as_ref().unwrap();
    assert_eq!(observations.len(), 1);
    let observation = &observations[0];

    // The observation is tagged with the owning rule.
    let props = observation.props.as_ref().unwrap();
    assert_eq!(props[0].name, "assessment-rule-id");
    assert_eq!(props[0].value, "etcd_cert_file");

    let findings = result.findings.as_ref().unwrap();
    assert_eq!(findings.len(), 2);
    let mut target_ids: Vec<&str> =
        findings.iter().map(|f| f.target.target_id.as_str()).collect();
    target_ids.sort();
    assert_eq!(target_ids, vec!["ctrl-a_smt", "ctrl-b_smt"]);

    for finding in findings {
        assert_eq!(finding.target.target_type, "statement-id");
        assert_eq!(finding.target.status.state, "not-satisfied");
        let related = finding.related_observations.as_ref().unwrap();
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].observation_uuid, observation.uuid);
    }

    // The failing inventory-item subject became exactly one inventory item.
    let items = result
        .local_definitions
        .as_ref()
        .unwrap()
        .inventory_items
        .as_ref()
        .unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].description, "test_subject_1");
}

#[test]
fn passing_subject_yields_no_findings() {
    let plan = plan("etcd_cert_file", &["ctrl-a"]);
    let results = vec![pvp_result("etcd_cert_file", CheckResult::Pass, "inventory-item")];

    let ar = report(
        &context(),
        "https://plan",
        &plan,
        &results,
        &ReportOptions::default(),
    )
    .unwrap();

    let result = &ar.results[0];
    assert_eq!(result.observations.as_ref().unwrap().len(), 1);
    assert!(result.findings.is_none());
}

#[test]
fn unknown_check_is_skipped() {
    let plan = plan("etcd_cert_file", &["ctrl-a"]);
    let results = vec![pvp_result("not_a_check", CheckResult::Fail, "inventory-item")];

    let ar = report(
        &context(),
        "https://plan",
        &plan,
        &results,
        &ReportOptions::default(),
    )
    .unwrap();

    let result = &ar.results[0];
    assert!(result.observations.is_none());
    assert!(result.findings.is_none());
}

#[test]
fn subject_uuid_is_stable_across_observations() {
    let plan = plan("etcd_cert_file", &["ctrl-a"]);
    // Two results observing the same subject.
    let results = vec![
        pvp_result("etcd_cert_file", CheckResult::Fail, "inventory-item"),
        pvp_result("etcd_cert_file", CheckResult::Fail, "inventory-item"),
    ];

    let ar = report(
        &context(),
        "https://plan",
        &plan,
        &results,
        &ReportOptions::default(),
    )
    .unwrap();

    let result = &ar.results[0];
    let observations = result.observations.as_ref().unwrap();
    assert_eq!(observations.len(), 2);

    let first_subject = &observations[0].subjects.as_ref().unwrap()[0];
    let second_subject = &observations[1].subjects.as_ref().unwrap()[0];
    assert_eq!(first_subject.subject_uuid, second_subject.subject_uuid);

    let items = result
        .local_definitions
        .as_ref()
        .unwrap()
        .inventory_items
        .as_ref()
        .unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].uuid, first_subject.subject_uuid);
}

#[test]
fn non_inventory_subject_becomes_back_matter_resource() {
    let plan = plan("etcd_cert_file", &["ctrl-a"]);
    let results = vec![pvp_result("etcd_cert_file", CheckResult::Pass, "resource")];

    let ar = report(
        &context(),
        "https://plan",
        &plan,
        &results,
        &ReportOptions::default(),
    )
    .unwrap();

    let result = &ar.results[0];
    assert!(result.local_definitions.is_none());
    let resources = ar
        .back_matter
        .as_ref()
        .unwrap()
        .resources
        .as_ref()
        .unwrap();
    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0].title, "test_subject_1");
}

#[test]
fn findings_reference_only_emitted_observations() {
    let plan = plan("etcd_cert_file", &["ctrl-a", "ctrl-b"]);
    let results = vec![
        pvp_result("etcd_cert_file", CheckResult::Fail, "inventory-item"),
        pvp_result("not_a_check", CheckResult::Fail, "inventory-item"),
    ];

    let ar = report(
        &context(),
        "https://plan",
        &plan,
        &results,
        &ReportOptions::default(),
    )
    .unwrap();

    let result = &ar.results[0];
    let observation_uuids: Vec<&str> = result
        .observations
        .as_ref()
        .unwrap()
        .iter()
        .map(|o| o.uuid.as_str())
        .collect();
    for finding in result.findings.as_ref().unwrap() {
        for related in finding.related_observations.as_ref().unwrap() {
            assert!(observation_uuids.contains(&related.observation_uuid.as_str()));
        }
    }
}

#[test]
fn custom_inventory_predicate_is_honored() {
    let plan = plan("etcd_cert_file", &["ctrl-a"]);
    let results = vec![pvp_result("etcd_cert_file", CheckResult::Pass, "resource")];

    // Treat everything as inventory.
    let options = ReportOptions {
        inventory_predicate: std::sync::Arc::new(|_| true),
    };
    let ar = report(&context(), "https://plan", &plan, &results, &options).unwrap();

    let result = &ar.results[0];
    assert!(result.local_definitions.is_some());
    assert!(ar.back_matter.is_none());
}
