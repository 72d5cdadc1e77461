//! Fan-out behavior of the Generate and AggregateResults actions.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio_util::sync::CancellationToken;

use c2p_framework::{aggregate_results, generate_policy, InputContext};
use c2p_oscal::{DefinedComponent, Property, Settings};
use c2p_plugin::PluginId;
use c2p_policy::{
    CheckResult, ObservationByCheck, Policy, Provider, ProviderError, PvpResult, Subject,
};

/// A scripted in-process provider.
struct MockProvider {
    result: PvpResult,
    delay: Option<Duration>,
    fail: bool,
    seen_policies: Arc<Mutex<Vec<Policy>>>,
}

impl MockProvider {
    fn returning(result: PvpResult) -> Self {
        Self {
            result,
            delay: None,
            fail: false,
            seen_policies: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn delayed(result: PvpResult, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::returning(result)
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::returning(PvpResult::default())
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn configure(&self, _options: HashMap<String, String>) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn generate(&self, policy: Policy) -> Result<(), ProviderError> {
        self.seen_policies.lock().unwrap().push(policy);
        if self.fail {
            return Err(ProviderError::Transport("generate blew up".into()));
        }
        Ok(())
    }

    async fn get_results(&self, policy: Policy) -> Result<PvpResult, ProviderError> {
        self.seen_policies.lock().unwrap().push(policy);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(ProviderError::Transport("results blew up".into()));
        }
        Ok(self.result.clone())
    }
}

fn validation_component(title: &str, rule: &str, parameter: Option<&str>) -> DefinedComponent {
    let mut props = vec![
        Property::new("Rule_Id", rule).with_remarks("rs_0"),
        Property::new("Rule_Description", format!("Ensure {rule}")).with_remarks("rs_0"),
    ];
    if let Some(parameter) = parameter {
        props.push(Property::new("Parameter_Id", parameter).with_remarks("rs_0"));
        props.push(
            Property::new("Parameter_Description", "A parameter for a file name")
                .with_remarks("rs_0"),
        );
    }
    props.push(Property::new("Check_Id", rule).with_remarks("rs_0"));
    props.push(Property::new("Check_Description", format!("Check {rule}")).with_remarks("rs_0"));

    DefinedComponent {
        uuid: uuid::Uuid::new_v4().to_string(),
        title: title.into(),
        component_type: "validation".into(),
        description: String::new(),
        props,
    }
}

fn one_observation(check: &str) -> PvpResult {
    PvpResult {
        observations_by_check: vec![ObservationByCheck {
            title: check.into(),
            description: format!("Observation of {check}"),
            check_id: check.into(),
            methods: vec!["TEST-AUTOMATED".into()],
            subjects: vec![Subject {
                title: "cluster-a".into(),
                subject_type: "resource".into(),
                resource_id: "cluster-a".into(),
                result: CheckResult::Pass,
                evaluated_on: Utc::now(),
                reason: "compliant".into(),
                props: vec![],
            }],
            collected: Some(Utc::now()),
            relevant_evidences: vec![],
            props: vec![],
        }],
        links: vec![],
    }
}

fn provider_map(
    entries: Vec<(&str, MockProvider)>,
) -> HashMap<PluginId, Arc<dyn Provider>> {
    entries
        .into_iter()
        .map(|(id, provider)| {
            (
                PluginId::parse(id).unwrap(),
                Arc::new(provider) as Arc<dyn Provider>,
            )
        })
        .collect()
}

#[tokio::test]
async fn aggregate_collects_all_provider_results() {
    let context = InputContext::new(&[
        validation_component("ocm", "ocm_policy", None),
        validation_component("kyverno", "kyverno_policy", None),
    ])
    .unwrap();

    let plugins = provider_map(vec![
        ("ocm", MockProvider::returning(one_observation("ocm_policy"))),
        (
            "kyverno",
            MockProvider::returning(one_observation("kyverno_policy")),
        ),
    ]);

    let token = CancellationToken::new();
    let outcome = aggregate_results(&token, &context, &plugins).await;
    assert_eq!(outcome.results.len(), 2);
    assert!(outcome.skipped.is_empty());
    assert!(outcome.errors.is_empty());
}

#[tokio::test]
async fn aggregate_preserves_partial_results_on_cancellation() {
    let context = InputContext::new(&[
        validation_component("ocm", "ocm_policy", None),
        validation_component("kyverno", "kyverno_policy", None),
    ])
    .unwrap();

    let plugins = provider_map(vec![
        ("ocm", MockProvider::returning(one_observation("ocm_policy"))),
        (
            "kyverno",
            MockProvider::delayed(one_observation("kyverno_policy"), Duration::from_secs(30)),
        ),
    ]);

    let token = CancellationToken::new();
    let cancel = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        cancel.cancel();
    });

    let outcome = aggregate_results(&token, &context, &plugins).await;
    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.errors.len(), 1);
    let err = outcome.into_error().unwrap();
    assert!(err.is_cancellation(), "expected cancellation, got {err}");
}

#[tokio::test]
async fn aggregate_accounts_for_every_provider() {
    // One provider succeeds, one has no validation component, one fails.
    let context = InputContext::new(&[
        validation_component("ocm", "ocm_policy", None),
        validation_component("kyverno", "kyverno_policy", None),
    ])
    .unwrap();

    let plugins = provider_map(vec![
        ("ocm", MockProvider::returning(one_observation("ocm_policy"))),
        ("stray", MockProvider::returning(PvpResult::default())),
        ("kyverno", MockProvider::failing()),
    ]);

    let token = CancellationToken::new();
    let outcome = aggregate_results(&token, &context, &plugins).await;
    assert_eq!(
        outcome.results.len() + outcome.skipped.len() + outcome.errors.len(),
        plugins.len()
    );
    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.skipped, vec![PluginId::parse("stray").unwrap()]);
    assert_eq!(outcome.errors.len(), 1);
}

#[tokio::test]
async fn aggregate_on_empty_plugin_set_is_empty() {
    let context = InputContext::new(&[validation_component("ocm", "r", None)]).unwrap();
    let token = CancellationToken::new();
    let outcome = aggregate_results(&token, &context, &HashMap::new()).await;
    assert!(outcome.results.is_empty());
    assert!(outcome.errors.is_empty());
}

#[tokio::test]
async fn generate_applies_compliance_settings() {
    let mut context = InputContext::new(&[validation_component(
        "mypvpvalidator",
        "etcd_key_file",
        Some("file_name"),
    )])
    .unwrap();
    context.set_settings(Settings::new(
        HashSet::from(["etcd_key_file".to_string()]),
        HashMap::from([("file_name".to_string(), "my_file".to_string())]),
    ));

    let provider = MockProvider::returning(PvpResult::default());
    let seen = provider.seen_policies.clone();
    let plugins = provider_map(vec![("mypvpvalidator", provider)]);

    let token = CancellationToken::new();
    generate_policy(&token, &context, &plugins).await.unwrap();

    let policies = seen.lock().unwrap();
    assert_eq!(policies.len(), 1);
    assert_eq!(policies[0].len(), 1);
    assert_eq!(policies[0][0].rule.id, "etcd_key_file");
    assert_eq!(
        policies[0][0].rule.parameters[0].value.as_deref(),
        Some("my_file")
    );
}

#[tokio::test]
async fn generate_joins_individual_failures() {
    let context = InputContext::new(&[
        validation_component("ocm", "ocm_policy", None),
        validation_component("kyverno", "kyverno_policy", None),
    ])
    .unwrap();

    let ok_provider = MockProvider::returning(PvpResult::default());
    let ok_seen = ok_provider.seen_policies.clone();
    let plugins = provider_map(vec![
        ("ocm", ok_provider),
        ("kyverno", MockProvider::failing()),
    ]);

    let token = CancellationToken::new();
    let err = generate_policy(&token, &context, &plugins)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("kyverno"));
    // The healthy provider still ran to completion.
    assert_eq!(ok_seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn generate_on_empty_plugin_set_is_ok() {
    let context = InputContext::new(&[validation_component("ocm", "r", None)]).unwrap();
    let token = CancellationToken::new();
    generate_policy(&token, &context, &HashMap::new())
        .await
        .unwrap();
}
