//! Host channel and plugin serve loop wired together over in-process
//! duplex pipes, exercising the full provider facade.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use c2p_plugin::rpc::channel::RpcChannel;
use c2p_plugin::rpc::validate_handshake_line;
use c2p_plugin::{serve_connection, PluginId, PolicyPlugin};
use c2p_policy::{
    CheckResult, ObservationByCheck, Policy, Provider, ProviderError, PvpResult, Subject,
};

/// Records calls and returns canned results.
struct RecordingProvider {
    options_seen: Arc<Mutex<Option<HashMap<String, String>>>>,
    generated: Arc<Mutex<Vec<Policy>>>,
    result: PvpResult,
}

impl RecordingProvider {
    fn new(result: PvpResult) -> Self {
        Self {
            options_seen: Arc::new(Mutex::new(None)),
            generated: Arc::new(Mutex::new(Vec::new())),
            result,
        }
    }
}

#[async_trait]
impl Provider for RecordingProvider {
    async fn configure(&self, options: HashMap<String, String>) -> Result<(), ProviderError> {
        *self.options_seen.lock().unwrap() = Some(options);
        Ok(())
    }

    async fn generate(&self, policy: Policy) -> Result<(), ProviderError> {
        self.generated.lock().unwrap().push(policy);
        Ok(())
    }

    async fn get_results(&self, _policy: Policy) -> Result<PvpResult, ProviderError> {
        Ok(self.result.clone())
    }
}

fn sample_result() -> PvpResult {
    PvpResult {
        observations_by_check: vec![ObservationByCheck {
            title: "etcd_cert_file".into(),
            description: "Ensure that the --cert-file argument is set as appropriate".into(),
            check_id: "etcd_cert_file".into(),
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

fn sample_policy() -> Policy {
    vec![c2p_oscal::RuleSet {
        rule: c2p_oscal::Rule {
            id: "etcd_cert_file".into(),
            description: "Ensure that the --cert-file argument is set as appropriate".into(),
            parameters: vec![],
        },
        checks: vec![c2p_oscal::Check {
            id: "etcd_cert_file".into(),
            description: String::new(),
        }],
    }]
}

/// Starts the serve loop on one end of a duplex pipe and returns a
/// dispensable plugin facade on the other.
async fn connect(provider: RecordingProvider) -> PolicyPlugin {
    let (host_side, plugin_side) = tokio::io::duplex(64 * 1024);
    let (plugin_read, plugin_write) = tokio::io::split(plugin_side);
    tokio::spawn(async move {
        let _ = serve_connection(provider, plugin_read, plugin_write).await;
    });

    let (host_read, host_write) = tokio::io::split(host_side);
    let mut lines = RpcChannel::lines(Box::new(host_read));
    let handshake = lines
        .next_line()
        .await
        .expect("handshake read")
        .expect("handshake line");
    validate_handshake_line(&handshake).expect("valid handshake");

    let id = PluginId::parse("testplugin").unwrap();
    let channel = Arc::new(RpcChannel::new(id.clone(), lines, Box::new(host_write)));
    PolicyPlugin::new(id, channel)
}

#[tokio::test]
async fn configure_generate_get_results() {
    let options_seen = Arc::new(Mutex::new(None));
    let generated = Arc::new(Mutex::new(Vec::new()));
    let provider = RecordingProvider {
        options_seen: options_seen.clone(),
        generated: generated.clone(),
        result: sample_result(),
    };
    let plugin = connect(provider).await;

    let options = HashMap::from([("namespace".to_string(), "default".to_string())]);
    plugin.configure(options.clone()).await.unwrap();
    assert_eq!(options_seen.lock().unwrap().as_ref(), Some(&options));

    plugin.generate(sample_policy()).await.unwrap();
    assert_eq!(generated.lock().unwrap().len(), 1);
    assert_eq!(generated.lock().unwrap()[0], sample_policy());

    let results = plugin.get_results(sample_policy()).await.unwrap();
    assert_eq!(results.observations_by_check.len(), 1);
    assert_eq!(results.observations_by_check[0].check_id, "etcd_cert_file");
    assert_eq!(
        results.observations_by_check[0].subjects[0].result,
        CheckResult::Pass
    );
}

#[tokio::test]
async fn configure_is_one_shot() {
    let plugin = connect(RecordingProvider::new(sample_result())).await;

    plugin.configure(HashMap::new()).await.unwrap();
    let err = plugin.configure(HashMap::new()).await.unwrap_err();
    assert!(matches!(err, ProviderError::AlreadyConfigured));
}

#[tokio::test]
async fn generate_requires_configuration() {
    let plugin = connect(RecordingProvider::new(sample_result())).await;

    let err = plugin.generate(sample_policy()).await.unwrap_err();
    assert!(matches!(err, ProviderError::NotConfigured));
    let err = plugin.get_results(sample_policy()).await.unwrap_err();
    assert!(matches!(err, ProviderError::NotConfigured));
}

#[tokio::test]
async fn closed_pipe_is_plugin_dead() {
    let (host_side, plugin_side) = tokio::io::duplex(1024);
    drop(plugin_side);

    let (host_read, host_write) = tokio::io::split(host_side);
    let id = PluginId::parse("gone").unwrap();
    let channel = Arc::new(RpcChannel::new(
        id.clone(),
        RpcChannel::lines(Box::new(host_read)),
        Box::new(host_write),
    ));
    let plugin = PolicyPlugin::new(id, channel);

    let err = plugin.configure(HashMap::new()).await.unwrap_err();
    assert!(matches!(err, ProviderError::PluginDead));

    // The dead state is terminal.
    let err = plugin.get_results(sample_policy()).await.unwrap_err();
    assert!(matches!(err, ProviderError::PluginDead));
}
