//! The typed provider facade over a launched plugin's RPC channel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use c2p_policy::{Policy, Provider, ProviderError, PvpResult};

use crate::identity::PluginId;
use crate::rpc::channel::RpcChannel;
use crate::rpc::wire::{policy_to_request, result_from_wire, WirePvpResult};
use crate::rpc::{METHOD_CONFIGURE, METHOD_GENERATE, METHOD_GET_RESULTS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PluginState {
    Launched,
    Configured,
    Stopped,
}

/// A dispensed policy validation point.
///
/// Configure is one-shot and must precede Generate/GetResults. A channel
/// failure that indicates the process died moves the plugin to a terminal
/// state; further calls fail with [`ProviderError::PluginDead`].
pub struct PolicyPlugin {
    id: PluginId,
    channel: Arc<RpcChannel>,
    state: Mutex<PluginState>,
}

impl PolicyPlugin {
    pub fn new(id: PluginId, channel: Arc<RpcChannel>) -> Self {
        Self {
            id,
            channel,
            state: Mutex::new(PluginState::Launched),
        }
    }

    pub fn id(&self) -> &PluginId {
        &self.id
    }

    fn state(&self) -> PluginState {
        *self.state.lock().expect("plugin state lock")
    }

    fn set_state(&self, state: PluginState) {
        *self.state.lock().expect("plugin state lock") = state;
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        let result = self.channel.call(method, params).await;
        if matches!(result, Err(ProviderError::PluginDead)) {
            self.set_state(PluginState::Stopped);
        }
        result
    }
}

#[async_trait]
impl Provider for PolicyPlugin {
    async fn configure(&self, options: HashMap<String, String>) -> Result<(), ProviderError> {
        match self.state() {
            PluginState::Stopped => return Err(ProviderError::PluginDead),
            PluginState::Configured => return Err(ProviderError::AlreadyConfigured),
            PluginState::Launched => {}
        }
        let params = serde_json::json!({ "options": options });
        self.call(METHOD_CONFIGURE, params).await?;
        self.set_state(PluginState::Configured);
        Ok(())
    }

    async fn generate(&self, policy: Policy) -> Result<(), ProviderError> {
        match self.state() {
            PluginState::Stopped => return Err(ProviderError::PluginDead),
            PluginState::Launched => return Err(ProviderError::NotConfigured),
            PluginState::Configured => {}
        }
        let request = policy_to_request(&policy);
        let params = serde_json::json!({ "request": request });
        self.call(METHOD_GENERATE, params).await?;
        Ok(())
    }

    async fn get_results(&self, policy: Policy) -> Result<PvpResult, ProviderError> {
        match self.state() {
            PluginState::Stopped => return Err(ProviderError::PluginDead),
            PluginState::Launched => return Err(ProviderError::NotConfigured),
            PluginState::Configured => {}
        }
        let request = policy_to_request(&policy);
        let params = serde_json::json!({ "request": request });
        let result = self.call(METHOD_GET_RESULTS, params).await?;
        let wire: WirePvpResult = serde_json::from_value(result)
            .map_err(|e| ProviderError::Transport(format!("undecodable result payload: {e}")))?;
        Ok(result_from_wire(&wire))
    }
}
