//! The facade every policy validation point implements.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::types::{Policy, PvpResult};

/// Failures surfaced by a provider call.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Configure was not called before Generate/GetResults.
    #[error("provider is not configured")]
    NotConfigured,

    /// Configure is one-shot and was already applied.
    #[error("provider is already configured")]
    AlreadyConfigured,

    /// The plugin process exited or crashed; the provider is unusable.
    #[error("plugin process is no longer running")]
    PluginDead,

    /// The call was abandoned because the caller's context was cancelled.
    #[error("call cancelled")]
    Cancelled,

    /// The plugin reported an error for the request.
    #[error("plugin error {code}: {message}")]
    Plugin { code: i64, message: String },

    /// The transport to the plugin failed.
    #[error("rpc transport: {0}")]
    Transport(String),
}

/// A policy validation engine.
///
/// Implementations may contact a remote API, exec another tool, or evaluate
/// policy themselves; the orchestrator only sees this surface. Configure is
/// one-shot and must succeed before Generate or GetResults.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Applies resolved configuration options.
    async fn configure(&self, options: HashMap<String, String>) -> Result<(), ProviderError>;

    /// Ships the effective rule sets so the engine can materialize the
    /// policy artifacts it owns.
    async fn generate(&self, policy: Policy) -> Result<(), ProviderError>;

    /// Asks the engine to evaluate the effective rule sets and report raw
    /// observations.
    async fn get_results(&self, policy: Policy) -> Result<PvpResult, ProviderError>;
}
