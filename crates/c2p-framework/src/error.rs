//! Framework error types.

use c2p_oscal::StoreError;
use c2p_plugin::{PluginError, PluginId};
use c2p_policy::ProviderError;

/// Failures across the orchestration workflow.
///
/// Pre-flight failures (validate, discover, launch, configure) abort the
/// workflow. Per-provider action failures are collected into
/// [`FrameworkError::Joined`] so partial progress from other providers is
/// preserved.
#[derive(Debug, thiserror::Error)]
pub enum FrameworkError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Plugin(#[from] PluginError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// An RPC call to one provider failed; tagged with the provider id.
    #[error("plugin {id}: {source}")]
    Provider {
        id: PluginId,
        #[source]
        source: ProviderError,
    },

    /// Effective rule sets for a component could not be built.
    #[error("failed to get rule sets for component {title}: {source}")]
    ComponentRules {
        title: String,
        #[source]
        source: StoreError,
    },

    /// No validation component maps to this provider id. Soft: actions log
    /// and skip instead of returning this.
    #[error("missing validation component for provider {0}")]
    MissingProvider(PluginId),

    /// Launch aborted partway; the named plugins are already running and
    /// the caller should still invoke cleanup.
    #[error("launch failed (already launched: [{}]): {source}", format_ids(.launched))]
    LaunchFailed {
        launched: Vec<PluginId>,
        #[source]
        source: Box<FrameworkError>,
    },

    /// A should-not-happen state; a bug rather than an input problem.
    #[error("bug: {0}")]
    InternalInvariant(String),

    /// Per-provider errors joined together.
    #[error("{}", format_joined(.0))]
    Joined(Vec<FrameworkError>),
}

impl FrameworkError {
    /// Joins collected errors: none yields `None`, one is returned as-is,
    /// several become [`FrameworkError::Joined`].
    pub fn join(mut errors: Vec<FrameworkError>) -> Option<FrameworkError> {
        match errors.len() {
            0 => None,
            1 => Some(errors.remove(0)),
            _ => Some(FrameworkError::Joined(errors)),
        }
    }

    /// Whether this error (or any joined part of it) is a cancellation.
    pub fn is_cancellation(&self) -> bool {
        match self {
            FrameworkError::Provider {
                source: ProviderError::Cancelled,
                ..
            } => true,
            FrameworkError::Joined(errors) => errors.iter().any(|e| e.is_cancellation()),
            FrameworkError::LaunchFailed { source, .. } => source.is_cancellation(),
            _ => false,
        }
    }
}

fn format_ids(ids: &[PluginId]) -> String {
    ids.iter()
        .map(|id| id.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_joined(errors: &[FrameworkError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
