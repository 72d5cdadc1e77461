//! Error types for plugin identity, discovery, and lifecycle.

use std::path::PathBuf;

use crate::identity::PluginId;

/// Failures across plugin identity, manifests, discovery, and launch.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    /// An id does not satisfy the identifier pattern.
    #[error("invalid plugin id {0}")]
    InvalidIdentifier(String),

    /// A component record that should map to a plugin has no title.
    #[error("component is missing a title")]
    MissingTitle,

    /// A manifest's embedded id does not match the id derived from its
    /// file name.
    #[error("manifest {file}: embedded id {embedded} does not match derived id {derived}")]
    ManifestMismatch {
        file: String,
        embedded: String,
        derived: String,
    },

    /// A manifest file could not be parsed.
    #[error("manifest {file}: {source}")]
    ManifestParse {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    /// An absolute executable path is outside the plugin directory.
    #[error("path {path} is not under the plugin directory {dir}")]
    PathEscape { path: PathBuf, dir: PathBuf },

    /// The resolved executable does not exist.
    #[error("plugin executable {path} does not exist")]
    ExecutableNotFound { path: PathBuf },

    /// The resolved executable is not a regular file.
    #[error("plugin executable {path} is not a file")]
    NotRegularFile { path: PathBuf },

    /// The resolved executable has no execute bit set.
    #[error("plugin file {path} is not executable")]
    NotExecutable { path: PathBuf },

    /// The executable digest does not match the manifest checksum.
    #[error("checksum mismatch for {path}: manifest pins {expected}, executable is {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    /// No plugin manifests survived discovery.
    #[error("no plugins found in {dir}")]
    PluginsNotFound { dir: PathBuf },

    /// A requested provider has no manifest in the plugin directory.
    #[error("plugin {0} not found")]
    NotFound(PluginId),

    /// A declared required option resolved to no value.
    #[error("required option {0} has no value")]
    MissingRequiredOption(String),

    /// The child did not complete the stdio handshake.
    #[error("handshake with plugin {id} failed: {reason}")]
    HandshakeFailed { id: PluginId, reason: String },

    /// The plugin does not implement the requested capability.
    #[error("plugin {id} does not provide capability {capability}")]
    CapabilityUnavailable { id: PluginId, capability: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Several failures reported together.
    #[error("{}", format_aggregate(.0))]
    Aggregate(Vec<PluginError>),
}

impl PluginError {
    /// Joins accumulated errors: none yields `None`, one is returned
    /// as-is, several are wrapped in [`PluginError::Aggregate`].
    pub fn join(mut errors: Vec<PluginError>) -> Option<PluginError> {
        match errors.len() {
            0 => None,
            1 => Some(errors.remove(0)),
            _ => Some(PluginError::Aggregate(errors)),
        }
    }
}

fn format_aggregate(errors: &[PluginError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
