//! Framework configuration.

use std::path::PathBuf;

use c2p_oscal::ComponentDefinition;

use crate::error::FrameworkError;

/// Default location the framework looks for plugins.
pub const DEFAULT_PLUGIN_PATH: &str = "c2p-plugins";

/// Configuration for [`crate::PluginManager`].
#[derive(Debug, Clone)]
pub struct C2pConfig {
    /// Directory searched for installed plugins and their manifests.
    pub plugin_dir: PathBuf,
    /// The loaded component definitions driving this workflow.
    pub component_definitions: Vec<ComponentDefinition>,
    /// Override for the action concurrency budget. Defaults to the number
    /// of providers; must be at least 1 when set.
    pub max_concurrent_weight: Option<usize>,
}

impl Default for C2pConfig {
    fn default() -> Self {
        Self {
            plugin_dir: PathBuf::from(DEFAULT_PLUGIN_PATH),
            component_definitions: Vec::new(),
            max_concurrent_weight: None,
        }
    }
}

impl C2pConfig {
    pub fn new(plugin_dir: impl Into<PathBuf>) -> Self {
        Self {
            plugin_dir: plugin_dir.into(),
            ..Self::default()
        }
    }

    /// Returns an error if the configuration has invalid fields.
    pub fn validate(&self) -> Result<(), FrameworkError> {
        if self.plugin_dir.as_os_str().is_empty() {
            return Err(FrameworkError::InvalidConfig(
                "plugin directory cannot be empty".into(),
            ));
        }
        match std::fs::metadata(&self.plugin_dir) {
            Ok(info) if info.is_dir() => {}
            Ok(_) => {
                return Err(FrameworkError::InvalidConfig(format!(
                    "plugin directory {} is not a directory",
                    self.plugin_dir.display()
                )));
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(FrameworkError::InvalidConfig(format!(
                    "plugin directory {} does not exist",
                    self.plugin_dir.display()
                )));
            }
            Err(err) => {
                return Err(FrameworkError::InvalidConfig(format!(
                    "plugin directory {}: {err}",
                    self.plugin_dir.display()
                )));
            }
        }
        if self.component_definitions.is_empty() {
            return Err(FrameworkError::InvalidConfig(
                "component definitions not set".into(),
            ));
        }
        if self.max_concurrent_weight == Some(0) {
            return Err(FrameworkError::InvalidConfig(
                "max concurrent weight must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
