//! The plugin manager: composes discovery, supervision, and configuration.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use c2p_plugin::{find_plugins, FindOptions, ManifestSet, PluginId, Supervisor, PVP_CAPABILITY};
use c2p_policy::Provider;

use crate::config::C2pConfig;
use crate::context::InputContext;
use crate::error::FrameworkError;
use crate::logging;

/// Manages the plugin lifecycle for compliance-to-policy workflows:
/// find and launch with [`PluginManager::find_requested`] and
/// [`PluginManager::launch`], tear down with [`PluginManager::cleanup`].
///
/// The manager owns the supervisor and, through it, every launched child
/// process.
pub struct PluginManager {
    plugin_dir: PathBuf,
    supervisor: Supervisor,
}

impl PluginManager {
    /// Validates the configuration, installs global logging, and builds
    /// the manager together with the input context for the loaded
    /// component definitions.
    pub fn new(config: &C2pConfig) -> Result<(Self, InputContext), FrameworkError> {
        config.validate()?;
        logging::init_logging();

        let mut context = InputContext::from_component_definitions(&config.component_definitions)?;
        if let Some(weight) = config.max_concurrent_weight {
            context.set_max_concurrent_weight(weight);
        }

        let manager = Self {
            plugin_dir: config.plugin_dir.clone(),
            supervisor: Supervisor::new(),
        };
        Ok((manager, context))
    }

    /// A manager over an already-built input context.
    pub fn with_context(plugin_dir: impl Into<PathBuf>) -> Self {
        Self {
            plugin_dir: plugin_dir.into(),
            supervisor: Supervisor::new(),
        }
    }

    /// Discovers manifests for every provider the context references,
    /// usually filtered to the `pvp` plugin type.
    pub fn find_requested(
        &self,
        context: &InputContext,
        plugin_type: Option<&str>,
    ) -> Result<ManifestSet, FrameworkError> {
        let mut options = FindOptions::new().with_provider_ids(context.requested_providers());
        if let Some(plugin_type) = plugin_type {
            options = options.with_plugin_type(plugin_type);
        }
        Ok(find_plugins(&self.plugin_dir, &options)?)
    }

    /// Launches and configures each plugin in the set, sequentially.
    ///
    /// `select_cfg` supplies per-plugin option selections; they are
    /// resolved against the manifest's declared options before Configure.
    /// On failure the error enumerates the plugins already running so the
    /// caller can still invoke [`PluginManager::cleanup`]. The returned
    /// map is complete iff no error is returned.
    pub async fn launch<F>(
        &self,
        manifests: &ManifestSet,
        select_cfg: F,
    ) -> Result<HashMap<PluginId, Arc<dyn Provider>>, FrameworkError>
    where
        F: Fn(&PluginId) -> HashMap<String, String>,
    {
        let mut providers: HashMap<PluginId, Arc<dyn Provider>> = HashMap::new();
        let mut launched: Vec<PluginId> = Vec::new();

        let mut ids: Vec<&PluginId> = manifests.keys().collect();
        ids.sort();

        for id in ids {
            let manifest = &manifests[id];

            let channel = match self.supervisor.launch(manifest).await {
                Ok(channel) => channel,
                Err(err) => {
                    return Err(FrameworkError::LaunchFailed {
                        launched,
                        source: Box::new(err.into()),
                    });
                }
            };
            launched.push(id.clone());
            tracing::info!(plugin = %id, "launched plugin");

            let plugin = match self.supervisor.dispense(channel, PVP_CAPABILITY).await {
                Ok(plugin) => plugin,
                Err(err) => {
                    return Err(FrameworkError::LaunchFailed {
                        launched,
                        source: Box::new(err.into()),
                    });
                }
            };

            let options = match manifest.resolve_options(&select_cfg(id)) {
                Ok(options) => options,
                Err(err) => {
                    return Err(FrameworkError::LaunchFailed {
                        launched,
                        source: Box::new(err.into()),
                    });
                }
            };
            if let Err(source) = plugin.configure(options).await {
                return Err(FrameworkError::LaunchFailed {
                    launched,
                    source: Box::new(FrameworkError::Provider {
                        id: id.clone(),
                        source,
                    }),
                });
            }
            tracing::debug!(plugin = %id, "configured plugin");

            providers.insert(id.clone(), Arc::new(plugin));
        }
        Ok(providers)
    }

    /// Terminates every plugin started through this manager. Idempotent.
    pub async fn cleanup(&self) {
        self.supervisor.cleanup().await;
    }
}
