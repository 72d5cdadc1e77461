//! The immutable input context actions execute against.

use std::collections::HashMap;
use std::sync::Arc;

use c2p_oscal::{
    Component, ComponentDefinition, DefinedComponent, MemoryStore, Settings,
    VALIDATION_COMPONENT_TYPE,
};
use c2p_plugin::PluginId;

use crate::error::FrameworkError;

/// Everything the actions need to run: the provider map, the indexed rules
/// store, the compliance settings, and the concurrency budget.
///
/// Immutable after construction except for attaching settings. The caller
/// owns the context and passes it by reference to actions.
#[derive(Debug)]
pub struct InputContext {
    components: Vec<DefinedComponent>,
    providers: HashMap<PluginId, String>,
    store: Arc<MemoryStore>,
    settings: Settings,
    max_concurrent_weight: usize,
}

impl InputContext {
    /// Builds a context from loaded component records.
    ///
    /// Each component of type `validation` maps to a provider: its title,
    /// normalized, is the plugin id, and the original title is preserved
    /// for rules-store lookups.
    pub fn new(components: &[DefinedComponent]) -> Result<Self, FrameworkError> {
        let mut providers = HashMap::new();
        for component in components {
            if component.component_type() == VALIDATION_COMPONENT_TYPE {
                let id = PluginId::from_title(component.title())?;
                providers.insert(id, component.title().to_string());
            }
        }

        let mut store = MemoryStore::new();
        store.index_all(components)?;

        let max_concurrent_weight = providers.len().max(1);
        Ok(Self {
            components: components.to_vec(),
            providers,
            store: Arc::new(store),
            settings: Settings::all_rules(),
            max_concurrent_weight,
        })
    }

    /// The component records this context was built from.
    pub fn components(&self) -> &[DefinedComponent] {
        &self.components
    }

    /// Builds a context from whole component definitions.
    pub fn from_component_definitions(
        definitions: &[ComponentDefinition],
    ) -> Result<Self, FrameworkError> {
        let components: Vec<DefinedComponent> = definitions
            .iter()
            .flat_map(|def| def.components.iter().cloned())
            .collect();
        Self::new(&components)
    }

    /// The original component title for a provider id, or
    /// [`FrameworkError::MissingProvider`], a sentinel actions treat as a
    /// skip, not a failure.
    pub fn provider_title(&self, id: &PluginId) -> Result<&str, FrameworkError> {
        self.providers
            .get(id)
            .map(String::as_str)
            .ok_or_else(|| FrameworkError::MissingProvider(id.clone()))
    }

    /// Ids of every provider the loaded components reference.
    pub fn requested_providers(&self) -> Vec<PluginId> {
        let mut ids: Vec<PluginId> = self.providers.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Attaches the compliance selection. Until set, all rules known to
    /// the store apply.
    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = settings;
    }

    pub fn max_concurrent_weight(&self) -> usize {
        self.max_concurrent_weight
    }

    /// Overrides the concurrency budget; clamped to at least 1.
    pub fn set_max_concurrent_weight(&mut self, weight: usize) {
        self.max_concurrent_weight = weight.max(1);
    }
}
