//! On-disk plugin manifests: launch metadata, executable sandboxing, and
//! configuration option resolution.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::PluginError;
use crate::identity::PluginId;

/// Required information for plugin launch and discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    /// The plugin's identifier; what callers request.
    pub id: PluginId,
    #[serde(default)]
    pub description: String,
    /// Semantic version of the plugin.
    #[serde(default)]
    pub version: String,
    /// Plugin types implemented by this plugin.
    pub types: Vec<String>,
}

/// A configuration option a plugin declares it accepts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigurationOption {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// Metadata about a plugin to support discovering and launching it.
/// Provided with the plugin on-disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub metadata: Metadata,
    /// Path to the plugin binary, relative to the plugin directory or
    /// absolute underneath it.
    #[serde(rename = "executablePath")]
    pub executable_path: PathBuf,
    /// SHA-256 hex digest of the executable, checked at launch.
    #[serde(rename = "sha256")]
    pub checksum: String,
    /// Declared configuration options, in resolution order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub configuration: Vec<ConfigurationOption>,
}

/// Manifests by plugin id.
pub type ManifestSet = HashMap<PluginId, Manifest>;

impl Manifest {
    /// Whether the plugin implements the given plugin type.
    pub fn supports_type(&self, plugin_type: &str) -> bool {
        self.metadata.types.iter().any(|t| t == plugin_type)
    }

    /// Validates and sanitizes [`Manifest::executable_path`].
    ///
    /// A relative path is joined to the absolute plugin directory; an
    /// absolute path must already be under it. The resolved path must be a
    /// regular file with an execute bit set.
    pub fn resolve_path(&mut self, plugin_dir: &Path) -> Result<(), PluginError> {
        let abs_dir = clean_path(&std::path::absolute(plugin_dir)?);

        let cleaned = if self.executable_path.is_absolute() {
            let cleaned = clean_path(&self.executable_path);
            if !cleaned.starts_with(&abs_dir) || cleaned == abs_dir {
                return Err(PluginError::PathEscape {
                    path: cleaned,
                    dir: abs_dir,
                });
            }
            cleaned
        } else {
            let joined = abs_dir.join(&self.executable_path);
            let cleaned = clean_path(&joined);
            // A relative path with enough `..` segments can climb out.
            if !cleaned.starts_with(&abs_dir) || cleaned == abs_dir {
                return Err(PluginError::PathEscape {
                    path: cleaned,
                    dir: abs_dir,
                });
            }
            cleaned
        };

        let file_info = match std::fs::metadata(&cleaned) {
            Ok(info) => info,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(PluginError::ExecutableNotFound { path: cleaned });
            }
            Err(err) => return Err(err.into()),
        };

        if !file_info.is_file() {
            return Err(PluginError::NotRegularFile { path: cleaned });
        }
        if !is_executable(&file_info) {
            return Err(PluginError::NotExecutable { path: cleaned });
        }

        self.executable_path = cleaned;
        Ok(())
    }

    /// Resolves the declared options against caller selections.
    ///
    /// Each option seeds from its default, is overwritten by a selection,
    /// and must end with a value if required. Unknown selection keys are
    /// ignored. A manifest with no declared options resolves to an empty
    /// map.
    pub fn resolve_options(
        &self,
        selections: &HashMap<String, String>,
    ) -> Result<HashMap<String, String>, PluginError> {
        let mut resolved = HashMap::new();
        for option in &self.configuration {
            let mut value = option.default.clone();
            if let Some(selected) = selections.get(&option.name) {
                value = Some(selected.clone());
            }
            match value {
                Some(value) => {
                    resolved.insert(option.name.clone(), value);
                }
                None if option.required => {
                    return Err(PluginError::MissingRequiredOption(option.name.clone()));
                }
                None => {}
            }
        }
        Ok(resolved)
    }
}

/// Lexically normalizes a path: strips `.` segments and resolves `..`
/// against preceding components without touching the filesystem.
fn clean_path(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !cleaned.pop() {
                    cleaned.push(component.as_os_str());
                }
            }
            other => cleaned.push(other.as_os_str()),
        }
    }
    cleaned
}

#[cfg(unix)]
fn is_executable(info: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    info.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_info: &std::fs::Metadata) -> bool {
    true
}
