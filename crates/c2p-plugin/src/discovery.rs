//! Plugin discovery over an on-disk manifest catalog.

use std::collections::HashMap;
use std::path::Path;

use crate::error::PluginError;
use crate::identity::{PluginId, IDENTIFIER_PATTERN};
use crate::manifest::{Manifest, ManifestSet};

const MANIFEST_PREFIX: &str = "c2p-";
const MANIFEST_SUFFIX: &str = "-manifest.json";

/// Filtering criteria for [`find_plugins`].
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    provider_ids: Option<Vec<PluginId>>,
    plugin_type: Option<String>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires every given provider id to be present; missing ids fail
    /// discovery with [`PluginError::NotFound`], accumulated.
    pub fn with_provider_ids(mut self, provider_ids: Vec<PluginId>) -> Self {
        self.provider_ids = Some(provider_ids);
        self
    }

    /// Retains only manifests whose types contain the given plugin type.
    pub fn with_plugin_type(mut self, plugin_type: impl Into<String>) -> Self {
        self.plugin_type = Some(plugin_type.into());
        self
    }
}

/// Searches for plugins in the given directory, optionally applying
/// filters.
///
/// Manifests are expected in the format `c2p-<id>-manifest.json`. The id
/// derived from the file name must satisfy the identifier pattern and match
/// the manifest's embedded id. Executable paths are sandboxed to the plugin
/// directory. All failures are reported together rather than first-wins.
pub fn find_plugins(plugin_dir: &Path, options: &FindOptions) -> Result<ManifestSet, PluginError> {
    let mut matches = find_all_plugin_matches(plugin_dir)?;
    if matches.is_empty() {
        return Err(PluginError::PluginsNotFound {
            dir: plugin_dir.to_path_buf(),
        });
    }

    let mut errors: Vec<PluginError> = Vec::new();

    let mut matching: HashMap<PluginId, String> = HashMap::new();
    for (derived, file_name) in matches.drain() {
        if !IDENTIFIER_PATTERN.is_match(&derived) {
            errors.push(PluginError::InvalidIdentifier(derived));
            continue;
        }
        match PluginId::parse(&derived) {
            Ok(id) => {
                matching.insert(id, file_name);
            }
            Err(err) => errors.push(err),
        }
    }
    if let Some(err) = PluginError::join(std::mem::take(&mut errors)) {
        return Err(err);
    }

    // Filter plugins by provider ids if provided.
    if let Some(provider_ids) = &options.provider_ids {
        for provider_id in provider_ids {
            if !matching.contains_key(provider_id) {
                errors.push(PluginError::NotFound(provider_id.clone()));
            }
        }
        if let Some(err) = PluginError::join(std::mem::take(&mut errors)) {
            return Err(err);
        }
        matching.retain(|id, _| provider_ids.contains(id));
    }

    // Process remaining plugins, filtering by plugin type if necessary.
    let mut manifests = ManifestSet::new();
    for (id, file_name) in matching {
        let manifest_path = plugin_dir.join(&file_name);
        let mut manifest = match read_manifest_file(&manifest_path) {
            Ok(manifest) => manifest,
            Err(err) => {
                errors.push(err);
                continue;
            }
        };

        if manifest.metadata.id != id {
            errors.push(PluginError::ManifestMismatch {
                file: file_name,
                embedded: manifest.metadata.id.to_string(),
                derived: id.to_string(),
            });
            continue;
        }

        if let Some(plugin_type) = &options.plugin_type {
            if !manifest.supports_type(plugin_type) {
                continue;
            }
        }

        if let Err(err) = manifest.resolve_path(plugin_dir) {
            errors.push(err);
            continue;
        }
        manifests.insert(id, manifest);
    }

    if let Some(err) = PluginError::join(errors) {
        return Err(err);
    }
    if manifests.is_empty() {
        return Err(PluginError::PluginsNotFound {
            dir: plugin_dir.to_path_buf(),
        });
    }
    Ok(manifests)
}

/// Locates manifests matching the file name scheme and returns the derived
/// raw id and file name.
fn find_all_plugin_matches(plugin_dir: &Path) -> Result<HashMap<String, String>, PluginError> {
    let mut matches = HashMap::new();
    for entry in std::fs::read_dir(plugin_dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        let Some(trimmed) = name
            .strip_prefix(MANIFEST_PREFIX)
            .and_then(|rest| rest.strip_suffix(MANIFEST_SUFFIX))
        else {
            continue;
        };
        matches.insert(trimmed.to_string(), name.to_string());
    }
    Ok(matches)
}

fn read_manifest_file(manifest_path: &Path) -> Result<Manifest, PluginError> {
    let data = std::fs::read_to_string(manifest_path)?;
    serde_json::from_str(&data).map_err(|source| PluginError::ManifestParse {
        file: manifest_path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[cfg(unix)]
    fn write_executable(dir: &Path, name: &str) {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        std::fs::write(&path, b"#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    fn write_manifest(dir: &Path, id: &str, types: &[&str]) {
        let manifest = serde_json::json!({
            "metadata": {
                "id": id,
                "description": format!("{id} test plugin"),
                "version": "0.1.0",
                "types": types,
            },
            "executablePath": id,
            "sha256": "0000",
        });
        std::fs::write(
            dir.join(format!("c2p-{id}-manifest.json")),
            serde_json::to_vec_pretty(&manifest).unwrap(),
        )
        .unwrap();
    }

    #[cfg(unix)]
    fn plugin_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(dir.path(), "testplugin", &["pvp"]);
        write_executable(dir.path(), "testplugin");
        write_manifest(dir.path(), "another", &["pvp", "remediation"]);
        write_executable(dir.path(), "another");
        dir
    }

    #[cfg(unix)]
    #[test]
    fn unfiltered_discovery_returns_all() {
        let dir = plugin_dir();
        let manifests = find_plugins(dir.path(), &FindOptions::new()).unwrap();
        assert_eq!(manifests.len(), 2);
        for (id, manifest) in &manifests {
            assert_eq!(&manifest.metadata.id, id);
            assert!(manifest.executable_path.is_absolute());
        }
    }

    #[cfg(unix)]
    #[test]
    fn plugin_type_filter_retains_matching() {
        let dir = plugin_dir();
        let options = FindOptions::new().with_plugin_type("remediation");
        let manifests = find_plugins(dir.path(), &options).unwrap();
        assert_eq!(manifests.len(), 1);
        assert!(manifests.contains_key(&PluginId::parse("another").unwrap()));
    }

    #[cfg(unix)]
    #[test]
    fn missing_provider_id_fails() {
        let dir = plugin_dir();
        let options =
            FindOptions::new().with_provider_ids(vec![PluginId::parse("missing").unwrap()]);
        let err = find_plugins(dir.path(), &options).unwrap_err();
        assert!(matches!(err, PluginError::NotFound(id) if id.as_str() == "missing"));
    }

    #[cfg(unix)]
    #[test]
    fn invalid_derived_id_fails_discovery() {
        let dir = plugin_dir();
        std::fs::write(dir.path().join("c2p-INVALID-manifest.json"), b"{}").unwrap();
        let err = find_plugins(dir.path(), &FindOptions::new()).unwrap_err();
        assert!(matches!(err, PluginError::InvalidIdentifier(id) if id == "INVALID"));
    }

    #[cfg(unix)]
    #[test]
    fn embedded_id_must_match_derived_id() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(dir.path(), "other", &["pvp"]);
        write_executable(dir.path(), "other");
        std::fs::rename(
            dir.path().join("c2p-other-manifest.json"),
            dir.path().join("c2p-renamed-manifest.json"),
        )
        .unwrap();

        let err = find_plugins(dir.path(), &FindOptions::new()).unwrap_err();
        assert!(matches!(err, PluginError::ManifestMismatch { .. }));
    }

    #[test]
    fn empty_directory_is_plugins_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = find_plugins(dir.path(), &FindOptions::new()).unwrap_err();
        assert!(matches!(err, PluginError::PluginsNotFound { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn discovery_is_idempotent_over_unchanged_directory() {
        let dir = plugin_dir();
        let first = find_plugins(dir.path(), &FindOptions::new()).unwrap();
        let second = find_plugins(dir.path(), &FindOptions::new()).unwrap();
        assert_eq!(first.len(), second.len());
        for (id, manifest) in &first {
            assert_eq!(
                manifest.executable_path,
                second.get(id).unwrap().executable_path
            );
        }
    }

    #[test]
    fn errors_are_aggregated() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("c2p-BAD-manifest.json"), b"{}").unwrap();
        std::fs::write(dir.path().join("c2p-ALSOBAD-manifest.json"), b"{}").unwrap();
        let err = find_plugins(dir.path(), &FindOptions::new()).unwrap_err();
        match err {
            PluginError::Aggregate(errors) => assert_eq!(errors.len(), 2),
            other => panic!("expected aggregate, got {other}"),
        }
    }

    #[test]
    fn unreadable_directory_is_io_error() {
        let err = find_plugins(&PathBuf::from("/definitely/not/here"), &FindOptions::new())
            .unwrap_err();
        assert!(matches!(err, PluginError::Io(_)));
    }
}
