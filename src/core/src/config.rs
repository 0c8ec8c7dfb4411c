//! Plugin list parsing and run configuration.
//!
//! The plugin list is a properties file of `name=reference` lines:
//!
//! ```text
//! # gateway plugins
//! echo=oci://ghcr.io/acme/echo:0.1.0
//! auth=registry.local:5000/acme/auth:1.2.3
//! ```

use std::path::{Path, PathBuf};

use crate::error::{PullError, Result};

/// File name of the plugin list looked up next to the executable.
pub const DEFAULT_CONFIG_FILE: &str = "plugins.properties";

/// Directory (relative to the plugin list) that holds extracted plugins.
pub const PLUGINS_DIR_NAME: &str = "plugins";

/// Suffix of the per-plugin scratch directory created beside the plugin
/// directories. Plugin names may not end with it.
pub const TEMP_DIR_SUFFIX: &str = "_temp";

/// Scheme prefix accepted on references and stripped before use.
const OCI_SCHEME: &str = "oci://";

/// A single plugin entry from the plugin list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginSpec {
    /// Plugin identifier, used as a directory name
    pub name: String,
    /// Registry reference with any `oci://` prefix removed
    pub reference: String,
}

impl PluginSpec {
    /// Create a plugin spec, stripping one leading `oci://` from the reference.
    pub fn new(name: impl Into<String>, reference: impl Into<String>) -> Self {
        let reference = reference.into();
        let reference = reference
            .strip_prefix(OCI_SCHEME)
            .map(str::to_string)
            .unwrap_or(reference);
        Self {
            name: name.into(),
            reference,
        }
    }
}

/// Ordered, validated plugin list.
///
/// A repeated name replaces the earlier reference but keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginList {
    specs: Vec<PluginSpec>,
}

impl PluginList {
    /// Parse plugin list content.
    ///
    /// Empty lines and lines starting with `#` are ignored. Any other line
    /// must be `name=reference` with both sides non-empty after trimming.
    pub fn parse(content: &str) -> Result<Self> {
        let mut list = Self::default();

        for (idx, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let line_no = idx + 1;
            let (key, value) = line.split_once('=').ok_or_else(|| {
                PullError::ConfigError(format!(
                    "line {}: expected 'name=reference', got '{}'",
                    line_no, line
                ))
            })?;

            let key = key.trim();
            if key.is_empty() {
                return Err(PullError::ConfigError(format!(
                    "line {}: empty plugin name",
                    line_no
                )));
            }

            if key == "." || key == ".." || key.contains(&['/', '\\'][..]) {
                return Err(PullError::ConfigError(format!(
                    "line {}: plugin name '{}' is not a valid directory name",
                    line_no, key
                )));
            }

            if key.ends_with(TEMP_DIR_SUFFIX) {
                return Err(PullError::ConfigError(format!(
                    "line {}: plugin name '{}' ends with reserved suffix '{}'",
                    line_no, key, TEMP_DIR_SUFFIX
                )));
            }

            let spec = PluginSpec::new(key, value.trim());
            if spec.reference.is_empty() {
                return Err(PullError::ConfigError(format!(
                    "line {}: empty reference for plugin '{}'",
                    line_no, key
                )));
            }

            list.insert(spec);
        }

        Ok(list)
    }

    /// Read and parse a plugin list file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PullError::ConfigError(format!(
                "Failed to read plugin list {}: {}",
                path.display(),
                e
            ))
        })?;

        let list = Self::parse(&content)?;
        tracing::debug!(
            path = %path.display(),
            count = list.len(),
            "Loaded plugin list"
        );
        Ok(list)
    }

    fn insert(&mut self, spec: PluginSpec) {
        match self.specs.iter_mut().find(|s| s.name == spec.name) {
            Some(existing) => existing.reference = spec.reference,
            None => self.specs.push(spec),
        }
    }

    /// Plugin specs in file order.
    pub fn specs(&self) -> &[PluginSpec] {
        &self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl IntoIterator for PluginList {
    type Item = PluginSpec;
    type IntoIter = std::vec::IntoIter<PluginSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.specs.into_iter()
    }
}

/// Explicit configuration for one pull run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Path to the plugin list
    pub config_path: PathBuf,
    /// Root directory holding `<name>/<version>/plugin.wasm`
    pub plugins_root: PathBuf,
}

impl RunConfig {
    /// Build a run configuration from a plugin list path.
    ///
    /// Plugins are stored in a `plugins` directory next to the list.
    pub fn from_config_path(config_path: impl Into<PathBuf>) -> Self {
        let config_path = config_path.into();
        let base = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self {
            plugins_root: base.join(PLUGINS_DIR_NAME),
            config_path,
        }
    }

    /// Resolve the plugin list path, falling back to `plugins.properties`
    /// next to the running executable.
    pub fn resolve(config_path: Option<PathBuf>) -> Result<Self> {
        match config_path {
            Some(path) => Ok(Self::from_config_path(path)),
            None => Ok(Self::from_config_path(default_config_path()?)),
        }
    }
}

/// Path of `plugins.properties` in the directory of the running executable.
pub fn default_config_path() -> Result<PathBuf> {
    let exe = std::env::current_exe().map_err(|e| {
        PullError::ConfigError(format!("Failed to locate running executable: {}", e))
    })?;
    let dir = exe.parent().ok_or_else(|| {
        PullError::ConfigError(format!(
            "Executable path has no parent directory: {}",
            exe.display()
        ))
    })?;
    Ok(dir.join(DEFAULT_CONFIG_FILE))
}
