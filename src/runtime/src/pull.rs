//! Plugin pull orchestrator.
//!
//! For each plugin: fetch the artifact into `<root>/<name>_temp`, resolve
//! its manifest, extract `plugin.wasm` into `<root>/<name>/<version>` and
//! write the metadata sidecar. The temporary layout is removed on every
//! exit path.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use plugin_pull_core::error::{PullError, Result};
use plugin_pull_core::{PluginSpec, TEMP_DIR_SUFFIX};

use crate::metadata::{generate_metadata, ArtifactMetadata, MetadataLabel, METADATA_FILE_NAME};
use crate::oci::{artifact_version, extract_plugin, OciLayout};
use crate::transport::ArtifactTransport;

/// A plugin whose binary was extracted.
#[derive(Debug)]
pub struct PulledPlugin {
    pub name: String,
    pub version: String,
    /// Path to `plugin.wasm`
    pub binary: PathBuf,
    /// `None` when sidecar generation failed
    pub metadata: Option<ArtifactMetadata>,
}

/// A plugin that did not yield a binary.
#[derive(Debug)]
pub struct FailedPlugin {
    pub name: String,
    pub error: PullError,
}

/// Summary of a pull run.
#[derive(Debug, Default)]
pub struct PullReport {
    pub pulled: Vec<PulledPlugin>,
    pub failed: Vec<FailedPlugin>,
}

impl PullReport {
    /// Names of plugins that failed, in processing order.
    pub fn failed_names(&self) -> Vec<&str> {
        self.failed.iter().map(|f| f.name.as_str()).collect()
    }

    /// True when every plugin produced a binary.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Pulls plugins through an [`ArtifactTransport`] into a plugins root.
pub struct PluginPuller {
    transport: Arc<dyn ArtifactTransport>,
    plugins_root: PathBuf,
}

impl PluginPuller {
    /// Create a new plugin puller.
    pub fn new(transport: Arc<dyn ArtifactTransport>, plugins_root: impl Into<PathBuf>) -> Self {
        Self {
            transport,
            plugins_root: plugins_root.into(),
        }
    }

    pub fn plugins_root(&self) -> &Path {
        &self.plugins_root
    }

    /// Directory receiving `plugin.wasm` for a spec.
    pub fn plugin_dir(&self, spec: &PluginSpec) -> Result<PathBuf> {
        let version = artifact_version(&spec.reference)?;
        Ok(self.version_dir(&spec.name, &version))
    }

    fn version_dir(&self, name: &str, version: &str) -> PathBuf {
        self.plugins_root.join(name).join(version)
    }

    /// Temporary layout directory for a plugin.
    pub fn temp_dir(&self, name: &str) -> PathBuf {
        self.plugins_root.join(format!("{}{}", name, TEMP_DIR_SUFFIX))
    }

    /// Pull every spec in order. One plugin's failure never stops the run.
    pub async fn pull_all(&self, specs: impl IntoIterator<Item = PluginSpec>) -> PullReport {
        let mut report = PullReport::default();

        for spec in specs {
            tracing::info!(
                plugin = %spec.name,
                reference = %spec.reference,
                "Processing plugin"
            );
            match self.pull(&spec).await {
                Ok(pulled) => report.pulled.push(pulled),
                Err(error) => {
                    tracing::error!(plugin = %spec.name, error = %error, "Plugin pull failed");
                    report.failed.push(FailedPlugin {
                        name: spec.name,
                        error,
                    });
                }
            }
        }

        tracing::info!(
            pulled = report.pulled.len(),
            failed = report.failed.len(),
            "Pull run finished"
        );
        report
    }

    /// Pull a single plugin.
    ///
    /// A metadata failure after a successful extraction is logged and the
    /// plugin is still returned as pulled, with `metadata: None`.
    pub async fn pull(&self, spec: &PluginSpec) -> Result<PulledPlugin> {
        let version = artifact_version(&spec.reference)?;
        let plugin_dir = self.version_dir(&spec.name, &version);
        std::fs::create_dir_all(&plugin_dir).map_err(|e| {
            PullError::ExtractionError(format!(
                "Failed to create plugin directory {}: {}",
                plugin_dir.display(),
                e
            ))
        })?;

        let binary = {
            let staging = TempLayoutDir::create(self.temp_dir(&spec.name))?;
            self.transport.fetch(&spec.reference, staging.path()).await?;

            let layout = OciLayout::new(staging.path());
            let layers = layout.resolve_layers()?;
            extract_plugin(&layout, &layers, &plugin_dir)?
        };

        let label = MetadataLabel::PluginName(spec.name.clone());
        let metadata = match generate_metadata(&binary, label) {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                tracing::warn!(
                    plugin = %spec.name,
                    error = %e,
                    "Metadata generation failed; binary kept without sidecar"
                );
                discard_stale_sidecar(&plugin_dir);
                None
            }
        };

        Ok(PulledPlugin {
            name: spec.name.clone(),
            version,
            binary,
            metadata,
        })
    }
}

/// Remove a sidecar that describes a previous binary.
fn discard_stale_sidecar(plugin_dir: &Path) {
    let sidecar = plugin_dir.join(METADATA_FILE_NAME);
    match std::fs::remove_file(&sidecar) {
        Ok(()) => tracing::debug!(path = %sidecar.display(), "Removed stale metadata"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(
            path = %sidecar.display(),
            error = %e,
            "Failed to remove stale metadata"
        ),
    }
}

/// Temporary layout directory, removed when dropped.
struct TempLayoutDir {
    path: PathBuf,
}

impl TempLayoutDir {
    /// Create an empty directory at `path`, clearing leftovers from an
    /// interrupted run.
    fn create(path: PathBuf) -> Result<Self> {
        if path.exists() {
            std::fs::remove_dir_all(&path)?;
        }

        // Guard first so a partially created tree is still removed.
        let guard = Self { path };
        std::fs::create_dir_all(&guard.path)?;
        Ok(guard)
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempLayoutDir {
    fn drop(&mut self) {
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove temp directory"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::LayoutBuilder;
    use crate::oci::{PLUGIN_BINARY_NAME, WASM_CONTENT_LAYER};
    use async_trait::async_trait;
    use std::fs;
    use tempfile::TempDir;

    /// Transport that always fails, after leaving debris in the destination.
    struct FailingTransport;

    #[async_trait]
    impl ArtifactTransport for FailingTransport {
        async fn fetch(&self, reference: &str, dest_dir: &Path) -> Result<()> {
            fs::write(dest_dir.join("partial"), b"junk").unwrap();
            Err(PullError::TransportError {
                reference: reference.to_string(),
                message: "exit status: 1".to_string(),
            })
        }
    }

    /// Transport that writes a single raw wasm layer.
    struct RawTransport(&'static [u8]);

    #[async_trait]
    impl ArtifactTransport for RawTransport {
        async fn fetch(&self, _reference: &str, dest_dir: &Path) -> Result<()> {
            LayoutBuilder::new(dest_dir)
                .layer(WASM_CONTENT_LAYER, self.0)
                .finish();
            Ok(())
        }
    }

    #[test]
    fn test_plugin_dir_layout() {
        let puller = PluginPuller::new(Arc::new(FailingTransport), "/srv/plugins");
        let spec = PluginSpec::new("echo", "ghcr.io/acme/echo:0.1.0");

        assert_eq!(
            puller.plugin_dir(&spec).unwrap(),
            PathBuf::from("/srv/plugins/echo/0.1.0")
        );
        assert_eq!(puller.temp_dir("echo"), PathBuf::from("/srv/plugins/echo_temp"));
    }

    #[test]
    fn test_temp_layout_dir_removed_on_drop() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("echo_temp");
        {
            let guard = TempLayoutDir::create(path.clone()).unwrap();
            fs::create_dir_all(guard.path().join("blobs/sha256")).unwrap();
            assert!(path.exists());
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_temp_layout_dir_clears_leftovers() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("echo_temp");
        fs::create_dir_all(&path).unwrap();
        fs::write(path.join("index.json"), "stale").unwrap();

        let guard = TempLayoutDir::create(path.clone()).unwrap();
        assert!(!guard.path().join("index.json").exists());
    }

    #[tokio::test]
    async fn test_pull_transport_failure_cleans_up() {
        let temp_dir = TempDir::new().unwrap();
        let puller = PluginPuller::new(Arc::new(FailingTransport), temp_dir.path());
        let spec = PluginSpec::new("echo", "ghcr.io/acme/echo:0.1.0");

        let err = puller.pull(&spec).await.unwrap_err();

        assert!(matches!(err, PullError::TransportError { .. }));
        assert!(!puller.temp_dir("echo").exists());
        // Target directory is created eagerly and left in place
        assert!(temp_dir.path().join("echo/0.1.0").is_dir());
    }

    #[tokio::test]
    async fn test_pull_invalid_reference() {
        let temp_dir = TempDir::new().unwrap();
        let puller = PluginPuller::new(Arc::new(RawTransport(b"x")), temp_dir.path());
        let spec = PluginSpec::new("echo", "registry.local:5000/acme/echo");

        let err = puller.pull(&spec).await.unwrap_err();

        assert!(matches!(err, PullError::InvalidReference { .. }));
        assert!(fs::read_dir(temp_dir.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn test_pull_success_writes_binary_and_metadata() {
        let temp_dir = TempDir::new().unwrap();
        let transport = Arc::new(RawTransport(b"\0asm echo"));
        let puller = PluginPuller::new(transport, temp_dir.path());
        let spec = PluginSpec::new("echo", "ghcr.io/acme/echo:0.1.0");

        let pulled = puller.pull(&spec).await.unwrap();

        let dir = temp_dir.path().join("echo/0.1.0");
        assert_eq!(pulled.version, "0.1.0");
        assert_eq!(pulled.binary, dir.join(PLUGIN_BINARY_NAME));
        assert_eq!(fs::read(&pulled.binary).unwrap(), b"\0asm echo");
        let metadata = pulled.metadata.unwrap();
        assert_eq!(metadata.size_bytes, 9);
        let sidecar = fs::read_to_string(dir.join(METADATA_FILE_NAME)).unwrap();
        assert!(sidecar.starts_with("Plugin Name: echo\n"));
        assert!(!puller.temp_dir("echo").exists());
    }

    #[tokio::test]
    async fn test_pull_metadata_failure_keeps_binary() {
        let temp_dir = TempDir::new().unwrap();
        let puller = PluginPuller::new(Arc::new(RawTransport(b"\0asm echo")), temp_dir.path());
        let spec = PluginSpec::new("echo", "ghcr.io/acme/echo:0.1.0");
        let dir = puller.plugin_dir(&spec).unwrap();
        // A directory in place of the sidecar makes the write fail
        fs::create_dir_all(dir.join(METADATA_FILE_NAME)).unwrap();

        let report = puller.pull_all(vec![spec]).await;

        assert!(report.is_success());
        assert_eq!(report.pulled.len(), 1);
        assert!(report.pulled[0].metadata.is_none());
        assert_eq!(fs::read(dir.join(PLUGIN_BINARY_NAME)).unwrap(), b"\0asm echo");
        assert!(!puller.temp_dir("echo").exists());
    }

    #[tokio::test]
    async fn test_pull_all_collects_failures_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let puller = PluginPuller::new(Arc::new(FailingTransport), temp_dir.path());
        let specs = vec![
            PluginSpec::new("b", "r/b:1"),
            PluginSpec::new("a", "r/a:1"),
        ];

        let report = puller.pull_all(specs).await;

        assert!(!report.is_success());
        assert!(report.pulled.is_empty());
        assert_eq!(report.failed_names(), vec!["b", "a"]);
    }

    #[test]
    fn test_discard_stale_sidecar() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(METADATA_FILE_NAME), "old").unwrap();

        discard_stale_sidecar(temp_dir.path());
        assert!(!temp_dir.path().join(METADATA_FILE_NAME).exists());

        // Missing sidecar is fine
        discard_stale_sidecar(temp_dir.path());
    }
}
