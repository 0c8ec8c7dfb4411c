//! OCI image layout resolution.
//!
//! Reads `index.json`, follows the first manifest descriptor into the blob
//! store and returns the manifest's layer descriptors in declared order.

use std::io::Read;
use std::path::{Path, PathBuf};

use oci_spec::image::ImageIndex;
use plugin_pull_core::error::{PullError, Result};
use serde::Deserialize;
use sha2::{Digest, Sha256};

/// Name of the image index at the layout root.
pub const INDEX_FILE: &str = "index.json";

/// Directory holding content-addressed blobs.
pub const BLOBS_DIR: &str = "blobs";

const DEFAULT_DIGEST_ALGORITHM: &str = "sha256";
const VERIFY_CHUNK_SIZE: usize = 64 * 1024;

/// A layer reference taken from an image manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerDescriptor {
    /// Media type describing the layer encoding
    pub media_type: String,
    /// Content digest (e.g., "sha256:abc123...")
    pub digest: String,
}

impl LayerDescriptor {
    pub fn new(media_type: impl Into<String>, digest: impl Into<String>) -> Self {
        Self {
            media_type: media_type.into(),
            digest: digest.into(),
        }
    }
}

/// The part of an image manifest needed to locate a plugin.
///
/// Only `layers[].mediaType` and `layers[].digest` are read; `config`,
/// descriptor sizes and annotations may be absent.
#[derive(Debug, Deserialize)]
struct PluginManifest {
    layers: Vec<ManifestLayer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManifestLayer {
    #[serde(default)]
    media_type: String,
    #[serde(default)]
    digest: String,
}

impl From<ManifestLayer> for LayerDescriptor {
    fn from(layer: ManifestLayer) -> Self {
        Self::new(layer.media_type, layer.digest)
    }
}

/// A local OCI image layout on disk.
#[derive(Debug, Clone)]
pub struct OciLayout {
    /// Root directory of the OCI image layout
    root_dir: PathBuf,
}

impl OciLayout {
    /// Open a layout rooted at `path`. Nothing is read until resolution.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            root_dir: path.as_ref().to_path_buf(),
        }
    }

    /// Get the root directory of the layout.
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Resolve the layer list of the first manifest in the index.
    ///
    /// Additional manifests in the index are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`PullError::ManifestParseError`] if:
    /// - index.json is missing, malformed, or lists no manifests
    /// - the manifest blob is missing or not valid JSON
    /// - the manifest has no `layers` field, or it is not a list of objects
    pub fn resolve_layers(&self) -> Result<Vec<LayerDescriptor>> {
        let index = self.load_index()?;

        let manifests = index.manifests();
        let first = manifests.first().ok_or_else(|| {
            PullError::ManifestParseError(format!(
                "No manifests in {}",
                self.root_dir.join(INDEX_FILE).display()
            ))
        })?;
        if manifests.len() > 1 {
            tracing::debug!(
                count = manifests.len(),
                selected = %first.digest(),
                "Index lists multiple manifests, using the first"
            );
        }

        let manifest = self.load_manifest(first.digest())?;
        let layers = manifest
            .layers
            .into_iter()
            .map(LayerDescriptor::from)
            .collect::<Vec<_>>();

        tracing::debug!(
            layout = %self.root_dir.display(),
            layers = layers.len(),
            "Resolved OCI manifest"
        );

        Ok(layers)
    }

    /// Get the path to a blob by digest.
    ///
    /// Digests without an algorithm prefix are assumed to be sha256.
    pub fn blob_path(&self, digest: &str) -> Result<PathBuf> {
        let (algorithm, hash) = split_digest(digest);

        let is_safe = |part: &str| {
            !part.is_empty()
                && part != "."
                && part != ".."
                && part
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || "+._-".contains(c))
        };
        if !is_safe(algorithm) || !is_safe(hash) {
            return Err(PullError::ManifestParseError(format!(
                "Invalid blob digest '{}'",
                digest
            )));
        }

        Ok(self.root_dir.join(BLOBS_DIR).join(algorithm).join(hash))
    }

    /// Check that a blob's content matches its digest.
    ///
    /// Only sha256 digests are verified; other algorithms are accepted as-is.
    pub fn verify_blob(&self, digest: &str) -> Result<PathBuf> {
        let path = self.blob_path(digest)?;
        let (algorithm, expected) = split_digest(digest);

        if algorithm != DEFAULT_DIGEST_ALGORITHM {
            tracing::debug!(
                digest = %digest,
                "Skipping verification for unsupported digest algorithm"
            );
            return Ok(path);
        }

        let mut file = std::fs::File::open(&path).map_err(|e| {
            PullError::ExtractionError(format!("Failed to open blob {}: {}", path.display(), e))
        })?;
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; VERIFY_CHUNK_SIZE];
        loop {
            let n = file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }

        let actual = hex::encode(hasher.finalize());
        if !actual.eq_ignore_ascii_case(expected) {
            return Err(PullError::ExtractionError(format!(
                "Digest mismatch for blob {}: expected {}, got {}",
                path.display(),
                expected,
                actual
            )));
        }

        Ok(path)
    }

    /// Load the image index from index.json.
    fn load_index(&self) -> Result<ImageIndex> {
        let index_path = self.root_dir.join(INDEX_FILE);
        let content = std::fs::read_to_string(&index_path).map_err(|e| {
            PullError::ManifestParseError(format!(
                "Failed to read index.json at {}: {}",
                index_path.display(),
                e
            ))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            PullError::ManifestParseError(format!("Failed to parse index.json: {}", e))
        })
    }

    /// Load the image manifest from blobs.
    fn load_manifest(&self, digest: &str) -> Result<PluginManifest> {
        let blob_path = self.blob_path(digest)?;
        let content = std::fs::read_to_string(&blob_path).map_err(|e| {
            PullError::ManifestParseError(format!(
                "Failed to read manifest at {}: {}",
                blob_path.display(),
                e
            ))
        })?;

        let value: serde_json::Value = serde_json::from_str(&content).map_err(|e| {
            PullError::ManifestParseError(format!("Failed to parse manifest: {}", e))
        })?;
        if value.get("layers").is_none() {
            return Err(PullError::ManifestParseError(format!(
                "Manifest {} has no layers field",
                digest
            )));
        }

        serde_json::from_value(value).map_err(|e| {
            PullError::ManifestParseError(format!("Failed to parse manifest layers: {}", e))
        })
    }
}

/// Split "algorithm:hex" into its parts, defaulting the algorithm to sha256.
fn split_digest(digest: &str) -> (&str, &str) {
    match digest.split_once(':') {
        Some((algorithm, hash)) => (algorithm, hash),
        None => (DEFAULT_DIGEST_ALGORITHM, digest),
    }
}
