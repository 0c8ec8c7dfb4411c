//! Builders for on-disk OCI layouts used by unit tests.

use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use sha2::{Digest, Sha256};

use crate::oci::{BLOBS_DIR, INDEX_FILE};

const MANIFEST_MEDIA_TYPE: &str = "application/vnd.oci.image.manifest.v1+json";
const EMPTY_CONFIG_MEDIA_TYPE: &str = "application/vnd.oci.empty.v1+json";

/// Digest string ("sha256:<hex>") of `bytes`.
pub fn sha256_digest(bytes: &[u8]) -> String {
    format!("sha256:{}", hex::encode(Sha256::digest(bytes)))
}

/// Build a gzip-compressed tar holding regular files.
///
/// Member names are written verbatim, so names with `..` are allowed.
pub fn tar_gz(files: &[(&str, &[u8])]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for (name, content) in files {
        let mut header = tar::Header::new_gnu();
        let name_bytes = name.as_bytes();
        header.as_old_mut().name[..name_bytes.len()].copy_from_slice(name_bytes);
        header.set_entry_type(tar::EntryType::Regular);
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();

        builder.append(&header, *content).unwrap();
    }

    builder.into_inner().unwrap().finish().unwrap()
}

/// Writes blobs, a manifest and `index.json` into a layout directory.
pub struct LayoutBuilder {
    root: PathBuf,
    layers: Vec<(String, String, usize)>,
}

impl LayoutBuilder {
    pub fn new(root: &Path) -> Self {
        std::fs::create_dir_all(root.join(BLOBS_DIR).join("sha256")).unwrap();
        std::fs::write(root.join("oci-layout"), r#"{"imageLayoutVersion":"1.0.0"}"#).unwrap();
        Self {
            root: root.to_path_buf(),
            layers: Vec::new(),
        }
    }

    /// Store `bytes` as a blob and return its digest.
    pub fn write_blob(&self, bytes: &[u8]) -> String {
        let digest = sha256_digest(bytes);
        let hash = digest.trim_start_matches("sha256:");
        std::fs::write(self.root.join(BLOBS_DIR).join("sha256").join(hash), bytes).unwrap();
        digest
    }

    /// Append a layer with the given media type and content.
    pub fn layer(mut self, media_type: &str, bytes: &[u8]) -> Self {
        let digest = self.write_blob(bytes);
        self.layers
            .push((media_type.to_string(), digest, bytes.len()));
        self
    }

    pub fn layer_digests(&self) -> Vec<String> {
        self.layers.iter().map(|(_, d, _)| d.clone()).collect()
    }

    /// Store a manifest blob and point `index.json` at it.
    pub fn write_index_for(&self, manifest: &[u8]) {
        let digest = self.write_blob(manifest);
        let index = serde_json::json!({
            "schemaVersion": 2,
            "manifests": [{
                "mediaType": MANIFEST_MEDIA_TYPE,
                "digest": digest,
                "size": manifest.len()
            }]
        });
        std::fs::write(
            self.root.join(INDEX_FILE),
            serde_json::to_vec(&index).unwrap(),
        )
        .unwrap();
    }

    /// Write the manifest and index. Returns the layout root.
    pub fn finish(self) -> PathBuf {
        let config_digest = self.write_blob(b"{}");
        let layers: Vec<_> = self
            .layers
            .iter()
            .map(|(media_type, digest, size)| {
                serde_json::json!({
                    "mediaType": media_type,
                    "digest": digest,
                    "size": size
                })
            })
            .collect();
        let manifest = serde_json::json!({
            "schemaVersion": 2,
            "mediaType": MANIFEST_MEDIA_TYPE,
            "config": {
                "mediaType": EMPTY_CONFIG_MEDIA_TYPE,
                "digest": config_digest,
                "size": 2
            },
            "layers": layers
        });
        self.write_index_for(&serde_json::to_vec(&manifest).unwrap());
        self.root
    }
}
