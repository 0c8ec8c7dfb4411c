//! Provenance sidecar for extracted plugin binaries.
//!
//! Every `plugin.wasm` gets a `metadata.txt` next to it:
//!
//! ```text
//! Plugin Name: echo
//! Size: 10240 bytes
//! Last Modified: 2026-10-19T09:30:12.123456
//! Created: 2026-10-19T09:30:12.123456
//! MD5: 0cc175b9c0f1b6a831c399e269772661
//! ```
//!
//! The batch generator writes `File: <plugin>:<version>` as the first line
//! instead of `Plugin Name:`.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use plugin_pull_core::error::{PullError, Result};

use crate::fs::write_atomic;
use crate::oci::PLUGIN_BINARY_NAME;

/// Sidecar file name.
pub const METADATA_FILE_NAME: &str = "metadata.txt";

/// Read size used while hashing.
const HASH_CHUNK_SIZE: usize = 4096;

/// Local time, microsecond precision, no offset.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// First line of the sidecar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataLabel {
    /// `Plugin Name: <name>`, written after a pull
    PluginName(String),
    /// `File: <plugin>:<version>`, written by the batch generator
    File { plugin: String, version: String },
}

impl MetadataLabel {
    /// Label a binary by its two enclosing directories
    /// (`plugins/<plugin>/<version>/plugin.wasm`).
    pub fn from_binary_path(binary: &Path) -> Result<Self> {
        let dir_name = |p: Option<&Path>| {
            p.and_then(Path::file_name)
                .map(|n| n.to_string_lossy().into_owned())
        };
        let version_dir = binary.parent();
        let plugin_dir = version_dir.and_then(Path::parent);

        match (dir_name(plugin_dir), dir_name(version_dir)) {
            (Some(plugin), Some(version)) => Ok(Self::File { plugin, version }),
            _ => Err(PullError::MetadataError(format!(
                "Cannot derive plugin and version from {}",
                binary.display()
            ))),
        }
    }
}

impl fmt::Display for MetadataLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PluginName(name) => write!(f, "Plugin Name: {}", name),
            Self::File { plugin, version } => write!(f, "File: {}:{}", plugin, version),
        }
    }
}

/// Snapshot of a plugin binary at generation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactMetadata {
    pub label: MetadataLabel,
    pub size_bytes: u64,
    pub last_modified: DateTime<Local>,
    pub created: DateTime<Local>,
    /// Lowercase hex MD5 of the file content
    pub md5: String,
}

impl ArtifactMetadata {
    /// Stat and hash `binary`.
    ///
    /// Filesystems that do not record a birth time report the
    /// modification time as `created`.
    pub fn collect(binary: &Path, label: MetadataLabel) -> Result<Self> {
        let stat = std::fs::metadata(binary).map_err(|e| {
            PullError::MetadataError(format!("Failed to stat {}: {}", binary.display(), e))
        })?;
        let modified = stat.modified().map_err(|e| {
            PullError::MetadataError(format!(
                "Failed to read modification time of {}: {}",
                binary.display(),
                e
            ))
        })?;
        let created: SystemTime = stat.created().unwrap_or(modified);

        Ok(Self {
            label,
            size_bytes: stat.len(),
            last_modified: modified.into(),
            created: created.into(),
            md5: md5_file(binary)?,
        })
    }

    /// Render the five-line sidecar text.
    pub fn render(&self) -> String {
        format!(
            "{}\nSize: {} bytes\nLast Modified: {}\nCreated: {}\nMD5: {}\n",
            self.label,
            self.size_bytes,
            self.last_modified.format(TIMESTAMP_FORMAT),
            self.created.format(TIMESTAMP_FORMAT),
            self.md5
        )
    }

    /// Write `metadata.txt` into `dir`, replacing any previous sidecar.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(METADATA_FILE_NAME);
        let rendered = self.render();
        write_atomic(&path, &mut rendered.as_bytes()).map_err(|e| {
            PullError::MetadataError(format!("Failed to write {}: {}", path.display(), e))
        })?;
        Ok(path)
    }
}

/// Compute the lowercase hex MD5 of a file, reading it in fixed chunks.
pub fn md5_file(path: &Path) -> Result<String> {
    let hash_error = |e: std::io::Error| {
        PullError::MetadataError(format!("Failed to hash {}: {}", path.display(), e))
    };

    let mut file = File::open(path).map_err(hash_error)?;
    let mut context = md5::Context::new();
    let mut buf = [0u8; HASH_CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf).map_err(hash_error)?;
        if n == 0 {
            break;
        }
        context.consume(&buf[..n]);
    }

    Ok(format!("{:x}", context.compute()))
}

/// Generate the sidecar for `binary` in its own directory.
pub fn generate_metadata(binary: &Path, label: MetadataLabel) -> Result<ArtifactMetadata> {
    let dir = binary.parent().ok_or_else(|| {
        PullError::MetadataError(format!("{} has no parent directory", binary.display()))
    })?;

    let metadata = ArtifactMetadata::collect(binary, label)?;
    let path = metadata.write_to(dir)?;

    tracing::info!(
        metadata = %path.display(),
        size = metadata.size_bytes,
        md5 = %metadata.md5,
        "Generated metadata"
    );

    Ok(metadata)
}

/// Outcome of a batch metadata run.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Binaries whose sidecar was regenerated
    pub generated: Vec<(PathBuf, ArtifactMetadata)>,
    /// Binaries that failed, with the reason
    pub failed: Vec<(PathBuf, PullError)>,
}

/// Regenerate `metadata.txt` for every `plugin.wasm` under `plugins_dir`.
///
/// Each sidecar is labeled `File: <plugin>:<version>`. A failure on one
/// binary does not stop the walk.
pub fn generate_all(plugins_dir: &Path) -> Result<BatchReport> {
    let mut binaries = Vec::new();
    find_binaries(plugins_dir, &mut binaries)?;
    binaries.sort();

    let mut report = BatchReport::default();
    for binary in binaries {
        let result = MetadataLabel::from_binary_path(&binary)
            .and_then(|label| generate_metadata(&binary, label));
        match result {
            Ok(metadata) => report.generated.push((binary, metadata)),
            Err(e) => {
                tracing::warn!(
                    binary = %binary.display(),
                    error = %e,
                    "Metadata generation failed"
                );
                report.failed.push((binary, e));
            }
        }
    }

    Ok(report)
}

/// Collect `plugin.wasm` files under `dir` recursively.
fn find_binaries(dir: &Path, found: &mut Vec<PathBuf>) -> Result<()> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        PullError::MetadataError(format!("Failed to read directory {}: {}", dir.display(), e))
    })?;

    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            find_binaries(&path, found)?;
        } else if file_type.is_file() && entry.file_name() == PLUGIN_BINARY_NAME {
            found.push(path);
        }
    }
    Ok(())
}
