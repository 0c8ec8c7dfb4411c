//! Plugin payload extraction from OCI layers.
//!
//! Publishers ship plugins either as a gzip-compressed tar containing a
//! `.wasm` file or as a raw wasm blob. Layers are scanned in manifest order
//! and the first one that yields a binary wins.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use plugin_pull_core::error::{PullError, Result};
use tar::Archive;

use super::layout::{LayerDescriptor, OciLayout};
use crate::fs::write_atomic;

/// Docker image layer (gzip-compressed tar).
pub const DOCKER_LAYER_TAR_GZIP: &str = "application/vnd.docker.image.rootfs.diff.tar.gzip";

/// OCI image layer (gzip-compressed tar).
pub const OCI_LAYER_TAR_GZIP: &str = "application/vnd.oci.image.layer.v1.tar+gzip";

/// Wasm module content layer.
pub const WASM_CONTENT_LAYER: &str = "application/vnd.module.wasm.content.layer.v1+wasm";

/// Canonical file name of an extracted plugin.
pub const PLUGIN_BINARY_NAME: &str = "plugin.wasm";

const PLUGIN_BINARY_SUFFIX: &[u8] = b".wasm";

/// How a layer carries its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    /// Gzip-compressed tar containing a `.wasm` member
    TarGzip,
    /// The blob is the wasm binary itself
    RawWasm,
    /// Not a plugin carrier
    Unrecognized,
}

impl LayerKind {
    /// Classify a layer media type.
    pub fn classify(media_type: &str) -> Self {
        match media_type {
            DOCKER_LAYER_TAR_GZIP | OCI_LAYER_TAR_GZIP => Self::TarGzip,
            WASM_CONTENT_LAYER => Self::RawWasm,
            _ => Self::Unrecognized,
        }
    }
}

/// Extract the plugin binary from the first layer that carries one.
///
/// Writes `plugin.wasm` into `target_dir`, replacing any previous binary,
/// and returns its path. A layer that fails to extract is logged and
/// skipped; later layers are still tried.
///
/// # Errors
///
/// Returns [`PullError::ExtractionError`] when no layer produced a binary.
pub fn extract_plugin(
    layout: &OciLayout,
    layers: &[LayerDescriptor],
    target_dir: &Path,
) -> Result<PathBuf> {
    for (position, layer) in layers.iter().enumerate() {
        let kind = LayerKind::classify(&layer.media_type);
        if kind == LayerKind::Unrecognized || layer.digest.is_empty() {
            tracing::trace!(
                position,
                media_type = %layer.media_type,
                digest = %layer.digest,
                "Skipping unrecognized layer"
            );
            continue;
        }

        match extract_layer(layout, layer, kind, target_dir) {
            Ok(Some(binary)) => {
                tracing::info!(
                    position,
                    digest = %layer.digest,
                    binary = %binary.display(),
                    "Extracted plugin binary"
                );
                return Ok(binary);
            }
            Ok(None) => {
                tracing::info!(
                    position,
                    digest = %layer.digest,
                    "No .wasm file found in layer"
                );
            }
            Err(e) => {
                tracing::warn!(
                    position,
                    digest = %layer.digest,
                    error = %e,
                    "Layer did not produce a plugin binary"
                );
            }
        }
    }

    Err(PullError::ExtractionError(format!(
        "No plugin binary found in {} layer(s) of {}",
        layers.len(),
        layout.root_dir().display()
    )))
}

/// Extract a single recognized layer.
///
/// Returns `Ok(None)` when a tar layer has no `.wasm` member.
fn extract_layer(
    layout: &OciLayout,
    layer: &LayerDescriptor,
    kind: LayerKind,
    target_dir: &Path,
) -> Result<Option<PathBuf>> {
    let blob_path = layout.verify_blob(&layer.digest)?;

    std::fs::create_dir_all(target_dir).map_err(|e| {
        PullError::ExtractionError(format!(
            "Failed to create target directory {}: {}",
            target_dir.display(),
            e
        ))
    })?;

    match kind {
        LayerKind::TarGzip => extract_wasm_member(&blob_path, target_dir),
        LayerKind::RawWasm => copy_raw_wasm(&blob_path, target_dir).map(Some),
        LayerKind::Unrecognized => Ok(None),
    }
}

/// Extract the first `.wasm` member of a tar.gz blob as `plugin.wasm`.
fn extract_wasm_member(blob_path: &Path, target_dir: &Path) -> Result<Option<PathBuf>> {
    let file = File::open(blob_path).map_err(|e| {
        PullError::ExtractionError(format!(
            "Failed to open layer file {}: {}",
            blob_path.display(),
            e
        ))
    })?;

    let mut archive = Archive::new(GzDecoder::new(file));
    let entries = archive.entries().map_err(|e| archive_error(blob_path, e))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| archive_error(blob_path, e))?;
        if !entry.header().entry_type().is_file()
            || !entry.path_bytes().ends_with(PLUGIN_BINARY_SUFFIX)
        {
            continue;
        }

        let member = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
        let binary = write_binary(&mut entry, target_dir)?;
        tracing::debug!(
            layer = %blob_path.display(),
            member = %member,
            "Renamed archive member to {}",
            PLUGIN_BINARY_NAME
        );
        return Ok(Some(binary));
    }

    Ok(None)
}

/// Copy a raw wasm blob to `plugin.wasm`.
fn copy_raw_wasm(blob_path: &Path, target_dir: &Path) -> Result<PathBuf> {
    let mut file = File::open(blob_path).map_err(|e| {
        PullError::ExtractionError(format!(
            "Failed to open wasm blob {}: {}",
            blob_path.display(),
            e
        ))
    })?;
    write_binary(&mut file, target_dir)
}

/// Write `reader` to `plugin.wasm`, replacing any previous binary.
fn write_binary(reader: &mut impl io::Read, target_dir: &Path) -> Result<PathBuf> {
    let binary = target_dir.join(PLUGIN_BINARY_NAME);
    write_atomic(&binary, reader).map_err(|e| {
        PullError::ExtractionError(format!("Failed to write {}: {}", binary.display(), e))
    })?;
    Ok(binary)
}

fn archive_error(blob_path: &Path, e: io::Error) -> PullError {
    PullError::ExtractionError(format!(
        "Failed to read tar layer {}: {}",
        blob_path.display(),
        e
    ))
}
