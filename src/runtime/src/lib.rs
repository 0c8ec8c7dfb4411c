//! Plugin Pull Runtime - plugin artifact resolution and extraction.
//!
//! This module fetches WebAssembly plugins published as OCI artifacts,
//! extracts `plugin.wasm` from whichever layer carries it, and records a
//! provenance sidecar next to each binary.

pub mod fs;
pub mod metadata;
pub mod oci;
pub mod pull;
pub mod transport;

#[cfg(test)]
mod fixtures;

// Re-export common types
pub use metadata::{
    generate_all, generate_metadata, md5_file, ArtifactMetadata, BatchReport, MetadataLabel,
    METADATA_FILE_NAME,
};
pub use oci::{
    artifact_version, extract_plugin, LayerDescriptor, LayerKind, OciLayout, PLUGIN_BINARY_NAME,
};
pub use pull::{FailedPlugin, PluginPuller, PullReport, PulledPlugin};
pub use transport::{ArtifactTransport, OrasTransport, ORAS_ENV};
