//! OCI artifact support for plugin pulls.
//!
//! This module resolves a local OCI image layout and extracts the plugin
//! binary from it. It supports:
//!
//! - OCI image layout parsing (index, manifest)
//! - Payload extraction from tar.gz layers and raw wasm layers
//! - Blob digest verification
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    OCI Image Layout                          │
//! │                                                              │
//! │  <name>_temp/                                                │
//! │  ├── oci-layout           (OCI layout marker)               │
//! │  ├── index.json           (Image index)                     │
//! │  └── blobs/                                                 │
//! │      └── sha256/                                            │
//! │          ├── <manifest>   (Image manifest)                  │
//! │          └── <layers>     (tar.gz or raw wasm)              │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod layers;
mod layout;
mod reference;

pub use layers::{
    extract_plugin, LayerKind, DOCKER_LAYER_TAR_GZIP, OCI_LAYER_TAR_GZIP, PLUGIN_BINARY_NAME,
    WASM_CONTENT_LAYER,
};
pub use layout::{LayerDescriptor, OciLayout, BLOBS_DIR, INDEX_FILE};
pub use reference::artifact_version;
