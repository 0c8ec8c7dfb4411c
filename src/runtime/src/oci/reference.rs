//! Artifact version derivation from registry references.
//!
//! The version is the text after the final `:` of the reference and is used
//! verbatim as a directory segment. A reference that names a registry port
//! but no tag (`registry.local:5000/acme/echo`) yields `5000/acme/echo`,
//! which is rejected rather than guessed at.

use plugin_pull_core::error::{PullError, Result};

/// Derive the artifact version from a scheme-stripped reference.
///
/// Supports formats:
/// - `ghcr.io/acme/echo:0.1.0` → `0.1.0`
/// - `registry.local:5000/acme/echo:0.1.0` → `0.1.0`
/// - `ghcr.io/acme/echo@sha256:abc…` → `abc…`
///
/// A reference without any `:` is used whole, as long as it is a valid
/// directory segment.
pub fn artifact_version(reference: &str) -> Result<String> {
    let reference = reference.trim();
    let version = match reference.rsplit_once(':') {
        Some((_, version)) => version,
        None => reference,
    };

    let invalid = |message: &str| PullError::InvalidReference {
        reference: reference.to_string(),
        message: message.to_string(),
    };

    if version.is_empty() {
        return Err(invalid("empty version after ':'"));
    }
    if version.contains(&['/', '\\'][..]) {
        return Err(invalid(
            "no tag after the final ':' (a registry port is not a version)",
        ));
    }
    if version == "." || version == ".." {
        return Err(invalid("version is not a valid directory name"));
    }

    Ok(version.to_string())
}
