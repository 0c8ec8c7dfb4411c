//! Artifact transport: materializes a registry artifact as a local OCI layout.
//!
//! The production transport shells out to `oras cp <ref> --to-oci-layout
//! <dir>`. Tests substitute an implementation that writes a canned layout.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use plugin_pull_core::error::{PullError, Result};
use tokio::process::Command;

/// Environment variable overriding the `oras` executable.
pub const ORAS_ENV: &str = "PLUGIN_PULL_ORAS";

const DEFAULT_ORAS_PROGRAM: &str = "oras";

/// Fetches an artifact into a local OCI image layout.
#[async_trait]
pub trait ArtifactTransport: Send + Sync {
    /// Populate `dest_dir` with an OCI layout (`index.json` + `blobs/`)
    /// for `reference`. On error the contents of `dest_dir` are undefined.
    async fn fetch(&self, reference: &str, dest_dir: &Path) -> Result<()>;
}

/// Transport backed by the `oras` CLI.
#[derive(Debug, Clone)]
pub struct OrasTransport {
    program: PathBuf,
}

impl OrasTransport {
    /// Use a specific `oras` executable.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Use `$PLUGIN_PULL_ORAS` if set, otherwise `oras` from `PATH`.
    pub fn from_env() -> Self {
        match std::env::var_os(ORAS_ENV) {
            Some(program) if !program.is_empty() => Self::new(program),
            _ => Self::new(DEFAULT_ORAS_PROGRAM),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Default for OrasTransport {
    fn default() -> Self {
        Self::from_env()
    }
}

#[async_trait]
impl ArtifactTransport for OrasTransport {
    async fn fetch(&self, reference: &str, dest_dir: &Path) -> Result<()> {
        tracing::debug!(
            program = %self.program.display(),
            reference = %reference,
            dest = %dest_dir.display(),
            "Running oras cp"
        );

        let output = Command::new(&self.program)
            .arg("cp")
            .arg(reference)
            .arg("--to-oci-layout")
            .arg(dest_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| PullError::TransportError {
                reference: reference.to_string(),
                message: format!("failed to run {}: {}", self.program.display(), e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            let message = if stderr.is_empty() {
                format!("{} exited with {}", self.program.display(), output.status)
            } else {
                format!(
                    "{} exited with {}: {}",
                    self.program.display(),
                    output.status,
                    stderr
                )
            };
            return Err(PullError::TransportError {
                reference: reference.to_string(),
                message,
            });
        }

        Ok(())
    }
}
