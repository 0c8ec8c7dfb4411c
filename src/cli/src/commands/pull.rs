//! `plugin-pull` command.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use plugin_pull_core::{PluginList, PullError, RunConfig};
use plugin_pull_runtime::{OrasTransport, PluginPuller, PullReport};

use crate::output::render_pull_report;

/// Fetch WebAssembly plugins listed in a plugins.properties file.
///
/// Each `name=oci://registry/repo:version` entry is pulled with `oras`
/// into `plugins/<name>/<version>/plugin.wasm` next to the list, with a
/// `metadata.txt` provenance record beside it.
#[derive(Parser, Debug)]
#[command(name = "plugin-pull", version, about)]
pub struct PullArgs {
    /// Path to the plugin list (default: plugins.properties next to this executable)
    pub config: Option<PathBuf>,
}

pub async fn execute(args: PullArgs) -> Result<PullReport, Box<dyn std::error::Error>> {
    let run = RunConfig::resolve(args.config)?;
    let list = PluginList::from_file(&run.config_path)?;
    if list.is_empty() {
        return Err(PullError::ConfigError(format!(
            "No valid plugin configuration in {}",
            run.config_path.display()
        ))
        .into());
    }

    tracing::info!(
        config = %run.config_path.display(),
        plugins_root = %run.plugins_root.display(),
        count = list.len(),
        "Starting plugin pull"
    );

    let transport = Arc::new(OrasTransport::from_env());
    let puller = PluginPuller::new(transport, &run.plugins_root);
    let report = puller.pull_all(list).await;

    print!("{}", render_pull_report(&report));
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_without_config() {
        let args = PullArgs::try_parse_from(["plugin-pull"]).unwrap();
        assert!(args.config.is_none());
    }

    #[test]
    fn test_parse_positional_config() {
        let args =
            PullArgs::try_parse_from(["plugin-pull", "/etc/gw/plugins.properties"]).unwrap();
        assert_eq!(
            args.config,
            Some(PathBuf::from("/etc/gw/plugins.properties"))
        );
    }

    #[test]
    fn test_parse_rejects_extra_arguments() {
        assert!(PullArgs::try_parse_from(["plugin-pull", "a", "b"]).is_err());
    }

    #[tokio::test]
    async fn test_execute_missing_config() {
        let temp_dir = TempDir::new().unwrap();
        let args = PullArgs {
            config: Some(temp_dir.path().join("plugins.properties")),
        };

        let err = execute(args).await.unwrap_err();
        assert!(err.to_string().contains("Configuration error"));
    }

    #[tokio::test]
    async fn test_execute_empty_config() {
        let temp_dir = TempDir::new().unwrap();
        let config = temp_dir.path().join("plugins.properties");
        std::fs::write(&config, "# nothing yet\n").unwrap();

        let err = execute(PullArgs {
            config: Some(config),
        })
        .await
        .unwrap_err();

        assert!(err.to_string().contains("No valid plugin configuration"));
        assert!(!temp_dir.path().join("plugins").exists());
    }
}
