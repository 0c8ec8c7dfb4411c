//! `plugin-metadata` command.

use std::path::PathBuf;

use clap::Parser;
use plugin_pull_runtime::{generate_all, BatchReport};

use crate::output::render_batch_report;

/// Regenerate metadata.txt for every plugin.wasm under a plugins directory.
///
/// Sidecars written by this command are labeled `File: <plugin>:<version>`.
#[derive(Parser, Debug)]
#[command(name = "plugin-metadata", version, about)]
pub struct MetadataArgs {
    /// Plugins directory to scan
    #[arg(default_value = "plugins")]
    pub plugins_dir: PathBuf,
}

pub fn execute(args: MetadataArgs) -> Result<BatchReport, Box<dyn std::error::Error>> {
    let report = generate_all(&args.plugins_dir)?;
    tracing::info!(
        plugins_dir = %args.plugins_dir.display(),
        generated = report.generated.len(),
        failed = report.failed.len(),
        "Metadata regeneration finished"
    );

    print!("{}", render_batch_report(&report));
    Ok(report)
}
