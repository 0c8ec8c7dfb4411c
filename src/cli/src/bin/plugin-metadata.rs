//! `plugin-metadata` entry point.

use clap::Parser;

use plugin_pull_cli::commands::{init_tracing, metadata};

fn main() {
    init_tracing();

    let args = metadata::MetadataArgs::parse();

    match metadata::execute(args) {
        Ok(report) if report.failed.is_empty() => {}
        Ok(_) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
