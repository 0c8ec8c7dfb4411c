//! `plugin-pull` entry point.

use clap::Parser;

use plugin_pull_cli::commands::{init_tracing, pull};

#[tokio::main]
async fn main() {
    init_tracing();

    let args = pull::PullArgs::parse();

    match pull::execute(args).await {
        Ok(report) if report.is_success() => {}
        Ok(_) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
