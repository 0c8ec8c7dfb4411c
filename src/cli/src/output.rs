//! Table formatting helpers for CLI output.

use comfy_table::{ContentArrangement, Table};
use plugin_pull_runtime::{BatchReport, PullReport};

/// Create a styled table with the given headers.
pub fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.load_preset(comfy_table::presets::NOTHING);
    table.set_header(headers);
    table
}

/// Format a byte count as a human-readable string.
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Render the pulled plugins and the failure list of a pull run.
pub fn render_pull_report(report: &PullReport) -> String {
    let mut out = String::new();

    if !report.pulled.is_empty() {
        let mut table = new_table(&["PLUGIN", "VERSION", "SIZE", "MD5"]);
        for plugin in &report.pulled {
            let (size, md5) = match &plugin.metadata {
                Some(m) => (format_bytes(m.size_bytes), m.md5.clone()),
                None => ("-".to_string(), "(metadata unavailable)".to_string()),
            };
            table.add_row(vec![plugin.name.clone(), plugin.version.clone(), size, md5]);
        }
        out.push_str(&table.to_string());
        out.push('\n');
    }

    if !report.failed.is_empty() {
        out.push_str("\nThe following plugins were not processed successfully:\n");
        for failed in &report.failed {
            out.push_str(&format!("- {}: {}\n", failed.name, failed.error));
        }
    }

    out
}

/// Render the outcome of a batch metadata run.
pub fn render_batch_report(report: &BatchReport) -> String {
    let mut out = String::new();

    for (binary, metadata) in &report.generated {
        out.push_str(&format!(
            "Generated metadata for {} ({}, md5 {})\n",
            binary.display(),
            format_bytes(metadata.size_bytes),
            metadata.md5
        ));
    }
    for (binary, error) in &report.failed {
        out.push_str(&format!("Failed: {}: {}\n", binary.display(), error));
    }

    out
}
