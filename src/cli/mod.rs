//! Command-line interface: argument types, commands and output rendering.

pub mod commands;
pub mod output;
pub mod types;

pub use output::progress::{create_spinner, ProgressBarExt};
pub use types::{Cli, Commands};

/// Print a command error to stderr, as JSON when requested.
pub fn handle_error(err: &anyhow::Error, json: bool) {
    if json {
        let chain: Vec<String> = err.chain().skip(1).map(ToString::to_string).collect();
        let value = serde_json::json!({
            "error": err.to_string(),
            "causes": chain,
        });
        eprintln!("{value}");
    } else {
        eprintln!("{} {err}", console::style("Error:").red().bold());
        for cause in err.chain().skip(1) {
            eprintln!("  caused by: {cause}");
        }
    }
}
