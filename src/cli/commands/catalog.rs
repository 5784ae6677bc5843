//! `catalog`: parse backend-style catalog text offline.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::output::{output, CommandOutput, TableFormatter};
use crate::domain::models::ServiceDescriptor;
use crate::services::catalog_parser::{filter_valid, parse_records, NO_SERVICES_PHRASE};

#[derive(Args, Debug)]
pub struct CatalogArgs {
    /// File containing `Service Name:` / `Port:` / `Functionality Summary:` blocks
    #[arg(short, long)]
    pub input: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct CatalogOutput {
    pub services: Vec<ServiceDescriptor>,
    /// Records dropped for a missing or invalid port, or as duplicates
    pub dropped: usize,
    /// The text states that no services could be identified
    pub no_services_reported: bool,
}

impl CatalogOutput {
    pub fn from_text(text: &str) -> Self {
        if text.to_lowercase().contains(NO_SERVICES_PHRASE) {
            return Self {
                services: Vec::new(),
                dropped: 0,
                no_services_reported: true,
            };
        }
        let records = parse_records(text);
        let services = filter_valid(&records);
        Self {
            dropped: records.len() - services.len(),
            services,
            no_services_reported: false,
        }
    }
}

impl CommandOutput for CatalogOutput {
    fn to_human(&self) -> String {
        if self.no_services_reported {
            return "The catalog states that no clear services can be identified.".to_string();
        }
        if self.services.is_empty() {
            return format!("No usable services found ({} record(s) dropped).", self.dropped);
        }
        format!(
            "{}\n\n{} service(s), {} record(s) dropped (invalid port or duplicate)",
            TableFormatter::new().format_services(&self.services),
            self.services.len(),
            self.dropped
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Returns whether at least one usable service was found.
pub async fn execute(args: CatalogArgs, json: bool) -> Result<bool> {
    let text = tokio::fs::read_to_string(&args.input)
        .await
        .with_context(|| format!("Failed to read catalog from {}", args.input.display()))?;

    let result = CatalogOutput::from_text(&text);
    output(&result, json);
    Ok(!result.services.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_dropped_records() {
        let out = CatalogOutput::from_text(
            "Service Name: A\nPort: 5000\nService Name: B\nPort: abc\nService Name: C",
        );
        assert_eq!(out.services.len(), 1);
        assert_eq!(out.dropped, 2);
        assert!(!out.no_services_reported);
    }

    #[test]
    fn test_reports_no_services_phrase() {
        let out = CatalogOutput::from_text("No clear services can be identified.");
        assert!(out.no_services_reported);
        assert!(out.to_human().contains("no clear services"));
    }
}
