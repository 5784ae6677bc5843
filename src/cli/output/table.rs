//! Table output formatting for CLI commands
//!
//! Summary tables for run outcomes and parsed catalogs using comfy-table.

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use std::env;

use super::truncate;
use crate::domain::models::{AssetOutcome, ServiceDescriptor, TerminalState};

const REASON_WIDTH: usize = 60;

/// Table formatter for CLI output
pub struct TableFormatter {
    /// Whether to use colors in output
    use_colors: bool,
}

impl TableFormatter {
    pub fn new() -> Self {
        Self {
            use_colors: supports_color(),
        }
    }

    pub const fn with_colors(use_colors: bool) -> Self {
        Self { use_colors }
    }

    /// One row per asset: service, port, terminal state, attempts, reason.
    pub fn format_outcomes(&self, outcomes: &[AssetOutcome]) -> String {
        let mut table = Self::create_base_table();
        table.set_header(header(&["Service", "Port", "State", "Attempts", "Edge cases", "Reason"]));

        for outcome in outcomes {
            let state = outcome.state.to_string();
            let state_cell = if self.use_colors {
                Cell::new(state).fg(state_color(outcome.state))
            } else {
                Cell::new(format!("{} {state}", state_icon(outcome.state)))
            };

            let edge_cases = match &outcome.edge_cases {
                Some(report) if report.mock_changes_suggested => "mock changes",
                Some(_) => "recorded",
                None if !outcome.warnings.is_empty() => "unavailable",
                None => "-",
            };

            table.add_row(vec![
                Cell::new(&outcome.service.name),
                Cell::new(outcome.service.port),
                state_cell,
                Cell::new(outcome.attempts.len()),
                Cell::new(edge_cases),
                Cell::new(truncate(&outcome.summary(), REASON_WIDTH)),
            ]);
        }

        table.to_string()
    }

    /// One row per parsed service.
    pub fn format_services(&self, services: &[ServiceDescriptor]) -> String {
        let mut table = Self::create_base_table();
        table.set_header(header(&["Service", "Port", "Functionality", "Artifact stem"]));

        for service in services {
            let port = if self.use_colors {
                Cell::new(service.port).fg(Color::Cyan)
            } else {
                Cell::new(service.port)
            };
            table.add_row(vec![
                Cell::new(&service.name),
                port,
                Cell::new(truncate(&service.functionality, REASON_WIDTH)),
                Cell::new(service.artifact_stem()),
            ]);
        }

        table.to_string()
    }

    fn create_base_table() -> Table {
        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn header(titles: &[&str]) -> Vec<Cell> {
    titles
        .iter()
        .map(|t| Cell::new(t).add_attribute(Attribute::Bold))
        .collect()
}

fn supports_color() -> bool {
    if env::var("NO_COLOR").is_ok() {
        return false;
    }
    if env::var("TERM").is_ok_and(|term| term == "dumb") {
        return false;
    }
    console::colors_enabled()
}

const fn state_color(state: TerminalState) -> Color {
    match state {
        TerminalState::Passed => Color::Green,
        TerminalState::Exhausted => Color::Yellow,
        TerminalState::Aborted => Color::Red,
    }
}

const fn state_icon(state: TerminalState) -> &'static str {
    match state {
        TerminalState::Passed => "✓",
        TerminalState::Exhausted => "!",
        TerminalState::Aborted => "✗",
    }
}
